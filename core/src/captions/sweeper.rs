use crate::captions::scheduler::Shared;
use crate::prelude::SchedulerError;
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tokio::time::{self, MissedTickBehavior};

/// Background thread that sweeps the queue on a fixed interval until stopped.
pub(crate) struct Sweeper {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub(crate) fn spawn(shared: Arc<Shared>, interval: Duration) -> Result<Self, SchedulerError> {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(SchedulerError::Spawn)?;
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let interval = interval.max(Duration::from_millis(1));

        let handle = thread::Builder::new()
            .name("caption-sweep".into())
            .spawn(move || {
                runtime.block_on(async move {
                    let mut ticker = time::interval(interval);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        tokio::select! {
                            _ = &mut stop_rx => break,
                            _ = ticker.tick() => sweep_once(&shared),
                        }
                    }
                });
                debug!("caption sweep stopped");
            })
            .map_err(SchedulerError::Spawn)?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Signals the loop and joins the thread. Safe to call more than once.
    pub(crate) fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("caption sweep thread exited with a panic");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sweep_once(shared: &Shared) {
    match panic::catch_unwind(AssertUnwindSafe(|| shared.sweep())) {
        Ok(report) if report.removed > 0 || report.pruned_keys > 0 => {
            debug!(
                "caption sweep removed {} entries, pruned {} keys",
                report.removed, report.pruned_keys
            );
        }
        Ok(_) => {}
        Err(_) => warn!("caption sweep pass failed; retrying on next tick"),
    }
}
