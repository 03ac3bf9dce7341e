use crate::bridge::model::{CaptionsReply, SubmitReply, TextPayload};
use anyhow::Context;
use captioncore::captions::{CaptionScheduler, EnqueueOutcome};
use captioncore::prelude::RecognitionHook;
use captioncore::CaptionSink;
use log::{error, info};
use std::{net::SocketAddr, sync::Arc, thread};
use tokio::runtime::Builder;
use warp::Filter;

pub fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

/// HTTP face of a live caption scheduler. A renderer polls the captions,
/// other processes push relayed or recognized text.
#[derive(Clone)]
pub struct CaptionBridge {
    scheduler: Arc<CaptionScheduler>,
    relay_sink: Arc<dyn CaptionSink>,
    hook: Arc<RecognitionHook>,
    max_lines: usize,
}

impl CaptionBridge {
    pub fn new(
        scheduler: Arc<CaptionScheduler>,
        relay_sink: Arc<dyn CaptionSink>,
        hook: Arc<RecognitionHook>,
        max_lines: usize,
    ) -> Self {
        Self {
            scheduler,
            relay_sink,
            hook,
            max_lines,
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let scheduler = self.scheduler.clone();
        let max_lines = self.max_lines;
        let captions_route = warp::path("captions")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || {
                warp::reply::json(&CaptionsReply {
                    lines: scheduler.snapshot(max_lines),
                })
            });

        let sink = self.relay_sink.clone();
        let relay_route = warp::path("relay")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .map(move |payload: TextPayload| {
                let outcome = sink.submit(&payload.text, None, 0.0);
                warp::reply::json(&SubmitReply {
                    accepted: outcome != EnqueueOutcome::Ignored,
                })
            });

        let hook = self.hook.clone();
        let speech_route = warp::path("speech")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .map(move |payload: TextPayload| {
                warp::reply::json(&SubmitReply {
                    accepted: hook.recognized(&payload.text),
                })
            });

        captions_route.or(relay_route).or(speech_route)
    }

    /// Serves the routes on a background thread with its own runtime.
    pub fn serve(&self, addr: SocketAddr) -> anyhow::Result<thread::JoinHandle<()>> {
        let routes = self.routes();
        let handle = thread::Builder::new()
            .name("caption-bridge".into())
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        error!("caption bridge runtime failed to start: {}", err);
                        return;
                    }
                };
                info!("caption bridge listening on {}", addr);
                runtime.block_on(async move {
                    warp::serve(routes).run(addr).await;
                });
            })
            .context("spawning caption bridge thread")?;
        Ok(handle)
    }
}
