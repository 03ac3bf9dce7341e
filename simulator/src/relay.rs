use captioncore::CaptionSink;
use log::{debug, warn};
use std::sync::{Arc, RwLock};

pub type PeerId = u64;

/// In-process stand-in for the host that forwards one player's text to
/// every other player.
#[derive(Default)]
pub struct RelayHub {
    peers: RwLock<Vec<(PeerId, Arc<dyn CaptionSink>)>>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a peer, replacing any earlier sink registered under the same id.
    pub fn join(&self, id: PeerId, sink: Arc<dyn CaptionSink>) {
        let mut peers = match self.peers.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("relay peer list poisoned; continuing");
                poisoned.into_inner()
            }
        };
        peers.retain(|(existing, _)| *existing != id);
        peers.push((id, sink));
    }

    pub fn peer_count(&self) -> usize {
        match self.peers.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Delivers `text` to every peer except `sender`. Returns how many peers
    /// received it.
    pub fn broadcast(&self, sender: PeerId, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }
        let targets: Vec<Arc<dyn CaptionSink>> = {
            let peers = match self.peers.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            peers
                .iter()
                .filter(|(id, _)| *id != sender)
                .map(|(_, sink)| sink.clone())
                .collect()
        };

        for sink in &targets {
            sink.submit(text, None, 0.0);
        }
        debug!("relayed text from {} to {} peers", sender, targets.len());
        targets.len()
    }
}
