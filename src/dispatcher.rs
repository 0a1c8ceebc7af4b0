//! The event loop: polls every neighbor channel concurrently on a single
//! thread and feeds whatever arrives to the `Router`. Races one
//! receive-future per neighbor on a single-threaded runtime, bounded by a
//! short per-iteration timeout, so exactly one message is processed to
//! completion before the next is read and no locking is needed anywhere.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{debug, error, info, warn};

use crate::error::RouterError;
use crate::message::Envelope;
use crate::router::Router;
use crate::transport::Channel;

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct Dispatcher {
    router: Router,
    channels: HashMap<String, Arc<dyn Channel>>,
}

impl Dispatcher {
    pub fn new(router: Router, channels: HashMap<String, Arc<dyn Channel>>) -> Self {
        info!(
            "starting router for asn {} with {} neighbors",
            router.asn(),
            channels.len()
        );
        Self { router, channels }
    }

    /// Run until a neighbor channel closes or an unknown-neighbor message
    /// arrives -- both are treated as fatal to the whole process, since
    /// there is one event loop shared by every neighbor.
    pub async fn run(mut self) -> Result<(), RouterError> {
        loop {
            let mut polls = FuturesUnordered::new();
            for (name, channel) in &self.channels {
                let name = name.clone();
                let channel = Arc::clone(channel);
                polls.push(async move {
                    let result = tokio::time::timeout(POLL_TIMEOUT, channel.recv_raw()).await;
                    (name, result)
                });
            }

            while let Some((name, result)) = polls.next().await {
                let raw = match result {
                    Ok(Ok(raw)) => raw,
                    Ok(Err(io_err)) => {
                        error!("channel to {} closed: {}", name, io_err);
                        return Err(RouterError::ChannelClosed(format!(
                            "{} ({})",
                            name, io_err
                        )));
                    }
                    Err(_elapsed) => continue, // nothing arrived within the poll window
                };

                let envelope: Envelope = match serde_json::from_slice(&raw) {
                    Ok(envelope) => envelope,
                    Err(err) => {
                        warn!("dropping unparsable frame from {}: {}", name, err);
                        continue;
                    }
                };

                debug!("dispatching {} message from {}", envelope.kind, name);

                let replies = match self.router.handle(&name, envelope) {
                    Ok(replies) => replies,
                    Err(RouterError::UnknownNeighbor(who)) => {
                        return Err(RouterError::UnknownNeighbor(who));
                    }
                    Err(err) => {
                        warn!("dropping message from {}: {}", name, err);
                        continue;
                    }
                };

                for (to, envelope) in replies {
                    match self.channels.get(&to) {
                        Some(channel) => {
                            if let Err(io_err) = channel.send(&envelope).await {
                                error!("failed to send to {}: {}", to, io_err);
                            }
                        }
                        None => warn!("no channel for reply target {}", to),
                    }
                }
            }
        }
    }
}
