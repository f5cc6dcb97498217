//! Coalesces a subscriber's raw event stream into batches, bounded by
//! count or by time — whichever comes first.

use std::time::Duration;

use tableforge_protocol::GameEvent;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub max_size: usize,
    pub max_wait: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_size: 10, max_wait: Duration::from_millis(100) }
    }
}

/// Spawns a background task that reads single events from `rx` and emits
/// `Vec<GameEvent>` batches on the returned receiver. A batch flushes as
/// soon as it reaches `max_size` events, or `max_wait` after its first
/// event arrived, whichever happens first.
pub fn spawn_batcher(
    mut rx: mpsc::UnboundedReceiver<GameEvent>,
    config: BatchConfig,
) -> mpsc::UnboundedReceiver<Vec<GameEvent>> {
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut buffer: Vec<GameEvent> = Vec::new();
        let mut deadline: Option<Instant> = None;

        loop {
            let sleep = match deadline {
                Some(d) => tokio::time::sleep_until(d),
                None => tokio::time::sleep(Duration::from_secs(3600)),
            };
            tokio::pin!(sleep);

            tokio::select! {
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if buffer.is_empty() {
                                deadline = Some(Instant::now() + config.max_wait);
                            }
                            buffer.push(event);
                            if buffer.len() >= config.max_size {
                                if out_tx.send(std::mem::take(&mut buffer)).is_err() {
                                    return;
                                }
                                deadline = None;
                            }
                        }
                        None => {
                            if !buffer.is_empty() {
                                let _ = out_tx.send(std::mem::take(&mut buffer));
                            }
                            return;
                        }
                    }
                }
                _ = &mut sleep, if deadline.is_some() => {
                    if !buffer.is_empty() {
                        if out_tx.send(std::mem::take(&mut buffer)).is_err() {
                            return;
                        }
                    }
                    deadline = None;
                }
            }
        }
    });

    out_rx
}
