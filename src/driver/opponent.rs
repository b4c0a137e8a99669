//! Delayed trigger for the scripted opponent.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One pending opponent turn at a time.
///
/// Each schedule gets a generation number, delivered on the channel when
/// the delay elapses. Firings from a cancelled or superseded schedule are
/// rejected by [`fired`](Self::fired).
#[derive(Debug, Default)]
pub struct OpponentTimer {
    pending: Option<CancellationToken>,
    generation: u64,
}

impl OpponentTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer, replacing any pending schedule. Must be called inside
    /// a tokio runtime.
    pub fn schedule(&mut self, delay: Duration, fire: mpsc::UnboundedSender<u64>) -> u64 {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = fire.send(generation);
                }
            }
        });

        debug!(generation, ?delay, "opponent turn scheduled");
        self.pending = Some(token);
        generation
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Accept a firing. `false` for stale generations.
    pub fn fired(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            debug!(generation, current = self.generation, "stale opponent firing ignored");
            false
        }
    }
}

impl Drop for OpponentTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
