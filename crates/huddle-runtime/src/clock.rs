//! Time source that follows the tokio clock
//!
//! Wall-clock time at construction plus the tokio time elapsed since. With
//! a paused tokio clock, timestamps move exactly as far as the runtime's
//! timers, which keeps typing staleness and message timestamps consistent
//! with the scheduled ticks.

use huddle_core::types::{TimeSource, Timestamp};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct TokioTimeSource {
    origin: Timestamp,
    anchor: Instant,
}

impl TokioTimeSource {
    pub fn new() -> Self {
        Self::starting_at(Timestamp::now())
    }

    /// Report `origin` at the moment of construction
    pub fn starting_at(origin: Timestamp) -> Self {
        Self {
            origin,
            anchor: Instant::now(),
        }
    }
}

impl Default for TokioTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for TokioTimeSource {
    fn now(&self) -> Timestamp {
        self.origin + self.anchor.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_follows_paused_clock() {
        let clock = TokioTimeSource::starting_at(Timestamp::new(10_000));
        assert_eq!(clock.now(), Timestamp::new(10_000));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(clock.now(), Timestamp::new(12_500));
    }
}
