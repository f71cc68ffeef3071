use std::time::Instant;

use tether_binding::Clock;

/// Reads tokio's clock, so paused test time drives the coordinator's timers too.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
