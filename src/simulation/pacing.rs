//! Wall-clock pacing for `PacingMode::Realtime`.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::PacingMode;
use crate::time::VirtualTime;

/// Sleeps the host thread so virtual time does not outrun wall-clock time.
pub(super) struct Pacer {
    /// `None` when running as fast as possible.
    anchor: Option<Anchor>,
}

struct Anchor {
    wall: Instant,
    virtual_start: VirtualTime,
    speed: f64,
}

impl Pacer {
    pub(super) fn new(mode: PacingMode, now: VirtualTime) -> Self {
        let anchor = match mode {
            PacingMode::AsFastAsPossible => None,
            PacingMode::Realtime { speed } if speed.is_finite() && speed > 0.0 => Some(Anchor {
                wall: Instant::now(),
                virtual_start: now,
                speed,
            }),
            PacingMode::Realtime { speed } => {
                warn!(speed, "invalid realtime speed, running unpaced");
                None
            }
        };
        Pacer { anchor }
    }

    /// Block until wall-clock time has caught up with `t`.
    pub(super) fn wait_until(&mut self, t: VirtualTime) {
        let Some(anchor) = &self.anchor else {
            return;
        };
        let virtual_elapsed = t
            .duration_since(anchor.virtual_start)
            .map_or(0.0, |d| d.as_secs_f64().max(0.0));
        let target = Duration::from_secs_f64(virtual_elapsed / anchor.speed);
        let elapsed = anchor.wall.elapsed();
        if target > elapsed {
            std::thread::sleep(target - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpaced_never_sleeps() {
        let mut pacer = Pacer::new(PacingMode::AsFastAsPossible, VirtualTime::ZERO);
        let start = Instant::now();
        pacer.wait_until(VirtualTime::from_secs(3600));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_speed_falls_back_to_unpaced() {
        let pacer = Pacer::new(PacingMode::Realtime { speed: 0.0 }, VirtualTime::ZERO);
        assert!(pacer.anchor.is_none());
    }

    #[test]
    fn test_realtime_waits_for_wall_clock() {
        // 20ms of virtual time at 2x speed: at least 10ms of wall time.
        let mut pacer = Pacer::new(PacingMode::Realtime { speed: 2.0 }, VirtualTime::ZERO);
        let start = Instant::now();
        pacer.wait_until(VirtualTime::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
