//! The simulation clock.

use crate::error::{KernelError, KernelResult};
use crate::time::VirtualTime;

/// Current virtual time. Never moves backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    now: VirtualTime,
}

impl Clock {
    pub fn new() -> Self {
        Clock {
            now: VirtualTime::ZERO,
        }
    }

    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Move the clock forward to `t`.
    pub fn advance_to(&mut self, t: VirtualTime) -> KernelResult<()> {
        if t < self.now {
            return Err(KernelError::InvalidTime {
                requested: t,
                now: self.now,
            });
        }
        self.now = t;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_forward_and_equal() {
        let mut clock = Clock::new();
        clock.advance_to(VirtualTime::from_nanos(5)).unwrap();
        clock.advance_to(VirtualTime::from_nanos(5)).unwrap();
        assert_eq!(clock.now(), VirtualTime::from_nanos(5));
    }

    #[test]
    fn test_advance_backwards_rejected() {
        let mut clock = Clock::new();
        clock.advance_to(VirtualTime::from_nanos(8)).unwrap();
        let err = clock.advance_to(VirtualTime::from_nanos(3)).unwrap_err();
        assert!(matches!(err, KernelError::InvalidTime { .. }));
        assert_eq!(clock.now(), VirtualTime::from_nanos(8));
    }
}
