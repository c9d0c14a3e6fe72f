//! Structured error types for the kernel.
//!
//! All fallible public APIs return `Result<T, KernelError>`. Every error
//! surfaces synchronously at the call that caused it; the kernel never
//! retries.

use thiserror::Error;

use crate::event::EventId;
use crate::time::{SimDuration, VirtualTime};

/// Error type carried by a failing callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The top-level error type for the simulation kernel.
#[derive(Debug, Error)]
pub enum KernelError {
    // ── Scheduling errors ─────────────────────────────────

    /// `schedule` was called with a delay below zero.
    #[error("cannot schedule with negative delay {delay}")]
    NegativeDelay { delay: SimDuration },

    /// Direct insertion at a time earlier than the clock.
    #[error("cannot schedule event at {requested} when current time is {now}")]
    InvalidTime {
        requested: VirtualTime,
        now: VirtualTime,
    },

    /// `now + delay` does not fit in a `VirtualTime`.
    #[error("virtual time overflow: {now} + {delay}")]
    TimeOverflow {
        now: VirtualTime,
        delay: SimDuration,
    },

    /// A periodic source was configured with a zero or negative interval.
    #[error("periodic interval must be positive, got {interval}")]
    InvalidInterval { interval: SimDuration },

    // ── Run-loop errors ───────────────────────────────────

    /// No live event is left to pop.
    #[error("no pending events")]
    EmptyQueue,

    /// The configured per-run event limit was reached.
    #[error("event limit of {limit} exceeded")]
    EventLimitExceeded { limit: u64 },

    /// A callback returned an error; the run loop was aborted.
    #[error("callback for {event} at {time} failed: {source}")]
    Callback {
        event: EventId,
        time: VirtualTime,
        #[source]
        source: BoxError,
    },

    // ── Lifecycle errors ──────────────────────────────────

    /// Any call after `destroy()`.
    #[error("simulation has been destroyed")]
    Destroyed,
}

/// Convenience alias for `Result<T, KernelError>`.
pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_negative_delay() {
        let e = KernelError::NegativeDelay {
            delay: SimDuration::from_secs(-1),
        };
        assert_eq!(e.to_string(), "cannot schedule with negative delay -1.000000000s");
    }

    #[test]
    fn test_error_display_invalid_time() {
        let e = KernelError::InvalidTime {
            requested: VirtualTime::from_secs(3),
            now: VirtualTime::from_secs(10),
        };
        let s = e.to_string();
        assert!(s.contains("T=3.000000000s"));
        assert!(s.contains("T=10.000000000s"));
    }

    #[test]
    fn test_callback_error_keeps_source() {
        let e = KernelError::Callback {
            event: EventId::new(7),
            time: VirtualTime::ZERO,
            source: "socket closed".into(),
        };
        assert!(e.to_string().contains("E#7"));
        let source = std::error::Error::source(&e).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("socket closed"));
    }

    #[test]
    fn test_error_display_invalid_interval() {
        let e = KernelError::InvalidInterval {
            interval: SimDuration::ZERO,
        };
        assert_eq!(e.to_string(), "periodic interval must be positive, got +0.000000000s");
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(KernelError::Destroyed);
        assert!(!e.to_string().is_empty());
    }
}
