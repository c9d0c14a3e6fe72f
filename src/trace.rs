//! Fired-event trace for replay verification.
//!
//! When enabled through `SimulationConfig::record_trace`, the run loop
//! appends one record per fired event. Two runs built from the same
//! sequence of `schedule` calls must produce identical traces, so the
//! trace hash is a cheap determinism check.

use std::io::{self, Write};

use crate::context::ContextId;
use crate::event::EventId;
use crate::time::VirtualTime;

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// One fired event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct FiredEvent {
    pub id: EventId,
    pub time: VirtualTime,
    pub context: Option<ContextId>,
}

/// Append-only log of fired events.
#[derive(Debug, Clone, Default)]
pub struct EventTrace {
    records: Vec<FiredEvent>,
}

impl EventTrace {
    pub fn new() -> Self {
        EventTrace {
            records: Vec::new(),
        }
    }

    pub fn record(&mut self, fired: FiredEvent) {
        self.records.push(fired);
    }

    pub fn records(&self) -> &[FiredEvent] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Deterministic hash over ids, times and contexts, in firing order.
    pub fn trace_hash(&self) -> u64 {
        self.records.iter().fold(0u64, |h, r| {
            let h = hash_combine(h, r.id.raw());
            let h = hash_combine(h, r.time.as_nanos());
            hash_combine(h, r.context.map_or(u64::MAX, |c| u64::from(c.raw())))
        })
    }

    /// Write the trace as text, one `F <id> <nanos> <context|->` line per event.
    pub fn export<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "# KAIROS TRACE v1")?;
        writeln!(w, "# events: {}", self.records.len())?;
        for r in &self.records {
            match r.context {
                Some(c) => writeln!(w, "F {} {} {}", r.id.raw(), r.time.as_nanos(), c.raw())?,
                None => writeln!(w, "F {} {} -", r.id.raw(), r.time.as_nanos())?,
            }
        }
        writeln!(w, "# hash: {:016x}", self.trace_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fired(id: u64, time: u64, context: Option<u32>) -> FiredEvent {
        FiredEvent {
            id: EventId::new(id),
            time: VirtualTime::from_nanos(time),
            context: context.map(ContextId::new),
        }
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        let mut a = EventTrace::new();
        a.record(fired(0, 1, None));
        a.record(fired(1, 2, Some(3)));

        let mut b = EventTrace::new();
        b.record(fired(1, 2, Some(3)));
        b.record(fired(0, 1, None));

        assert_ne!(a.trace_hash(), b.trace_hash());
        assert_eq!(a.trace_hash(), a.clone().trace_hash());
    }

    #[test]
    fn test_hash_distinguishes_context() {
        let mut a = EventTrace::new();
        a.record(fired(0, 1, None));
        let mut b = EventTrace::new();
        b.record(fired(0, 1, Some(0)));
        assert_ne!(a.trace_hash(), b.trace_hash());
    }

    #[test]
    fn test_export_format() {
        let mut t = EventTrace::new();
        t.record(fired(4, 1_000, Some(2)));
        t.record(fired(5, 2_000, None));

        let mut out = Vec::new();
        t.export(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# KAIROS TRACE v1");
        assert_eq!(lines[1], "# events: 2");
        assert_eq!(lines[2], "F 4 1000 2");
        assert_eq!(lines[3], "F 5 2000 -");
        assert!(lines[4].starts_with("# hash: "));
    }
}
