//! Virtual time for the discrete-event kernel.
//!
//! `VirtualTime` is an absolute, non-negative timestamp with nanosecond
//! resolution. `SimDuration` is a signed offset: delays come from user
//! code and a negative delay must be representable so it can be rejected
//! rather than silently wrapped.

use std::fmt;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

// ── VirtualTime ───────────────────────────────────────────────────────

/// An absolute point in simulated time, in nanoseconds since the start
/// of the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The zero-point of simulation time.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// The largest representable timestamp.
    pub const MAX: VirtualTime = VirtualTime(u64::MAX);

    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        VirtualTime(nanos)
    }

    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        VirtualTime(micros.saturating_mul(NANOS_PER_MICRO))
    }

    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        VirtualTime(millis.saturating_mul(NANOS_PER_MILLI))
    }

    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        VirtualTime(secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Raw nanosecond count.
    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Seconds as a float, for reporting only.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// The time `delay` after `self`.
    ///
    /// Returns `None` if the result would be negative or overflow.
    #[inline]
    pub fn checked_add(self, delay: SimDuration) -> Option<VirtualTime> {
        if delay.is_negative() {
            self.0.checked_sub(delay.0.unsigned_abs()).map(VirtualTime)
        } else {
            self.0.checked_add(delay.0 as u64).map(VirtualTime)
        }
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: VirtualTime) -> bool {
        self.0 < other.0
    }

    /// Signed offset from `earlier` to `self`.
    ///
    /// Returns `None` if the distance does not fit an `i64`.
    pub fn duration_since(self, earlier: VirtualTime) -> Option<SimDuration> {
        let diff = i128::from(self.0) - i128::from(earlier.0);
        i64::try_from(diff).ok().map(SimDuration)
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T={}.{:09}s",
            self.0 / NANOS_PER_SEC,
            self.0 % NANOS_PER_SEC
        )
    }
}

// ── SimDuration ───────────────────────────────────────────────────────

/// A signed span of simulated time, in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimDuration(i64);

impl SimDuration {
    pub const ZERO: SimDuration = SimDuration(0);

    #[inline]
    pub const fn from_nanos(nanos: i64) -> Self {
        SimDuration(nanos)
    }

    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        SimDuration(micros.saturating_mul(NANOS_PER_MICRO as i64))
    }

    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        SimDuration(millis.saturating_mul(NANOS_PER_MILLI as i64))
    }

    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        SimDuration(secs.saturating_mul(NANOS_PER_SEC as i64))
    }

    /// Fractional seconds, rounded to the nearest nanosecond and
    /// saturated at the `i64` range. NaN maps to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        // `as` saturates on overflow and maps NaN to 0.
        SimDuration((secs * NANOS_PER_SEC as f64).round() as i64)
    }

    #[inline]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `self * n`, saturating at the `i64` range.
    #[inline]
    pub const fn saturating_mul(self, n: i64) -> Self {
        SimDuration(self.0.saturating_mul(n))
    }
}

impl From<std::time::Duration> for SimDuration {
    /// Saturates at `i64::MAX` nanoseconds (about 292 years).
    fn from(d: std::time::Duration) -> Self {
        SimDuration(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "+" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:09}s", sign, abs / NANOS_PER_SEC, abs % NANOS_PER_SEC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(VirtualTime::ZERO.as_nanos(), 0);
        assert_eq!(SimDuration::ZERO.as_nanos(), 0);
    }

    #[test]
    fn test_unit_constructors() {
        assert_eq!(VirtualTime::from_secs(2).as_nanos(), 2_000_000_000);
        assert_eq!(VirtualTime::from_millis(3).as_nanos(), 3_000_000);
        assert_eq!(VirtualTime::from_micros(4).as_nanos(), 4_000);
        assert_eq!(SimDuration::from_millis(-5).as_nanos(), -5_000_000);
        assert_eq!(SimDuration::from_secs_f64(1.5).as_nanos(), 1_500_000_000);
    }

    #[test]
    fn test_ordering() {
        let t1 = VirtualTime::from_nanos(10);
        let t2 = VirtualTime::from_nanos(20);
        assert!(t1 < t2);
        assert!(t1.is_before(t2));
        assert!(!t2.is_before(t1));
    }

    #[test]
    fn test_checked_add() {
        let t = VirtualTime::from_nanos(100);
        assert_eq!(
            t.checked_add(SimDuration::from_nanos(50)),
            Some(VirtualTime::from_nanos(150))
        );
        assert_eq!(
            t.checked_add(SimDuration::from_nanos(-40)),
            Some(VirtualTime::from_nanos(60))
        );
        assert_eq!(t.checked_add(SimDuration::from_nanos(-101)), None);
        assert_eq!(VirtualTime::MAX.checked_add(SimDuration::from_nanos(1)), None);
    }

    #[test]
    fn test_duration_since() {
        let t1 = VirtualTime::from_nanos(10);
        let t2 = VirtualTime::from_nanos(30);
        assert_eq!(t2.duration_since(t1), Some(SimDuration::from_nanos(20)));
        assert_eq!(t1.duration_since(t2), Some(SimDuration::from_nanos(-20)));
        assert_eq!(VirtualTime::MAX.duration_since(VirtualTime::ZERO), None);
    }

    #[test]
    fn test_from_std_duration() {
        let d = SimDuration::from(std::time::Duration::from_millis(250));
        assert_eq!(d, SimDuration::from_millis(250));
        let huge = SimDuration::from(std::time::Duration::from_secs(u64::MAX));
        assert_eq!(huge.as_nanos(), i64::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(VirtualTime::from_millis(1500).to_string(), "T=1.500000000s");
        assert_eq!(SimDuration::from_millis(-250).to_string(), "-0.250000000s");
        assert_eq!(SimDuration::from_nanos(7).to_string(), "+0.000000007s");
    }
}
