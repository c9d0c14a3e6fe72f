//! Configuration types for a simulation.

/// How virtual time relates to wall-clock time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum PacingMode {
    /// Advance virtual time as fast as events can be processed.
    #[default]
    AsFastAsPossible,
    /// Sleep so that virtual time does not run ahead of wall-clock time
    /// scaled by `speed` (2.0 means twice as fast as real time).
    Realtime { speed: f64 },
}

/// Configuration for a `Simulation`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct SimulationConfig {
    /// Wall-clock pacing. Never affects firing order.
    pub pacing: PacingMode,

    /// Abort a single `run()` after this many fired events.
    pub max_events: Option<u64>,

    /// Record every fired event into the simulation's `EventTrace`.
    pub record_trace: bool,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self {
            pacing: PacingMode::AsFastAsPossible,
            max_events: None,
            record_trace: false,
        }
    }

    /// Set the pacing mode.
    pub fn with_pacing(mut self, pacing: PacingMode) -> Self {
        self.pacing = pacing;
        self
    }

    /// Pace against wall-clock time at the given speed-up.
    pub fn with_realtime(self, speed: f64) -> Self {
        self.with_pacing(PacingMode::Realtime { speed })
    }

    /// Limit the number of events one `run()` may fire.
    pub fn with_max_events(mut self, limit: u64) -> Self {
        self.max_events = Some(limit);
        self
    }

    /// Enable the fired-event trace.
    pub fn with_trace(mut self) -> Self {
        self.record_trace = true;
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = SimulationConfig::new()
            .with_realtime(4.0)
            .with_max_events(10)
            .with_trace();
        assert_eq!(config.pacing, PacingMode::Realtime { speed: 4.0 });
        assert_eq!(config.max_events, Some(10));
        assert!(config.record_trace);
    }

    #[test]
    fn test_default_is_unpaced() {
        let config = SimulationConfig::default();
        assert_eq!(config.pacing, PacingMode::AsFastAsPossible);
        assert_eq!(config.max_events, None);
        assert!(!config.record_trace);
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_deserialize_partial() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{ "max_events": 5 }"#).unwrap();
        assert_eq!(config.max_events, Some(5));
        assert_eq!(config.pacing, PacingMode::AsFastAsPossible);
    }
}
