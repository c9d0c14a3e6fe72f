//! Execution context attached to an event.

/// Identifies the simulated entity an event runs on behalf of, usually
/// a node index.
///
/// The kernel never interprets the value; it only makes it visible to
/// the callback through `SimulationContext::current_context`. Events
/// scheduled from inside a callback inherit the firing event's context
/// unless one is given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ContextId(u32);

impl ContextId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        ContextId(id)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for ContextId {
    fn from(id: u32) -> Self {
        ContextId(id)
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "N{}", self.0)
    }
}
