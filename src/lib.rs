//! # Kairos: Deterministic Discrete-Event Simulation Kernel
//!
//! A single-threaded kernel that advances a virtual clock from event to
//! event. Callbacks are scheduled at a delay from now, fire in strict
//! (time, insertion) order, and may schedule, cancel or stop while
//! they run. Nothing advances virtual time except firing an event.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │   Application / Timer        │ ← start/stop lifecycles, re-armable expiries
//! │  ┌────────────────────────┐  │
//! │  │      Simulation         │  │ ← run loop, stop, destroy
//! │  │  ┌──────────────────┐  │  │
//! │  │  │   EventQueue     │  │  │ ← min-heap on (time, id) + tombstones
//! │  │  └──────────────────┘  │  │
//! │  │  ┌──────────────────┐  │  │
//! │  │  │   Event          │  │  │ ← one-shot callback records
//! │  │  └──────────────────┘  │  │
//! │  │  ┌──────────────────┐  │  │
//! │  │  │   Clock          │  │  │ ← monotonic virtual time
//! │  │  └──────────────────┘  │  │
//! │  └────────────────────────┘  │
//! └──────────────────────────────┘
//! ```

pub mod application;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod queue;
pub mod simulation;
pub mod time;
pub mod timer;
pub mod trace;

// Re-exports for convenience.
pub use application::{install, AppHandle, Application, PeriodicSource, PeriodicSourceConfig};
pub use clock::Clock;
pub use config::{PacingMode, SimulationConfig};
pub use context::ContextId;
pub use error::{BoxError, KernelError, KernelResult};
pub use event::{CallbackOutcome, Event, EventId, EventIdGen};
pub use queue::EventQueue;
pub use simulation::{
    HaltReason, RunSummary, Scheduler, SimState, Simulation, SimulationContext, StopCondition,
};
pub use time::{SimDuration, VirtualTime};
pub use timer::Timer;
pub use trace::{EventTrace, FiredEvent};
