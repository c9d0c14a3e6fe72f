//! Applications: entities with a start/stop lifecycle on the kernel.
//!
//! A traffic generator, a routing agent or a sink is installed with a
//! start time and an optional stop time. Both transitions are ordinary
//! events carrying the application's node as their context, so
//! everything the application schedules from `start` runs on that node.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::context::ContextId;
use crate::error::{KernelError, KernelResult};
use crate::simulation::{Simulation, SimulationContext};
use crate::time::{SimDuration, VirtualTime};
use crate::timer::Timer;

/// Lifecycle hooks invoked by the kernel.
pub trait Application {
    fn start(&mut self, ctx: &mut SimulationContext<'_>) -> KernelResult<()>;

    /// Must cancel anything the application still has pending.
    fn stop(&mut self, ctx: &mut SimulationContext<'_>) -> KernelResult<()>;
}

/// Shared handle to an installed application, for inspection after a run.
pub type AppHandle<A> = Rc<RefCell<A>>;

/// Install `app` on `node`, starting at `start` and stopping at `stop`.
pub fn install<A>(
    sim: &mut Simulation,
    node: ContextId,
    app: A,
    start: VirtualTime,
    stop: Option<VirtualTime>,
) -> KernelResult<AppHandle<A>>
where
    A: Application + 'static,
{
    let handle = Rc::new(RefCell::new(app));

    let app = Rc::clone(&handle);
    sim.schedule_at_with_context(node, start, move |ctx: &mut SimulationContext<'_>| {
        debug!(%node, now = %ctx.now(), "application start");
        app.borrow_mut().start(ctx)
    })?;

    if let Some(stop) = stop {
        let app = Rc::clone(&handle);
        sim.schedule_at_with_context(node, stop, move |ctx: &mut SimulationContext<'_>| {
            debug!(%node, now = %ctx.now(), "application stop");
            app.borrow_mut().stop(ctx)
        })?;
    }

    Ok(handle)
}

// ── PeriodicSource ────────────────────────────────────────────────────

/// Configuration for a [`PeriodicSource`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PeriodicSourceConfig {
    /// Gap between consecutive emissions.
    pub interval: SimDuration,
    /// Stop emitting after this many packets.
    pub max_packets: Option<u64>,
}

impl PeriodicSourceConfig {
    /// Emit every `interval`, without a packet limit.
    ///
    /// Fails with `InvalidInterval` unless `interval` is positive: a zero
    /// interval would re-arm at the same instant forever.
    pub fn new(interval: SimDuration) -> KernelResult<Self> {
        let config = Self {
            interval,
            max_packets: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check a config built or deserialised field by field.
    pub fn validate(&self) -> KernelResult<()> {
        if self.interval <= SimDuration::ZERO {
            return Err(KernelError::InvalidInterval {
                interval: self.interval,
            });
        }
        Ok(())
    }

    pub fn with_max_packets(mut self, max_packets: u64) -> Self {
        self.max_packets = Some(max_packets);
        self
    }
}

/// Called once per emission with the packet sequence number.
pub type EmitFn = Box<dyn FnMut(&mut SimulationContext<'_>, u64) -> KernelResult<()>>;

struct SourceState {
    config: PeriodicSourceConfig,
    sent: u64,
    running: bool,
    timer: Timer,
    on_emit: EmitFn,
}

/// Constant-rate packet generator.
///
/// Emits immediately on start, then every `interval`, until stopped or
/// `max_packets` is reached.
pub struct PeriodicSource {
    state: Rc<RefCell<SourceState>>,
}

impl PeriodicSource {
    pub fn new(config: PeriodicSourceConfig, on_emit: EmitFn) -> Self {
        PeriodicSource {
            state: Rc::new(RefCell::new(SourceState {
                config,
                sent: 0,
                running: false,
                timer: Timer::new(config.interval),
                on_emit,
            })),
        }
    }

    /// Packets emitted so far.
    pub fn sent(&self) -> u64 {
        self.state.borrow().sent
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    fn emit(state: Rc<RefCell<SourceState>>, ctx: &mut SimulationContext<'_>) -> KernelResult<()> {
        let mut st = state.borrow_mut();
        if !st.running {
            return Ok(());
        }

        let seq = st.sent;
        st.sent += 1;
        (st.on_emit)(ctx, seq)?;

        if st.config.max_packets.is_some_and(|max| st.sent >= max) {
            st.running = false;
            return Ok(());
        }

        let next = Rc::clone(&state);
        st.timer
            .schedule(ctx, move |ctx: &mut SimulationContext<'_>| Self::emit(next, ctx))?;
        Ok(())
    }
}

impl Application for PeriodicSource {
    fn start(&mut self, ctx: &mut SimulationContext<'_>) -> KernelResult<()> {
        {
            let mut st = self.state.borrow_mut();
            if st.running {
                return Ok(());
            }
            st.config.validate()?;
            st.running = true;
        }
        Self::emit(Rc::clone(&self.state), ctx)
    }

    fn stop(&mut self, ctx: &mut SimulationContext<'_>) -> KernelResult<()> {
        let mut st = self.state.borrow_mut();
        st.running = false;
        st.timer.cancel(ctx)?;
        Ok(())
    }
}
