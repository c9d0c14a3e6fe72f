//! Simulation execution loop.
//!
//! `Simulation` owns the clock and the event queue and drives them: pop
//! the earliest live event, advance virtual time, run its callback. The
//! loop is synchronous and single-threaded, so a fixed sequence of
//! `schedule` calls always replays identically.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`context`] | [`SimulationContext`], the handle passed to callbacks |
//! | [`pacing`] | wall-clock pacing for realtime mode |

pub mod context;
mod pacing;


use tracing::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::config::SimulationConfig;
use crate::context::ContextId;
use crate::error::{KernelError, KernelResult};
use crate::event::{boxed, Callback, CallbackOutcome, Event, EventId, EventIdGen};
use crate::queue::EventQueue;
use crate::time::{SimDuration, VirtualTime};
use crate::trace::{EventTrace, FiredEvent};

pub use context::SimulationContext;
use pacing::Pacer;

// ── Lifecycle ─────────────────────────────────────────────────────────

/// Lifecycle of a `Simulation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    /// Created, never run.
    Idle,
    /// Inside `run()`.
    Running,
    /// `run()` has returned. Another `run()` resumes from here.
    Stopping,
    /// `destroy()` has been called. Terminal.
    Destroyed,
}

/// When the run loop should halt even though events remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    Never,
    /// Halt before the next event.
    Immediate,
    /// Fire events with `time <= deadline`, then halt.
    At(VirtualTime),
}

impl StopCondition {
    /// The stricter of two conditions.
    fn earliest(self, other: StopCondition) -> StopCondition {
        match (self, other) {
            (StopCondition::Never, x) | (x, StopCondition::Never) => x,
            (StopCondition::Immediate, _) | (_, StopCondition::Immediate) => {
                StopCondition::Immediate
            }
            (StopCondition::At(a), StopCondition::At(b)) => StopCondition::At(a.min(b)),
        }
    }
}

/// Why `run()` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// No live events remain; the simulation is over.
    QueueEmpty,
    /// The next event lies past the `stop_at` deadline.
    StopDeadline,
    /// `stop()` (or `stop_at` with a past time) was called.
    StopRequested,
}

/// Outcome of a `run()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Events whose callbacks ran during this call.
    pub events_fired: u64,
    /// Cancelled events popped and thrown away during this call.
    pub events_discarded: u64,
    /// Clock value when the loop exited.
    pub final_time: VirtualTime,
    pub reason: HaltReason,
}

// ── Kernel ────────────────────────────────────────────────────────────

/// Clock, queue and stop condition: the state a callback may touch.
pub(crate) struct Kernel {
    pub(crate) clock: Clock,
    pub(crate) queue: EventQueue,
    ids: EventIdGen,
    pub(crate) stop: StopCondition,
    /// Context of the event currently firing.
    pub(crate) current_context: Option<ContextId>,
    /// Run once by `destroy()`, in registration order.
    destroy_callbacks: Vec<(EventId, Callback)>,
    destroy_ids: EventIdGen,
}

impl Kernel {
    fn new() -> Self {
        Kernel {
            clock: Clock::new(),
            queue: EventQueue::new(),
            ids: EventIdGen::new(),
            stop: StopCondition::Never,
            current_context: None,
            destroy_callbacks: Vec::new(),
            // Destroy callbacks never enter the queue; give them ids from
            // the top of the range so they cannot collide with queue ids.
            destroy_ids: EventIdGen::starting_at(1 << 63),
        }
    }

    #[inline]
    pub(crate) fn now(&self) -> VirtualTime {
        self.clock.now()
    }

    pub(crate) fn deadline(&self, delay: SimDuration) -> KernelResult<VirtualTime> {
        if delay.is_negative() {
            return Err(KernelError::NegativeDelay { delay });
        }
        self.now()
            .checked_add(delay)
            .ok_or(KernelError::TimeOverflow {
                now: self.now(),
                delay,
            })
    }

    pub(crate) fn insert(
        &mut self,
        at: VirtualTime,
        context: Option<ContextId>,
        callback: Callback,
    ) -> KernelResult<EventId> {
        let now = self.now();
        if at < now {
            return Err(KernelError::InvalidTime { requested: at, now });
        }
        let id = self.ids.next_id();
        self.queue.insert(Event::new(id, at, context, callback), now)?;
        trace!(%id, %at, ?context, pending = self.queue.len(), "scheduled");
        Ok(id)
    }

    pub(crate) fn insert_destroy(&mut self, callback: Callback) -> EventId {
        let id = self.destroy_ids.next_id();
        self.destroy_callbacks.push((id, callback));
        trace!(%id, pending = self.destroy_callbacks.len(), "destroy callback registered");
        id
    }

    /// Cancel a queued event or a registered destroy callback.
    pub(crate) fn cancel(&mut self, id: EventId) -> bool {
        if let Some(pos) = self.destroy_callbacks.iter().position(|(d, _)| *d == id) {
            drop(self.destroy_callbacks.remove(pos));
            debug!(%id, "destroy callback cancelled");
            return true;
        }
        let cancelled = self.queue.remove(id);
        if cancelled {
            debug!(%id, now = %self.now(), "cancelled");
        }
        cancelled
    }

    pub(crate) fn is_pending(&self, id: EventId) -> bool {
        self.queue.contains(id) || self.destroy_callbacks.iter().any(|(d, _)| *d == id)
    }

    pub(crate) fn delay_left(&self, id: EventId) -> SimDuration {
        self.queue
            .time_of(id)
            .and_then(|t| t.duration_since(self.now()))
            .unwrap_or(SimDuration::ZERO)
    }

    pub(crate) fn request_stop(&mut self, condition: StopCondition) {
        let condition = match condition {
            StopCondition::At(t) if t < self.now() => StopCondition::Immediate,
            other => other,
        };
        self.stop = self.stop.earliest(condition);
        debug!(now = %self.now(), stop = ?self.stop, "stop requested");
    }
}

// ── Simulation ────────────────────────────────────────────────────────

/// Top-level simulation driver.
///
/// There is no global simulator: create one `Simulation`, seed it with
/// events, call [`run`](Self::run), then [`destroy`](Self::destroy).
/// Callbacks receive a [`SimulationContext`] through which they schedule
/// follow-up events, cancel events and request a stop.
pub struct Simulation {
    kernel: Kernel,
    state: SimState,
    config: SimulationConfig,
    events_fired: u64,
    trace: EventTrace,
}

impl Simulation {
    /// Create a new simulation at time zero with the default config.
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    /// Create a new simulation at time zero with the given config.
    pub fn with_config(config: SimulationConfig) -> Self {
        Simulation {
            kernel: Kernel::new(),
            state: SimState::Idle,
            config,
            events_fired: 0,
            trace: EventTrace::new(),
        }
    }

    /// The config this simulation was built with.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn ensure_alive(&self) -> KernelResult<()> {
        if self.state == SimState::Destroyed {
            return Err(KernelError::Destroyed);
        }
        Ok(())
    }

    // ── Observation ───────────────────────────────────────────

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.kernel.now()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SimState {
        self.state
    }

    /// Number of live events waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.kernel.queue.len()
    }

    /// Total events fired over the lifetime of this simulation.
    pub fn events_fired(&self) -> u64 {
        self.events_fired
    }

    /// Returns `true` if no live events remain.
    pub fn is_finished(&self) -> bool {
        self.kernel.queue.is_empty()
    }

    /// Time of the next live event, if any.
    pub fn next_event_time(&mut self) -> Option<VirtualTime> {
        self.kernel.queue.next_time()
    }

    /// The latest time an event can be scheduled for.
    pub fn maximum_time(&self) -> VirtualTime {
        VirtualTime::MAX
    }

    /// The stop condition currently in force.
    pub fn stop_condition(&self) -> StopCondition {
        self.kernel.stop
    }

    /// Fired-event trace. Empty unless `record_trace` is configured.
    pub fn trace(&self) -> &EventTrace {
        &self.trace
    }

    // ── Scheduling ────────────────────────────────────────────

    /// Schedule `f` to fire `delay` after now, without a context.
    pub fn schedule<F, R>(&mut self, delay: SimDuration, f: F) -> KernelResult<EventId>
    where
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome,
    {
        self.ensure_alive()?;
        let at = self.kernel.deadline(delay)?;
        self.kernel.insert(at, None, boxed(f))
    }

    /// Schedule `f` to fire `delay` after now on behalf of `context`.
    pub fn schedule_with_context<F, R>(
        &mut self,
        context: ContextId,
        delay: SimDuration,
        f: F,
    ) -> KernelResult<EventId>
    where
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome,
    {
        self.ensure_alive()?;
        let at = self.kernel.deadline(delay)?;
        self.kernel.insert(at, Some(context), boxed(f))
    }

    /// Schedule `f` for the current instant, behind everything already
    /// queued for it.
    pub fn schedule_now<F, R>(&mut self, f: F) -> KernelResult<EventId>
    where
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome,
    {
        self.schedule(SimDuration::ZERO, f)
    }

    /// Schedule `f` at an absolute time. Fails if `at` is in the past.
    pub fn schedule_at<F, R>(&mut self, at: VirtualTime, f: F) -> KernelResult<EventId>
    where
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome,
    {
        self.ensure_alive()?;
        self.kernel.insert(at, None, boxed(f))
    }

    /// Schedule `f` at an absolute time on behalf of `context`.
    pub fn schedule_at_with_context<F, R>(
        &mut self,
        context: ContextId,
        at: VirtualTime,
        f: F,
    ) -> KernelResult<EventId>
    where
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome,
    {
        self.ensure_alive()?;
        self.kernel.insert(at, Some(context), boxed(f))
    }

    /// Register `f` to run once when the simulation is destroyed.
    ///
    /// Destroy callbacks run in registration order before the queue is
    /// drained. They can be cancelled like any other event.
    pub fn schedule_destroy<F, R>(&mut self, f: F) -> KernelResult<EventId>
    where
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome,
    {
        self.ensure_alive()?;
        Ok(self.kernel.insert_destroy(boxed(f)))
    }

    /// Cancel a pending event.
    ///
    /// Returns `Ok(false)` if the event already fired, was already
    /// cancelled, or never existed.
    pub fn cancel(&mut self, id: EventId) -> KernelResult<bool> {
        self.ensure_alive()?;
        Ok(self.kernel.cancel(id))
    }

    /// Whether `id` is still waiting to fire.
    pub fn is_pending(&self, id: EventId) -> KernelResult<bool> {
        self.ensure_alive()?;
        Ok(self.kernel.is_pending(id))
    }

    /// Whether `id` has fired or been cancelled.
    pub fn is_expired(&self, id: EventId) -> KernelResult<bool> {
        self.is_pending(id).map(|pending| !pending)
    }

    /// Time remaining until `id` fires; zero if it is not pending.
    pub fn delay_left(&self, id: EventId) -> KernelResult<SimDuration> {
        self.ensure_alive()?;
        Ok(self.kernel.delay_left(id))
    }

    // ── Stopping ──────────────────────────────────────────────

    /// Halt the run loop before the next event.
    pub fn stop(&mut self) -> KernelResult<()> {
        self.ensure_alive()?;
        self.kernel.request_stop(StopCondition::Immediate);
        Ok(())
    }

    /// Let events up to and including `at` fire, then halt.
    ///
    /// A time already in the past behaves like [`stop`](Self::stop).
    pub fn stop_at(&mut self, at: VirtualTime) -> KernelResult<()> {
        self.ensure_alive()?;
        self.kernel.request_stop(StopCondition::At(at));
        Ok(())
    }

    /// `stop_at(now + delay)`.
    pub fn stop_after(&mut self, delay: SimDuration) -> KernelResult<()> {
        self.ensure_alive()?;
        let at = self.kernel.deadline(delay)?;
        self.kernel.request_stop(StopCondition::At(at));
        Ok(())
    }

    // ── Execution ─────────────────────────────────────────────

    /// Pop the earliest live event, advance the clock and fire it.
    fn fire_next(&mut self) -> KernelResult<Option<FiredEvent>> {
        let event = self.kernel.queue.pop_min()?;
        if !event.valid {
            trace!(id = %event.id, "discarding cancelled event");
            return Ok(None);
        }

        self.kernel.clock.advance_to(event.time)?;
        self.kernel.current_context = event.context;
        let fired = FiredEvent {
            id: event.id,
            time: event.time,
            context: event.context,
        };
        trace!(id = %fired.id, time = %fired.time, context = ?fired.context, "firing");

        let result = event.fire(&mut SimulationContext::new(&mut self.kernel));

        self.kernel.current_context = None;
        self.events_fired += 1;
        if self.config.record_trace {
            self.trace.record(fired);
        }

        result.map_err(|source| KernelError::Callback {
            event: fired.id,
            time: fired.time,
            source,
        })?;
        Ok(Some(fired))
    }

    /// Fire exactly one live event, ignoring any stop condition.
    ///
    /// Fails with `EmptyQueue` when nothing is left to fire.
    pub fn step(&mut self) -> KernelResult<FiredEvent> {
        self.ensure_alive()?;
        loop {
            if let Some(fired) = self.fire_next()? {
                return Ok(fired);
            }
        }
    }

    /// Run until no events remain or a stop condition halts the loop.
    ///
    /// A callback error aborts the loop and is returned as
    /// [`KernelError::Callback`]; the simulation is left in `Stopping`
    /// and may be resumed.
    #[tracing::instrument(skip(self), fields(start = %self.kernel.now()))]
    pub fn run(&mut self) -> KernelResult<RunSummary> {
        self.ensure_alive()?;
        self.state = SimState::Running;
        info!(pending = self.kernel.queue.len(), "simulation started");

        let mut fired = 0u64;
        let mut discarded = 0u64;
        let outcome = self.run_loop(&mut fired, &mut discarded);
        self.state = SimState::Stopping;

        let reason = match outcome {
            Ok(reason) => reason,
            Err(e) => {
                warn!(error = %e, now = %self.kernel.now(), "simulation aborted");
                return Err(e);
            }
        };

        let summary = RunSummary {
            events_fired: fired,
            events_discarded: discarded,
            final_time: self.kernel.now(),
            reason,
        };
        info!(
            fired,
            discarded,
            final_time = %summary.final_time,
            ?reason,
            "simulation halted"
        );
        Ok(summary)
    }

    fn run_loop(&mut self, fired: &mut u64, discarded: &mut u64) -> KernelResult<HaltReason> {
        let mut pacer = Pacer::new(self.config.pacing, self.kernel.now());

        loop {
            if self.kernel.stop == StopCondition::Immediate {
                self.kernel.stop = StopCondition::Never;
                return Ok(HaltReason::StopRequested);
            }

            let Some((next, live)) = self.kernel.queue.peek_key() else {
                // The deadline, if any, stays in force for a later run.
                return Ok(HaltReason::QueueEmpty);
            };

            // Cancelled entries are dropped before any stop or limit check
            // so they never count as remaining work.
            if !live {
                self.fire_next()?;
                *discarded += 1;
                continue;
            }

            if let StopCondition::At(deadline) = self.kernel.stop {
                if next > deadline {
                    self.kernel.stop = StopCondition::Never;
                    // `step()` may already have carried the clock past it.
                    if deadline < self.kernel.now() {
                        return Ok(HaltReason::StopRequested);
                    }
                    self.kernel.clock.advance_to(deadline)?;
                    return Ok(HaltReason::StopDeadline);
                }
            }

            if let Some(limit) = self.config.max_events {
                if *fired >= limit {
                    return Err(KernelError::EventLimitExceeded { limit });
                }
            }

            pacer.wait_until(next);
            match self.fire_next()? {
                Some(_) => *fired += 1,
                None => *discarded += 1,
            }
        }
    }

    /// Tear the simulation down.
    ///
    /// Runs destroy callbacks, then drops every pending event without
    /// firing it. Calling `destroy` again is a no-op; every other
    /// operation fails with [`KernelError::Destroyed`].
    pub fn destroy(&mut self) -> KernelResult<()> {
        if self.state == SimState::Destroyed {
            return Ok(());
        }

        let callbacks = std::mem::take(&mut self.kernel.destroy_callbacks);
        let mut first_error = None;
        for (id, callback) in callbacks {
            let result = callback(&mut SimulationContext::new(&mut self.kernel));
            if let Err(source) = result {
                warn!(%id, error = %source, "destroy callback failed");
                if first_error.is_none() {
                    first_error = Some(KernelError::Callback {
                        event: id,
                        time: self.kernel.now(),
                        source,
                    });
                }
            }
        }

        let dropped = self.kernel.queue.clear();
        self.kernel.stop = StopCondition::Never;
        self.trace.clear();
        self.state = SimState::Destroyed;
        info!(dropped, now = %self.kernel.now(), "simulation destroyed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("now", &self.kernel.now())
            .field("state", &self.state)
            .field("pending", &self.kernel.queue.len())
            .field("events_fired", &self.events_fired)
            .finish_non_exhaustive()
    }
}

// ── Scheduler trait ───────────────────────────────────────────────────

/// Scheduling operations shared by [`Simulation`] (outside callbacks)
/// and [`SimulationContext`] (inside them).
///
/// Helpers such as [`Timer`](crate::timer::Timer) are generic over this
/// trait so they work in both places.
pub trait Scheduler {
    fn now(&self) -> VirtualTime;

    fn schedule<F, R>(&mut self, delay: SimDuration, f: F) -> KernelResult<EventId>
    where
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome;

    fn cancel(&mut self, id: EventId) -> KernelResult<bool>;

    fn is_pending(&self, id: EventId) -> KernelResult<bool>;

    fn delay_left(&self, id: EventId) -> KernelResult<SimDuration>;
}

impl Scheduler for Simulation {
    fn now(&self) -> VirtualTime {
        Simulation::now(self)
    }

    fn schedule<F, R>(&mut self, delay: SimDuration, f: F) -> KernelResult<EventId>
    where
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome,
    {
        Simulation::schedule(self, delay, f)
    }

    fn cancel(&mut self, id: EventId) -> KernelResult<bool> {
        Simulation::cancel(self, id)
    }

    fn is_pending(&self, id: EventId) -> KernelResult<bool> {
        Simulation::is_pending(self, id)
    }

    fn delay_left(&self, id: EventId) -> KernelResult<SimDuration> {
        Simulation::delay_left(self, id)
    }
}
