//! `SimulationContext`: what a firing callback can do to the kernel.

use crate::context::ContextId;
use crate::error::KernelResult;
use crate::event::{boxed, CallbackOutcome, EventId};
use crate::time::{SimDuration, VirtualTime};

use super::{Kernel, Scheduler, StopCondition};

/// Mutable handle passed to every callback.
///
/// Borrows the kernel for the duration of one callback, so a callback
/// can schedule, cancel and stop but cannot re-enter `run()` or destroy
/// the simulation underneath the loop.
///
/// Events scheduled through the context inherit the firing event's
/// execution context; use [`schedule_with_context`](Self::schedule_with_context)
/// to hand work to another node.
pub struct SimulationContext<'a> {
    kernel: &'a mut Kernel,
}

impl<'a> SimulationContext<'a> {
    pub(crate) fn new(kernel: &'a mut Kernel) -> Self {
        SimulationContext { kernel }
    }

    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.kernel.now()
    }

    /// Context of the event being fired, if it has one.
    #[inline]
    pub fn current_context(&self) -> Option<ContextId> {
        self.kernel.current_context
    }

    /// Schedule `f` to fire `delay` after now.
    ///
    /// A zero delay queues `f` behind every event already scheduled for
    /// the current instant.
    pub fn schedule<F, R>(&mut self, delay: SimDuration, f: F) -> KernelResult<EventId>
    where
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome,
    {
        let at = self.kernel.deadline(delay)?;
        let context = self.kernel.current_context;
        self.kernel.insert(at, context, boxed(f))
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
        let at = self.kernel.deadline(delay)?;
        self.kernel.insert(at, Some(context), boxed(f))
    }

    /// Schedule `f` behind everything already queued for this instant.
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
        let context = self.kernel.current_context;
        self.kernel.insert(at, context, boxed(f))
    }

    /// Cancel a pending event. Takes effect before this call returns,
    /// even for events due at the current instant.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.kernel.cancel(id)
    }

    /// Whether `id` is still waiting to fire, including destroy callbacks.
    pub fn is_pending(&self, id: EventId) -> bool {
        self.kernel.is_pending(id)
    }

    /// Time remaining until `id` fires; zero if it is not pending.
    pub fn delay_left(&self, id: EventId) -> SimDuration {
        self.kernel.delay_left(id)
    }

    /// Number of live events waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.kernel.queue.len()
    }

    /// Halt the loop once this callback returns.
    pub fn stop(&mut self) {
        self.kernel.request_stop(StopCondition::Immediate);
    }

    /// Let events up to and including `at` fire, then halt.
    pub fn stop_at(&mut self, at: VirtualTime) {
        self.kernel.request_stop(StopCondition::At(at));
    }

    /// `stop_at(now + delay)`.
    pub fn stop_after(&mut self, delay: SimDuration) -> KernelResult<()> {
        let at = self.kernel.deadline(delay)?;
        self.kernel.request_stop(StopCondition::At(at));
        Ok(())
    }
}

impl Scheduler for SimulationContext<'_> {
    fn now(&self) -> VirtualTime {
        SimulationContext::now(self)
    }

    fn schedule<F, R>(&mut self, delay: SimDuration, f: F) -> KernelResult<EventId>
    where
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome,
    {
        SimulationContext::schedule(self, delay, f)
    }

    fn cancel(&mut self, id: EventId) -> KernelResult<bool> {
        Ok(SimulationContext::cancel(self, id))
    }

    fn is_pending(&self, id: EventId) -> KernelResult<bool> {
        Ok(SimulationContext::is_pending(self, id))
    }

    fn delay_left(&self, id: EventId) -> KernelResult<SimDuration> {
        Ok(SimulationContext::delay_left(self, id))
    }
}
