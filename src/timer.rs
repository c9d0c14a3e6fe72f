//! One-shot, re-armable timer on top of schedule/cancel.
//!
//! Applications keep "the next send" or "the next retransmission" as a
//! single pending event that is replaced or cancelled as state changes.
//! `Timer` packages that: arming cancels whatever expiry was pending.

use crate::error::KernelResult;
use crate::event::{CallbackOutcome, EventId};
use crate::simulation::{Scheduler, SimulationContext};
use crate::time::SimDuration;

#[derive(Debug, Clone)]
pub struct Timer {
    delay: SimDuration,
    pending: Option<EventId>,
}

impl Timer {
    /// Create an idle timer that expires `delay` after each `schedule`.
    pub fn new(delay: SimDuration) -> Self {
        Timer {
            delay,
            pending: None,
        }
    }

    /// Delay used by the next `schedule`.
    pub fn delay(&self) -> SimDuration {
        self.delay
    }

    /// Change the delay used by the next `schedule`. A pending expiry
    /// keeps its original deadline.
    pub fn set_delay(&mut self, delay: SimDuration) {
        self.delay = delay;
    }

    /// Cancel any pending expiry and schedule `f` after the timer delay.
    pub fn schedule<S, F, R>(&mut self, sched: &mut S, f: F) -> KernelResult<EventId>
    where
        S: Scheduler,
        F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
        R: CallbackOutcome,
    {
        self.cancel(sched)?;
        let id = sched.schedule(self.delay, f)?;
        self.pending = Some(id);
        Ok(id)
    }

    /// Cancel the pending expiry. Returns `true` if one was cancelled.
    pub fn cancel<S: Scheduler>(&mut self, sched: &mut S) -> KernelResult<bool> {
        match self.pending.take() {
            Some(id) => sched.cancel(id),
            None => Ok(false),
        }
    }

    /// Whether an expiry is still pending.
    pub fn is_running<S: Scheduler>(&self, sched: &S) -> KernelResult<bool> {
        match self.pending {
            Some(id) => sched.is_pending(id),
            None => Ok(false),
        }
    }

    /// Time left until expiry; zero when not running.
    pub fn delay_left<S: Scheduler>(&self, sched: &S) -> KernelResult<SimDuration> {
        match self.pending {
            Some(id) => sched.delay_left(id),
            None => Ok(SimDuration::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::simulation::Simulation;
    use crate::time::VirtualTime;

    #[test]
    fn test_rearm_replaces_pending_expiry() {
        let mut sim = Simulation::new();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let mut timer = Timer::new(SimDuration::from_secs(2));

        let out = Rc::clone(&fired);
        timer
            .schedule(&mut sim, move |ctx: &mut SimulationContext<'_>| {
                out.borrow_mut().push(("first", ctx.now()));
            })
            .unwrap();
        timer.set_delay(SimDuration::from_secs(3));
        let out = Rc::clone(&fired);
        timer
            .schedule(&mut sim, move |ctx: &mut SimulationContext<'_>| {
                out.borrow_mut().push(("second", ctx.now()));
            })
            .unwrap();

        assert!(timer.is_running(&sim).unwrap());
        assert_eq!(timer.delay_left(&sim).unwrap(), SimDuration::from_secs(3));
        assert_eq!(sim.pending_count(), 1);

        sim.run().unwrap();

        assert_eq!(*fired.borrow(), vec![("second", VirtualTime::from_secs(3))]);
        assert!(!timer.is_running(&sim).unwrap());
    }

    #[test]
    fn test_cancel() {
        let mut sim = Simulation::new();
        let mut timer = Timer::new(SimDuration::from_millis(10));
        assert!(!timer.cancel(&mut sim).unwrap());

        timer
            .schedule(&mut sim, |_ctx: &mut SimulationContext<'_>| {})
            .unwrap();
        assert!(timer.cancel(&mut sim).unwrap());
        assert_eq!(timer.delay_left(&sim).unwrap(), SimDuration::ZERO);

        let summary = sim.run().unwrap();
        assert_eq!(summary.events_fired, 0);
    }

    #[test]
    fn test_rearm_from_inside_callback() {
        let mut sim = Simulation::new();
        let timer = Rc::new(RefCell::new(Timer::new(SimDuration::from_secs(1))));
        let ticks = Rc::new(RefCell::new(0u32));

        fn tick(
            ctx: &mut SimulationContext<'_>,
            timer: Rc<RefCell<Timer>>,
            ticks: Rc<RefCell<u32>>,
        ) -> KernelResult<()> {
            *ticks.borrow_mut() += 1;
            if *ticks.borrow() < 4 {
                let (t, n) = (Rc::clone(&timer), Rc::clone(&ticks));
                timer
                    .borrow_mut()
                    .schedule(ctx, move |ctx: &mut SimulationContext<'_>| tick(ctx, t, n))?;
            }
            Ok(())
        }

        let (t, n) = (Rc::clone(&timer), Rc::clone(&ticks));
        timer
            .borrow_mut()
            .schedule(&mut sim, move |ctx: &mut SimulationContext<'_>| tick(ctx, t, n))
            .unwrap();

        sim.run().unwrap();
        assert_eq!(*ticks.borrow(), 4);
        assert_eq!(sim.now(), VirtualTime::from_secs(4));
    }
}
