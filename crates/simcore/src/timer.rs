//! System timer: schedules and (logically) cancels per-process timeout
//! interrupts, for preemptive policies such as Round-Robin.
//!
//! Cancellation is a generation counter per pid (spec.md §9's
//! re-architecture guidance), not a heap removal: each `schedule_interrupt`
//! or `cancel_interrupt` call bumps the pid's generation, and a popped
//! `TimeOut` event is discarded if its generation no longer matches.

use std::collections::HashMap;

use crate::clock::Time;
use crate::event::{EventQueue, Payload, Pid};

#[derive(Default)]
pub struct SystemTimer {
    generations: HashMap<Pid, u64>,
}

impl SystemTimer {
    pub fn new() -> Self {
        Self { generations: HashMap::new() }
    }

    fn bump(&mut self, pid: Pid) -> u64 {
        let gen = self.generations.entry(pid).or_insert(0);
        *gen += 1;
        *gen
    }

    /// Schedule a `TimeOut(pid)` at `now + delay`, overwriting (via
    /// generation bump) any previous pending timeout for the same pid.
    pub fn schedule_interrupt(&mut self, delay: Time, pid: Pid, now: Time, queue: &mut EventQueue) {
        let generation = self.bump(pid);
        queue.schedule(now + delay, Payload::TimeOut { pid, generation });
    }

    /// Invalidate any pending timeout for `pid` without touching the
    /// queue; a stale `TimeOut` is discarded when popped.
    pub fn cancel_interrupt(&mut self, pid: Pid) {
        self.bump(pid);
    }

    /// Whether a popped `TimeOut(pid)` carrying `generation` is still the
    /// live one (i.e. not superseded or cancelled).
    pub fn is_current(&self, pid: Pid, generation: u64) -> bool {
        self.generations.get(&pid).copied() == Some(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_timeout_is_current() {
        let mut t = SystemTimer::new();
        let mut q = EventQueue::new();
        t.schedule_interrupt(2, 1, 0, &mut q);
        let e = q.pop_min().unwrap();
        match e.payload {
            Payload::TimeOut { pid, generation } => assert!(t.is_current(pid, generation)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn cancel_invalidates_pending_timeout() {
        let mut t = SystemTimer::new();
        let mut q = EventQueue::new();
        t.schedule_interrupt(2, 1, 0, &mut q);
        t.cancel_interrupt(1);
        let e = q.pop_min().unwrap();
        match e.payload {
            Payload::TimeOut { pid, generation } => assert!(!t.is_current(pid, generation)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn rescheduling_invalidates_the_old_timeout() {
        let mut t = SystemTimer::new();
        let mut q = EventQueue::new();
        t.schedule_interrupt(2, 1, 0, &mut q);
        t.schedule_interrupt(2, 1, 1, &mut q);
        let stale = q.pop_min().unwrap();
        let fresh = q.pop_min().unwrap();
        match (stale.payload, fresh.payload) {
            (Payload::TimeOut { pid: p1, generation: g1 }, Payload::TimeOut { pid: p2, generation: g2 }) => {
                assert_eq!((p1, p2), (1, 1));
                assert!(!t.is_current(p1, g1));
                assert!(t.is_current(p2, g2));
            }
            _ => unreachable!(),
        }
    }
}
