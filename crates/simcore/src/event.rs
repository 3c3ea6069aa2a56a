//! The simulation's event queue: a min-heap of time-stamped events,
//! tie-broken by insertion order so that equal-timestamp events are FIFO.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::clock::Time;

pub type Pid = u32;
pub type DeviceId = u32;

/// What an event carries. `TimeOut` carries the timer generation it was
/// scheduled under (see `SystemTimer`) so a stale, logically-cancelled
/// timeout can be recognised and discarded without a heap removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Execve { program_path: String, priority: i32 },
    WakeUp { device_id: DeviceId, pid: Pid },
    TimeOut { pid: Pid, generation: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub time: Time,
    pub seq: u64,
    pub payload: Payload,
}

// Ordered as a *min*-heap key: earliest time first, then lowest sequence
// number (FIFO among equal times). `BinaryHeap` is a max-heap, so we flip
// the comparison here rather than wrapping every push in `Reverse`.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Raised when an event is scheduled at a time earlier than the clock's
/// current position; the queue promises monotonic dispatch, so this is a
/// fatal bug, not a recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingError {
    pub attempted: Time,
    pub now: Time,
}

pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new(), next_seq: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Assign the next sequence number and insert. Returns the assigned
    /// sequence number (useful for timer bookkeeping).
    pub fn schedule(&mut self, time: Time, payload: Payload) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event { time, seq, payload });
        seq
    }

    /// Pop the minimum `(time, seq)` event, if any. Does not check for
    /// cancellation — callers consult `SystemTimer` for `TimeOut` events.
    pub fn pop_min(&mut self) -> Option<Event> {
        self.heap.pop()
    }

    /// The timestamp of the next event without removing it, used by the
    /// driver to decide how far the CPU may run before it must stop and
    /// let that event fire.
    pub fn peek_min_time(&self) -> Option<Time> {
        self.heap.peek().map(|e| e.time)
    }

    /// Validate that `time` does not precede `now` before scheduling it;
    /// used by components that schedule relative to the clock.
    pub fn check_ordering(time: Time, now: Time) -> Result<(), OrderingError> {
        if time < now {
            Err(OrderingError { attempted: time, now })
        } else {
            Ok(())
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
