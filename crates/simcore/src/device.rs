//! I/O devices: per-device FIFO service with no idle gaps between
//! back-to-back requests.

use std::collections::VecDeque;

use crate::clock::Time;
use crate::event::{DeviceId, EventQueue, Payload, Pid};

pub struct IoDevice {
    id: DeviceId,
    name: String,
    free_time: Time,
    in_flight: VecDeque<Pid>,
}

impl IoDevice {
    pub fn new(id: DeviceId, name: String) -> Self {
        Self { id, name, free_time: 0, in_flight: VecDeque::new() }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Schedule `pid`'s request: start it no earlier than `free_time`, with
    /// no idle gap for back-to-back requests (§4.4).
    pub fn request_io(&mut self, duration: Time, pid: Pid, now: Time, queue: &mut EventQueue) {
        self.free_time = if self.free_time <= now { now + duration } else { self.free_time + duration };
        self.in_flight.push_back(pid);
        queue.schedule(self.free_time, Payload::WakeUp { device_id: self.id, pid });
    }

    /// Remove `pid` from the in-flight set on its `WakeUp`. No-op (besides
    /// a debug assertion) if `pid` isn't present — that would indicate a
    /// `WakeUp` with no matching `request_io`, an invariant violation.
    pub fn complete(&mut self, pid: Pid) {
        if let Some(pos) = self.in_flight.iter().position(|&p| p == pid) {
            self.in_flight.remove(pos);
        } else {
            debug_assert!(false, "WakeUp for pid {pid} with no matching request_io on device {}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_starts_immediately() {
        let mut dev = IoDevice::new(1, "disk".into());
        let mut q = EventQueue::new();
        dev.request_io(5, 10, 0, &mut q);
        let e = q.pop_min().unwrap();
        assert_eq!(e.time, 5);
    }

    #[test]
    fn back_to_back_requests_have_no_idle_gap() {
        // S6: two requests at t1=0 and t2=2, durations 5 and 5.
        // Second wakes at t1 + 5 + 5 = 10.
        let mut dev = IoDevice::new(1, "disk".into());
        let mut q = EventQueue::new();
        dev.request_io(5, 1, 0, &mut q);
        dev.request_io(5, 2, 2, &mut q);
        let e1 = q.pop_min().unwrap();
        let e2 = q.pop_min().unwrap();
        assert_eq!(e1.time, 5);
        assert_eq!(e2.time, 10);
    }

    #[test]
    fn complete_empties_in_flight_set() {
        let mut dev = IoDevice::new(1, "disk".into());
        let mut q = EventQueue::new();
        dev.request_io(5, 1, 0, &mut q);
        assert!(!dev.is_idle());
        dev.complete(1);
        assert!(dev.is_idle());
    }
}
