//! Shortest-Job-First, preemptive (spec.md §4.6.c): ready structure keyed
//! by the current burst's remaining time, ties broken by insertion order.
//! No timeouts are ever raised by this policy.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::clock::Time;
use crate::error::{SimError, SimResult};
use crate::event::{DeviceId, Pid};
use crate::process::ProcessState;
use crate::simulation::Kernel;

use super::dispatch;

/// A ready entry ordered as a *min*-heap key on `(remaining, seq)` —
/// mirrors `Event`'s `(time, seq)` ordering in `event.rs`: `BinaryHeap` is
/// a max-heap, so the comparison is flipped to pop the smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadyEntry {
    remaining: Time,
    seq: u64,
    pid: Pid,
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.remaining.cmp(&self.remaining).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
pub struct SjfPolicy {
    ready: BinaryHeap<ReadyEntry>,
    next_seq: u64,
}

impl SjfPolicy {
    pub fn new() -> Self {
        Self { ready: BinaryHeap::new(), next_seq: 0 }
    }

    fn push_ready(&mut self, pid: Pid, remaining: Time) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.ready.push(ReadyEntry { remaining, seq, pid });
    }

    pub fn make_device(&mut self, kernel: &mut Kernel, id: DeviceId, name: String) -> SimResult<()> {
        kernel.trace.emit(1, || format!("MAKE_DEVICE {id} {name}"));
        kernel.devices.register(id, name);
        kernel.clock.log_syscall();
        Ok(())
    }

    pub fn execve(&mut self, kernel: &mut Kernel, path: String, priority: i32) -> SimResult<()> {
        kernel.trace.emit(1, || format!("EXECVE {path} priority={priority}"));
        let pid = kernel.load_and_register(&path, priority);
        kernel.clock.log_syscall();
        if let Some(pid) = pid {
            self.arrive(kernel, pid)?;
        }
        Ok(())
    }

    pub fn io_request(&mut self, kernel: &mut Kernel, device_id: DeviceId, duration: Time) -> SimResult<()> {
        let pid = kernel.current_pid()?;
        kernel.trace.emit(1, || format!("IO_REQUEST pid={pid} device={device_id} duration={duration}"));
        kernel.timer.cancel_interrupt(pid);
        let now = kernel.clock.now();
        kernel
            .processes
            .get_mut(pid)
            .ok_or_else(|| SimError::invariant(format!("io_request: pid {pid} missing from table")))?
            .set_state(ProcessState::Waiting, kernel.profiler, now);
        kernel
            .devices
            .get_mut(device_id)
            .ok_or(SimError::UnknownDevice { device_id, pid })?
            .request_io(duration, pid, now, kernel.queue);
        kernel.clock.log_syscall();
        self.dispatch_successor(kernel)
    }

    pub fn terminate_process(&mut self, kernel: &mut Kernel) -> SimResult<()> {
        let pid = kernel.current_pid()?;
        kernel.trace.emit(1, || format!("TERMINATE_PROCESS pid={pid}"));
        kernel.timer.cancel_interrupt(pid);
        let now = kernel.clock.now();
        kernel
            .processes
            .get_mut(pid)
            .ok_or_else(|| SimError::invariant(format!("terminate_process: pid {pid} missing from table")))?
            .set_state(ProcessState::Terminated, kernel.profiler, now);
        kernel.clock.log_syscall();
        self.dispatch_successor(kernel)
    }

    pub fn wake_up(&mut self, kernel: &mut Kernel, _device_id: DeviceId, pid: Pid) -> SimResult<()> {
        kernel.trace.emit(1, || format!("WAKE_UP pid={pid}"));
        let now = kernel.clock.now();
        kernel
            .processes
            .get_mut(pid)
            .ok_or_else(|| SimError::invariant(format!("wake_up: pid {pid} missing from table")))?
            .set_state(ProcessState::Ready, kernel.profiler, now);
        kernel.clock.log_interrupt();
        self.arrive(kernel, pid)
    }

    pub fn time_out(&mut self, _kernel: &mut Kernel, _pid: Pid) -> SimResult<()> {
        Err(SimError::UnsupportedInterrupt { policy: "SJF", interrupt: "TIME_OUT" })
    }

    /// Common tail of `EXECVE` and `WAKE_UP`: dispatch onto an idle CPU,
    /// or preempt the running process iff `pid`'s current burst is
    /// strictly shorter than the running process's (equal does not
    /// preempt — spec.md §9 open question 1/4, mirrored for both paths).
    fn arrive(&mut self, kernel: &mut Kernel, pid: Pid) -> SimResult<()> {
        let remaining = kernel
            .processes
            .get(pid)
            .ok_or_else(|| SimError::invariant(format!("arrive: pid {pid} missing from table")))?
            .current_cpu_burst_remaining();

        if kernel.cpu.is_idle() {
            return dispatch(kernel, Some(pid));
        }

        let running_pid = kernel
            .cpu
            .current_pid()
            .ok_or_else(|| SimError::invariant("CPU not idle but has no current process"))?;
        let running_remaining = kernel
            .processes
            .get(running_pid)
            .ok_or_else(|| SimError::invariant(format!("arrive: running pid {running_pid} missing from table")))?
            .current_cpu_burst_remaining();

        if remaining < running_remaining {
            let now = kernel.clock.now();
            kernel
                .processes
                .get_mut(running_pid)
                .ok_or_else(|| SimError::invariant(format!("arrive: running pid {running_pid} missing from table")))?
                .set_state(ProcessState::Ready, kernel.profiler, now);
            self.push_ready(running_pid, running_remaining);
            dispatch(kernel, Some(pid))
        } else {
            self.push_ready(pid, remaining);
            Ok(())
        }
    }

    fn dispatch_successor(&mut self, kernel: &mut Kernel) -> SimResult<()> {
        let next = self.ready.pop().map(|entry| entry.pid);
        dispatch(kernel, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SchedPolicy;
    use crate::process::Burst;
    use crate::simulation::{ProgramLoader, Simulation};
    use std::cell::Cell;
    use std::rc::Rc;

    // Each process gets a distinct CPU-burst length keyed by load order,
    // so the loader stands in for "program path selects duration".
    fn loader_by_durations(durations: Vec<Time>) -> Box<dyn ProgramLoader> {
        let idx = Rc::new(Cell::new(0));
        Box::new(move |_path: &str| {
            let i = idx.get();
            idx.set(i + 1);
            Ok(vec![Burst::cpu(durations[i])])
        })
    }

    #[test]
    fn s4_shorter_arrival_preempts_and_resumes() {
        // spec.md S4: P1=CPU 10 @ t=0, P2=CPU 3 @ t=2.
        let mut sim = Simulation::new(1, 3, SchedPolicy::Sjf(SjfPolicy::new()), loader_by_durations(vec![10, 3]), 0);
        sim.schedule_execve(0, "p1".into(), 0);
        sim.schedule_execve(2, "p2".into(), 0);
        sim.run().unwrap();
        assert_eq!(sim.summary().user_time, 13);

        let p1 = sim.profiler().intervals(1);
        let running: Vec<_> = p1.iter().filter(|iv| iv.state == crate::process::ProcessState::Running).collect();
        // P1 runs twice: once before preemption, once after resuming.
        assert_eq!(running.len(), 2);
        assert_eq!(running[0].end.unwrap() - running[0].start, 2);
    }

    #[test]
    fn equal_remaining_does_not_preempt() {
        // P1's remaining burst is exactly 5 (10 - the 5 units already run)
        // when P2 (burst 5) arrives — equal, so P1 keeps the CPU.
        let mut sim = Simulation::new(1, 3, SchedPolicy::Sjf(SjfPolicy::new()), loader_by_durations(vec![10, 5]), 0);
        sim.schedule_execve(0, "p1".into(), 0);
        sim.schedule_execve(5, "p2".into(), 0);
        sim.run().unwrap();
        let p1 = sim.profiler().intervals(1);
        // P1 is never preempted: it never re-enters READY after creation.
        assert!(p1.iter().all(|iv| iv.state != crate::process::ProcessState::Ready));
    }
}
