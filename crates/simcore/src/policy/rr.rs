//! Round-Robin (spec.md §4.6.b): a FIFO ready queue plus a fixed
//! time-slice enforced through the system timer. `SLICE` is the maximum
//! contiguous user-time budget a RUNNING process is given before it is
//! preempted back to the tail of the queue.

use std::collections::VecDeque;

use crate::clock::Time;
use crate::error::{SimError, SimResult};
use crate::event::{DeviceId, Pid};
use crate::process::ProcessState;
use crate::simulation::Kernel;

use super::dispatch;

pub struct RrPolicy {
    ready: VecDeque<Pid>,
    slice: Time,
}

impl RrPolicy {
    pub fn new(slice: Time) -> Self {
        Self { ready: VecDeque::new(), slice }
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
            self.ready.push_back(pid);
            self.dispatch_if_idle(kernel)?;
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
        self.dispatch_next(kernel)
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
        self.dispatch_next(kernel)
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
        self.ready.push_back(pid);
        self.dispatch_if_idle(kernel)
    }

    /// A stale `TimeOut` (for a process no longer running) is silently
    /// ignored; otherwise either the slice restarts (queue empty) or the
    /// process is preempted to the tail of the ready queue (spec.md
    /// §4.6.b, §9 open question 2: "restart the slice counter" on
    /// reschedule).
    pub fn time_out(&mut self, kernel: &mut Kernel, pid: Pid) -> SimResult<()> {
        if kernel.cpu.current_pid() != Some(pid) {
            kernel.trace.emit(1, || format!("TIME_OUT pid={pid} (stale, ignored)"));
            return Ok(());
        }
        kernel.trace.emit(1, || format!("TIME_OUT pid={pid}"));
        kernel.clock.log_interrupt();
        if self.ready.is_empty() {
            kernel.timer.schedule_interrupt(self.slice, pid, kernel.clock.now(), kernel.queue);
            return Ok(());
        }
        let now = kernel.clock.now();
        kernel
            .processes
            .get_mut(pid)
            .ok_or_else(|| SimError::invariant(format!("time_out: pid {pid} missing from table")))?
            .set_state(ProcessState::Ready, kernel.profiler, now);
        self.ready.push_back(pid);
        let next = self
            .ready
            .pop_front()
            .expect("ready queue just received a push, cannot be empty");
        dispatch(kernel, Some(next))?;
        kernel.timer.schedule_interrupt(self.slice, next, kernel.clock.now(), kernel.queue);
        Ok(())
    }

    fn dispatch_if_idle(&mut self, kernel: &mut Kernel) -> SimResult<()> {
        if kernel.cpu.is_idle() {
            if let Some(pid) = self.ready.pop_front() {
                dispatch(kernel, Some(pid))?;
                kernel.timer.schedule_interrupt(self.slice, pid, kernel.clock.now(), kernel.queue);
            }
        }
        Ok(())
    }

    fn dispatch_next(&mut self, kernel: &mut Kernel) -> SimResult<()> {
        match self.ready.pop_front() {
            Some(pid) => {
                dispatch(kernel, Some(pid))?;
                kernel.timer.schedule_interrupt(self.slice, pid, kernel.clock.now(), kernel.queue);
                Ok(())
            }
            None => dispatch(kernel, None),
        }
    }
}
