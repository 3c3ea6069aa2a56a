//! First-Come-First-Served (spec.md §4.6.a): a single FIFO ready queue,
//! no preemption, `TIME_OUT` is a fatal error.

use std::collections::VecDeque;

use crate::clock::Time;
use crate::error::{SimError, SimResult};
use crate::event::{DeviceId, Pid};
use crate::process::ProcessState;
use crate::simulation::Kernel;

use super::dispatch;

#[derive(Default)]
pub struct FcfsPolicy {
    ready: VecDeque<Pid>,
}

impl FcfsPolicy {
    pub fn new() -> Self {
        Self { ready: VecDeque::new() }
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
        let next = self.ready.pop_front();
        dispatch(kernel, next)
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
        let next = self.ready.pop_front();
        dispatch(kernel, next)
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

    pub fn time_out(&mut self, _kernel: &mut Kernel, _pid: Pid) -> SimResult<()> {
        Err(SimError::UnsupportedInterrupt { policy: "FCFS", interrupt: "TIME_OUT" })
    }

    fn dispatch_if_idle(&mut self, kernel: &mut Kernel) -> SimResult<()> {
        if kernel.cpu.is_idle() {
            if let Some(pid) = self.ready.pop_front() {
                return dispatch(kernel, Some(pid));
            }
        }
        Ok(())
    }
}
