//! Pluggable scheduling policy (spec.md §4.6): FCFS, Round-Robin, SJF.
//!
//! Each policy exposes the same `syscall`/`interrupt` entry points invoked
//! by the simulation driver against a shared [`Kernel`] borrow; a tagged
//! union (`SchedPolicy`) picks the variant selected at configuration time,
//! replacing the source's dynamic class loading (spec.md §9).

pub mod fcfs;
pub mod rr;
pub mod sjf;

use crate::clock::Time;
use crate::error::{SimError, SimResult};
use crate::event::{DeviceId, Pid};
use crate::process::ProcessState;
use crate::simulation::Kernel;

use fcfs::FcfsPolicy;
use rr::RrPolicy;
use sjf::SjfPolicy;

/// Put `next` (possibly `None`, meaning go idle) onto the CPU and, if it
/// is a real process, mark it RUNNING. Shared tail of every dispatch
/// decision across all three policies (spec.md §4.6's "common dispatch
/// helper"); callers are responsible for having already moved the
/// outgoing process to its correct state (WAITING, TERMINATED, or back
/// onto the ready structure as READY) *before* calling this.
pub(crate) fn dispatch(kernel: &mut Kernel, next: Option<Pid>) -> SimResult<()> {
    kernel.cpu.context_switch(next, kernel.clock);
    if let Some(pid) = next {
        let now = kernel.clock.now();
        kernel
            .processes
            .get_mut(pid)
            .ok_or_else(|| SimError::invariant(format!("dispatch: pid {pid} missing from table")))?
            .set_state(ProcessState::Running, kernel.profiler, now);
    }
    Ok(())
}

/// The scheduling policy in effect for one simulation run.
pub enum SchedPolicy {
    Fcfs(FcfsPolicy),
    Rr(RrPolicy),
    Sjf(SjfPolicy),
}

impl SchedPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            SchedPolicy::Fcfs(_) => "FCFS",
            SchedPolicy::Rr(_) => "RR",
            SchedPolicy::Sjf(_) => "SJF",
        }
    }

    pub fn make_device(&mut self, kernel: &mut Kernel, id: DeviceId, name: String) -> SimResult<()> {
        match self {
            SchedPolicy::Fcfs(p) => p.make_device(kernel, id, name),
            SchedPolicy::Rr(p) => p.make_device(kernel, id, name),
            SchedPolicy::Sjf(p) => p.make_device(kernel, id, name),
        }
    }

    pub fn execve(&mut self, kernel: &mut Kernel, path: String, priority: i32) -> SimResult<()> {
        match self {
            SchedPolicy::Fcfs(p) => p.execve(kernel, path, priority),
            SchedPolicy::Rr(p) => p.execve(kernel, path, priority),
            SchedPolicy::Sjf(p) => p.execve(kernel, path, priority),
        }
    }

    pub fn io_request(&mut self, kernel: &mut Kernel, device_id: DeviceId, duration: Time) -> SimResult<()> {
        match self {
            SchedPolicy::Fcfs(p) => p.io_request(kernel, device_id, duration),
            SchedPolicy::Rr(p) => p.io_request(kernel, device_id, duration),
            SchedPolicy::Sjf(p) => p.io_request(kernel, device_id, duration),
        }
    }

    pub fn terminate_process(&mut self, kernel: &mut Kernel) -> SimResult<()> {
        match self {
            SchedPolicy::Fcfs(p) => p.terminate_process(kernel),
            SchedPolicy::Rr(p) => p.terminate_process(kernel),
            SchedPolicy::Sjf(p) => p.terminate_process(kernel),
        }
    }

    pub fn wake_up(&mut self, kernel: &mut Kernel, device_id: DeviceId, pid: Pid) -> SimResult<()> {
        match self {
            SchedPolicy::Fcfs(p) => p.wake_up(kernel, device_id, pid),
            SchedPolicy::Rr(p) => p.wake_up(kernel, device_id, pid),
            SchedPolicy::Sjf(p) => p.wake_up(kernel, device_id, pid),
        }
    }

    pub fn time_out(&mut self, kernel: &mut Kernel, pid: Pid) -> SimResult<()> {
        match self {
            SchedPolicy::Fcfs(p) => p.time_out(kernel, pid),
            SchedPolicy::Rr(p) => p.time_out(kernel, pid),
            SchedPolicy::Sjf(p) => p.time_out(kernel, pid),
        }
    }
}
