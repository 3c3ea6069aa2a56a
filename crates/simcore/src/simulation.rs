//! The simulation driver: owns every component for the lifetime of one run
//! and drives the event loop described in spec.md §4.10.

use std::collections::HashMap;

use crate::clock::{Clock, Time};
use crate::cpu::Cpu;
use crate::device::IoDevice;
use crate::error::{SimError, SimResult};
use crate::event::{DeviceId, Event, EventQueue, Payload, Pid};
use crate::policy::SchedPolicy;
use crate::process::{Burst, Process};
use crate::profiler::Profiler;
use crate::timer::SystemTimer;
use crate::trace::TraceSink;


/// Loads a program file into its burst sequence. Implemented by the driver
/// shell (`config::program`) and injected here so the core stays ignorant
/// of file formats (spec.md §1's "thin shells" boundary).
pub trait ProgramLoader {
    fn load(&self, path: &str) -> SimResult<Vec<Burst>>;
}

impl<F> ProgramLoader for F
where
    F: Fn(&str) -> SimResult<Vec<Burst>>,
{
    fn load(&self, path: &str) -> SimResult<Vec<Burst>> {
        self(path)
    }
}

/// Dense, pid-indexed process table (spec.md §9: "a dense vector indexed
/// by PID").
#[derive(Default)]
pub struct ProcessTable {
    processes: Vec<Option<Process>>,
    next_pid: Pid,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self { processes: vec![None], next_pid: 1 }
    }

    pub fn alloc_pid(&mut self) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        self.ensure_capacity(pid);
        pid
    }

    fn ensure_capacity(&mut self, pid: Pid) {
        let idx = pid as usize;
        if idx >= self.processes.len() {
            self.processes.resize_with(idx + 1, || None);
        }
    }

    pub fn insert(&mut self, process: Process) {
        self.ensure_capacity(process.pid());
        self.processes[process.pid() as usize] = Some(process);
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(pid as usize).and_then(|p| p.as_ref())
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.get_mut(pid as usize).and_then(|p| p.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter().filter_map(|p| p.as_ref())
    }
}

/// Device registry, keyed by the integer ID assigned in the config file.
#[derive(Default)]
pub struct Devices {
    map: HashMap<DeviceId, IoDevice>,
}

impl Devices {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    /// `MAKE_DEVICE` with a repeated ID overwrites the earlier registration.
    pub fn register(&mut self, id: DeviceId, name: String) {
        self.map.insert(id, IoDevice::new(id, name));
    }

    pub fn get_mut(&mut self, id: DeviceId) -> Option<&mut IoDevice> {
        self.map.get_mut(&id)
    }

    pub fn all_idle(&self) -> bool {
        self.map.values().all(|d| d.is_idle())
    }
}

/// The mutable context a policy's syscall/interrupt handlers operate on —
/// every shared resource of the simulation, borrowed for one call.
pub struct Kernel<'a> {
    pub processes: &'a mut ProcessTable,
    pub devices: &'a mut Devices,
    pub cpu: &'a mut Cpu,
    pub clock: &'a mut Clock,
    pub profiler: &'a mut Profiler,
    pub queue: &'a mut EventQueue,
    pub timer: &'a mut SystemTimer,
    pub loader: &'a dyn ProgramLoader,
    pub trace: &'a TraceSink,
}

impl<'a> Kernel<'a> {
    /// Load a program and register a new, READY process for it. Returns
    /// `None` (mirroring the source's `EXECVE` returning `-1`) if the
    /// program fails to load — a non-fatal, per-call failure, not a
    /// simulation-ending error.
    pub fn load_and_register(&mut self, path: &str, priority: i32) -> Option<Pid> {
        let bursts = match self.loader.load(path) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("EXECVE {path} failed to load: {e}");
                return None;
            }
        };
        let pid = self.processes.alloc_pid();
        match Process::new(pid, path.to_string(), priority, bursts) {
            Ok(process) => {
                self.profiler.register(pid, path.to_string(), self.clock.now());
                self.processes.insert(process);
                Some(pid)
            }
            Err(e) => {
                log::warn!("EXECVE {path} failed validation: {e}");
                None
            }
        }
    }

    /// The process the policy is acting on behalf of for a synchronous
    /// syscall (`IO_REQUEST`, `TERMINATE_PROCESS`): whichever one the CPU
    /// is currently running.
    pub fn current_pid(&self) -> SimResult<Pid> {
        self.cpu
            .current_pid()
            .ok_or_else(|| SimError::invariant("syscall with no running process"))
    }
}

/// Owns every simulation component for the lifetime of one run.
pub struct Simulation {
    clock: Clock,
    queue: EventQueue,
    processes: ProcessTable,
    devices: Devices,
    cpu: Cpu,
    timer: SystemTimer,
    profiler: Profiler,
    policy: SchedPolicy,
    loader: Box<dyn ProgramLoader>,
    trace: TraceSink,
}

/// Final counters reported once the event loop drains (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub user_time: Time,
    pub system_time: Time,
    pub context_switches: u64,
    pub utilisation: f64,
}

impl Simulation {
    pub fn new(
        syscall_cost: Time,
        context_switch_cost: Time,
        policy: SchedPolicy,
        loader: Box<dyn ProgramLoader>,
        trace_level: u8,
    ) -> Self {
        Self {
            clock: Clock::new(syscall_cost, context_switch_cost),
            queue: EventQueue::new(),
            processes: ProcessTable::new(),
            devices: Devices::new(),
            cpu: Cpu::new(),
            timer: SystemTimer::new(),
            profiler: Profiler::new(),
            policy,
            loader,
            trace: TraceSink::new(trace_level),
        }
    }

    /// Stage a `MAKE_DEVICE(id, name)` to run at t=0, ahead of any program.
    pub fn make_device(&mut self, id: DeviceId, name: String) -> SimResult<()> {
        let mut kernel = self.kernel();
        self.policy.make_device(&mut kernel, id, name)
    }

    /// Stage an `EXECVE(path, priority)` event at `start_time`.
    pub fn schedule_execve(&mut self, start_time: Time, program_path: String, priority: i32) {
        self.queue.schedule(start_time, Payload::Execve { program_path, priority });
    }

    fn kernel(&mut self) -> Kernel<'_> {
        Kernel {
            processes: &mut self.processes,
            devices: &mut self.devices,
            cpu: &mut self.cpu,
            clock: &mut self.clock,
            profiler: &mut self.profiler,
            queue: &mut self.queue,
            timer: &mut self.timer,
            loader: self.loader.as_ref(),
            trace: &self.trace,
        }
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn summary(&self) -> Summary {
        Summary {
            user_time: self.clock.user_time(),
            system_time: self.clock.system_time(),
            context_switches: self.cpu.context_switches(),
            utilisation: self.clock.utilisation() * 100.0,
        }
    }

    /// Drive the event loop to completion (spec.md §4.10).
    ///
    /// `advance_cpu` and this loop split the work described by §4.10's
    /// pseudocode: a dispatched process does not wait for the next queued
    /// event to "discover" that its burst is done — nothing would ever
    /// queue one for the common case of a burst that outlives nothing else
    /// pending. Instead we run the CPU as far as it can go on its own,
    /// re-checking the queue's head after *every* burst completion (a
    /// completion can itself enqueue something, e.g. an `IO_REQUEST`'s
    /// `WakeUp`, that becomes the new nearest deadline), and only fall back
    /// to popping and dispatching an event once the CPU can't proceed
    /// further unattended.
    pub fn run(&mut self) -> SimResult<()> {
        loop {
            self.advance_cpu()?;

            let event = match self.queue.pop_min() {
                Some(e) => e,
                None => break,
            };

            if self.is_cancelled(&event) {
                continue;
            }

            if self.cpu.is_idle() {
                let delta = event.time.saturating_sub(self.clock.now());
                self.clock.advance_system(delta);
            }
            self.clock.set_now(event.time);

            self.trace.emit(0, || format!("t={} dispatch {:?}", event.time, event.payload));
            self.dispatch(event)?;
        }
        Ok(())
    }

    /// Run the current process (if any) forward: to the next event's time,
    /// or to its burst's completion, whichever comes first; and if the
    /// burst completes first, handle the resulting syscall and keep going
    /// with whatever the policy dispatches next. Returns once the CPU goes
    /// idle or an already-queued event's time is reached without the
    /// current burst completing.
    fn advance_cpu(&mut self) -> SimResult<()> {
        loop {
            if self.cpu.is_idle() {
                return Ok(());
            }
            let pid = self.cpu.current_pid().unwrap();
            let now = self.clock.now();
            let remaining = self
                .processes
                .get(pid)
                .map(|p| p.current_cpu_burst_remaining())
                .ok_or_else(|| SimError::invariant(format!("running pid {pid} missing from table")))?;

            let delta = match self.queue.peek_min_time() {
                Some(t) if t > now => remaining.min(t - now),
                Some(_) => return Ok(()), // next event is already due
                None => remaining,
            };
            self.trace.emit(4, || format!("t={now} running pid {pid} for {delta}"));

            {
                let process = self
                    .processes
                    .get_mut(pid)
                    .ok_or_else(|| SimError::invariant(format!("running pid {pid} missing from table")))?;
                self.cpu.execute_for(delta, Some(process), &mut self.clock, &mut self.profiler);
            }

            if self.burst_just_completed(pid) {
                self.finish_burst(pid)?;
            } else {
                return Ok(());
            }
        }
    }

    fn burst_just_completed(&self, pid: Pid) -> bool {
        self.processes
            .get(pid)
            .and_then(|p| p.current_burst())
            .map(|b| matches!(b, Burst::Cpu { remaining: 0, .. }))
            .unwrap_or(false)
    }

    /// A CPU burst that finished exactly at (or before) the gap runs out
    /// triggers the post-burst syscall path: `IO_REQUEST` if another burst
    /// follows, `TERMINATE_PROCESS` otherwise (spec.md §4.5, §4.10's
    /// "subtlety").
    fn finish_burst(&mut self, pid: Pid) -> SimResult<()> {
        let (has_next, next_is_io) = {
            let process = self
                .processes
                .get(pid)
                .ok_or_else(|| SimError::invariant(format!("pid {pid} missing from table")))?;
            if !process.has_next_instruction() {
                (false, false)
            } else {
                // Peek: the loader guarantees alternation, so the next
                // burst after a CPU burst is always IO.
                (true, true)
            }
        };
        self.trace.emit(2, || format!("pid {pid} burst complete, has_next={has_next}"));
        if has_next && next_is_io {
            let (device_id, duration) = {
                let process = self.processes.get_mut(pid).unwrap();
                process.next_instruction()?;
                match process.current_burst() {
                    Some(Burst::Io { duration, device_id }) => (*device_id, *duration),
                    other => return Err(SimError::invariant(format!("expected IO burst after CPU burst, got {other:?}"))),
                }
            };
            let mut kernel = self.kernel();
            self.policy.io_request(&mut kernel, device_id, duration)
        } else {
            let mut kernel = self.kernel();
            self.policy.terminate_process(&mut kernel)
        }
    }

    fn is_cancelled(&self, event: &Event) -> bool {
        match event.payload {
            Payload::TimeOut { pid, generation } => !self.timer.is_current(pid, generation),
            _ => false,
        }
    }

    fn dispatch(&mut self, event: Event) -> SimResult<()> {
        match event.payload {
            Payload::Execve { program_path, priority } => {
                let mut kernel = self.kernel();
                self.policy.execve(&mut kernel, program_path, priority)?;
                Ok(())
            }
            Payload::WakeUp { device_id, pid } => {
                if let Some(device) = self.devices.get_mut(device_id) {
                    device.complete(pid);
                } else {
                    return Err(SimError::UnknownDevice { device_id, pid });
                }
                if let Some(process) = self.processes.get_mut(pid) {
                    process.next_instruction().ok();
                }
                let mut kernel = self.kernel();
                self.policy.wake_up(&mut kernel, device_id, pid)
            }
            Payload::TimeOut { pid, .. } => {
                let mut kernel = self.kernel();
                self.policy.time_out(&mut kernel, pid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::fcfs::FcfsPolicy;

    fn loader_single_cpu(duration: Time) -> Box<dyn ProgramLoader> {
        Box::new(move |_path: &str| Ok(vec![Burst::cpu(duration)]))
    }

    #[test]
    fn s1_single_cpu_only_process() {
        // spec.md S1: CPU 10, FCFS, syscall cost 1, ctxsw cost 3.
        let mut sim = Simulation::new(1, 3, SchedPolicy::Fcfs(FcfsPolicy::new()), loader_single_cpu(10), 0);
        sim.schedule_execve(0, "p1".into(), 0);
        sim.run().unwrap();
        let summary = sim.summary();
        assert_eq!(summary.user_time, 10);
        assert_eq!(summary.system_time, 18);
        assert_eq!(summary.context_switches, 2);
    }
}
