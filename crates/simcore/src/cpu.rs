//! The (single) CPU: holds at most one running process, executes CPU
//! bursts, and tracks USER/SUPERVISOR mode.

use crate::clock::{Clock, Time};
use crate::event::Pid;
use crate::process::{Burst, Mode, Process};
use crate::profiler::Profiler;

pub struct Cpu {
    current: Option<Pid>,
    mode: Mode,
    context_switches: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Self { current: None, mode: Mode::Supervisor, context_switches: 0 }
    }

    pub fn current_pid(&self) -> Option<Pid> {
        self.current
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn context_switches(&self) -> u64 {
        self.context_switches
    }

    /// Toggle USER/SUPERVISOR, reporting the transition to the profiler.
    /// A no-op if already in `mode` (no spurious zero-width intervals).
    fn set_mode(&mut self, mode: Mode, pid: Pid, profiler: &mut Profiler, now: Time) {
        debug_assert!(mode != Mode::User || self.current == Some(pid), "USER mode requires a running process");
        if self.mode != mode {
            self.mode = mode;
            profiler.on_mode_change(pid, mode, now);
        }
    }

    /// Replace the running process (`new` may be `None` = idle), logging a
    /// context switch. Returns the process that was running before the
    /// switch (may be `None`). The caller updates states and re-enqueues
    /// the outgoing process as appropriate.
    pub fn context_switch(&mut self, new: Option<Pid>, clock: &mut Clock) -> Option<Pid> {
        clock.log_context_switch();
        self.context_switches += 1;
        let old = self.current;
        self.current = new;
        self.mode = Mode::Supervisor;
        old
    }

    /// Run the current process's CPU burst to completion. Returns the
    /// burst's (full) duration.
    pub fn execute_to_burst_end(&mut self, process: &mut Process, clock: &mut Clock, profiler: &mut Profiler) -> Time {
        let remaining = process.current_cpu_burst_remaining();
        let leftover = self.execute_for(remaining, Some(process), clock, profiler);
        debug_assert_eq!(leftover, 0);
        remaining
    }

    /// Run the current burst for up to `t` units, stopping early if it
    /// completes first. Returns the unused remainder of `t` (`0` unless
    /// the burst completed before `t` elapsed). An idle CPU (`process ==
    /// None`) just burns `t` units of system time and returns `0`.
    pub fn execute_for(&mut self, t: Time, process: Option<&mut Process>, clock: &mut Clock, profiler: &mut Profiler) -> Time {
        let process = match process {
            Some(p) => p,
            None => {
                clock.advance_system(t);
                return 0;
            }
        };
        let pid = process.pid();
        debug_assert_eq!(self.current, Some(pid), "execute_for on a process the CPU doesn't own");

        let remaining = process.current_cpu_burst_remaining();
        self.set_mode(Mode::User, pid, profiler, clock.now());

        let leftover = if remaining <= t {
            clock.advance_user(remaining);
            if let Some(Burst::Cpu { remaining: r, .. }) = process.current_burst_mut() {
                *r = 0;
            }
            t - remaining
        } else {
            clock.advance_user(t);
            if let Some(Burst::Cpu { remaining: r, .. }) = process.current_burst_mut() {
                *r -= t;
            }
            0
        };

        self.set_mode(Mode::Supervisor, pid, profiler, clock.now());
        leftover
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessState;

    fn setup(duration: Time) -> (Cpu, Process, Clock, Profiler) {
        let mut profiler = Profiler::new();
        profiler.register(1, "p".into(), 0);
        let mut process = Process::new(1, "p".into(), 0, vec![Burst::cpu(duration)]).unwrap();
        process.set_state(ProcessState::Running, &mut profiler, 0);
        let mut cpu = Cpu::new();
        cpu.context_switch(Some(1), &mut Clock::new(1, 3));
        (cpu, process, Clock::new(1, 3), profiler)
    }

    #[test]
    fn execute_to_burst_end_consumes_whole_burst() {
        let (mut cpu, mut process, mut clock, mut profiler) = setup(10);
        let used = cpu.execute_to_burst_end(&mut process, &mut clock, &mut profiler);
        assert_eq!(used, 10);
        assert_eq!(clock.user_time(), 10);
        assert_eq!(process.current_cpu_burst_remaining(), 0);
        assert_eq!(cpu.mode(), Mode::Supervisor);
    }

    #[test]
    fn execute_for_stops_early_without_completing() {
        let (mut cpu, mut process, mut clock, mut profiler) = setup(10);
        let leftover = cpu.execute_for(4, Some(&mut process), &mut clock, &mut profiler);
        assert_eq!(leftover, 0);
        assert_eq!(clock.user_time(), 4);
        assert_eq!(process.current_cpu_burst_remaining(), 6);
        assert_eq!(cpu.mode(), Mode::Supervisor);
    }

    #[test]
    fn execute_for_returns_remainder_when_burst_finishes_early() {
        let (mut cpu, mut process, mut clock, mut profiler) = setup(4);
        let leftover = cpu.execute_for(10, Some(&mut process), &mut clock, &mut profiler);
        assert_eq!(leftover, 6);
        assert_eq!(clock.user_time(), 4);
        assert_eq!(process.current_cpu_burst_remaining(), 0);
    }

    #[test]
    fn idle_cpu_burns_system_time_only() {
        let mut cpu = Cpu::new();
        let mut clock = Clock::new(1, 3);
        let mut profiler = Profiler::new();
        let leftover = cpu.execute_for(7, None, &mut clock, &mut profiler);
        assert_eq!(leftover, 0);
        assert_eq!(clock.system_time(), 7);
        assert_eq!(clock.user_time(), 0);
    }

    #[test]
    fn context_switch_counts_and_logs_cost() {
        let mut cpu = Cpu::new();
        let mut clock = Clock::new(1, 3);
        let old = cpu.context_switch(Some(5), &mut clock);
        assert_eq!(old, None);
        assert_eq!(cpu.current_pid(), Some(5));
        assert_eq!(cpu.context_switches(), 1);
        assert_eq!(clock.system_time(), 3);
    }
}
