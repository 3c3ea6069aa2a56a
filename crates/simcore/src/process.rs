//! Process identity, program (burst sequence), and lifecycle state.

use crate::clock::Time;
use crate::error::{SimError, SimResult};
use crate::event::{DeviceId, Pid};
use crate::profiler::Profiler;

/// One contiguous CPU or IO operation within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Burst {
    Cpu { duration: Time, remaining: Time },
    Io { duration: Time, device_id: DeviceId },
}

impl Burst {
    pub fn cpu(duration: Time) -> Self {
        Burst::Cpu { duration, remaining: duration }
    }

    pub fn io(duration: Time, device_id: DeviceId) -> Self {
        Burst::Io { duration, device_id }
    }

    pub fn is_cpu(&self) -> bool {
        matches!(self, Burst::Cpu { .. })
    }
}

/// A process's lifecycle state (spec.md §4.8 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Waiting,
    Terminated,
}

/// CPU accounting mode. Rendered as `N/A` in the profile for any state
/// other than `Running` (see `Profiler`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    User,
    Supervisor,
}

/// A loaded process: identity, program (burst sequence + cursor), and
/// current lifecycle state.
#[derive(Debug, Clone)]
pub struct Process {
    pid: Pid,
    program_name: String,
    priority: i32,
    state: ProcessState,
    bursts: Vec<Burst>,
    cursor: usize,
}

impl Process {
    /// `bursts` must be a non-empty, alternating sequence beginning with a
    /// CPU burst (§3's program invariant). Validated here in debug builds;
    /// see `SimError::InvariantViolation`.
    pub fn new(pid: Pid, program_name: String, priority: i32, bursts: Vec<Burst>) -> SimResult<Self> {
        if bursts.is_empty() {
            return Err(SimError::config(format!(
                "program for pid {pid} ({program_name}) has no bursts"
            )));
        }
        if !bursts[0].is_cpu() {
            return Err(SimError::config(format!(
                "program for pid {pid} ({program_name}) does not begin with a CPU burst"
            )));
        }
        #[cfg(debug_assertions)]
        {
            for pair in bursts.windows(2) {
                if pair[0].is_cpu() == pair[1].is_cpu() {
                    return Err(SimError::invariant(format!(
                        "program for pid {pid} ({program_name}) is not alternating CPU/IO"
                    )));
                }
            }
        }
        Ok(Self {
            pid,
            program_name,
            priority,
            state: ProcessState::Ready,
            bursts,
            cursor: 0,
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Mutate state and notify the profiler before returning, per §4.3.
    pub fn set_state(&mut self, new_state: ProcessState, profiler: &mut Profiler, now: Time) {
        self.state = new_state;
        profiler.on_state_change(self.pid, new_state, now);
    }

    pub fn current_burst(&self) -> Option<&Burst> {
        self.bursts.get(self.cursor)
    }

    pub fn current_burst_mut(&mut self) -> Option<&mut Burst> {
        self.bursts.get_mut(self.cursor)
    }

    pub fn has_next_instruction(&self) -> bool {
        self.cursor + 1 < self.bursts.len()
    }

    /// Advance the cursor to the next burst. Fails if there is none.
    pub fn next_instruction(&mut self) -> SimResult<()> {
        if !self.has_next_instruction() {
            return Err(SimError::invariant(format!(
                "pid {} has no next instruction",
                self.pid
            )));
        }
        self.cursor += 1;
        Ok(())
    }

    /// Remaining time of the current burst, which must be a CPU burst (the
    /// only kind ever queried for a scheduling key).
    pub fn current_cpu_burst_remaining(&self) -> Time {
        match self.current_burst() {
            Some(Burst::Cpu { remaining, .. }) => *remaining,
            other => {
                debug_assert!(false, "current_cpu_burst_remaining on {other:?}");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiler() -> Profiler {
        Profiler::new()
    }

    #[test]
    fn rejects_empty_program() {
        assert!(Process::new(1, "p".into(), 0, vec![]).is_err());
    }

    #[test]
    fn rejects_program_not_starting_with_cpu() {
        let bursts = vec![Burst::io(4, 1)];
        assert!(Process::new(1, "p".into(), 0, bursts).is_err());
    }

    #[test]
    fn cursor_advances_across_bursts() {
        let bursts = vec![Burst::cpu(3), Burst::io(4, 1), Burst::cpu(2)];
        let mut p = Process::new(1, "p".into(), 0, bursts).unwrap();
        assert!(p.current_burst().unwrap().is_cpu());
        assert!(p.has_next_instruction());
        p.next_instruction().unwrap();
        assert!(!p.current_burst().unwrap().is_cpu());
        p.next_instruction().unwrap();
        assert!(p.current_burst().unwrap().is_cpu());
        assert!(!p.has_next_instruction());
        assert!(p.next_instruction().is_err());
    }

    #[test]
    fn set_state_notifies_profiler() {
        let mut prof = profiler();
        prof.register(1, "p".into(), 0);
        let bursts = vec![Burst::cpu(3)];
        let mut p = Process::new(1, "p".into(), 0, bursts).unwrap();
        p.set_state(ProcessState::Running, &mut prof, 5);
        assert_eq!(p.state(), ProcessState::Running);
    }
}
