//! Per-process execution profile: a contiguous, non-overlapping log of
//! `(state, mode, start, end)` intervals, suitable for Gantt-chart-style
//! offline analysis.

use std::fmt;

use crate::clock::Time;
use crate::event::Pid;
use crate::process::{Mode, ProcessState};

/// One logged interval. `mode` is `None` ("N/A") outside `Running`; `end`
/// is `None` only for the final, open-ended interval of a terminated
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub pid: Pid,
    pub state: ProcessState,
    pub mode: Option<Mode>,
    pub start: Time,
    pub end: Option<Time>,
}

struct Track {
    program_name: String,
    open_state: ProcessState,
    open_mode: Option<Mode>,
    open_start: Time,
    closed: Vec<Interval>,
}

/// A dense, pid-indexed profile table (per the re-architecture guidance in
/// spec.md §9: "a dense vector indexed by PID").
#[derive(Default)]
pub struct Profiler {
    tracks: Vec<Option<Track>>,
}

impl Profiler {
    pub fn new() -> Self {
        Self { tracks: Vec::new() }
    }

    fn slot(&mut self, pid: Pid) -> &mut Option<Track> {
        let idx = pid as usize;
        if idx >= self.tracks.len() {
            self.tracks.resize_with(idx + 1, || None);
        }
        &mut self.tracks[idx]
    }

    /// Open a process's profile at `now`; initial state is always READY
    /// (processes are created READY by EXECVE).
    pub fn register(&mut self, pid: Pid, program_name: String, now: Time) {
        *self.slot(pid) = Some(Track {
            program_name,
            open_state: ProcessState::Ready,
            open_mode: None,
            open_start: now,
            closed: Vec::new(),
        });
    }

    fn close_and_open(&mut self, pid: Pid, new_state: ProcessState, new_mode: Option<Mode>, now: Time) {
        let track = match self.slot(pid) {
            Some(t) => t,
            None => return,
        };
        let duration = now.saturating_sub(track.open_start);
        if duration > 0 {
            let interval = Interval {
                pid,
                state: track.open_state,
                mode: track.open_mode,
                start: track.open_start,
                end: Some(now),
            };
            // Adjacent READY intervals coalesce into one spanning both.
            let merged = interval.state == ProcessState::Ready
                && track
                    .closed
                    .last()
                    .map(|last| last.state == ProcessState::Ready && last.end == Some(interval.start))
                    .unwrap_or(false);
            if merged {
                let last = track.closed.last_mut().unwrap();
                last.end = interval.end;
            } else {
                track.closed.push(interval);
            }
        }
        track.open_state = new_state;
        track.open_mode = new_mode;
        track.open_start = now;
    }

    /// Closes the open interval at `now` and opens a new one for
    /// `new_state`. Entering `Running` opens in `Supervisor` mode (the CPU
    /// flips to `User` separately, via `on_mode_change`, once the process's
    /// own burst actually starts executing). Entering `Terminated` appends
    /// the open-ended terminal interval immediately.
    pub fn on_state_change(&mut self, pid: Pid, new_state: ProcessState, now: Time) {
        let new_mode = if new_state == ProcessState::Running {
            Some(Mode::Supervisor)
        } else {
            None
        };
        self.close_and_open(pid, new_state, new_mode, now);
        if new_state == ProcessState::Terminated {
            if let Some(track) = self.slot(pid) {
                track.closed.push(Interval {
                    pid,
                    state: ProcessState::Terminated,
                    mode: None,
                    start: now,
                    end: None,
                });
            }
        }
    }

    /// Closes the open interval at `now` and opens a new one with the same
    /// state but a new mode. Only meaningful while the process is running.
    pub fn on_mode_change(&mut self, pid: Pid, new_mode: Mode, now: Time) {
        let current_state = match self.slot(pid) {
            Some(t) => t.open_state,
            None => return,
        };
        self.close_and_open(pid, current_state, Some(new_mode), now);
    }

    /// All closed (and possibly one open-ended terminal) intervals for a
    /// pid, in chronological order.
    pub fn intervals(&self, pid: Pid) -> &[Interval] {
        match self.tracks.get(pid as usize).and_then(|t| t.as_ref()) {
            Some(t) => &t.closed,
            None => &[],
        }
    }

    pub fn program_name(&self, pid: Pid) -> Option<&str> {
        self.tracks
            .get(pid as usize)
            .and_then(|t| t.as_ref())
            .map(|t| t.program_name.as_str())
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.tracks
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|_| i as Pid))
    }

    /// Render every pid's interval log as CSV: `PID,STATE,MODE,START,END,PROGRAM`.
    pub fn render_csv(&self) -> String {
        let mut out = String::new();
        for pid in self.pids() {
            let program = self.program_name(pid).unwrap_or("");
            for interval in self.intervals(pid) {
                out.push_str(&format_interval_csv(interval, program));
                out.push('\n');
            }
        }
        out
    }
}

fn format_interval_csv(interval: &Interval, program: &str) -> String {
    let mode_str = match interval.mode {
        Some(Mode::User) => "USER",
        Some(Mode::Supervisor) => "SUPERVISOR",
        None => "N/A",
    };
    let end_str = match interval.end {
        Some(t) => format!("{t:010}"),
        None => "-".to_string(),
    };
    format!(
        "{:03},{},{},{:010},{},{}",
        interval.pid,
        state_str(interval.state),
        mode_str,
        interval.start,
        end_str,
        program
    )
}

fn state_str(state: ProcessState) -> &'static str {
    match state {
        ProcessState::Ready => "READY",
        ProcessState::Running => "RUNNING",
        ProcessState::Waiting => "WAITING",
        ProcessState::Terminated => "TERMINATED",
    }
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler").field("tracks", &self.tracks.len()).finish()
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("program_name", &self.program_name)
            .field("closed", &self.closed.len())
            .finish()
    }
}
