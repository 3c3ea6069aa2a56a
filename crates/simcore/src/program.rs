//! Program-file parser (spec.md §6): a per-process, line-oriented burst
//! list. Implements [`crate::simulation::ProgramLoader`] by reading a
//! text file, keeping the simulation core itself ignorant of file
//! formats (spec.md §1's "thin shell" boundary).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SimError, SimResult};
use crate::process::Burst;
use crate::simulation::ProgramLoader;

/// Reads program files from a fixed base directory, mirroring how
/// `EXECVE`'s relative path is resolved against the config file's parent
/// directory (spec.md §6).
pub struct FileProgramLoader {
    base_dir: PathBuf,
}

impl FileProgramLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

impl ProgramLoader for FileProgramLoader {
    fn load(&self, path: &str) -> SimResult<Vec<Burst>> {
        let full_path = self.base_dir.join(path);
        parse_program(&full_path)
    }
}

/// Parse one program file into its burst sequence. `CPU <duration>` and
/// `IO <duration> <deviceID>` lines in order; `#` and blank lines are
/// ignored. The loader validates that the program begins with a CPU
/// burst (§6); full alternation is left to `Process::new`'s debug-mode
/// check.
fn parse_program(path: &Path) -> SimResult<Vec<Burst>> {
    let text = fs::read_to_string(path)?;
    let mut bursts = Vec::new();

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap();
        match keyword {
            "CPU" => {
                let duration = tokens.next().and_then(|t| t.parse::<u64>().ok()).ok_or_else(|| {
                    SimError::config(format!(
                        "{}:{}: CPU line missing/invalid duration: {raw_line:?}",
                        path.display(),
                        lineno + 1
                    ))
                })?;
                bursts.push(Burst::cpu(duration));
            }
            "IO" => {
                let duration = tokens.next().and_then(|t| t.parse::<u64>().ok()).ok_or_else(|| {
                    SimError::config(format!(
                        "{}:{}: IO line missing/invalid duration: {raw_line:?}",
                        path.display(),
                        lineno + 1
                    ))
                })?;
                let device_id = tokens.next().and_then(|t| t.parse::<u32>().ok()).ok_or_else(|| {
                    SimError::config(format!(
                        "{}:{}: IO line missing/invalid device id: {raw_line:?}",
                        path.display(),
                        lineno + 1
                    ))
                })?;
                bursts.push(Burst::io(duration, device_id));
            }
            other => {
                return Err(SimError::config(format!(
                    "{}:{}: unrecognised instruction {other:?}",
                    path.display(),
                    lineno + 1
                )));
            }
        }
    }

    if bursts.is_empty() {
        return Err(SimError::config(format!("{}: program has no instructions", path.display())));
    }
    if !bursts[0].is_cpu() {
        return Err(SimError::config(format!("{}: program must begin with a CPU burst", path.display())));
    }
    Ok(bursts)
}
