//! Workload config-file parser (spec.md §6): lists the devices to create
//! and the programs to launch, each tagged with the simulated time it
//! should start at. Paths in `PROGRAM` lines are resolved relative to the
//! config file's own parent directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::clock::Time;
use crate::error::{SimError, SimResult};

/// One `PROGRAM` line: when to `EXECVE` it, at what priority, from which
/// file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramEntry {
    pub start_time: Time,
    pub priority: i32,
    pub path: String,
}

/// One `DEVICE` line: an I/O device to register before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub id: u32,
    pub name: String,
}

/// A parsed workload: the devices to register up front, and the programs
/// to schedule, in file order.
#[derive(Debug, Clone, Default)]
pub struct Workload {
    pub devices: Vec<DeviceEntry>,
    pub programs: Vec<ProgramEntry>,
}

/// Load and parse a workload config file. Returns the workload plus the
/// directory `PROGRAM` paths should be resolved against (the config
/// file's parent).
pub fn load_workload(path: &Path) -> SimResult<(Workload, PathBuf)> {
    let text = fs::read_to_string(path)?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let workload = parse_workload(&text, path)?;
    Ok((workload, base_dir))
}

fn parse_workload(text: &str, path: &Path) -> SimResult<Workload> {
    let mut workload = Workload::default();

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap();
        match keyword {
            "DEVICE" => {
                let id = tokens.next().and_then(|t| t.parse::<u32>().ok()).ok_or_else(|| {
                    line_error(path, lineno, "DEVICE line missing/invalid id", raw_line)
                })?;
                let name = tokens.next().ok_or_else(|| {
                    line_error(path, lineno, "DEVICE line missing name", raw_line)
                })?;
                workload.devices.push(DeviceEntry { id, name: name.to_string() });
            }
            "PROGRAM" => {
                let start_time = tokens.next().and_then(|t| t.parse::<Time>().ok()).ok_or_else(|| {
                    line_error(path, lineno, "PROGRAM line missing/invalid start time", raw_line)
                })?;
                let priority = tokens.next().and_then(|t| t.parse::<i32>().ok()).ok_or_else(|| {
                    line_error(path, lineno, "PROGRAM line missing/invalid priority", raw_line)
                })?;
                let program_path = tokens.next().ok_or_else(|| {
                    line_error(path, lineno, "PROGRAM line missing path", raw_line)
                })?;
                workload.programs.push(ProgramEntry {
                    start_time,
                    priority,
                    path: program_path.to_string(),
                });
            }
            other => {
                return Err(line_error(path, lineno, &format!("unrecognised instruction {other:?}"), raw_line));
            }
        }
    }

    Ok(workload)
}

fn line_error(path: &Path, lineno: usize, message: &str, raw_line: &str) -> SimError {
    SimError::config(format!("{}:{}: {message}: {raw_line:?}", path.display(), lineno + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_devices_and_programs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "workload.cfg",
            "# a workload\nDEVICE 1 disk\n\nPROGRAM 0 0 p1.prog\nPROGRAM 5 2 p2.prog\n",
        );
        let (workload, base_dir) = load_workload(&path).unwrap();
        assert_eq!(workload.devices, vec![DeviceEntry { id: 1, name: "disk".into() }]);
        assert_eq!(
            workload.programs,
            vec![
                ProgramEntry { start_time: 0, priority: 0, path: "p1.prog".into() },
                ProgramEntry { start_time: 5, priority: 2, path: "p2.prog".into() },
            ]
        );
        assert_eq!(base_dir, dir.path());
    }

    #[test]
    fn rejects_unknown_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "bad.cfg", "FOO bar\n");
        assert!(load_workload(&path).is_err());
    }

    #[test]
    fn rejects_malformed_program_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "bad.cfg", "PROGRAM notanumber 0 p1.prog\n");
        assert!(load_workload(&path).is_err());
    }
}
