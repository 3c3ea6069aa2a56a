//! `simrun`: the command-line driver for `simcore`. Parses a workload
//! config file and a policy selection off the command line, runs the
//! simulation to completion, and reports the summary (plus an optional
//! profile CSV).

use std::path::PathBuf;
use std::process::ExitCode;

use simcore::clock::Time;
use simcore::config::load_workload;
use simcore::error::{SimError, SimResult};
use simcore::policy::fcfs::FcfsPolicy;
use simcore::policy::rr::RrPolicy;
use simcore::policy::sjf::SjfPolicy;
use simcore::program::FileProgramLoader;
use simcore::{SchedPolicy, Simulation};

struct Args {
    config: PathBuf,
    policy: String,
    slice: Option<Time>,
    syscall_cost: Time,
    context_switch_cost: Time,
    trace_level: u8,
    csv: Option<PathBuf>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> SimResult<Args> {
    let mut config = None;
    let mut policy = None;
    let mut slice = None;
    let mut syscall_cost = None;
    let mut context_switch_cost = None;
    let mut trace_level = 0u8;
    let mut csv = None;

    raw.next(); // argv[0]

    while let Some(flag) = raw.next() {
        let mut value = || raw.next().ok_or_else(|| SimError::config(format!("{flag} requires a value")));
        match flag.as_str() {
            "--config" => config = Some(PathBuf::from(value()?)),
            "--policy" => policy = Some(value()?),
            "--slice" => slice = Some(parse_positive(&value()?, "--slice")?),
            "--syscall-cost" => syscall_cost = Some(parse_non_negative(&value()?, "--syscall-cost")?),
            "--context-switch-cost" => {
                context_switch_cost = Some(parse_non_negative(&value()?, "--context-switch-cost")?);
            }
            "--trace-level" => {
                let n = parse_non_negative(&value()?, "--trace-level")?;
                if n > 31 {
                    return Err(SimError::config("--trace-level must be in [0, 31]"));
                }
                trace_level = n as u8;
            }
            "--csv" => csv = Some(PathBuf::from(value()?)),
            other => return Err(SimError::config(format!("unrecognised argument {other:?}"))),
        }
    }

    let config = config.ok_or_else(|| SimError::config("--config is required"))?;
    let policy = policy.ok_or_else(|| SimError::config("--policy is required"))?;
    let syscall_cost = syscall_cost.ok_or_else(|| SimError::config("--syscall-cost is required"))?;
    let context_switch_cost =
        context_switch_cost.ok_or_else(|| SimError::config("--context-switch-cost is required"))?;

    match policy.as_str() {
        "RR" if slice.is_none() => return Err(SimError::config("--slice is required for --policy RR")),
        "FCFS" | "SJF" if slice.is_some() => {
            return Err(SimError::config(format!("--slice is not valid for --policy {policy}")));
        }
        "FCFS" | "RR" | "SJF" => {}
        other => return Err(SimError::config(format!("unknown policy {other:?} (expected FCFS, RR, or SJF)"))),
    }

    Ok(Args { config, policy, slice, syscall_cost, context_switch_cost, trace_level, csv })
}

fn parse_non_negative(text: &str, flag: &str) -> SimResult<Time> {
    text.parse::<Time>().map_err(|_| SimError::config(format!("{flag} must be a non-negative integer, got {text:?}")))
}

fn parse_positive(text: &str, flag: &str) -> SimResult<Time> {
    let n = parse_non_negative(text, flag)?;
    if n == 0 {
        return Err(SimError::config(format!("{flag} must be a positive integer")));
    }
    Ok(n)
}

fn run(args: Args) -> SimResult<()> {
    let (workload, base_dir) = load_workload(&args.config)?;
    log::info!(
        "loaded workload from {}: {} device(s), {} program(s)",
        args.config.display(),
        workload.devices.len(),
        workload.programs.len()
    );

    let policy = match args.policy.as_str() {
        "FCFS" => SchedPolicy::Fcfs(FcfsPolicy::new()),
        "RR" => SchedPolicy::Rr(RrPolicy::new(args.slice.expect("validated by parse_args"))),
        "SJF" => SchedPolicy::Sjf(SjfPolicy::new()),
        other => unreachable!("validated by parse_args: {other}"),
    };
    log::info!("selected policy {}", args.policy);

    let loader = Box::new(FileProgramLoader::new(base_dir));
    let mut sim = Simulation::new(args.syscall_cost, args.context_switch_cost, policy, loader, args.trace_level);

    for device in &workload.devices {
        sim.make_device(device.id, device.name.clone())?;
    }
    for program in &workload.programs {
        sim.schedule_execve(program.start_time, program.path.clone(), program.priority);
    }

    sim.run()?;
    log::info!("run complete");

    let summary = sim.summary();
    println!("=== Simulation Summary ===");
    println!("Total system time: {}", summary.system_time);
    println!("Total user time:   {}", summary.user_time);
    println!("Context switches:  {}", summary.context_switches);
    println!("CPU utilisation:   {:.2}%", summary.utilisation);

    if let Some(csv_path) = &args.csv {
        std::fs::write(csv_path, sim.profiler().render_csv())?;
        log::info!("wrote profile CSV to {}", csv_path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = match parse_args(std::env::args()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("simrun: {e}");
            return ExitCode::FAILURE;
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("simrun: {e}");
            ExitCode::FAILURE
        }
    }
}
