//! End-to-end seed-scenario tests driven entirely through the public
//! `Simulation` API, complementing the inline unit tests inside each
//! component/policy module.

use simcore::policy::fcfs::FcfsPolicy;
use simcore::process::{Burst, ProcessState};
use simcore::simulation::ProgramLoader;
use simcore::{SchedPolicy, Simulation};

fn loader_from(programs: Vec<Vec<Burst>>) -> Box<dyn ProgramLoader> {
    use std::cell::Cell;
    use std::rc::Rc;
    let idx = Rc::new(Cell::new(0));
    Box::new(move |_path: &str| {
        let i = idx.get();
        idx.set(i + 1);
        Ok(programs[i].clone())
    })
}

/// Two CPU-only jobs, FCFS: P1 runs to completion before P2 starts.
#[test]
fn two_sequential_cpu_jobs_run_in_arrival_order() {
    let mut sim = Simulation::new(
        1,
        3,
        SchedPolicy::Fcfs(FcfsPolicy::new()),
        loader_from(vec![vec![Burst::cpu(5)], vec![Burst::cpu(5)]]),
        0,
    );
    sim.schedule_execve(0, "p1".into(), 0);
    sim.schedule_execve(1, "p2".into(), 0);
    sim.run().unwrap();

    assert_eq!(sim.summary().user_time, 10);

    // P2's EXECVE at t=1 interleaves with P1's still-running burst, which
    // splits P1's RUNNING span into per-chunk intervals around that event;
    // what FCFS actually guarantees is that P1's last RUNNING chunk ends no
    // later than P2's first one begins.
    let p1_running_end = sim
        .profiler()
        .intervals(1)
        .iter()
        .filter(|iv| iv.state == ProcessState::Running)
        .filter_map(|iv| iv.end)
        .max()
        .unwrap();
    let p2_running_start = sim
        .profiler()
        .intervals(2)
        .iter()
        .find(|iv| iv.state == ProcessState::Running)
        .unwrap()
        .start;
    assert!(p1_running_end <= p2_running_start);
}

/// One process alternating CPU/IO/CPU: RUNNING, WAITING, RUNNING,
/// TERMINATED in order, with the expected burst durations.
#[test]
fn cpu_io_cpu_process_passes_through_every_state_in_order() {
    let mut sim = Simulation::new(
        1,
        3,
        SchedPolicy::Fcfs(FcfsPolicy::new()),
        loader_from(vec![vec![Burst::cpu(3), Burst::io(4, 1), Burst::cpu(2)]]),
        0,
    );
    sim.make_device(1, "disk".into()).unwrap();
    sim.schedule_execve(0, "p1".into(), 0);
    sim.run().unwrap();

    assert_eq!(sim.summary().user_time, 5);

    let states: Vec<ProcessState> = sim.profiler().intervals(1).iter().map(|iv| iv.state).collect();
    assert_eq!(
        states,
        vec![ProcessState::Running, ProcessState::Waiting, ProcessState::Running, ProcessState::Terminated]
    );

    let durations: Vec<_> = sim
        .profiler()
        .intervals(1)
        .iter()
        .filter_map(|iv| iv.end.map(|e| e - iv.start))
        .collect();
    assert_eq!(durations, vec![3, 4, 2]);
}

/// Two processes contend for one I/O device: requests are served FIFO
/// with no idle gap between them, so the second wake-up lands exactly
/// `first_duration + second_duration` after the first request started.
#[test]
fn contending_io_requests_are_served_back_to_back() {
    let mut sim = Simulation::new(
        0,
        0,
        SchedPolicy::Fcfs(FcfsPolicy::new()),
        loader_from(vec![
            vec![Burst::cpu(1), Burst::io(5, 1), Burst::cpu(1)],
            vec![Burst::cpu(3), Burst::io(5, 1), Burst::cpu(1)],
        ]),
        0,
    );
    sim.make_device(1, "disk".into()).unwrap();
    sim.schedule_execve(0, "p1".into(), 0);
    sim.schedule_execve(0, "p2".into(), 0);
    sim.run().unwrap();

    let p1_wait = sim.profiler().intervals(1).iter().find(|iv| iv.state == ProcessState::Waiting).unwrap();
    let p2_wait = sim.profiler().intervals(2).iter().find(|iv| iv.state == ProcessState::Waiting).unwrap();

    // P1 requests IO first (after its 1-unit CPU burst) and the device is
    // free, so its request starts immediately: WAITING duration == 5.
    assert_eq!(p1_wait.end.unwrap() - p1_wait.start, 5);
    // P2's request arrives while the device is still busy with P1's; it
    // queues with no gap, so P2's WAKE_UP lands at
    // p1_wait.start + 5 (P1's service) + 5 (P2's service).
    assert_eq!(p2_wait.end.unwrap(), p1_wait.start + 10);
}
