//! Integration test: multi-rate scheduling over real worker threads.
//!
//! Validates: release counts per period and offset, fault code delivery
//! to plugins versus the health flag for programs, per-task last error,
//! and parameter publishing driven by the master cycle.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cyclon_common::publish::ParamType;
use cyclon_common::task::{SchedulerConfig, TaskConfig};
use cyclon_core::cycle::{FieldbusLink, FieldbusStatus, MasterCycle};
use cyclon_core::exec::{ExecutionObject, LogicProgram, Plugin, ProcessImage};
use cyclon_core::image::{EntrySource, ProcessData, ProcessDataBuilder};
use cyclon_core::publish::{ParamRegistry, ParamValue, PublishedParam};
use cyclon_core::scheduler::Scheduler;

fn task(index: usize, sample_time_us: u32, offset_cycles: u32) -> TaskConfig {
    TaskConfig {
        offset_cycles,
        ..TaskConfig::new(index, sample_time_us)
    }
}

fn counting_program(data: &ProcessData, name: &str) -> (LogicProgram, Arc<AtomicU64>) {
    let count = Arc::new(AtomicU64::new(0));
    let c = count.clone();
    let program = LogicProgram::new(name, data.clone(), move |_, _| {
        c.fetch_add(1, Ordering::SeqCst);
        0
    });
    (program, count)
}

fn tick(sched: &mut Scheduler, fault_code: u32, ok: bool) {
    sched.tick(fault_code, ok);
    assert!(sched.wait_idle(Duration::from_secs(1)));
}

#[test]
fn each_task_runs_at_its_own_rate() {
    let data = ProcessDataBuilder::new().build();
    let mut sched = Scheduler::new(SchedulerConfig {
        master_cycle_us: 1000,
        tasks: vec![task(1, 1000, 0), task(2, 2000, 0), task(3, 5000, 3)],
        ..SchedulerConfig::default()
    })
    .unwrap();

    let mut counts = Vec::new();
    for index in 0..=3 {
        let (program, count) = counting_program(&data, &format!("p{index}"));
        sched
            .add_object(ExecutionObject::logic_program(index, program))
            .unwrap();
        counts.push(count);
    }
    sched.start().unwrap();
    for _ in 0..20 {
        tick(&mut sched, 0, true);
    }

    let runs: Vec<u64> = counts.iter().map(|c| c.load(Ordering::SeqCst)).collect();
    // Task 3 first runs on tick 3, then every 5: 3, 8, 13, 18.
    assert_eq!(runs, [20, 20, 10, 4]);
    assert_eq!(sched.release_count(0), 20);
    assert_eq!(sched.release_count(3), 4);
    assert!((1..=3).all(|i| sched.overruns(i) == 0));
    sched.shutdown();
}

#[test]
fn plugins_see_fault_code_programs_see_health() {
    let mut b = ProcessDataBuilder::new();
    let status = b.entry("plc.status", EntrySource::Logic).unwrap();
    let data = b.build();
    let mut sched = Scheduler::new(SchedulerConfig {
        tasks: vec![task(1, 1000, 0)],
        ..SchedulerConfig::default()
    })
    .unwrap();

    let fault_seen = Arc::new(AtomicU32::new(0));
    let f = fault_seen.clone();
    let healthy = Arc::new(AtomicBool::new(false));
    let h = healthy.clone();
    sched
        .add_object(ExecutionObject::plugin(
            1,
            Plugin::new("diag", data.clone(), ProcessImage::new(), move |_, fault| {
                f.store(fault, Ordering::SeqCst);
                if fault != 0 { 0x5001 } else { 0 }
            }),
        ))
        .unwrap();
    sched
        .add_object(ExecutionObject::logic_program(
            1,
            LogicProgram::new("status", data.clone(), move |d, ok| {
                h.store(ok, Ordering::SeqCst);
                d.write_bit(status, ok);
                0
            })
            .writes(&["plc.status"]),
        ))
        .unwrap();
    sched.start().unwrap();

    tick(&mut sched, 0x42, false);
    assert_eq!(fault_seen.load(Ordering::SeqCst), 0x42);
    assert!(!healthy.load(Ordering::SeqCst));
    assert_eq!(sched.last_error(1), 0x5001);

    tick(&mut sched, 0, true);
    assert!(healthy.load(Ordering::SeqCst));
    assert_eq!(sched.last_error(1), 0);

    let report = &sched.report()[0];
    assert_eq!(report.executions, 2);
    assert!(report.exec_time_min_ns.is_some());
    assert!(report.objects[1].process_image.writes().any(|w| w.name == "plc.status"));
}

struct HealthyLink;

impl FieldbusLink for HealthyLink {
    fn exchange(&mut self) -> FieldbusStatus {
        FieldbusStatus {
            ok: true,
            fault_code: 0,
        }
    }
}

#[test]
fn published_params_follow_their_sample_rate() {
    let mut b = ProcessDataBuilder::new();
    let speed = b.entry("cfg.speed", EntrySource::Logic).unwrap();
    let counter = b.entry("plc.counter", EntrySource::Logic).unwrap();
    let data = b.build();

    let mut sched = Scheduler::new(SchedulerConfig::default()).unwrap();
    sched
        .add_object(ExecutionObject::logic_program(
            0,
            LogicProgram::new("count", data.clone(), move |d, _| {
                d.write_f64(counter, d.read_f64(counter) + 1.0);
                0
            })
            .writes(&["plc.counter"]),
        ))
        .unwrap();
    sched.start().unwrap();

    let mut registry = ParamRegistry::new(data.clone());
    registry.add(PublishedParam::new("counter", counter, ParamType::Int, 5));
    registry.add(
        PublishedParam::new("speed", speed, ParamType::Float, -1).writable(Some(0.0), Some(100.0)),
    );
    registry.write("speed", ParamValue::Float(12.5)).unwrap();
    assert!(registry.write("speed", ParamValue::Float(200.0)).is_err());

    let pushed: Arc<Mutex<Vec<(String, ParamValue)>>> = Arc::default();
    let sink_log = pushed.clone();
    let sink = Box::new(move |name: &str, value: ParamValue| {
        if let Ok(mut log) = sink_log.lock() {
            log.push((name.to_string(), value));
        }
    });

    let running = Arc::new(AtomicBool::new(true));
    let mut cycle = MasterCycle::new(sched, HealthyLink, running).with_params(registry, sink);
    for _ in 0..10 {
        cycle.step();
    }
    {
        let log = pushed.lock().unwrap();
        let counters: Vec<_> = log.iter().map(|(_, v)| *v).collect();
        assert_eq!(counters, [ParamValue::Int(5), ParamValue::Int(10)]);
    }

    cycle.run(1).unwrap();
    let log = pushed.lock().unwrap();
    assert!(log.contains(&("speed".to_string(), ParamValue::Float(12.5))));
    assert_eq!(data.read_f64(speed), 12.5);
}
