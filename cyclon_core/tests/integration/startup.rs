//! Integration test: startup sequence.
//!
//! Validates: `cyclon.toml` on disk → cross-object validation → system
//! assembly → workers started with the declared objects → bounded run
//! stops the workers again.

use std::fs;

use cyclon_common::config::ConfigError;
use cyclon_common::task::ObjectKind;
use cyclon_core::config::load_config_dir;
use cyclon_core::error::SetupError;
use cyclon_core::system::System;
use tempfile::TempDir;

use super::common::{Rig, TWO_AXES};

#[test]
fn assembles_objects_into_their_tasks() {
    let rig = Rig::start(TWO_AXES);
    let sched = rig.cycle.scheduler();
    assert!(sched.is_started());
    assert_eq!(sched.task_count(), 2);
    assert_eq!(sched.period(1), Some(2));
    assert_eq!(sched.period(2), Some(5));

    let report = sched.report();
    let motion = report.iter().find(|t| t.index == 1).unwrap();
    let names: Vec<_> = motion.objects.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["ax1", "ax2", "pvtctrl"]);
    assert_eq!(motion.objects[0].kind, ObjectKind::Axis);
    assert_eq!(motion.objects[2].kind, ObjectKind::LogicProgram);

    let io = report.iter().find(|t| t.index == 2).unwrap();
    assert_eq!(io.objects.len(), 1);
    assert_eq!(io.objects[0].kind, ObjectKind::TimedEvent);
    assert!(sched.master_objects().is_empty());
}

#[test]
fn missing_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = load_config_dir(dir.path()).unwrap_err();
    assert!(matches!(err, SetupError::Config(ConfigError::FileNotFound)));
    assert_eq!(err.code(), 0x30000);
}

#[test]
fn output_written_from_two_tasks_is_rejected_at_assembly() {
    let dir = TempDir::new().unwrap();
    let toml = r#"
[[scheduler.tasks]]
index = 1
sample_time_us = 4000

[[axis]]
name = "ax1"
task_index = 1

[[event]]
name = "blink"
interval = 2
output = "ax1.vel_set"
"#;
    fs::write(dir.path().join("cyclon.toml"), toml).unwrap();
    let config = load_config_dir(dir.path()).unwrap();
    match System::build(&config) {
        Err(SetupError::WriteOverlap { task_a, task_b, items }) => {
            assert_eq!((task_a, task_b), (0, 1));
            assert_eq!(items, ["ax1.vel_set"]);
        }
        Err(other) => panic!("expected write overlap, got {other:?}"),
        Ok(_) => panic!("expected write overlap"),
    }
}

#[test]
fn bounded_run_stops_workers() {
    let mut rig = Rig::start(TWO_AXES);
    let stats = rig.cycle.run(20).unwrap();
    assert_eq!(stats.cycle_count, 20);
    let sched = rig.cycle.scheduler();
    assert!(!sched.is_started());
    assert_eq!(sched.ticks(), 20);
    assert_eq!(sched.release_count(1) + sched.overruns(1), 10);
    assert_eq!(sched.release_count(2) + sched.overruns(2), 4);
}
