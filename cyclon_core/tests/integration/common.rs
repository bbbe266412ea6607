//! Shared rig: config directory on disk, assembled system, simulated
//! fieldbus and a master cycle stepped by hand.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use cyclon_core::config::load_config_dir;
use cyclon_core::cycle::MasterCycle;
use cyclon_core::exec::{AxisLink, PvtControlHandle};
use cyclon_core::image::ProcessData;
use cyclon_core::pvt::AxisGroup;
use cyclon_core::sim::SimFieldbus;
use cyclon_core::system::System;
use tempfile::TempDir;

pub const TWO_AXES: &str = r#"
[shared]
service_name = "cyclon-test"

[scheduler]
master_cycle_us = 1000

[[scheduler.tasks]]
index = 1
name = "motion"
sample_time_us = 2000

[[scheduler.tasks]]
index = 2
name = "io"
sample_time_us = 5000

[sim]
travel_min = -50.0
travel_max = 50.0

[[axis]]
name = "ax1"
task_index = 1
positioning_velocity = 20.0

[axis.monitor]
at_target_tol = 0.05
at_target_time = 3
pos_lag_tol = 1.0
pos_lag_time = 10
max_vel = 100.0

[[axis]]
name = "ax2"
task_index = 1
positioning_velocity = 20.0

[axis.monitor]
at_target_tol = 0.05
at_target_time = 3
pos_lag_tol = 1.0
pos_lag_time = 10
max_vel = 100.0

[[event]]
name = "heartbeat"
task_index = 2
interval = 4
output = "io.heartbeat"

[pvt]
task_index = 1
trigger_entry = "io.pvt_trigger"

[[pvt.axes]]
axis = "ax1"
points = [
    { position = 0.0, velocity = 0.0, time = 0.0 },
    { position = 5.0, velocity = 10.0, time = 1.0 },
    { position = 10.0, velocity = 0.0, time = 2.0 },
]

[[pvt.axes]]
axis = "ax2"
points = [
    { position = 0.0, velocity = 0.0, time = 0.0 },
    { position = -5.0, velocity = 0.0, time = 2.0 },
]

[publish]
default_sample_cycles = 10

[[publish.params]]
name = "ax1.position"
entry = "ax1.act_pos"
type = "float"
"#;

pub struct Rig {
    pub cycle: MasterCycle<SimFieldbus>,
    pub data: ProcessData,
    pub axes: Vec<AxisLink>,
    pub groups: Vec<AxisGroup>,
    pub pvt: Option<PvtControlHandle>,
    _dir: TempDir,
}

impl Rig {
    /// Load `toml` from a fresh config directory, enable every axis and
    /// start the workers.
    pub fn start(toml: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("cyclon.toml"), toml).unwrap();
        let config = load_config_dir(dir.path()).unwrap();
        let mut system = System::build(&config).unwrap();
        for axis in &system.axes {
            axis.set_enable(true);
        }
        system.scheduler.start().unwrap();
        let master_cycle_s = f64::from(config.scheduler.master_cycle_us) * 1e-6;
        let fieldbus = SimFieldbus::new(
            config.sim.clone(),
            &config.axes,
            system.data.clone(),
            master_cycle_s,
        )
        .unwrap();
        let running = Arc::new(AtomicBool::new(true));
        Self {
            cycle: MasterCycle::new(system.scheduler, fieldbus, running),
            data: system.data,
            axes: system.axes,
            groups: system.groups,
            pvt: system.pvt,
            _dir: dir,
        }
    }

    /// One master cycle, then wait for every released worker to finish.
    pub fn step(&mut self) {
        self.cycle.step();
        assert!(
            self.cycle.scheduler().wait_idle(Duration::from_secs(1)),
            "workers did not finish"
        );
    }

    pub fn steps(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Step until `done` holds; returns the number of cycles taken.
    pub fn step_until(&mut self, max: usize, mut done: impl FnMut(&Self) -> bool) -> usize {
        for n in 0..max {
            if done(self) {
                return n;
            }
            self.step();
        }
        panic!("condition not reached within {max} cycles");
    }

    pub fn bit(&self, name: &str) -> bool {
        self.data.read_bit(self.data.lookup(name).unwrap())
    }

    pub fn value(&self, name: &str) -> f64 {
        self.data.read_f64(self.data.lookup(name).unwrap())
    }
}
