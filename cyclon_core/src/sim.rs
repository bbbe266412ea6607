//! Simulated fieldbus.
//!
//! Stands in for the fieldbus exchange: every cycle it integrates each
//! axis' velocity setpoint into its actual position while the drive is
//! enabled, and drives the limit switches low outside the travel range.

use cyclon_common::motion::config::{AxisConfig, AxisEntryRole};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cycle::{FieldbusLink, FieldbusStatus};
use crate::error::SetupError;
use crate::image::{EntryId, ProcessData};

/// Simulated machine geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Backward end of travel; the backward limit switch opens beyond it.
    #[serde(default = "default_travel_min")]
    pub travel_min: f64,
    /// Forward end of travel.
    #[serde(default = "default_travel_max")]
    pub travel_max: f64,
    /// Home switch closes within this distance of 0.
    #[serde(default = "default_home_window")]
    pub home_window: f64,
}

fn default_travel_min() -> f64 {
    -1000.0
}
fn default_travel_max() -> f64 {
    1000.0
}
fn default_home_window() -> f64 {
    0.1
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            travel_min: default_travel_min(),
            travel_max: default_travel_max(),
            home_window: default_home_window(),
        }
    }
}

#[derive(Debug)]
struct SimAxis {
    position: f64,
    limit_bwd: EntryId,
    limit_fwd: EntryId,
    home: EntryId,
    external_interlock: Option<EntryId>,
    actual_position: EntryId,
    actual_velocity: EntryId,
    drive_enable: EntryId,
    velocity_setpoint: EntryId,
}

/// Drive + I/O simulation over [`ProcessData`].
#[derive(Debug)]
pub struct SimFieldbus {
    config: SimConfig,
    data: ProcessData,
    axes: Vec<SimAxis>,
    dt: f64,
    link_ok: bool,
    fault_code: u32,
}

impl SimFieldbus {
    /// `cycle_time` is the master cycle [s].
    pub fn new(
        config: SimConfig,
        axes: &[AxisConfig],
        data: ProcessData,
        cycle_time: f64,
    ) -> Result<Self, SetupError> {
        let sim_axes = axes
            .iter()
            .map(|a| -> Result<SimAxis, SetupError> {
                let id = |role: AxisEntryRole| data.require(&a.entry_name(role));
                Ok(SimAxis {
                    position: 0.0,
                    limit_bwd: id(AxisEntryRole::LimitBwd)?,
                    limit_fwd: id(AxisEntryRole::LimitFwd)?,
                    home: id(AxisEntryRole::Home)?,
                    external_interlock: data
                        .lookup(&a.entry_name(AxisEntryRole::ExternalInterlock)),
                    actual_position: id(AxisEntryRole::ActualPosition)?,
                    actual_velocity: id(AxisEntryRole::ActualVelocity)?,
                    drive_enable: id(AxisEntryRole::DriveEnable)?,
                    velocity_setpoint: id(AxisEntryRole::VelocitySetpoint)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(axes = sim_axes.len(), cycle_time, "Simulated fieldbus created");
        let sim = Self {
            config,
            data,
            axes: sim_axes,
            dt: cycle_time,
            link_ok: true,
            fault_code: 0,
        };
        sim.write_inputs();
        Ok(sim)
    }

    /// Simulate a link loss (`false`) or recovery.
    pub fn set_link_ok(&mut self, ok: bool) {
        if ok != self.link_ok {
            warn!(ok, "Simulated fieldbus link state changed");
        }
        self.link_ok = ok;
    }

    pub fn set_fault_code(&mut self, code: u32) {
        self.fault_code = code;
    }

    /// Place an axis at `position` (index in configuration order).
    pub fn set_position(&mut self, axis: usize, position: f64) {
        if let Some(a) = self.axes.get_mut(axis) {
            a.position = position;
        }
        self.write_inputs();
    }

    pub fn position(&self, axis: usize) -> Option<f64> {
        self.axes.get(axis).map(|a| a.position)
    }

    fn write_inputs(&self) {
        let d = &self.data;
        for a in &self.axes {
            d.write_f64(a.actual_position, a.position);
            d.write_bit(a.limit_bwd, a.position > self.config.travel_min);
            d.write_bit(a.limit_fwd, a.position < self.config.travel_max);
            d.write_bit(a.home, a.position.abs() <= self.config.home_window);
            if let Some(id) = a.external_interlock {
                d.write_bit(id, true);
            }
        }
    }
}

impl FieldbusLink for SimFieldbus {
    fn exchange(&mut self) -> FieldbusStatus {
        if self.link_ok {
            for a in &mut self.axes {
                let velocity = if self.data.read_bit(a.drive_enable) {
                    self.data.read_f64(a.velocity_setpoint)
                } else {
                    0.0
                };
                a.position += velocity * self.dt;
                self.data.write_f64(a.actual_velocity, velocity);
            }
            self.write_inputs();
        }
        FieldbusStatus {
            ok: self.link_ok,
            fault_code: self.fault_code,
        }
    }
}
