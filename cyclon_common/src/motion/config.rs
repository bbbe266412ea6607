//! Axis, monitor and PVT configuration structures.
//!
//! All config types use `serde::Deserialize` for TOML loading.
//! Optional fields use `#[serde(default)]` so partial tables stay valid.

use serde::{Deserialize, Serialize};

use crate::config::check_range;
use crate::consts::{
    MAX_VEL_TRAJ_DELAY_DEFAULT, OUT_INCREASE_THRESHOLD_DEFAULT, OUT_INCREASE_WINDOW_DEFAULT,
    REASONABLE_MOVE_THRESHOLD_DEFAULT,
};

/// Largest debounce time accepted for any monitor counter [cycles].
pub const DEBOUNCE_CYCLES_MAX: u32 = 1_000_000;

// ─── Monitor ────────────────────────────────────────────────────────

/// Safety monitor thresholds and enables for one axis.
///
/// Tolerances and enables survive `error_reset()`; only counters and
/// latched flags are cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// At-target supervision enable.
    #[serde(default = "default_true")]
    pub enable_at_target: bool,
    /// |target − actual| below which the axis counts as at target.
    #[serde(default)]
    pub at_target_tol: f64,
    /// Cycles the error must stay below tolerance before at-target is set.
    #[serde(default)]
    pub at_target_time: u32,

    /// Position lag supervision enable.
    #[serde(default = "default_true")]
    pub enable_lag: bool,
    /// Maximum |actual − set position|.
    #[serde(default)]
    pub pos_lag_tol: f64,
    /// Trajectory-tier debounce [cycles]; drive tier uses twice this.
    #[serde(default)]
    pub pos_lag_time: u32,

    /// Over-velocity supervision enable.
    #[serde(default = "default_true")]
    pub enable_max_vel: bool,
    /// Maximum |velocity| (set or actual).
    #[serde(default)]
    pub max_vel: f64,
    /// Trajectory-tier delay [cycles].
    #[serde(default = "default_max_vel_traj_delay")]
    pub max_vel_traj_delay: u32,
    /// Drive-tier delay [cycles]; twice the trajectory delay when omitted.
    #[serde(default)]
    pub max_vel_drive_delay: Option<u32>,

    /// Controller output high-limit supervision enable.
    #[serde(default)]
    pub enable_cntrl_high_limit: bool,
    /// Controller output magnitude limit.
    #[serde(default)]
    pub cntrl_output_high_limit: f64,

    /// Controller-output-increase-at-limit supervision enable.
    #[serde(default)]
    pub enable_cntrl_increase_at_limit: bool,
    /// Velocity feed-forward gain used to derive the expected velocity.
    #[serde(default)]
    pub cntrl_kff: f64,
    /// Observation window [cycles].
    #[serde(default = "default_increase_window")]
    pub increase_window_cycles: u32,
    /// Increase-counter threshold inside one window [cycles].
    #[serde(default = "default_increase_threshold")]
    pub increase_threshold_cycles: u32,
    /// Reasonable-motion threshold inside one window [cycles].
    #[serde(default = "default_reasonable_move_threshold")]
    pub reasonable_move_threshold_cycles: u32,

    #[serde(default)]
    pub enable_soft_limit_bwd: bool,
    #[serde(default)]
    pub soft_limit_bwd: f64,
    #[serde(default)]
    pub enable_soft_limit_fwd: bool,
    #[serde(default)]
    pub soft_limit_fwd: f64,

    /// Latch an error code when the backward hard limit interlocks.
    #[serde(default)]
    pub enable_alarm_at_hard_limit_bwd: bool,
    /// Latch an error code when the forward hard limit interlocks.
    #[serde(default)]
    pub enable_alarm_at_hard_limit_fwd: bool,

    /// Supervise the external hardware interlock input.
    #[serde(default)]
    pub enable_external_interlock: bool,
}

fn default_true() -> bool {
    true
}
fn default_max_vel_traj_delay() -> u32 {
    MAX_VEL_TRAJ_DELAY_DEFAULT
}
fn default_increase_window() -> u32 {
    OUT_INCREASE_WINDOW_DEFAULT
}
fn default_increase_threshold() -> u32 {
    OUT_INCREASE_THRESHOLD_DEFAULT
}
fn default_reasonable_move_threshold() -> u32 {
    REASONABLE_MOVE_THRESHOLD_DEFAULT
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enable_at_target: true,
            at_target_tol: 0.0,
            at_target_time: 0,
            enable_lag: true,
            pos_lag_tol: 0.0,
            pos_lag_time: 0,
            enable_max_vel: true,
            max_vel: 0.0,
            max_vel_traj_delay: MAX_VEL_TRAJ_DELAY_DEFAULT,
            max_vel_drive_delay: None,
            enable_cntrl_high_limit: false,
            cntrl_output_high_limit: 0.0,
            enable_cntrl_increase_at_limit: false,
            cntrl_kff: 0.0,
            increase_window_cycles: OUT_INCREASE_WINDOW_DEFAULT,
            increase_threshold_cycles: OUT_INCREASE_THRESHOLD_DEFAULT,
            reasonable_move_threshold_cycles: REASONABLE_MOVE_THRESHOLD_DEFAULT,
            enable_soft_limit_bwd: false,
            soft_limit_bwd: 0.0,
            enable_soft_limit_fwd: false,
            soft_limit_fwd: 0.0,
            enable_alarm_at_hard_limit_bwd: false,
            enable_alarm_at_hard_limit_fwd: false,
            enable_external_interlock: false,
        }
    }
}

impl MonitorConfig {
    /// Effective drive-tier over-velocity delay [cycles].
    #[inline]
    pub fn effective_max_vel_drive_delay(&self) -> u32 {
        self.max_vel_drive_delay
            .unwrap_or_else(|| self.max_vel_traj_delay.saturating_mul(2))
    }

    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("at_target_tol", self.at_target_tol),
            ("pos_lag_tol", self.pos_lag_tol),
            ("max_vel", self.max_vel),
            ("cntrl_output_high_limit", self.cntrl_output_high_limit),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{field} {value} must be finite and >= 0"));
            }
        }
        check_range("at_target_time", self.at_target_time, 0, DEBOUNCE_CYCLES_MAX)?;
        check_range("pos_lag_time", self.pos_lag_time, 0, DEBOUNCE_CYCLES_MAX)?;
        check_range(
            "max_vel_traj_delay",
            self.max_vel_traj_delay,
            0,
            DEBOUNCE_CYCLES_MAX,
        )?;
        if self.effective_max_vel_drive_delay() < self.max_vel_traj_delay {
            return Err(format!(
                "max_vel_drive_delay {} shorter than max_vel_traj_delay {}",
                self.effective_max_vel_drive_delay(),
                self.max_vel_traj_delay
            ));
        }
        if self.enable_cntrl_increase_at_limit {
            if self.increase_window_cycles == 0 {
                return Err("increase_window_cycles must be > 0".to_string());
            }
            if self.increase_threshold_cycles > self.increase_window_cycles
                || self.reasonable_move_threshold_cycles > self.increase_window_cycles
            {
                return Err(format!(
                    "increase thresholds ({}, {}) exceed window {}",
                    self.increase_threshold_cycles,
                    self.reasonable_move_threshold_cycles,
                    self.increase_window_cycles
                ));
            }
        }
        if self.enable_soft_limit_bwd
            && self.enable_soft_limit_fwd
            && self.soft_limit_bwd >= self.soft_limit_fwd
        {
            return Err(format!(
                "soft_limit_bwd {} must be below soft_limit_fwd {}",
                self.soft_limit_bwd, self.soft_limit_fwd
            ));
        }
        Ok(())
    }
}

// ─── Axis ───────────────────────────────────────────────────────────

/// Process data entry names used by an axis.
///
/// Omitted names default to `<axis name>.<role>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisEntriesConfig {
    #[serde(default)]
    pub limit_bwd: Option<String>,
    #[serde(default)]
    pub limit_fwd: Option<String>,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub external_interlock: Option<String>,
    #[serde(default)]
    pub actual_position: Option<String>,
    #[serde(default)]
    pub actual_velocity: Option<String>,
    #[serde(default)]
    pub drive_enable: Option<String>,
    #[serde(default)]
    pub velocity_setpoint: Option<String>,
}

/// Role of an entry inside an axis process image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisEntryRole {
    LimitBwd,
    LimitFwd,
    Home,
    ExternalInterlock,
    ActualPosition,
    ActualVelocity,
    DriveEnable,
    VelocitySetpoint,
}

impl AxisEntryRole {
    /// Suffix used for default entry names.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::LimitBwd => "limit_bwd",
            Self::LimitFwd => "limit_fwd",
            Self::Home => "home",
            Self::ExternalInterlock => "ext_interlock",
            Self::ActualPosition => "act_pos",
            Self::ActualVelocity => "act_vel",
            Self::DriveEnable => "drv_enable",
            Self::VelocitySetpoint => "vel_set",
        }
    }
}

/// Per-axis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    /// Unique axis name (e.g. "ax1").
    pub name: String,
    /// Task executing this axis (0 = master task).
    #[serde(default)]
    pub task_index: usize,
    /// Constant velocity used for positioning moves [units/s].
    #[serde(default = "default_positioning_velocity")]
    pub positioning_velocity: f64,
    /// Deceleration used to compute the soft-limit stopping distance [units/s²].
    /// Zero disables look-ahead (stopping distance 0).
    #[serde(default)]
    pub stop_deceleration: f64,
    /// Velocity feed-forward gain producing the controller output.
    #[serde(default = "default_kff")]
    pub kff: f64,
    /// Entry name overrides.
    #[serde(default)]
    pub entries: AxisEntriesConfig,
    /// Safety monitor configuration.
    #[serde(default)]
    pub monitor: MonitorConfig,
}

fn default_positioning_velocity() -> f64 {
    10.0
}
fn default_kff() -> f64 {
    1.0
}

impl AxisConfig {
    /// Resolve the process data entry name for `role`.
    pub fn entry_name(&self, role: AxisEntryRole) -> String {
        let configured = match role {
            AxisEntryRole::LimitBwd => &self.entries.limit_bwd,
            AxisEntryRole::LimitFwd => &self.entries.limit_fwd,
            AxisEntryRole::Home => &self.entries.home,
            AxisEntryRole::ExternalInterlock => &self.entries.external_interlock,
            AxisEntryRole::ActualPosition => &self.entries.actual_position,
            AxisEntryRole::ActualVelocity => &self.entries.actual_velocity,
            AxisEntryRole::DriveEnable => &self.entries.drive_enable,
            AxisEntryRole::VelocitySetpoint => &self.entries.velocity_setpoint,
        };
        configured
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.name, role.suffix()))
    }

    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("axis name cannot be empty".to_string());
        }
        if !(self.positioning_velocity.is_finite() && self.positioning_velocity > 0.0) {
            return Err(format!(
                "axis '{}': positioning_velocity {} must be > 0",
                self.name, self.positioning_velocity
            ));
        }
        if !(self.stop_deceleration.is_finite() && self.stop_deceleration >= 0.0) {
            return Err(format!(
                "axis '{}': stop_deceleration {} must be >= 0",
                self.name, self.stop_deceleration
            ));
        }
        self.monitor
            .validate()
            .map_err(|e| format!("axis '{}': {e}", self.name))
    }
}

// ─── PVT ────────────────────────────────────────────────────────────

/// One (position, velocity, time) waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PvtPointConfig {
    pub position: f64,
    pub velocity: f64,
    pub time: f64,
}

/// Waypoints for one participating axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PvtAxisConfig {
    /// Name of the axis (must match an `AxisConfig::name`).
    pub axis: String,
    /// Ordered waypoints, strictly increasing in time.
    pub points: Vec<PvtPointConfig>,
}

/// Multi-axis PVT controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PvtConfig {
    /// Task executing the controller (0 = master task).
    #[serde(default)]
    pub task_index: usize,
    /// Max |actual − start| for an axis to count as at its start position.
    #[serde(default = "default_start_tolerance")]
    pub start_tolerance: f64,
    /// Optional digital output pulsed when the sequences start.
    #[serde(default)]
    pub trigger_entry: Option<String>,
    /// Participating axes.
    pub axes: Vec<PvtAxisConfig>,
}

fn default_start_tolerance() -> f64 {
    0.01
}

impl PvtConfig {
    /// Validate shape; waypoint ordering is enforced when sequences are built.
    pub fn validate(&self) -> Result<(), String> {
        if self.axes.is_empty() {
            return Err("pvt: at least one axis required".to_string());
        }
        if !(self.start_tolerance.is_finite() && self.start_tolerance > 0.0) {
            return Err(format!(
                "pvt: start_tolerance {} must be > 0",
                self.start_tolerance
            ));
        }
        for ax in &self.axes {
            if ax.points.len() < 2 {
                return Err(format!(
                    "pvt: axis '{}' needs at least 2 points, got {}",
                    ax.axis,
                    ax.points.len()
                ));
            }
        }
        Ok(())
    }
}

// ─── Axis Groups ────────────────────────────────────────────────────

/// Named set of axes enabled, reset and stopped together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisGroupConfig {
    pub name: String,
    /// Member axis names, in order.
    pub axes: Vec<String>,
}

impl AxisGroupConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("group: name cannot be empty".to_string());
        }
        if self.axes.is_empty() {
            return Err(format!("group '{}': at least one axis required", self.name));
        }
        for (i, axis) in self.axes.iter().enumerate() {
            if self.axes[..i].contains(axis) {
                return Err(format!("group '{}': axis '{axis}' listed twice", self.name));
            }
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
