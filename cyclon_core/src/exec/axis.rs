//! Axis execution object.
//!
//! Each cycle the axis reads its switch and feedback entries, advances its
//! trajectory source, runs the safety monitor on the resulting set point,
//! applies the monitor outcome and writes drive enable plus velocity
//! setpoint.
//!
//! Commands and status cross task boundaries through an [`AxisLink`]: a
//! lock-free mailbox read by the axis at the start of its cycle and a set
//! of status atomics published at the end.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};

use cyclon_common::motion::config::{AxisConfig, AxisEntryRole};
use cyclon_common::motion::error::{
    ERROR_AXIS_COMMAND_REJECTED_INTERLOCK, ERROR_AXIS_FIELDBUS_NOT_OK,
    ERROR_AXIS_PVT_SEQUENCE_MISSING,
};
use cyclon_common::motion::interlock::InterlockReason;
use tracing::{debug, info, warn};

use crate::error::SetupError;
use crate::image::{EntryId, EntrySource, ProcessData, ProcessDataBuilder};
use crate::monitor::limits::stopping_distance;
use crate::monitor::{Monitor, MonitorInput, MonitorOutcome};
use crate::pvt::{PvtAxis, PvtError, PvtSequence};

use super::object::HealthAwareExecutor;
use super::process_image::{Access, ProcessImage};

// ─── Link ───────────────────────────────────────────────────────────

/// Pending command in the axis mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AxisCommand {
    None = 0,
    MoveTo = 1,
    StartPvt = 2,
    Stop = 3,
}

// Both travel through `AtomicU8` cells of the link.
static_assertions::assert_eq_size!(AxisCommand, u8);
static_assertions::assert_eq_size!(InterlockReason, u8);

impl AxisCommand {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::MoveTo,
            2 => Self::StartPvt,
            3 => Self::Stop,
            _ => Self::None,
        }
    }
}

#[derive(Debug)]
struct LinkInner {
    name: String,
    // Status, written by the axis.
    actual_position: AtomicU64,
    set_position: AtomicU64,
    busy: AtomicBool,
    enabled: AtomicBool,
    interlock: AtomicU8,
    drive_interlock: AtomicBool,
    at_target: AtomicBool,
    error_code: AtomicU32,
    pvt_valid: AtomicBool,
    pvt_start: AtomicU64,
    pvt_duration: AtomicU64,
    // Commands, written by anyone.
    command: AtomicU8,
    command_target: AtomicU64,
    enable_cmd: AtomicBool,
    reset_cmd: AtomicBool,
}

/// Shared handle to an axis running in some task.
#[derive(Debug, Clone)]
pub struct AxisLink {
    inner: Arc<LinkInner>,
}

impl AxisLink {
    fn new(name: &str) -> Self {
        Self {
            inner: Arc::new(LinkInner {
                name: name.to_string(),
                actual_position: AtomicU64::new(0),
                set_position: AtomicU64::new(0),
                busy: AtomicBool::new(false),
                enabled: AtomicBool::new(false),
                interlock: AtomicU8::new(0),
                drive_interlock: AtomicBool::new(false),
                at_target: AtomicBool::new(false),
                error_code: AtomicU32::new(0),
                pvt_valid: AtomicBool::new(false),
                pvt_start: AtomicU64::new(0),
                pvt_duration: AtomicU64::new(0),
                command: AtomicU8::new(AxisCommand::None as u8),
                command_target: AtomicU64::new(0),
                enable_cmd: AtomicBool::new(false),
                reset_cmd: AtomicBool::new(false),
            }),
        }
    }

    fn post(&self, command: AxisCommand, target: f64) {
        self.inner
            .command_target
            .store(target.to_bits(), Ordering::Relaxed);
        self.inner.command.store(command as u8, Ordering::Release);
        if command != AxisCommand::Stop {
            self.inner.busy.store(true, Ordering::Release);
        }
    }

    fn take_command(&self) -> (AxisCommand, f64) {
        let cmd = AxisCommand::from_u8(
            self.inner
                .command
                .swap(AxisCommand::None as u8, Ordering::AcqRel),
        );
        let target = f64::from_bits(self.inner.command_target.load(Ordering::Relaxed));
        (cmd, target)
    }

    fn command_pending(&self) -> bool {
        self.inner.command.load(Ordering::Acquire) != AxisCommand::None as u8
    }

    /// Request drive enable / disable.
    pub fn set_enable(&self, enable: bool) {
        self.inner.enable_cmd.store(enable, Ordering::Release);
    }

    /// Request an axis + monitor error reset on the next cycle.
    pub fn request_error_reset(&self) {
        self.inner.reset_cmd.store(true, Ordering::Release);
    }

    pub fn enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    pub fn set_position(&self) -> f64 {
        f64::from_bits(self.inner.set_position.load(Ordering::Acquire))
    }

    pub fn interlock_reason(&self) -> InterlockReason {
        InterlockReason::from_u8(self.inner.interlock.load(Ordering::Acquire))
            .unwrap_or_default()
    }

    pub fn drive_interlock(&self) -> bool {
        self.inner.drive_interlock.load(Ordering::Acquire)
    }

    pub fn at_target(&self) -> bool {
        self.inner.at_target.load(Ordering::Acquire)
    }

    pub fn error_code(&self) -> u32 {
        self.inner.error_code.load(Ordering::Acquire)
    }
}

impl PvtAxis for AxisLink {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn actual_position(&self) -> f64 {
        f64::from_bits(self.inner.actual_position.load(Ordering::Acquire))
    }

    fn busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    fn interlocked(&self) -> bool {
        self.interlock_reason().is_active() || self.drive_interlock()
    }

    fn enabled(&self) -> bool {
        AxisLink::enabled(self)
    }

    fn error_code(&self) -> u32 {
        AxisLink::error_code(self)
    }

    fn pvt_valid(&self) -> bool {
        self.inner.pvt_valid.load(Ordering::Acquire)
    }

    fn pvt_start_position(&self) -> Option<f64> {
        self.pvt_valid()
            .then(|| f64::from_bits(self.inner.pvt_start.load(Ordering::Acquire)))
    }

    fn pvt_duration(&self) -> Option<f64> {
        self.pvt_valid()
            .then(|| f64::from_bits(self.inner.pvt_duration.load(Ordering::Acquire)))
    }

    fn set_enable(&self, enable: bool) {
        AxisLink::set_enable(self, enable);
    }

    fn error_reset(&self) {
        self.request_error_reset();
    }

    fn move_to(&self, position: f64) {
        self.post(AxisCommand::MoveTo, position);
    }

    fn start_pvt(&self) {
        self.post(AxisCommand::StartPvt, 0.0);
    }

    fn stop(&self) {
        self.post(AxisCommand::Stop, 0.0);
    }
}

// ─── Axis ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct AxisEntries {
    limit_bwd: EntryId,
    limit_fwd: EntryId,
    home: EntryId,
    external_interlock: Option<EntryId>,
    actual_position: EntryId,
    actual_velocity: EntryId,
    drive_enable: EntryId,
    velocity_setpoint: EntryId,
}

/// Where the set point comes from this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Trajectory {
    Hold,
    MoveTo { target: f64 },
    Pvt,
}

pub struct Axis {
    config: AxisConfig,
    data: ProcessData,
    entries: AxisEntries,
    monitor: Monitor,
    link: AxisLink,
    trajectory: Trajectory,
    pvt: Option<PvtSequence>,
    sample_time: f64,
    set_position: f64,
    set_velocity: f64,
    target_position: f64,
    enable: bool,
    drive_enabled: bool,
    fieldbus_ok: bool,
    error_code: u32,
    ext_traj_interlock: InterlockReason,
}

const READ_ROLES: [AxisEntryRole; 5] = [
    AxisEntryRole::LimitBwd,
    AxisEntryRole::LimitFwd,
    AxisEntryRole::Home,
    AxisEntryRole::ActualPosition,
    AxisEntryRole::ActualVelocity,
];
const WRITE_ROLES: [AxisEntryRole; 2] = [AxisEntryRole::DriveEnable, AxisEntryRole::VelocitySetpoint];

impl Axis {
    /// Declare every entry the axis touches as a fieldbus entry.
    pub fn declare(config: &AxisConfig, builder: &mut ProcessDataBuilder) {
        for role in READ_ROLES.iter().chain(WRITE_ROLES.iter()) {
            builder.ensure(&config.entry_name(*role), EntrySource::Fieldbus);
        }
        if config.monitor.enable_external_interlock {
            builder.ensure(
                &config.entry_name(AxisEntryRole::ExternalInterlock),
                EntrySource::Fieldbus,
            );
        }
    }

    /// Bind to process data. `sample_time` is the owning task period [s].
    pub fn new(config: AxisConfig, data: ProcessData, sample_time: f64) -> Result<Self, SetupError> {
        let entry = |role| data.require(&config.entry_name(role));
        let external_interlock = if config.monitor.enable_external_interlock {
            Some(entry(AxisEntryRole::ExternalInterlock)?)
        } else {
            data.lookup(&config.entry_name(AxisEntryRole::ExternalInterlock))
        };
        let entries = AxisEntries {
            limit_bwd: entry(AxisEntryRole::LimitBwd)?,
            limit_fwd: entry(AxisEntryRole::LimitFwd)?,
            home: entry(AxisEntryRole::Home)?,
            external_interlock,
            actual_position: entry(AxisEntryRole::ActualPosition)?,
            actual_velocity: entry(AxisEntryRole::ActualVelocity)?,
            drive_enable: entry(AxisEntryRole::DriveEnable)?,
            velocity_setpoint: entry(AxisEntryRole::VelocitySetpoint)?,
        };
        let link = AxisLink::new(&config.name);
        let monitor = Monitor::new(config.monitor.clone());
        info!(axis = %config.name, sample_time, "Axis created");
        Ok(Self {
            config,
            data,
            entries,
            monitor,
            link,
            trajectory: Trajectory::Hold,
            pvt: None,
            sample_time,
            set_position: 0.0,
            set_velocity: 0.0,
            target_position: 0.0,
            enable: false,
            drive_enabled: false,
            fieldbus_ok: false,
            error_code: 0,
            ext_traj_interlock: InterlockReason::None,
        })
    }

    /// Shared command/status handle.
    pub fn link(&self) -> AxisLink {
        self.link.clone()
    }

    #[inline]
    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    #[inline]
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Attach a validated PVT sequence.
    pub fn load_pvt(&mut self, sequence: PvtSequence) -> Result<(), PvtError> {
        if !sequence.is_valid() {
            return Err(PvtError::NotValidated);
        }
        let inner = &self.link.inner;
        inner.pvt_start.store(
            sequence.start_position().unwrap_or(0.0).to_bits(),
            Ordering::Release,
        );
        inner.pvt_duration.store(
            sequence.duration().unwrap_or(0.0).to_bits(),
            Ordering::Release,
        );
        inner.pvt_valid.store(true, Ordering::Release);
        debug!(
            axis = %self.config.name,
            points = sequence.point_count(),
            "PVT sequence loaded"
        );
        self.pvt = Some(sequence);
        Ok(())
    }

    /// Enable or disable the drive directly (setup / single-task use).
    pub fn set_enable(&mut self, enable: bool) {
        self.enable = enable;
        self.link.set_enable(enable);
    }

    /// Interlock reported by an external trajectory source.
    pub fn set_ext_traj_interlock(&mut self, reason: InterlockReason) {
        self.ext_traj_interlock = reason;
    }

    pub fn error_reset(&mut self) {
        self.monitor.error_reset();
        self.error_code = 0;
        debug!(axis = %self.config.name, "Axis error reset");
    }

    #[inline]
    pub fn set_point(&self) -> (f64, f64) {
        (self.set_position, self.set_velocity)
    }

    #[inline]
    pub fn drive_enabled(&self) -> bool {
        self.drive_enabled
    }

    #[inline]
    pub fn busy(&self) -> bool {
        self.trajectory != Trajectory::Hold
    }

    fn apply_commands(&mut self, actual_position: f64) {
        let inner = &self.link.inner;
        if inner.reset_cmd.swap(false, Ordering::AcqRel) {
            self.error_reset();
        }
        self.enable = self.link.inner.enable_cmd.load(Ordering::Acquire);

        let (command, target) = self.link.take_command();
        if command == AxisCommand::None {
            return;
        }
        let blocked = {
            let out = self.monitor.outcome();
            out.drive_interlock || (out.interlock_fwd && out.interlock_bwd)
        };
        match command {
            AxisCommand::None => {}
            AxisCommand::Stop => {
                self.stop_trajectory();
            }
            _ if blocked || !self.enable => {
                warn!(axis = %self.config.name, ?command, "Command rejected");
                self.error_code = ERROR_AXIS_COMMAND_REJECTED_INTERLOCK;
            }
            AxisCommand::MoveTo => {
                if !self.busy() {
                    self.set_position = actual_position;
                }
                self.target_position = target;
                self.trajectory = Trajectory::MoveTo { target };
            }
            AxisCommand::StartPvt => {
                let end_position = match self.pvt.as_mut() {
                    Some(seq) => match seq.init_seq() {
                        Ok(()) => Some(seq.end_time().and_then(|t| seq.position(t)).unwrap_or(0.0)),
                        Err(_) => None,
                    },
                    None => None,
                };
                match end_position {
                    Some(end) => {
                        self.target_position = end;
                        self.trajectory = Trajectory::Pvt;
                    }
                    None => {
                        warn!(axis = %self.config.name, "No valid PVT sequence");
                        self.error_code = ERROR_AXIS_PVT_SEQUENCE_MISSING;
                    }
                }
            }
        }
    }

    fn stop_trajectory(&mut self) {
        self.trajectory = Trajectory::Hold;
        self.set_velocity = 0.0;
        self.target_position = self.set_position;
    }

    /// Advance the set point by one sample.
    fn step_trajectory(&mut self) {
        match self.trajectory {
            Trajectory::Hold => self.set_velocity = 0.0,
            Trajectory::MoveTo { target } => {
                let step = self.config.positioning_velocity * self.sample_time;
                let remaining = target - self.set_position;
                if remaining.abs() <= step {
                    self.set_position = target;
                    self.set_velocity = 0.0;
                    self.trajectory = Trajectory::Hold;
                } else {
                    let dir = remaining.signum();
                    self.set_position += dir * step;
                    self.set_velocity = dir * self.config.positioning_velocity;
                }
            }
            Trajectory::Pvt => match self.pvt.as_mut() {
                Some(seq) => {
                    let running = seq.next_sample_step();
                    self.set_position = seq.curr_position();
                    self.set_velocity = if running { seq.curr_velocity() } else { 0.0 };
                    if !running {
                        self.trajectory = Trajectory::Hold;
                    }
                }
                None => self.stop_trajectory(),
            },
        }
    }

    fn apply_outcome(&mut self, outcome: &MonitorOutcome) {
        let blocked = (self.set_velocity > 0.0 && outcome.interlock_fwd)
            || (self.set_velocity < 0.0 && outcome.interlock_bwd);
        if blocked {
            if self.busy() {
                warn!(
                    axis = %self.config.name,
                    reason = %outcome.traj_interlock,
                    "Trajectory stopped by interlock"
                );
            }
            self.stop_trajectory();
        }
        self.drive_enabled = self.enable && self.fieldbus_ok && !outcome.drive_interlock;
        if outcome.error_code != 0 {
            self.error_code = outcome.error_code;
        }
    }

    fn publish(&self, actual_position: f64, outcome: &MonitorOutcome) {
        let inner = &self.link.inner;
        inner
            .actual_position
            .store(actual_position.to_bits(), Ordering::Release);
        inner
            .set_position
            .store(self.set_position.to_bits(), Ordering::Release);
        inner
            .interlock
            .store(outcome.traj_interlock as u8, Ordering::Release);
        inner
            .drive_interlock
            .store(outcome.drive_interlock, Ordering::Release);
        inner.at_target.store(outcome.at_target, Ordering::Release);
        inner.enabled.store(self.drive_enabled, Ordering::Release);
        inner.error_code.store(self.error_code, Ordering::Release);
        inner
            .busy
            .store(self.busy() || self.link.command_pending(), Ordering::Release);
    }
}

impl HealthAwareExecutor for Axis {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn execute(&mut self, fieldbus_ok: bool) {
        let e = self.entries;
        let (actual_position, actual_velocity, limit_bwd, limit_fwd, home, external_interlock) = {
            let d = &self.data;
            (
                d.read_f64(e.actual_position),
                d.read_f64(e.actual_velocity),
                d.read_bit(e.limit_bwd),
                d.read_bit(e.limit_fwd),
                d.read_bit(e.home),
                e.external_interlock.is_none_or(|id| d.read_bit(id)),
            )
        };

        if fieldbus_ok != self.fieldbus_ok {
            if fieldbus_ok {
                info!(axis = %self.config.name, "Fieldbus OK");
            } else {
                warn!(axis = %self.config.name, "Fieldbus not OK, drive disabled");
            }
        }
        self.fieldbus_ok = fieldbus_ok;

        self.apply_commands(actual_position);

        if !fieldbus_ok {
            self.error_code = ERROR_AXIS_FIELDBUS_NOT_OK;
            self.stop_trajectory();
        }
        if !self.enable || !fieldbus_ok {
            self.stop_trajectory();
            self.set_position = actual_position;
            self.target_position = actual_position;
        } else {
            self.step_trajectory();
        }

        let input = MonitorInput {
            enabled: self.enable && fieldbus_ok,
            actual_position,
            actual_velocity,
            target_position: self.target_position,
            set_position: self.set_position,
            set_velocity: self.set_velocity,
            controller_output: self.config.kff * self.set_velocity,
            dist_to_stop: stopping_distance(self.set_velocity, self.config.stop_deceleration),
            limit_bwd,
            limit_fwd,
            home,
            external_interlock,
            ext_traj_interlock: self.ext_traj_interlock,
            ext_enc_interlock: InterlockReason::None,
        };
        let outcome = self.monitor.evaluate(&input);
        self.apply_outcome(&outcome);

        let velocity = if self.drive_enabled {
            self.config.kff * self.set_velocity
        } else {
            0.0
        };
        self.data.write_bit(e.drive_enable, self.drive_enabled);
        self.data.write_f64(e.velocity_setpoint, velocity);

        self.publish(actual_position, &outcome);
    }

    fn build_process_image(&self) -> ProcessImage {
        let mut image = ProcessImage::new();
        let e = &self.entries;
        for id in [
            e.limit_bwd,
            e.limit_fwd,
            e.home,
            e.actual_position,
            e.actual_velocity,
        ] {
            image.add_entry(&self.data, id, Access::Read);
        }
        if let Some(id) = e.external_interlock {
            image.add_entry(&self.data, id, Access::Read);
        }
        image.add_entry(&self.data, e.drive_enable, Access::Write);
        image.add_entry(&self.data, e.velocity_setpoint, Access::Write);
        image
    }

    fn error_code(&self) -> u32 {
        self.error_code
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pvt::PvtPoint;
    use cyclon_common::motion::config::MonitorConfig;

    fn config() -> AxisConfig {
        AxisConfig {
            name: "ax1".into(),
            task_index: 0,
            positioning_velocity: 10.0,
            stop_deceleration: 0.0,
            kff: 1.0,
            entries: Default::default(),
            monitor: MonitorConfig {
                at_target_tol: 0.01,
                pos_lag_tol: 1.0,
                pos_lag_time: 10,
                max_vel: 100.0,
                ..MonitorConfig::default()
            },
        }
    }

    fn axis() -> (Axis, ProcessData) {
        let cfg = config();
        let mut b = ProcessDataBuilder::new();
        Axis::declare(&cfg, &mut b);
        let data = b.build();
        for role in [AxisEntryRole::LimitBwd, AxisEntryRole::LimitFwd] {
            data.write_bit(data.lookup(&cfg.entry_name(role)).unwrap(), true);
        }
        (Axis::new(cfg, data.clone(), 0.01).unwrap(), data)
    }

    /// Drive model: actual follows set point exactly.
    fn follow(axis: &Axis, data: &ProcessData) {
        let id = data.lookup("ax1.act_pos").unwrap();
        data.write_f64(id, axis.set_point().0);
    }

    #[test]
    fn move_to_reaches_target() {
        let (mut ax, data) = axis();
        ax.set_enable(true);
        ax.execute(true);
        ax.link().move_to(0.5);
        assert!(ax.link().busy());
        for _ in 0..10 {
            ax.execute(true);
            follow(&ax, &data);
            assert!(ax.drive_enabled());
        }
        ax.execute(true);
        assert_eq!(ax.set_point(), (0.5, 0.0));
        assert!(!ax.busy());
        assert!(!ax.link().busy());
        assert_eq!(ax.error_code(), 0);
    }

    #[test]
    fn fieldbus_loss_disables_drive() {
        let (mut ax, data) = axis();
        ax.set_enable(true);
        ax.execute(true);
        assert!(data.read_bit(data.lookup("ax1.drv_enable").unwrap()));
        ax.execute(false);
        assert!(!ax.drive_enabled());
        assert!(!data.read_bit(data.lookup("ax1.drv_enable").unwrap()));
        assert_eq!(ax.error_code(), ERROR_AXIS_FIELDBUS_NOT_OK);
    }

    #[test]
    fn both_limits_low_disables_drive() {
        let (mut ax, data) = axis();
        ax.set_enable(true);
        data.write_bit(data.lookup("ax1.limit_bwd").unwrap(), false);
        data.write_bit(data.lookup("ax1.limit_fwd").unwrap(), false);
        ax.execute(true);
        assert!(!ax.drive_enabled());
        assert_eq!(ax.link().interlock_reason(), InterlockReason::BothLimits);
        assert!(ax.link().interlocked());
    }

    #[test]
    fn forward_limit_stops_forward_move() {
        let (mut ax, data) = axis();
        ax.set_enable(true);
        ax.execute(true);
        ax.link().move_to(5.0);
        ax.execute(true);
        assert!(ax.busy());
        data.write_bit(data.lookup("ax1.limit_fwd").unwrap(), false);
        ax.execute(true);
        assert!(!ax.busy());
        assert_eq!(ax.set_point().1, 0.0);
        assert!(ax.drive_enabled());
    }

    #[test]
    fn start_pvt_without_sequence_is_error() {
        let (mut ax, _) = axis();
        ax.set_enable(true);
        ax.execute(true);
        ax.link().start_pvt();
        ax.execute(true);
        assert_eq!(ax.error_code(), ERROR_AXIS_PVT_SEQUENCE_MISSING);
    }

    #[test]
    fn pvt_runs_to_end() {
        let (mut ax, data) = axis();
        let seq = PvtSequence::from_points(
            0.01,
            [PvtPoint::new(0.0, 0.0, 0.0), PvtPoint::new(0.1, 0.0, 0.1)],
        )
        .unwrap();
        ax.load_pvt(seq).unwrap();
        assert_eq!(ax.link().pvt_start_position(), Some(0.0));
        ax.set_enable(true);
        ax.execute(true);
        ax.link().start_pvt();
        for _ in 0..20 {
            ax.execute(true);
            follow(&ax, &data);
        }
        assert!(!ax.busy());
        assert!((ax.set_point().0 - 0.1).abs() < 1e-9);
    }

    #[test]
    fn disabled_axis_rejects_moves() {
        let (mut ax, _) = axis();
        ax.execute(true);
        ax.link().move_to(1.0);
        ax.execute(true);
        assert!(!ax.busy());
        assert_eq!(ax.error_code(), ERROR_AXIS_COMMAND_REJECTED_INTERLOCK);
    }

    #[test]
    fn process_image_declares_writes() {
        let (ax, _) = axis();
        let image = ax.build_process_image();
        let writes: Vec<&str> = image.writes().map(|i| i.name.as_str()).collect();
        assert_eq!(writes, ["ax1.drv_enable", "ax1.vel_set"]);
        assert_eq!(image.len(), 7);
    }
}
