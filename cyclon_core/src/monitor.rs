//! Axis safety monitor.
//!
//! Evaluated once per cycle by the owning axis. Every condition that can
//! stop motion has a trajectory tier (stop the profile) and a drive tier
//! (disable the actuator); the drive tier is never reached before the
//! trajectory tier.
//!
//! The monitor holds no reference to its axis: the axis passes a
//! [`MonitorInput`] snapshot and consumes the returned [`MonitorOutcome`].
//!
//! ## Evaluation Order
//! 1. Hard limits (both-low wiring fault, directional interlocks, alarms)
//! 2. Soft limits against the caller-supplied stopping distance
//! 3. At-target debounce
//! 4. External hardware interlock
//! 5. (only while enabled) position lag, over-velocity, controller output
//!    high limit, controller output increase at limit
//!
//! Limit and soft-limit interlocks are recomputed every cycle. Lag,
//! velocity and controller-output flags latch until [`Monitor::error_reset`].

pub mod debounce;
pub mod increase;
pub mod limits;

use cyclon_common::motion::config::MonitorConfig;
use cyclon_common::motion::error::MonitorError;
use cyclon_common::motion::interlock::InterlockReason;
use tracing::{debug, warn};

use self::debounce::{AtTargetFilter, LagSupervisor, VelocitySupervisor};
use self::increase::{IncreaseAtLimit, IncreaseInput, IncreaseWindow};
use self::limits::{LimitInput, LimitResult, SoftLimits, evaluate_limits};

// ─── Input / Outcome ────────────────────────────────────────────────

/// Per-cycle snapshot handed to the monitor by its axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorInput {
    /// Axis drive enabled (supervision of lag/velocity/output active).
    pub enabled: bool,
    pub actual_position: f64,
    pub actual_velocity: f64,
    /// Final target of the current move.
    pub target_position: f64,
    /// Current trajectory set point.
    pub set_position: f64,
    pub set_velocity: f64,
    pub controller_output: f64,
    /// Distance needed to brake from the current velocity.
    pub dist_to_stop: f64,
    /// Backward limit switch input (high = OK).
    pub limit_bwd: bool,
    /// Forward limit switch input (high = OK).
    pub limit_fwd: bool,
    pub home: bool,
    /// External hardware interlock input (high = OK).
    pub external_interlock: bool,
    /// Interlock reported by the trajectory source.
    pub ext_traj_interlock: InterlockReason,
    /// Interlock reported by the encoder source.
    pub ext_enc_interlock: InterlockReason,
}

impl Default for MonitorInput {
    fn default() -> Self {
        Self {
            enabled: false,
            actual_position: 0.0,
            actual_velocity: 0.0,
            target_position: 0.0,
            set_position: 0.0,
            set_velocity: 0.0,
            controller_output: 0.0,
            dist_to_stop: 0.0,
            limit_bwd: true,
            limit_fwd: true,
            home: false,
            external_interlock: true,
            ext_traj_interlock: InterlockReason::None,
            ext_enc_interlock: InterlockReason::None,
        }
    }
}

/// Monitor verdict consumed by the axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonitorOutcome {
    /// Highest-priority trajectory-tier reason.
    pub traj_interlock: InterlockReason,
    /// Drive must be disabled.
    pub drive_interlock: bool,
    /// Motion in the forward direction is blocked.
    pub interlock_fwd: bool,
    /// Motion in the backward direction is blocked.
    pub interlock_bwd: bool,
    pub at_target: bool,
    /// Active error flags (latched plus this cycle's limit flags).
    pub errors: MonitorError,
    /// Sticky numeric error code (0 = none).
    pub error_code: u32,
}

// ─── Monitor ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Monitor {
    config: MonitorConfig,
    at_target: AtTargetFilter,
    lag: LagSupervisor,
    velocity: VelocitySupervisor,
    increase: IncreaseAtLimit,
    set_position_old: f64,
    limits: LimitResult,
    external: bool,
    transform: bool,
    latched: MonitorError,
    outcome: MonitorOutcome,
    last_input: MonitorInput,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            at_target: AtTargetFilter::default(),
            lag: LagSupervisor::default(),
            velocity: VelocitySupervisor::default(),
            increase: IncreaseAtLimit::default(),
            set_position_old: 0.0,
            limits: LimitResult::default(),
            external: false,
            transform: false,
            latched: MonitorError::empty(),
            outcome: MonitorOutcome::default(),
            last_input: MonitorInput::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Replace thresholds and enables; counters and latched flags are kept.
    pub fn set_config(&mut self, config: MonitorConfig) {
        self.config = config;
    }

    /// Run all checks for one cycle.
    pub fn evaluate(&mut self, input: &MonitorInput) -> MonitorOutcome {
        let cfg = &self.config;
        let latched_before = self.latched;
        let mut current = MonitorError::empty();

        // 1-2. Hard and soft limits.
        let soft = SoftLimits {
            bwd: cfg.enable_soft_limit_bwd.then_some(cfg.soft_limit_bwd),
            fwd: cfg.enable_soft_limit_fwd.then_some(cfg.soft_limit_fwd),
        };
        self.limits = evaluate_limits(
            &LimitInput {
                limit_bwd_ok: input.limit_bwd,
                limit_fwd_ok: input.limit_fwd,
                set_velocity: input.set_velocity,
                set_position: input.set_position,
                set_position_old: self.set_position_old,
                actual_position: input.actual_position,
                dist_to_stop: input.dist_to_stop,
            },
            &soft,
        );
        self.set_position_old = input.set_position;
        current.set(MonitorError::BOTH_LIMITS, self.limits.both_limits);
        current.set(
            MonitorError::HARD_LIMIT_BWD,
            self.limits.hard_bwd && cfg.enable_alarm_at_hard_limit_bwd,
        );
        current.set(
            MonitorError::HARD_LIMIT_FWD,
            self.limits.hard_fwd && cfg.enable_alarm_at_hard_limit_fwd,
        );
        current.set(MonitorError::SOFT_LIMIT_BWD, self.limits.soft_bwd);
        current.set(MonitorError::SOFT_LIMIT_FWD, self.limits.soft_fwd);

        // 3. At target.
        let at_target = if cfg.enable_at_target {
            self.at_target.update(
                input.target_position - input.actual_position,
                cfg.at_target_tol,
                cfg.at_target_time,
            )
        } else {
            true
        };

        // 4. External interlocks.
        self.external = cfg.enable_external_interlock && !input.external_interlock;
        current.set(MonitorError::EXTERNAL_INTERLOCK, self.external && input.enabled);
        self.transform =
            input.ext_traj_interlock.is_active() || input.ext_enc_interlock.is_active();

        // 5. Supervision while enabled.
        if input.enabled {
            if cfg.enable_lag {
                let (traj, drive) = self.lag.update(
                    input.actual_position - input.set_position,
                    cfg.pos_lag_tol,
                    cfg.pos_lag_time,
                );
                self.latched.set(MonitorError::LAG_TRAJ, traj);
                self.latched.set(MonitorError::LAG_DRIVE, drive);
            }

            let over_speed = cfg.enable_max_vel
                && (input.actual_velocity.abs() > cfg.max_vel
                    || input.set_velocity.abs() > cfg.max_vel);
            let (traj, drive) = self.velocity.update(
                over_speed,
                cfg.max_vel_traj_delay,
                cfg.effective_max_vel_drive_delay(),
            );
            self.latched.set(MonitorError::VELOCITY_TRAJ, traj);
            self.latched.set(MonitorError::VELOCITY_DRIVE, drive);

            if cfg.enable_cntrl_high_limit
                && input.controller_output.abs() > cfg.cntrl_output_high_limit
            {
                self.latched.insert(MonitorError::CNTRL_OUTPUT_HIGH);
            }

            if cfg.enable_cntrl_increase_at_limit
                && self.increase.update(
                    &IncreaseInput {
                        controller_output: input.controller_output,
                        kff: cfg.cntrl_kff,
                        target_position: input.target_position,
                        actual_position: input.actual_position,
                        actual_velocity: input.actual_velocity,
                        limit_bwd_ok: input.limit_bwd,
                        limit_fwd_ok: input.limit_fwd,
                    },
                    &IncreaseWindow {
                        window: cfg.increase_window_cycles,
                        increase_threshold: cfg.increase_threshold_cycles,
                        reasonable_move_threshold: cfg.reasonable_move_threshold_cycles,
                    },
                )
            {
                self.latched.insert(MonitorError::CNTRL_INCREASE_AT_LIMIT);
            }
        }

        if self.latched != latched_before {
            warn!(
                new = ?(self.latched - latched_before),
                "Monitor interlock latched"
            );
        }

        let errors = self.latched | current;
        let code = errors.code();
        let error_code = if code != 0 {
            code
        } else {
            self.outcome.error_code
        };
        let traj_interlock = self.traj_reason(errors);
        if traj_interlock != self.outcome.traj_interlock {
            debug!(from = %self.outcome.traj_interlock, to = %traj_interlock, "Trajectory interlock");
        }

        let non_directional = self.external
            || self.transform
            || errors.intersects(
                MonitorError::BOTH_LIMITS
                    | MonitorError::LAG_TRAJ
                    | MonitorError::VELOCITY_TRAJ
                    | MonitorError::CNTRL_OUTPUT_HIGH
                    | MonitorError::CNTRL_INCREASE_AT_LIMIT,
            );

        self.last_input = *input;
        self.outcome = MonitorOutcome {
            traj_interlock,
            drive_interlock: errors.has_drive_interlock() || self.external,
            interlock_fwd: non_directional || self.limits.hard_fwd || self.limits.soft_fwd,
            interlock_bwd: non_directional || self.limits.hard_bwd || self.limits.soft_bwd,
            at_target,
            errors,
            error_code,
        };
        self.outcome
    }

    /// Trajectory reason by fixed priority.
    fn traj_reason(&self, errors: MonitorError) -> InterlockReason {
        if self.external {
            InterlockReason::External
        } else if self.limits.hard_bwd {
            InterlockReason::HardBwd
        } else if self.limits.hard_fwd {
            InterlockReason::HardFwd
        } else if self.transform {
            InterlockReason::Transform
        } else if self.limits.soft_fwd {
            InterlockReason::SoftFwd
        } else if self.limits.soft_bwd {
            InterlockReason::SoftBwd
        } else if errors.contains(MonitorError::CNTRL_OUTPUT_HIGH) {
            InterlockReason::ControllerHighLimit
        } else if errors.contains(MonitorError::LAG_TRAJ) {
            InterlockReason::PositionLag
        } else if errors.contains(MonitorError::BOTH_LIMITS) {
            InterlockReason::BothLimits
        } else if errors.contains(MonitorError::VELOCITY_TRAJ) {
            InterlockReason::MaxSpeed
        } else if errors.contains(MonitorError::CNTRL_INCREASE_AT_LIMIT) {
            InterlockReason::ControllerIncreaseAtLimit
        } else {
            InterlockReason::None
        }
    }

    /// Clear counters and latched flags. Configuration is kept.
    pub fn error_reset(&mut self) {
        self.at_target.reset();
        self.lag.reset();
        self.velocity.reset();
        self.increase.reset();
        self.latched = MonitorError::empty();
        self.outcome.errors = MonitorError::empty();
        self.outcome.error_code = 0;
        self.outcome.at_target = false;
        debug!("Monitor error reset");
    }

    // ─── Queries ────────────────────────────────────────────────────

    #[inline]
    pub fn outcome(&self) -> &MonitorOutcome {
        &self.outcome
    }

    #[inline]
    pub fn traj_interlock(&self) -> InterlockReason {
        self.outcome.traj_interlock
    }

    #[inline]
    pub fn drive_interlock(&self) -> bool {
        self.outcome.drive_interlock
    }

    #[inline]
    pub fn interlock_fwd(&self) -> bool {
        self.outcome.interlock_fwd
    }

    #[inline]
    pub fn interlock_bwd(&self) -> bool {
        self.outcome.interlock_bwd
    }

    #[inline]
    pub fn at_target(&self) -> bool {
        self.outcome.at_target
    }

    #[inline]
    pub fn errors(&self) -> MonitorError {
        self.outcome.errors
    }

    #[inline]
    pub fn error_code(&self) -> u32 {
        self.outcome.error_code
    }

    /// Raw backward limit switch input (high = OK).
    #[inline]
    pub fn hard_limit_bwd(&self) -> bool {
        self.last_input.limit_bwd
    }

    #[inline]
    pub fn hard_limit_fwd(&self) -> bool {
        self.last_input.limit_fwd
    }

    #[inline]
    pub fn home_switch(&self) -> bool {
        self.last_input.home
    }

    /// Position at or beyond the backward soft limit.
    pub fn at_soft_limit_bwd(&self) -> bool {
        self.config.enable_soft_limit_bwd
            && self.last_input.actual_position <= self.config.soft_limit_bwd
    }

    pub fn at_soft_limit_fwd(&self) -> bool {
        self.config.enable_soft_limit_fwd
            && self.last_input.actual_position >= self.config.soft_limit_fwd
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
