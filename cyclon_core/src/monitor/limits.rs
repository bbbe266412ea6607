//! Hard and soft limit evaluation.
//!
//! Limit switch inputs are active-high "OK": a low input means the switch
//! is engaged. A directional switch only interlocks motion heading into it.

/// Result of the hard/soft limit checks for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LimitResult {
    /// Both switches engaged (wiring fault or lost supply).
    pub both_limits: bool,
    /// Backward switch engaged while heading backward.
    pub hard_bwd: bool,
    /// Forward switch engaged while heading forward.
    pub hard_fwd: bool,
    /// Heading backward within stopping distance of the soft limit.
    pub soft_bwd: bool,
    /// Heading forward within stopping distance of the soft limit.
    pub soft_fwd: bool,
}

/// Inputs for [`evaluate_limits`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitInput {
    pub limit_bwd_ok: bool,
    pub limit_fwd_ok: bool,
    pub set_velocity: f64,
    pub set_position: f64,
    pub set_position_old: f64,
    pub actual_position: f64,
    pub dist_to_stop: f64,
}

/// Soft limit thresholds with their enables.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SoftLimits {
    pub bwd: Option<f64>,
    pub fwd: Option<f64>,
}

/// Evaluate hard and soft limits.
///
/// Direction is taken from the sign of the set velocity or, when the
/// velocity is zero, from the set position delta since the previous cycle.
pub fn evaluate_limits(input: &LimitInput, soft: &SoftLimits) -> LimitResult {
    let both_limits = !input.limit_bwd_ok && !input.limit_fwd_ok;
    let heading_bwd = input.set_velocity < 0.0 || input.set_position < input.set_position_old;
    let heading_fwd = input.set_velocity > 0.0 || input.set_position > input.set_position_old;

    let (hard_bwd, hard_fwd) = if both_limits {
        (false, false)
    } else {
        (
            !input.limit_bwd_ok && heading_bwd,
            !input.limit_fwd_ok && heading_fwd,
        )
    };

    let soft_bwd = soft.bwd.is_some_and(|limit| {
        input.set_velocity < 0.0 && input.actual_position - limit <= input.dist_to_stop
    });
    let soft_fwd = soft.fwd.is_some_and(|limit| {
        input.set_velocity > 0.0 && limit - input.actual_position <= input.dist_to_stop
    });

    LimitResult {
        both_limits,
        hard_bwd,
        hard_fwd,
        soft_bwd,
        soft_fwd,
    }
}

/// Stopping distance `v² / (2a)`; zero when `deceleration` is not positive.
#[inline]
pub fn stopping_distance(velocity: f64, deceleration: f64) -> f64 {
    if deceleration > 0.0 {
        velocity * velocity / (2.0 * deceleration)
    } else {
        0.0
    }
}
