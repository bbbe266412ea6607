//! Debounce counters for at-target, position lag and over-velocity.
//!
//! Each supervisor owns its counters and latched flags; `reset()` clears
//! both. Thresholds come from `MonitorConfig` on every call so a config
//! change takes effect without rebuilding the monitor.

/// At-target debounce.
///
/// The counter increments while the error is inside tolerance, saturating
/// at `time + 1`; at-target is reported once it exceeds `time`. One cycle
/// outside tolerance resets it.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtTargetFilter {
    counter: u32,
}

impl AtTargetFilter {
    pub fn update(&mut self, error: f64, tol: f64, time: u32) -> bool {
        if error.abs() < tol {
            if self.counter <= time {
                self.counter += 1;
            }
            self.counter > time
        } else {
            self.counter = 0;
            false
        }
    }

    #[inline]
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

/// Two-tier position lag supervisor.
///
/// Trajectory tier after more than `time` cycles over tolerance, drive tier
/// after more than `2 × time`. Both tiers latch.
#[derive(Debug, Clone, Copy, Default)]
pub struct LagSupervisor {
    counter: u32,
    traj: bool,
    drive: bool,
}

impl LagSupervisor {
    /// Returns `(traj, drive)` latched state.
    pub fn update(&mut self, lag: f64, tol: f64, time: u32) -> (bool, bool) {
        let drive_time = time.saturating_mul(2);
        if lag.abs() > tol {
            if self.counter <= drive_time {
                self.counter += 1;
            }
            if self.counter > time {
                self.traj = true;
            }
            if self.counter > drive_time {
                self.drive = true;
            }
        } else {
            self.counter = 0;
        }
        (self.traj, self.drive)
    }

    #[inline]
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Two-tier over-velocity supervisor.
///
/// The trajectory tier latches once the over-speed condition has persisted
/// `traj_delay` cycles; the drive tier latches `drive_delay` cycles after
/// the trajectory tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocitySupervisor {
    traj_counter: u32,
    drive_counter: u32,
    traj: bool,
    drive: bool,
}

impl VelocitySupervisor {
    /// Returns `(traj, drive)` latched state.
    pub fn update(&mut self, over_speed: bool, traj_delay: u32, drive_delay: u32) -> (bool, bool) {
        if over_speed {
            if self.traj_counter <= traj_delay {
                self.traj_counter += 1;
            }
        } else {
            self.traj_counter = 0;
        }
        if !self.traj && over_speed && self.traj_counter >= traj_delay {
            self.traj = true;
        }
        if self.traj {
            if self.drive_counter <= drive_delay {
                self.drive_counter += 1;
            }
            if self.drive_counter > drive_delay {
                self.drive = true;
            }
        }
        (self.traj, self.drive)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
