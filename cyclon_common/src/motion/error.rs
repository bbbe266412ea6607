//! Error flags and numeric error codes for axes, the monitor and PVT.
//!
//! Runtime interlocks are sticky bitflags, never `Result` errors. Each flag
//! maps to a stable numeric code surfaced through the supervisory layer.

use bitflags::bitflags;

// ─── Numeric Codes ──────────────────────────────────────────────────

pub const ERROR_MON_BOTH_LIMIT_INTERLOCK: u32 = 0x14C00;
pub const ERROR_MON_HARD_LIMIT_BWD_INTERLOCK: u32 = 0x14C01;
pub const ERROR_MON_HARD_LIMIT_FWD_INTERLOCK: u32 = 0x14C02;
pub const ERROR_MON_SOFT_LIMIT_BWD_INTERLOCK: u32 = 0x14C03;
pub const ERROR_MON_SOFT_LIMIT_FWD_INTERLOCK: u32 = 0x14C04;
pub const ERROR_MON_MAX_POSITION_LAG_EXCEEDED: u32 = 0x14C05;
pub const ERROR_MON_MAX_VELOCITY_EXCEEDED: u32 = 0x14C06;
pub const ERROR_MON_CNTRL_OUTPUT_EXCEED_LIMIT: u32 = 0x14C07;
pub const ERROR_MON_CNTRL_OUTPUT_INCREASE_AT_LIMIT: u32 = 0x14C08;
pub const ERROR_MON_EXTERNAL_HARDWARE_INTERLOCK: u32 = 0x14C09;

pub const ERROR_AXIS_FIELDBUS_NOT_OK: u32 = 0x14400;
pub const ERROR_AXIS_PVT_SEQUENCE_MISSING: u32 = 0x14401;
pub const ERROR_AXIS_COMMAND_REJECTED_INTERLOCK: u32 = 0x14402;

pub const ERROR_PVT_CTRL_AXIS_COUNT_ZERO: u32 = 0x242000;
pub const ERROR_PVT_CTRL_SEQUENCE_INVALID: u32 = 0x242001;
pub const ERROR_PVT_CTRL_AXIS_INTERLOCKED: u32 = 0x242002;
pub const ERROR_PVT_CTRL_ABORTED: u32 = 0x242003;
pub const ERROR_PVT_CTRL_AXIS_NOT_READY: u32 = 0x242004;

bitflags! {
    /// Monitor error flags.
    ///
    /// Set on the cycle a check trips and kept until `error_reset()`.
    /// DRIVE-tier flags (`*_DRIVE`) are only reached after the matching
    /// trajectory-tier flag, except for the immediate controller-output limit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MonitorError: u16 {
        /// Both hard limits low (wiring fault).
        const BOTH_LIMITS              = 0x0001;
        /// Backward hard limit hit with alarm enabled.
        const HARD_LIMIT_BWD           = 0x0002;
        /// Forward hard limit hit with alarm enabled.
        const HARD_LIMIT_FWD           = 0x0004;
        /// Backward soft limit within stopping distance.
        const SOFT_LIMIT_BWD           = 0x0008;
        /// Forward soft limit within stopping distance.
        const SOFT_LIMIT_FWD           = 0x0010;
        /// Position lag, trajectory tier.
        const LAG_TRAJ                 = 0x0020;
        /// Position lag, drive tier.
        const LAG_DRIVE                = 0x0040;
        /// Over-velocity, trajectory tier.
        const VELOCITY_TRAJ            = 0x0080;
        /// Over-velocity, drive tier.
        const VELOCITY_DRIVE           = 0x0100;
        /// Controller output above high limit (both tiers at once).
        const CNTRL_OUTPUT_HIGH        = 0x0200;
        /// Controller output increasing at a limit switch.
        const CNTRL_INCREASE_AT_LIMIT  = 0x0400;
        /// External hardware interlock input low.
        const EXTERNAL_INTERLOCK       = 0x0800;
    }
}

impl MonitorError {
    /// Flags that disable the drive (hard interlock).
    pub const DRIVE_MASK: Self = Self::from_bits_truncate(
        Self::BOTH_LIMITS.bits()
            | Self::LAG_DRIVE.bits()
            | Self::VELOCITY_DRIVE.bits()
            | Self::CNTRL_OUTPUT_HIGH.bits()
            | Self::CNTRL_INCREASE_AT_LIMIT.bits()
            | Self::EXTERNAL_INTERLOCK.bits(),
    );

    /// Returns true if any drive-tier flag is set.
    #[inline]
    pub const fn has_drive_interlock(&self) -> bool {
        self.intersects(Self::DRIVE_MASK)
    }

    /// Numeric code of the highest-priority flag set (0 when empty).
    pub fn code(&self) -> u32 {
        const ORDER: [(MonitorError, u32); 12] = [
            (MonitorError::EXTERNAL_INTERLOCK, ERROR_MON_EXTERNAL_HARDWARE_INTERLOCK),
            (MonitorError::BOTH_LIMITS, ERROR_MON_BOTH_LIMIT_INTERLOCK),
            (MonitorError::HARD_LIMIT_BWD, ERROR_MON_HARD_LIMIT_BWD_INTERLOCK),
            (MonitorError::HARD_LIMIT_FWD, ERROR_MON_HARD_LIMIT_FWD_INTERLOCK),
            (MonitorError::SOFT_LIMIT_BWD, ERROR_MON_SOFT_LIMIT_BWD_INTERLOCK),
            (MonitorError::SOFT_LIMIT_FWD, ERROR_MON_SOFT_LIMIT_FWD_INTERLOCK),
            (MonitorError::CNTRL_OUTPUT_HIGH, ERROR_MON_CNTRL_OUTPUT_EXCEED_LIMIT),
            (MonitorError::LAG_DRIVE, ERROR_MON_MAX_POSITION_LAG_EXCEEDED),
            (MonitorError::LAG_TRAJ, ERROR_MON_MAX_POSITION_LAG_EXCEEDED),
            (MonitorError::VELOCITY_DRIVE, ERROR_MON_MAX_VELOCITY_EXCEEDED),
            (MonitorError::VELOCITY_TRAJ, ERROR_MON_MAX_VELOCITY_EXCEEDED),
            (
                MonitorError::CNTRL_INCREASE_AT_LIMIT,
                ERROR_MON_CNTRL_OUTPUT_INCREASE_AT_LIMIT,
            ),
        ];
        ORDER
            .iter()
            .find(|(flag, _)| self.contains(*flag))
            .map_or(0, |(_, code)| *code)
    }
}

impl Default for MonitorError {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_code_zero() {
        assert_eq!(MonitorError::empty().code(), 0);
        assert!(!MonitorError::default().has_drive_interlock());
    }

    #[test]
    fn traj_tier_is_not_drive_tier() {
        assert!(!MonitorError::LAG_TRAJ.has_drive_interlock());
        assert!(!MonitorError::VELOCITY_TRAJ.has_drive_interlock());
        assert!(MonitorError::LAG_DRIVE.has_drive_interlock());
        assert!(MonitorError::BOTH_LIMITS.has_drive_interlock());
    }

    #[test]
    fn code_prefers_limit_over_lag() {
        let flags = MonitorError::LAG_TRAJ | MonitorError::BOTH_LIMITS;
        assert_eq!(flags.code(), ERROR_MON_BOTH_LIMIT_INTERLOCK);
        assert_eq!(
            MonitorError::VELOCITY_DRIVE.code(),
            ERROR_MON_MAX_VELOCITY_EXCEEDED
        );
    }
}
