//! Interlock reasons reported by the axis monitor.
//!
//! Values are stable wire codes consumed by the trajectory layer and by the
//! supervisory system, hence `#[repr(u8)]` and explicit discriminants.

use serde::{Deserialize, Serialize};

/// Reason motion is currently restricted on an axis.
///
/// `None` means the trajectory may run freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum InterlockReason {
    /// No interlock.
    #[default]
    None = 0,
    /// Approaching the backward soft limit within stopping distance.
    SoftBwd = 1,
    /// Approaching the forward soft limit within stopping distance.
    SoftFwd = 2,
    /// Backward hard limit switch active while moving backward.
    HardBwd = 3,
    /// Forward hard limit switch active while moving forward.
    HardFwd = 4,
    /// Position lag exceeded (trajectory tier).
    PositionLag = 6,
    /// Both hard limit switches inactive (wiring fault).
    BothLimits = 7,
    /// External hardware interlock input is low.
    External = 8,
    /// External trajectory or encoder source reported an interlock.
    Transform = 9,
    /// Over-velocity (trajectory tier).
    MaxSpeed = 10,
    /// Controller output above the configured high limit.
    ControllerHighLimit = 11,
    /// Controller output keeps increasing while sitting at a limit switch.
    ControllerIncreaseAtLimit = 12,
}

impl InterlockReason {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::SoftBwd),
            2 => Some(Self::SoftFwd),
            3 => Some(Self::HardBwd),
            4 => Some(Self::HardFwd),
            6 => Some(Self::PositionLag),
            7 => Some(Self::BothLimits),
            8 => Some(Self::External),
            9 => Some(Self::Transform),
            10 => Some(Self::MaxSpeed),
            11 => Some(Self::ControllerHighLimit),
            12 => Some(Self::ControllerIncreaseAtLimit),
            _ => None,
        }
    }

    /// Whether any interlock is active.
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Directional reasons only block motion one way; everything else
    /// blocks both directions.
    #[inline]
    pub const fn blocks_forward(&self) -> bool {
        !matches!(self, Self::None | Self::SoftBwd | Self::HardBwd)
    }

    #[inline]
    pub const fn blocks_backward(&self) -> bool {
        !matches!(self, Self::None | Self::SoftFwd | Self::HardFwd)
    }
}

impl std::fmt::Display for InterlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::SoftBwd => "soft-bwd",
            Self::SoftFwd => "soft-fwd",
            Self::HardBwd => "hard-bwd",
            Self::HardFwd => "hard-fwd",
            Self::PositionLag => "position-lag",
            Self::BothLimits => "both-limits",
            Self::External => "external",
            Self::Transform => "transform",
            Self::MaxSpeed => "max-speed",
            Self::ControllerHighLimit => "controller-high-limit",
            Self::ControllerIncreaseAtLimit => "controller-increase-at-limit",
        };
        f.write_str(name)
    }
}
