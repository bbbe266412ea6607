//! Execution object kind tag.

use serde::{Deserialize, Serialize};

/// Kind of a per-cycle execution object.
///
/// Fixed for the object's lifetime. Only [`ObjectKind::Plugin`] objects
/// receive the fault code; every other kind receives the fieldbus health flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ObjectKind {
    Axis = 0,
    LogicProgram = 1,
    TimedEvent = 2,
    Plugin = 3,
}

impl ObjectKind {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Axis),
            1 => Some(Self::LogicProgram),
            2 => Some(Self::TimedEvent),
            3 => Some(Self::Plugin),
            _ => None,
        }
    }

    /// Whether objects of this kind are driven by the fault code.
    #[inline]
    pub const fn is_fault_aware(&self) -> bool {
        matches!(self, Self::Plugin)
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Axis => "axis",
            Self::LogicProgram => "logic-program",
            Self::TimedEvent => "timed-event",
            Self::Plugin => "plugin",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_plugins_are_fault_aware() {
        assert!(ObjectKind::Plugin.is_fault_aware());
        assert!(!ObjectKind::Axis.is_fault_aware());
        assert!(!ObjectKind::LogicProgram.is_fault_aware());
        assert!(!ObjectKind::TimedEvent.is_fault_aware());
    }

    #[test]
    fn from_u8_matches_discriminant() {
        for raw in 0u8..4 {
            assert_eq!(ObjectKind::from_u8(raw).map(|k| k as u8), Some(raw));
        }
        assert_eq!(ObjectKind::from_u8(4), None);
    }

    #[test]
    fn display_names() {
        assert_eq!(ObjectKind::LogicProgram.to_string(), "logic-program");
    }
}
