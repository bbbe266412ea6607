//! PVT trajectory sequencing.
//!
//! A sequence of (position, velocity, time) waypoints is turned into cubic
//! Hermite segments. The RT path steps a cursor through the segments at a
//! fixed sample time; a separate preview accessor searches by time.
//!
//! - [`segment`] - Closed-form cubic between two waypoints
//! - [`sequence`] - Waypoint list, validation and RT cursor
//! - [`controller`] - Multi-axis synchronized start state machine
//! - [`group`] - Collective enable / reset / stop over axis handles

pub mod controller;
pub mod group;
pub mod segment;
pub mod sequence;

use thiserror::Error;

pub use controller::{PvtAxis, PvtController, PvtState};
pub use group::AxisGroup;
pub use segment::{PvtPoint, PvtSegment};
pub use sequence::PvtSequence;

/// Sequence building and controller setup errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PvtError {
    #[error("sample time {0} s must be finite and > 0")]
    InvalidSampleTime(f64),
    #[error("non-finite waypoint ({position}, {velocity}, {time})")]
    NonFinitePoint {
        position: f64,
        velocity: f64,
        time: f64,
    },
    #[error("waypoint time {time} not after previous time {previous}")]
    NonIncreasingTime { previous: f64, time: f64 },
    #[error("sequence already validated, points cannot be added")]
    AlreadyValidated,
    #[error("sequence has no segments")]
    NoSegments,
    #[error("sequence not validated")]
    NotValidated,
    #[error("controller already holds {0} axes")]
    TooManyAxes(usize),
    #[error("controller busy")]
    Busy,
    #[error("trigger time {time} must be finite, >= 0 and after {previous}")]
    InvalidTriggerTime { previous: f64, time: f64 },
}

impl PvtError {
    /// Non-zero setup return code.
    pub const fn code(&self) -> u32 {
        match self {
            Self::InvalidSampleTime(_) => 0x24100,
            Self::NonFinitePoint { .. } => 0x24101,
            Self::NonIncreasingTime { .. } => 0x24102,
            Self::AlreadyValidated => 0x24103,
            Self::NoSegments => 0x24104,
            Self::NotValidated => 0x24105,
            Self::TooManyAxes(_) => 0x24106,
            Self::Busy => 0x24107,
            Self::InvalidTriggerTime { .. } => 0x24108,
        }
    }
}
