//! Setup errors.
//!
//! Everything that can go wrong before the scheduler enters run mode.
//! Runtime interlocks never use these; see `cyclon_common::motion::error`.

use cyclon_common::config::ConfigError;
use thiserror::Error;

use crate::publish::PublishError;
use crate::pvt::PvtError;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("task {index}: {reason}")]
    InvalidTask { index: usize, reason: String },

    #[error("object '{object}' assigned to unknown task {task}")]
    UnknownTask { object: String, task: usize },

    #[error("task {task} already holds the maximum of {max} objects")]
    TooManyObjects { task: usize, max: usize },

    #[error("process data entry '{0}' not found")]
    UnknownEntry(String),

    #[error("process data entry '{0}' declared twice")]
    DuplicateEntry(String),

    #[error("tasks {task_a} and {task_b} both write {items:?}")]
    WriteOverlap {
        task_a: usize,
        task_b: usize,
        items: Vec<String>,
    },

    #[error("axis '{0}' not found")]
    UnknownAxis(String),

    #[error("PVT: {0}")]
    Pvt(#[from] PvtError),

    #[error("publish: {0}")]
    Publish(#[from] PublishError),

    #[error("scheduler already started")]
    AlreadyStarted,

    #[error("failed to spawn worker thread for task {index}: {source}")]
    ThreadSpawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("RT setup: {0}")]
    RtSetup(String),
}

impl SetupError {
    /// Non-zero setup return code reported upward.
    pub fn code(&self) -> u32 {
        match self {
            Self::Config(e) => e.code(),
            Self::InvalidTask { .. } => 0x20000,
            Self::UnknownTask { .. } => 0x20001,
            Self::TooManyObjects { .. } => 0x20002,
            Self::UnknownEntry(_) => 0x20003,
            Self::DuplicateEntry(_) => 0x20004,
            Self::WriteOverlap { .. } => 0x20005,
            Self::UnknownAxis(_) => 0x20006,
            Self::Pvt(e) => e.code(),
            Self::Publish(e) => e.code(),
            Self::AlreadyStarted => 0x20007,
            Self::ThreadSpawn { .. } => 0x20008,
            Self::RtSetup(_) => 0x20009,
        }
    }

    /// Whether the process cannot continue (no RT skeleton).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ThreadSpawn { .. })
    }
}
