//! Prelude module for common re-exports.
//!
//! ```rust
//! use cyclon_common::prelude::*;
//!
//! let task = TaskConfig::new(1, 2000);
//! assert_eq!(task.period_in_master_cycles(1000), Ok(2));
//! ```

use std::time::Duration;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::motion::config::{AxisConfig, AxisEntryRole, MonitorConfig, PvtConfig};
pub use crate::publish::{ParamType, PublishConfig};
pub use crate::task::{ObjectKind, SchedulerConfig, TaskConfig, TimedEventConfig};

// ─── Interlocks & Errors ────────────────────────────────────────────
pub use crate::motion::error::MonitorError;
pub use crate::motion::interlock::InterlockReason;

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{MASTER_CYCLE_US_DEFAULT, MASTER_TASK_INDEX, MAX_TASKS};

/// Default master cycle as `Duration`.
pub const DEFAULT_MASTER_CYCLE: Duration = Duration::from_micros(MASTER_CYCLE_US_DEFAULT as u64);
