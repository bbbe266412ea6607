//! Task topology and execution object vocabulary.
//!
//! - [`config`] - Scheduler, task and timed-event configuration
//! - [`kind`] - Execution object kind tag

pub mod config;
pub mod kind;

pub use config::{SchedulerConfig, TaskConfig, TimedEventConfig};
pub use kind::ObjectKind;
