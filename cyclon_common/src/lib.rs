//! Cyclon Common Library
//!
//! Shared constants, configuration structures and the interlock/error
//! vocabulary used by every Cyclon crate.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide numeric limits and defaults
//! - [`config`] - Configuration loading traits and types
//! - [`motion`] - Axis monitor configuration, interlock reasons, error flags
//! - [`task`] - Task topology and execution object configuration
//! - [`publish`] - Published parameter configuration
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use cyclon_common::prelude::*;
//! use cyclon_common::motion::interlock::InterlockReason;
//!
//! assert_eq!(InterlockReason::from_u8(7), Some(InterlockReason::BothLimits));
//! ```

pub mod config;
pub mod consts;
pub mod motion;
pub mod prelude;
pub mod publish;
pub mod task;
