//! Motion shared types.
//!
//! Interlock reasons, monitor error flags and per-axis / PVT configuration
//! shared between the execution core and supervisory tooling.

pub mod config;
pub mod error;
pub mod interlock;
