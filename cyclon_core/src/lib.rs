//! # Cyclon Core
//!
//! Real-time execution core for cyclic motion control: a multi-rate task
//! scheduler driven by the fieldbus master cycle, per-axis safety
//! monitoring and a PVT (position/velocity/time) sequencer.
//!
//! ## Structure
//!
//! 1. **Process data** ([`image`]): named entries shared by the fieldbus
//!    and every execution object.
//! 2. **Execution objects** ([`exec`]): axes, timed events, logic programs,
//!    plugins and the PVT controller, each with a declared process image.
//! 3. **Scheduler** ([`scheduler`]): one worker thread per task, released
//!    every `period` master cycles; overruns are counted, never queued.
//! 4. **Master cycle** ([`cycle`]): exchange, tick, publish.
//!
//! ## Zero-Allocation RT Loop
//!
//! Objects, images and entries are fixed at start. The cyclic path only
//! touches atomics and pre-allocated state.

#![deny(clippy::disallowed_types)]

pub mod config;
pub mod cycle;
pub mod error;
pub mod exec;
pub mod image;
pub mod monitor;
pub mod publish;
pub mod pvt;
pub mod scheduler;
pub mod sim;
pub mod system;
