//! Execution objects: the per-cycle units of work a task runs.
//!
//! Every object has a fixed kind, a fixed task index and a declared
//! process image. The fieldbus health flag or the fault code is handed to
//! it depending on which executor capability it was built with.
//!
//! - [`object`] - Executor capabilities and the `ExecutionObject` wrapper
//! - [`process_image`] - Declared read/write items
//! - [`axis`] - Axis with monitor and trajectory sources
//! - [`program`] - User logic closure
//! - [`event`] - Periodic output pulse
//! - [`plugin`] - Fault-aware user closure
//! - [`pvt_object`] - PVT controller as a schedulable object

pub mod axis;
pub mod event;
pub mod object;
pub mod plugin;
pub mod process_image;
pub mod program;
pub mod pvt_object;

pub use axis::{Axis, AxisLink};
pub use event::TimedEvent;
pub use object::{ExecutionObject, Executor, FaultAwareExecutor, HealthAwareExecutor};
pub use plugin::Plugin;
pub use process_image::{Access, ProcessImage, ProcessImageItem};
pub use program::LogicProgram;
pub use pvt_object::{PvtControlHandle, PvtControllerObject};
