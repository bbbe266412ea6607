//! Executor capabilities and the execution object wrapper.
//!
//! Motion and logic objects only need a go/no-go fieldbus flag; plugins get
//! the full fault code. The capability is chosen by the constructor, so
//! dispatch never inspects the kind at runtime.

use cyclon_common::task::ObjectKind;

use super::axis::Axis;
use super::event::TimedEvent;
use super::plugin::Plugin;
use super::process_image::ProcessImage;
use super::program::LogicProgram;
use super::pvt_object::PvtControllerObject;

/// Object driven by the fieldbus health flag.
pub trait HealthAwareExecutor: Send {
    fn name(&self) -> &str;
    fn execute(&mut self, fieldbus_ok: bool);
    fn build_process_image(&self) -> ProcessImage;
    /// Last error code (0 = none).
    fn error_code(&self) -> u32 {
        0
    }
}

/// Object driven by the fault code.
pub trait FaultAwareExecutor: Send {
    fn name(&self) -> &str;
    fn execute(&mut self, fault_code: u32);
    fn build_process_image(&self) -> ProcessImage;
    fn error_code(&self) -> u32 {
        0
    }
}

pub enum Executor {
    Health(Box<dyn HealthAwareExecutor>),
    Fault(Box<dyn FaultAwareExecutor>),
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Health(e) => f.debug_tuple("Health").field(&e.name()).finish(),
            Self::Fault(e) => f.debug_tuple("Fault").field(&e.name()).finish(),
        }
    }
}

/// One schedulable unit of per-cycle work.
///
/// Kind and task index never change after construction.
#[derive(Debug)]
pub struct ExecutionObject {
    kind: ObjectKind,
    task_index: usize,
    executor: Executor,
    process_image: ProcessImage,
}

impl ExecutionObject {
    fn health(kind: ObjectKind, task_index: usize, exec: Box<dyn HealthAwareExecutor>) -> Self {
        Self {
            kind,
            task_index,
            executor: Executor::Health(exec),
            process_image: ProcessImage::new(),
        }
    }

    pub fn axis(task_index: usize, axis: Axis) -> Self {
        Self::health(ObjectKind::Axis, task_index, Box::new(axis))
    }

    pub fn logic_program(task_index: usize, program: LogicProgram) -> Self {
        Self::health(ObjectKind::LogicProgram, task_index, Box::new(program))
    }

    /// PVT controllers run as logic-program objects.
    pub fn pvt_controller(task_index: usize, ctrl: PvtControllerObject) -> Self {
        Self::health(ObjectKind::LogicProgram, task_index, Box::new(ctrl))
    }

    pub fn timed_event(task_index: usize, event: TimedEvent) -> Self {
        Self::health(ObjectKind::TimedEvent, task_index, Box::new(event))
    }

    pub fn plugin(task_index: usize, plugin: Plugin) -> Self {
        Self {
            kind: ObjectKind::Plugin,
            task_index,
            executor: Executor::Fault(Box::new(plugin)),
            process_image: ProcessImage::new(),
        }
    }

    /// Run once for the current cycle.
    #[inline]
    pub fn execute(&mut self, fault_code: u32, fieldbus_ok: bool) {
        match &mut self.executor {
            Executor::Health(e) => e.execute(fieldbus_ok),
            Executor::Fault(e) => e.execute(fault_code),
        }
    }

    /// Collect and store the declared process image.
    pub fn build_process_image(&mut self) -> &ProcessImage {
        self.process_image = match &self.executor {
            Executor::Health(e) => e.build_process_image(),
            Executor::Fault(e) => e.build_process_image(),
        };
        &self.process_image
    }

    #[inline]
    pub fn process_image(&self) -> &ProcessImage {
        &self.process_image
    }

    #[inline]
    pub fn object_type(&self) -> ObjectKind {
        self.kind
    }

    #[inline]
    pub fn task_index(&self) -> usize {
        self.task_index
    }

    pub fn name(&self) -> &str {
        match &self.executor {
            Executor::Health(e) => e.name(),
            Executor::Fault(e) => e.name(),
        }
    }

    #[inline]
    pub fn error_code(&self) -> u32 {
        match &self.executor {
            Executor::Health(e) => e.error_code(),
            Executor::Fault(e) => e.error_code(),
        }
    }
}
