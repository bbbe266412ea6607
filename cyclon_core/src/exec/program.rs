//! User logic program.
//!
//! A closure over the process data, executed in registration order with
//! the other objects of its task. It returns an error code (0 = OK).

use crate::image::{EntrySource, ProcessData};

use super::object::HealthAwareExecutor;
use super::process_image::{Access, ProcessImage};

type ProgramFn = Box<dyn FnMut(&ProcessData, bool) -> u32 + Send>;

pub struct LogicProgram {
    name: String,
    data: ProcessData,
    body: ProgramFn,
    image: ProcessImage,
    error_code: u32,
}

impl LogicProgram {
    pub fn new<F>(name: &str, data: ProcessData, body: F) -> Self
    where
        F: FnMut(&ProcessData, bool) -> u32 + Send + 'static,
    {
        Self {
            name: name.to_string(),
            data,
            body: Box::new(body),
            image: ProcessImage::new(),
            error_code: 0,
        }
    }

    /// Declare entries the program reads.
    pub fn reads(mut self, names: &[&str]) -> Self {
        self.declare(names, Access::Read);
        self
    }

    /// Declare entries the program writes.
    pub fn writes(mut self, names: &[&str]) -> Self {
        self.declare(names, Access::Write);
        self
    }

    fn declare(&mut self, names: &[&str], access: Access) {
        for name in names {
            let source = self
                .data
                .lookup(name)
                .and_then(|id| self.data.source(id))
                .unwrap_or(EntrySource::Logic);
            self.image.push(name, source, access);
        }
    }
}

impl HealthAwareExecutor for LogicProgram {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, fieldbus_ok: bool) {
        self.error_code = (self.body)(&self.data, fieldbus_ok);
    }

    fn build_process_image(&self) -> ProcessImage {
        self.image.clone()
    }

    fn error_code(&self) -> u32 {
        self.error_code
    }
}
