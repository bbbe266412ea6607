//! Fault-aware plugin object.

use crate::image::ProcessData;

use super::object::FaultAwareExecutor;
use super::process_image::ProcessImage;

type PluginFn = Box<dyn FnMut(&ProcessData, u32) -> u32 + Send>;

/// Extension code that needs the raw fault code instead of a health flag.
pub struct Plugin {
    name: String,
    data: ProcessData,
    body: PluginFn,
    image: ProcessImage,
    error_code: u32,
}

impl Plugin {
    pub fn new<F>(name: &str, data: ProcessData, image: ProcessImage, body: F) -> Self
    where
        F: FnMut(&ProcessData, u32) -> u32 + Send + 'static,
    {
        Self {
            name: name.to_string(),
            data,
            body: Box::new(body),
            image,
            error_code: 0,
        }
    }
}

impl FaultAwareExecutor for Plugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, fault_code: u32) {
        self.error_code = (self.body)(&self.data, fault_code);
    }

    fn build_process_image(&self) -> ProcessImage {
        self.image.clone()
    }

    fn error_code(&self) -> u32 {
        self.error_code
    }
}
