//! Timed event: pulse an output bit every N executions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cyclon_common::task::TimedEventConfig;
use tracing::trace;

use crate::error::SetupError;
use crate::image::{EntryId, EntrySource, ProcessData, ProcessDataBuilder};

use super::object::HealthAwareExecutor;
use super::process_image::{Access, ProcessImage};

pub struct TimedEvent {
    name: String,
    data: ProcessData,
    output: EntryId,
    interval: u32,
    counter: u32,
    armed: Arc<AtomicBool>,
    fired: u64,
}

impl TimedEvent {
    /// Declare the output entry.
    pub fn declare(config: &TimedEventConfig, builder: &mut ProcessDataBuilder) {
        builder.ensure(&config.output, EntrySource::Fieldbus);
    }

    pub fn new(config: &TimedEventConfig, data: ProcessData) -> Result<Self, SetupError> {
        let output = data.require(&config.output)?;
        Ok(Self {
            name: config.name.clone(),
            data,
            output,
            interval: config.interval.max(1),
            counter: 0,
            armed: Arc::new(AtomicBool::new(config.armed)),
            fired: 0,
        })
    }

    /// Shared arm flag, settable from any thread.
    pub fn arm_handle(&self) -> Arc<AtomicBool> {
        self.armed.clone()
    }

    /// Number of pulses emitted.
    pub fn fired(&self) -> u64 {
        self.fired
    }
}

impl HealthAwareExecutor for TimedEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, fieldbus_ok: bool) {
        let mut pulse = false;
        if fieldbus_ok && self.armed.load(Ordering::Acquire) {
            self.counter += 1;
            if self.counter >= self.interval {
                self.counter = 0;
                self.fired += 1;
                pulse = true;
                trace!(event = %self.name, fired = self.fired, "Timed event pulse");
            }
        } else {
            self.counter = 0;
        }
        self.data.write_bit(self.output, pulse);
    }

    fn build_process_image(&self) -> ProcessImage {
        let mut image = ProcessImage::new();
        image.add_entry(&self.data, self.output, Access::Write);
        image
    }
}
