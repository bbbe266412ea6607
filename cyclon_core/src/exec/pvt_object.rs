//! PVT controller as a schedulable object.
//!
//! Execute, abort and reset requests arrive through a [`PvtControlHandle`]
//! from any thread; the controller consumes them at the start of its cycle
//! and publishes state back through the same handle. Point and trigger ids
//! are also written to logic entries so they can be published as params.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};

use cyclon_common::motion::config::PvtConfig;
use tracing::{info, warn};

use crate::error::SetupError;
use crate::image::{EntryId, EntrySource, ProcessData, ProcessDataBuilder};
use crate::pvt::controller::{PVT_POINT_ID_ENTRY, PVT_TRIGGER_ENTRY_DEFAULT, PVT_TRIGGER_ID_ENTRY};
use crate::pvt::{PvtAxis, PvtController, PvtState};

use super::axis::AxisLink;
use super::object::HealthAwareExecutor;
use super::process_image::{Access, ProcessImage};

static_assertions::assert_eq_size!(PvtState, u8);

#[derive(Debug, Default)]
struct HandleInner {
    execute: AtomicBool,
    abort: AtomicBool,
    reset: AtomicBool,
    busy: AtomicBool,
    state: AtomicU8,
    error_code: AtomicU32,
    current_time: AtomicU64,
    point_id: AtomicU32,
    trigger_id: AtomicU32,
}

/// Shared command/status handle of a PVT controller object.
#[derive(Debug, Clone, Default)]
pub struct PvtControlHandle {
    inner: Arc<HandleInner>,
}

impl PvtControlHandle {
    /// Level of the execute command; a rising edge starts, a falling edge
    /// while busy aborts.
    pub fn set_execute(&self, execute: bool) {
        self.inner.execute.store(execute, Ordering::Release);
    }

    pub fn abort(&self) {
        self.inner.abort.store(true, Ordering::Release);
    }

    pub fn error_reset(&self) {
        self.inner.reset.store(true, Ordering::Release);
    }

    pub fn busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PvtState {
        match self.inner.state.load(Ordering::Acquire) {
            1 => PvtState::TriggMoveAxesToStart,
            2 => PvtState::WaitForAxesAtStart,
            3 => PvtState::TriggPvt,
            4 => PvtState::ExecutePvt,
            5 => PvtState::Abort,
            6 => PvtState::Error,
            _ => PvtState::Idle,
        }
    }

    pub fn error_code(&self) -> u32 {
        self.inner.error_code.load(Ordering::Acquire)
    }

    pub fn current_time(&self) -> f64 {
        f64::from_bits(self.inner.current_time.load(Ordering::Acquire))
    }

    /// Index of the last passed waypoint of the running sequence.
    pub fn point_id(&self) -> u32 {
        self.inner.point_id.load(Ordering::Acquire)
    }

    pub fn trigger_id(&self) -> u32 {
        self.inner.trigger_id.load(Ordering::Acquire)
    }
}

/// Process data written by the controller each cycle.
#[derive(Debug, Clone, Copy)]
pub struct PvtEntries {
    pub trigger: EntryId,
    pub point_id: EntryId,
    pub trigger_id: EntryId,
}

pub struct PvtControllerObject {
    name: String,
    controller: PvtController,
    data: ProcessData,
    entries: Option<PvtEntries>,
    handle: PvtControlHandle,
}

impl PvtControllerObject {
    pub fn new(controller: PvtController, data: ProcessData, entries: Option<PvtEntries>) -> Self {
        Self {
            name: "pvtctrl".to_string(),
            controller,
            data,
            entries,
            handle: PvtControlHandle::default(),
        }
    }

    /// Declare the trigger output and the point / trigger id entries.
    pub fn declare(config: &PvtConfig, builder: &mut ProcessDataBuilder) {
        builder.ensure(trigger_entry(config), EntrySource::Fieldbus);
        builder.ensure(PVT_POINT_ID_ENTRY, EntrySource::Logic);
        builder.ensure(PVT_TRIGGER_ID_ENTRY, EntrySource::Logic);
    }

    /// Build from configuration, attaching the named axes in order.
    ///
    /// Trigger times are the first axis' waypoint times relative to its
    /// first waypoint.
    pub fn from_config(
        config: &PvtConfig,
        sample_time: f64,
        data: ProcessData,
        links: &[AxisLink],
    ) -> Result<Self, SetupError> {
        let mut controller = PvtController::new(sample_time, config.start_tolerance)?;
        for axis_cfg in &config.axes {
            let link = links
                .iter()
                .find(|l| l.name() == axis_cfg.axis)
                .ok_or_else(|| SetupError::UnknownAxis(axis_cfg.axis.clone()))?;
            controller.add_axis(Box::new(link.clone()))?;
        }
        if let Some(first) = config.axes.first().and_then(|a| a.points.first()) {
            let times: Vec<f64> = config.axes[0]
                .points
                .iter()
                .map(|p| p.time - first.time)
                .collect();
            controller.set_trigger_times(&times)?;
        }
        let entries = PvtEntries {
            trigger: data.require(trigger_entry(config))?,
            point_id: data.require(PVT_POINT_ID_ENTRY)?,
            trigger_id: data.require(PVT_TRIGGER_ID_ENTRY)?,
        };
        info!(
            axes = controller.axis_count(),
            task = config.task_index,
            "PVT controller created"
        );
        Ok(Self::new(controller, data, Some(entries)))
    }

    pub fn handle(&self) -> PvtControlHandle {
        self.handle.clone()
    }

    #[inline]
    pub fn controller(&self) -> &PvtController {
        &self.controller
    }

    fn publish(&self) {
        let h = &self.handle.inner;
        h.busy.store(self.controller.busy(), Ordering::Release);
        h.state.store(self.controller.state() as u8, Ordering::Release);
        h.error_code
            .store(self.controller.error_code(), Ordering::Release);
        h.current_time
            .store(self.controller.current_time().to_bits(), Ordering::Release);
        h.point_id
            .store(self.controller.current_point_id() as u32, Ordering::Release);
        h.trigger_id
            .store(self.controller.current_trigger_id() as u32, Ordering::Release);
    }
}

fn trigger_entry(config: &PvtConfig) -> &str {
    config
        .trigger_entry
        .as_deref()
        .unwrap_or(PVT_TRIGGER_ENTRY_DEFAULT)
}

impl HealthAwareExecutor for PvtControllerObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, fieldbus_ok: bool) {
        let h = &self.handle.inner;
        if h.reset.swap(false, Ordering::AcqRel) {
            self.controller.error_reset();
        }
        if h.abort.swap(false, Ordering::AcqRel) {
            self.controller.abort();
        }
        if !fieldbus_ok && self.controller.busy() {
            warn!("Fieldbus not OK, aborting PVT");
            self.controller.abort();
        }
        self.controller
            .set_execute(h.execute.load(Ordering::Acquire));
        let trigger = self.controller.execute();
        if let Some(e) = self.entries {
            self.data.write_bit(e.trigger, trigger);
            self.data
                .write_f64(e.point_id, self.controller.current_point_id() as f64);
            self.data
                .write_f64(e.trigger_id, self.controller.current_trigger_id() as f64);
        }
        self.publish();
    }

    fn build_process_image(&self) -> ProcessImage {
        let mut image = ProcessImage::new();
        if let Some(e) = self.entries {
            for id in [e.trigger, e.point_id, e.trigger_id] {
                image.add_entry(&self.data, id, Access::Write);
            }
        }
        image
    }

    fn error_code(&self) -> u32 {
        self.controller.error_code()
    }
}
