//! One worker task: release bookkeeping on the master side, the worker
//! thread loop on the other.
//!
//! The master and the worker share only atomics. Release sets `pending`
//! and unparks the thread; the worker clears `ready` for the duration of
//! its work and sets it again when every object has run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread::{self, JoinHandle, Thread};
use std::time::Instant;

use cyclon_common::consts::MAX_OBJECTS_PER_TASK;
use cyclon_common::task::{ObjectKind, TaskConfig};
use tracing::{debug, error, info, trace, warn};

use crate::error::SetupError;
use crate::exec::{ExecutionObject, ProcessImage};

use super::rt;

pub(crate) type ObjectList = heapless::Vec<ExecutionObject, MAX_OBJECTS_PER_TASK>;

/// State shared between the master and one worker thread.
#[derive(Debug)]
pub(crate) struct TaskShared {
    pending: AtomicBool,
    ready: AtomicBool,
    shutdown: AtomicBool,
    fault_code: AtomicU32,
    fieldbus_ok: AtomicBool,
    last_error: AtomicU32,
    releases: AtomicU64,
    overruns: AtomicU64,
    executions: AtomicU64,
    exec_min_ns: AtomicU64,
    exec_max_ns: AtomicU64,
}

impl TaskShared {
    fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            ready: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            fault_code: AtomicU32::new(0),
            fieldbus_ok: AtomicBool::new(false),
            last_error: AtomicU32::new(0),
            releases: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
            executions: AtomicU64::new(0),
            exec_min_ns: AtomicU64::new(u64::MAX),
            exec_max_ns: AtomicU64::new(0),
        }
    }

    fn record_exec_time(&self, ns: u64) {
        self.exec_min_ns.fetch_min(ns, Ordering::Relaxed);
        self.exec_max_ns.fetch_max(ns, Ordering::Relaxed);
        self.executions.fetch_add(1, Ordering::Relaxed);
    }
}

/// Name, kind and declared image of an object, kept for reports after
/// the object itself has moved into its worker.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub name: String,
    pub kind: ObjectKind,
    pub process_image: ProcessImage,
}

/// Diagnostics snapshot of one task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub index: usize,
    pub name: String,
    pub period: u32,
    pub releases: u64,
    pub overruns: u64,
    pub executions: u64,
    pub last_error: u32,
    pub ready: bool,
    /// `None` until the first execution.
    pub exec_time_min_ns: Option<u64>,
    pub exec_time_max_ns: u64,
    pub objects: Vec<ObjectInfo>,
}

pub(crate) struct Task {
    config: TaskConfig,
    period: u32,
    counter: u32,
    shared: Arc<TaskShared>,
    objects: ObjectList,
    info: Vec<ObjectInfo>,
    thread: Option<Thread>,
    handle: Option<JoinHandle<()>>,
}

impl Task {
    pub(crate) fn new(config: TaskConfig, period: u32) -> Self {
        Self {
            counter: config.offset_cycles,
            config,
            period,
            shared: Arc::new(TaskShared::new()),
            objects: ObjectList::new(),
            info: Vec::new(),
            thread: None,
            handle: None,
        }
    }

    #[inline]
    pub(crate) fn index(&self) -> usize {
        self.config.index
    }

    #[inline]
    pub(crate) fn period(&self) -> u32 {
        self.period
    }

    #[inline]
    pub(crate) fn counter(&self) -> u32 {
        self.counter
    }

    pub(crate) fn push(&mut self, object: ExecutionObject) -> Result<(), SetupError> {
        self.objects
            .push(object)
            .map_err(|_| SetupError::TooManyObjects {
                task: self.config.index,
                max: MAX_OBJECTS_PER_TASK,
            })
    }

    /// Build every object's process image and remember it for reports.
    pub(crate) fn build_process_images(&mut self) -> &[ObjectInfo] {
        self.info = self
            .objects
            .iter_mut()
            .map(|o| {
                let process_image = o.build_process_image().clone();
                ObjectInfo {
                    name: o.name().to_string(),
                    kind: o.object_type(),
                    process_image,
                }
            })
            .collect();
        &self.info
    }

    pub(crate) fn info(&self) -> &[ObjectInfo] {
        &self.info
    }

    /// Move the objects into a new worker thread.
    pub(crate) fn spawn(&mut self) -> Result<(), SetupError> {
        let objects = std::mem::take(&mut self.objects);
        let shared = self.shared.clone();
        let affinity = self.config.affinity;
        let priority = self.config.priority;
        let index = self.config.index;
        let handle = thread::Builder::new()
            .name(format!("cyclon-task-{index}"))
            .stack_size(self.config.stack_size)
            .spawn(move || worker_loop(index, affinity, priority, objects, shared))
            .map_err(|source| SetupError::ThreadSpawn { index, source })?;
        self.thread = Some(handle.thread().clone());
        self.handle = Some(handle);
        info!(
            task = index,
            name = %self.config.display_name(),
            period = self.period,
            objects = self.info.len(),
            "Worker started"
        );
        Ok(())
    }

    /// Advance the trigger counter by one master cycle.
    ///
    /// Returns `true` when the worker was released this tick.
    #[inline]
    pub(crate) fn tick(&mut self, fault_code: u32, fieldbus_ok: bool) -> bool {
        if self.counter > 0 {
            self.counter -= 1;
            return false;
        }
        self.counter = self.period - 1;
        self.release(fault_code, fieldbus_ok)
    }

    fn release(&self, fault_code: u32, fieldbus_ok: bool) -> bool {
        let s = &self.shared;
        if !s.ready.load(Ordering::Acquire) {
            let overruns = s.overruns.fetch_add(1, Ordering::Relaxed) + 1;
            if overruns.is_power_of_two() {
                warn!(task = self.config.index, overruns, "Task overrun");
            }
            return false;
        }
        s.fault_code.store(fault_code, Ordering::Relaxed);
        s.fieldbus_ok.store(fieldbus_ok, Ordering::Relaxed);
        s.ready.store(false, Ordering::Release);
        s.pending.store(true, Ordering::Release);
        s.releases.fetch_add(1, Ordering::Relaxed);
        if let Some(t) = &self.thread {
            t.unpark();
        }
        true
    }

    #[inline]
    pub(crate) fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn overruns(&self) -> u64 {
        self.shared.overruns.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn releases(&self) -> u64 {
        self.shared.releases.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn last_error(&self) -> u32 {
        self.shared.last_error.load(Ordering::Acquire)
    }

    pub(crate) fn report(&self) -> TaskReport {
        let s = &self.shared;
        let min = s.exec_min_ns.load(Ordering::Relaxed);
        TaskReport {
            index: self.config.index,
            name: self.config.display_name(),
            period: self.period,
            releases: self.releases(),
            overruns: self.overruns(),
            executions: s.executions.load(Ordering::Relaxed),
            last_error: self.last_error(),
            ready: self.is_ready(),
            exec_time_min_ns: (min != u64::MAX).then_some(min),
            exec_time_max_ns: s.exec_max_ns.load(Ordering::Relaxed),
            objects: self.info.clone(),
        }
    }

    /// Signal the worker to exit and join it.
    pub(crate) fn shutdown(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(t) = self.thread.take() {
            t.unpark();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(task = self.config.index, "Worker thread panicked");
            } else {
                debug!(task = self.config.index, "Worker stopped");
            }
        }
    }
}

fn worker_loop(
    index: usize,
    affinity: Option<usize>,
    priority: i32,
    mut objects: ObjectList,
    shared: Arc<TaskShared>,
) {
    if let Err(e) = rt::setup_thread(affinity, priority) {
        warn!(task = index, error = %e, "RT setup failed, running best effort");
    }
    loop {
        while !shared.pending.load(Ordering::Acquire) && !shared.shutdown.load(Ordering::Acquire) {
            thread::park();
        }
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        shared.pending.store(false, Ordering::Release);

        let fault_code = shared.fault_code.load(Ordering::Relaxed);
        let fieldbus_ok = shared.fieldbus_ok.load(Ordering::Relaxed);
        let start = Instant::now();
        let last_error = run_objects(&mut objects, fault_code, fieldbus_ok);
        shared.record_exec_time(start.elapsed().as_nanos() as u64);
        shared.last_error.store(last_error, Ordering::Release);
        trace!(task = index, last_error, "Task executed");
        shared.ready.store(true, Ordering::Release);
    }
}

/// Execute every object in registration order; returns the last non-zero
/// object error code of this pass, or 0.
#[inline]
pub(crate) fn run_objects(objects: &mut [ExecutionObject], fault_code: u32, fieldbus_ok: bool) -> u32 {
    let mut last_error = 0;
    for object in objects.iter_mut() {
        object.execute(fault_code, fieldbus_ok);
        let code = object.error_code();
        if code != 0 {
            last_error = code;
        }
    }
    last_error
}
