//! Multi-rate task scheduler.
//!
//! [`Scheduler::tick`] is called once per master cycle from the master
//! thread and never blocks. Objects assigned to task 0 run inline inside
//! `tick`; every other task owns a worker thread released every `period`
//! master cycles. A worker still busy when its release is due misses that
//! release and its overrun counter increments; releases are never queued.
//!
//! ```text
//! offset 0, period 5:
//! tick     0  1  2  3  4  5  6 ...
//! counter  0  4  3  2  1  0  4
//! release  x              x
//! ```

pub mod rt;
pub mod task;

use std::time::{Duration, Instant};

use cyclon_common::config::{ConfigError, check_range};
use cyclon_common::consts::{
    MASTER_CYCLE_US_MAX, MASTER_CYCLE_US_MIN, MASTER_TASK_INDEX, MAX_OBJECTS_PER_TASK,
};
use cyclon_common::task::SchedulerConfig;
use tracing::{debug, info, warn};

use crate::error::SetupError;
use crate::exec::ExecutionObject;

use self::task::{ObjectList, Task, run_objects};
pub use self::task::{ObjectInfo, TaskReport};

pub struct Scheduler {
    config: SchedulerConfig,
    master_objects: ObjectList,
    master_info: Vec<ObjectInfo>,
    master_last_error: u32,
    tasks: Vec<Task>,
    started: bool,
    ticks: u64,
}

impl Scheduler {
    /// Validate the topology and prepare one (not yet started) task per
    /// configured entry.
    pub fn new(config: SchedulerConfig) -> Result<Self, SetupError> {
        check_range(
            "master_cycle_us",
            config.master_cycle_us,
            MASTER_CYCLE_US_MIN,
            MASTER_CYCLE_US_MAX,
        )
        .map_err(|e| SetupError::Config(ConfigError::ValidationError(e)))?;
        let mut tasks = Vec::with_capacity(config.tasks.len());
        for task_cfg in &config.tasks {
            task_cfg
                .validate(config.master_cycle_us)
                .map_err(|reason| SetupError::InvalidTask {
                    index: task_cfg.index,
                    reason,
                })?;
            if tasks.iter().any(|t: &Task| t.index() == task_cfg.index) {
                return Err(SetupError::InvalidTask {
                    index: task_cfg.index,
                    reason: "duplicate task index".to_string(),
                });
            }
            let period = task_cfg
                .period_in_master_cycles(config.master_cycle_us)
                .map_err(|reason| SetupError::InvalidTask {
                    index: task_cfg.index,
                    reason,
                })?;
            tasks.push(Task::new(task_cfg.clone(), period));
        }
        debug!(
            master_cycle_us = config.master_cycle_us,
            tasks = tasks.len(),
            "Scheduler created"
        );
        Ok(Self {
            config,
            master_objects: ObjectList::new(),
            master_info: Vec::new(),
            master_last_error: 0,
            tasks,
            started: false,
            ticks: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Bind an object to its task. Only allowed before [`Self::start`].
    pub fn add_object(&mut self, object: ExecutionObject) -> Result<(), SetupError> {
        if self.started {
            return Err(SetupError::AlreadyStarted);
        }
        let index = object.task_index();
        debug!(object = object.name(), kind = %object.object_type(), task = index, "Object added");
        if index == MASTER_TASK_INDEX {
            return self
                .master_objects
                .push(object)
                .map_err(|_| SetupError::TooManyObjects {
                    task: MASTER_TASK_INDEX,
                    max: MAX_OBJECTS_PER_TASK,
                });
        }
        match self.task_mut(index) {
            Some(task) => task.push(object),
            None => Err(SetupError::UnknownTask {
                object: object.name().to_string(),
                task: index,
            }),
        }
    }

    /// Build every object's process image and fail when two different
    /// tasks declare a write to the same item. Also run by [`Self::start`].
    pub fn build_process_images(&mut self) -> Result<(), SetupError> {
        if self.started {
            return Err(SetupError::AlreadyStarted);
        }
        self.master_info = self
            .master_objects
            .iter_mut()
            .map(|o| ObjectInfo {
                process_image: o.build_process_image().clone(),
                name: o.name().to_string(),
                kind: o.object_type(),
            })
            .collect();
        for task in &mut self.tasks {
            task.build_process_images();
        }
        self.check_write_partition()
    }

    /// Build process images, check the cross-task write partition and
    /// spawn every worker.
    pub fn start(&mut self) -> Result<(), SetupError> {
        self.build_process_images()?;

        for i in 0..self.tasks.len() {
            if let Err(e) = self.tasks[i].spawn() {
                for task in &mut self.tasks[..i] {
                    task.shutdown();
                }
                return Err(e);
            }
        }
        self.started = true;
        info!(
            tasks = self.tasks.len(),
            master_objects = self.master_objects.len(),
            "Scheduler started"
        );
        Ok(())
    }

    fn check_write_partition(&self) -> Result<(), SetupError> {
        let groups: Vec<(usize, &[ObjectInfo])> =
            std::iter::once((MASTER_TASK_INDEX, self.master_info.as_slice()))
                .chain(self.tasks.iter().map(|t| (t.index(), t.info())))
                .collect();
        for (i, (task_a, infos_a)) in groups.iter().enumerate() {
            for (task_b, infos_b) in &groups[i + 1..] {
                let mut items = Vec::new();
                for a in infos_a.iter() {
                    for b in infos_b.iter() {
                        items.extend(a.process_image.write_overlap(&b.process_image));
                    }
                }
                if !items.is_empty() {
                    items.sort();
                    items.dedup();
                    return Err(SetupError::WriteOverlap {
                        task_a: *task_a,
                        task_b: *task_b,
                        items,
                    });
                }
            }
        }
        Ok(())
    }

    /// One master cycle: run master objects, then release due workers.
    /// No-op until started.
    #[inline]
    pub fn tick(&mut self, fault_code: u32, fieldbus_ok: bool) {
        if !self.started {
            return;
        }
        self.ticks += 1;
        self.master_last_error = run_objects(&mut self.master_objects, fault_code, fieldbus_ok);
        for task in &mut self.tasks {
            task.tick(fault_code, fieldbus_ok);
        }
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Master cycles seen so far.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    fn task(&self, index: usize) -> Option<&Task> {
        self.tasks.iter().find(|t| t.index() == index)
    }

    fn task_mut(&mut self, index: usize) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.index() == index)
    }

    /// Worker finished its last release (master task is always ready).
    pub fn is_ready(&self, index: usize) -> bool {
        if index == MASTER_TASK_INDEX {
            return true;
        }
        self.task(index).is_some_and(Task::is_ready)
    }

    /// Whether the next tick releases this task.
    pub fn is_next_cycle_new_execution(&self, index: usize) -> bool {
        if index == MASTER_TASK_INDEX {
            return true;
        }
        self.task(index).is_some_and(|t| t.counter() == 0)
    }

    pub fn period(&self, index: usize) -> Option<u32> {
        if index == MASTER_TASK_INDEX {
            return Some(1);
        }
        self.task(index).map(Task::period)
    }

    pub fn overruns(&self, index: usize) -> u64 {
        self.task(index).map_or(0, Task::overruns)
    }

    pub fn release_count(&self, index: usize) -> u64 {
        if index == MASTER_TASK_INDEX {
            return self.ticks;
        }
        self.task(index).map_or(0, Task::releases)
    }

    /// Last non-zero object error of the most recent completed release.
    pub fn last_error(&self, index: usize) -> u32 {
        if index == MASTER_TASK_INDEX {
            return self.master_last_error;
        }
        self.task(index).map_or(0, Task::last_error)
    }

    /// Diagnostics for every worker task.
    pub fn report(&self) -> Vec<TaskReport> {
        self.tasks.iter().map(Task::report).collect()
    }

    /// Objects bound to the master task.
    pub fn master_objects(&self) -> &[ObjectInfo] {
        &self.master_info
    }

    /// Spin until every worker is ready or `timeout` expires.
    ///
    /// Blocking; meant for shutdown and tests, never for the cycle path.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.tasks.iter().all(Task::is_ready) {
                return true;
            }
            if Instant::now() >= deadline {
                warn!(?timeout, "Workers still busy");
                return false;
            }
            std::thread::yield_now();
        }
    }

    /// Stop and join every worker. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        for task in &mut self.tasks {
            task.shutdown();
        }
        self.started = false;
        info!(ticks = self.ticks, "Scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("master_cycle_us", &self.config.master_cycle_us)
            .field("tasks", &self.tasks.len())
            .field("started", &self.started)
            .field("ticks", &self.ticks)
            .finish()
    }
}
