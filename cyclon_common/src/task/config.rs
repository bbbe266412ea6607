//! Scheduler and task configuration.
//!
//! ```toml
//! [scheduler]
//! master_cycle_us = 1000
//!
//! [[scheduler.tasks]]
//! index = 1
//! sample_time_us = 5000
//! offset_cycles = 2
//! affinity = 3
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::check_range;
use crate::consts::{
    MASTER_CYCLE_US_DEFAULT, MASTER_CYCLE_US_MAX, MASTER_CYCLE_US_MIN, MASTER_PRIORITY_DEFAULT,
    MAX_TASKS, TASK_PRIORITY_DEFAULT, TASK_STACK_SIZE_DEFAULT, TASK_STACK_SIZE_MIN,
};

/// Largest accepted start offset [master cycles].
pub const OFFSET_CYCLES_MAX: u32 = 1_000_000;

/// SCHED_FIFO priority range accepted by Linux.
pub const PRIORITY_MIN: i32 = 1;
pub const PRIORITY_MAX: i32 = 99;

// ─── Task ───────────────────────────────────────────────────────────

/// One worker task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Task index, 1..=MAX_TASKS (0 is reserved for the master task).
    pub index: usize,
    /// Human-readable name for reports.
    #[serde(default)]
    pub name: Option<String>,
    /// SCHED_FIFO priority (only applied with the `rt` feature).
    #[serde(default = "default_task_priority")]
    pub priority: i32,
    /// CPU core to pin the worker to.
    #[serde(default)]
    pub affinity: Option<usize>,
    /// Worker thread stack size [bytes].
    #[serde(default = "default_stack_size")]
    pub stack_size: usize,
    /// Master cycles before the first release.
    #[serde(default)]
    pub offset_cycles: u32,
    /// Task sample time [µs]; an integer multiple of the master cycle.
    pub sample_time_us: u32,
}

fn default_task_priority() -> i32 {
    TASK_PRIORITY_DEFAULT
}
fn default_stack_size() -> usize {
    TASK_STACK_SIZE_DEFAULT
}

impl TaskConfig {
    /// Minimal config with defaults for everything but index and rate.
    pub fn new(index: usize, sample_time_us: u32) -> Self {
        Self {
            index,
            name: None,
            priority: TASK_PRIORITY_DEFAULT,
            affinity: None,
            stack_size: TASK_STACK_SIZE_DEFAULT,
            offset_cycles: 0,
            sample_time_us,
        }
    }

    /// Display name, `task-<index>` when unnamed.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("task-{}", self.index))
    }

    /// Sub-rate period in master cycles.
    ///
    /// Truncates when the sample time is not an integer multiple of the
    /// master cycle. Fails when the task would run faster than the master.
    pub fn period_in_master_cycles(&self, master_cycle_us: u32) -> Result<u32, String> {
        if master_cycle_us == 0 {
            return Err("master_cycle_us must be > 0".to_string());
        }
        let period = self.sample_time_us / master_cycle_us;
        if period < 1 {
            return Err(format!(
                "task {}: sample_time_us {} faster than master cycle {} µs",
                self.index, self.sample_time_us, master_cycle_us
            ));
        }
        if !self.sample_time_us.is_multiple_of(master_cycle_us) {
            warn!(
                task = self.index,
                sample_time_us = self.sample_time_us,
                master_cycle_us,
                period,
                "Task sample time is not a multiple of the master cycle, truncating"
            );
        }
        Ok(period)
    }

    /// Validate against the master cycle time.
    pub fn validate(&self, master_cycle_us: u32) -> Result<(), String> {
        check_range("task index", self.index, 1, MAX_TASKS)?;
        check_range("priority", self.priority, PRIORITY_MIN, PRIORITY_MAX)?;
        if self.stack_size < TASK_STACK_SIZE_MIN {
            return Err(format!(
                "task {}: stack_size {} below minimum {}",
                self.index, self.stack_size, TASK_STACK_SIZE_MIN
            ));
        }
        check_range("offset_cycles", self.offset_cycles, 0, OFFSET_CYCLES_MAX)?;
        self.period_in_master_cycles(master_cycle_us).map(|_| ())
    }
}

// ─── Scheduler ──────────────────────────────────────────────────────

/// Master cycle and task topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Master (fieldbus) cycle time [µs].
    #[serde(default = "default_master_cycle_us")]
    pub master_cycle_us: u32,
    /// SCHED_FIFO priority of the master cycle thread.
    #[serde(default = "default_master_priority")]
    pub master_priority: i32,
    /// CPU core for the master cycle thread.
    #[serde(default)]
    pub master_affinity: Option<usize>,
    /// Worker tasks.
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

fn default_master_cycle_us() -> u32 {
    MASTER_CYCLE_US_DEFAULT
}
fn default_master_priority() -> i32 {
    MASTER_PRIORITY_DEFAULT
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            master_cycle_us: MASTER_CYCLE_US_DEFAULT,
            master_priority: MASTER_PRIORITY_DEFAULT,
            master_affinity: None,
            tasks: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Look up a task by index.
    pub fn task(&self, index: usize) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.index == index)
    }

    /// Sample time [µs] of the task at `index` (0 = master).
    pub fn sample_time_us(&self, index: usize) -> Option<u32> {
        if index == crate::consts::MASTER_TASK_INDEX {
            return Some(self.master_cycle_us);
        }
        self.task(index)
            .map(|t| (t.sample_time_us / self.master_cycle_us.max(1)) * self.master_cycle_us)
    }

    /// Validate bounds, every task, and index uniqueness.
    pub fn validate(&self) -> Result<(), String> {
        check_range(
            "master_cycle_us",
            self.master_cycle_us,
            MASTER_CYCLE_US_MIN,
            MASTER_CYCLE_US_MAX,
        )?;
        check_range(
            "master_priority",
            self.master_priority,
            PRIORITY_MIN,
            PRIORITY_MAX,
        )?;
        if self.tasks.len() > MAX_TASKS {
            return Err(format!(
                "{} tasks configured, maximum is {MAX_TASKS}",
                self.tasks.len()
            ));
        }
        for (i, task) in self.tasks.iter().enumerate() {
            task.validate(self.master_cycle_us)?;
            if self.tasks[..i].iter().any(|t| t.index == task.index) {
                return Err(format!("duplicate task index {}", task.index));
            }
        }
        Ok(())
    }
}

// ─── Timed Events ───────────────────────────────────────────────────

/// Periodic output pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimedEventConfig {
    pub name: String,
    #[serde(default)]
    pub task_index: usize,
    /// Executions between pulses.
    pub interval: u32,
    /// Output bit entry pulsed for one execution.
    pub output: String,
    /// Start armed.
    #[serde(default = "default_armed")]
    pub armed: bool,
}

fn default_armed() -> bool {
    true
}

impl TimedEventConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("event name cannot be empty".to_string());
        }
        if self.interval == 0 {
            return Err(format!("event '{}': interval must be > 0", self.name));
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_from_sample_time() {
        let task = TaskConfig::new(1, 5000);
        assert_eq!(task.period_in_master_cycles(1000), Ok(5));
        assert_eq!(task.period_in_master_cycles(5000), Ok(1));
    }

    #[test]
    fn faster_than_master_rejected() {
        let task = TaskConfig::new(1, 500);
        assert!(task.period_in_master_cycles(1000).is_err());
        assert!(task.validate(1000).is_err());
    }

    #[test]
    fn non_multiple_truncates() {
        let task = TaskConfig::new(2, 2500);
        assert_eq!(task.period_in_master_cycles(1000), Ok(2));
    }

    #[test]
    fn index_zero_reserved_for_master() {
        let task = TaskConfig::new(0, 1000);
        assert!(task.validate(1000).is_err());
    }

    #[test]
    fn small_stack_rejected() {
        let mut task = TaskConfig::new(1, 1000);
        task.stack_size = 1024;
        assert!(task.validate(1000).is_err());
    }

    #[test]
    fn duplicate_indices_rejected() {
        let cfg = SchedulerConfig {
            tasks: vec![TaskConfig::new(1, 1000), TaskConfig::new(1, 2000)],
            ..SchedulerConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn master_cycle_bounds() {
        let cfg = SchedulerConfig {
            master_cycle_us: 50,
            ..SchedulerConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn sample_time_lookup() {
        let cfg = SchedulerConfig {
            tasks: vec![TaskConfig::new(3, 2500)],
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.sample_time_us(0), Some(1000));
        assert_eq!(cfg.sample_time_us(3), Some(2000));
        assert_eq!(cfg.sample_time_us(4), None);
    }

    #[test]
    fn scheduler_from_toml() {
        let cfg: SchedulerConfig = toml::from_str(
            r#"
master_cycle_us = 500
[[tasks]]
index = 1
sample_time_us = 2000
offset_cycles = 1
"#,
        )
        .unwrap();
        assert_eq!(cfg.tasks[0].priority, TASK_PRIORITY_DEFAULT);
        assert_eq!(cfg.tasks[0].period_in_master_cycles(500), Ok(4));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn event_interval_must_be_positive() {
        let ev = TimedEventConfig {
            name: "strobe".to_string(),
            task_index: 0,
            interval: 0,
            output: "strobe.out".to_string(),
            armed: true,
        };
        assert!(ev.validate().is_err());
    }
}
