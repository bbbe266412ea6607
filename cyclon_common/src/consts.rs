//! System-wide constants for the Cyclon workspace.
//!
//! Single source of truth for numeric limits and defaults.
//! Imported by all crates; do not duplicate them locally.

/// Maximum number of worker tasks (excluding the master task).
pub const MAX_TASKS: usize = 16;

/// Maximum number of execution objects bound to a single task.
pub const MAX_OBJECTS_PER_TASK: usize = 64;

/// Maximum number of axes a PVT controller coordinates.
pub const MAX_PVT_AXES: usize = 16;

/// Index of the master (fieldbus exchange) task.
pub const MASTER_TASK_INDEX: usize = 0;

/// Default master cycle time in microseconds (1 kHz = 1000 µs).
pub const MASTER_CYCLE_US_DEFAULT: u32 = 1000;

/// Fastest supported master cycle [µs].
pub const MASTER_CYCLE_US_MIN: u32 = 100;

/// Slowest supported master cycle [µs].
pub const MASTER_CYCLE_US_MAX: u32 = 10_000;

/// Default worker stack size [bytes].
pub const TASK_STACK_SIZE_DEFAULT: usize = 256 * 1024;

/// Smallest accepted worker stack size [bytes].
pub const TASK_STACK_SIZE_MIN: usize = 16 * 1024;

/// Default SCHED_FIFO priority for worker tasks.
pub const TASK_PRIORITY_DEFAULT: i32 = 70;

/// Default SCHED_FIFO priority for the master cycle thread.
pub const MASTER_PRIORITY_DEFAULT: i32 = 80;

/// Default over-velocity trajectory-tier delay [cycles].
pub const MAX_VEL_TRAJ_DELAY_DEFAULT: u32 = 200;

/// Observation window of the controller-output-increase heuristic [cycles].
pub const OUT_INCREASE_WINDOW_DEFAULT: u32 = 2000;

/// Increase-counter threshold inside one observation window [cycles].
pub const OUT_INCREASE_THRESHOLD_DEFAULT: u32 = 1200;

/// Reasonable-motion threshold inside one observation window [cycles].
pub const REASONABLE_MOVE_THRESHOLD_DEFAULT: u32 = 1200;

/// Default published parameter sample period [cycles].
pub const PUBLISH_SAMPLE_CYCLES_DEFAULT: i32 = 10;

/// Default name of the unified configuration file.
pub const CONFIG_FILE_NAME: &str = "cyclon.toml";

static_assertions::const_assert!(MASTER_TASK_INDEX == 0);
static_assertions::const_assert!(MAX_TASKS > 0);
static_assertions::const_assert!(MAX_OBJECTS_PER_TASK > 0);
static_assertions::const_assert!(MASTER_CYCLE_US_MIN <= MASTER_CYCLE_US_DEFAULT);
static_assertions::const_assert!(MASTER_CYCLE_US_DEFAULT <= MASTER_CYCLE_US_MAX);
static_assertions::const_assert!(TASK_STACK_SIZE_MIN <= TASK_STACK_SIZE_DEFAULT);
static_assertions::const_assert!(OUT_INCREASE_THRESHOLD_DEFAULT < OUT_INCREASE_WINDOW_DEFAULT);
static_assertions::const_assert!(REASONABLE_MOVE_THRESHOLD_DEFAULT < OUT_INCREASE_WINDOW_DEFAULT);
