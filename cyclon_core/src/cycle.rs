//! Master cycle: fieldbus exchange → scheduler tick → parameter refresh.
//!
//! ## RT Setup
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`
//! 2. Prefault stack pages
//! 3. Pin to the configured master CPU
//! 4. `SCHED_FIFO` at the master priority
//!
//! ## Pacing
//! With `rt`, absolute-time `clock_nanosleep` on `CLOCK_MONOTONIC`;
//! otherwise `std::thread::sleep` for the remainder of the period.
//! Overruns are counted and logged, never fatal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::SetupError;
use crate::publish::{ParamRegistry, ParamSink};
use crate::scheduler::{Scheduler, rt};

// ─── Fieldbus ───────────────────────────────────────────────────────

/// Health of one fieldbus exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldbusStatus {
    pub ok: bool,
    pub fault_code: u32,
}

/// The fieldbus exchange layer, seen as a black box.
pub trait FieldbusLink {
    /// Exchange the process image for this cycle.
    fn exchange(&mut self) -> FieldbusStatus;
}

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    pub sum_cycle_ns: i64,
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Full RT setup of the calling (master) thread. No-op without `rt`.
pub fn rt_setup(affinity: Option<usize>, priority: i32) -> Result<(), SetupError> {
    rt::lock_memory()?;
    rt::prefault_stack();
    rt::setup_thread(affinity, priority)
}

// ─── Runner ─────────────────────────────────────────────────────────

/// Owns the scheduler and drives it from a fieldbus link.
pub struct MasterCycle<F: FieldbusLink> {
    scheduler: Scheduler,
    fieldbus: F,
    params: Option<(ParamRegistry, Box<dyn ParamSink + Send>)>,
    running: Arc<AtomicBool>,
    cycle_time_ns: i64,
    stats: CycleStats,
}

impl<F: FieldbusLink> MasterCycle<F> {
    /// The scheduler must already be started.
    pub fn new(scheduler: Scheduler, fieldbus: F, running: Arc<AtomicBool>) -> Self {
        let cycle_time_ns = i64::from(scheduler.config().master_cycle_us) * 1000;
        Self {
            scheduler,
            fieldbus,
            params: None,
            running,
            cycle_time_ns,
            stats: CycleStats::new(),
        }
    }

    /// Refresh `registry` into `sink` once per cycle.
    pub fn with_params(mut self, registry: ParamRegistry, sink: Box<dyn ParamSink + Send>) -> Self {
        self.params = Some((registry, sink));
        self
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn fieldbus_mut(&mut self) -> &mut F {
        &mut self.fieldbus
    }

    /// One cycle body, without pacing.
    #[inline]
    pub fn step(&mut self) {
        let status = self.fieldbus.exchange();
        self.scheduler.tick(status.fault_code, status.ok);
        if let Some((registry, sink)) = &mut self.params {
            registry.refresh_all(false, sink.as_mut());
        }
    }

    /// Run until the `running` flag clears or `max_cycles` (0 = unbounded)
    /// cycles have elapsed, then stop the workers.
    pub fn run(&mut self, max_cycles: u64) -> Result<CycleStats, SetupError> {
        info!(
            cycle_time_us = self.cycle_time_ns / 1000,
            max_cycles, "Entering master cycle"
        );
        #[cfg(feature = "rt")]
        let result = self.run_rt_loop(max_cycles);
        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop(max_cycles);

        self.scheduler.wait_idle(Duration::from_millis(100));
        if let Some((registry, sink)) = &mut self.params {
            registry.refresh_all(true, sink.as_mut());
        }
        self.scheduler.shutdown();
        info!(
            cycles = self.stats.cycle_count,
            overruns = self.stats.overruns,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            "Master cycle stopped"
        );
        result.map(|()| self.stats.clone())
    }

    fn keep_running(&self, max_cycles: u64) -> bool {
        self.running.load(Ordering::Acquire)
            && (max_cycles == 0 || self.stats.cycle_count < max_cycles)
    }

    fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.stats.record(duration_ns, latency_ns);
        if duration_ns > self.cycle_time_ns {
            self.stats.overruns += 1;
            if self.stats.overruns.is_power_of_two() {
                warn!(
                    duration_ns,
                    budget_ns = self.cycle_time_ns,
                    overruns = self.stats.overruns,
                    "Master cycle overrun"
                );
            }
        }
    }

    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, max_cycles: u64) -> Result<(), SetupError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || {
            clock_gettime(clock).map_err(|e| SetupError::RtSetup(format!("clock_gettime: {e}")))
        };
        let mut next_wake = now()?;
        while self.keep_running(max_cycles) {
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);
            let start = now()?;
            self.step();
            let end = now()?;
            self.record(timespec_diff_ns(&end, &start), 0);
            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
            let woke = now()?;
            self.stats.max_latency_ns = self
                .stats
                .max_latency_ns
                .max(timespec_diff_ns(&woke, &next_wake).abs());
        }
        Ok(())
    }

    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, max_cycles: u64) -> Result<(), SetupError> {
        use std::time::Instant;

        let period = Duration::from_nanos(self.cycle_time_ns as u64);
        while self.keep_running(max_cycles) {
            let start = Instant::now();
            self.step();
            let elapsed = start.elapsed();
            self.record(elapsed.as_nanos() as i64, 0);
            if let Some(remaining) = period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }
}

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}
