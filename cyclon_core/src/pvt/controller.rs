//! Multi-axis PVT controller.
//!
//! Moves every participating axis to its sequence start position, waits
//! until all are there, then starts all sequences in the same cycle. The
//! trigger output pulses at the start and again each time the elapsed time
//! passes a waypoint time; the index of the last passed waypoint is the
//! current point id. Any interlocked, disabled or erroring axis while
//! waiting or executing aborts the whole group.
//!
//! ```text
//! Idle ──execute↑──▶ TriggMoveAxesToStart ──▶ WaitForAxesAtStart
//!                                                │ all at start
//!                                                ▼
//!        Idle ◀── done ── ExecutePvt ◀────── TriggPvt
//!
//! axis fault / execute↓ / abort() ──▶ Abort ──▶ Error ──error_reset()──▶ Idle
//! ```

use cyclon_common::consts::MAX_PVT_AXES;
use cyclon_common::motion::error::{
    ERROR_PVT_CTRL_ABORTED, ERROR_PVT_CTRL_AXIS_COUNT_ZERO, ERROR_PVT_CTRL_AXIS_INTERLOCKED,
    ERROR_PVT_CTRL_AXIS_NOT_READY, ERROR_PVT_CTRL_SEQUENCE_INVALID,
};
use tracing::{debug, info, warn};

use super::PvtError;

/// Default process data entry pulsed when sequences start.
pub const PVT_TRIGGER_ENTRY_DEFAULT: &str = "pvtctrl.trigg.output";

/// Logic entry carrying the current point id.
pub const PVT_POINT_ID_ENTRY: &str = "pvtctrl.point_id";

/// Logic entry carrying the number of trigger pulses of the current run.
pub const PVT_TRIGGER_ID_ENTRY: &str = "pvtctrl.trigger_id";

/// Slack for comparing accumulated time against waypoint times [s].
const TIME_EPS: f64 = 1e-9;

/// Axis handle driven by the controller.
///
/// Commands are posted, not executed inline: the axis applies them on its
/// own next cycle, possibly in another task.
pub trait PvtAxis: Send {
    fn name(&self) -> &str;
    fn actual_position(&self) -> f64;
    /// Axis is executing a move or a sequence.
    fn busy(&self) -> bool;
    /// Any trajectory-tier interlock active.
    fn interlocked(&self) -> bool;
    /// Drive enabled as published by the axis.
    fn enabled(&self) -> bool;
    /// Latched axis error (0 = none).
    fn error_code(&self) -> u32;
    /// Whether the axis holds a validated sequence.
    fn pvt_valid(&self) -> bool;
    fn pvt_start_position(&self) -> Option<f64>;
    fn pvt_duration(&self) -> Option<f64>;
    fn set_enable(&self, enable: bool);
    fn error_reset(&self);
    fn move_to(&self, position: f64);
    fn start_pvt(&self);
    fn stop(&self);
}

/// Axis that can neither take nor follow commands.
#[inline]
fn not_ready(axis: &dyn PvtAxis) -> bool {
    !axis.enabled() || axis.error_code() != 0
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PvtState {
    #[default]
    Idle = 0,
    TriggMoveAxesToStart = 1,
    WaitForAxesAtStart = 2,
    TriggPvt = 3,
    ExecutePvt = 4,
    Abort = 5,
    Error = 6,
}

struct Slot {
    axis: Box<dyn PvtAxis>,
    start: f64,
}

pub struct PvtController {
    slots: heapless::Vec<Slot, MAX_PVT_AXES>,
    trigger_times: Vec<f64>,
    sample_time: f64,
    start_tolerance: f64,
    end_time: f64,
    cycles: u64,
    current_time: f64,
    next_trigger: usize,
    point_id: usize,
    trigger_id: usize,
    state: PvtState,
    execute: bool,
    execute_old: bool,
    busy: bool,
    trigger: bool,
    error_code: u32,
}

impl PvtController {
    /// Controller executed every `sample_time` seconds.
    pub fn new(sample_time: f64, start_tolerance: f64) -> Result<Self, PvtError> {
        if !(sample_time.is_finite() && sample_time > 0.0) {
            return Err(PvtError::InvalidSampleTime(sample_time));
        }
        Ok(Self {
            slots: heapless::Vec::new(),
            trigger_times: Vec::new(),
            sample_time,
            start_tolerance,
            end_time: 0.0,
            cycles: 0,
            current_time: 0.0,
            next_trigger: 0,
            point_id: 0,
            trigger_id: 0,
            state: PvtState::Idle,
            execute: false,
            execute_old: false,
            busy: false,
            trigger: false,
            error_code: 0,
        })
    }

    pub fn add_axis(&mut self, axis: Box<dyn PvtAxis>) -> Result<(), PvtError> {
        if self.busy {
            return Err(PvtError::Busy);
        }
        let name = axis.name().to_string();
        self.slots
            .push(Slot { axis, start: 0.0 })
            .map_err(|_| PvtError::TooManyAxes(MAX_PVT_AXES))?;
        debug!(axis = %name, count = self.slots.len(), "PVT axis added");
        Ok(())
    }

    pub fn clear_axes(&mut self) -> Result<(), PvtError> {
        if self.busy {
            return Err(PvtError::Busy);
        }
        self.slots.clear();
        Ok(())
    }

    #[inline]
    pub fn axis_count(&self) -> usize {
        self.slots.len()
    }

    /// Waypoint times relative to the sequence start [s].
    ///
    /// Must be finite, non-negative and strictly increasing. Without trigger
    /// times the output pulses once, at the start.
    pub fn set_trigger_times(&mut self, times: &[f64]) -> Result<(), PvtError> {
        if self.busy {
            return Err(PvtError::Busy);
        }
        let mut previous = f64::NEG_INFINITY;
        for &time in times {
            if !(time.is_finite() && time >= 0.0 && time > previous) {
                return Err(PvtError::InvalidTriggerTime { previous, time });
            }
            previous = time;
        }
        self.trigger_times = times.to_vec();
        debug!(count = times.len(), "PVT trigger times set");
        Ok(())
    }

    /// Latch the execute command; edges are evaluated in [`Self::execute`].
    pub fn set_execute(&mut self, execute: bool) {
        self.execute = execute;
    }

    /// Request an abort; handled on the next cycle.
    pub fn abort(&mut self) {
        if self.busy {
            self.state = PvtState::Abort;
        }
    }

    pub fn error_reset(&mut self) {
        if self.state == PvtState::Error {
            self.state = PvtState::Idle;
        }
        self.error_code = 0;
    }

    #[inline]
    pub fn busy(&self) -> bool {
        self.busy
    }

    #[inline]
    pub fn state(&self) -> PvtState {
        self.state
    }

    /// Elapsed sequence time since the trigger [s].
    #[inline]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Index of the last waypoint whose time has passed.
    #[inline]
    pub fn current_point_id(&self) -> usize {
        self.point_id
    }

    /// Trigger pulses issued in the current run (0 before the first).
    #[inline]
    pub fn current_trigger_id(&self) -> usize {
        self.trigger_id
    }

    #[inline]
    pub fn error_code(&self) -> u32 {
        self.error_code
    }

    /// Trigger output level for the current cycle.
    #[inline]
    pub fn trigger_output(&self) -> bool {
        self.trigger
    }

    /// Run one controller cycle. Returns the trigger output level.
    pub fn execute(&mut self) -> bool {
        let rising = self.execute && !self.execute_old;
        let falling = !self.execute && self.execute_old;
        self.execute_old = self.execute;
        self.trigger = false;

        if falling && self.busy && self.state != PvtState::Abort {
            warn!("PVT execute dropped while busy, aborting");
            self.state = PvtState::Abort;
        }

        match self.state {
            PvtState::Idle => {
                if rising {
                    match self.prepare() {
                        Ok(()) => {
                            self.busy = true;
                            self.cycles = 0;
                            self.current_time = 0.0;
                            self.point_id = 0;
                            self.trigger_id = 0;
                            self.transition(PvtState::TriggMoveAxesToStart);
                        }
                        Err(code) => {
                            warn!(error = format_args!("0x{code:X}"), "PVT start rejected");
                            self.error_code = code;
                            self.transition(PvtState::Error);
                        }
                    }
                }
            }
            PvtState::TriggMoveAxesToStart => {
                for slot in self.slots.iter() {
                    slot.axis.move_to(slot.start);
                }
                self.transition(PvtState::WaitForAxesAtStart);
            }
            PvtState::WaitForAxesAtStart => {
                if !self.abort_on_axis_fault() && self.axes_at_start() {
                    self.transition(PvtState::TriggPvt);
                }
            }
            PvtState::TriggPvt => {
                for slot in self.slots.iter() {
                    slot.axis.start_pvt();
                }
                self.trigger = true;
                self.trigger_id = 1;
                self.next_trigger = self.trigger_times.partition_point(|&t| t <= TIME_EPS);
                self.point_id = self.next_trigger.saturating_sub(1);
                info!(axes = self.slots.len(), duration = self.end_time, "PVT triggered");
                self.transition(PvtState::ExecutePvt);
            }
            PvtState::ExecutePvt => {
                if !self.abort_on_axis_fault() {
                    self.cycles += 1;
                    self.current_time = self.cycles as f64 * self.sample_time;
                    self.check_if_time_to_trigger();
                    if self.current_time >= self.end_time - TIME_EPS
                        && !self.slots.iter().any(|s| s.axis.busy())
                    {
                        self.busy = false;
                        info!(
                            time = self.current_time,
                            triggers = self.trigger_id,
                            "PVT done"
                        );
                        self.transition(PvtState::Idle);
                    }
                }
            }
            PvtState::Abort => {
                for slot in self.slots.iter() {
                    slot.axis.stop();
                }
                if self.error_code == 0 {
                    self.error_code = ERROR_PVT_CTRL_ABORTED;
                }
                self.busy = false;
                warn!(
                    error = format_args!("0x{:X}", self.error_code),
                    "PVT aborted"
                );
                self.transition(PvtState::Error);
            }
            PvtState::Error => {}
        }
        self.trigger
    }

    fn transition(&mut self, next: PvtState) {
        debug!(from = ?self.state, to = ?next, "PVT state");
        self.state = next;
    }

    /// Check axes and cache start positions and end time.
    fn prepare(&mut self) -> Result<(), u32> {
        if self.slots.is_empty() {
            return Err(ERROR_PVT_CTRL_AXIS_COUNT_ZERO);
        }
        self.end_time = 0.0;
        for slot in self.slots.iter_mut() {
            let axis = slot.axis.as_ref();
            let (true, Some(start), Some(duration)) = (
                axis.pvt_valid(),
                axis.pvt_start_position(),
                axis.pvt_duration(),
            ) else {
                return Err(ERROR_PVT_CTRL_SEQUENCE_INVALID);
            };
            if axis.interlocked() {
                return Err(ERROR_PVT_CTRL_AXIS_INTERLOCKED);
            }
            if not_ready(axis) {
                warn!(axis = %axis.name(), enabled = axis.enabled(), error = axis.error_code(), "PVT axis not ready");
                return Err(ERROR_PVT_CTRL_AXIS_NOT_READY);
            }
            slot.start = start;
            self.end_time = self.end_time.max(duration);
        }
        Ok(())
    }

    /// Latch the first axis fault and move to `Abort`. Returns true on fault.
    fn abort_on_axis_fault(&mut self) -> bool {
        let code = if self.slots.iter().any(|s| s.axis.interlocked()) {
            ERROR_PVT_CTRL_AXIS_INTERLOCKED
        } else if let Some(slot) = self.slots.iter().find(|s| not_ready(s.axis.as_ref())) {
            warn!(axis = %slot.axis.name(), error = slot.axis.error_code(), "PVT axis fault");
            ERROR_PVT_CTRL_AXIS_NOT_READY
        } else {
            return false;
        };
        self.error_code = code;
        self.transition(PvtState::Abort);
        true
    }

    /// Pulse once for all waypoint times passed since the last cycle.
    fn check_if_time_to_trigger(&mut self) {
        let mut passed = None;
        while let Some(&t) = self.trigger_times.get(self.next_trigger) {
            if t > self.current_time + TIME_EPS {
                break;
            }
            passed = Some(self.next_trigger);
            self.next_trigger += 1;
        }
        if let Some(point) = passed {
            self.point_id = point;
            self.trigger_id += 1;
            self.trigger = true;
            debug!(point, trigger = self.trigger_id, time = self.current_time, "PVT trigger");
        }
    }

    fn axes_at_start(&self) -> bool {
        self.slots.iter().all(|s| {
            !s.axis.busy() && (s.axis.actual_position() - s.start).abs() <= self.start_tolerance
        })
    }
}
