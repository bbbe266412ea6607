//! Controller-output-increase-at-limit heuristic.
//!
//! Over an observation window, counts cycles where the controller output
//! keeps growing toward an engaged limit switch, and cycles where the axis
//! actually moves at a reasonable fraction of the velocity implied by the
//! output. A window with many growing cycles and few moving cycles trips.
//!
//! The window and thresholds are empirically tuned; they are configurable
//! and should be validated against the real drive.

/// Per-cycle inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncreaseInput {
    pub controller_output: f64,
    pub kff: f64,
    pub target_position: f64,
    pub actual_position: f64,
    pub actual_velocity: f64,
    pub limit_bwd_ok: bool,
    pub limit_fwd_ok: bool,
}

/// Window sizes [cycles].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncreaseWindow {
    pub window: u32,
    pub increase_threshold: u32,
    pub reasonable_move_threshold: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IncreaseAtLimit {
    cycle_counter: u32,
    increase_counter: u32,
    reasonable_move_counter: u32,
    output_old: f64,
    position_error: f64,
    position_error_old: f64,
    tripped: bool,
}

impl IncreaseAtLimit {
    /// Feed one cycle. Returns the latched trip state.
    pub fn update(&mut self, input: &IncreaseInput, win: &IncreaseWindow) -> bool {
        self.position_error_old = self.position_error;
        self.position_error = (input.target_position - input.actual_position).abs();
        let output = input.controller_output;
        let output_old = self.output_old;
        self.output_old = output;

        let at_limit = !input.limit_fwd_ok || !input.limit_bwd_ok;
        if input.kff.abs() <= 0.0 || !at_limit {
            return self.tripped;
        }

        self.cycle_counter += 1;
        let error_present = self.position_error > 0.0 && self.position_error_old > 0.0;
        let growing_fwd = !input.limit_fwd_ok && output > output_old && output_old > 0.0;
        let growing_bwd = !input.limit_bwd_ok && output < output_old && output_old < 0.0;
        if error_present && (growing_fwd || growing_bwd) {
            self.increase_counter += 1;
        }

        let implied_velocity = output / input.kff;
        let moving = (implied_velocity >= 0.0 && input.actual_velocity >= 0.5 * implied_velocity)
            || (implied_velocity <= 0.0 && input.actual_velocity <= 0.5 * implied_velocity);
        if moving {
            self.reasonable_move_counter += 1;
        }

        if self.cycle_counter > win.window {
            if self.increase_counter > win.increase_threshold
                && self.reasonable_move_counter < win.reasonable_move_threshold
            {
                self.tripped = true;
            }
            self.cycle_counter = 0;
            self.increase_counter = 0;
            self.reasonable_move_counter = 0;
        }
        self.tripped
    }

    pub fn reset(&mut self) {
        *self = Self {
            output_old: self.output_old,
            ..Self::default()
        };
    }
}
