//! Named group of axes commanded together.
//!
//! Status queries aggregate over every member; commands fan out to every
//! member. An empty group reports "all" queries as true and "any" queries
//! as false.

use tracing::{debug, info};

use super::PvtAxis;

pub struct AxisGroup {
    name: String,
    axes: Vec<Box<dyn PvtAxis>>,
}

impl AxisGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            axes: Vec::new(),
        }
    }

    pub fn add_axis(&mut self, axis: Box<dyn PvtAxis>) {
        debug!(group = %self.name, axis = %axis.name(), "Axis added to group");
        self.axes.push(axis);
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn contains(&self, axis: &str) -> bool {
        self.axes.iter().any(|a| a.name() == axis)
    }

    /// Every member drive enabled.
    pub fn enabled(&self) -> bool {
        self.axes.iter().all(|a| a.enabled())
    }

    /// Every member drive disabled.
    pub fn disabled(&self) -> bool {
        self.axes.iter().all(|a| !a.enabled())
    }

    pub fn any_enabled(&self) -> bool {
        self.axes.iter().any(|a| a.enabled())
    }

    /// Every member busy.
    pub fn busy(&self) -> bool {
        self.axes.iter().all(|a| a.busy())
    }

    /// No member busy.
    pub fn free(&self) -> bool {
        !self.any_busy()
    }

    pub fn any_busy(&self) -> bool {
        self.axes.iter().any(|a| a.busy())
    }

    /// First non-zero member error code, in insertion order (0 = none).
    pub fn any_error_code(&self) -> u32 {
        self.axes
            .iter()
            .map(|a| a.error_code())
            .find(|&code| code != 0)
            .unwrap_or(0)
    }

    pub fn set_enable(&self, enable: bool) {
        info!(group = %self.name, enable, axes = self.axes.len(), "Group enable");
        for axis in &self.axes {
            axis.set_enable(enable);
        }
    }

    pub fn error_reset(&self) {
        debug!(group = %self.name, "Group error reset");
        for axis in &self.axes {
            axis.error_reset();
        }
    }

    pub fn stop(&self) {
        info!(group = %self.name, "Group stop");
        for axis in &self.axes {
            axis.stop();
        }
    }
}

impl std::fmt::Debug for AxisGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisGroup")
            .field("name", &self.name)
            .field("axes", &self.axes.iter().map(|a| a.name()).collect::<Vec<_>>())
            .finish()
    }
}
