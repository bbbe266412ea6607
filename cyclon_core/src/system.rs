//! Assembly of a runnable system from [`CyclonConfig`].
//!
//! Declares every entry, builds the process data, binds axes, timed events
//! and the PVT controller to their tasks, collects axis groups, checks the cross-task write
//! partition on the objects' process images and resolves published
//! parameters. The returned scheduler is not started, so callers can still
//! add their own logic programs and plugins; `start` checks again.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::info;

use crate::config::{CyclonConfig, validate_config};
use crate::error::SetupError;
use crate::exec::{Axis, AxisLink, ExecutionObject, PvtControlHandle, PvtControllerObject, TimedEvent};
use crate::image::{ProcessData, ProcessDataBuilder};
use crate::publish::ParamRegistry;
use crate::pvt::{AxisGroup, PvtAxis, PvtPoint, PvtSequence};
use crate::scheduler::Scheduler;

pub struct System {
    pub scheduler: Scheduler,
    pub data: ProcessData,
    /// Axis handles in configuration order.
    pub axes: Vec<AxisLink>,
    /// Configured axis groups, in configuration order.
    pub groups: Vec<AxisGroup>,
    pub pvt: Option<PvtControlHandle>,
    /// Arm flags of the timed events, by name.
    pub events: Vec<(String, Arc<AtomicBool>)>,
    pub params: ParamRegistry,
}

impl System {
    pub fn build(config: &CyclonConfig) -> Result<Self, SetupError> {
        Self::build_with(config, |_| Ok(()))
    }

    /// Like [`Self::build`], with a hook to declare extra entries used by
    /// user programs.
    pub fn build_with<D>(config: &CyclonConfig, declare: D) -> Result<Self, SetupError>
    where
        D: FnOnce(&mut ProcessDataBuilder) -> Result<(), SetupError>,
    {
        validate_config(config)?;

        let mut builder = ProcessDataBuilder::new();
        for axis in &config.axes {
            Axis::declare(axis, &mut builder);
        }
        for event in &config.events {
            TimedEvent::declare(event, &mut builder);
        }
        if let Some(pvt) = &config.pvt {
            PvtControllerObject::declare(pvt, &mut builder);
        }
        declare(&mut builder)?;
        let data = builder.build();

        let mut scheduler = Scheduler::new(config.scheduler.clone())?;
        let mut axes = Vec::with_capacity(config.axes.len());
        for axis_cfg in &config.axes {
            let sample_time = task_sample_time(config, axis_cfg.task_index, &axis_cfg.name)?;
            let mut axis = Axis::new(axis_cfg.clone(), data.clone(), sample_time)?;
            let points = config
                .pvt
                .iter()
                .flat_map(|p| p.axes.iter())
                .find(|p| p.axis == axis_cfg.name);
            if let Some(pvt_axis) = points {
                let seq = PvtSequence::from_points(
                    sample_time,
                    pvt_axis
                        .points
                        .iter()
                        .map(|p| PvtPoint::new(p.position, p.velocity, p.time)),
                )?;
                axis.load_pvt(seq)?;
            }
            axes.push(axis.link());
            scheduler.add_object(ExecutionObject::axis(axis_cfg.task_index, axis))?;
        }

        let mut events = Vec::with_capacity(config.events.len());
        for event_cfg in &config.events {
            let event = TimedEvent::new(event_cfg, data.clone())?;
            events.push((event_cfg.name.clone(), event.arm_handle()));
            scheduler.add_object(ExecutionObject::timed_event(event_cfg.task_index, event))?;
        }

        let mut groups = Vec::with_capacity(config.groups.len());
        for group_cfg in &config.groups {
            let mut group = AxisGroup::new(group_cfg.name.as_str());
            for name in &group_cfg.axes {
                let link = axes
                    .iter()
                    .find(|l| l.name() == name.as_str())
                    .ok_or_else(|| SetupError::UnknownAxis(name.clone()))?;
                group.add_axis(Box::new(link.clone()));
            }
            groups.push(group);
        }

        let pvt = match &config.pvt {
            Some(pvt_cfg) => {
                let sample_time = task_sample_time(config, pvt_cfg.task_index, "pvt")?;
                let ctrl = PvtControllerObject::from_config(pvt_cfg, sample_time, data.clone(), &axes)?;
                let handle = ctrl.handle();
                scheduler.add_object(ExecutionObject::pvt_controller(pvt_cfg.task_index, ctrl))?;
                Some(handle)
            }
            None => None,
        };

        scheduler.build_process_images()?;

        let params = ParamRegistry::from_config(&config.publish, data.clone())?;
        info!(
            entries = data.len(),
            axes = axes.len(),
            groups = groups.len(),
            events = events.len(),
            params = params.len(),
            "System assembled"
        );
        Ok(Self {
            scheduler,
            data,
            axes,
            groups,
            pvt,
            events,
            params,
        })
    }

    pub fn axis(&self, name: &str) -> Option<&AxisLink> {
        self.axes.iter().find(|a| a.name() == name)
    }

    pub fn group(&self, name: &str) -> Option<&AxisGroup> {
        self.groups.iter().find(|g| g.name() == name)
    }
}

fn task_sample_time(config: &CyclonConfig, task: usize, object: &str) -> Result<f64, SetupError> {
    config
        .sample_time(task)
        .ok_or_else(|| SetupError::UnknownTask {
            object: object.to_string(),
            task,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    const CONFIG: &str = r#"
[[scheduler.tasks]]
index = 1
sample_time_us = 2000

[[axis]]
name = "ax1"
task_index = 1

[[group]]
name = "all"
axes = ["ax1"]

[[event]]
name = "blink"
interval = 5
output = "io.blink"

[pvt]
task_index = 1
[[pvt.axes]]
axis = "ax1"
points = [
    { position = 0.0, velocity = 0.0, time = 0.0 },
    { position = 1.0, velocity = 0.0, time = 1.0 },
]

[publish]
[[publish.params]]
name = "ax1.pos"
entry = "ax1.act_pos"
type = "float"
"#;

    #[test]
    fn builds_everything_from_config() {
        let config = load_config_from_str(CONFIG).unwrap();
        let system = System::build(&config).unwrap();
        assert_eq!(system.axes.len(), 1);
        assert!(system.axes[0].pvt_valid());
        assert_eq!(system.axes[0].pvt_duration(), Some(1.0));
        assert!(system.pvt.is_some());
        assert_eq!(system.events[0].0, "blink");
        assert_eq!(system.params.len(), 1);
        assert!(system.data.lookup("io.blink").is_some());
        assert!(system.axis("ax1").is_some());
        assert!(system.data.lookup("pvtctrl.point_id").is_some());

        let group = system.group("all").unwrap();
        assert!(group.contains("ax1"));
        assert!(group.free());
        group.set_enable(true);
        assert!(system.group("none").is_none());
    }

    #[test]
    fn output_shared_across_tasks_rejected() {
        let config = load_config_from_str(
            r#"
[[scheduler.tasks]]
index = 1
sample_time_us = 5000

[[axis]]
name = "ax1"

[[event]]
name = "blink"
task_index = 1
interval = 10
output = "ax1.drv_enable"
"#,
        )
        .unwrap();
        match System::build(&config) {
            Err(SetupError::WriteOverlap {
                task_a,
                task_b,
                items,
            }) => {
                assert_eq!((task_a, task_b), (0, 1));
                assert_eq!(items, ["ax1.drv_enable"]);
            }
            Err(other) => panic!("expected write overlap, got {other:?}"),
            Ok(_) => panic!("expected write overlap"),
        }
    }

    #[test]
    fn same_task_writes_are_allowed() {
        let config = load_config_from_str(
            r#"
[[axis]]
name = "ax1"

[[event]]
name = "blink"
interval = 10
output = "ax1.drv_enable"
"#,
        )
        .unwrap();
        let system = System::build(&config).unwrap();
        assert_eq!(system.scheduler.master_objects().len(), 2);
    }

    #[test]
    fn extra_entries_declared_by_hook() {
        let config = load_config_from_str(CONFIG).unwrap();
        let system = System::build_with(&config, |b| {
            b.entry("user.flag", crate::image::EntrySource::Logic)?;
            Ok(())
        })
        .unwrap();
        assert!(system.data.lookup("user.flag").is_some());
    }
}
