//! Unified configuration (`cyclon.toml`) with cross-object validation.
//!
//! Each section validates itself; this module adds the checks that need
//! the whole picture: unique axis names, task references and PVT axis
//! references. The write partition between tasks is checked on the built
//! objects, see [`crate::system::System::build`].

use std::collections::HashSet;
use std::path::Path;

use cyclon_common::config::{ConfigError, ConfigLoader, SharedConfig};
use cyclon_common::consts::{CONFIG_FILE_NAME, MASTER_TASK_INDEX};
use cyclon_common::motion::config::{AxisConfig, AxisGroupConfig, PvtConfig};
use cyclon_common::publish::PublishConfig;
use cyclon_common::task::{SchedulerConfig, TimedEventConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SetupError;
use crate::sim::SimConfig;

/// Everything the runner needs, as found in `cyclon.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CyclonConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default, rename = "axis")]
    pub axes: Vec<AxisConfig>,
    #[serde(default, rename = "event")]
    pub events: Vec<TimedEventConfig>,
    #[serde(default, rename = "group")]
    pub groups: Vec<AxisGroupConfig>,
    #[serde(default)]
    pub pvt: Option<PvtConfig>,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

impl CyclonConfig {
    pub fn axis(&self, name: &str) -> Option<&AxisConfig> {
        self.axes.iter().find(|a| a.name == name)
    }

    /// Sample time [s] of the task at `index`.
    pub fn sample_time(&self, index: usize) -> Option<f64> {
        self.scheduler
            .sample_time_us(index)
            .map(|us| f64::from(us) * 1e-6)
    }

    /// Effective configuration with every default filled in.
    pub fn to_toml(&self) -> Result<String, SetupError> {
        toml::to_string_pretty(self)
            .map_err(|e| SetupError::Config(ConfigError::ParseError(e.to_string())))
    }
}

/// Load `cyclon.toml` from `dir` and validate it.
pub fn load_config_dir(dir: &Path) -> Result<CyclonConfig, SetupError> {
    let path = dir.join(CONFIG_FILE_NAME);
    let config = CyclonConfig::load(&path)?;
    validate_config(&config)?;
    info!(
        path = %path.display(),
        tasks = config.scheduler.tasks.len(),
        axes = config.axes.len(),
        events = config.events.len(),
        pvt = config.pvt.is_some(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Parse and validate an in-memory configuration.
pub fn load_config_from_str(content: &str) -> Result<CyclonConfig, SetupError> {
    let config = CyclonConfig::from_toml(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(reason: String) -> SetupError {
    SetupError::Config(ConfigError::ValidationError(reason))
}

/// Run every section's own checks, then the cross-object ones.
pub fn validate_config(config: &CyclonConfig) -> Result<(), SetupError> {
    config.shared.validate()?;
    config.scheduler.validate().map_err(invalid)?;
    let task_exists = |index: usize| {
        index == MASTER_TASK_INDEX || config.scheduler.task(index).is_some()
    };

    let mut names = HashSet::new();
    for axis in &config.axes {
        axis.validate().map_err(invalid)?;
        if !names.insert(axis.name.as_str()) {
            return Err(invalid(format!("duplicate axis name '{}'", axis.name)));
        }
        if !task_exists(axis.task_index) {
            return Err(SetupError::UnknownTask {
                object: axis.name.clone(),
                task: axis.task_index,
            });
        }
    }

    for event in &config.events {
        event.validate().map_err(invalid)?;
        if !task_exists(event.task_index) {
            return Err(SetupError::UnknownTask {
                object: event.name.clone(),
                task: event.task_index,
            });
        }
    }

    let mut group_names = HashSet::new();
    for group in &config.groups {
        group.validate().map_err(invalid)?;
        if !group_names.insert(group.name.as_str()) {
            return Err(invalid(format!("duplicate group name '{}'", group.name)));
        }
        if let Some(missing) = group.axes.iter().find(|a| config.axis(a).is_none()) {
            return Err(SetupError::UnknownAxis(missing.clone()));
        }
    }

    if let Some(pvt) = &config.pvt {
        pvt.validate().map_err(invalid)?;
        if !task_exists(pvt.task_index) {
            return Err(SetupError::UnknownTask {
                object: "pvt".to_string(),
                task: pvt.task_index,
            });
        }
        for axis in &pvt.axes {
            if config.axis(&axis.axis).is_none() {
                return Err(SetupError::UnknownAxis(axis.axis.clone()));
            }
        }
    }

    config.publish.validate().map_err(invalid)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
[scheduler]
master_cycle_us = 1000

[[scheduler.tasks]]
index = 1
sample_time_us = 2000

[[axis]]
name = "ax1"
task_index = 1

[[axis]]
name = "ax2"
"#
    }

    #[test]
    fn load_valid_config() {
        let cfg = load_config_from_str(minimal_toml()).unwrap();
        assert_eq!(cfg.axes.len(), 2);
        assert_eq!(cfg.sample_time(1), Some(0.002));
        assert_eq!(cfg.sample_time(0), Some(0.001));
        assert!(cfg.pvt.is_none());
    }

    #[test]
    fn reject_duplicate_axis_name() {
        let toml = r#"
[[axis]]
name = "ax1"

[[axis]]
name = "ax1"
"#;
        let msg = load_config_from_str(toml).unwrap_err().to_string();
        assert!(msg.contains("duplicate axis name"), "got: {msg}");
    }

    #[test]
    fn reject_unknown_task() {
        let toml = r#"
[[axis]]
name = "ax1"
task_index = 4
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(SetupError::UnknownTask { task: 4, .. })
        ));
    }

    #[test]
    fn reject_pvt_on_unknown_axis() {
        let toml = r#"
[pvt]
[[pvt.axes]]
axis = "nope"
points = [
    { position = 0.0, velocity = 0.0, time = 0.0 },
    { position = 1.0, velocity = 0.0, time = 1.0 },
]
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(SetupError::UnknownAxis(_))
        ));
    }

    #[test]
    fn groups_reference_known_axes() {
        let ok = format!("{}\n[[group]]\nname = \"all\"\naxes = [\"ax1\", \"ax2\"]\n", minimal_toml());
        let cfg = load_config_from_str(&ok).unwrap();
        assert_eq!(cfg.groups.len(), 1);
        assert_eq!(cfg.groups[0].axes, ["ax1", "ax2"]);

        let unknown = format!("{}\n[[group]]\nname = \"all\"\naxes = [\"ax9\"]\n", minimal_toml());
        assert!(matches!(
            load_config_from_str(&unknown),
            Err(SetupError::UnknownAxis(name)) if name == "ax9"
        ));

        let dup = format!(
            "{}\n[[group]]\nname = \"g\"\naxes = [\"ax1\"]\n\n[[group]]\nname = \"g\"\naxes = [\"ax2\"]\n",
            minimal_toml()
        );
        let msg = load_config_from_str(&dup).unwrap_err().to_string();
        assert!(msg.contains("duplicate group name"), "got: {msg}");
    }

    #[test]
    fn effective_config_reloads() {
        let cfg = load_config_from_str(minimal_toml()).unwrap();
        let text = cfg.to_toml().unwrap();
        assert!(text.contains("positioning_velocity"));
        let again = load_config_from_str(&text).unwrap();
        assert_eq!(again.axes, cfg.axes);
        assert_eq!(again.scheduler, cfg.scheduler);
        assert_eq!(again.sim, cfg.sim);
    }

    #[test]
    fn parse_error_maps_to_config_error() {
        let err = load_config_from_str("[[axis]\n").unwrap_err();
        assert!(matches!(err, SetupError::Config(ConfigError::ParseError(_))));
        assert_ne!(err.code(), 0);
    }
}
