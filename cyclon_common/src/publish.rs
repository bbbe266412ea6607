//! Published parameter configuration.
//!
//! Parameters expose process data entries to the supervisory system. Each is
//! refreshed at most once every `sample_cycles` cycles; a negative value
//! means the parameter is only pushed on a forced refresh.

use serde::{Deserialize, Serialize};

use crate::consts::PUBLISH_SAMPLE_CYCLES_DEFAULT;

/// Value type of a published parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Bool,
    Int,
    Float,
}

/// One published parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishParamConfig {
    /// Name seen by the supervisory system.
    pub name: String,
    /// Process data entry backing the parameter.
    pub entry: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Overrides `PublishConfig::default_sample_cycles`.
    #[serde(default)]
    pub sample_cycles: Option<i32>,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Publishing layer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    #[serde(default = "default_sample_cycles")]
    pub default_sample_cycles: i32,
    #[serde(default)]
    pub params: Vec<PublishParamConfig>,
}

fn default_sample_cycles() -> i32 {
    PUBLISH_SAMPLE_CYCLES_DEFAULT
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            default_sample_cycles: PUBLISH_SAMPLE_CYCLES_DEFAULT,
            params: Vec::new(),
        }
    }
}

impl PublishConfig {
    /// Effective sample cycles of `param`.
    pub fn sample_cycles(&self, param: &PublishParamConfig) -> i32 {
        param.sample_cycles.unwrap_or(self.default_sample_cycles)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (i, p) in self.params.iter().enumerate() {
            if p.name.is_empty() || p.entry.is_empty() {
                return Err(format!("param #{i}: name and entry are required"));
            }
            if self.params[..i].iter().any(|q| q.name == p.name) {
                return Err(format!("duplicate published param '{}'", p.name));
            }
            if let (Some(min), Some(max)) = (p.min, p.max)
                && min > max
            {
                return Err(format!("param '{}': min {min} > max {max}", p.name));
            }
        }
        Ok(())
    }
}
