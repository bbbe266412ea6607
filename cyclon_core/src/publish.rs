//! Published parameters.
//!
//! A parameter mirrors one process data entry towards the supervisory
//! system. Pushes are rate limited per parameter: a counter runs every
//! refresh and the value is pushed when it reaches `sample_cycles - 1`.
//! Negative sample cycles disable periodic pushes; only forced refreshes
//! go out.

use std::collections::HashMap;

use cyclon_common::publish::{ParamType, PublishConfig, PublishParamConfig};
use thiserror::Error;
use tracing::{debug, warn};

use crate::image::{EntryId, ProcessData};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PublishError {
    #[error("unknown parameter '{0}'")]
    UnknownParam(String),
    #[error("parameter '{0}' is read-only")]
    ReadOnly(String),
    #[error("parameter '{name}' expects {expected:?}")]
    TypeMismatch { name: String, expected: ParamType },
    #[error("value {value} out of range [{min}, {max}] for '{name}'")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("parameter '{param}' refers to unknown entry '{entry}'")]
    UnknownEntry { param: String, entry: String },
}

impl PublishError {
    pub fn code(&self) -> u32 {
        match self {
            Self::UnknownParam(_) => 0x21000,
            Self::ReadOnly(_) => 0x21001,
            Self::TypeMismatch { .. } => 0x21002,
            Self::OutOfRange { .. } => 0x21003,
            Self::UnknownEntry { .. } => 0x21004,
        }
    }
}

/// Typed parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Bool(_) => ParamType::Bool,
            Self::Int(_) => ParamType::Int,
            Self::Float(_) => ParamType::Float,
        }
    }

    fn as_f64(&self) -> f64 {
        match *self {
            Self::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

/// Receiver of refreshed values.
pub trait ParamSink {
    fn push(&mut self, name: &str, value: ParamValue);
}

impl<F: FnMut(&str, ParamValue)> ParamSink for F {
    fn push(&mut self, name: &str, value: ParamValue) {
        self(name, value)
    }
}

#[derive(Debug, Clone)]
pub struct PublishedParam {
    name: String,
    entry: EntryId,
    param_type: ParamType,
    sample_cycles: i32,
    counter: i32,
    writable: bool,
    min: Option<f64>,
    max: Option<f64>,
}

impl PublishedParam {
    pub fn new(name: &str, entry: EntryId, param_type: ParamType, sample_cycles: i32) -> Self {
        Self {
            name: name.to_string(),
            entry,
            param_type,
            sample_cycles,
            counter: 0,
            writable: false,
            min: None,
            max: None,
        }
    }

    pub fn writable(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.writable = true;
        self.min = min;
        self.max = max;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    #[inline]
    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    /// Current value read from process data.
    pub fn value(&self, data: &ProcessData) -> ParamValue {
        let raw = data.read_f64(self.entry);
        match self.param_type {
            ParamType::Bool => ParamValue::Bool(raw != 0.0),
            ParamType::Int => ParamValue::Int(raw as i64),
            ParamType::Float => ParamValue::Float(raw),
        }
    }

    /// Push the value if due or forced. Returns whether a push happened.
    pub fn refresh(&mut self, data: &ProcessData, force: bool, sink: &mut dyn ParamSink) -> bool {
        let due = if self.sample_cycles < 0 {
            false
        } else if self.counter >= self.sample_cycles - 1 {
            self.counter = 0;
            true
        } else {
            self.counter += 1;
            false
        };
        if due || force {
            sink.push(&self.name, self.value(data));
            return true;
        }
        false
    }

    /// Validate and store a value coming from the supervisory side.
    pub fn write(&self, data: &ProcessData, value: ParamValue) -> Result<(), PublishError> {
        if !self.writable {
            return Err(PublishError::ReadOnly(self.name.clone()));
        }
        let compatible = match (self.param_type, value) {
            (ParamType::Float, ParamValue::Int(_)) => true,
            (expected, v) => expected == v.param_type(),
        };
        if !compatible {
            return Err(PublishError::TypeMismatch {
                name: self.name.clone(),
                expected: self.param_type,
            });
        }
        let v = value.as_f64();
        let min = self.min.unwrap_or(f64::NEG_INFINITY);
        let max = self.max.unwrap_or(f64::INFINITY);
        if !(min..=max).contains(&v) {
            return Err(PublishError::OutOfRange {
                name: self.name.clone(),
                value: v,
                min,
                max,
            });
        }
        data.write_f64(self.entry, v);
        Ok(())
    }
}

/// Name-indexed set of published parameters.
#[derive(Debug)]
pub struct ParamRegistry {
    data: ProcessData,
    params: Vec<PublishedParam>,
    index: HashMap<String, usize>,
}

impl ParamRegistry {
    pub fn new(data: ProcessData) -> Self {
        Self {
            data,
            params: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Resolve every configured parameter against `data`.
    pub fn from_config(config: &PublishConfig, data: ProcessData) -> Result<Self, PublishError> {
        let mut registry = Self::new(data);
        for p in &config.params {
            let param = registry.resolve(config, p)?;
            registry.add(param);
        }
        debug!(count = registry.len(), "Published parameters registered");
        Ok(registry)
    }

    fn resolve(
        &self,
        config: &PublishConfig,
        p: &PublishParamConfig,
    ) -> Result<PublishedParam, PublishError> {
        let entry = self
            .data
            .lookup(&p.entry)
            .ok_or_else(|| PublishError::UnknownEntry {
                param: p.name.clone(),
                entry: p.entry.clone(),
            })?;
        let param = PublishedParam::new(&p.name, entry, p.param_type, config.sample_cycles(p));
        Ok(if p.writable {
            param.writable(p.min, p.max)
        } else {
            param
        })
    }

    /// Add or replace a parameter.
    pub fn add(&mut self, param: PublishedParam) {
        match self.index.get(param.name()) {
            Some(&i) => self.params[i] = param,
            None => {
                self.index.insert(param.name().to_string(), self.params.len());
                self.params.push(param);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PublishedParam> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    /// Refresh every parameter; returns the number of pushes.
    pub fn refresh_all(&mut self, force: bool, sink: &mut dyn ParamSink) -> usize {
        let mut pushed = 0;
        for p in &mut self.params {
            if p.refresh(&self.data, force, sink) {
                pushed += 1;
            }
        }
        pushed
    }

    pub fn write(&self, name: &str, value: ParamValue) -> Result<(), PublishError> {
        let param = self
            .get(name)
            .ok_or_else(|| PublishError::UnknownParam(name.to_string()))?;
        param.write(&self.data, value).inspect_err(|e| {
            warn!(param = name, error = %e, "Parameter write rejected");
        })
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
