//! Engine configuration
//!
//! Tuning knobs for the reference runtime, with presets for debugging and
//! for hosts that evaluate untrusted input.

use serde::{Deserialize, Serialize};

/// Configuration for one engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name reported in logs
    pub name: String,

    /// Maximum nesting of evaluations and native applications per thread
    pub max_eval_depth: usize,

    /// Series slots reserved when the heap is created
    pub series_capacity: usize,

    /// Log every native application at trace level
    pub trace_applies: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "ren".to_string(),
            max_eval_depth: 256,
            series_capacity: 1024,
            trace_applies: false,
        }
    }
}

impl EngineConfig {
    /// Create a debug configuration that traces every application
    pub fn debug() -> Self {
        Self {
            name: "ren-debug".to_string(),
            trace_applies: true,
            max_eval_depth: 64, // Fail fast on runaway recursion
            ..Default::default()
        }
    }

    /// Create a configuration for evaluating untrusted input
    pub fn sandboxed() -> Self {
        Self {
            name: "ren-sandbox".to_string(),
            max_eval_depth: 32,
            series_capacity: 256,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Engine name must not be empty".to_string());
        }

        if self.max_eval_depth == 0 {
            return Err("Max eval depth must be > 0".to_string());
        }

        if self.series_capacity == 0 {
            return Err("Series capacity must be > 0".to_string());
        }

        Ok(())
    }
}

/// Builder with environment overrides
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the defaults, then apply `REN_ENGINE_NAME`,
    /// `REN_MAX_EVAL_DEPTH` and `REN_TRACE_APPLIES` when they parse.
    pub fn from_env() -> Self {
        let mut builder = Self::new();

        if let Ok(val) = std::env::var("REN_ENGINE_NAME") {
            if !val.is_empty() {
                builder.config.name = val;
            }
        }

        if let Ok(val) = std::env::var("REN_MAX_EVAL_DEPTH") {
            if let Ok(depth) = val.parse::<usize>() {
                builder.config.max_eval_depth = depth;
            }
        }

        if let Ok(val) = std::env::var("REN_TRACE_APPLIES") {
            builder.config.trace_applies = val == "1" || val.to_lowercase() == "true";
        }

        builder
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn max_eval_depth(mut self, depth: usize) -> Self {
        self.config.max_eval_depth = depth;
        self
    }

    pub fn series_capacity(mut self, capacity: usize) -> Self {
        self.config.series_capacity = capacity;
        self
    }

    pub fn trace_applies(mut self, enabled: bool) -> Self {
        self.config.trace_applies = enabled;
        self
    }

    pub fn build(self) -> Result<EngineConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::debug().validate().is_ok());
        assert!(EngineConfig::sandboxed().validate().is_ok());
        assert!(EngineConfig::debug().trace_applies);
    }

    #[test]
    fn builder_rejects_zero_depth() {
        let err = EngineConfigBuilder::new().max_eval_depth(0).build().unwrap_err();
        assert!(err.contains("depth"));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"max_eval_depth": 8}"#).unwrap();
        assert_eq!(cfg.max_eval_depth, 8);
        assert_eq!(cfg.name, "ren");
    }
}
