//! Engine-wide configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EwResult};

/// Numeric thresholds shared by every effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Range difference (m) under which target and jammer are "equal" range.
    pub range: f64,
    /// Static gains closer than this to 1.0 are not applied.
    pub gain: f64,
    /// Table-driven J/S gains closer than this to 1.0 are not applied.
    pub table_gain: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            range: 1.0e-3,
            gain: 1.0e-5,
            table_gain: 1.0e-3,
        }
    }
}

/// Configuration for an [`EffectComposer`](crate::EffectComposer).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed of the simulation-wide random generator.
    pub seed: u64,
    /// Emit per-effect debug diagnostics regardless of effect flags.
    pub force_debug: bool,
    /// Numeric thresholds.
    pub tolerances: Tolerances,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            force_debug: false,
            tolerances: Tolerances::default(),
        }
    }
}

impl EngineConfig {
    /// Validate thresholds.
    ///
    /// Called by the composer before initializing any context.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tolerances;
        for (field, value) in [
            ("tolerances.range", t.range),
            ("tolerances.gain", t.gain),
            ("tolerances.table_gain", t.table_gain),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid_value(field, "must be finite and > 0"));
            }
        }
        Ok(())
    }

    /// Parses and validates a JSON document.
    pub fn from_json(text: &str) -> EwResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}
