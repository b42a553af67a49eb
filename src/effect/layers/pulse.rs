//! Jamming pulse density tracking.

use serde::{Deserialize, Serialize};

use super::{GainLayer, LayerApply};
use crate::error::ConfigError;
use crate::result::InteractionResult;

/// Pulse parameters for one system type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseData {
    /// Jamming pulse density (duty cycle).
    pub jamming_pulse_density: f64,
    /// True if the density was set explicitly rather than derived.
    pub explicit_density: bool,
    /// Jammer pulse width (s).
    pub pulse_width: f64,
    /// Jammer pulse repetition interval (s).
    pub pulse_repetition_interval: f64,
}

impl Default for PulseData {
    fn default() -> Self {
        Self {
            jamming_pulse_density: 1.0,
            explicit_density: false,
            pulse_width: 0.0,
            pulse_repetition_interval: 0.0,
        }
    }
}

impl PulseData {
    /// Sets the density, recording whether it was explicit.
    pub fn set_jamming_pulse_density(&mut self, density: f64, explicit: bool) {
        self.jamming_pulse_density = density;
        self.explicit_density = explicit;
    }

    /// Configured density, or pulse width over PRI when only those are set.
    #[must_use]
    pub fn base_density(&self) -> f64 {
        if !self.explicit_density && self.pulse_width > 0.0 && self.pulse_repetition_interval > 0.0 {
            (self.pulse_width / self.pulse_repetition_interval).min(1.0)
        } else {
            self.jamming_pulse_density
        }
    }

    pub(super) fn validate(&self, effect: &str) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.jamming_pulse_density) {
            return Err(ConfigError::invalid_value(
                format!("{effect}.jamming_pulse_density"),
                "must be in [0, 1]",
            ));
        }
        if self.pulse_width < 0.0 || self.pulse_repetition_interval < 0.0 {
            return Err(ConfigError::invalid_value(format!("{effect}.pulse_width"), "must be >= 0"));
        }
        Ok(())
    }
}

/// Current density plus a one-shot scaling factor.
#[derive(Debug, Clone)]
pub struct PulseLayer {
    current_density: f64,
    density_factor: f64,
    applied_factor: f64,
}

impl Default for PulseLayer {
    fn default() -> Self {
        Self {
            current_density: 1.0,
            density_factor: 1.0,
            applied_factor: 1.0,
        }
    }
}

impl PulseLayer {
    /// Density from the last update.
    #[must_use]
    pub fn current_density(&self) -> f64 {
        self.current_density
    }

    /// Factor waiting for the next update.
    #[must_use]
    pub fn density_factor(&self) -> f64 {
        self.density_factor
    }

    pub(super) fn set_density_factor(&mut self, factor: f64) {
        self.density_factor = factor.clamp(0.0, 1.0);
    }

    pub(super) fn reset(&mut self, data: &PulseData) {
        self.current_density = data.base_density();
        self.density_factor = 1.0;
        self.applied_factor = 1.0;
    }

    pub(super) fn update(&mut self, data: &PulseData) {
        self.applied_factor = self.density_factor;
        self.density_factor = 1.0;
        self.refresh(data);
    }

    // Re-derives the density after the base changed mid-update, keeping
    // the factor already consumed this pass.
    pub(super) fn refresh(&mut self, data: &PulseData) {
        self.current_density = data.base_density() * self.applied_factor;
    }
}

// Density feeds other effects and the propagation layer; it carries no
// gain of its own.
impl GainLayer for PulseLayer {
    fn apply_unmitigated(&self, _scope: &LayerApply<'_>, _result: &mut InteractionResult) {}
}
