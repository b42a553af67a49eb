//! Gain layers shared by the leaf effects.
//!
//! A leaf effect owns a [`LayerStack`] holding whichever of the radius,
//! repeater, power and pulse layers it needs. Layers update in that order
//! (each may read the one below it) and all enabled layers contribute to
//! every application.

mod power;
mod pulse;
mod radius;
mod repeater;

pub use power::{PowerData, PowerLayer};
pub use pulse::{PulseData, PulseLayer};
pub use radius::{RadiusData, RadiusLayer, RangeClass};
pub use repeater::{ControlMethod, RepeaterData, RepeaterLayer};

use serde::{Deserialize, Serialize};

use crate::effect::{EffectCore, EffectDataMap, EffectEnv, EffectView};
use crate::error::ConfigError;
use crate::ids::SystemTypeId;
use crate::result::InteractionResult;

/// Per-type configuration of every layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerData {
    pub radius: RadiusData,
    pub repeater: RepeaterData,
    pub power: PowerData,
    pub pulse: PulseData,
}

impl LayerData {
    fn validate(&self, effect: &str) -> Result<(), ConfigError> {
        self.repeater.validate(effect)?;
        self.power.validate(effect)?;
        self.pulse.validate(effect)
    }
}

/// Inputs to a layer update.
pub struct LayerUpdate<'a> {
    pub core: &'a EffectCore,
    pub env: &'a EffectEnv<'a>,
    pub result: &'a InteractionResult,
    /// Snapshot of the effect being updated.
    pub view: &'a EffectView,
}

/// Inputs to a layer application.
pub struct LayerApply<'a> {
    pub core: &'a EffectCore,
    pub data: &'a LayerData,
}

/// One multiplicative contribution to an interaction result.
pub trait GainLayer {
    /// Applies the layer for an attacking effect.
    fn apply_unmitigated(&self, scope: &LayerApply<'_>, result: &mut InteractionResult);

    /// Applies the layer for a mitigating effect.
    fn apply_mitigated(&self, scope: &LayerApply<'_>, result: &mut InteractionResult) {
        self.apply_unmitigated(scope, result);
    }
}

/// The enabled layers of one effect plus their per-type data.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    data: EffectDataMap<LayerData>,
    radius: Option<RadiusLayer>,
    repeater: Option<RepeaterLayer>,
    power: Option<PowerLayer>,
    pulse: Option<PulseLayer>,
}

impl LayerStack {
    /// No layers.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Radius only.
    #[must_use]
    pub fn radius() -> Self {
        Self {
            radius: Some(RadiusLayer::default()),
            ..Self::default()
        }
    }

    /// Radius and repeater.
    #[must_use]
    pub fn repeater() -> Self {
        Self {
            repeater: Some(RepeaterLayer::default()),
            ..Self::radius()
        }
    }

    /// Radius, repeater and power.
    #[must_use]
    pub fn power() -> Self {
        Self {
            power: Some(PowerLayer::default()),
            ..Self::repeater()
        }
    }

    /// Every layer.
    #[must_use]
    pub fn pulse() -> Self {
        Self {
            pulse: Some(PulseLayer::default()),
            ..Self::power()
        }
    }

    /// Per-type layer data.
    #[must_use]
    pub fn data(&self) -> &EffectDataMap<LayerData> {
        &self.data
    }

    /// Mutable per-type layer data.
    pub fn data_mut(&mut self) -> &mut EffectDataMap<LayerData> {
        &mut self.data
    }

    /// Layer data for `key`.
    #[must_use]
    pub fn data_for(&self, key: Option<&SystemTypeId>) -> &LayerData {
        self.data.get(key)
    }

    /// The radius layer, if enabled.
    #[must_use]
    pub fn radius_layer(&self) -> Option<&RadiusLayer> {
        self.radius.as_ref()
    }

    /// The repeater layer, if enabled.
    #[must_use]
    pub fn repeater_layer(&self) -> Option<&RepeaterLayer> {
        self.repeater.as_ref()
    }

    /// The power layer, if enabled.
    #[must_use]
    pub fn power_layer(&self) -> Option<&PowerLayer> {
        self.power.as_ref()
    }

    /// The pulse layer, if enabled.
    #[must_use]
    pub fn pulse_layer(&self) -> Option<&PulseLayer> {
        self.pulse.as_ref()
    }

    /// Current repeater factor; 1.0 without a repeater layer.
    #[must_use]
    pub fn repeater_factor(&self) -> f64 {
        self.repeater.as_ref().map_or(1.0, RepeaterLayer::factor)
    }

    /// Current jamming pulse density, if the pulse layer is enabled.
    #[must_use]
    pub fn jamming_pulse_density(&self) -> Option<f64> {
        self.pulse.as_ref().map(PulseLayer::current_density)
    }

    /// Queues a density factor for the next pulse update. Returns false
    /// without a pulse layer.
    pub fn set_density_factor(&mut self, factor: f64) -> bool {
        match self.pulse.as_mut() {
            Some(pulse) => {
                pulse.set_density_factor(factor);
                true
            }
            None => false,
        }
    }

    /// Re-derives the pulse density for `key` after its base changed.
    pub fn refresh_pulse_density(&mut self, key: Option<&SystemTypeId>) {
        if let Some(pulse) = self.pulse.as_mut() {
            pulse.refresh(&self.data.get(key).pulse);
        }
    }

    pub(crate) fn initialize(&mut self, effect: &str) -> Result<(), ConfigError> {
        for (_, data) in self.data.entries() {
            data.validate(effect)?;
        }
        if let Some(pulse) = self.pulse.as_mut() {
            pulse.reset(&self.data.wildcard().pulse);
        }
        Ok(())
    }

    pub(crate) fn update(&mut self, scope: &LayerUpdate<'_>) {
        let data = self.data.get(scope.core.effected_key());
        if let Some(radius) = self.radius.as_mut() {
            radius.update(scope);
        }
        if let Some(repeater) = self.repeater.as_mut() {
            repeater.update(scope, &data.repeater);
        }
        let repeater_factor = self.repeater.as_ref().map_or(1.0, RepeaterLayer::factor);
        if let Some(power) = self.power.as_mut() {
            power.update(scope, &data.power, repeater_factor);
        }
        if let Some(pulse) = self.pulse.as_mut() {
            pulse.update(&data.pulse);
        }
    }

    fn enabled(&self) -> impl Iterator<Item = &dyn GainLayer> {
        [
            self.pulse.as_ref().map(|l| l as &dyn GainLayer),
            self.power.as_ref().map(|l| l as &dyn GainLayer),
            self.repeater.as_ref().map(|l| l as &dyn GainLayer),
            self.radius.as_ref().map(|l| l as &dyn GainLayer),
        ]
        .into_iter()
        .flatten()
    }

    pub(crate) fn apply_unmitigated(&self, core: &EffectCore, result: &mut InteractionResult) {
        let scope = LayerApply {
            core,
            data: self.data.get(core.effected_key()),
        };
        for layer in self.enabled() {
            layer.apply_unmitigated(&scope, result);
        }
    }

    pub(crate) fn apply_mitigated(&self, core: &EffectCore, result: &mut InteractionResult) {
        let scope = LayerApply {
            core,
            data: self.data.get(core.effected_key()),
        };
        for layer in self.enabled() {
            layer.apply_mitigated(&scope, result);
        }
    }
}
