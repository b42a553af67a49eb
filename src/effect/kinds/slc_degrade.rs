//! Sidelobe-canceler degradation and polarization modulation.
//!
//! These effects do nothing to the victim by themselves. A [`SidelobeCanceler`]
//! mitigating them reads the degradation through
//! [`EffectKind::slc_degradation`] and folds it into the cancellation it
//! achieves.
//!
//! [`SidelobeCanceler`]: super::SidelobeCanceler

use serde::{Deserialize, Serialize};

use crate::effect::{ApplyScope, EffectCore, EffectDataMap, EffectKind, InitScope, LayerStack, SlcDegradation};
use crate::error::{ConfigError, EwResult};
use crate::ids::SystemTypeId;
use crate::mask::{Behavior, SystemFunction};
use crate::result::InteractionResult;

/// Degradation parameters for one system type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlcDegradeData {
    /// Multiplier on the cancellation the canceler achieves.
    pub degradation: f64,
    /// Canceler channels the effect saturates.
    pub channels_saturated: u32,
    /// Polarization switching rate (Hz); zero when not modulated.
    pub switching_rate: f64,
}

impl Default for SlcDegradeData {
    fn default() -> Self {
        Self {
            degradation: 1.0,
            channels_saturated: 1,
            switching_rate: 0.0,
        }
    }
}

/// Injects SLC degradation, optionally by polarization modulation.
#[derive(Debug, Clone, Default)]
pub struct SlcDegradeEffect {
    polarization: bool,
    data: EffectDataMap<SlcDegradeData>,
}

impl SlcDegradeEffect {
    /// Plain degradation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Degradation by polarization modulation at a switching rate.
    #[must_use]
    pub fn polarization_modulation() -> Self {
        Self {
            polarization: true,
            ..Self::default()
        }
    }

    /// True for polarization modulation.
    #[must_use]
    pub fn is_polarization_modulation(&self) -> bool {
        self.polarization
    }

    /// Per-type degradation data.
    pub fn data_mut(&mut self) -> &mut EffectDataMap<SlcDegradeData> {
        &mut self.data
    }

    fn behavior_bit(&self) -> Behavior {
        if self.polarization {
            Behavior::POL_MOD_EFFECT
        } else {
            Behavior::SLC_DEGRADE_EFFECT
        }
    }
}

impl EffectKind for SlcDegradeEffect {
    fn kind_name(&self) -> &'static str {
        if self.polarization {
            "polarization_modulation"
        } else {
            "slc_degrade"
        }
    }

    fn layers(&self) -> LayerStack {
        LayerStack::power()
    }

    fn default_behavior(&self) -> Behavior {
        self.behavior_bit()
    }

    fn attack_functions(&self) -> SystemFunction {
        SystemFunction::SENSOR
    }

    fn initialize(&mut self, core: &EffectCore, _layers: &mut LayerStack, _scope: &InitScope<'_>) -> EwResult<()> {
        for (_, data) in self.data.entries() {
            if !(data.degradation.is_finite() && data.degradation >= 0.0) {
                return Err(ConfigError::invalid_value(format!("{}.degradation", core.name()), "must be >= 0").into());
            }
            if data.channels_saturated == 0 {
                return Err(ConfigError::invalid_value(
                    format!("{}.channels_saturated", core.name()),
                    "must be at least 1",
                )
                .into());
            }
            if data.switching_rate < 0.0 {
                return Err(ConfigError::invalid_value(format!("{}.switching_rate", core.name()), "must be >= 0").into());
            }
        }
        Ok(())
    }

    fn apply_unmitigated(&self, scope: &ApplyScope<'_>, result: &mut InteractionResult) {
        scope.layers_unmitigated(result);
        result.mask |= self.behavior_bit();
    }

    fn slc_degradation(&self, key: Option<&SystemTypeId>) -> Option<SlcDegradation> {
        let data = self.data.get(key);
        Some(SlcDegradation {
            value: data.degradation,
            channels: data.channels_saturated,
            switching_rate: (self.polarization && data.switching_rate > 0.0).then_some(data.switching_rate),
        })
    }

    kind_any!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{Effect, Side};
    use crate::testing::{self, Fixture};

    #[test]
    fn polarization_reports_switching_rate() {
        let mut kind = SlcDegradeEffect::polarization_modulation();
        kind.data_mut().wildcard_mut().switching_rate = 500.0;
        kind.data_mut().wildcard_mut().channels_saturated = 2;
        let effect = Effect::new("polmod", kind);
        let degradation = effect.slc_degradation(None).unwrap();
        assert_eq!(degradation.switching_rate, Some(500.0));
        assert_eq!(degradation.channels, 2);

        let plain = Effect::new("degrade", SlcDegradeEffect::new());
        assert_eq!(plain.slc_degradation(None).unwrap().switching_rate, None);
    }

    #[test]
    fn unmitigated_sets_kind_bit() {
        let fixture = Fixture::new();
        let mut effect = Effect::new("polmod", SlcDegradeEffect::polarization_modulation());
        testing::initialize(&mut effect, Side::Attack);
        let mut result = InteractionResult::default();
        effect.process_unmitigated(&fixture.env(0.0), &mut result);
        assert!(result.has(Behavior::POL_MOD_EFFECT));
        assert!(!result.has(Behavior::SLC_DEGRADE_EFFECT));
        assert_eq!(effect.system_functions(), SystemFunction::SENSOR);
    }
}
