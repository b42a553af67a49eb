//! Random pulse jamming.

use serde::{Deserialize, Serialize};

use crate::effect::{ApplyScope, EffectCore, EffectDataMap, EffectKind, InitScope, LayerStack};
use crate::error::{ConfigError, EwResult};
use crate::mask::{Behavior, Coherency};
use crate::result::InteractionResult;

/// RPJ parameters for one system type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpjData {
    /// Gain at the base pulse density.
    pub gain: f64,
}

impl Default for RpjData {
    fn default() -> Self {
        Self { gain: 1.0 }
    }
}

/// Pulsed noise whose gain follows the achieved pulse density.
#[derive(Debug, Clone, Default)]
pub struct RandomPulseJamming {
    data: EffectDataMap<RpjData>,
}

impl RandomPulseJamming {
    /// Unit gain for every type.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-type RPJ data.
    pub fn data_mut(&mut self) -> &mut EffectDataMap<RpjData> {
        &mut self.data
    }

    /// Gain for the current density: configured gain times current over
    /// base density.
    #[must_use]
    pub fn rpj_gain(&self, scope: &ApplyScope<'_>) -> f64 {
        let gain = self.data.get(scope.key()).gain;
        let base = scope.layers.data_for(scope.key()).pulse.base_density();
        let current = scope.layers.jamming_pulse_density().unwrap_or(base);
        if base > 0.0 {
            gain * current / base
        } else {
            gain
        }
    }
}

impl EffectKind for RandomPulseJamming {
    fn kind_name(&self) -> &'static str {
        "rpj"
    }

    fn layers(&self) -> LayerStack {
        LayerStack::pulse()
    }

    fn default_coherency(&self) -> Coherency {
        Coherency::NONCOHERENT_PULSE
    }

    fn default_behavior(&self) -> Behavior {
        Behavior::PULSE_EFFECT
    }

    fn initialize(&mut self, core: &EffectCore, _layers: &mut LayerStack, _scope: &InitScope<'_>) -> EwResult<()> {
        for (_, data) in self.data.entries() {
            if !(data.gain.is_finite() && data.gain >= 0.0) {
                return Err(ConfigError::invalid_value(format!("{}.rpj_gain", core.name()), "must be >= 0").into());
            }
        }
        Ok(())
    }

    fn apply_unmitigated(&self, scope: &ApplyScope<'_>, result: &mut InteractionResult) {
        scope.layers_unmitigated(result);
        let gain = self.rpj_gain(scope);
        if (gain - 1.0).abs() > scope.core.tolerances().gain {
            result.mask |= Behavior::PULSE_EFFECT;
            result.for_each_channel(scope.core.coherency(), |g| g.rpj_gain *= gain);
        }
    }

    fn supports_density_scaling(&self) -> bool {
        true
    }

    kind_any!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{Effect, Side};
    use crate::testing::{self, Fixture};

    fn rpj(gain: f64, density: f64) -> Effect {
        let mut kind = RandomPulseJamming::new();
        kind.data_mut().wildcard_mut().gain = gain;
        let mut effect = Effect::new("rpj", kind);
        effect
            .layers_mut()
            .data_mut()
            .wildcard_mut()
            .pulse
            .set_jamming_pulse_density(density, true);
        testing::initialize(&mut effect, Side::Attack);
        effect
    }

    #[test]
    fn gain_applies_to_pulse_channel() {
        let fixture = Fixture::new();
        let mut effect = rpj(4.0, 0.5);
        let mut result = InteractionResult::default();
        effect.process_unmitigated(&fixture.env(0.0), &mut result);
        assert!(result.has(Behavior::PULSE_EFFECT));
        assert_eq!(result.pulse.rpj_gain, 4.0);
        assert_eq!(result.noise.rpj_gain, 1.0);
    }

    #[test]
    fn scaled_density_scales_gain_for_one_pass() {
        let fixture = Fixture::new();
        let env = fixture.env(0.0);
        let mut effect = rpj(4.0, 0.5);
        assert!(effect.scale_jamming_pulse_density(0.5));

        let mut result = InteractionResult::default();
        effect.process_unmitigated(&env, &mut result);
        assert!((result.pulse.rpj_gain - 2.0).abs() < 1e-12);
        assert_eq!(effect.jamming_pulse_density(&testing::jammer()), 0.25);

        let mut result = InteractionResult::default();
        effect.process_unmitigated(&env, &mut result);
        assert!((result.pulse.rpj_gain - 4.0).abs() < 1e-12);
    }
}
