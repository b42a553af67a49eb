//! Static power gains and the J/S-driven gain table.

use serde::{Deserialize, Serialize};

use super::{GainLayer, LayerApply, LayerUpdate};
use crate::error::ConfigError;
use crate::mask::{Behavior, Channel};
use crate::result::{InteractionResult, JammingGains};
use crate::table::Curve;

/// Power gains for one system type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerData {
    pub jamming_power_gain: f64,
    pub modulation_gain: f64,
    pub signal_power_gain: f64,
    pub rcvr_noise_gain: f64,
    /// Gain as a function of J/S; used once it holds at least two points.
    pub j_to_s_table: Curve,
}

impl Default for PowerData {
    fn default() -> Self {
        Self {
            jamming_power_gain: 1.0,
            modulation_gain: 1.0,
            signal_power_gain: 1.0,
            rcvr_noise_gain: 1.0,
            j_to_s_table: Curve::default(),
        }
    }
}

impl PowerData {
    /// True if the J/S table is large enough to be used.
    #[must_use]
    pub fn has_j_to_s_table(&self) -> bool {
        self.j_to_s_table.len() >= 2
    }

    pub(super) fn validate(&self, effect: &str) -> Result<(), ConfigError> {
        for (field, value) in [
            ("jamming_power_gain", self.jamming_power_gain),
            ("modulation_gain", self.modulation_gain),
            ("signal_power_gain", self.signal_power_gain),
            ("rcvr_noise_gain", self.rcvr_noise_gain),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid_value(format!("{effect}.{field}"), "must be finite and >= 0"));
            }
        }
        if self.j_to_s_table.len() == 1 {
            return Err(ConfigError::InvalidTable {
                reason: format!("{effect}: jamming-to-signal gain table needs at least two entries"),
            });
        }
        Ok(())
    }
}

/// J/S of the last update, per channel.
#[derive(Debug, Clone, Default)]
pub struct PowerLayer {
    j_to_s: [f64; 3],
}

impl PowerLayer {
    /// J/S per channel from the last update; zero when not computed.
    #[must_use]
    pub fn j_to_s(&self, channel: Channel) -> f64 {
        self.j_to_s[index(channel)]
    }

    pub(super) fn update(&mut self, scope: &LayerUpdate<'_>, data: &PowerData, repeater_factor: f64) {
        self.j_to_s = [0.0; 3];
        let env = scope.env;
        let rcvd = env.target.received_power;
        if rcvd <= 0.0 || !data.has_j_to_s_table() {
            return;
        }
        let Some(jammer) = env.jammer() else {
            return;
        };

        let powers = env.propagation.jammer_powers(env.sim_time, jammer, env.target, Some(scope.view));
        let own = repeater_factor * data.jamming_power_gain * data.modulation_gain * data.signal_power_gain;
        let signal = powers.effects.signal.signal_power_gain;
        let coherency = scope.core.coherency();
        for (channel, power) in [
            (Channel::Noise, powers.noise),
            (Channel::Pulse, powers.pulse),
            (Channel::Coherent, powers.coherent),
        ] {
            let mut jammer_power = power;
            if coherency.selects(channel) {
                jammer_power *= signal * carried_gain(powers.effects.channel(channel)) * own;
            }
            self.j_to_s[index(channel)] = jammer_power / rcvd;
        }
    }

    fn table_gain(&self, data: &PowerData, channel: Channel) -> Option<f64> {
        let j_to_s = self.j_to_s[index(channel)];
        if j_to_s <= 0.0 {
            return None;
        }
        data.j_to_s_table.evaluate(j_to_s)
    }
}

// Gains the jammer interaction already carries, minus the ones this layer
// and the repeater are about to apply themselves.
fn carried_gain(g: &JammingGains) -> f64 {
    g.blanking * g.cancellation * g.modulation_gain * g.j_to_x_gain * g.pulse_suppression * g.radius_factor * g.rpj_gain
}

const fn index(channel: Channel) -> usize {
    match channel {
        Channel::Noise => 0,
        Channel::Pulse => 1,
        Channel::Coherent => 2,
    }
}

impl GainLayer for PowerLayer {
    fn apply_unmitigated(&self, scope: &LayerApply<'_>, result: &mut InteractionResult) {
        let data = &scope.data.power;
        let core = scope.core;
        let tol = core.tolerances();
        let coherency = core.coherency();

        let jpg = data.jamming_power_gain;
        if (jpg - 1.0).abs() > tol.gain {
            result.mask |= Behavior::JAMMER_POWER_EFFECT;
            result.for_each_channel(coherency, |g| g.jamming_power_gain *= jpg);
        }
        let modulation = data.modulation_gain;
        if (modulation - 1.0).abs() > tol.gain {
            result.mask |= Behavior::JAMMER_POWER_EFFECT;
            result.for_each_channel(coherency, |g| g.modulation_gain *= modulation);
        }

        let spg = data.signal_power_gain;
        if (spg - 1.0).abs() > tol.gain {
            result.mask |= Behavior::SIGNAL_POWER_EFFECT;
            result.signal.signal_power_gain *= spg;
        }
        let noise_gain = data.rcvr_noise_gain;
        if (noise_gain - 1.0).abs() > tol.gain {
            result.mask |= Behavior::SIGNAL_POWER_EFFECT;
            result.signal.rcvr_noise_gain *= noise_gain;
        }

        if data.has_j_to_s_table() {
            for channel in coherency.channels() {
                let Some(gain) = self.table_gain(data, channel) else {
                    continue;
                };
                if (gain - 1.0).abs() > tol.table_gain {
                    result.mask |= Behavior::JAMMER_POWER_EFFECT;
                    result.channel_mut(channel).j_to_x_gain *= gain;
                }
            }
        }

        if core.is_debug() {
            tracing::debug!(
                effect = %core.name(),
                jamming_power_gain = jpg,
                modulation_gain = modulation,
                signal_power_gain = spg,
                rcvr_noise_gain = noise_gain,
                "power gains applied"
            );
        }
    }
}
