//! Track deception: hold, drop or walk a track off.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::effect::{ApplyScope, Effect, EffectCore, EffectDataMap, EffectKind, InitScope, LayerStack, Side, UpdateScope};
use crate::error::{ConfigError, EwResult};
use crate::ids::SystemTypeId;
use crate::mask::{Behavior, Coherency, SystemFunction};
use crate::result::{InteractionResult, TrackErrors};

/// What a track effect does to the victim's track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackBehavior {
    /// Hold the track.
    Maintain,
    /// Break the track.
    Drop,
    /// Inject track errors.
    Distort,
}

impl TrackBehavior {
    fn mask(self) -> Behavior {
        match self {
            Self::Maintain => Behavior::MAINTAIN_TRACK,
            Self::Drop => Behavior::DROP_TRACK,
            Self::Distort => Behavior::TRACK_ERROR,
        }
    }
}

/// Track effect parameters for one system type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackData {
    /// Minimum J/S (ratio) for the effect to take.
    pub required_j_to_s: f64,
    /// Minimum target S/N (ratio); on the protect side this defaults to the
    /// receiver detection threshold.
    pub required_s_to_n: Option<f64>,
    /// Time from the gate opening until the effect applies (s).
    pub delay_time: f64,
    /// Time from the gate opening after which maintain and drop stop (s).
    pub holdout_time: f64,
    /// Errors injected when distorting. With a walkoff rate the range entry
    /// is the cap of the walkoff.
    pub errors: TrackErrors,
    /// Range walkoff rate (m/s).
    pub range_walkoff_rate: f64,
}

impl Default for TrackData {
    fn default() -> Self {
        Self {
            required_j_to_s: 10f64.powf(0.3),
            required_s_to_n: None,
            delay_time: 0.0,
            holdout_time: f64::MAX,
            errors: TrackErrors::default(),
            range_walkoff_rate: 0.0,
        }
    }
}

impl TrackData {
    fn validate(&self, effect: &str) -> Result<(), ConfigError> {
        if self.required_j_to_s < 0.0 {
            return Err(ConfigError::invalid_value(format!("{effect}.required_j_to_s"), "must be >= 0"));
        }
        if self.delay_time < 0.0 || self.holdout_time < self.delay_time {
            return Err(ConfigError::invalid_value(
                format!("{effect}.holdout_time"),
                "must satisfy 0 <= delay <= holdout",
            ));
        }
        if self.range_walkoff_rate < 0.0 {
            return Err(ConfigError::invalid_value(format!("{effect}.range_walkoff_rate"), "must be >= 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct GateState {
    open: bool,
    opened_at: f64,
}

/// Track deception effect.
#[derive(Debug, Clone)]
pub struct TrackEffect {
    behavior: TrackBehavior,
    data: EffectDataMap<TrackData>,
    gates: HashMap<Option<SystemTypeId>, GateState>,
    applying: bool,
    errors: TrackErrors,
}

impl TrackEffect {
    /// A track effect with default data.
    #[must_use]
    pub fn new(behavior: TrackBehavior) -> Self {
        Self {
            behavior,
            data: EffectDataMap::default(),
            gates: HashMap::new(),
            applying: false,
            errors: TrackErrors::default(),
        }
    }

    /// Configured behavior.
    #[must_use]
    pub fn behavior(&self) -> TrackBehavior {
        self.behavior
    }

    /// Per-type track data.
    pub fn data_mut(&mut self) -> &mut EffectDataMap<TrackData> {
        &mut self.data
    }

    /// True if the last update found the effect in force.
    #[must_use]
    pub fn is_applying(&self) -> bool {
        self.applying
    }

    /// Errors from the last update.
    #[must_use]
    pub fn errors(&self) -> TrackErrors {
        self.errors
    }

    fn apply_track(&self, core: &EffectCore, result: &mut InteractionResult, mitigated: bool) {
        match self.behavior {
            TrackBehavior::Maintain => {
                result.mask.remove(Behavior::DROP_TRACK);
                result.mask |= Behavior::MAINTAIN_TRACK;
            }
            TrackBehavior::Drop => {
                result.mask.remove(Behavior::MAINTAIN_TRACK);
                result.mask |= Behavior::DROP_TRACK;
            }
            TrackBehavior::Distort => {
                result.mask |= Behavior::TRACK_ERROR;
                result.track_error = if mitigated {
                    result.track_error.min(self.errors)
                } else {
                    result.track_error.max(self.errors)
                };
            }
        }
        if core.is_debug() {
            debug!(
                effect = %core.name(),
                behavior = ?self.behavior,
                mitigated,
                errors = ?result.track_error,
                "track effect applied"
            );
        }
    }
}

impl EffectKind for TrackEffect {
    fn kind_name(&self) -> &'static str {
        "track"
    }

    fn layers(&self) -> LayerStack {
        LayerStack::pulse()
    }

    fn default_coherency(&self) -> Coherency {
        Coherency::COHERENT
    }

    fn default_behavior(&self) -> Behavior {
        self.behavior.mask()
    }

    fn attack_functions(&self) -> SystemFunction {
        SystemFunction::SENSOR
    }

    fn initialize(&mut self, core: &EffectCore, _layers: &mut LayerStack, _scope: &InitScope<'_>) -> EwResult<()> {
        for (_, data) in self.data.entries() {
            data.validate(core.name())?;
        }
        self.gates.clear();
        self.applying = false;
        Ok(())
    }

    fn update(&mut self, scope: &mut UpdateScope<'_>) {
        self.applying = false;
        let env = scope.env;
        let (Some(jammer), Some(receiver)) = (env.jammer(), env.receiver()) else {
            return;
        };
        let key = scope.key();
        let data = self.data.get(key.as_ref());
        let now = env.sim_time;

        let view = scope.view();
        let power = &scope.layers.data_for(key.as_ref()).power;
        let jammer_power = env.propagation.jammer_power(now, jammer, env.target, Some(&view))
            * scope.result.coherent.total_factor()
            * power.jamming_power_gain
            * power.modulation_gain;
        let signal = env.target.received_power;
        let j_to_s = if signal > 0.0 { jammer_power / signal } else { f64::NEG_INFINITY };
        let s_to_n = receiver.signal_to_noise(signal, env.target.clutter_power, 0.0);
        let required_s_to_n = data.required_s_to_n.unwrap_or(match scope.core.owner().side {
            Some(Side::Protect) => receiver.detection_threshold,
            _ => f64::NEG_INFINITY,
        });

        let passes = j_to_s >= data.required_j_to_s && s_to_n >= required_s_to_n;
        let gate = self.gates.entry(key).or_default();
        if passes && !gate.open {
            gate.opened_at = now;
        }
        gate.open = passes;
        let elapsed = now - gate.opened_at;

        self.applying = passes
            && elapsed >= data.delay_time
            && (self.behavior == TrackBehavior::Distort || elapsed < data.holdout_time);

        let mut errors = data.errors;
        if data.range_walkoff_rate > 0.0 {
            let walked = data.range_walkoff_rate * (elapsed - data.delay_time).max(0.0);
            errors.range = walked.min(data.errors.range);
        }
        self.errors = errors;

        if scope.core.is_debug() {
            debug!(
                effect = %scope.core.name(),
                j_to_s,
                s_to_n,
                required_j_to_s = data.required_j_to_s,
                required_s_to_n,
                elapsed,
                applying = self.applying,
                "track gate evaluated"
            );
        }
    }

    fn apply_unmitigated(&self, scope: &ApplyScope<'_>, result: &mut InteractionResult) {
        if self.applying {
            scope.layers_unmitigated(result);
            self.apply_track(scope.core, result, false);
        }
    }

    fn apply_mitigated(&self, scope: &ApplyScope<'_>, _counterpart: Option<&Effect>, result: &mut InteractionResult) {
        if self.applying {
            self.apply_track(scope.core, result, true);
        }
    }

    kind_any!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::kinds::LayeredEffect;
    use crate::testing::{self, Fixture};

    fn track(behavior: TrackBehavior, side: Side, configure: impl FnOnce(&mut TrackData)) -> Effect {
        let mut kind = TrackEffect::new(behavior);
        configure(kind.data_mut().wildcard_mut());
        let mut effect = Effect::new("track", kind);
        testing::initialize(&mut effect, side);
        effect
    }

    fn run(effect: &mut Effect, fixture: &Fixture, sim_time: f64) -> InteractionResult {
        let mut result = InteractionResult::default();
        effect.process_unmitigated(&fixture.env(sim_time), &mut result);
        result
    }

    #[test]
    fn distort_takes_largest_error() {
        let fixture = Fixture::new();
        let mut effect = track(TrackBehavior::Distort, Side::Attack, |d| d.errors.azimuth = 0.01);
        let mut result = InteractionResult::default();
        result.track_error.azimuth = 0.002;
        result.track_error.elevation = 0.5;
        effect.process_unmitigated(&fixture.env(0.0), &mut result);
        assert!(result.has(Behavior::TRACK_ERROR));
        assert_eq!(result.track_error.azimuth, 0.01);
        assert_eq!(result.track_error.elevation, 0.5);
        assert_eq!(effect.system_functions(), SystemFunction::SENSOR);
    }

    #[test]
    fn delay_postpones_effect() {
        let fixture = Fixture::new();
        let mut effect = track(TrackBehavior::Drop, Side::Attack, |d| d.delay_time = 5.0);
        assert!(!run(&mut effect, &fixture, 0.0).has(Behavior::DROP_TRACK));
        assert!(run(&mut effect, &fixture, 6.0).has(Behavior::DROP_TRACK));
    }

    #[test]
    fn drop_stops_after_holdout() {
        let fixture = Fixture::new();
        let mut effect = track(TrackBehavior::Drop, Side::Attack, |d| d.holdout_time = 10.0);
        assert!(run(&mut effect, &fixture, 0.0).has(Behavior::DROP_TRACK));
        assert!(!run(&mut effect, &fixture, 20.0).has(Behavior::DROP_TRACK));
    }

    #[test]
    fn maintain_clears_drop() {
        let fixture = Fixture::new();
        let mut effect = track(TrackBehavior::Maintain, Side::Attack, |_| {});
        let mut result = InteractionResult::default();
        result.mask |= Behavior::DROP_TRACK;
        effect.process_unmitigated(&fixture.env(0.0), &mut result);
        assert!(result.has(Behavior::MAINTAIN_TRACK));
        assert!(!result.has(Behavior::DROP_TRACK));
    }

    #[test]
    fn insufficient_j_to_s_blocks_effect() {
        let fixture = Fixture::new();
        // J/S is 100 in the fixture.
        let mut effect = track(TrackBehavior::Drop, Side::Attack, |d| d.required_j_to_s = 1000.0);
        assert!(!run(&mut effect, &fixture, 0.0).has(Behavior::DROP_TRACK));
        assert!(!effect.kind::<TrackEffect>().unwrap().is_applying());
    }

    #[test]
    fn range_walkoff_grows_to_cap() {
        let fixture = Fixture::new();
        let mut effect = track(TrackBehavior::Distort, Side::Attack, |d| {
            d.range_walkoff_rate = 100.0;
            d.errors.range = 500.0;
        });
        assert_eq!(run(&mut effect, &fixture, 0.0).track_error.range, 0.0);
        assert_eq!(run(&mut effect, &fixture, 2.0).track_error.range, 200.0);
        assert_eq!(run(&mut effect, &fixture, 10.0).track_error.range, 500.0);
    }

    #[test]
    fn protect_side_needs_detection_s_to_n() {
        let mut fixture = Fixture::new();
        let mut attack = Effect::new("noise", LayeredEffect::power());
        testing::initialize(&mut attack, Side::Attack);
        let mut effect = track(TrackBehavior::Maintain, Side::Protect, |_| {});

        let mut result = InteractionResult::default();
        effect.process_mitigated(&fixture.env(0.0), &mut result, Some(&mut attack));
        assert!(result.has(Behavior::MAINTAIN_TRACK));

        // S/N of 10 against a threshold of 20.
        fixture.target.received_power = 1.0e-13;
        let mut result = InteractionResult::default();
        effect.process_mitigated(&fixture.env(1.0), &mut result, Some(&mut attack));
        assert!(!result.has(Behavior::MAINTAIN_TRACK));
    }

    #[test]
    fn mitigated_distort_takes_smallest_error() {
        let fixture = Fixture::new();
        let mut attack = Effect::new("noise", LayeredEffect::power());
        testing::initialize(&mut attack, Side::Attack);
        let mut effect = track(TrackBehavior::Distort, Side::Protect, |d| d.errors.range = 50.0);
        let mut result = InteractionResult::default();
        result.track_error.range = 300.0;
        effect.process_mitigated(&fixture.env(0.0), &mut result, Some(&mut attack));
        assert_eq!(result.track_error.range, 50.0);
    }
}
