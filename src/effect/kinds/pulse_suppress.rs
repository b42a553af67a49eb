//! Pulse suppression.
//!
//! A policy combinator over the jammer's pulse parameters. Range criteria
//! (frequency, pulse width, PRF) and the modulation set either pass the
//! jammer or zero it; fraction criteria pass or remove a share of it. The
//! pulse-ratio fraction thins the attacker's pulse density instead when the
//! attacker supports density scaling.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::FalseTargetEffect;
use crate::effect::{ApplyScope, Effect, EffectCore, EffectDataMap, EffectKind, InitScope, LayerStack, UpdateScope};
use crate::em::Transmitter;
use crate::error::{ConfigError, EwResult};
use crate::mask::{Behavior, Channel, Coherency};
use crate::result::InteractionResult;

/// Whether a rule passes or removes what it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Allow,
    Reject,
}

/// Jammer parameter tested against a set of intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeCriterion {
    /// Carrier frequency (Hz).
    Frequency,
    /// Pulse width (s).
    PulseWidth,
    /// Pulse repetition frequency (Hz).
    PulseRepetitionFrequency,
}

/// Allow and reject intervals for one criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeRules {
    pub allow: Vec<(f64, f64)>,
    pub reject: Vec<(f64, f64)>,
}

impl RangeRules {
    /// Adds the closed interval `[low, high]`.
    pub fn add(&mut self, polarity: Polarity, low: f64, high: f64) {
        match polarity {
            Polarity::Allow => self.allow.push((low, high)),
            Polarity::Reject => self.reject.push((low, high)),
        }
    }

    /// True if no interval is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.reject.is_empty()
    }

    /// 0.0 if `value` is rejected or misses a non-empty allow set, else 1.0.
    #[must_use]
    pub fn factor(&self, value: f64) -> f64 {
        let hit = |set: &[(f64, f64)]| set.iter().any(|&(lo, hi)| value >= lo && value <= hi);
        if hit(&self.reject) || (!self.allow.is_empty() && !hit(&self.allow)) {
            0.0
        } else {
            1.0
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.allow.iter().chain(&self.reject).any(|&(lo, hi)| lo > hi) {
            return Err(ConfigError::invalid_value(field, "interval low must not exceed high"));
        }
        Ok(())
    }
}

/// Allow and reject sets of modulation type names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationRules {
    pub allow: BTreeSet<String>,
    pub reject: BTreeSet<String>,
}

impl ModulationRules {
    /// Adds a modulation type name.
    pub fn add(&mut self, polarity: Polarity, modulation: impl Into<String>) {
        match polarity {
            Polarity::Allow => self.allow.insert(modulation.into()),
            Polarity::Reject => self.reject.insert(modulation.into()),
        };
    }

    /// Same contract as [`RangeRules::factor`]; an undeclared modulation
    /// matches nothing.
    #[must_use]
    pub fn factor(&self, modulation: Option<&str>) -> f64 {
        let rejected = modulation.is_some_and(|m| self.reject.contains(m));
        let allowed = self.allow.is_empty() || modulation.is_some_and(|m| self.allow.contains(m));
        if rejected || !allowed {
            0.0
        } else {
            1.0
        }
    }
}

/// Scalar criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractionCriterion {
    /// Share of coherent jamming.
    Coherent,
    /// Share of noncoherent jamming.
    Noncoherent,
    /// Share of jammer pulses.
    PulseRatio,
}

/// A scalar suppression criterion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fraction {
    pub polarity: Polarity,
    pub value: f64,
}

impl Fraction {
    /// `value` when allowing, `1 - value` when rejecting.
    #[must_use]
    pub fn factor(&self) -> f64 {
        match self.polarity {
            Polarity::Allow => self.value,
            Polarity::Reject => 1.0 - self.value,
        }
    }
}

/// Suppression tables for one system type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppressionData {
    pub frequency: RangeRules,
    pub pulse_width: RangeRules,
    pub pulse_repetition_frequency: RangeRules,
    pub modulation: ModulationRules,
    pub coherent: Option<Fraction>,
    pub noncoherent: Option<Fraction>,
    pub pulse_ratio: Option<Fraction>,
}

impl SuppressionData {
    /// Adds an interval to a range criterion.
    pub fn add_range(&mut self, criterion: RangeCriterion, polarity: Polarity, low: f64, high: f64) {
        self.rules_mut(criterion).add(polarity, low, high);
    }

    /// Sets a scalar criterion.
    pub fn set_fraction(&mut self, criterion: FractionCriterion, polarity: Polarity, value: f64) {
        let fraction = Some(Fraction { polarity, value });
        match criterion {
            FractionCriterion::Coherent => self.coherent = fraction,
            FractionCriterion::Noncoherent => self.noncoherent = fraction,
            FractionCriterion::PulseRatio => self.pulse_ratio = fraction,
        }
    }

    /// Multiplier from one range criterion at `value`.
    #[must_use]
    pub fn range_factor(&self, criterion: RangeCriterion, value: f64) -> f64 {
        self.rules(criterion).factor(value)
    }

    fn rules(&self, criterion: RangeCriterion) -> &RangeRules {
        match criterion {
            RangeCriterion::Frequency => &self.frequency,
            RangeCriterion::PulseWidth => &self.pulse_width,
            RangeCriterion::PulseRepetitionFrequency => &self.pulse_repetition_frequency,
        }
    }

    fn rules_mut(&mut self, criterion: RangeCriterion) -> &mut RangeRules {
        match criterion {
            RangeCriterion::Frequency => &mut self.frequency,
            RangeCriterion::PulseWidth => &mut self.pulse_width,
            RangeCriterion::PulseRepetitionFrequency => &mut self.pulse_repetition_frequency,
        }
    }

    fn validate(&self, effect: &str) -> Result<(), ConfigError> {
        self.frequency.validate(&format!("{effect}.frequency"))?;
        self.pulse_width.validate(&format!("{effect}.pulse_width"))?;
        self.pulse_repetition_frequency
            .validate(&format!("{effect}.pulse_repetition_frequency"))?;
        for (name, fraction) in [
            ("coherent", self.coherent),
            ("noncoherent", self.noncoherent),
            ("pulse_ratio", self.pulse_ratio),
        ] {
            if fraction.is_some_and(|f| !(0.0..=1.0).contains(&f.value)) {
                return Err(ConfigError::invalid_value(format!("{effect}.{name}"), "must be in [0, 1]"));
            }
        }
        Ok(())
    }

    fn evaluate(&self, jammer: &Transmitter) -> Suppression {
        let mut base = 1.0;
        for (criterion, value) in [
            (RangeCriterion::Frequency, jammer.frequency),
            (RangeCriterion::PulseWidth, jammer.pulse_width),
            (RangeCriterion::PulseRepetitionFrequency, jammer.pulse_repetition_frequency()),
        ] {
            let rules = self.rules(criterion);
            if !rules.is_empty() {
                base *= rules.factor(value);
            }
        }
        base *= self.modulation.factor(jammer.modulation.as_deref());
        Suppression {
            coherent: base * self.coherent.map_or(1.0, |f| f.factor()),
            noncoherent: base * self.noncoherent.map_or(1.0, |f| f.factor()),
            pulse_ratio: self.pulse_ratio.map(|f| f.factor()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Suppression {
    coherent: f64,
    noncoherent: f64,
    pulse_ratio: Option<f64>,
}

impl Default for Suppression {
    fn default() -> Self {
        Self {
            coherent: 1.0,
            noncoherent: 1.0,
            pulse_ratio: None,
        }
    }
}

/// Pulse suppression mitigation.
#[derive(Debug, Clone, Default)]
pub struct PulseSuppressor {
    data: EffectDataMap<SuppressionData>,
    current: Suppression,
    blip_suppressed: bool,
}

impl PulseSuppressor {
    /// Suppresses nothing until configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-type suppression tables.
    pub fn data_mut(&mut self) -> &mut EffectDataMap<SuppressionData> {
        &mut self.data
    }

    /// Coherent and noncoherent multipliers from the last update.
    #[must_use]
    pub fn factors(&self) -> (f64, f64) {
        (self.current.coherent, self.current.noncoherent)
    }

    /// True if the last update suppressed a false-target blip.
    #[must_use]
    pub fn blip_suppressed(&self) -> bool {
        self.blip_suppressed
    }
}

impl EffectKind for PulseSuppressor {
    fn kind_name(&self) -> &'static str {
        "pulse_suppression"
    }

    fn layers(&self) -> LayerStack {
        LayerStack::pulse()
    }

    fn default_coherency(&self) -> Coherency {
        Coherency::ALL
    }

    fn default_behavior(&self) -> Behavior {
        Behavior::PULSE_EFFECT
    }

    fn initialize(&mut self, core: &EffectCore, _layers: &mut LayerStack, _scope: &InitScope<'_>) -> EwResult<()> {
        for (_, data) in self.data.entries() {
            data.validate(core.name())?;
        }
        self.current = Suppression::default();
        self.blip_suppressed = false;
        Ok(())
    }

    fn update(&mut self, scope: &mut UpdateScope<'_>) {
        self.blip_suppressed = false;
        let Some(jammer) = scope.env.jammer() else {
            self.current = Suppression::default();
            return;
        };
        let mut current = self.data.get(scope.core.effected_key()).evaluate(jammer);

        if let Some(ratio) = current.pulse_ratio {
            let (scaled, false_target) = match scope.counterpart.as_deref_mut() {
                Some(attacker) => (
                    attacker.scale_jamming_pulse_density(ratio),
                    attacker.kind::<FalseTargetEffect>().is_some(),
                ),
                None => (false, false),
            };
            if !scaled {
                current.coherent *= ratio;
                current.noncoherent *= ratio;
            } else if false_target && scope.env.target_platform().is_some_and(|t| t.false_target) {
                self.blip_suppressed = scope.core.random().uniform() >= ratio;
            }
        }

        if scope.core.is_debug() {
            debug!(
                effect = %scope.core.name(),
                coherent = current.coherent,
                noncoherent = current.noncoherent,
                pulse_ratio = ?current.pulse_ratio,
                blip_suppressed = self.blip_suppressed,
                "pulse suppression evaluated"
            );
        }
        self.current = current;
    }

    fn apply_unmitigated(&self, _scope: &ApplyScope<'_>, _result: &mut InteractionResult) {}

    fn apply_mitigated(&self, scope: &ApplyScope<'_>, counterpart: Option<&Effect>, result: &mut InteractionResult) {
        scope.layers_mitigated(result);
        result.mask |= Behavior::PULSE_EFFECT;
        let coherency = counterpart.map_or(scope.core.coherency(), Effect::coherency);
        for channel in coherency.channels() {
            let factor = match channel {
                Channel::Coherent => self.current.coherent,
                Channel::Noise | Channel::Pulse => self.current.noncoherent,
            };
            result.channel_mut(channel).pulse_suppression *= factor;
        }
        if self.blip_suppressed {
            result.mask |= Behavior::DROP_TRACK;
        }
    }

    kind_any!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::kinds::{LayeredEffect, RandomPulseJamming};
    use crate::effect::Side;
    use crate::testing::{self, Fixture};

    fn suppressor(configure: impl FnOnce(&mut SuppressionData)) -> Effect {
        let mut kind = PulseSuppressor::new();
        configure(kind.data_mut().wildcard_mut());
        let mut effect = Effect::new("ps", kind);
        testing::initialize(&mut effect, Side::Protect);
        effect
    }

    fn noise_attacker() -> Effect {
        let mut effect = Effect::new("noise", LayeredEffect::power());
        testing::initialize(&mut effect, Side::Attack);
        effect
    }

    #[test]
    fn rejected_frequency_band_zeroes_multiplier() {
        let mut data = SuppressionData::default();
        data.add_range(RangeCriterion::Frequency, Polarity::Reject, 1.0e9, 2.0e9);
        assert_eq!(data.range_factor(RangeCriterion::Frequency, 1.5e9), 0.0);
        assert_eq!(data.range_factor(RangeCriterion::Frequency, 3.0e9), 1.0);
    }

    #[test]
    fn allow_set_excludes_values_outside_it() {
        let mut rules = RangeRules::default();
        rules.add(Polarity::Allow, 2.0e9, 4.0e9);
        assert_eq!(rules.factor(3.0e9), 1.0);
        assert_eq!(rules.factor(1.0e9), 0.0);
    }

    #[test]
    fn modulation_rules_match_names() {
        let mut rules = ModulationRules::default();
        rules.add(Polarity::Reject, "chirp");
        assert_eq!(rules.factor(Some("chirp")), 0.0);
        assert_eq!(rules.factor(None), 1.0);
        rules.add(Polarity::Allow, "cw");
        assert_eq!(rules.factor(None), 0.0);
        assert_eq!(rules.factor(Some("cw")), 1.0);
    }

    #[test]
    fn jammer_in_rejected_band_is_suppressed() {
        let mut fixture = Fixture::new();
        let mut ps = suppressor(|d| d.add_range(RangeCriterion::Frequency, Polarity::Reject, 1.0e9, 2.0e9));
        let mut attack = noise_attacker();

        let mut result = InteractionResult::default();
        ps.process_mitigated(&fixture.env(0.0), &mut result, Some(&mut attack));
        assert!(result.has(Behavior::PULSE_EFFECT));
        assert_eq!(result.noise.pulse_suppression, 1.0);

        if let Some(jammer) = fixture.jammer_to_target.transmitter.as_mut() {
            jammer.frequency = 1.5e9;
        }
        let mut result = InteractionResult::default();
        ps.process_mitigated(&fixture.env(1.0), &mut result, Some(&mut attack));
        assert_eq!(result.noise.pulse_suppression, 0.0);
        assert_eq!(result.coherent.pulse_suppression, 1.0);
    }

    #[test]
    fn coherent_fraction_hits_coherent_channel_only() {
        let fixture = Fixture::new();
        let mut ps = suppressor(|d| d.set_fraction(FractionCriterion::Coherent, Polarity::Reject, 0.25));
        let mut attack = noise_attacker();
        attack.set_coherency(Coherency::COHERENT | Coherency::NONCOHERENT);

        let mut result = InteractionResult::default();
        ps.process_mitigated(&fixture.env(0.0), &mut result, Some(&mut attack));
        assert_eq!(result.coherent.pulse_suppression, 0.75);
        assert_eq!(result.noise.pulse_suppression, 1.0);
    }

    #[test]
    fn pulse_ratio_thins_scalable_attacker() {
        let fixture = Fixture::new();
        let mut ps = suppressor(|d| d.set_fraction(FractionCriterion::PulseRatio, Polarity::Allow, 0.6));
        let mut rpj = Effect::new("rpj", RandomPulseJamming::new());
        rpj.layers_mut()
            .data_mut()
            .wildcard_mut()
            .pulse
            .set_jamming_pulse_density(0.5, true);
        testing::initialize(&mut rpj, Side::Attack);

        let mut result = InteractionResult::default();
        ps.process_mitigated(&fixture.env(0.0), &mut result, Some(&mut rpj));
        let pulse = rpj.layers().pulse_layer().unwrap();
        assert!((pulse.density_factor() - 0.6).abs() < 1e-12);
        assert_eq!(result.pulse.pulse_suppression, 1.0);
        assert!(!ps.kind::<PulseSuppressor>().unwrap().blip_suppressed());
    }

    #[test]
    fn pulse_ratio_folds_into_gain_otherwise() {
        let fixture = Fixture::new();
        let mut ps = suppressor(|d| d.set_fraction(FractionCriterion::PulseRatio, Polarity::Reject, 0.4));
        let mut attack = noise_attacker();
        let mut result = InteractionResult::default();
        ps.process_mitigated(&fixture.env(0.0), &mut result, Some(&mut attack));
        assert!((result.noise.pulse_suppression - 0.6).abs() < 1e-12);
    }

    #[test]
    fn inverted_interval_fails_initialize() {
        let mut kind = PulseSuppressor::new();
        kind.data_mut()
            .wildcard_mut()
            .add_range(RangeCriterion::PulseWidth, Polarity::Allow, 2.0e-6, 1.0e-6);
        let mut effect = Effect::new("ps", kind);
        let random = crate::random::SharedRandom::new(1);
        let config = crate::config::EngineConfig::default();
        let fts = crate::false_target::FalseTargetTypes::default();
        let scope = InitScope {
            random: &random,
            config: &config,
            false_targets: &fts,
            platform: None,
        };
        assert!(effect.initialize(&scope).is_err());
    }
}
