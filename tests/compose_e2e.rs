mod common;

use std::sync::Arc;

use common::{composer, composer_with, FixedPropagation, Scenario, JAMMER, VICTIM};
use ew_effects::effect::kinds::{Polarity, RangeCriterion};
use ew_effects::em::{ConstantPattern, RcvrFunction};
use ew_effects::false_target::{PlatformBehavior, RadarBehavior};
use ew_effects::{
    AttackContext, Behavior, CancelerState, Coherency, CommBehavior, CommEffect, Effect, EffectComposer, FalseTarget,
    FalseTargetEffect, FtSource, InteractionResult, InteractionSide, LayeredEffect, MitigationRef, ProtectContext,
    PulseSuppressor, SidelobeBlanker, SidelobeCanceler, SlbConfig, SlcConfig, Technique,
};

fn power_effect(gain: f64) -> Effect {
    let mut effect = Effect::new("barrage", LayeredEffect::power());
    effect.set_coherency(Coherency::NONCOHERENT);
    effect.layers_mut().data_mut().wildcard_mut().power.jamming_power_gain = gain;
    effect
}

fn technique(id: &str, effects: Vec<Effect>) -> Technique {
    let mut technique = Technique::new(id);
    technique.set_default_on(true);
    for effect in effects {
        technique.add_effect(effect).unwrap();
    }
    technique
}

fn mitigation(id: &str, mitigates: &str, effect: Effect) -> Technique {
    let mut technique = technique(id, vec![effect]);
    technique.add_mitigation(MitigationRef::Technique(mitigates.into()));
    technique
}

fn attack(techniques: Vec<Technique>) -> AttackContext {
    let mut ea = AttackContext::new("escort");
    for t in techniques {
        ea.add_technique(t).unwrap();
    }
    ea
}

fn protect(techniques: Vec<Technique>) -> ProtectContext {
    let mut ep = ProtectContext::new("site");
    for t in techniques {
        ep.add_technique(t).unwrap();
    }
    ep
}

#[test]
fn power_gain_reaches_noise_channel_only() {
    let scenario = Scenario::radar();
    let mut composer = composer();
    composer
        .attach_attack(JAMMER, attack(vec![technique("noise", vec![power_effect(2.0)])]))
        .unwrap();
    composer.attach_protect(VICTIM, protect(vec![])).unwrap();
    composer.initialize().unwrap();

    let mut result = InteractionResult::default();
    assert!(composer.process(&scenario.engagement(0.0), false, &mut result));
    assert_eq!(result.noise.jamming_power_gain, 2.0);
    assert!(result.has(Behavior::JAMMER_POWER_EFFECT));
    assert_eq!(result.coherent.jamming_power_gain, 1.0);
    assert_eq!(result.pulse.jamming_power_gain, 1.0);
}

#[test]
fn deselected_technique_does_not_apply() {
    let scenario = Scenario::radar();
    let mut composer = composer();
    composer
        .attach_attack(JAMMER, attack(vec![technique("noise", vec![power_effect(2.0)])]))
        .unwrap();
    composer.initialize().unwrap();

    assert!(composer.attack_mut(JAMMER).unwrap().deselect(&"noise".into()));
    let mut result = InteractionResult::default();
    assert!(composer.process(&scenario.engagement(0.0), false, &mut result));
    assert_eq!(result.noise.jamming_power_gain, 1.0);
    assert!(!result.has(Behavior::JAMMER_POWER_EFFECT));

    composer.attack_mut(JAMMER).unwrap().select(&"noise".into()).unwrap();
    let mut result = InteractionResult::default();
    composer.process(&scenario.engagement(1.0), false, &mut result);
    assert_eq!(result.noise.jamming_power_gain, 2.0);
}

#[test]
fn comm_error_rate_is_mitigated_to_minimum() {
    let scenario = Scenario::new(RcvrFunction::Comm);
    let comm = |rate: f64| {
        let mut kind = CommEffect::new(CommBehavior::MessageError);
        kind.data_mut().wildcard_mut().message_error_rate = rate;
        Effect::new("error", kind)
    };

    let mut composer = composer();
    composer
        .attach_attack(JAMMER, attack(vec![technique("comm_jam", vec![comm(0.3)])]))
        .unwrap();
    composer
        .attach_protect(VICTIM, protect(vec![mitigation("fec", "comm_jam", comm(0.1))]))
        .unwrap();
    composer.initialize().unwrap();

    let mut result = InteractionResult::default();
    composer.process(&scenario.engagement(0.0), true, &mut result);
    assert!(result.has(Behavior::MESSAGE_ERROR));
    assert_eq!(result.message_error_rate, 0.3);

    let mut result = InteractionResult::default();
    composer.process(&scenario.engagement(0.0), false, &mut result);
    assert_eq!(result.message_error_rate, 0.1);
}

#[test]
fn sidelobe_canceler_cancels_and_forgets_detached_jammer() {
    let scenario = Scenario::radar();
    let mut config = SlcConfig::default();
    config.add_ratio(1, 0.0, 100.0);
    let slc = Effect::new(
        "slc",
        SidelobeCanceler::with_pattern(config, Arc::new(ConstantPattern { gain: 1.0 })),
    );

    let mut composer = composer();
    composer
        .attach_attack(JAMMER, attack(vec![technique("noise", vec![power_effect(2.0)])]))
        .unwrap();
    composer
        .attach_protect(VICTIM, protect(vec![mitigation("cancel", "noise", slc)]))
        .unwrap();
    composer.initialize().unwrap();

    let mut result = InteractionResult::default();
    composer.process(&scenario.engagement(0.0), false, &mut result);
    assert!((result.noise.cancellation - 0.01).abs() < 1e-12);
    assert_eq!(result.coherent.cancellation, 1.0);

    let canceler = |composer: &EffectComposer| {
        let technique = composer.protect(VICTIM).unwrap().techniques().get(&"cancel".into()).unwrap();
        let kind = technique.effect("slc").unwrap().kind::<SidelobeCanceler>().unwrap();
        (kind.state(), kind.canceled_channels())
    };
    assert_eq!(canceler(&composer), (CancelerState::Canceling, 1));

    assert!(composer.detach_attack(JAMMER).is_some());
    assert_eq!(canceler(&composer).1, 0);
    assert!(!composer.process(&scenario.engagement(1.0), false, &mut result));
}

#[test]
fn sidelobe_blanker_blanks_pulsed_jammer() {
    let scenario = Scenario::radar();
    let mut pulsed = Effect::new("rpj", LayeredEffect::pulse());
    pulsed.set_coherency(Coherency::NONCOHERENT_PULSE);
    pulsed
        .layers_mut()
        .data_mut()
        .wildcard_mut()
        .pulse
        .set_jamming_pulse_density(0.1, true);
    let slb = Effect::new(
        "slb",
        SidelobeBlanker::with_pattern(SlbConfig::default(), Arc::new(ConstantPattern { gain: 1.0 })),
    );

    let mut composer = composer();
    composer.attach_attack(JAMMER, attack(vec![technique("pulse", vec![pulsed])])).unwrap();
    composer
        .attach_protect(VICTIM, protect(vec![mitigation("blank", "pulse", slb)]))
        .unwrap();
    composer.initialize().unwrap();

    let mut result = InteractionResult::default();
    composer.process(&scenario.engagement(0.0), false, &mut result);
    assert_eq!(result.pulse.blanking, 0.0);
    assert_eq!(result.noise.blanking, 1.0);
}

#[test]
fn mainlobe_jammer_passes_blanker() {
    let scenario = Scenario::radar();
    let propagation = FixedPropagation {
        jammer_power: 1.0e-10,
        aux_power: 1.0e-12,
    };
    let mut pulsed = Effect::new("rpj", LayeredEffect::pulse());
    pulsed.set_coherency(Coherency::NONCOHERENT_PULSE);
    let slb = Effect::new(
        "slb",
        SidelobeBlanker::with_pattern(SlbConfig::default(), Arc::new(ConstantPattern { gain: 1.0 })),
    );

    let mut composer = composer_with(propagation);
    composer.attach_attack(JAMMER, attack(vec![technique("pulse", vec![pulsed])])).unwrap();
    composer
        .attach_protect(VICTIM, protect(vec![mitigation("blank", "pulse", slb)]))
        .unwrap();
    composer.initialize().unwrap();

    let mut result = InteractionResult::default();
    composer.process(&scenario.engagement(0.0), false, &mut result);
    assert_eq!(result.pulse.blanking, 1.0);
}

#[test]
fn pulse_suppressor_rejects_jammer_in_band() {
    let mut scenario = Scenario::radar();
    let mut kind = PulseSuppressor::new();
    kind.data_mut()
        .wildcard_mut()
        .add_range(RangeCriterion::Frequency, Polarity::Reject, 1.0e9, 2.0e9);

    let mut composer = composer();
    composer
        .attach_attack(JAMMER, attack(vec![technique("noise", vec![power_effect(2.0)])]))
        .unwrap();
    composer
        .attach_protect(VICTIM, protect(vec![mitigation("ps", "noise", Effect::new("ps", kind))]))
        .unwrap();
    composer.initialize().unwrap();

    let mut result = InteractionResult::default();
    composer.process(&scenario.engagement(0.0), false, &mut result);
    assert_eq!(result.noise.pulse_suppression, 1.0);

    scenario.jammer_mut().frequency = 1.5e9;
    let mut result = InteractionResult::default();
    composer.process(&scenario.engagement(1.0), false, &mut result);
    assert_eq!(result.noise.pulse_suppression, 0.0);
    assert!(result.has(Behavior::PULSE_EFFECT));
}

#[test]
fn class_mitigation_covers_every_technique_of_class() {
    let scenario = Scenario::radar();
    let mut composer = composer();
    let noise = technique("noise", vec![power_effect(4.0)]).with_class("barrage");
    composer.attach_attack(JAMMER, attack(vec![noise])).unwrap();

    let mut reduce = technique("reduce", vec![power_effect(0.5)]);
    reduce.add_mitigation(MitigationRef::Class("barrage".into()));
    composer.attach_protect(VICTIM, protect(vec![reduce])).unwrap();
    composer.initialize().unwrap();

    let mut result = InteractionResult::default();
    composer.process(&scenario.engagement(0.0), false, &mut result);
    assert_eq!(result.noise.jamming_power_gain, 2.0);
}

#[test]
fn named_false_target_is_shared_through_registry() {
    let scenario = Scenario::radar();
    let mut composer = composer();
    let mut screen = FalseTarget::new("screen");
    screen.radar_behavior = RadarBehavior::ConsistentToMultipleRadars;
    screen.platform_behavior = PlatformBehavior::ConsistentToMultiplePlatforms;
    composer.false_targets().add(screen).unwrap();

    let mut kind = FalseTargetEffect::new();
    kind.data_mut().wildcard_mut().source = FtSource::Named("screen".into());
    composer
        .attach_attack(JAMMER, attack(vec![technique("ft", vec![Effect::new("blips", kind)])]))
        .unwrap();
    composer.initialize().unwrap();

    let mut result = InteractionResult::default();
    composer.process(&scenario.engagement(0.0), false, &mut result);
    assert!(result.has(Behavior::FALSE_TARGET_EFFECT));

    let shared = composer.false_targets().find("screen").unwrap();
    assert!(shared.read().number_of_fts.get() > 0);
    assert_eq!(composer.false_targets().len(), 1);
}

#[test]
fn failing_effect_aborts_initialize() {
    let mut composer = composer();
    let slc = Effect::new("slc", SidelobeCanceler::new(SlcConfig::default()));
    composer
        .attach_protect(VICTIM, protect(vec![mitigation("cancel", "noise", slc)]))
        .unwrap();
    let err = composer.initialize().unwrap_err();
    assert!(err.is_config());
    assert!(!composer.is_initialized());
}
