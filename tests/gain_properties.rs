mod common;

use common::{composer, Scenario, JAMMER};
use ew_effects::{
    AttackContext, Coherency, Effect, EffectComposer, InteractionResult, InteractionSide, LayeredEffect, Technique,
};
use proptest::prelude::*;

fn power_technique(id: &str, gain: f64) -> Technique {
    let mut effect = Effect::new("power", LayeredEffect::power());
    effect.set_coherency(Coherency::NONCOHERENT);
    effect.layers_mut().data_mut().wildcard_mut().power.jamming_power_gain = gain;
    let mut technique = Technique::new(id);
    technique.set_default_on(true);
    technique.add_effect(effect).unwrap();
    technique
}

fn composed(gains: &[(&str, f64)]) -> InteractionResult {
    let mut ea = AttackContext::new("escort");
    for &(id, gain) in gains {
        ea.add_technique(power_technique(id, gain)).unwrap();
    }
    let mut composer: EffectComposer = composer();
    composer.attach_attack(JAMMER, ea).unwrap();
    composer.initialize().unwrap();

    let scenario = Scenario::radar();
    let mut result = InteractionResult::default();
    assert!(composer.process(&scenario.engagement(0.0), true, &mut result));
    result
}

proptest! {
    #[test]
    fn power_gains_compose_multiplicatively(a in 0.01f64..100.0, b in 0.01f64..100.0) {
        let result = composed(&[("first", a), ("second", b)]);
        let expected = a * b;
        prop_assert!((result.noise.jamming_power_gain - expected).abs() <= expected * 1e-12);
        prop_assert_eq!(result.coherent.jamming_power_gain, 1.0);
    }

    #[test]
    fn technique_order_does_not_change_result(a in 0.01f64..100.0, b in 0.01f64..100.0) {
        let forward = composed(&[("first", a), ("second", b)]);
        let reverse = composed(&[("second", b), ("first", a)]);
        let tolerance = forward.noise.jamming_power_gain * 1e-12;
        prop_assert!((forward.noise.jamming_power_gain - reverse.noise.jamming_power_gain).abs() <= tolerance);
        prop_assert_eq!(forward.mask, reverse.mask);
    }
}
