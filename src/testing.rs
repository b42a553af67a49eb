//! Fixtures shared by unit tests.

use crate::config::EngineConfig;
use crate::effect::{Effect, EffectEnv, EffectView, InitScope, Owner, Side};
use crate::em::{
    AntennaGains, AntennaPattern, BeamPosition, Interaction, JammerPowers, OneWayPower, Platform, Propagation, Receiver,
    RcvrFunction, SensorMode, Transmitter, XmtrFunction,
};
use crate::false_target::FalseTargetTypes;
use crate::ids::{RcvrId, XmtrId};
use crate::random::SharedRandom;

/// Propagation returning fixed powers.
#[derive(Debug, Clone)]
pub(crate) struct StubPropagation {
    pub jammer_power: f64,
    pub aux_power: f64,
    pub target_return: f64,
    pub aux_target_return: f64,
}

impl Default for StubPropagation {
    fn default() -> Self {
        Self {
            jammer_power: 1.0e-10,
            aux_power: 1.0e-7,
            target_return: 0.0,
            aux_target_return: 0.0,
        }
    }
}

impl Propagation for StubPropagation {
    fn jammer_power(&self, _sim_time: f64, _jammer: &Transmitter, _interaction: &Interaction, _effect: Option<&EffectView>) -> f64 {
        self.jammer_power
    }

    fn jammer_powers(&self, _sim_time: f64, _jammer: &Transmitter, _interaction: &Interaction, _effect: Option<&EffectView>) -> JammerPowers {
        JammerPowers {
            noise: self.jammer_power,
            pulse: self.jammer_power,
            coherent: self.jammer_power,
            ..JammerPowers::default()
        }
    }

    fn one_way_jammer_power(
        &self,
        _sim_time: f64,
        _jammer: &Transmitter,
        _receiver: &Receiver,
        pattern: Option<&dyn AntennaPattern>,
        _beam: &BeamPosition,
        _effect: Option<&EffectView>,
    ) -> Option<OneWayPower> {
        let received_power = if pattern.is_some() { self.aux_power } else { self.jammer_power };
        Some(OneWayPower {
            received_power,
            clutter_power: 0.0,
            receiver_beam_gain: 1.0,
        })
    }

    fn transmitter_gains_toward(&self, _radar: &Transmitter, _jammer: &Transmitter, _interaction: &Interaction) -> Option<AntennaGains> {
        Some(AntennaGains {
            minimum: 0.01,
            current: 1.0,
            peak: 100.0,
        })
    }

    fn target_return(&self, _interaction: &Interaction, _receiver: &Receiver, pattern: Option<&dyn AntennaPattern>) -> Option<OneWayPower> {
        let received_power = if pattern.is_some() { self.aux_target_return } else { self.target_return };
        Some(OneWayPower {
            received_power,
            clutter_power: 0.0,
            receiver_beam_gain: 1.0,
        })
    }
}

pub(crate) fn radar() -> Transmitter {
    let mut xmtr = Transmitter::new(XmtrId(10), Platform::new("site", "SAM"), "ACQ", XmtrFunction::Sensor);
    xmtr.frequency = 3.0e9;
    xmtr.pulse_width = 1.0e-6;
    xmtr.pulse_repetition_interval = 1.0e-3;
    xmtr
}

pub(crate) fn victim() -> Receiver {
    let mut rcvr = Receiver::new(RcvrId(20), Platform::new("site", "SAM"), "ACQ", RcvrFunction::Sensor);
    rcvr.frequency = 3.0e9;
    rcvr.bandwidth = 1.0e6;
    rcvr.mode = Some(SensorMode {
        frame_time: 10.0,
        dwell_time: 0.0,
        pulses_integrated: Some(10),
        frequency_agile: false,
        screener: None,
    });
    rcvr
}

pub(crate) fn jammer() -> Transmitter {
    let mut xmtr = Transmitter::new(XmtrId(1), Platform::new("escort", "EA-18G"), "ALQ-99", XmtrFunction::Interferer);
    xmtr.frequency = 3.0e9;
    xmtr
}

/// Detection and jamming interactions for one jammer against one radar.
pub(crate) struct Fixture {
    pub target: Interaction,
    pub jammer_to_target: Interaction,
    pub propagation: StubPropagation,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let target = Interaction {
            transmitter: Some(radar()),
            receiver: Some(victim()),
            target: Some(Platform::new("strike-1", "F-18")),
            received_power: 1.0e-12,
            detection_threshold: 20.0,
            radar_signature: 10.0,
            ..Interaction::default()
        };
        let jammer_to_target = Interaction {
            transmitter: Some(jammer()),
            receiver: Some(victim()),
            ..Interaction::default()
        };
        Self {
            target,
            jammer_to_target,
            propagation: StubPropagation::default(),
        }
    }

    pub(crate) fn env(&self, sim_time: f64) -> EffectEnv<'_> {
        EffectEnv {
            sim_time,
            target: &self.target,
            jammer_to_target: &self.jammer_to_target,
            target_to_jammer: None,
            propagation: &self.propagation,
        }
    }
}

/// Initializes `effect` as if attached to `side`.
pub(crate) fn initialize(effect: &mut Effect, side: Side) {
    let random = SharedRandom::new(7);
    let config = EngineConfig::default();
    let false_targets = FalseTargetTypes::default();
    initialize_with(effect, side, &false_targets, &random, &config);
}

pub(crate) fn initialize_with(
    effect: &mut Effect,
    side: Side,
    false_targets: &FalseTargetTypes,
    random: &SharedRandom,
    config: &EngineConfig,
) {
    effect.set_owner(Owner {
        side: Some(side),
        ..Owner::default()
    });
    let scope = InitScope {
        random,
        config,
        false_targets,
        platform: Some("escort"),
    };
    effect.initialize(&scope).expect("fixture effect initializes");
}
