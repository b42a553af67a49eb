#![allow(dead_code)]

use std::sync::Arc;

use ew_effects::em::{
    AntennaGains, AntennaPattern, BeamPosition, JammerPowers, OneWayPower, RcvrFunction, SensorMode, XmtrFunction,
};
use ew_effects::{
    EffectComposer, EffectView, Engagement, EngineConfig, Interaction, Platform, Propagation, RcvrId, Receiver,
    Transmitter, XmtrId,
};

pub const JAMMER: XmtrId = XmtrId(1);
pub const VICTIM: RcvrId = RcvrId(20);

/// Deterministic propagation: fixed main-beam and auxiliary jammer powers.
#[derive(Debug, Clone)]
pub struct FixedPropagation {
    pub jammer_power: f64,
    pub aux_power: f64,
}

impl Default for FixedPropagation {
    fn default() -> Self {
        Self {
            jammer_power: 1.0e-10,
            aux_power: 1.0e-7,
        }
    }
}

impl Propagation for FixedPropagation {
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
        Some(OneWayPower {
            received_power: if pattern.is_some() { self.aux_power } else { self.jammer_power },
            clutter_power: 0.0,
            receiver_beam_gain: 1.0,
        })
    }

    fn transmitter_gains_toward(&self, _radar: &Transmitter, _jammer: &Transmitter, _interaction: &Interaction) -> Option<AntennaGains> {
        None
    }

    fn target_return(&self, _interaction: &Interaction, _receiver: &Receiver, _pattern: Option<&dyn AntennaPattern>) -> Option<OneWayPower> {
        None
    }
}

/// One escort jammer against one acquisition radar tracking a strike aircraft.
pub struct Scenario {
    pub target: Interaction,
    pub jammer_to_target: Interaction,
}

impl Scenario {
    pub fn new(rcvr_function: RcvrFunction) -> Self {
        let site = Platform::new("site", "SAM");
        let mut radar = Transmitter::new(XmtrId(10), site.clone(), "ACQ", XmtrFunction::Sensor);
        radar.frequency = 3.0e9;
        radar.pulse_width = 1.0e-6;
        radar.pulse_repetition_interval = 1.0e-3;

        let mut victim = Receiver::new(VICTIM, site, "ACQ", rcvr_function);
        victim.frequency = 3.0e9;
    victim.bandwidth = 1.0e6;
        victim.mode = Some(SensorMode {
            frame_time: 10.0,
            dwell_time: 0.0,
            pulses_integrated: Some(10),
            frequency_agile: false,
            screener: None,
        });

        let mut jammer = Transmitter::new(JAMMER, Platform::new("escort", "EA-18G"), "ALQ-99", XmtrFunction::Interferer);
        jammer.frequency = 3.0e9;

        Self {
            target: Interaction {
                transmitter: Some(radar),
                receiver: Some(victim.clone()),
                target: Some(Platform::new("strike-1", "F-18")),
                received_power: 1.0e-12,
                detection_threshold: 20.0,
                radar_signature: 10.0,
                ..Interaction::default()
            },
            jammer_to_target: Interaction {
                transmitter: Some(jammer),
                receiver: Some(victim),
                ..Interaction::default()
            },
        }
    }

    pub fn radar() -> Self {
        Self::new(RcvrFunction::Sensor)
    }

    pub fn jammer_mut(&mut self) -> &mut Transmitter {
        self.jammer_to_target
            .transmitter
            .as_mut()
            .expect("scenario has a jammer")
    }

    pub fn engagement(&self, sim_time: f64) -> Engagement<'_> {
        Engagement {
            sim_time,
            target: &self.target,
            jammer_to_target: &self.jammer_to_target,
            target_to_jammer: None,
        }
    }
}

pub fn composer() -> EffectComposer {
    composer_with(FixedPropagation::default())
}

pub fn composer_with(propagation: FixedPropagation) -> EffectComposer {
    EffectComposer::new(EngineConfig::default(), Arc::new(propagation)).expect("default config is valid")
}
