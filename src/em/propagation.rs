//! Propagation-layer services the effects call back into.

use std::fmt::Debug;

use crate::effect::EffectView;
use crate::em::{BeamPosition, Interaction, Receiver, Transmitter};
use crate::result::InteractionResult;

/// Antenna gain lookup.
pub trait AntennaPattern: Debug + Send + Sync {
    /// Absolute gain at `frequency` toward (`azimuth`, `elevation`) with the
    /// beam steered to (`ebs_azimuth`, `ebs_elevation`).
    fn gain(&self, frequency: f64, azimuth: f64, elevation: f64, ebs_azimuth: f64, ebs_elevation: f64) -> f64;

    /// Lowest gain anywhere in the pattern.
    fn minimum_gain(&self) -> f64;

    /// Peak gain at `frequency`.
    fn peak_gain(&self, frequency: f64) -> f64;
}

/// Pattern with the same gain in every direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPattern {
    /// Absolute gain.
    pub gain: f64,
}

impl AntennaPattern for ConstantPattern {
    fn gain(&self, _frequency: f64, _azimuth: f64, _elevation: f64, _ebs_azimuth: f64, _ebs_elevation: f64) -> f64 {
        self.gain
    }

    fn minimum_gain(&self) -> f64 {
        self.gain
    }

    fn peak_gain(&self, _frequency: f64) -> f64 {
        self.gain
    }
}

/// Jammer power split by coherency channel, with the effects the jammer
/// interaction already carries.
#[derive(Debug, Clone, Default)]
pub struct JammerPowers {
    /// Noise-channel power (W).
    pub noise: f64,
    /// Pulse-channel power (W).
    pub pulse: f64,
    /// Coherent-channel power (W).
    pub coherent: f64,
    /// Effect record of the jammer interaction.
    pub effects: InteractionResult,
}

/// Power received over a one-way path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OneWayPower {
    /// Received power (W).
    pub received_power: f64,
    /// Clutter power (W).
    pub clutter_power: f64,
    /// Receive-beam gain toward the source.
    pub receiver_beam_gain: f64,
}

/// Transmit-antenna gains of a radar toward a repeater jammer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntennaGains {
    /// Pattern minimum.
    pub minimum: f64,
    /// Gain toward the jammer now.
    pub current: f64,
    /// Pattern peak.
    pub peak: f64,
}

/// Power computations delegated to the propagation layer.
///
/// Implementations must be pure with respect to the effect engine: they may
/// read the passed records and their own state but never call back into
/// effects.
pub trait Propagation {
    /// Total jammer power at the receiver of `interaction`, with the
    /// attacking effect described by `effect` applied.
    fn jammer_power(&self, sim_time: f64, jammer: &Transmitter, interaction: &Interaction, effect: Option<&EffectView>) -> f64;

    /// Jammer power at the receiver of `interaction`, split by channel.
    fn jammer_powers(&self, sim_time: f64, jammer: &Transmitter, interaction: &Interaction, effect: Option<&EffectView>) -> JammerPowers;

    /// Jammer power received by `receiver` through `pattern` with the beam at
    /// `beam`; `None` if the path is blocked.
    fn one_way_jammer_power(
        &self,
        sim_time: f64,
        jammer: &Transmitter,
        receiver: &Receiver,
        pattern: Option<&dyn AntennaPattern>,
        beam: &BeamPosition,
        effect: Option<&EffectView>,
    ) -> Option<OneWayPower>;

    /// Gains of `radar`'s transmit antenna toward `jammer`.
    fn transmitter_gains_toward(&self, radar: &Transmitter, jammer: &Transmitter, interaction: &Interaction) -> Option<AntennaGains>;

    /// Target return received by `receiver` through `pattern`.
    fn target_return(&self, interaction: &Interaction, receiver: &Receiver, pattern: Option<&dyn AntennaPattern>) -> Option<OneWayPower>;
}
