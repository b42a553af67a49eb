//! The per-interaction effect accumulator.
//!
//! Every applied effect multiplies its factors into an
//! [`InteractionResult`]; cancellation is the only field combined as a
//! running minimum. The propagation layer reads the record afterward.

use serde::{Deserialize, Serialize};

use crate::mask::{Behavior, Channel, Coherency};

/// Tri-state "protect target" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectTarget {
    /// No effect has decided yet.
    #[default]
    Undefined,
    /// An effect rejected the target.
    No,
    /// An effect accepted the target.
    Yes,
}

/// Gain factors for one jamming channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JammingGains {
    pub blanking: f64,
    pub cancellation: f64,
    pub modulation_gain: f64,
    pub jamming_power_gain: f64,
    pub j_to_x_gain: f64,
    pub pulse_suppression: f64,
    pub radius_factor: f64,
    pub repeater_factor: f64,
    pub rpj_gain: f64,
    pub protect_target: ProtectTarget,
}

impl Default for JammingGains {
    fn default() -> Self {
        Self {
            blanking: 1.0,
            cancellation: 1.0,
            modulation_gain: 1.0,
            jamming_power_gain: 1.0,
            j_to_x_gain: 1.0,
            pulse_suppression: 1.0,
            radius_factor: 1.0,
            repeater_factor: 1.0,
            rpj_gain: 1.0,
            protect_target: ProtectTarget::Undefined,
        }
    }
}

impl JammingGains {
    /// Product of every factor; what the propagation layer multiplies into
    /// the channel's jammer power.
    #[must_use]
    pub fn total_factor(&self) -> f64 {
        self.blanking
            * self.cancellation
            * self.modulation_gain
            * self.jamming_power_gain
            * self.j_to_x_gain
            * self.pulse_suppression
            * self.radius_factor
            * self.repeater_factor
            * self.rpj_gain
    }
}

/// Gains applied to the target signal and receiver noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalGains {
    pub signal_power_gain: f64,
    pub rcvr_noise_gain: f64,
}

impl Default for SignalGains {
    fn default() -> Self {
        Self {
            signal_power_gain: 1.0,
            rcvr_noise_gain: 1.0,
        }
    }
}

/// Radar antenna gains seen by a repeater.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepeaterGains {
    pub gain: f64,
    pub min_gain: f64,
    pub peak_gain: f64,
}

impl Default for RepeaterGains {
    fn default() -> Self {
        Self {
            gain: 1.0,
            min_gain: 1.0,
            peak_gain: 1.0,
        }
    }
}

/// Track errors injected by deception effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackErrors {
    /// Azimuth error (rad).
    pub azimuth: f64,
    /// Elevation error (rad).
    pub elevation: f64,
    /// Range error (m).
    pub range: f64,
    /// Velocity error (m/s).
    pub velocity: f64,
}

impl TrackErrors {
    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self {
            azimuth: self.azimuth.max(other.azimuth),
            elevation: self.elevation.max(other.elevation),
            range: self.range.max(other.range),
            velocity: self.velocity.max(other.velocity),
        }
    }

    /// Component-wise minimum.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self {
            azimuth: self.azimuth.min(other.azimuth),
            elevation: self.elevation.min(other.elevation),
            range: self.range.min(other.range),
            velocity: self.velocity.min(other.velocity),
        }
    }
}

/// Receiver reconfiguration requested by an agility effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgilityAction {
    /// Hop to a new frequency.
    FrequencyChange,
    /// Switch to the named sensor mode.
    ModeChange(String),
}

/// Mutable accumulator for one (jammer, receiver, target) interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionResult {
    /// Applied behaviors.
    pub mask: Behavior,
    /// Coherency of every attacking effect seen this pass.
    pub ea_coherency: Coherency,
    pub noise: JammingGains,
    pub pulse: JammingGains,
    pub coherent: JammingGains,
    pub signal: SignalGains,
    /// Current repeater gains; persistent across passes while
    /// [`Behavior::REPEATER_UPDATE`] is set.
    pub repeater: RepeaterGains,
    pub track_error: TrackErrors,
    /// Communication message error rate.
    pub message_error_rate: f64,
    /// Receiver reconfiguration requested this pass.
    pub agility: Option<AgilityAction>,
}

impl InteractionResult {
    /// Prepares for a new composition pass.
    ///
    /// Clears the behavior mask except [`Behavior::REPEATER_UPDATE`] and
    /// clears the coherency accumulator. Gains are left to the caller.
    pub fn begin_pass(&mut self) {
        self.mask &= Behavior::REPEATER_UPDATE;
        self.ea_coherency = Coherency::empty();
    }

    /// Restores every field to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True if every bit of `behavior` is set.
    #[must_use]
    pub const fn has(&self, behavior: Behavior) -> bool {
        self.mask.contains(behavior)
    }

    /// Gains of one channel.
    #[must_use]
    pub const fn channel(&self, channel: Channel) -> &JammingGains {
        match channel {
            Channel::Noise => &self.noise,
            Channel::Pulse => &self.pulse,
            Channel::Coherent => &self.coherent,
        }
    }

    /// Mutable gains of one channel.
    pub fn channel_mut(&mut self, channel: Channel) -> &mut JammingGains {
        match channel {
            Channel::Noise => &mut self.noise,
            Channel::Pulse => &mut self.pulse,
            Channel::Coherent => &mut self.coherent,
        }
    }

    /// Runs `f` on every channel selected by `coherency`.
    pub fn for_each_channel(&mut self, coherency: Coherency, mut f: impl FnMut(&mut JammingGains)) {
        for channel in coherency.channels() {
            f(self.channel_mut(channel));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gains_are_unity() {
        let result = InteractionResult::default();
        for channel in Channel::ALL {
            assert_eq!(result.channel(channel).total_factor(), 1.0);
            assert_eq!(result.channel(channel).protect_target, ProtectTarget::Undefined);
        }
        assert!(result.mask.is_empty());
    }

    #[test]
    fn begin_pass_keeps_repeater_update() {
        let mut result = InteractionResult::default();
        result.mask = Behavior::REPEATER_UPDATE | Behavior::DROP_TRACK;
        result.ea_coherency = Coherency::COHERENT;
        result.noise.jamming_power_gain = 3.0;
        result.begin_pass();
        assert_eq!(result.mask, Behavior::REPEATER_UPDATE);
        assert!(result.ea_coherency.is_empty());
        assert_eq!(result.noise.jamming_power_gain, 3.0);
    }

    #[test]
    fn for_each_channel_touches_only_selected() {
        let mut result = InteractionResult::default();
        result.for_each_channel(Coherency::COHERENT_PULSE, |g| g.blanking *= 0.0);
        assert_eq!(result.coherent.blanking, 0.0);
        assert_eq!(result.noise.blanking, 1.0);
        assert_eq!(result.pulse.blanking, 1.0);
    }

    #[test]
    fn track_errors_combine_component_wise() {
        let a = TrackErrors { azimuth: 1.0, elevation: 0.0, range: 50.0, velocity: 2.0 };
        let b = TrackErrors { azimuth: 0.5, elevation: 0.2, range: 80.0, velocity: 1.0 };
        let hi = a.max(b);
        let lo = a.min(b);
        assert_eq!((hi.azimuth, hi.elevation, hi.range, hi.velocity), (1.0, 0.2, 80.0, 2.0));
        assert_eq!((lo.azimuth, lo.elevation, lo.range, lo.velocity), (0.5, 0.0, 50.0, 1.0));
    }
}
