//! Repeater automatic gain control.
//!
//! The repeater sizes its output so the received jammer power meets the
//! largest of the enabled power criteria, then scales that requirement by
//! where the radar's transmit gain toward the jammer sits between the
//! pattern minimum and peak.

use serde::{Deserialize, Serialize};

use super::{GainLayer, LayerApply, LayerUpdate};
use crate::error::ConfigError;
use crate::mask::{Behavior, Coherency, GainControl};
use crate::result::InteractionResult;
use crate::table::lerp;

/// Where the repeater takes the radar antenna gains from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMethod {
    /// Gain control disabled.
    #[default]
    None,
    /// Radar antenna pattern toward the jammer.
    Actuals,
    /// Gains reported by a repeater update.
    Repeater,
    /// Repeater update when present, otherwise the antenna pattern.
    RepeaterActuals,
}

/// Repeater configuration for one system type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeaterData {
    pub control: ControlMethod,
    pub min_factor: f64,
    pub max_factor: f64,
    pub gain_control: GainControl,
    pub desired_j_to_n: f64,
    pub desired_j_to_s: f64,
    /// Desired false-target radar cross section (m^2).
    pub desired_ft_rcs: f64,
    pub masking_factor: f64,
    pub min_detect_factor: f64,
}

impl Default for RepeaterData {
    fn default() -> Self {
        Self {
            control: ControlMethod::None,
            min_factor: 0.0,
            max_factor: f64::MAX,
            gain_control: GainControl::empty(),
            desired_j_to_n: 1.0,
            desired_j_to_s: 1.0,
            desired_ft_rcs: 1000.0,
            masking_factor: 1.0,
            min_detect_factor: 1.0,
        }
    }
}

impl RepeaterData {
    /// Enables the minimum J/N criterion.
    pub fn set_desired_j_to_n(&mut self, value: f64) {
        self.desired_j_to_n = value;
        self.gain_control |= GainControl::MIN_J_TO_N;
    }

    /// Enables the minimum J/S criterion.
    pub fn set_desired_j_to_s(&mut self, value: f64) {
        self.desired_j_to_s = value;
        self.gain_control |= GainControl::MIN_J_TO_S;
    }

    /// Enables the desired false-target RCS criterion.
    pub fn set_desired_ft_rcs(&mut self, value: f64) {
        self.desired_ft_rcs = value;
        self.gain_control |= GainControl::DESIRED_RCS;
    }

    /// Enables the masking criterion.
    pub fn set_masking_factor(&mut self, value: f64) {
        self.masking_factor = value;
        self.gain_control |= GainControl::MASKING;
    }

    /// Enables the minimum-detect criterion.
    pub fn set_min_detect_factor(&mut self, value: f64) {
        self.min_detect_factor = value;
        self.gain_control |= GainControl::MIN_DETECT;
    }

    pub(super) fn validate(&self, effect: &str) -> Result<(), ConfigError> {
        if self.min_factor < 0.0 || self.min_factor > self.max_factor {
            return Err(ConfigError::invalid_value(
                format!("{effect}.repeater.min_factor"),
                format!("must be in [0, max_factor = {}]", self.max_factor),
            ));
        }
        Ok(())
    }
}

/// Runtime repeater state.
#[derive(Debug, Clone)]
pub struct RepeaterLayer {
    factor: f64,
    min_gain_factor: f64,
    max_gain_factor: f64,
}

impl Default for RepeaterLayer {
    fn default() -> Self {
        Self {
            factor: 1.0,
            min_gain_factor: 1.0,
            max_gain_factor: 1.0,
        }
    }
}

impl RepeaterLayer {
    /// Factor from the last update.
    #[must_use]
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Factors at the pattern peak and minimum from the last update.
    #[must_use]
    pub fn gain_factor_bounds(&self) -> (f64, f64) {
        (self.min_gain_factor, self.max_gain_factor)
    }

    pub(super) fn update(&mut self, scope: &LayerUpdate<'_>, data: &RepeaterData) {
        self.factor = 1.0;
        if data.control == ControlMethod::None {
            return;
        }

        let env = scope.env;
        let target = env.target;
        let has_update = scope.result.has(Behavior::REPEATER_UPDATE);
        // [minimum, current, peak]
        let mut gains = [1.0, 1.0, 1.0];
        let use_update = has_update && matches!(data.control, ControlMethod::Repeater | ControlMethod::RepeaterActuals);
        let use_actuals = data.control == ControlMethod::Actuals
            || (data.control == ControlMethod::RepeaterActuals && !has_update);
        if use_update {
            let r = &scope.result.repeater;
            gains = [r.min_gain, r.gain, r.peak_gain];
        } else if use_actuals {
            if let (Some(radar), Some(jammer)) = (env.radar(), env.jammer()) {
                if let Some(g) = env.propagation.transmitter_gains_toward(radar, jammer, target) {
                    gains = [g.minimum, g.current, g.peak];
                }
            }
        }

        self.update_gain_factors(scope, data, &gains);
        let factor = lerp(gains[1], gains[2], gains[0], self.min_gain_factor, self.max_gain_factor);
        self.factor = factor.min(data.max_factor).max(data.min_factor);

        if scope.core.is_debug() {
            tracing::debug!(
                effect = %scope.core.name(),
                min_gain = gains[0],
                gain = gains[1],
                peak_gain = gains[2],
                min_gain_factor = self.min_gain_factor,
                max_gain_factor = self.max_gain_factor,
                repeater_factor = self.factor,
                "repeater factor updated"
            );
        }
    }

    fn update_gain_factors(&mut self, scope: &LayerUpdate<'_>, data: &RepeaterData, gains: &[f64; 3]) {
        let mask = data.gain_control;
        if mask.is_empty() {
            return;
        }
        let env = scope.env;
        let (Some(jammer), Some(rcvr)) = (env.jammer(), env.receiver()) else {
            return;
        };
        let target = env.target;
        let Some(one_way) =
            env.propagation
                .one_way_jammer_power(env.sim_time, jammer, rcvr, None, &target.rcvr_beam, None)
        else {
            return;
        };
        if one_way.received_power <= 0.0 || one_way.receiver_beam_gain <= 0.0 {
            return;
        }

        let coherent = scope.core.coherency().intersects(Coherency::COHERENT | Coherency::COHERENT_PULSE);
        let noise = rcvr.noise_power * rcvr.noise_multiplier;
        let clutter = target.clutter_power;
        let rcvd = target.received_power;
        let threshold = if target.detection_threshold > 0.0 {
            target.detection_threshold
        } else {
            rcvr.detection_threshold
        };

        let mut required: f64 = 0.0;
        if mask.contains(GainControl::MIN_J_TO_N) {
            let floor = if coherent { noise + clutter } else { noise };
            required = required.max(floor * data.desired_j_to_n);
        }
        if mask.contains(GainControl::MIN_J_TO_S) {
            required = required.max(rcvd * data.desired_j_to_s);
        }
        if mask.contains(GainControl::MIN_DETECT) {
            let detect = if coherent { threshold * (noise + clutter) } else { noise };
            required = required.max(detect * data.min_detect_factor);
        }
        if mask.contains(GainControl::MASKING) {
            let masking = if target.target.is_some() && coherent {
                Some(rcvd)
            } else if threshold > 0.0 {
                Some(rcvd / threshold - noise - clutter)
            } else {
                None
            };
            if let Some(masking) = masking {
                required = required.max(masking * data.masking_factor);
            }
        }
        if mask.contains(GainControl::DESIRED_RCS) && coherent {
            if let Some(platform) = target.target.as_ref() {
                let mut rcs_power = rcvd;
                if platform.false_target && target.radar_signature > 0.0 {
                    rcs_power *= data.desired_ft_rcs / target.radar_signature;
                }
                required = required.max(rcs_power);
            }
        }

        let ratio = required / one_way.received_power;
        self.min_gain_factor = ratio * (gains[2] / one_way.receiver_beam_gain);
        self.max_gain_factor = ratio * (gains[0] / one_way.receiver_beam_gain);
    }
}

impl GainLayer for RepeaterLayer {
    fn apply_unmitigated(&self, scope: &LayerApply<'_>, result: &mut InteractionResult) {
        if scope.data.repeater.control == ControlMethod::None {
            return;
        }
        result.mask |= Behavior::REPEATER_EFFECT;
        let factor = self.factor;
        result.for_each_channel(scope.core.coherency(), |g| g.repeater_factor *= factor);
    }

    fn apply_mitigated(&self, _scope: &LayerApply<'_>, _result: &mut InteractionResult) {}
}
