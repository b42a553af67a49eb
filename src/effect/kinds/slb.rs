//! Sidelobe blanker.
//!
//! Blanks the main channel while a jammer is stronger in the auxiliary
//! antenna than in the main beam. A jammer transmitting near continuously
//! saturates the blanker, and a blanker that triggers on the target's own
//! return can blank the whole track.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::AuxChannel;
use crate::effect::{ApplyScope, Effect, EffectCore, EffectKind, InitScope, LayerStack, UpdateScope};
use crate::em::AntennaPattern;
use crate::error::{ConfigError, EwResult};
use crate::ids::XmtrId;
use crate::mask::{Behavior, Coherency};
use crate::result::InteractionResult;
use crate::table::Curve;

/// Duty cycle at which a jammer is treated as continuous wave.
const CW_DUTY_CYCLE: f64 = 0.99;

/// Blanker state after the last update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlankerState {
    /// No jammer above the receiver noise.
    #[default]
    Off,
    Blanking,
    /// Jammer duty cycle saturates the blanker.
    Stalled,
    MainLobe,
    /// Sidelobe jammer outside the blanker's power windows.
    PowerLimited,
}

/// How the probability of blanking the target itself is found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetBlanking {
    /// The target is never blanked.
    #[default]
    None,
    /// Probability equals the jamming duty cycle.
    DutyCycleProbability,
    /// Probability vs. duty cycle.
    Table(Curve),
}

impl TargetBlanking {
    /// Probability of blanking the target at `duty_cycle`.
    #[must_use]
    pub fn probability(&self, duty_cycle: f64) -> f64 {
        match self {
            Self::None => 0.0,
            Self::DutyCycleProbability => duty_cycle,
            Self::Table(curve) => curve.evaluate(duty_cycle).unwrap_or(duty_cycle),
        }
    }
}

/// Blanker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlbConfig {
    /// Minimum aux/main ratio to blank.
    pub blanking_threshold: f64,
    /// Main channel S/N window; a zero floor takes the receiver's detection
    /// threshold.
    pub main_thresholds: (f64, f64),
    /// Auxiliary channel S/N window.
    pub aux_thresholds: (f64, f64),
    /// Duty cycle at or above which the blanker stalls.
    pub saturation_duty_cycle: Option<f64>,
    pub target_blanking: TargetBlanking,
}

impl Default for SlbConfig {
    fn default() -> Self {
        Self {
            blanking_threshold: 1.0,
            main_thresholds: (0.0, f64::MAX),
            aux_thresholds: (0.0, f64::MAX),
            saturation_duty_cycle: None,
            target_blanking: TargetBlanking::None,
        }
    }
}

/// Sidelobe blanker mitigation.
#[derive(Debug, Clone, Default)]
pub struct SidelobeBlanker {
    config: SlbConfig,
    aux: AuxChannel,
    state: BlankerState,
    blanked: BTreeMap<XmtrId, f64>,
    target_blanked: bool,
}

struct Channels {
    main: f64,
    main_s_to_n: f64,
    aux: f64,
    aux_s_to_n: f64,
}

impl SidelobeBlanker {
    /// Creates a blanker; the auxiliary pattern must be set before
    /// initialization.
    #[must_use]
    pub fn new(config: SlbConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Creates a blanker with its auxiliary pattern.
    #[must_use]
    pub fn with_pattern(config: SlbConfig, pattern: Arc<dyn AntennaPattern>) -> Self {
        let mut slb = Self::new(config);
        slb.aux.set_pattern(pattern);
        slb
    }

    /// Auxiliary channel.
    pub fn aux_mut(&mut self) -> &mut AuxChannel {
        &mut self.aux
    }

    /// State after the last update.
    #[must_use]
    pub fn state(&self) -> BlankerState {
        self.state
    }

    /// True if the last update blanked the target itself.
    #[must_use]
    pub fn target_blanked(&self) -> bool {
        self.target_blanked
    }

    /// Blanking factor for `xmtr`; 1.0 when it is not being blanked.
    #[must_use]
    pub fn blanking_factor(&self, xmtr: XmtrId) -> f64 {
        self.blanked.get(&xmtr).copied().unwrap_or(1.0)
    }

    fn measure(&mut self, scope: &UpdateScope<'_>, duty_cycle: f64) -> Option<Channels> {
        let env = scope.env;
        let (jammer, receiver) = (env.jammer()?, env.receiver()?);
        let counterpart = scope.counterpart_view();

        let mut main = env.propagation.jammer_power(env.sim_time, jammer, env.target, counterpart.as_ref());
        if main <= 0.0 {
            return None;
        }
        let mut main_s_to_n = receiver.signal_to_noise(main, env.target.clutter_power, 0.0);

        self.aux.prepare(receiver);
        let (aux_rcvr, pattern) = self.aux.parts()?;
        let (mut aux, mut aux_s_to_n) = env
            .propagation
            .one_way_jammer_power(env.sim_time, jammer, aux_rcvr, Some(pattern), &env.target.rcvr_beam, counterpart.as_ref())
            .map_or((0.0, 0.0), |p| {
                (p.received_power, aux_rcvr.signal_to_noise(p.received_power, p.clutter_power, 0.0))
            });

        // Against continuous jamming the blanker also sees the target return.
        let real_target = env.target_platform().is_some_and(|t| !t.false_target);
        if duty_cycle >= CW_DUTY_CYCLE && real_target {
            if let Some(ret) = env.propagation.target_return(env.target, receiver, None) {
                if ret.received_power > main {
                    main_s_to_n = receiver.signal_to_noise(ret.received_power, ret.clutter_power, main);
                    main = ret.received_power;
                }
            }
            if let Some(ret) = env.propagation.target_return(env.target, aux_rcvr, Some(pattern)) {
                if ret.received_power > aux {
                    aux_s_to_n = aux_rcvr.signal_to_noise(ret.received_power, ret.clutter_power, aux);
                    aux = ret.received_power;
                }
            }
        }

        Some(Channels {
            main,
            main_s_to_n,
            aux,
            aux_s_to_n,
        })
    }

    fn evaluate(&mut self, scope: &mut UpdateScope<'_>) -> BlankerState {
        self.target_blanked = false;
        let env = scope.env;
        let (Some(jammer), Some(receiver), Some(xmtr)) = (env.jammer(), env.receiver(), scope.core.current().xmtr) else {
            return BlankerState::Off;
        };
        let draw = scope.core.random().uniform();
        let duty_cycle = scope
            .counterpart
            .as_deref()
            .map_or_else(|| jammer.duty_cycle(), |attacker| attacker.jamming_pulse_density(jammer));

        let Some(channels) = self.measure(scope, duty_cycle) else {
            return BlankerState::Off;
        };
        let ratio = channels.aux / channels.main;
        if scope.core.is_debug() {
            debug!(
                effect = %scope.core.name(),
                %xmtr,
                aux_to_main = ratio,
                main_s_to_n = channels.main_s_to_n,
                aux_s_to_n = channels.aux_s_to_n,
                duty_cycle,
                "blanker channel powers"
            );
        }

        let aux_floor = self.aux.parts().map_or(receiver.detection_threshold, |(r, _)| r.detection_threshold);
        let cfg = &self.config;
        let main_window = (floor_or(cfg.main_thresholds.0, receiver.detection_threshold), cfg.main_thresholds.1);
        let aux_window = (floor_or(cfg.aux_thresholds.0, aux_floor), cfg.aux_thresholds.1);

        let state = if cfg.saturation_duty_cycle.is_some_and(|limit| duty_cycle >= limit) {
            self.blanked.clear();
            BlankerState::Stalled
        } else if ratio >= cfg.blanking_threshold {
            if within(channels.main_s_to_n, main_window) && within(channels.aux_s_to_n, aux_window) {
                self.blanked.insert(xmtr, 0.0);
                BlankerState::Blanking
            } else {
                BlankerState::PowerLimited
            }
        } else {
            BlankerState::MainLobe
        };

        let real_target = env.target_platform().is_some_and(|t| !t.false_target);
        if state == BlankerState::Blanking && real_target && self.config.target_blanking != TargetBlanking::None {
            let probability = self.config.target_blanking.probability(duty_cycle);
            self.target_blanked = draw <= probability;
            if scope.core.is_debug() {
                debug!(
                    effect = %scope.core.name(),
                    probability,
                    draw,
                    blanked = self.target_blanked,
                    "target blanking draw"
                );
            }
        }
        state
    }
}

fn floor_or(lower: f64, default: f64) -> f64 {
    if lower <= 1.0e-16 {
        default
    } else {
        lower
    }
}

fn within(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}

impl EffectKind for SidelobeBlanker {
    fn kind_name(&self) -> &'static str {
        "sidelobe_blanker"
    }

    fn layers(&self) -> LayerStack {
        LayerStack::power()
    }

    fn default_coherency(&self) -> Coherency {
        Coherency::ALL
    }

    fn default_behavior(&self) -> Behavior {
        Behavior::JAMMER_POWER_EFFECT
    }

    fn initialize(&mut self, core: &EffectCore, _layers: &mut LayerStack, _scope: &InitScope<'_>) -> EwResult<()> {
        self.aux.validate(core.name())?;
        if let Some(limit) = self.config.saturation_duty_cycle {
            if !(0.0..=1.0).contains(&limit) {
                return Err(ConfigError::invalid_value(
                    format!("{}.saturation_duty_cycle", core.name()),
                    "must be in [0, 1]",
                )
                .into());
            }
        }
        self.state = BlankerState::Off;
        self.blanked.clear();
        self.target_blanked = false;
        Ok(())
    }

    fn update(&mut self, scope: &mut UpdateScope<'_>) {
        let previous = self.state;
        self.state = self.evaluate(scope);
        if self.state != previous {
            debug!(
                effect = %scope.core.name(),
                from = ?previous,
                to = ?self.state,
                "blanker state changed"
            );
        }
    }

    fn apply_unmitigated(&self, _scope: &ApplyScope<'_>, _result: &mut InteractionResult) {}

    fn apply_mitigated(&self, scope: &ApplyScope<'_>, counterpart: Option<&Effect>, result: &mut InteractionResult) {
        if self.state != BlankerState::Off {
            result.mask |= Behavior::JAMMER_POWER_EFFECT;
            scope.layers_mitigated(result);
        }
        let mut blanking = 1.0;
        if self.state == BlankerState::Blanking {
            match scope.core.current().xmtr.and_then(|x| self.blanked.get(&x)) {
                Some(&value) => blanking = value,
                None => trace!(effect = %scope.core.name(), "no blanking record for jammer"),
            }
        }
        let coherency = counterpart.map_or(scope.core.coherency(), Effect::coherency);
        result.for_each_channel(coherency, |g| g.blanking *= blanking);
        if self.target_blanked {
            result.mask |= Behavior::DROP_TRACK;
        }
        if scope.core.is_debug() {
            debug!(
                effect = %scope.core.name(),
                state = ?self.state,
                blanking,
                target_blanked = self.target_blanked,
                "sidelobe blanking applied"
            );
        }
    }

    fn remove_jammer(&mut self, xmtr: XmtrId) {
        if self.blanked.remove(&xmtr).is_some() {
            trace!(%xmtr, "jammer dropped from blanker");
        }
    }

    kind_any!();
}
