//! Sidelobe canceler.
//!
//! The canceler compares jammer power in the main channel against an
//! auxiliary antenna. A jammer that is much stronger in the auxiliary
//! channel is in the sidelobes and gets a cancellation factor from a
//! ratio table keyed by the number of jammers being canceled and the main
//! channel J/N. Once more jammers need canceling than the canceler has
//! channels it stalls and the saturation table (count 0) applies.
//!
//! ```text
//!            main <= noise or aux <= noise
//!   Off <──────────────────────────────── any (record dropped)
//!   MainLobe      ratio/J/N/pulse width outside limits
//!   Canceling     eligible, canceled <= channels
//!   Stalled       eligible, canceled >  channels
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::AuxChannel;
use crate::effect::{ApplyScope, Effect, EffectCore, EffectKind, InitScope, LayerStack, SlcDegradation, UpdateScope};
use crate::em::AntennaPattern;
use crate::error::{ConfigError, EwResult};
use crate::ids::XmtrId;
use crate::mask::{Behavior, Coherency};
use crate::result::InteractionResult;
use crate::table::Curve;

/// Canceler state after the last update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelerState {
    #[default]
    Off,
    Canceling,
    MainLobe,
    Stalled,
}

/// How the table count is formed for each canceled jammer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationMethod {
    /// One table for every count; missing counts reuse count 1.
    #[default]
    None,
    /// Every jammer uses the total number canceled.
    Sum,
    /// Each jammer uses the running count up to and including itself.
    Incremental,
}

/// Canceler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlcConfig {
    /// Minimum aux/main power ratio to lock.
    pub lock_ratio: f64,
    /// Main channel J/N window.
    pub main_thresholds: (f64, f64),
    /// Auxiliary channel J/N window.
    pub aux_thresholds: (f64, f64),
    /// Shortest jammer pulse the loop can cancel (s).
    pub minimum_pulse_width: f64,
    /// Loop settling time (s).
    pub loop_settling_time: f64,
    /// Canceler channels.
    pub channels: u32,
    pub method: CancellationMethod,
    /// Cancellation ratio vs. J/N, per canceled count; count 0 is the
    /// saturation table.
    pub ratios: BTreeMap<u32, Curve>,
}

impl Default for SlcConfig {
    fn default() -> Self {
        Self {
            lock_ratio: 100.0,
            main_thresholds: (0.0, f64::MAX),
            aux_thresholds: (0.0, f64::MAX),
            minimum_pulse_width: 0.0,
            loop_settling_time: 0.0,
            channels: 1,
            method: CancellationMethod::None,
            ratios: BTreeMap::new(),
        }
    }
}

impl SlcConfig {
    /// Adds a cancellation ratio for `count` canceled jammers at `j_to_n`.
    /// Returns false if that J/N is already present.
    pub fn add_ratio(&mut self, count: u32, j_to_n: f64, ratio: f64) -> bool {
        self.ratios.entry(count).or_default().insert(j_to_n, ratio)
    }

    fn validate(&mut self, effect: &str) -> Result<(), ConfigError> {
        if self.ratios.is_empty() {
            return Err(ConfigError::MissingCancellationRatios {
                effect: effect.to_string(),
                count: None,
            });
        }
        for count in 1..=self.channels {
            if self.ratios.contains_key(&count) {
                continue;
            }
            match self.ratios.get(&1) {
                Some(single) if self.method == CancellationMethod::None => {
                    let single = single.clone();
                    self.ratios.insert(count, single);
                }
                _ => {
                    return Err(ConfigError::MissingCancellationRatios {
                        effect: effect.to_string(),
                        count: Some(count),
                    })
                }
            }
        }
        let bad_ratio = self
            .ratios
            .values()
            .flat_map(Curve::points)
            .any(|&(_, ratio)| ratio <= 0.0);
        if bad_ratio {
            return Err(ConfigError::InvalidTable {
                reason: format!("{effect}: cancellation ratios must be > 0"),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cancellation {
    channels: u32,
    j_to_n: f64,
    degrade: f64,
    switching_rate: f64,
    value: f64,
}

/// Sidelobe canceler mitigation.
#[derive(Debug, Clone, Default)]
pub struct SidelobeCanceler {
    config: SlcConfig,
    aux: AuxChannel,
    state: CancelerState,
    records: BTreeMap<XmtrId, Cancellation>,
    canceled: u32,
}

impl SidelobeCanceler {
    /// Creates a canceler; the auxiliary pattern must be set before
    /// initialization.
    #[must_use]
    pub fn new(config: SlcConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Creates a canceler with its auxiliary pattern.
    #[must_use]
    pub fn with_pattern(config: SlcConfig, pattern: Arc<dyn AntennaPattern>) -> Self {
        let mut slc = Self::new(config);
        slc.aux.set_pattern(pattern);
        slc
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &SlcConfig {
        &self.config
    }

    /// Auxiliary channel.
    pub fn aux_mut(&mut self) -> &mut AuxChannel {
        &mut self.aux
    }

    /// State after the last update.
    #[must_use]
    pub fn state(&self) -> CancelerState {
        self.state
    }

    /// Canceler channels currently in use.
    #[must_use]
    pub fn canceled_channels(&self) -> u32 {
        self.canceled
    }

    /// Cancellation factor held for `xmtr`, if it is being canceled.
    #[must_use]
    pub fn cancellation_factor(&self, xmtr: XmtrId) -> Option<f64> {
        self.records.get(&xmtr).map(|r| r.value)
    }

    fn drop_record(&mut self, xmtr: XmtrId) {
        if let Some(record) = self.records.remove(&xmtr) {
            self.canceled = self.canceled.saturating_sub(record.channels);
            trace!(%xmtr, canceled = self.canceled, "jammer dropped from canceler");
        }
    }

    fn evaluate(&mut self, scope: &mut UpdateScope<'_>) -> CancelerState {
        let idle = if self.state == CancelerState::Stalled {
            CancelerState::Stalled
        } else {
            CancelerState::Off
        };
        let env = scope.env;
        let (Some(jammer), Some(receiver), Some(xmtr)) = (env.jammer(), env.receiver(), scope.core.current().xmtr) else {
            return idle;
        };
        let counterpart = scope.counterpart_view();

        let main = env.propagation.jammer_power(env.sim_time, jammer, env.target, counterpart.as_ref());
        if main <= receiver.noise_power {
            self.drop_record(xmtr);
            return idle;
        }
        let main_j_to_n = receiver.signal_to_noise(main, env.target.clutter_power, 0.0);

        self.aux.prepare(receiver);
        let Some((aux_rcvr, pattern)) = self.aux.parts() else {
            return idle;
        };
        let (aux, aux_j_to_n) = env
            .propagation
            .one_way_jammer_power(env.sim_time, jammer, aux_rcvr, Some(pattern), &env.target.rcvr_beam, counterpart.as_ref())
            .map_or((0.0, 0.0), |p| {
                (p.received_power, aux_rcvr.signal_to_noise(p.received_power, p.clutter_power, 0.0))
            });
        if aux <= receiver.noise_power {
            self.drop_record(xmtr);
            return idle;
        }
        let ratio = aux / main;

        let mut pulse_width = jammer.pulse_width;
        if pulse_width <= 0.0 {
            if let (Some(attacker), Some(radar)) = (scope.counterpart.as_deref(), env.radar()) {
                pulse_width = attacker.jamming_pulse_density(jammer) * radar.pulse_repetition_interval;
            }
        }

        if scope.core.is_debug() {
            debug!(
                effect = %scope.core.name(),
                %xmtr,
                aux_to_main = ratio,
                main_j_to_n,
                aux_j_to_n,
                pulse_width,
                "canceler channel powers"
            );
        }

        let cfg = &self.config;
        let main_window = (effective_floor(cfg.main_thresholds.0), cfg.main_thresholds.1);
        let aux_window = (effective_floor(cfg.aux_thresholds.0), cfg.aux_thresholds.1);
        let eligible = ratio >= cfg.lock_ratio
            && within(main_j_to_n, main_window)
            && within(aux_j_to_n, aux_window)
            && pulse_width >= cfg.minimum_pulse_width;
        if !eligible {
            return CancelerState::MainLobe;
        }

        let key = scope.core.current().effecting.clone();
        let mut degradation = scope
            .counterpart
            .as_deref()
            .and_then(|attacker| attacker.slc_degradation(key.as_ref()))
            .unwrap_or(SlcDegradation {
                value: 1.0,
                channels: 1,
                switching_rate: None,
            });
        if let Some(rate) = degradation.switching_rate {
            // A switching period shorter than the loop settling time negates the modulation.
            if degradation.channels > 1 && rate > 0.0 && 1.0 / rate < self.config.loop_settling_time {
                degradation.channels = 1;
                degradation.value = 1.0;
            }
        }
        self.record(xmtr, main_j_to_n, degradation);

        let stalled = self.canceled > self.config.channels;
        self.refresh_values(stalled);
        if stalled {
            CancelerState::Stalled
        } else {
            CancelerState::Canceling
        }
    }

    fn record(&mut self, xmtr: XmtrId, j_to_n: f64, degradation: SlcDegradation) {
        let channels = degradation.channels.max(1);
        let rate = degradation.switching_rate.unwrap_or(0.0);
        match self.records.get_mut(&xmtr) {
            Some(record) => {
                if channels > record.channels {
                    self.canceled = self.canceled - record.channels + channels;
                    record.channels = channels;
                }
                record.j_to_n = j_to_n;
                record.degrade = degradation.value;
                record.switching_rate = record.switching_rate.max(rate);
            }
            None => {
                self.canceled += channels;
                self.records.insert(
                    xmtr,
                    Cancellation {
                        channels,
                        j_to_n,
                        degrade: degradation.value,
                        switching_rate: rate,
                        value: 1.0,
                    },
                );
            }
        }
    }

    fn refresh_values(&mut self, saturated: bool) {
        let mut running = 0;
        for record in self.records.values_mut() {
            let count = match self.config.method {
                CancellationMethod::Incremental => {
                    running += record.channels;
                    running
                }
                CancellationMethod::None | CancellationMethod::Sum => self.canceled,
            };
            let ratio = cancellation_ratio(&self.config.ratios, count, record.j_to_n, saturated);
            record.value = record.degrade / ratio;
        }
    }
}

fn effective_floor(lower: f64) -> f64 {
    if lower <= 1.0e-16 {
        1.0
    } else {
        lower
    }
}

fn within(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}

/// Ratio for `count` canceled jammers at `j_to_n`: the table for the count,
/// else the saturation table when saturated, else the count-1 table.
fn cancellation_ratio(ratios: &BTreeMap<u32, Curve>, count: u32, j_to_n: f64, saturated: bool) -> f64 {
    let table = ratios
        .get(&count)
        .or_else(|| saturated.then(|| ratios.get(&0)).flatten())
        .or_else(|| ratios.get(&1));
    table.and_then(|curve| curve.evaluate(j_to_n)).unwrap_or(1.0)
}

impl EffectKind for SidelobeCanceler {
    fn kind_name(&self) -> &'static str {
        "sidelobe_canceler"
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
        self.config.validate(core.name())?;
        self.state = CancelerState::Off;
        self.records.clear();
        self.canceled = 0;
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
                canceled = self.canceled,
                "canceler state changed"
            );
        }
    }

    // The canceler has nothing to cancel without an attack.
    fn apply_unmitigated(&self, _scope: &ApplyScope<'_>, _result: &mut InteractionResult) {}

    fn apply_mitigated(&self, scope: &ApplyScope<'_>, counterpart: Option<&Effect>, result: &mut InteractionResult) {
        if self.state != CancelerState::Off {
            result.mask |= Behavior::JAMMER_POWER_EFFECT;
        }
        let mut cancellation = 1.0;
        if matches!(self.state, CancelerState::Canceling | CancelerState::Stalled) {
            scope.layers_mitigated(result);
            match scope.core.current().xmtr.and_then(|x| self.cancellation_factor(x)) {
                Some(value) => cancellation = value,
                None => trace!(effect = %scope.core.name(), "no cancellation record for jammer"),
            }
        }
        if scope.core.is_debug() {
            debug!(effect = %scope.core.name(), state = ?self.state, cancellation, "sidelobe cancellation applied");
        }
        let coherency = counterpart.map_or(scope.core.coherency(), Effect::coherency);
        result.for_each_channel(coherency, |g| g.cancellation = g.cancellation.min(cancellation));
    }

    fn remove_jammer(&mut self, xmtr: XmtrId) {
        self.drop_record(xmtr);
    }

    kind_any!();
}
