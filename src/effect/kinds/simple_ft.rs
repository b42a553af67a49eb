//! Simple false-target flooding.
//!
//! Estimates how many false targets a pulsed jammer paints into one radar
//! frame without generating any blips, and declares the radar flooded once
//! that count reaches the radar's false-target capacity. The count is the
//! frame's false-target budget scaled by the fraction of the scan in which
//! the jammer is detectable and by the radius factors.

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::false_target::{false_target_density, frame_false_targets, Victim};
use crate::effect::{ApplyScope, EffectCore, EffectDataMap, EffectKind, InitScope, LayerStack, UpdateScope};
use crate::em::{wrap_pi, AntennaPattern, ScanMode, ScreenerLimits, Transmitter};
use crate::error::{ConfigError, EwResult};
use crate::ids::RcvrId;
use crate::mask::{Behavior, Coherency, SystemFunction};
use crate::random::EffectRandom;
use crate::result::InteractionResult;

/// Jamming pulse density before any false-target count drives it.
const DEFAULT_DENSITY: f64 = 0.1;

/// False targets per frame and radar capacity when neither is configured.
const DEFAULT_FALSE_TARGETS: u32 = 1000;

/// Bounds of the angular step used to walk the scan volume (rad).
const MIN_SCAN_STEP: f64 = 0.25 * PI / 180.0;
const MAX_SCAN_STEP: f64 = PI / 180.0;

/// Radius factors below this exclude their side of the jammer entirely.
const EXCLUDED_FACTOR: f64 = 1.0e-3;

/// Flooding parameters for one system type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleFtData {
    /// False targets per frame when the pulse density is derived.
    pub number_of_fts: u32,
    /// Radar false-target capacity; falls back to the screener's track
    /// capacity.
    pub capacity: Option<u32>,
    /// Fraction of a beamwidth the jammer must fill to be detected.
    pub detect_beamwidth_ratio: f64,
    /// Reuses a capacity-reaching count for the rest of the frame.
    pub update_once_per_frame: bool,
    /// Draws flooding at random below capacity.
    pub random_draw: bool,
}

impl Default for SimpleFtData {
    fn default() -> Self {
        Self {
            number_of_fts: DEFAULT_FALSE_TARGETS,
            capacity: None,
            detect_beamwidth_ratio: 1.0,
            update_once_per_frame: false,
            random_draw: false,
        }
    }
}

impl SimpleFtData {
    fn validate(&self, effect: &str) -> Result<(), ConfigError> {
        if self.number_of_fts == 0 {
            return Err(ConfigError::invalid_value(format!("{effect}.number_of_fts"), "must be > 0"));
        }
        if self.capacity == Some(0) {
            return Err(ConfigError::invalid_value(format!("{effect}.capacity"), "must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.detect_beamwidth_ratio) {
            return Err(ConfigError::invalid_value(
                format!("{effect}.detect_beamwidth_ratio"),
                "must be in [0, 1]",
            ));
        }
        Ok(())
    }

    fn capacity(&self, screener: Option<&ScreenerLimits>) -> u32 {
        self.capacity
            .or_else(|| screener.map(|s| s.track_capacity))
            .unwrap_or(DEFAULT_FALSE_TARGETS)
    }
}

/// Last count seen by one victim receiver.
#[derive(Debug, Clone, Copy, Default)]
struct SensorRecord {
    updated_at: Option<f64>,
    number_of_fts: u32,
    flooded: bool,
}

/// Fraction of the scan in which the jammer is detectable, plus the number
/// of detectable scan points inside the screener's force sector.
struct ScanCoverage {
    ratio: f64,
    sector_points: f64,
}

/// Floods a radar with false targets.
#[derive(Debug, Clone, Default)]
pub struct SimpleFalseTarget {
    data: EffectDataMap<SimpleFtData>,
    pattern: Option<Arc<dyn AntennaPattern>>,
    sensors: HashMap<RcvrId, SensorRecord>,
    number_of_fts: u32,
    capacity: u32,
    flooded: bool,
    force_allowed: bool,
}

impl SimpleFalseTarget {
    /// Flooding with default parameters for every type; without a victim
    /// pattern the jammer counts as detectable over the whole scan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flooding that walks the victim's main antenna pattern.
    #[must_use]
    pub fn with_pattern(pattern: Arc<dyn AntennaPattern>) -> Self {
        Self {
            pattern: Some(pattern),
            ..Self::default()
        }
    }

    /// Per-type flooding data.
    pub fn data_mut(&mut self) -> &mut EffectDataMap<SimpleFtData> {
        &mut self.data
    }

    /// False targets counted by the last update.
    #[must_use]
    pub fn number_of_false_targets(&self) -> u32 {
        self.number_of_fts
    }

    /// Capacity used by the last update.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// True if the last update flooded the radar.
    #[must_use]
    pub fn is_flooded(&self) -> bool {
        self.flooded
    }

    /// True if the screener forced the real target through.
    #[must_use]
    pub fn is_force_allowed(&self) -> bool {
        self.force_allowed
    }

    fn flooded_now(&self, random: &mut EffectRandom, random_draw: bool) -> bool {
        if self.force_allowed {
            return false;
        }
        let (count, capacity) = (self.number_of_fts, self.capacity);
        if random_draw && count > 0 && random.uniform() > f64::from(capacity) / f64::from(count) {
            return true;
        }
        count >= capacity
    }

    // Walks the scan volume in rows and counts the points where the
    // pattern gain falls inside the detection window for enough
    // consecutive steps to fill the required part of a beamwidth.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn scan_coverage(
        pattern: &dyn AntennaPattern,
        scope: &UpdateScope<'_>,
        radar: &Transmitter,
        jammer: &Transmitter,
        gains: (f64, f64),
        ratio: f64,
        screener: &ScreenerLimits,
    ) -> ScanCoverage {
        let env = scope.env;
        let antenna = &radar.antenna;
        let step = |beamwidth: f64| (beamwidth * ratio).clamp(MIN_SCAN_STEP, MAX_SCAN_STEP);
        let scans_az = matches!(antenna.scan_mode, ScanMode::Azimuth | ScanMode::AzimuthAndElevation);
        let scans_el = matches!(antenna.scan_mode, ScanMode::Elevation | ScanMode::AzimuthAndElevation);
        let (mut az_limits, az_step) = if scans_az {
            (antenna.azimuth_scan_limits, step(antenna.azimuth_beamwidth))
        } else {
            ((0.0, 0.0), MAX_SCAN_STEP)
        };
        let (mut el_limits, el_step) = if scans_el {
            (antenna.elevation_scan_limits, step(antenna.elevation_beamwidth))
        } else {
            ((0.0, 0.0), MAX_SCAN_STEP)
        };
        let beam = &env.jammer_to_target.rcvr_beam;
        az_limits = (az_limits.0 + beam.azimuth, az_limits.1 + beam.azimuth);
        el_limits = (el_limits.0 + beam.elevation, el_limits.1 + beam.elevation);

        // Rows run along the scanning axis; elevation-only scans swap axes.
        let elevation_only = antenna.scan_mode == ScanMode::Elevation;
        let (rows, row_step, cols, col_step, points_per_beam) = if elevation_only {
            (az_limits, az_step, el_limits, el_step, antenna.elevation_beamwidth / el_step + 1.0)
        } else {
            (el_limits, el_step, az_limits, az_step, antenna.azimuth_beamwidth / az_step + 1.0)
        };
        let required = (ratio * points_per_beam + 1.0) as i64;
        let row_count = ((rows.1 - rows.0) / row_step + 1.0) as i64;
        let col_count = ((cols.1 - cols.0) / col_step + 1.0) as i64;
        let total = row_count * (col_count - (required - 1));
        if total <= 0 {
            return ScanCoverage {
                ratio: 1.0,
                sector_points: 0.0,
            };
        }

        let (min_gain, max_gain) = gains;
        let target = env.target;
        let target_azimuth = target.rcvr_to_target.azimuth;
        let mut count = 0.0;
        let mut sector_points = 0.0;
        for row in 0..row_count {
            let row_angle = rows.0 + row as f64 * row_step;
            let mut consecutive = 0;
            for col in 0..col_count {
                let col_angle = cols.0 + col as f64 * col_step;
                let (az, el) = if elevation_only {
                    normalize_az_el(row_angle, col_angle)
                } else {
                    normalize_az_el(col_angle, row_angle)
                };
                let gain = pattern.gain(
                    jammer.frequency,
                    az,
                    el,
                    target.rcvr_beam.ebs_azimuth,
                    target.rcvr_beam.ebs_elevation,
                );
                if (min_gain..=max_gain).contains(&gain) {
                    consecutive += 1;
                    if consecutive >= required {
                        count += 1.0;
                        if screener.in_sector(az, target_azimuth) {
                            sector_points += 1.0;
                        }
                    }
                } else {
                    consecutive = 0;
                }
            }
        }
        ScanCoverage {
            ratio: count / total as f64,
            sector_points,
        }
    }

    // Replaces the last state with the frame record when the radar already
    // reached capacity this frame.
    fn reuse_frame_record(&mut self, receiver: RcvrId, sim_time: f64, frame_time: f64) -> bool {
        let Some(record) = self.sensors.get(&receiver) else {
            return false;
        };
        let Some(updated_at) = record.updated_at else {
            return false;
        };
        if sim_time - updated_at >= frame_time || record.number_of_fts < self.capacity {
            return false;
        }
        self.number_of_fts = record.number_of_fts;
        self.flooded = record.flooded;
        true
    }
}

/// Folds an elevation past either pole back over it.
fn normalize_az_el(mut az: f64, mut el: f64) -> (f64, f64) {
    el = wrap_pi(el);
    if el > FRAC_PI_2 {
        el = PI - el;
        az += PI;
    } else if el < -FRAC_PI_2 {
        el = -PI - el;
        az += PI;
    }
    (wrap_pi(az), el)
}

impl EffectKind for SimpleFalseTarget {
    fn kind_name(&self) -> &'static str {
        "simple_false_target"
    }

    fn layers(&self) -> LayerStack {
        LayerStack::pulse()
    }

    fn default_coherency(&self) -> Coherency {
        Coherency::COHERENT_PULSE
    }

    fn default_behavior(&self) -> Behavior {
        Behavior::PULSE_EFFECT
    }

    fn attack_functions(&self) -> SystemFunction {
        SystemFunction::SENSOR
    }

    fn initialize(&mut self, core: &EffectCore, layers: &mut LayerStack, _scope: &InitScope<'_>) -> EwResult<()> {
        self.sensors.clear();
        let keys: Vec<_> = self.data.entries().map(|(key, _)| key.cloned()).collect();
        for key in keys {
            self.data.get(key.as_ref()).validate(core.name())?;
            let pulse = &mut layers.data_mut().get_mut(key.as_ref()).pulse;
            if !pulse.explicit_density {
                pulse.set_jamming_pulse_density(DEFAULT_DENSITY, false);
            }
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::too_many_lines)]
    fn update(&mut self, scope: &mut UpdateScope<'_>) {
        self.number_of_fts = 0;
        self.flooded = false;
        self.force_allowed = false;

        let env = scope.env;
        let (Some(radar), Some(receiver), Some(jammer)) = (env.radar(), env.receiver(), env.jammer()) else {
            return;
        };
        let Some(mode) = receiver.mode.as_ref() else {
            trace!(effect = %scope.core.name(), "victim receiver has no sensor mode");
            return;
        };
        if env.target_platform().is_none() {
            return;
        }
        let victim = Victim { radar, receiver, mode };
        let key = scope.key();
        let data = *self.data.get(key.as_ref());
        let screener = mode.screener.unwrap_or_default();
        self.capacity = data.capacity(mode.screener.as_ref());

        let pulse = scope.layers.data_for(key.as_ref()).pulse;
        if !pulse.explicit_density && mode.frame_time > 0.0 {
            if radar.pulse_width > 0.0 {
                let density = false_target_density(
                    f64::from(data.number_of_fts),
                    mode.frame_time,
                    radar.pulse_width,
                    victim.pulses_integrated(),
                );
                scope
                    .layers
                    .data_mut()
                    .get_mut(key.as_ref())
                    .pulse
                    .set_jamming_pulse_density(density, false);
                scope.layers.refresh_pulse_density(key.as_ref());
            } else {
                warn!(effect = %scope.core.name(), radar = %radar.id, "radar pulse width unset, density unchanged");
            }
        }

        let density = scope.layers.jamming_pulse_density().unwrap_or(1.0);
        if (density - 1.0).abs() >= 1.0e-3 {
            if scope.result.has(Behavior::FLOODED_BLOCKED) {
                trace!(effect = %scope.core.name(), "radar already flooded");
                return;
            }
            if data.update_once_per_frame && self.reuse_frame_record(receiver.id, env.sim_time, mode.frame_time) {
                trace!(effect = %scope.core.name(), "radar capacity already met this frame");
                return;
            }
        }

        let view = scope.view();
        let powers = env.propagation.jammer_powers(env.sim_time, jammer, env.target, Some(&view));
        let own = &scope.layers.data_for(key.as_ref()).power;
        let carried = &powers.effects;
        let jammer_power = powers.coherent
            * carried.signal.signal_power_gain
            * carried.coherent.modulation_gain
            * carried.coherent.j_to_x_gain
            * carried.coherent.pulse_suppression
            * own.jamming_power_gain
            * own.modulation_gain
            * own.signal_power_gain;
        let beam_gain = match env.jammer_to_target.rcvr_beam.gain {
            g if g > 0.0 => g,
            _ => 1.0,
        };
        let normalized_jnr =
            receiver.signal_to_noise(jammer_power / beam_gain, env.jammer_to_target.clutter_power, 0.0);
        if normalized_jnr <= 0.0 {
            return;
        }

        let peak_gain = self.pattern.as_ref().map_or(beam_gain, |p| p.peak_gain(jammer.frequency));
        if normalized_jnr * peak_gain < receiver.detection_threshold {
            return;
        }

        let mut min_gain = receiver.detection_threshold / normalized_jnr;
        let mut max_gain = f64::MAX;
        if screener.reports_snr {
            let target_gain = env.target.rcvr_beam.gain;
            min_gain = min_gain.max(target_gain / screener.force_j_to_s_delta / normalized_jnr);
            max_gain = max_gain.min(target_gain * screener.force_j_to_s_delta / normalized_jnr);
        }
        let coverage = match self.pattern.as_deref() {
            Some(pattern) => Self::scan_coverage(
                pattern,
                scope,
                radar,
                jammer,
                (min_gain, max_gain),
                data.detect_beamwidth_ratio,
                &screener,
            ),
            None => ScanCoverage {
                ratio: 1.0,
                sector_points: 0.0,
            },
        };

        let mut max_fts = f64::from(data.number_of_fts);
        if pulse.explicit_density {
            if radar.pulse_width > 0.0 {
                max_fts = frame_false_targets(density, mode.frame_time, radar.pulse_width, victim.pulses_integrated());
            } else if scope.core.is_debug() {
                debug!(effect = %scope.core.name(), radar = %radar.id, "radar pulse width unset, false-target count unchanged");
            }
        }

        // Radius factors thin the field on either side of the jammer and
        // may push the real target outside the false-target band.
        let radius = scope.layers.data_for(key.as_ref()).radius;
        let mut inside = radius.inside.unwrap_or(1.0);
        let outside = radius.outside.unwrap_or(1.0);
        if mode.frequency_agile {
            inside = 0.0;
        }
        let mut radius_ratio = 1.0;
        let mut sector_points = coverage.sector_points;
        if inside < 1.0 || outside < 1.0 {
            let jammer_range = env.jammer_to_target.rcvr_to_xmtr.range;
            let max_range = victim.max_range();
            let fraction = if max_range > 0.0 { (jammer_range / max_range).min(1.0) } else { 1.0 };
            radius_ratio = inside * fraction + outside * (1.0 - fraction);

            let min_ft_range = if inside < EXCLUDED_FACTOR { jammer_range } else { 0.0 };
            let max_ft_range = if outside < EXCLUDED_FACTOR { jammer_range } else { max_range };
            let target_range = env.target.rcvr_to_target.range;
            let (sector_min, sector_max) = screener.range_window(target_range);
            if sector_min > max_ft_range || sector_max < min_ft_range {
                sector_points = 0.0;
            } else if max_ft_range > min_ft_range {
                let in_band = (sector_max.min(max_ft_range) - sector_min.max(min_ft_range)).max(0.0);
                sector_points *= (in_band / (max_ft_range - min_ft_range)).min(1.0);
            }

            let forced_inside = screener.range_force.inside() && target_range <= min_ft_range;
            let forced_outside = screener.range_force.outside() && target_range >= max_ft_range;
            self.force_allowed = forced_inside || forced_outside;
        }

        let added = (max_fts * coverage.ratio * radius_ratio).max(0.0).min(f64::from(u32::MAX));
        self.number_of_fts = self.number_of_fts.saturating_add(added as u32);
        if !self.force_allowed
            && screener.force_count_per_sector > 0
            && sector_points <= f64::from(screener.force_count_per_sector)
        {
            self.force_allowed = true;
        }
        self.flooded = self.flooded_now(scope.core.random(), data.random_draw);

        if data.update_once_per_frame {
            self.sensors.insert(
                receiver.id,
                SensorRecord {
                    updated_at: Some(env.sim_time),
                    number_of_fts: self.number_of_fts,
                    flooded: self.flooded,
                },
            );
        }

        if scope.core.is_debug() {
            debug!(
                effect = %scope.core.name(),
                radar = %radar.id,
                normalized_jnr,
                max_fts,
                density,
                detection_ratio = coverage.ratio,
                radius_ratio,
                false_targets = self.number_of_fts,
                capacity = self.capacity,
                flooded = self.flooded,
                force_allowed = self.force_allowed,
                "simple false-target count updated"
            );
        }
    }

    fn apply_unmitigated(&self, scope: &ApplyScope<'_>, result: &mut InteractionResult) {
        result.mask |= Behavior::PULSE_EFFECT;
        scope.layers_unmitigated(result);
        if self.flooded {
            result.mask |= Behavior::FLOODED_BLOCKED;
        }
    }

    fn supports_density_scaling(&self) -> bool {
        true
    }

    kind_any!();
}
