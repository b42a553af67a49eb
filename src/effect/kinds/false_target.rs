//! False-target jamming.
//!
//! Sizes and positions the false-target field the generator draws blips
//! from. The number of false targets and the jamming pulse density are two
//! views of the same quantity: whichever one is configured drives the other
//! against the victim radar's pulse width and integration.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::effect::layers::PulseData;
use crate::effect::{ApplyScope, EffectCore, EffectDataMap, EffectKind, InitScope, LayerStack, UpdateScope};
use crate::em::{Receiver, SensorMode, Transmitter, EARTH_RADIUS, SPEED_OF_LIGHT};
use crate::error::{ConfigError, EwResult};
use crate::false_target::{
    BearingReference, BlipBehavior, FalseTarget, FtHandle, PlatformBehavior, RadarBehavior,
};
use crate::ids::SystemTypeId;
use crate::mask::{Behavior, Coherency, SystemFunction};
use crate::result::InteractionResult;

/// Jamming pulse density of a false-target effect left unconfigured.
const DEFAULT_DENSITY: f64 = 0.1;

/// Altitude of the default field centroid, and the floor of the horizon
/// calculation (m).
const REFERENCE_ALTITUDE: f64 = 9144.0;

/// Where an effect's false-target record comes from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FtSource {
    /// A private record built from defaults.
    #[default]
    Auto,
    /// A definition in the false-target registry.
    Named(String),
    /// A private record defined with the effect.
    Inline(FalseTarget),
}

/// False-target parameters for one system type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FalseTargetData {
    pub source: FtSource,
    /// Configured false-target count; the jamming pulse density is then
    /// derived from it.
    pub number_of_fts: Option<u32>,
    /// Forces the record's range constraint.
    pub range_constrained: Option<bool>,
    /// Multiplier on the radar frame time (or configured scan interval).
    pub scan_rate_multiplier: f64,
    /// Blip speed limits (m/s) for records without their own.
    pub blip_speeds: (f64, f64),
}

impl Default for FalseTargetData {
    fn default() -> Self {
        Self {
            source: FtSource::Auto,
            number_of_fts: None,
            range_constrained: None,
            scan_rate_multiplier: 1.0,
            blip_speeds: (0.0, 0.0),
        }
    }
}

impl FalseTargetData {
    fn validate(&self, effect: &str) -> Result<(), ConfigError> {
        if self.scan_rate_multiplier <= 0.0 {
            return Err(ConfigError::invalid_value(format!("{effect}.scan_rate_multiplier"), "must be > 0"));
        }
        let (lo, hi) = self.blip_speeds;
        if lo < 0.0 || hi < lo {
            return Err(ConfigError::invalid_value(
                format!("{effect}.blip_speeds"),
                "must satisfy 0 <= min <= max",
            ));
        }
        if self.number_of_fts == Some(0) {
            return Err(ConfigError::invalid_value(format!("{effect}.number_of_fts"), "must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct FtState {
    handle: FtHandle,
    auto_generated: bool,
    prepared: bool,
    /// Configured scan interval, rescaled each update.
    base_scan_interval: Option<f64>,
}

impl FtState {
    fn new(handle: FtHandle, auto_generated: bool) -> Self {
        Self {
            handle,
            auto_generated,
            prepared: false,
            base_scan_interval: None,
        }
    }

    fn initialize(&mut self) -> Option<Result<(), ConfigError>> {
        self.handle
            .with_mut(|ft| if ft.is_initialized() { Ok(()) } else { ft.initialize() })
    }

    fn prepare(&mut self, data: &FalseTargetData) {
        let auto = self.auto_generated;
        self.handle.with_mut(|ft| {
            if !ft.azimuth_extent.is_explicit() {
                ft.azimuth_extent.derive((-PI, PI));
            }
            if !ft.blip_speeds.is_explicit() && data.blip_speeds.1 > 0.0 {
                ft.blip_speeds.derive(data.blip_speeds);
            }
            if auto {
                ft.bearing_reference = BearingReference::Jammer;
                ft.blip_behavior = BlipBehavior::RandomScanToScan;
                ft.radar_behavior = RadarBehavior::RandomToMultipleRadars;
                ft.platform_behavior = PlatformBehavior::RandomToMultiplePlatforms;
            }
        });
        self.base_scan_interval = self
            .handle
            .with(|ft| ft.scan_interval.is_explicit().then(|| ft.scan_interval.get()))
            .flatten();
        self.prepared = true;
    }
}

/// False targets a jammer at `density` paints in one frame: the pulses it
/// places per frame over the pulses the radar integrates per detection.
pub(super) fn frame_false_targets(density: f64, frame_time: f64, pulse_width: f64, pulses_integrated: f64) -> f64 {
    density * frame_time / (pulse_width * pulses_integrated)
}

/// Density that paints `count` false targets per frame, capped at 1.
pub(super) fn false_target_density(count: f64, frame_time: f64, pulse_width: f64, pulses_integrated: f64) -> f64 {
    (count * pulse_width * pulses_integrated / frame_time).min(1.0)
}

/// Geometry and timing read from the victim radar on each update.
pub(super) struct Victim<'a> {
    pub(super) radar: &'a Transmitter,
    pub(super) receiver: &'a Receiver,
    pub(super) mode: &'a SensorMode,
}

impl Victim<'_> {
    pub(super) fn max_range(&self) -> f64 {
        let max_range = self.radar.antenna.max_range;
        let pri = self.radar.pulse_repetition_interval;
        if pri > 0.0 {
            max_range.min(SPEED_OF_LIGHT * pri / 2.0)
        } else {
            let h = self.receiver.platform.altitude.max(REFERENCE_ALTITUDE);
            let r = EARTH_RADIUS * self.radar.earth_radius_multiplier;
            max_range.min((h * h + 2.0 * r * h).sqrt())
        }
    }

    pub(super) fn pulses_integrated(&self) -> f64 {
        self.mode.pulses_integrated_for(self.radar)
    }
}

/// Injects false targets into a radar.
#[derive(Debug, Clone, Default)]
pub struct FalseTargetEffect {
    data: EffectDataMap<FalseTargetData>,
    states: HashMap<Option<SystemTypeId>, FtState>,
}

impl FalseTargetEffect {
    /// An auto-generated false-target field for every type.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-type false-target data.
    pub fn data_mut(&mut self) -> &mut EffectDataMap<FalseTargetData> {
        &mut self.data
    }

    /// Snapshot of the record used against `key`.
    #[must_use]
    pub fn false_target(&self, key: Option<&SystemTypeId>) -> Option<FalseTarget> {
        self.state(key)?.handle.with(FalseTarget::clone)
    }

    /// Current false-target count against `key`.
    #[must_use]
    pub fn number_of_false_targets(&self, key: Option<&SystemTypeId>) -> Option<u32> {
        self.state(key)?.handle.with(|ft| ft.number_of_fts.get())
    }

    fn state(&self, key: Option<&SystemTypeId>) -> Option<&FtState> {
        self.states.get(&key.cloned()).or_else(|| self.states.get(&None))
    }

    fn resolve(data: &FalseTargetData, core: &EffectCore, scope: &InitScope<'_>) -> Result<FtState, ConfigError> {
        let effect = core.name();
        let local_name = || match scope.platform {
            Some(platform) => format!("FT.{platform}.{effect}"),
            None => format!("FT.{effect}"),
        };
        match &data.source {
            FtSource::Auto => {
                let mut ft = FalseTarget::auto_generated(local_name());
                ft.debug = core.is_debug();
                Ok(FtState::new(FtHandle::Owned(ft), true))
            }
            FtSource::Inline(ft) => {
                if ft.radar_behavior == RadarBehavior::ConsistentToMultipleRadars {
                    return Err(ConfigError::InconsistentFalseTarget {
                        effect: effect.to_string(),
                        name: ft.name.clone(),
                    });
                }
                let mut ft = ft.clone();
                ft.reset();
                Ok(FtState::new(FtHandle::Owned(ft), false))
            }
            FtSource::Named(name) => {
                let entry = scope
                    .false_targets
                    .find(name)
                    .ok_or_else(|| ConfigError::MissingFalseTarget {
                        effect: effect.to_string(),
                        name: name.clone(),
                    })?;
                let (consistent, per_platform) = {
                    let ft = entry.read();
                    (ft.is_consistent(), ft.is_per_platform())
                };
                let handle = if consistent {
                    FtHandle::shared(&entry)
                } else if per_platform {
                    let alias = format!("{name}.{}", scope.platform.unwrap_or(effect));
                    let shared = scope.false_targets.get_or_insert_with(&alias, || {
                        let mut ft = entry.read().clone();
                        ft.reset();
                        ft.name.clone_from(&alias);
                        ft
                    });
                    FtHandle::shared(&shared)
                } else {
                    let mut ft = entry.read().clone();
                    ft.reset();
                    ft.name = local_name();
                    FtHandle::Owned(ft)
                };
                Ok(FtState::new(handle, false))
            }
        }
    }

    fn update_ft(state: &mut FtState, data: &FalseTargetData, pulse: &PulseData, victim: &Victim<'_>, core: &EffectCore) {
        let multiplier = data.scan_rate_multiplier;
        let base_scan = state.base_scan_interval;
        let platform = &victim.receiver.platform;
        let frame_time = victim.mode.frame_time;
        state.handle.with_mut(|ft| {
            if !ft.reference_centroid.is_explicit() {
                ft.reference_centroid
                    .derive((platform.latitude, platform.longitude, REFERENCE_ALTITUDE));
            }
            match base_scan {
                Some(base) => ft.scan_interval.derive(base * multiplier),
                None if frame_time > 0.0 => ft.scan_interval.derive(frame_time * multiplier),
                None => {}
            }
            if !ft.range_extent.is_explicit() {
                ft.range_extent.derive((0.0, victim.max_range()));
            }
            if pulse.explicit_density {
                if victim.radar.pulse_width > 0.0 {
                    let count = frame_false_targets(
                        pulse.base_density(),
                        frame_time,
                        victim.radar.pulse_width,
                        victim.pulses_integrated(),
                    )
                    .floor();
                    if count >= 1.0 {
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        ft.number_of_fts.derive(count.min(f64::from(u32::MAX)) as u32);
                    }
                } else if core.is_debug() {
                    debug!(
                        effect = %core.name(),
                        radar = %victim.radar.id,
                        "radar pulse width unset, false-target count unchanged"
                    );
                }
            }
            match data.range_constrained {
                Some(constrained) => ft.range_constrained.set(constrained),
                None if !ft.range_constrained.is_explicit() => {
                    ft.range_constrained.derive(victim.mode.frequency_agile);
                }
                None => {}
            }
        });
    }

    // Density from the achieved false-target count.
    fn derived_density(state: &FtState, victim: &Victim<'_>) -> Option<f64> {
        let frame_time = victim.mode.frame_time;
        if frame_time <= 0.0 {
            return None;
        }
        let pulse_width = victim.radar.pulse_width;
        if pulse_width <= 0.0 {
            warn!(radar = %victim.radar.id, "radar pulse width unset, false-target density unchanged");
            return None;
        }
        let count = f64::from(state.handle.with(|ft| ft.number_of_fts.get())?);
        Some(false_target_density(count, frame_time, pulse_width, victim.pulses_integrated()))
    }
}

impl EffectKind for FalseTargetEffect {
    fn kind_name(&self) -> &'static str {
        "false_target"
    }

    fn layers(&self) -> LayerStack {
        LayerStack::pulse()
    }

    fn default_coherency(&self) -> Coherency {
        Coherency::COHERENT_PULSE
    }

    fn default_behavior(&self) -> Behavior {
        Behavior::FALSE_TARGET_EFFECT
    }

    fn attack_functions(&self) -> SystemFunction {
        SystemFunction::SENSOR
    }

    fn initialize(&mut self, core: &EffectCore, layers: &mut LayerStack, scope: &InitScope<'_>) -> EwResult<()> {
        self.states.clear();
        let keys: Vec<Option<SystemTypeId>> = self.data.entries().map(|(key, _)| key.cloned()).collect();
        for key in keys {
            let data = self.data.get(key.as_ref());
            data.validate(core.name())?;
            let mut state = Self::resolve(data, core, scope)?;

            let pulse = &mut layers.data_mut().get_mut(key.as_ref()).pulse;
            let record_count = state.handle.with(|ft| ft.number_of_fts.is_explicit()).unwrap_or(false);
            if !pulse.explicit_density {
                if let Some(count) = data.number_of_fts {
                    state.handle.with_mut(|ft| ft.number_of_fts.set(count));
                }
                let count_configured = record_count || data.number_of_fts.is_some();
                pulse.set_jamming_pulse_density(DEFAULT_DENSITY, !count_configured);
            }

            match state.initialize() {
                Some(Ok(())) => {}
                Some(Err(err)) => return Err(err.into()),
                None => {
                    return Err(ConfigError::MissingFalseTarget {
                        effect: core.name().to_string(),
                        name: format!("{:?}", data.source),
                    }
                    .into())
                }
            }
            self.states.insert(key, state);
        }
        Ok(())
    }

    fn update(&mut self, scope: &mut UpdateScope<'_>) {
        let env = scope.env;
        let (Some(radar), Some(receiver)) = (env.radar(), env.receiver()) else {
            return;
        };
        let Some(mode) = receiver.mode.as_ref() else {
            trace!(effect = %scope.core.name(), "victim receiver has no sensor mode");
            return;
        };
        let victim = Victim { radar, receiver, mode };
        let key = scope.key();

        if !self.states.contains_key(&key) {
            let Some(mut copy) = self.states.get(&None).cloned() else {
                return;
            };
            copy.prepared = false;
            if let Some(Err(err)) = copy.initialize() {
                warn!(effect = %scope.core.name(), error = %err, "false-target copy failed to initialize");
                return;
            }
            self.states.insert(key.clone(), copy);
        }
        let Some(state) = self.states.get_mut(&key) else {
            return;
        };
        let data = self.data.get(key.as_ref());
        if !state.prepared {
            state.prepare(data);
        }

        let pulse = scope.layers.data_for(key.as_ref()).pulse;
        Self::update_ft(state, data, &pulse, &victim, scope.core);

        if !pulse.explicit_density {
            if let Some(density) = Self::derived_density(state, &victim) {
                scope
                    .layers
                    .data_mut()
                    .get_mut(key.as_ref())
                    .pulse
                    .set_jamming_pulse_density(density, false);
                scope.layers.refresh_pulse_density(key.as_ref());
            }
        }

        if scope.core.is_debug() {
            debug!(
                effect = %scope.core.name(),
                radar = %radar.id,
                false_targets = state.handle.with(|ft| ft.number_of_fts.get()),
                density = scope.layers.jamming_pulse_density(),
                "false-target field updated"
            );
        }
    }

    fn apply_unmitigated(&self, scope: &ApplyScope<'_>, result: &mut InteractionResult) {
        result.mask |= Behavior::FALSE_TARGET_EFFECT;
        scope.layers_unmitigated(result);
    }

    fn supports_density_scaling(&self) -> bool {
        true
    }

    kind_any!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::effect::{Effect, Side};
    use crate::false_target::{FalseTargetTypes, Tracked};
    use crate::random::SharedRandom;
    use crate::testing::{self, Fixture};

    fn acq() -> SystemTypeId {
        SystemTypeId::new("ACQ")
    }

    fn ft_effect(configure: impl FnOnce(&mut FalseTargetData), fts: &FalseTargetTypes) -> Effect {
        let mut kind = FalseTargetEffect::new();
        configure(kind.data_mut().wildcard_mut());
        let mut effect = Effect::new("ft", kind);
        testing::initialize_with(
            &mut effect,
            Side::Attack,
            fts,
            &SharedRandom::new(3),
            &EngineConfig::default(),
        );
        effect
    }

    fn kind(effect: &Effect) -> &FalseTargetEffect {
        effect.kind::<FalseTargetEffect>().unwrap()
    }

    fn try_initialize(data: FalseTargetData, fts: &FalseTargetTypes) -> EwResult<()> {
        let mut kind = FalseTargetEffect::new();
        *kind.data_mut().wildcard_mut() = data;
        let mut effect = Effect::new("ft", kind);
        let random = SharedRandom::new(1);
        let config = EngineConfig::default();
        let scope = InitScope {
            random: &random,
            config: &config,
            false_targets: fts,
            platform: Some("escort"),
        };
        effect.initialize(&scope)
    }

    #[test]
    fn auto_generated_record_uses_defaults() {
        let fts = FalseTargetTypes::default();
        let effect = ft_effect(|_| {}, &fts);
        let ft = kind(&effect).false_target(None).unwrap();
        assert_eq!(ft.name, "FT.escort.ft");
        assert_eq!(ft.bearing_reference, BearingReference::Jammer);
        assert!(ft.is_initialized());

        let pulse = effect.layers().data().wildcard().pulse;
        assert!(pulse.explicit_density);
        assert_eq!(pulse.jamming_pulse_density, DEFAULT_DENSITY);
        assert_eq!(effect.system_functions(), SystemFunction::SENSOR);
        assert!(fts.is_empty());
    }

    #[test]
    fn explicit_density_sets_false_target_count() {
        let fixture = Fixture::new();
        let fts = FalseTargetTypes::default();
        let mut effect = ft_effect(|_| {}, &fts);
        let mut result = InteractionResult::default();
        effect.process_unmitigated(&fixture.env(0.0), &mut result);
        assert!(result.has(Behavior::FALSE_TARGET_EFFECT));

        // 0.1 density x (10 s frame / 1 us pulse / 10 pulses integrated)
        let count = kind(&effect).number_of_false_targets(Some(&acq())).unwrap();
        assert!((99_999..=100_000).contains(&count), "count {count}");

        let ft = kind(&effect).false_target(Some(&acq())).unwrap();
        assert_eq!(ft.scan_interval.get(), 10.0);
        assert_eq!(ft.azimuth_extent.get(), (-PI, PI));
        assert_eq!(ft.reference_centroid.get().2, REFERENCE_ALTITUDE);
        let (_, max_range) = ft.range_extent.get();
        assert!((max_range - SPEED_OF_LIGHT * 1.0e-3 / 2.0).abs() < 1e-6);
        assert!(!ft.range_constrained.get());
    }

    #[test]
    fn configured_count_drives_density() {
        let fixture = Fixture::new();
        let fts = FalseTargetTypes::default();
        let mut effect = ft_effect(|d| d.number_of_fts = Some(50), &fts);
        assert!(!effect.layers().data().wildcard().pulse.explicit_density);

        let mut result = InteractionResult::default();
        effect.process_unmitigated(&fixture.env(0.0), &mut result);
        // 50 x 1 us x 10 pulses / 10 s frame
        let density = effect.jamming_pulse_density(&testing::jammer());
        assert!((density - 5.0e-5).abs() < 1e-12, "density {density}");
        assert_eq!(kind(&effect).number_of_false_targets(Some(&acq())), Some(50));
    }

    #[test]
    fn consistent_definition_is_shared() {
        let fixture = Fixture::new();
        let fts = FalseTargetTypes::default();
        let mut wall = FalseTarget::new("wall");
        wall.radar_behavior = RadarBehavior::ConsistentToMultipleRadars;
        wall.platform_behavior = PlatformBehavior::ConsistentToMultiplePlatforms;
        fts.add(wall).unwrap();

        let mut effect = ft_effect(|d| d.source = FtSource::Named("wall".to_string()), &fts);
        let mut result = InteractionResult::default();
        effect.process_unmitigated(&fixture.env(0.0), &mut result);

        let entry = fts.find("wall").unwrap();
        assert_eq!(entry.read().scan_interval.get(), 10.0);
        assert_eq!(fts.len(), 1);
    }

    #[test]
    fn per_platform_definition_registers_alias() {
        let fts = FalseTargetTypes::default();
        let mut field = FalseTarget::new("field");
        field.radar_behavior = RadarBehavior::ConsistentToMultipleRadars;
        fts.add(field).unwrap();

        let effect = ft_effect(|d| d.source = FtSource::Named("field".to_string()), &fts);
        assert_eq!(fts.len(), 2);
        assert!(fts.find("field.escort").is_some());
        assert_eq!(kind(&effect).false_target(None).unwrap().name, "field.escort");
    }

    #[test]
    fn random_definition_is_copied() {
        let fts = FalseTargetTypes::default();
        fts.add(FalseTarget::new("swarm")).unwrap();
        let effect = ft_effect(|d| d.source = FtSource::Named("swarm".to_string()), &fts);
        assert_eq!(kind(&effect).false_target(None).unwrap().name, "FT.escort.ft");
        assert_eq!(fts.len(), 1);
    }

    #[test]
    fn explicit_scan_interval_is_not_compounded() {
        let fixture = Fixture::new();
        let fts = FalseTargetTypes::default();
        let mut inline = FalseTarget::new("inline");
        inline.scan_interval = Tracked::explicit(5.0);
        let mut effect = ft_effect(
            |d| {
                d.source = FtSource::Inline(inline);
                d.scan_rate_multiplier = 2.0;
            },
            &fts,
        );
        let env = fixture.env(0.0);
        for _ in 0..3 {
            let mut result = InteractionResult::default();
            effect.process_unmitigated(&env, &mut result);
        }
        let ft = kind(&effect).false_target(Some(&acq())).unwrap();
        assert_eq!(ft.scan_interval.get(), 10.0);
    }

    #[test]
    fn missing_definition_fails_initialize() {
        let fts = FalseTargetTypes::default();
        let data = FalseTargetData {
            source: FtSource::Named("ghost".to_string()),
            ..FalseTargetData::default()
        };
        let Err(err) = try_initialize(data, &fts) else {
            panic!("expected missing false target");
        };
        assert!(err.is_config());
    }

    #[test]
    fn inline_consistent_definition_is_rejected() {
        let fts = FalseTargetTypes::default();
        let mut ft = FalseTarget::new("inline");
        ft.radar_behavior = RadarBehavior::ConsistentToMultipleRadars;
        let data = FalseTargetData {
            source: FtSource::Inline(ft),
            ..FalseTargetData::default()
        };
        assert!(matches!(
            try_initialize(data, &fts),
            Err(crate::error::EwError::Config(ConfigError::InconsistentFalseTarget { .. }))
        ));
    }
}
