//! False-target generator records and the scenario-wide registry.
//!
//! The generator's scan and track behavior lives outside this crate; the
//! effect engine only sizes and positions the false-target field. A
//! [`FtHandle`] encodes whether an effect owns its record or aliases one
//! shared through [`FalseTargetTypes`].

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How blips move between scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlipBehavior {
    #[default]
    RandomScanToScan,
    ConsistentScanToScan,
}

/// Whether different radars see the same blips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadarBehavior {
    #[default]
    RandomToMultipleRadars,
    ConsistentToMultipleRadars,
}

/// Whether different jamming platforms share one blip field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformBehavior {
    #[default]
    RandomToMultiplePlatforms,
    ConsistentToMultiplePlatforms,
}

/// Reference direction for blip bearings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BearingReference {
    #[default]
    North,
    Jammer,
}

/// A value that remembers whether it was configured or derived.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Tracked<T> {
    value: T,
    explicit: bool,
}

impl<T: Copy> Tracked<T> {
    /// A derived value.
    pub const fn derived(value: T) -> Self {
        Self { value, explicit: false }
    }

    /// A configured value.
    pub const fn explicit(value: T) -> Self {
        Self { value, explicit: true }
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.value
    }

    /// True if the value was configured.
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Sets a configured value.
    pub fn set(&mut self, value: T) {
        *self = Self::explicit(value);
    }

    /// Sets a derived value, keeping the explicit flag.
    pub fn derive(&mut self, value: T) {
        self.value = value;
    }
}

/// Configuration of one false-target field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FalseTarget {
    pub name: String,
    pub debug: bool,
    pub blip_behavior: BlipBehavior,
    pub radar_behavior: RadarBehavior,
    pub platform_behavior: PlatformBehavior,
    pub bearing_reference: BearingReference,
    pub number_of_fts: Tracked<u32>,
    /// Seconds between blip rescans.
    pub scan_interval: Tracked<f64>,
    /// Fraction of a scan a blip persists, in (0, 1].
    pub persistence: f64,
    /// Azimuth extent (rad).
    pub azimuth_extent: Tracked<(f64, f64)>,
    /// Range extent (m).
    pub range_extent: Tracked<(f64, f64)>,
    pub range_constrained: Tracked<bool>,
    /// Blip speed limits (m/s).
    pub blip_speeds: Tracked<(f64, f64)>,
    /// Latitude, longitude (deg) and altitude (m) of the field centroid.
    pub reference_centroid: Tracked<(f64, f64, f64)>,
    #[serde(skip)]
    initialized: bool,
}

impl Default for FalseTarget {
    fn default() -> Self {
        Self::new("false_target")
    }
}

impl FalseTarget {
    /// Creates a record with random behaviors and no extents.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            debug: false,
            blip_behavior: BlipBehavior::RandomScanToScan,
            radar_behavior: RadarBehavior::RandomToMultipleRadars,
            platform_behavior: PlatformBehavior::RandomToMultiplePlatforms,
            bearing_reference: BearingReference::North,
            number_of_fts: Tracked::derived(0),
            scan_interval: Tracked::derived(20.0),
            persistence: 1.0,
            azimuth_extent: Tracked::derived((0.0, 0.0)),
            range_extent: Tracked::derived((0.0, 0.0)),
            range_constrained: Tracked::derived(false),
            blip_speeds: Tracked::derived((0.0, 0.0)),
            reference_centroid: Tracked::derived((0.0, 0.0, 0.0)),
            initialized: false,
        }
    }

    /// The default record an effect generates when none is named.
    #[must_use]
    pub fn auto_generated(name: impl Into<String>) -> Self {
        Self {
            bearing_reference: BearingReference::Jammer,
            ..Self::new(name)
        }
    }

    /// True if every radar and every platform sees the same field.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.radar_behavior == RadarBehavior::ConsistentToMultipleRadars
            && self.platform_behavior == PlatformBehavior::ConsistentToMultiplePlatforms
    }

    /// True if radars agree but each jamming platform gets its own field.
    #[must_use]
    pub fn is_per_platform(&self) -> bool {
        self.radar_behavior == RadarBehavior::ConsistentToMultipleRadars
            && self.platform_behavior == PlatformBehavior::RandomToMultiplePlatforms
    }

    /// True once [`initialize`](Self::initialize) succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Validates the record.
    pub fn initialize(&mut self) -> Result<(), ConfigError> {
        if !(self.persistence > 0.0 && self.persistence <= 1.0) {
            return Err(ConfigError::invalid_value(
                format!("{}.persistence", self.name),
                "must be in (0, 1]",
            ));
        }
        if self.scan_interval.get() <= 0.0 {
            return Err(ConfigError::invalid_value(format!("{}.scan_interval", self.name), "must be > 0"));
        }
        let (lo, hi) = self.blip_speeds.get();
        if lo < 0.0 || hi < lo {
            return Err(ConfigError::invalid_value(
                format!("{}.blip_speeds", self.name),
                "must satisfy 0 <= min <= max",
            ));
        }
        self.initialized = true;
        Ok(())
    }

    /// Drops runtime state so the record can be reinitialized.
    pub fn reset(&mut self) {
        self.initialized = false;
    }
}

/// An effect's reference to its false-target record.
#[derive(Debug)]
pub enum FtHandle {
    /// Private record; cloned deeply with runtime state reset.
    Owned(FalseTarget),
    /// Record owned by the registry; clones alias it.
    Shared(Weak<RwLock<FalseTarget>>),
}

impl Clone for FtHandle {
    fn clone(&self) -> Self {
        match self {
            Self::Owned(ft) => {
                let mut copy = ft.clone();
                copy.reset();
                Self::Owned(copy)
            }
            Self::Shared(weak) => Self::Shared(Weak::clone(weak)),
        }
    }
}

impl FtHandle {
    /// Aliases a registry entry.
    #[must_use]
    pub fn shared(entry: &Arc<RwLock<FalseTarget>>) -> Self {
        Self::Shared(Arc::downgrade(entry))
    }

    /// True for an aliased record.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }

    /// Reads the record; `None` if a shared record was dropped.
    pub fn with<R>(&self, f: impl FnOnce(&FalseTarget) -> R) -> Option<R> {
        match self {
            Self::Owned(ft) => Some(f(ft)),
            Self::Shared(weak) => weak.upgrade().map(|ft| f(&ft.read())),
        }
    }

    /// Mutates the record; `None` if a shared record was dropped.
    pub fn with_mut<R>(&mut self, f: impl FnOnce(&mut FalseTarget) -> R) -> Option<R> {
        match self {
            Self::Owned(ft) => Some(f(ft)),
            Self::Shared(weak) => weak.upgrade().map(|ft| f(&mut ft.write())),
        }
    }
}

/// Named false-target definitions available to effects.
#[derive(Debug, Default)]
pub struct FalseTargetTypes {
    types: RwLock<HashMap<String, Arc<RwLock<FalseTarget>>>>,
}

impl FalseTargetTypes {
    /// Registers a definition under its name.
    pub fn add(&self, ft: FalseTarget) -> Result<(), ConfigError> {
        let mut types = self.types.write();
        if types.contains_key(&ft.name) {
            return Err(ConfigError::invalid_value(
                format!("false_target.{}", ft.name),
                "already defined",
            ));
        }
        types.insert(ft.name.clone(), Arc::new(RwLock::new(ft)));
        Ok(())
    }

    /// Looks up a definition.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Arc<RwLock<FalseTarget>>> {
        self.types.read().get(name).cloned()
    }

    /// Returns the entry `name`, registering `make()` first if absent.
    pub fn get_or_insert_with(&self, name: &str, make: impl FnOnce() -> FalseTarget) -> Arc<RwLock<FalseTarget>> {
        let mut types = self.types.write();
        Arc::clone(
            types
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(make()))),
        )
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}
