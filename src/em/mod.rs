//! Records consumed from the electromagnetic propagation layer.
//!
//! The propagation calculator fills an [`Interaction`] for each
//! transmitter/receiver/target triple before effects run; effects only
//! read these records and ask the [`Propagation`] trait for secondary
//! power computations (auxiliary channels, jammer power with effects).

mod propagation;
mod screener;

pub use propagation::{AntennaGains, AntennaPattern, ConstantPattern, JammerPowers, OneWayPower, Propagation};
pub use screener::{RangeForce, ScreenerLimits};
pub(crate) use screener::wrap_pi;

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::ids::{RcvrId, SystemTypeId, XmtrId};

/// Speed of light (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Mean earth radius (m).
pub const EARTH_RADIUS: f64 = 6_366_707.019_5;

/// A platform as seen by the effect layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    /// Unique platform name.
    pub name: String,
    /// Platform type name.
    pub type_name: String,
    /// True if this platform is a synthetic false target.
    #[serde(default)]
    pub false_target: bool,
    /// Latitude (deg).
    #[serde(default)]
    pub latitude: f64,
    /// Longitude (deg).
    #[serde(default)]
    pub longitude: f64,
    /// Altitude (m).
    #[serde(default)]
    pub altitude: f64,
}

impl Platform {
    /// Creates a platform with a name and type.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }
}

/// Role of a transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XmtrFunction {
    #[default]
    Undefined,
    Comm,
    Sensor,
    Interferer,
}

/// Role of a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RcvrFunction {
    #[default]
    Undefined,
    Comm,
    Sensor,
    PassiveSensor,
    Interferer,
}

/// Antenna scan volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Fixed,
    Azimuth,
    Elevation,
    AzimuthAndElevation,
}

/// Antenna properties the effects need for scan/beam arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Antenna {
    /// Maximum instrumented range (m); `f64::MAX` when unlimited.
    pub max_range: f64,
    /// Scan mode.
    pub scan_mode: ScanMode,
    /// Azimuth scan limits (rad).
    pub azimuth_scan_limits: (f64, f64),
    /// Elevation scan limits (rad).
    pub elevation_scan_limits: (f64, f64),
    /// Azimuth beamwidth (rad).
    pub azimuth_beamwidth: f64,
    /// Elevation beamwidth (rad).
    pub elevation_beamwidth: f64,
}

impl Default for Antenna {
    fn default() -> Self {
        Self {
            max_range: f64::MAX,
            scan_mode: ScanMode::Fixed,
            azimuth_scan_limits: (-PI, PI),
            elevation_scan_limits: (-PI / 2.0, PI / 2.0),
            azimuth_beamwidth: 0.0,
            elevation_beamwidth: 0.0,
        }
    }
}

/// A transmitter (radar, comm emitter or jammer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transmitter {
    /// Simulation-unique id.
    pub id: XmtrId,
    /// Owning platform.
    pub platform: Platform,
    /// Articulated part type (keys per-type effect data).
    pub part_type: SystemTypeId,
    /// Role of the transmitter.
    pub function: XmtrFunction,
    /// Carrier frequency (Hz).
    pub frequency: f64,
    /// Bandwidth (Hz).
    pub bandwidth: f64,
    /// Pulse width (s); zero for continuous wave.
    pub pulse_width: f64,
    /// Pulse repetition interval (s); zero for continuous wave.
    pub pulse_repetition_interval: f64,
    /// Modulation type name, if declared.
    pub modulation: Option<String>,
    /// Effective earth radius multiplier for horizon calculations.
    pub earth_radius_multiplier: f64,
    /// Antenna description.
    pub antenna: Antenna,
}

impl Transmitter {
    /// Creates a continuous-wave transmitter with default antenna.
    #[must_use]
    pub fn new(id: XmtrId, platform: Platform, part_type: impl Into<SystemTypeId>, function: XmtrFunction) -> Self {
        Self {
            id,
            platform,
            part_type: part_type.into(),
            function,
            frequency: 0.0,
            bandwidth: 0.0,
            pulse_width: 0.0,
            pulse_repetition_interval: 0.0,
            modulation: None,
            earth_radius_multiplier: 4.0 / 3.0,
            antenna: Antenna::default(),
        }
    }

    /// Pulse repetition frequency (Hz); zero for continuous wave.
    #[must_use]
    pub fn pulse_repetition_frequency(&self) -> f64 {
        if self.pulse_repetition_interval > 0.0 {
            1.0 / self.pulse_repetition_interval
        } else {
            0.0
        }
    }

    /// Duty cycle; 1.0 for continuous wave.
    #[must_use]
    pub fn duty_cycle(&self) -> f64 {
        if self.pulse_width > 0.0 && self.pulse_repetition_interval > 0.0 {
            (self.pulse_width / self.pulse_repetition_interval).min(1.0)
        } else {
            1.0
        }
    }
}

/// Sensor mode timing used for integration arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorMode {
    /// Time for one full scan (s).
    pub frame_time: f64,
    /// Dwell time per beam position (s); zero if not modeled.
    pub dwell_time: f64,
    /// Pulses integrated per detection, when the detector declares it.
    pub pulses_integrated: Option<u32>,
    /// True if the sensor hops frequency between dwells.
    pub frequency_agile: bool,
    /// False-target screener attached to the mode.
    #[serde(default)]
    pub screener: Option<ScreenerLimits>,
}

impl SensorMode {
    /// Pulses integrated per detection for `xmtr`.
    ///
    /// Falls back to time-on-target times PRF, where time-on-target is the
    /// dwell time or, without one, the fraction of the frame spent with the
    /// beam on a point.
    #[must_use]
    pub fn pulses_integrated_for(&self, xmtr: &Transmitter) -> f64 {
        if let Some(n) = self.pulses_integrated {
            return f64::from(n.max(1));
        }
        let prf = xmtr.pulse_repetition_frequency();
        if prf <= 0.0 {
            return 1.0;
        }
        let time_on_target = if self.dwell_time > 0.0 {
            self.dwell_time
        } else {
            let antenna = &xmtr.antenna;
            let az_extent = antenna.azimuth_scan_limits.1 - antenna.azimuth_scan_limits.0;
            let el_extent = antenna.elevation_scan_limits.1 - antenna.elevation_scan_limits.0;
            let fraction = match antenna.scan_mode {
                ScanMode::Azimuth if az_extent > 0.0 => antenna.azimuth_beamwidth / az_extent,
                ScanMode::Elevation if el_extent > 0.0 => antenna.elevation_beamwidth / el_extent,
                ScanMode::AzimuthAndElevation if az_extent > 0.0 && el_extent > 0.0 => {
                    (antenna.azimuth_beamwidth / az_extent) * (antenna.elevation_beamwidth / el_extent)
                }
                _ => 1.0,
            };
            self.frame_time * fraction
        };
        (time_on_target * prf).max(1.0)
    }
}

/// A receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    /// Simulation-unique id.
    pub id: RcvrId,
    /// Owning platform.
    pub platform: Platform,
    /// Articulated part type (keys per-type effect data).
    pub part_type: SystemTypeId,
    /// Role of the receiver.
    pub function: RcvrFunction,
    /// Tuned frequency (Hz).
    pub frequency: f64,
    /// Bandwidth (Hz).
    pub bandwidth: f64,
    /// Thermal noise power (W).
    pub noise_power: f64,
    /// Noise multiplier applied in S/N computations.
    pub noise_multiplier: f64,
    /// Detection threshold (S/N ratio).
    pub detection_threshold: f64,
    /// Beam tilt (rad).
    pub beam_tilt: f64,
    /// Active sensor mode, if the receiver belongs to a sensor.
    pub mode: Option<SensorMode>,
}

impl Receiver {
    /// Creates a receiver with unit noise multiplier and no mode.
    #[must_use]
    pub fn new(id: RcvrId, platform: Platform, part_type: impl Into<SystemTypeId>, function: RcvrFunction) -> Self {
        Self {
            id,
            platform,
            part_type: part_type.into(),
            function,
            frequency: 0.0,
            bandwidth: 0.0,
            noise_power: 1.0e-14,
            noise_multiplier: 1.0,
            detection_threshold: 20.0,
            beam_tilt: 0.0,
            mode: None,
        }
    }

    /// Signal-to-noise ratio for a signal against noise, clutter and interference.
    #[must_use]
    pub fn signal_to_noise(&self, signal: f64, clutter: f64, interference: f64) -> f64 {
        let denominator = self.noise_power * self.noise_multiplier + clutter + interference;
        if denominator > 0.0 {
            signal / denominator
        } else {
            0.0
        }
    }
}

/// Beam pointing at the time of an interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BeamPosition {
    /// Azimuth of the beam (rad).
    pub azimuth: f64,
    /// Elevation of the beam (rad).
    pub elevation: f64,
    /// Electronic-beam-steering azimuth (rad).
    pub ebs_azimuth: f64,
    /// Electronic-beam-steering elevation (rad).
    pub ebs_elevation: f64,
    /// Antenna gain toward the other end (absolute).
    pub gain: f64,
}

/// Relative position of one end of an interaction as seen from another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Slant range (m).
    pub range: f64,
    /// True azimuth (rad).
    pub azimuth: f64,
    /// True elevation (rad).
    pub elevation: f64,
}

/// Result of one transmitter/receiver/target interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interaction {
    /// Transmitting end.
    pub transmitter: Option<Transmitter>,
    /// Receiving end.
    pub receiver: Option<Receiver>,
    /// Target platform (absent for one-way interactions).
    pub target: Option<Platform>,
    /// Received signal power (W).
    pub received_power: f64,
    /// Clutter power (W).
    pub clutter_power: f64,
    /// Detection threshold applied to this interaction.
    pub detection_threshold: f64,
    /// Target radar signature (m^2).
    pub radar_signature: f64,
    /// Transmit beam.
    pub xmtr_beam: BeamPosition,
    /// Receive beam.
    pub rcvr_beam: BeamPosition,
    /// Receiver to target geometry.
    pub rcvr_to_target: Geometry,
    /// Transmitter to target geometry.
    pub xmtr_to_target: Geometry,
    /// Receiver to transmitter geometry.
    pub rcvr_to_xmtr: Geometry,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radar() -> Transmitter {
        let mut xmtr = Transmitter::new(XmtrId(1), Platform::new("site", "SAM"), "ACQ", XmtrFunction::Sensor);
        xmtr.pulse_width = 1.0e-6;
        xmtr.pulse_repetition_interval = 1.0e-3;
        xmtr
    }

    #[test]
    fn duty_cycle_and_prf() {
        let xmtr = radar();
        assert!((xmtr.duty_cycle() - 1.0e-3).abs() < 1e-15);
        assert!((xmtr.pulse_repetition_frequency() - 1000.0).abs() < 1e-9);

        let cw = Transmitter::new(XmtrId(2), Platform::default(), "CW", XmtrFunction::Interferer);
        assert_eq!(cw.duty_cycle(), 1.0);
        assert_eq!(cw.pulse_repetition_frequency(), 0.0);
    }

    #[test]
    fn pulses_integrated_prefers_detector_count() {
        let mode = SensorMode {
            frame_time: 10.0,
            dwell_time: 0.0,
            pulses_integrated: Some(16),
            frequency_agile: false,
            screener: None,
        };
        assert_eq!(mode.pulses_integrated_for(&radar()), 16.0);
    }

    #[test]
    fn pulses_integrated_from_scan_fraction() {
        let mut xmtr = radar();
        xmtr.antenna.scan_mode = ScanMode::Azimuth;
        xmtr.antenna.azimuth_scan_limits = (-PI, PI);
        xmtr.antenna.azimuth_beamwidth = 2.0 * PI / 100.0;
        let mode = SensorMode {
            frame_time: 10.0,
            dwell_time: 0.0,
            pulses_integrated: None,
            frequency_agile: false,
            screener: None,
        };
        // 10 s frame, 1/100 of the scan on target, 1 kHz PRF.
        assert!((mode.pulses_integrated_for(&xmtr) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn signal_to_noise_includes_clutter() {
        let mut rcvr = Receiver::new(RcvrId(1), Platform::default(), "ACQ", RcvrFunction::Sensor);
        rcvr.noise_power = 1.0;
        rcvr.noise_multiplier = 2.0;
        assert!((rcvr.signal_to_noise(8.0, 2.0, 0.0) - 2.0).abs() < 1e-12);
    }
}
