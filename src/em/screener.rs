//! False-target screener limits of a sensor mode.
//!
//! The screener itself (blip-to-track screening, track reporting) runs in
//! the host sensor. Effects only read the limits it publishes: how many
//! tracks it can hold and when a real target is forced through a flood of
//! false targets.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

/// Sector arcs closer than this to a full circle cover every bearing (rad).
const FULL_CIRCLE_TOLERANCE: f64 = 1.0e-3;

/// Where, relative to the false-target range band, a real target is
/// forced through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeForce {
    /// No target is forced.
    #[default]
    Neither,
    /// Targets inside the band's near edge.
    Inside,
    /// Targets beyond the band's far edge.
    Outside,
    /// Targets on either side of the band.
    Both,
}

impl RangeForce {
    /// True if targets inside the band are forced.
    #[must_use]
    pub fn inside(self) -> bool {
        matches!(self, Self::Inside | Self::Both)
    }

    /// True if targets beyond the band are forced.
    #[must_use]
    pub fn outside(self) -> bool {
        matches!(self, Self::Outside | Self::Both)
    }
}

/// Capacity and forcing limits of a false-target screener.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerLimits {
    /// Tracks the screener can hold before it floods.
    pub track_capacity: u32,
    /// Range side on which a target is forced.
    pub range_force: RangeForce,
    /// Width of the bearing sector centered on the target (rad).
    pub force_sector_arc: f64,
    /// Half-depth of the range sector centered on the target (m).
    pub force_range: f64,
    /// A target is forced when its sector holds at most this many false
    /// targets; zero disables sector forcing.
    pub force_count_per_sector: u32,
    /// Largest J/S (either way) at which a blip competes with the target.
    pub force_j_to_s_delta: f64,
    /// True if the sensor reports S/N with its detections.
    pub reports_snr: bool,
}

impl Default for ScreenerLimits {
    fn default() -> Self {
        Self {
            track_capacity: 1000,
            range_force: RangeForce::Neither,
            force_sector_arc: TAU,
            force_range: f64::MAX,
            force_count_per_sector: 0,
            force_j_to_s_delta: f64::MAX,
            reports_snr: false,
        }
    }
}

impl ScreenerLimits {
    /// True if `azimuth` lies in the force sector centered on
    /// `target_azimuth`.
    #[must_use]
    pub fn in_sector(&self, azimuth: f64, target_azimuth: f64) -> bool {
        if TAU - self.force_sector_arc <= FULL_CIRCLE_TOLERANCE {
            return true;
        }
        wrap_pi(azimuth - target_azimuth).abs() <= self.force_sector_arc / 2.0
    }

    /// Range band of the force sector around a target at `target_range`.
    #[must_use]
    pub fn range_window(&self, target_range: f64) -> (f64, f64) {
        let min = (target_range - self.force_range).max(0.0);
        let max = if f64::MAX - self.force_range > target_range {
            target_range + self.force_range
        } else {
            f64::MAX
        };
        (min, max)
    }
}

/// Wraps an angle into [-pi, pi].
#[must_use]
pub(crate) fn wrap_pi(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped < -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_arc_covers_every_bearing() {
        let limits = ScreenerLimits::default();
        assert!(limits.in_sector(3.0, -3.0));
        assert_eq!(limits.range_window(5_000.0), (0.0, f64::MAX));
    }

    #[test]
    fn sector_wraps_through_north() {
        let limits = ScreenerLimits {
            force_sector_arc: 0.2,
            force_range: 1_000.0,
            ..ScreenerLimits::default()
        };
        assert!(limits.in_sector(-PI + 0.05, PI - 0.04));
        assert!(!limits.in_sector(0.5, 0.0));
        assert_eq!(limits.range_window(500.0), (0.0, 1_500.0));
    }

    #[test]
    fn range_force_sides() {
        assert!(RangeForce::Both.inside() && RangeForce::Both.outside());
        assert!(RangeForce::Inside.inside() && !RangeForce::Inside.outside());
        assert!(!RangeForce::Neither.inside());
    }
}
