//! Piecewise-linear lookup tables.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Linear interpolation of `x` between `(x0, y0)` and `(x1, y1)`.
///
/// A degenerate interval returns `y0`.
#[must_use]
pub fn lerp(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    if (x1 - x0).abs() < f64::EPSILON {
        return y0;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Table of `(x, y)` points with strictly increasing `x`.
///
/// Evaluation clamps to the first/last `y` outside the table range and
/// interpolates linearly between points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    points: Vec<(f64, f64)>,
}

impl Curve {
    /// Builds a curve, rejecting non-increasing abscissae.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, ConfigError> {
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(ConfigError::InvalidTable {
                reason: "independent values must be strictly increasing".to_string(),
            });
        }
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(ConfigError::InvalidTable {
                reason: "table values must be finite".to_string(),
            });
        }
        Ok(Self { points })
    }

    /// Single-point curve that evaluates to `y` everywhere.
    #[must_use]
    pub fn constant(y: f64) -> Self {
        Self {
            points: vec![(0.0, y)],
        }
    }

    /// Inserts a point in order. Returns false if `x` is already present.
    pub fn insert(&mut self, x: f64, y: f64) -> bool {
        match self.points.binary_search_by(|(px, _)| px.total_cmp(&x)) {
            Ok(_) => false,
            Err(pos) => {
                self.points.insert(pos, (x, y));
                true
            }
        }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the table has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Table points.
    #[must_use]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Evaluates the table at `x`. An empty table yields `None`.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> Option<f64> {
        let (first, last) = (self.points.first()?, self.points.last()?);
        if x <= first.0 {
            return Some(first.1);
        }
        if x >= last.0 {
            return Some(last.1);
        }
        let upper = self.points.partition_point(|(px, _)| *px <= x);
        let (x0, y0) = self.points[upper - 1];
        let (x1, y1) = self.points[upper];
        Some(lerp(x, x0, x1, y0, y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_clamps_and_interpolates() {
        let curve = Curve::new(vec![(1.0, 10.0), (3.0, 30.0)]).unwrap();
        assert_eq!(curve.evaluate(0.0), Some(10.0));
        assert_eq!(curve.evaluate(5.0), Some(30.0));
        assert!((curve.evaluate(2.0).unwrap() - 20.0).abs() < 1e-12);
        assert_eq!(Curve::default().evaluate(1.0), None);
    }

    #[test]
    fn new_rejects_unsorted_points() {
        assert!(Curve::new(vec![(2.0, 1.0), (1.0, 1.0)]).is_err());
        assert!(Curve::new(vec![(1.0, 1.0), (1.0, 2.0)]).is_err());
        assert!(Curve::new(vec![(1.0, f64::NAN)]).is_err());
    }

    #[test]
    fn insert_keeps_order_and_refuses_duplicates() {
        let mut curve = Curve::default();
        assert!(curve.insert(3.0, 0.3));
        assert!(curve.insert(1.0, 0.1));
        assert!(!curve.insert(3.0, 9.9));
        assert_eq!(curve.points(), &[(1.0, 0.1), (3.0, 0.3)]);
    }

    #[test]
    fn lerp_handles_degenerate_interval() {
        assert_eq!(lerp(5.0, 1.0, 1.0, 7.0, 9.0), 7.0);
        assert!((lerp(1.5, 1.0, 2.0, 0.0, 10.0) - 5.0).abs() < 1e-12);
    }
}
