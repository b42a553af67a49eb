//! Range-conditioned gain.

use serde::{Deserialize, Serialize};

use super::{GainLayer, LayerApply, LayerUpdate};
use crate::mask::Behavior;
use crate::result::InteractionResult;

/// Target range relative to the jammer, as seen by the victim receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeClass {
    /// Target and jammer at the same range.
    Equal,
    /// Target closer than the jammer.
    Inside,
    /// Target beyond the jammer.
    Outside,
}

impl RangeClass {
    /// Classifies `target_range` against `jammer_range` within `tolerance`.
    #[must_use]
    pub fn classify(target_range: f64, jammer_range: f64, tolerance: f64) -> Self {
        if (target_range - jammer_range).abs() <= tolerance {
            Self::Equal
        } else if target_range < jammer_range {
            Self::Inside
        } else {
            Self::Outside
        }
    }
}

/// Factor per range class; unset classes apply 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusData {
    pub equal: Option<f64>,
    pub inside: Option<f64>,
    pub outside: Option<f64>,
}

impl RadiusData {
    /// Factor for `class`.
    #[must_use]
    pub fn factor(&self, class: RangeClass) -> f64 {
        match class {
            RangeClass::Equal => self.equal,
            RangeClass::Inside => self.inside,
            RangeClass::Outside => self.outside,
        }
        .unwrap_or(1.0)
    }
}

/// Classifies each interaction and applies the matching factor.
#[derive(Debug, Clone, Default)]
pub struct RadiusLayer {
    class: Option<RangeClass>,
}

impl RadiusLayer {
    /// Class of the last updated interaction; `None` without a target.
    #[must_use]
    pub fn class(&self) -> Option<RangeClass> {
        self.class
    }

    pub(super) fn update(&mut self, scope: &LayerUpdate<'_>) {
        self.class = scope.env.target.target.as_ref().map(|_| {
            RangeClass::classify(
                scope.env.target.rcvr_to_target.range,
                scope.env.jammer_to_target.rcvr_to_xmtr.range,
                scope.core.tolerances().range,
            )
        });
    }
}

impl GainLayer for RadiusLayer {
    fn apply_unmitigated(&self, scope: &LayerApply<'_>, result: &mut InteractionResult) {
        let Some(class) = self.class else {
            return;
        };
        let factor = scope.data.radius.factor(class);
        if (factor - 1.0).abs() <= scope.core.tolerances().gain {
            return;
        }
        result.mask |= Behavior::RADIUS_EFFECT;
        result.for_each_channel(scope.core.coherency(), |g| g.radius_factor *= factor);
        if scope.core.is_debug() {
            tracing::debug!(effect = %scope.core.name(), ?class, factor, "radius factor applied");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::kinds::LayeredEffect;
    use crate::effect::{Effect, Side};
    use crate::mask::Coherency;
    use crate::testing::{self, Fixture};

    #[test]
    fn classify_uses_millimeter_tolerance() {
        assert_eq!(RangeClass::classify(1000.0, 1000.0005, 1.0e-3), RangeClass::Equal);
        assert_eq!(RangeClass::classify(900.0, 1000.0, 1.0e-3), RangeClass::Inside);
        assert_eq!(RangeClass::classify(1100.0, 1000.0, 1.0e-3), RangeClass::Outside);
    }

    #[test]
    fn unset_class_factor_is_unity() {
        let data = RadiusData {
            inside: Some(0.5),
            ..RadiusData::default()
        };
        assert_eq!(data.factor(RangeClass::Inside), 0.5);
        assert_eq!(data.factor(RangeClass::Outside), 1.0);
        assert_eq!(data.factor(RangeClass::Equal), 1.0);
    }

    #[test]
    fn configured_factor_scales_selected_channel() {
        let mut effect = Effect::new("range-gate", LayeredEffect::radius());
        effect.set_coherency(Coherency::NONCOHERENT);
        effect.layers_mut().data_mut().wildcard_mut().radius = RadiusData {
            inside: Some(0.25),
            outside: Some(4.0),
            ..RadiusData::default()
        };
        testing::initialize(&mut effect, Side::Attack);

        let mut fixture = Fixture::new();
        fixture.target.rcvr_to_target.range = 10_000.0;
        fixture.jammer_to_target.rcvr_to_xmtr.range = 20_000.0;
        let mut result = InteractionResult::default();
        effect.process_unmitigated(&fixture.env(0.0), &mut result);
        assert_eq!(effect.layers().radius_layer().unwrap().class(), Some(RangeClass::Inside));
        assert_eq!(result.noise.radius_factor, 0.25);
        assert_eq!(result.coherent.radius_factor, 1.0);
        assert!(result.has(Behavior::RADIUS_EFFECT));

        fixture.target.rcvr_to_target.range = 20_000.0;
        let mut result = InteractionResult::default();
        effect.process_unmitigated(&fixture.env(1.0), &mut result);
        assert_eq!(result.noise.radius_factor, 1.0);
        assert!(!result.has(Behavior::RADIUS_EFFECT));
    }
}
