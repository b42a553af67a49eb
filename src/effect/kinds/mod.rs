//! Leaf effect kinds.
//!
//! | Kind | Layers | Side |
//! |---|---|---|
//! | [`LayeredEffect`] | radius .. pulse | either |
//! | [`CommEffect`] | power | attack or protect |
//! | [`TrackEffect`] | pulse | attack or protect |
//! | [`AgilityEffect`] | none | protect |
//! | [`SlcDegradeEffect`] | power | attack |
//! | [`RandomPulseJamming`] | pulse | attack |
//! | [`FalseTargetEffect`] | pulse | attack |
//! | [`SimpleFalseTarget`] | pulse | attack |
//! | [`SidelobeCanceler`] | power | protect |
//! | [`SidelobeBlanker`] | power | protect |
//! | [`PulseSuppressor`] | pulse | protect |

macro_rules! kind_any {
    () => {
        fn clone_box(&self) -> Box<dyn $crate::effect::EffectKind> {
            Box::new(self.clone())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}

mod agility;
mod auxiliary;
mod comm;
mod false_target;
mod layered;
mod pulse_suppress;
mod rpj;
mod simple_ft;
mod slb;
mod slc;
mod slc_degrade;
mod track;

pub use agility::AgilityEffect;
pub use auxiliary::AuxChannel;
pub use comm::{CommBehavior, CommData, CommEffect};
pub use false_target::{FalseTargetData, FalseTargetEffect, FtSource};
pub use layered::{Chain, LayeredEffect};
pub use pulse_suppress::{
    Fraction, FractionCriterion, ModulationRules, Polarity, PulseSuppressor, RangeCriterion, RangeRules,
    SuppressionData,
};
pub use rpj::{RandomPulseJamming, RpjData};
pub use simple_ft::{SimpleFalseTarget, SimpleFtData};
pub use slb::{BlankerState, SidelobeBlanker, SlbConfig, TargetBlanking};
pub use slc::{CancelerState, CancellationMethod, SidelobeCanceler, SlcConfig};
pub use slc_degrade::{SlcDegradeData, SlcDegradeEffect};
pub use track::{TrackBehavior, TrackData, TrackEffect};
