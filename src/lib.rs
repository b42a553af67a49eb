//! # ew-effects - Electronic-warfare effect composition
//!
//! Decides which jamming effects apply to a jammer/victim interaction, which
//! protection techniques mitigate them, and folds the outcome into one
//! multiplicative gain and behavior record for the propagation layer.
//!
//! ## Core Concepts
//!
//! - **Effect**: one jamming or mitigation behavior over a stack of gain layers
//! - **Technique**: a named, selectable group of effects
//! - **AttackContext / ProtectContext**: the techniques of one jammer or victim
//! - **EffectComposer**: walks attack effects against their mitigations
//! - **InteractionResult**: the per-channel gains and behavior mask produced
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ew_effects::{AttackContext, Effect, EffectComposer, Engagement, EngineConfig, InteractionResult,
//!     InteractionSide, LayeredEffect, Technique, XmtrId};
//!
//! let mut noise = Effect::new("barrage", LayeredEffect::power());
//! noise.layers_mut().data_mut().wildcard_mut().power.jamming_power_gain = 2.0;
//! let mut technique = Technique::new("noise");
//! technique.set_default_on(true);
//! technique.add_effect(noise)?;
//!
//! let mut ea = AttackContext::new("escort");
//! ea.add_technique(technique)?;
//!
//! let mut composer = EffectComposer::new(EngineConfig::default(), propagation)?;
//! composer.attach_attack(XmtrId(1), ea)?;
//! composer.initialize()?;
//!
//! let mut result = InteractionResult::default();
//! composer.process(&Engagement { sim_time, target, jammer_to_target, target_to_jammer: None }, false, &mut result);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod config;
pub mod error;
pub mod ids;
pub mod mask;
pub mod random;
pub mod result;
pub mod table;

// Propagation interface
pub mod em;

// Effects and their composition
pub mod composer;
pub mod effect;
pub mod false_target;
pub mod side;
pub mod technique;

#[cfg(test)]
mod testing;

// Re-export primary types at crate root for convenience
pub use composer::{EffectComposer, Engagement};
pub use config::{EngineConfig, Tolerances};
pub use effect::kinds::{
    AgilityEffect, AuxChannel, BlankerState, CancelerState, CancellationMethod, CommBehavior, CommData, CommEffect,
    FalseTargetData, FalseTargetEffect, FtSource, LayeredEffect, PulseSuppressor, RandomPulseJamming, RpjData,
    SidelobeBlanker, SidelobeCanceler, SimpleFalseTarget, SimpleFtData, SlbConfig, SlcConfig, SlcDegradeData,
    SlcDegradeEffect, SuppressionData, TargetBlanking, TrackBehavior, TrackData, TrackEffect,
};
pub use effect::{
    Effect, EffectCore, EffectDataMap, EffectEnv, EffectKind, EffectView, LayerStack, ProtectionPolicy, Side,
};
pub use em::{AntennaPattern, Interaction, Platform, Propagation, Receiver, Transmitter};
pub use error::{ConfigError, EwError, EwResult};
pub use false_target::{FalseTarget, FalseTargetTypes, FtHandle};
pub use ids::{EffectKey, RcvrId, SystemTypeId, TechniqueId, XmtrId};
pub use mask::{Behavior, Channel, Coherency, GainControl, SystemFunction};
pub use result::{InteractionResult, JammingGains, TrackErrors};
pub use side::{AttackContext, InteractionSide, ProtectContext, TechniqueSet};
pub use technique::{MitigationRef, Technique};
