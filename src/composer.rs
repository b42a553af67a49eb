//! Top-level composition of attack effects against protect mitigations.
//!
//! The composer owns every attack context (keyed by jamming transmitter) and
//! protect context (keyed by victim receiver). One call to
//! [`EffectComposer::process`] folds every applicable effect of one
//! jammer/victim pair into a caller-owned [`InteractionResult`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::effect::EffectEnv;
use crate::em::{Interaction, Propagation};
use crate::error::EwResult;
use crate::false_target::FalseTargetTypes;
use crate::ids::{RcvrId, XmtrId};
use crate::mask::SystemFunction;
use crate::random::SharedRandom;
use crate::result::InteractionResult;
use crate::side::{AttackContext, InteractionSide, ProtectContext};

/// Interactions of one composition pass.
#[derive(Clone, Copy)]
pub struct Engagement<'a> {
    /// Simulation time (s).
    pub sim_time: f64,
    /// Detection attempt: radar transmitter, victim receiver, target.
    pub target: &'a Interaction,
    /// Jammer transmitter to victim receiver.
    pub jammer_to_target: &'a Interaction,
    /// Victim to jammer, when computed.
    pub target_to_jammer: Option<&'a Interaction>,
}

/// Registry of attack and protect contexts plus the shared services their
/// effects read.
pub struct EffectComposer {
    config: EngineConfig,
    random: SharedRandom,
    false_targets: FalseTargetTypes,
    propagation: Arc<dyn Propagation>,
    attacks: BTreeMap<XmtrId, AttackContext>,
    protects: BTreeMap<RcvrId, ProtectContext>,
    initialized: bool,
}

impl std::fmt::Debug for EffectComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectComposer")
            .field("config", &self.config)
            .field("attacks", &self.attacks.len())
            .field("protects", &self.protects.len())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl EffectComposer {
    /// Creates an empty composer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation.
    pub fn new(config: EngineConfig, propagation: Arc<dyn Propagation>) -> EwResult<Self> {
        config.validate()?;
        Ok(Self {
            random: SharedRandom::new(config.seed),
            config,
            false_targets: FalseTargetTypes::default(),
            propagation,
            attacks: BTreeMap::new(),
            protects: BTreeMap::new(),
            initialized: false,
        })
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// False-target type registry.
    #[must_use]
    pub fn false_targets(&self) -> &FalseTargetTypes {
        &self.false_targets
    }

    /// True once [`initialize`](Self::initialize) succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Attaches the attack context of `xmtr`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// When the composer is already initialized the context is initialized
    /// here, and its failure is returned without attaching it.
    pub fn attach_attack(&mut self, xmtr: XmtrId, mut context: AttackContext) -> EwResult<()> {
        if self.initialized {
            context.initialize(&self.random, &self.config, &self.false_targets)?;
        }
        if self.attacks.insert(xmtr, context).is_some() {
            debug!(%xmtr, "attack context replaced");
        }
        Ok(())
    }

    /// Attaches the protect context of `rcvr`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// As for [`attach_attack`](Self::attach_attack).
    pub fn attach_protect(&mut self, rcvr: RcvrId, mut context: ProtectContext) -> EwResult<()> {
        if self.initialized {
            context.initialize(&self.random, &self.config, &self.false_targets)?;
        }
        if self.protects.insert(rcvr, context).is_some() {
            debug!(%rcvr, "protect context replaced");
        }
        Ok(())
    }

    /// Detaches the attack context of `xmtr` and drops its state from every
    /// protect effect.
    pub fn detach_attack(&mut self, xmtr: XmtrId) -> Option<AttackContext> {
        let context = self.attacks.remove(&xmtr);
        self.remove_jammer(xmtr);
        context
    }

    /// Detaches the protect context of `rcvr`.
    pub fn detach_protect(&mut self, rcvr: RcvrId) -> Option<ProtectContext> {
        self.protects.remove(&rcvr)
    }

    /// Attack context of `xmtr`.
    #[must_use]
    pub fn attack(&self, xmtr: XmtrId) -> Option<&AttackContext> {
        self.attacks.get(&xmtr)
    }

    /// Mutable attack context of `xmtr`, for technique selection.
    pub fn attack_mut(&mut self, xmtr: XmtrId) -> Option<&mut AttackContext> {
        self.attacks.get_mut(&xmtr)
    }

    /// Protect context of `rcvr`.
    #[must_use]
    pub fn protect(&self, rcvr: RcvrId) -> Option<&ProtectContext> {
        self.protects.get(&rcvr)
    }

    /// Mutable protect context of `rcvr`, for technique selection.
    pub fn protect_mut(&mut self, rcvr: RcvrId) -> Option<&mut ProtectContext> {
        self.protects.get_mut(&rcvr)
    }

    /// Initializes every attached context in id order.
    ///
    /// # Errors
    ///
    /// Returns the first context failure; the composer stays uninitialized.
    pub fn initialize(&mut self) -> EwResult<()> {
        for context in self.attacks.values_mut() {
            context.initialize(&self.random, &self.config, &self.false_targets)?;
        }
        for context in self.protects.values_mut() {
            context.initialize(&self.random, &self.config, &self.false_targets)?;
        }
        self.initialized = true;
        debug!(
            attacks = self.attacks.len(),
            protects = self.protects.len(),
            false_targets = self.false_targets.len(),
            "composer initialized"
        );
        Ok(())
    }

    /// Forgets every protect effect's state for `xmtr`.
    pub fn remove_jammer(&mut self, xmtr: XmtrId) {
        for context in self.protects.values_mut() {
            context.remove_jammer(xmtr);
        }
        trace!(%xmtr, "jammer removed");
    }

    /// Composes every in-use attack effect of the engagement's jammer, and
    /// unless `attack_only`, the victim's mitigations of each, into `result`.
    ///
    /// Returns false if the jammer has no attack context or the composer is
    /// not initialized; `result` is then untouched.
    pub fn process(&mut self, engagement: &Engagement<'_>, attack_only: bool, result: &mut InteractionResult) -> bool {
        if !self.initialized {
            warn!("composer processed before initialize");
            return false;
        }
        let (Some(jammer), Some(receiver)) = (
            engagement.jammer_to_target.transmitter.as_ref(),
            engagement.target.receiver.as_ref(),
        ) else {
            return false;
        };
        let Some(attack) = self.attacks.get_mut(&jammer.id) else {
            return false;
        };
        let mut protect = self.protects.get_mut(&receiver.id);

        result.begin_pass();
        let victim_function = SystemFunction::from(receiver.function);
        let jammer_function = SystemFunction::from(jammer.function);
        let env = EffectEnv {
            sim_time: engagement.sim_time,
            target: engagement.target,
            jammer_to_target: engagement.jammer_to_target,
            target_to_jammer: engagement.target_to_jammer,
            propagation: self.propagation.as_ref(),
        };

        for technique in attack.techniques_mut().in_use_mut() {
            if !technique.acts_on(victim_function) {
                continue;
            }
            for effect in technique.effects_mut() {
                result.ea_coherency |= effect.coherency();
                effect.process_unmitigated(&env, result);
                if attack_only {
                    continue;
                }
                let Some(protect) = protect.as_mut() else {
                    continue;
                };
                let keys = protect.mitigating_effects(effect, jammer_function);
                if keys.is_empty() && effect.is_debug() {
                    debug!(
                        effect = %effect.name(),
                        rcvr = %receiver.id,
                        "no mitigating effects"
                    );
                }
                for key in &keys {
                    if let Some(mitigation) = protect.effect_mut(key) {
                        mitigation.process_mitigated(&env, result, Some(&mut *effect));
                    }
                }
            }
        }
        trace!(
            xmtr = %jammer.id,
            rcvr = %receiver.id,
            mask = result.mask.bits(),
            "interaction composed"
        );
        true
    }
}
