//! Attack and protect contexts.
//!
//! A context owns the techniques of one jamming transmitter (attack) or one
//! victim receiver (protect) and tracks which of them are in use. Effects
//! refer back to their technique and side by identifier only.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::effect::{Effect, InitScope, Side};
use crate::error::{ConfigError, EwResult};
use crate::false_target::FalseTargetTypes;
use crate::ids::{EffectKey, TechniqueId, XmtrId};
use crate::mask::SystemFunction;
use crate::random::SharedRandom;
use crate::technique::Technique;

/// Techniques in insertion order plus the in-use selection.
#[derive(Debug, Clone, Default)]
pub struct TechniqueSet {
    techniques: Vec<Technique>,
    in_use: BTreeSet<usize>,
}

impl TechniqueSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a technique.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateTechnique`] if the identifier exists.
    pub fn add(&mut self, technique: Technique) -> Result<(), ConfigError> {
        if self.index_of(technique.id()).is_some() {
            return Err(ConfigError::DuplicateTechnique {
                id: technique.id().to_string(),
            });
        }
        self.techniques.push(technique);
        Ok(())
    }

    /// Position of `id` in insertion order.
    #[must_use]
    pub fn index_of(&self, id: &TechniqueId) -> Option<usize> {
        self.techniques.iter().position(|t| t.id() == id)
    }

    /// Technique by identifier.
    #[must_use]
    pub fn get(&self, id: &TechniqueId) -> Option<&Technique> {
        self.techniques.iter().find(|t| t.id() == id)
    }

    /// Mutable technique by identifier.
    pub fn get_mut(&mut self, id: &TechniqueId) -> Option<&mut Technique> {
        self.techniques.iter_mut().find(|t| t.id() == id)
    }

    /// Every technique in insertion order.
    #[must_use]
    pub fn all(&self) -> &[Technique] {
        &self.techniques
    }

    /// Number of techniques.
    #[must_use]
    pub fn len(&self) -> usize {
        self.techniques.len()
    }

    /// True if no technique was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }

    /// Selects the technique at `index`; returns false if it already was.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTechnique`] for an index out of range.
    pub fn select_index(&mut self, index: usize) -> Result<bool, ConfigError> {
        if index >= self.techniques.len() {
            return Err(ConfigError::UnknownTechnique { id: format!("#{index}") });
        }
        Ok(self.in_use.insert(index))
    }

    /// Selects `id`; returns false if it already was.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTechnique`] if `id` is not defined.
    pub fn select(&mut self, id: &TechniqueId) -> Result<bool, ConfigError> {
        let index = self.require(id)?;
        Ok(self.in_use.insert(index))
    }

    /// Selects `id` only if one of its effects acts on `function`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTechnique`] if `id` is not defined.
    pub fn select_for(&mut self, id: &TechniqueId, function: SystemFunction) -> Result<bool, ConfigError> {
        let index = self.require(id)?;
        if !self.techniques[index].acts_on(function) {
            return Ok(false);
        }
        Ok(self.in_use.insert(index))
    }

    /// Deselects `id`; returns false if it was not in use or is not defined.
    pub fn deselect(&mut self, id: &TechniqueId) -> bool {
        self.index_of(id).is_some_and(|index| self.in_use.remove(&index))
    }

    /// Deselects the technique at `index`; returns false if it was not in use.
    pub fn deselect_index(&mut self, index: usize) -> bool {
        self.in_use.remove(&index)
    }

    /// True if `id` is selected.
    #[must_use]
    pub fn is_in_use(&self, id: &TechniqueId) -> bool {
        self.index_of(id).is_some_and(|i| self.in_use.contains(&i))
    }

    /// Selected techniques in insertion order.
    pub fn in_use(&self) -> impl Iterator<Item = &Technique> {
        self.in_use.iter().filter_map(move |&i| self.techniques.get(i))
    }

    /// Mutable selected techniques in insertion order.
    pub fn in_use_mut(&mut self) -> impl Iterator<Item = &mut Technique> {
        let in_use = &self.in_use;
        self.techniques
            .iter_mut()
            .enumerate()
            .filter(move |(i, _)| in_use.contains(i))
            .map(|(_, t)| t)
    }

    /// True if `id` is in use and one of its effects acts on `function`.
    #[must_use]
    pub fn can_apply(&self, id: &TechniqueId, function: SystemFunction) -> bool {
        self.is_in_use(id) && self.get(id).is_some_and(|t| t.acts_on(function))
    }

    /// Effect at `key`.
    #[must_use]
    pub fn effect(&self, key: &EffectKey) -> Option<&Effect> {
        self.get(&key.technique)?.effects().get(key.index)
    }

    /// Mutable effect at `key`.
    pub fn effect_mut(&mut self, key: &EffectKey) -> Option<&mut Effect> {
        self.get_mut(&key.technique)?.effects_mut().get_mut(key.index)
    }

    fn require(&self, id: &TechniqueId) -> Result<usize, ConfigError> {
        self.index_of(id)
            .ok_or_else(|| ConfigError::UnknownTechnique { id: id.to_string() })
    }

    fn initialize(&mut self, side: Side, scope: &InitScope<'_>) -> EwResult<()> {
        for (index, technique) in self.techniques.iter_mut().enumerate() {
            technique.initialize(side, scope)?;
            if technique.default_on() {
                self.in_use.insert(index);
            }
        }
        Ok(())
    }
}

/// Behavior shared by the attack and protect contexts.
pub trait InteractionSide {
    /// Which side this context is.
    fn side(&self) -> Side;

    /// Name of the owning platform, if attached to one.
    fn platform(&self) -> Option<&str>;

    /// Owned techniques.
    fn techniques(&self) -> &TechniqueSet;

    /// Mutable owned techniques.
    fn techniques_mut(&mut self) -> &mut TechniqueSet;

    /// Adds a technique.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateTechnique`] if the identifier exists.
    fn add_technique(&mut self, technique: Technique) -> Result<(), ConfigError> {
        self.techniques_mut().add(technique)
    }

    /// Selects `id`; selecting twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTechnique`] if `id` is not defined.
    fn select(&mut self, id: &TechniqueId) -> Result<bool, ConfigError> {
        let selected = self.techniques_mut().select(id)?;
        trace!(side = ?self.side(), technique = %id, selected, "select technique");
        Ok(selected)
    }

    /// Deselects `id`; deselecting an unused or undefined technique is a no-op.
    fn deselect(&mut self, id: &TechniqueId) -> bool {
        let deselected = self.techniques_mut().deselect(id);
        trace!(side = ?self.side(), technique = %id, deselected, "deselect technique");
        deselected
    }

    /// True if `id` is in use and acts on `function`.
    fn can_apply_technique(&self, id: &TechniqueId, function: SystemFunction) -> bool {
        self.techniques().can_apply(id, function)
    }

    /// Initializes every technique and selects the default-on ones.
    ///
    /// # Errors
    ///
    /// Returns the first effect initialization failure.
    fn initialize(&mut self, random: &SharedRandom, config: &EngineConfig, false_targets: &FalseTargetTypes) -> EwResult<()> {
        let side = self.side();
        let platform = self.platform().map(str::to_owned);
        let scope = InitScope {
            random,
            config,
            false_targets,
            platform: platform.as_deref(),
        };
        self.techniques_mut().initialize(side, &scope)?;
        debug!(
            ?side,
            platform = platform.as_deref().unwrap_or(""),
            techniques = self.techniques().len(),
            "context initialized"
        );
        Ok(())
    }
}

/// Electronic attack context of one jamming transmitter.
#[derive(Debug, Clone, Default)]
pub struct AttackContext {
    platform: Option<String>,
    techniques: TechniqueSet,
}

impl AttackContext {
    /// Creates a context owned by `platform`.
    #[must_use]
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: Some(platform.into()),
            techniques: TechniqueSet::new(),
        }
    }
}

impl InteractionSide for AttackContext {
    fn side(&self) -> Side {
        Side::Attack
    }

    fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    fn techniques(&self) -> &TechniqueSet {
        &self.techniques
    }

    fn techniques_mut(&mut self) -> &mut TechniqueSet {
        &mut self.techniques
    }
}

/// Electronic protection context of one victim receiver.
#[derive(Debug, Clone, Default)]
pub struct ProtectContext {
    platform: Option<String>,
    techniques: TechniqueSet,
}

impl ProtectContext {
    /// Creates a context owned by `platform`.
    #[must_use]
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: Some(platform.into()),
            techniques: TechniqueSet::new(),
        }
    }

    /// Effects of in-use techniques that mitigate `attacker` and act on
    /// `affected`.
    #[must_use]
    pub fn mitigating_effects(&self, attacker: &Effect, affected: SystemFunction) -> Vec<EffectKey> {
        let owner = attacker.core().owner();
        let Some(attacking) = owner.technique.as_ref() else {
            return Vec::new();
        };
        let class = owner.technique_class.as_deref();
        self.techniques
            .in_use()
            .filter(|t| t.mitigates(attacking, class))
            .flat_map(|t| {
                t.effects()
                    .iter()
                    .enumerate()
                    .filter(move |(_, e)| e.system_functions().intersects(affected))
                    .map(move |(index, _)| EffectKey {
                        technique: t.id().clone(),
                        index,
                    })
            })
            .collect()
    }

    /// Mutable effect at `key`.
    pub fn effect_mut(&mut self, key: &EffectKey) -> Option<&mut Effect> {
        self.techniques.effect_mut(key)
    }

    /// Forgets jammer state held by every protect effect.
    pub fn remove_jammer(&mut self, xmtr: XmtrId) {
        for technique in &mut self.techniques.techniques {
            for effect in technique.effects_mut() {
                effect.remove_jammer(xmtr);
            }
        }
    }
}

impl InteractionSide for ProtectContext {
    fn side(&self) -> Side {
        Side::Protect
    }

    fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    fn techniques(&self) -> &TechniqueSet {
        &self.techniques
    }

    fn techniques_mut(&mut self) -> &mut TechniqueSet {
        &mut self.techniques
    }
}
