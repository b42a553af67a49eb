//! Techniques: named, selectable groups of effects.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::effect::{Effect, InitScope, Side};
use crate::error::{ConfigError, EwResult};
use crate::ids::TechniqueId;
use crate::mask::SystemFunction;

/// What a protect technique mitigates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationRef {
    /// A specific attack technique.
    Technique(TechniqueId),
    /// Every attack technique of a class.
    Class(String),
}

/// A group of effects selected and deselected together.
#[derive(Debug, Clone)]
pub struct Technique {
    id: TechniqueId,
    class: Option<String>,
    default_on: bool,
    debug: bool,
    externally_controlled: bool,
    effects: Vec<Effect>,
    mitigates: Vec<MitigationRef>,
}

impl Technique {
    /// Creates an empty technique.
    #[must_use]
    pub fn new(id: impl Into<TechniqueId>) -> Self {
        Self {
            id: id.into(),
            class: None,
            default_on: false,
            debug: false,
            externally_controlled: false,
            effects: Vec::new(),
            mitigates: Vec::new(),
        }
    }

    /// Sets the mitigation class (builder style).
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.set_class(Some(class.into()));
        self
    }

    /// Technique identifier.
    #[must_use]
    pub fn id(&self) -> &TechniqueId {
        &self.id
    }

    /// Mitigation class, if any.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Sets the mitigation class and updates every effect's owner record.
    pub fn set_class(&mut self, class: Option<String>) {
        for effect in &mut self.effects {
            effect.owner_mut().technique_class.clone_from(&class);
        }
        self.class = class;
    }

    /// True if the technique is selected when its context initializes.
    #[must_use]
    pub fn default_on(&self) -> bool {
        self.default_on
    }

    /// Sets whether the technique starts selected.
    pub fn set_default_on(&mut self, on: bool) {
        self.default_on = on;
    }

    /// True if verbose diagnostics are on for every effect.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Turns on verbose diagnostics for every effect at initialization.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// True if selection is driven by the host rather than the default.
    #[must_use]
    pub fn is_externally_controlled(&self) -> bool {
        self.externally_controlled
    }

    /// Marks selection as host driven.
    pub fn set_externally_controlled(&mut self, external: bool) {
        self.externally_controlled = external;
    }

    /// Adds an effect.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateEffect`] if an effect with the same
    /// name is already on this technique.
    pub fn add_effect(&mut self, mut effect: Effect) -> Result<(), ConfigError> {
        if self.effect(effect.name()).is_some() {
            return Err(ConfigError::DuplicateEffect {
                technique: self.id.to_string(),
                effect: effect.name().to_string(),
            });
        }
        let owner = effect.owner_mut();
        owner.technique = Some(self.id.clone());
        owner.technique_class.clone_from(&self.class);
        self.effects.push(effect);
        Ok(())
    }

    /// Effects in configuration order.
    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Mutable effects in configuration order.
    pub fn effects_mut(&mut self) -> &mut [Effect] {
        &mut self.effects
    }

    /// Effect by name.
    #[must_use]
    pub fn effect(&self, name: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.name() == name)
    }

    /// Mutable effect by name.
    pub fn effect_mut(&mut self, name: &str) -> Option<&mut Effect> {
        self.effects.iter_mut().find(|e| e.name() == name)
    }

    /// Declares an attack technique or class this technique mitigates.
    pub fn add_mitigation(&mut self, mitigation: MitigationRef) {
        if !self.mitigates.contains(&mitigation) {
            self.mitigates.push(mitigation);
        }
    }

    /// Declared mitigations.
    #[must_use]
    pub fn mitigations(&self) -> &[MitigationRef] {
        &self.mitigates
    }

    /// True if this technique mitigates the technique `id` of `class`.
    #[must_use]
    pub fn mitigates(&self, id: &TechniqueId, class: Option<&str>) -> bool {
        self.mitigates.iter().any(|m| match m {
            MitigationRef::Technique(t) => t == id,
            MitigationRef::Class(c) => class == Some(c.as_str()),
        })
    }

    /// True if any effect acts on `function`.
    #[must_use]
    pub fn acts_on(&self, function: SystemFunction) -> bool {
        self.effects.iter().any(|e| e.system_functions().intersects(function))
    }

    /// Binds every effect to `side` and initializes it.
    ///
    /// # Errors
    ///
    /// Returns the first effect initialization failure.
    pub fn initialize(&mut self, side: Side, scope: &InitScope<'_>) -> EwResult<()> {
        for effect in &mut self.effects {
            effect.owner_mut().side = Some(side);
            if self.debug {
                effect.set_debug(true);
            }
            effect.initialize(scope)?;
        }
        trace!(technique = %self.id, effects = self.effects.len(), "technique initialized");
        Ok(())
    }
}
