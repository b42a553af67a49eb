//! Receiver agility: frequency hopping or mode switching in response to jamming.

use crate::effect::{ApplyScope, Effect, EffectKind, LayerStack};
use crate::mask::Behavior;
use crate::result::{AgilityAction, InteractionResult};

/// Requests a receiver reconfiguration when it mitigates an attack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgilityEffect {
    action: AgilityAction,
}

impl AgilityEffect {
    /// Hop frequency.
    #[must_use]
    pub fn frequency_change() -> Self {
        Self {
            action: AgilityAction::FrequencyChange,
        }
    }

    /// Switch to the sensor mode `mode`.
    #[must_use]
    pub fn mode_change(mode: impl Into<String>) -> Self {
        Self {
            action: AgilityAction::ModeChange(mode.into()),
        }
    }

    /// Requested action.
    #[must_use]
    pub fn action(&self) -> &AgilityAction {
        &self.action
    }
}

impl EffectKind for AgilityEffect {
    fn kind_name(&self) -> &'static str {
        "agility"
    }

    fn layers(&self) -> LayerStack {
        LayerStack::none()
    }

    fn default_behavior(&self) -> Behavior {
        Behavior::AGILITY_EFFECT
    }

    // Agility only reacts to an attack.
    fn apply_unmitigated(&self, _scope: &ApplyScope<'_>, _result: &mut InteractionResult) {}

    fn apply_mitigated(&self, scope: &ApplyScope<'_>, _counterpart: Option<&Effect>, result: &mut InteractionResult) {
        result.mask |= Behavior::AGILITY_EFFECT;
        result.agility = Some(self.action.clone());
        if scope.core.is_debug() {
            tracing::debug!(effect = %scope.core.name(), action = ?self.action, "agility requested");
        }
    }

    kind_any!();
}
