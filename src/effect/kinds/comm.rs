//! Communication message effects.

use serde::{Deserialize, Serialize};

use crate::effect::{ApplyScope, Effect, EffectCore, EffectDataMap, EffectKind, InitScope, LayerStack};
use crate::error::{ConfigError, EwResult};
use crate::mask::{Behavior, SystemFunction};
use crate::result::InteractionResult;

/// What the effect does to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommBehavior {
    /// Corrupt the message at a configured error rate.
    #[default]
    MessageError,
    DropMessage,
    MaintainMessage,
}

/// Message parameters for one system type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommData {
    /// Message error rate in [0, 1].
    pub message_error_rate: f64,
}

/// Message error, drop or maintain effect on a comm receiver.
#[derive(Debug, Clone, Default)]
pub struct CommEffect {
    behavior: CommBehavior,
    data: EffectDataMap<CommData>,
}

impl CommEffect {
    /// Creates an effect with the given message behavior.
    #[must_use]
    pub fn new(behavior: CommBehavior) -> Self {
        Self {
            behavior,
            data: EffectDataMap::default(),
        }
    }

    /// Message behavior.
    #[must_use]
    pub fn behavior(&self) -> CommBehavior {
        self.behavior
    }

    /// Per-type message data.
    pub fn data_mut(&mut self) -> &mut EffectDataMap<CommData> {
        &mut self.data
    }

    fn apply_message(&self, scope: &ApplyScope<'_>, result: &mut InteractionResult, mitigated: bool) {
        match self.behavior {
            CommBehavior::MessageError => {
                let rate = self.data.get(scope.key()).message_error_rate;
                result.mask |= Behavior::MESSAGE_ERROR;
                result.message_error_rate = if mitigated {
                    result.message_error_rate.min(rate)
                } else {
                    result.message_error_rate.max(rate)
                };
            }
            CommBehavior::DropMessage => {
                result.mask.insert(Behavior::DROP_MESSAGE);
                result.mask.remove(Behavior::MAINTAIN_MESSAGE);
            }
            CommBehavior::MaintainMessage => {
                result.mask.insert(Behavior::MAINTAIN_MESSAGE);
                result.mask.remove(Behavior::DROP_MESSAGE);
            }
        }
        if scope.core.is_debug() {
            tracing::debug!(
                effect = %scope.core.name(),
                behavior = ?self.behavior,
                message_error_rate = result.message_error_rate,
                mitigated,
                "comm effect applied"
            );
        }
    }
}

impl EffectKind for CommEffect {
    fn kind_name(&self) -> &'static str {
        "comm"
    }

    fn layers(&self) -> LayerStack {
        LayerStack::power()
    }

    fn attack_functions(&self) -> SystemFunction {
        SystemFunction::COMM
    }

    fn initialize(&mut self, core: &EffectCore, _layers: &mut LayerStack, _scope: &InitScope<'_>) -> EwResult<()> {
        for (_, data) in self.data.entries() {
            if !(0.0..=1.0).contains(&data.message_error_rate) {
                return Err(ConfigError::invalid_value(
                    format!("{}.message_error_rate", core.name()),
                    "must be in [0, 1]",
                )
                .into());
            }
        }
        Ok(())
    }

    fn apply_unmitigated(&self, scope: &ApplyScope<'_>, result: &mut InteractionResult) {
        scope.layers_unmitigated(result);
        self.apply_message(scope, result, false);
    }

    fn apply_mitigated(&self, scope: &ApplyScope<'_>, _counterpart: Option<&Effect>, result: &mut InteractionResult) {
        scope.layers_mitigated(result);
        self.apply_message(scope, result, true);
    }

    kind_any!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Side;
    use crate::ids::SystemTypeId;
    use crate::testing::{self, Fixture};

    fn comm(behavior: CommBehavior, rate: f64, side: Side) -> Effect {
        let mut kind = CommEffect::new(behavior);
        kind.data_mut().wildcard_mut().message_error_rate = rate;
        let mut effect = Effect::new("comm", kind);
        testing::initialize(&mut effect, side);
        effect
    }

    #[test]
    fn unmitigated_takes_max_and_mitigated_takes_min() {
        let fixture = Fixture::new();
        let env = fixture.env(0.0);
        let mut result = InteractionResult {
            message_error_rate: 0.2,
            ..InteractionResult::default()
        };

        let mut attack = comm(CommBehavior::MessageError, 0.5, Side::Attack);
        attack.process_unmitigated(&env, &mut result);
        assert!(result.has(Behavior::MESSAGE_ERROR));
        assert_eq!(result.message_error_rate, 0.5);

        let mut protect = comm(CommBehavior::MessageError, 0.2, Side::Protect);
        protect.process_mitigated(&env, &mut result, Some(&mut attack));
        assert_eq!(result.message_error_rate, 0.2);
    }

    #[test]
    fn drop_and_maintain_are_exclusive() {
        let fixture = Fixture::new();
        let env = fixture.env(0.0);
        let mut result = InteractionResult::default();

        let mut drop = comm(CommBehavior::DropMessage, 0.0, Side::Attack);
        drop.process_unmitigated(&env, &mut result);
        assert!(result.has(Behavior::DROP_MESSAGE));

        let mut maintain = comm(CommBehavior::MaintainMessage, 0.0, Side::Protect);
        maintain.process_mitigated(&env, &mut result, Some(&mut drop));
        assert!(result.has(Behavior::MAINTAIN_MESSAGE));
        assert!(!result.has(Behavior::DROP_MESSAGE));
    }

    #[test]
    fn per_type_rate_overrides_wildcard() {
        let mut kind = CommEffect::new(CommBehavior::MessageError);
        kind.data_mut().wildcard_mut().message_error_rate = 0.1;
        kind.data_mut().get_mut(Some(&SystemTypeId::new("ACQ"))).message_error_rate = 0.7;
        let mut effect = Effect::new("comm", kind);
        testing::initialize(&mut effect, Side::Attack);

        let fixture = Fixture::new();
        let mut result = InteractionResult::default();
        effect.process_unmitigated(&fixture.env(0.0), &mut result);
        assert_eq!(result.message_error_rate, 0.7);
    }

    #[test]
    fn rate_outside_unit_interval_fails_initialize() {
        let mut kind = CommEffect::new(CommBehavior::MessageError);
        kind.data_mut().wildcard_mut().message_error_rate = 1.5;
        let mut effect = Effect::new("comm", kind);
        let random = crate::random::SharedRandom::new(1);
        let config = crate::config::EngineConfig::default();
        let fts = crate::false_target::FalseTargetTypes::default();
        let scope = InitScope {
            random: &random,
            config: &config,
            false_targets: &fts,
            platform: None,
        };
        let Err(err) = effect.initialize(&scope) else {
            panic!("expected invalid rate to fail");
        };
        assert!(err.is_config());
    }

    #[test]
    fn attack_side_defaults_to_comm_function() {
        let effect = comm(CommBehavior::DropMessage, 0.0, Side::Attack);
        assert_eq!(effect.system_functions(), SystemFunction::COMM);
    }
}
