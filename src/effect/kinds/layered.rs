//! Plain gain chains with no leaf behavior.

use serde::{Deserialize, Serialize};

use crate::effect::{EffectKind, LayerStack};
use crate::mask::Behavior;

/// Which layers the chain stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    Radius,
    Repeater,
    Power,
    Pulse,
}

/// An effect that is only its layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayeredEffect {
    chain: Chain,
}

impl LayeredEffect {
    /// Range-conditioned factor only.
    #[must_use]
    pub const fn radius() -> Self {
        Self { chain: Chain::Radius }
    }

    /// Radius plus repeater gain control.
    #[must_use]
    pub const fn repeater() -> Self {
        Self { chain: Chain::Repeater }
    }

    /// Radius, repeater and static power gains.
    #[must_use]
    pub const fn power() -> Self {
        Self { chain: Chain::Power }
    }

    /// Every layer including pulse density tracking.
    #[must_use]
    pub const fn pulse() -> Self {
        Self { chain: Chain::Pulse }
    }

    /// The stacked chain.
    #[must_use]
    pub const fn chain(&self) -> Chain {
        self.chain
    }
}

impl EffectKind for LayeredEffect {
    fn kind_name(&self) -> &'static str {
        match self.chain {
            Chain::Radius => "radius",
            Chain::Repeater => "repeater",
            Chain::Power => "power",
            Chain::Pulse => "pulse",
        }
    }

    fn layers(&self) -> LayerStack {
        match self.chain {
            Chain::Radius => LayerStack::radius(),
            Chain::Repeater => LayerStack::repeater(),
            Chain::Power => LayerStack::power(),
            Chain::Pulse => LayerStack::pulse(),
        }
    }

    fn default_behavior(&self) -> Behavior {
        match self.chain {
            Chain::Radius => Behavior::RADIUS_EFFECT,
            Chain::Repeater => Behavior::REPEATER_EFFECT,
            Chain::Power => Behavior::JAMMER_POWER_EFFECT,
            Chain::Pulse => Behavior::PULSE_EFFECT,
        }
    }

    kind_any!();
}
