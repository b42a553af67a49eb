//! Effects: the unit of jamming or mitigation behavior.
//!
//! An [`Effect`] is a shared [`EffectCore`] (masks, target policy,
//! diagnostics, random stream), a [`LayerStack`] of gain layers, and a
//! boxed [`EffectKind`] holding the leaf behavior. Processing runs
//! update then apply under a re-entrancy guard:
//!
//! ```text
//! process_unmitigated ──> allow_target ──> layers.update ──> kind.update
//!                                                          └─> kind.apply_unmitigated ──> layers
//! ```

mod data;
pub mod kinds;
pub mod layers;

pub use data::EffectDataMap;
pub use layers::LayerStack;

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashSet;
use std::fmt::Debug;
use tracing::{debug, trace};

use crate::config::{EngineConfig, Tolerances};
use crate::em::{Interaction, Platform, Propagation, Receiver, Transmitter};
use crate::error::EwResult;
use crate::false_target::FalseTargetTypes;
use crate::ids::{RcvrId, SystemTypeId, TechniqueId, XmtrId};
use crate::mask::{Behavior, Coherency, SystemFunction};
use crate::random::{EffectRandom, SharedRandom};
use crate::result::{InteractionResult, ProtectTarget};
use layers::LayerUpdate;

/// Which side of the engagement owns an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Electronic attack.
    Attack,
    /// Electronic protection.
    Protect,
}

/// Which targets an effect may act on, relative to the attacking platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionPolicy {
    /// Every target.
    #[default]
    All,
    /// Only the attacker's own platform.
    SelfProtect,
    /// Every target except the attacker's own platform.
    NonSelfProtect,
}

/// Re-entrancy state of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardState {
    /// Not yet initialized; processing is refused.
    #[default]
    Uninitialized,
    /// Ready to process.
    Idle,
    /// Inside an update/apply pass.
    Updating,
}

/// Back-reference to the owning technique and side, as identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owner {
    pub side: Option<Side>,
    pub technique: Option<TechniqueId>,
    pub technique_class: Option<String>,
}

/// Identifiers of the interaction last processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentIds {
    pub target: Option<String>,
    pub xmtr_platform: Option<String>,
    pub rcvr_platform: Option<String>,
    pub xmtr: Option<XmtrId>,
    pub rcvr: Option<RcvrId>,
    /// System type the effect acts on; keys per-type data.
    pub effected: Option<SystemTypeId>,
    /// System type on the other end.
    pub effecting: Option<SystemTypeId>,
}

/// Parameters of an effect visible to other effects and the propagation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectView {
    pub coherency: Coherency,
    pub behavior: Behavior,
    pub system_functions: SystemFunction,
    /// Current jamming pulse density, if the effect tracks one.
    pub jamming_pulse_density: Option<f64>,
}

/// SLC degradation injected by an attacking effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlcDegradation {
    /// Multiplier on the achieved cancellation.
    pub value: f64,
    /// Canceler channels consumed.
    pub channels: u32,
    /// Polarization switching rate (Hz), if modulated.
    pub switching_rate: Option<f64>,
}

/// The interactions and services an effect update reads.
#[derive(Clone, Copy)]
pub struct EffectEnv<'a> {
    pub sim_time: f64,
    /// Detection attempt: radar transmitter, victim receiver, target.
    pub target: &'a Interaction,
    /// Jammer transmitter to victim receiver.
    pub jammer_to_target: &'a Interaction,
    /// Victim to jammer, when computed.
    pub target_to_jammer: Option<&'a Interaction>,
    pub propagation: &'a dyn Propagation,
}

impl<'a> EffectEnv<'a> {
    /// The jamming transmitter.
    #[must_use]
    pub fn jammer(&self) -> Option<&'a Transmitter> {
        self.jammer_to_target.transmitter.as_ref()
    }

    /// The victim receiver.
    #[must_use]
    pub fn receiver(&self) -> Option<&'a Receiver> {
        self.target.receiver.as_ref()
    }

    /// The radar transmitter of the detection attempt.
    #[must_use]
    pub fn radar(&self) -> Option<&'a Transmitter> {
        self.target.transmitter.as_ref()
    }

    /// The target platform.
    #[must_use]
    pub fn target_platform(&self) -> Option<&'a Platform> {
        self.target.target.as_ref()
    }
}

/// Services available while initializing an effect.
pub struct InitScope<'a> {
    pub random: &'a SharedRandom,
    pub config: &'a EngineConfig,
    pub false_targets: &'a FalseTargetTypes,
    /// Name of the platform owning the context, if attached to one.
    pub platform: Option<&'a str>,
}

/// Mutable view handed to [`EffectKind::update`].
pub struct UpdateScope<'a> {
    pub core: &'a mut EffectCore,
    pub layers: &'a mut LayerStack,
    pub env: &'a EffectEnv<'a>,
    pub result: &'a InteractionResult,
    /// The attacking effect, when updating a mitigation.
    pub counterpart: Option<&'a mut Effect>,
}

impl UpdateScope<'_> {
    /// Per-type data key of the current interaction.
    #[must_use]
    pub fn key(&self) -> Option<SystemTypeId> {
        self.core.current.effected.clone()
    }

    /// Snapshot of the effect being updated, after its layers updated.
    #[must_use]
    pub fn view(&self) -> EffectView {
        view_of(self.core, self.layers)
    }

    /// Snapshot of the attacking counterpart, if any.
    #[must_use]
    pub fn counterpart_view(&self) -> Option<EffectView> {
        self.counterpart.as_deref().map(Effect::view)
    }
}

/// Read-only view handed to the apply hooks.
pub struct ApplyScope<'a> {
    pub core: &'a EffectCore,
    pub layers: &'a LayerStack,
}

impl ApplyScope<'_> {
    /// Per-type data key of the current interaction.
    #[must_use]
    pub fn key(&self) -> Option<&SystemTypeId> {
        self.core.effected_key()
    }

    /// Applies every enabled layer for an attacking effect.
    pub fn layers_unmitigated(&self, result: &mut InteractionResult) {
        self.layers.apply_unmitigated(self.core, result);
    }

    /// Applies every enabled layer for a mitigating effect.
    pub fn layers_mitigated(&self, result: &mut InteractionResult) {
        self.layers.apply_mitigated(self.core, result);
    }
}

/// Leaf behavior of an effect.
pub trait EffectKind: Debug + Send + Sync + 'static {
    /// Short kind name for diagnostics.
    fn kind_name(&self) -> &'static str;

    /// Layers this kind builds on.
    fn layers(&self) -> LayerStack;

    /// Coherency of a freshly built effect.
    fn default_coherency(&self) -> Coherency {
        Coherency::NONE
    }

    /// Behavior tag of a freshly built effect.
    fn default_behavior(&self) -> Behavior {
        Behavior::empty()
    }

    /// Functions an attack-side effect acts on when none were configured.
    fn attack_functions(&self) -> SystemFunction {
        SystemFunction::SENSOR | SystemFunction::COMM
    }

    /// Validates configuration and resolves external references.
    fn initialize(&mut self, _core: &EffectCore, _layers: &mut LayerStack, _scope: &InitScope<'_>) -> EwResult<()> {
        Ok(())
    }

    /// Refreshes interaction-dependent state after the layers updated.
    fn update(&mut self, _scope: &mut UpdateScope<'_>) {}

    /// Applies the effect on the attacking side.
    fn apply_unmitigated(&self, scope: &ApplyScope<'_>, result: &mut InteractionResult) {
        scope.layers_unmitigated(result);
    }

    /// Applies the effect as a mitigation of `counterpart`.
    fn apply_mitigated(&self, scope: &ApplyScope<'_>, _counterpart: Option<&Effect>, result: &mut InteractionResult) {
        scope.layers_mitigated(result);
    }

    /// Forgets any state held for `xmtr`.
    fn remove_jammer(&mut self, _xmtr: XmtrId) {}

    /// True if a mitigation may scale this effect's pulse density.
    fn supports_density_scaling(&self) -> bool {
        false
    }

    /// SLC degradation this effect injects against `key`.
    fn slc_degradation(&self, _key: Option<&SystemTypeId>) -> Option<SlcDegradation> {
        None
    }

    fn clone_box(&self) -> Box<dyn EffectKind>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// State shared by every effect kind.
#[derive(Debug, Clone)]
pub struct EffectCore {
    name: String,
    coherency: Coherency,
    behavior: Behavior,
    system_functions: SystemFunction,
    protection: ProtectionPolicy,
    allowed_targets: HashSet<String>,
    rejected_targets: HashSet<String>,
    debug: bool,
    guard: GuardState,
    owner: Owner,
    current: CurrentIds,
    random: EffectRandom,
    tolerances: Tolerances,
}

impl EffectCore {
    fn new(name: String, kind: &dyn EffectKind) -> Self {
        Self {
            name,
            coherency: kind.default_coherency(),
            behavior: kind.default_behavior(),
            system_functions: SystemFunction::UNDEFINED,
            protection: ProtectionPolicy::All,
            allowed_targets: HashSet::new(),
            rejected_targets: HashSet::new(),
            debug: false,
            guard: GuardState::Uninitialized,
            owner: Owner::default(),
            current: CurrentIds::default(),
            random: EffectRandom::default(),
            tolerances: Tolerances::default(),
        }
    }

    /// Effect name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Coherency channels the effect applies to.
    #[must_use]
    pub fn coherency(&self) -> Coherency {
        self.coherency
    }

    /// Behavior tag.
    #[must_use]
    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Functions the effect acts on.
    #[must_use]
    pub fn system_functions(&self) -> SystemFunction {
        self.system_functions
    }

    /// True if verbose diagnostics are on.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Re-entrancy state.
    #[must_use]
    pub fn guard(&self) -> GuardState {
        self.guard
    }

    /// Owning side and technique.
    #[must_use]
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Identifiers of the last processed interaction.
    #[must_use]
    pub fn current(&self) -> &CurrentIds {
        &self.current
    }

    /// Per-type data key of the current interaction.
    #[must_use]
    pub fn effected_key(&self) -> Option<&SystemTypeId> {
        self.current.effected.as_ref()
    }

    /// Numeric thresholds.
    #[must_use]
    pub fn tolerances(&self) -> Tolerances {
        self.tolerances
    }

    /// The effect's private random stream.
    pub fn random(&mut self) -> &mut EffectRandom {
        &mut self.random
    }

    /// True if the effect may act on `target` when `attacker` is jamming.
    #[must_use]
    pub fn allow_target(&self, attacker: &Platform, target: Option<&Platform>) -> bool {
        let Some(target) = target else {
            return true;
        };
        let is_self = attacker.name == target.name;
        match self.protection {
            ProtectionPolicy::SelfProtect if !is_self => return false,
            ProtectionPolicy::NonSelfProtect if is_self => return false,
            _ => {}
        }
        let matches = |set: &HashSet<String>| set.contains(&target.name) || set.contains(&target.type_name);
        if matches(&self.rejected_targets) {
            return false;
        }
        self.allowed_targets.is_empty() || matches(&self.allowed_targets)
    }

    fn resolve_protection(&self, allowed: bool, result: &mut InteractionResult) {
        if allowed {
            result.for_each_channel(self.coherency, |g| g.protect_target = ProtectTarget::Yes);
        } else {
            result.mask |= Behavior::TARGET_REJECT_EFFECT;
            result.for_each_channel(self.coherency, |g| {
                if g.protect_target == ProtectTarget::Undefined {
                    g.protect_target = ProtectTarget::No;
                }
            });
        }
    }

    fn update_current_ids(&mut self, receiver: &Receiver, jammer: &Transmitter, target: Option<&Platform>) {
        let current = &mut self.current;
        current.target = target.map(|t| t.name.clone());
        current.xmtr_platform = Some(jammer.platform.name.clone());
        current.rcvr_platform = Some(receiver.platform.name.clone());
        current.xmtr = Some(jammer.id);
        current.rcvr = Some(receiver.id);
        let (effected, effecting) = match self.owner.side {
            Some(Side::Protect) => (&jammer.part_type, &receiver.part_type),
            _ => (&receiver.part_type, &jammer.part_type),
        };
        current.effected = Some(effected.clone());
        current.effecting = Some(effecting.clone());
    }
}

/// One jamming or mitigation behavior.
#[derive(Debug)]
pub struct Effect {
    core: EffectCore,
    layers: LayerStack,
    kind: Box<dyn EffectKind>,
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            layers: self.layers.clone(),
            kind: self.kind.clone_box(),
        }
    }
}

impl Effect {
    /// Builds an effect of `kind` with the kind's default layers and masks.
    pub fn new(name: impl Into<String>, kind: impl EffectKind) -> Self {
        let core = EffectCore::new(name.into(), &kind);
        Self {
            core,
            layers: kind.layers(),
            kind: Box::new(kind),
        }
    }

    /// Shared state.
    #[must_use]
    pub fn core(&self) -> &EffectCore {
        &self.core
    }

    /// Effect name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Leaf kind name.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.kind.kind_name()
    }

    /// Coherency channels.
    #[must_use]
    pub fn coherency(&self) -> Coherency {
        self.core.coherency
    }

    /// Sets the coherency channels.
    pub fn set_coherency(&mut self, coherency: Coherency) {
        self.core.coherency = coherency;
    }

    /// Behavior tag.
    #[must_use]
    pub fn behavior(&self) -> Behavior {
        self.core.behavior
    }

    /// Sets the behavior tag.
    pub fn set_behavior(&mut self, behavior: Behavior) {
        self.core.behavior = behavior;
    }

    /// Functions the effect acts on.
    #[must_use]
    pub fn system_functions(&self) -> SystemFunction {
        self.core.system_functions
    }

    /// Replaces the function mask.
    pub fn set_system_functions(&mut self, functions: SystemFunction) {
        self.core.system_functions = functions;
    }

    /// Sets the target protection policy.
    pub fn set_protection(&mut self, policy: ProtectionPolicy) {
        self.core.protection = policy;
    }

    /// Adds a target name or type to the allow set.
    pub fn allow_target_named(&mut self, name: impl Into<String>) {
        self.core.allowed_targets.insert(name.into());
    }

    /// Adds a target name or type to the reject set.
    pub fn reject_target_named(&mut self, name: impl Into<String>) {
        self.core.rejected_targets.insert(name.into());
    }

    /// Enables verbose diagnostics.
    pub fn set_debug(&mut self, debug: bool) {
        self.core.debug = debug;
    }

    /// True if verbose diagnostics are on.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.core.debug
    }

    /// True once initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.core.guard != GuardState::Uninitialized
    }

    /// See [`EffectCore::allow_target`].
    #[must_use]
    pub fn allow_target(&self, attacker: &Platform, target: Option<&Platform>) -> bool {
        self.core.allow_target(attacker, target)
    }

    /// Gain layers.
    #[must_use]
    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// Mutable gain layers, for configuration.
    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    /// Leaf kind, downcast to `K`.
    #[must_use]
    pub fn kind<K: EffectKind>(&self) -> Option<&K> {
        self.kind.as_any().downcast_ref::<K>()
    }

    /// Mutable leaf kind, downcast to `K`.
    pub fn kind_mut<K: EffectKind>(&mut self) -> Option<&mut K> {
        self.kind.as_any_mut().downcast_mut::<K>()
    }

    /// Snapshot of the parameters other effects read.
    #[must_use]
    pub fn view(&self) -> EffectView {
        view_of(&self.core, &self.layers)
    }

    /// Jamming pulse density against `jammer`; the transmitter duty cycle
    /// when the effect does not track one.
    #[must_use]
    pub fn jamming_pulse_density(&self, jammer: &Transmitter) -> f64 {
        self.layers
            .jamming_pulse_density()
            .unwrap_or_else(|| jammer.duty_cycle())
    }

    /// Scales the pulse density for the next update, if the kind allows it.
    pub fn scale_jamming_pulse_density(&mut self, factor: f64) -> bool {
        self.kind.supports_density_scaling() && self.layers.set_density_factor(factor)
    }

    /// True if a mitigation may scale this effect's pulse density.
    #[must_use]
    pub fn supports_density_scaling(&self) -> bool {
        self.kind.supports_density_scaling()
    }

    /// SLC degradation this effect injects against `key`.
    #[must_use]
    pub fn slc_degradation(&self, key: Option<&SystemTypeId>) -> Option<SlcDegradation> {
        self.kind.slc_degradation(key)
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        self.core.owner = owner;
    }

    pub(crate) fn owner_mut(&mut self) -> &mut Owner {
        &mut self.core.owner
    }

    /// Seeds the random stream, resolves defaults and validates every
    /// per-type entry.
    pub fn initialize(&mut self, scope: &InitScope<'_>) -> EwResult<()> {
        self.core.random.reseed(scope.random.draw_seed());
        self.core.tolerances = scope.config.tolerances;
        if scope.config.force_debug {
            self.core.debug = true;
        }
        if self.core.system_functions == SystemFunction::UNDEFINED {
            match self.core.owner.side {
                Some(Side::Protect) => self.core.system_functions = SystemFunction::JAMMER,
                Some(Side::Attack) => self.core.system_functions = self.kind.attack_functions(),
                None => {}
            }
        }
        self.kind.initialize(&self.core, &mut self.layers, scope)?;
        self.layers.initialize(&self.core.name)?;
        self.core.guard = GuardState::Idle;
        trace!(effect = %self.core.name, kind = self.kind.kind_name(), "effect initialized");
        Ok(())
    }

    /// Updates and applies the effect on the attacking side.
    pub fn process_unmitigated(&mut self, env: &EffectEnv<'_>, result: &mut InteractionResult) {
        self.process(env, result, None, false);
    }

    /// Updates and applies the effect as a mitigation of `counterpart`.
    ///
    /// Skipped when the counterpart itself does not act on the target.
    pub fn process_mitigated(&mut self, env: &EffectEnv<'_>, result: &mut InteractionResult, counterpart: Option<&mut Effect>) {
        if let (Some(attacker), Some(jammer)) = (counterpart.as_deref(), env.jammer()) {
            if !attacker.allow_target(&jammer.platform, env.target_platform()) {
                trace!(effect = %self.core.name, counterpart = %attacker.name(), "counterpart rejects target");
                return;
            }
        }
        self.process(env, result, counterpart, true);
    }

    fn process(&mut self, env: &EffectEnv<'_>, result: &mut InteractionResult, mut counterpart: Option<&mut Effect>, mitigated: bool) {
        match self.core.guard {
            GuardState::Idle => {}
            GuardState::Updating => {
                trace!(effect = %self.core.name, "re-entrant process skipped");
                return;
            }
            GuardState::Uninitialized => {
                debug_assert!(false, "effect '{}' processed before initialize", self.core.name);
                return;
            }
        }
        let (Some(jammer), Some(receiver)) = (env.jammer(), env.receiver()) else {
            trace!(effect = %self.core.name, "interaction lacks jammer or receiver");
            return;
        };
        let target = env.target_platform();
        let allowed = self.core.allow_target(&jammer.platform, target);
        self.core.resolve_protection(allowed, result);
        if !allowed {
            self.core.update_current_ids(receiver, jammer, target);
            if self.core.debug {
                debug!(
                    effect = %self.core.name,
                    target = target.map_or("", |t| t.name.as_str()),
                    "target rejected"
                );
            }
            return;
        }

        self.core.guard = GuardState::Updating;
        self.update_effects(env, receiver, jammer, result, counterpart.as_deref_mut());
        let scope = ApplyScope {
            core: &self.core,
            layers: &self.layers,
        };
        if mitigated {
            self.kind.apply_mitigated(&scope, counterpart.as_deref(), result);
        } else {
            self.kind.apply_unmitigated(&scope, result);
        }
        self.core.guard = GuardState::Idle;
    }

    fn update_effects(
        &mut self,
        env: &EffectEnv<'_>,
        receiver: &Receiver,
        jammer: &Transmitter,
        result: &InteractionResult,
        counterpart: Option<&mut Effect>,
    ) {
        let Self { core, layers, kind } = self;
        core.update_current_ids(receiver, jammer, env.target_platform());
        let view = view_of(core, layers);
        layers.update(&LayerUpdate {
            core,
            env,
            result,
            view: &view,
        });
        let mut scope = UpdateScope {
            core,
            layers,
            env,
            result,
            counterpart,
        };
        kind.update(&mut scope);
    }

    /// Forgets any state held for `xmtr`.
    pub fn remove_jammer(&mut self, xmtr: XmtrId) {
        self.kind.remove_jammer(xmtr);
    }
}

fn view_of(core: &EffectCore, layers: &LayerStack) -> EffectView {
    EffectView {
        coherency: core.coherency,
        behavior: core.behavior,
        system_functions: core.system_functions,
        jamming_pulse_density: layers.jamming_pulse_density(),
    }
}
