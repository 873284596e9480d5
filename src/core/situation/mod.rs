//=========================================================================
// Situation System
//=========================================================================
//
// Stack-based situation lifecycle and transition orchestration.
//
// Architecture:
//   SituationContainer (root)
//     ├─ stack: Vec<SituationHandle>
//     ├─ runner: CoroutineRunner  ◀── one in-flight TransitionInfo
//     └─ SituationHandle
//          ├─ behavior: Box<dyn Situation>
//          ├─ services: ServiceContainer (chained to parent)
//          └─ children: SituationContainer (nested stack)
//
// Flow:
//   transition() → stack mutation → Transition::transition_routine()
//   update() → runner.update() → top (or prev/next while in flight)
//
// State machine:
//   Invalid ─standby→ Standby ─load→ Loaded ─setup→ SetupFinished ─open→ Active
//   Active ─close→ SetupFinished ─cleanup→ Loaded ─unload→ Standby ─release→ Invalid
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use crate::core::coroutine::{done, Routine};
use crate::core::scope::Scope;
use crate::core::services::ServiceContainer;

//=== Module Declarations =================================================

mod container;
mod error;
mod handle;
pub mod transition;

#[cfg(test)]
pub(crate) mod testing;

//=== Public API ==========================================================

pub use container::SituationContainer;
pub use error::TransitionError;
pub use handle::{SituationHandle, SituationLifecycle};
pub use transition::{
    CrossTransition, OutInTransition, Transition, TransitionEffect, TransitionHandle,
    TransitionInfo, TransitionState,
};

//=== SituationState ======================================================

/// Lifecycle state of a situation. Ordered from detached to fully active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SituationState {
    /// Constructed or released; not attached to any container.
    Invalid,
    /// Attached to a container, nothing loaded.
    Standby,
    /// Load phase finished.
    Loaded,
    /// Setup finished; also the state while closing.
    SetupFinished,
    /// Open phase finished; receives updates.
    Active,
}

impl fmt::Display for SituationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

//=== Situation Trait =====================================================

/// Behaviour of a navigable situation (screen, scene, feature state).
///
/// Every hook has an empty default. Routine hooks return a `'static`
/// routine; clone whatever the routine needs out of `self` or the context
/// before returning it. The lifecycle guarantees the hook order described
/// in the module header, and each phase runs at most once per pass.
///
/// Hooks take `&self` and may run nested inside one another: a hook that
/// navigates its parent stack is asked `can_transition` while it is still
/// running. Keep mutable state in `Cell`/`RefCell` and do not hold a
/// borrow across a navigation call.
///
/// # Minimal Implementation
///
/// ```rust
/// use aetheric_situations::prelude::*;
///
/// struct Title;
///
/// impl Situation for Title {
///     fn on_update(&self, _cx: &SituationContext<'_>) {
///         // per-tick logic
///     }
/// }
///
/// let title = SituationHandle::new(Title);
/// assert_eq!(title.state(), SituationState::Invalid);
/// ```
pub trait Situation: 'static {
    /// Called right after the situation is attached to a container.
    fn on_standby(&self, _cx: &SituationContext<'_>) {}

    /// Asynchronous acquisition. The load scope is fresh for this pass.
    fn load_routine(&self, _cx: &SituationContext<'_>) -> Routine {
        done()
    }

    /// Synchronous wiring of services and subscriptions.
    fn on_setup(&self, _cx: &SituationContext<'_>) {}

    /// Enter presentation. The animation scope expires right after it.
    fn open_routine(&self, _cx: &SituationContext<'_>) -> Routine {
        done()
    }

    /// Called once per tick while active and on top of its stack.
    fn on_update(&self, _cx: &SituationContext<'_>) {}

    /// Called once per tick after every `on_update`.
    fn on_late_update(&self, _cx: &SituationContext<'_>) {}

    /// Exit presentation. State is already `SetupFinished` when called.
    fn close_routine(&self, _cx: &SituationContext<'_>) -> Routine {
        done()
    }

    /// Tears down setup wiring. The setup scope expires afterwards.
    fn on_cleanup(&self, _cx: &SituationContext<'_>) {}

    /// Releases loaded resources. The load scope expires afterwards.
    fn on_unload(&self, _cx: &SituationContext<'_>) {}

    /// Called while detaching, before the service registry is disposed.
    fn on_release(&self, _cx: &SituationContext<'_>) {}

    /// Whether navigating from this situation to `next` is allowed.
    fn can_transition(&self, _next: &SituationHandle, _transition: &dyn Transition) -> bool {
        true
    }
}

//=== SituationContext ====================================================

/// Per-hook view of a situation's runtime resources.
pub struct SituationContext<'a> {
    situation: &'a SituationHandle,
    services: ServiceContainer,
    load_scope: Scope,
    setup_scope: Scope,
    animation_scope: Scope,
    transition: Option<&'a Rc<TransitionInfo>>,
}

impl<'a> SituationContext<'a> {
    /// The situation whose hook is running.
    pub fn situation(&self) -> &'a SituationHandle {
        self.situation
    }

    /// This situation's service registry.
    pub fn services(&self) -> &ServiceContainer {
        &self.services
    }

    /// Lives from load until unload.
    pub fn load_scope(&self) -> &Scope {
        &self.load_scope
    }

    /// Lives from setup until cleanup.
    pub fn setup_scope(&self) -> &Scope {
        &self.setup_scope
    }

    /// Lives for the current open or close phase.
    pub fn animation_scope(&self) -> &Scope {
        &self.animation_scope
    }

    /// The transition driving this hook, if any.
    pub fn transition(&self) -> Option<&'a Rc<TransitionInfo>> {
        self.transition
    }

    /// The nested stack owned by this situation.
    pub fn children(&self) -> &'a SituationContainer {
        self.situation.children()
    }
}
