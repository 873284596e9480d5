//=========================================================================
// Situation Handle
//=========================================================================
//
// Shared node wrapping a `Situation` behaviour with its runtime state.
//
// A handle owns the lifecycle state, the scoped resources of each phase,
// the service registry and the nested child container. Handles compare by
// identity; cloning yields another reference to the same node.
//
// Borrow discipline:
//   `core` is borrowed only for short reads/writes, never across a hook.
//   `behavior` is never borrowed mutably, so hooks may nest and
//   `can_transition` can be asked while another hook is running.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use futures_util::FutureExt;
use log::{debug, error, trace};

//=== Internal Dependencies ===============================================

use super::container::WeakContainer;
use super::transition::{Transition, TransitionEffect, TransitionHandle, TransitionInfo};
use super::{Situation, SituationContainer, SituationContext, SituationState};
use crate::core::coroutine::Routine;
use crate::core::scope::Scope;
use crate::core::services::ServiceContainer;

//=== Node Internals ======================================================

struct SituationCore {
    state: SituationState,
    parent: Option<WeakContainer>,
    services: ServiceContainer,
    load_scope: Scope,
    setup_scope: Scope,
    animation_scope: Scope,
}

struct SituationInner {
    type_id: TypeId,
    name: &'static str,
    behavior: Box<dyn Situation>,
    core: RefCell<SituationCore>,
    children: SituationContainer,
}

/// Non-owning reference to a situation, held by its child container.
#[derive(Clone)]
pub(crate) struct WeakSituation(Weak<SituationInner>);

impl WeakSituation {
    pub(crate) fn upgrade(&self) -> Option<SituationHandle> {
        self.0.upgrade().map(|inner| SituationHandle { inner })
    }
}

//=== SituationHandle =====================================================

/// Shared reference to a situation node.
#[derive(Clone)]
pub struct SituationHandle {
    inner: Rc<SituationInner>,
}

impl SituationHandle {
    /// Wraps `behavior` in a detached (`Invalid`) situation.
    pub fn new<T: Situation>(behavior: T) -> Self {
        let name = short_type_name(type_name::<T>());

        let inner = Rc::new_cyclic(|weak| SituationInner {
            type_id: TypeId::of::<T>(),
            name,
            behavior: Box::new(behavior),
            core: RefCell::new(SituationCore {
                state: SituationState::Invalid,
                parent: None,
                services: ServiceContainer::new(),
                load_scope: Scope::new(),
                setup_scope: Scope::new(),
                animation_scope: Scope::new(),
            }),
            children: SituationContainer::owned_by(WeakSituation(weak.clone())),
        });

        Self { inner }
    }

    //--- Query API --------------------------------------------------------

    /// Short type name of the behaviour, used in logs.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn state(&self) -> SituationState {
        self.inner.core.borrow().state
    }

    /// True once the open phase has finished and until close begins.
    pub fn is_active(&self) -> bool {
        self.state() == SituationState::Active
    }

    /// Service registry for this attachment. Replaced on every standby and
    /// disposed on release.
    pub fn services(&self) -> ServiceContainer {
        self.inner.core.borrow().services.clone()
    }

    /// The nested stack owned by this situation.
    pub fn children(&self) -> &SituationContainer {
        &self.inner.children
    }

    /// The container this situation is attached to.
    pub fn parent(&self) -> Option<SituationContainer> {
        self.inner
            .core
            .borrow()
            .parent
            .as_ref()
            .and_then(WeakContainer::upgrade)
    }

    /// The situation owning the container this situation is attached to.
    /// `None` for situations on a root container.
    pub fn parent_situation(&self) -> Option<SituationHandle> {
        self.parent().and_then(|container| container.owner())
    }

    /// Concrete type of the behaviour. One stack slot per type.
    pub fn type_id(&self) -> TypeId {
        self.inner.type_id
    }

    //--- Navigation -------------------------------------------------------

    /// Navigates this situation's child stack. See [`SituationContainer::transition`].
    pub fn transition(
        &self,
        target: Option<&SituationHandle>,
        transition: Option<Rc<dyn Transition>>,
        effects: Vec<Box<dyn TransitionEffect>>,
    ) -> TransitionHandle {
        self.inner.children.transition(target, transition, effects)
    }

    /// Pops this situation's child stack by one. See [`SituationContainer::back`].
    pub fn back(
        &self,
        transition: Option<Rc<dyn Transition>>,
        effects: Vec<Box<dyn TransitionEffect>>,
    ) -> TransitionHandle {
        self.inner.children.back(transition, effects)
    }

    //--- Attachment -------------------------------------------------------

    /// Binds the situation to `container` and enters `Standby`.
    ///
    /// Re-attaching to the current container is a no-op. Returns false if
    /// the situation is attached elsewhere.
    pub(crate) fn standby(&self, container: &SituationContainer) -> bool {
        {
            let mut core = self.inner.core.borrow_mut();
            if let Some(parent) = &core.parent {
                if parent.is(container) {
                    return true;
                }
                error!(target: "situation", "{}: standby refused, attached to another container", self.name());
                return false;
            }
            if core.state != SituationState::Invalid {
                error!(target: "situation", "{}: standby refused from {}", self.name(), core.state);
                return false;
            }

            core.parent = Some(container.downgrade());
            core.services = ServiceContainer::with_parent(&container.services_for_children());
            core.state = SituationState::Standby;
        }

        debug!(target: "situation", "{}: standby", self.name());
        self.invoke("on_standby", None, |behavior, cx| behavior.on_standby(cx));
        true
    }

    /// Tears the situation down and detaches it from `container`.
    ///
    /// Children are released first, then any phase still held is unwound
    /// (cleanup, unload) before `on_release` runs and the registry is
    /// disposed. A call from any container other than the recorded parent
    /// is logged and ignored.
    pub(crate) fn release(&self, container: &SituationContainer) {
        let attached = matches!(&self.inner.core.borrow().parent, Some(parent) if parent.is(container));
        if !attached {
            error!(target: "situation", "{}: release from a container it is not attached to", self.name());
            return;
        }

        debug!(target: "situation", "{}: release from {}", self.name(), self.state());
        self.inner.children.dispose();

        if matches!(self.state(), SituationState::Active | SituationState::SetupFinished) {
            self.run_cleanup(None);
        }
        if self.state() == SituationState::Loaded {
            self.run_unload(None);
        }

        // A phase cut short by cancellation leaves its scope live.
        let scopes = {
            let core = self.inner.core.borrow();
            [core.animation_scope.clone(), core.setup_scope.clone(), core.load_scope.clone()]
        };
        for scope in &scopes {
            scope.dispose();
        }

        self.invoke("on_release", None, |behavior, cx| behavior.on_release(cx));

        let services = {
            let mut core = self.inner.core.borrow_mut();
            core.parent = None;
            core.services.clone()
        };
        services.dispose();
        self.set_state(SituationState::Invalid);
    }

    /// True if the situation is attached to a container other than `container`.
    pub(crate) fn attached_elsewhere(&self, container: &SituationContainer) -> bool {
        match &self.inner.core.borrow().parent {
            Some(parent) => !parent.is(container),
            None => false,
        }
    }

    //--- Per-Tick Hooks ---------------------------------------------------

    pub(crate) fn update(&self) {
        if !self.is_active() {
            return;
        }
        self.invoke("on_update", None, |behavior, cx| behavior.on_update(cx));
        self.inner.children.update();
    }

    pub(crate) fn late_update(&self) {
        if !self.is_active() {
            return;
        }
        self.invoke("on_late_update", None, |behavior, cx| behavior.on_late_update(cx));
        self.inner.children.late_update();
    }

    /// Consults `can_transition`, also while one of this situation's own
    /// hooks is running.
    pub(crate) fn allows_transition(&self, next: &SituationHandle, transition: &dyn Transition) -> bool {
        let allowed = self.inner.behavior.can_transition(next, transition);
        if !allowed {
            debug!(target: "situation", "{}: transition to {} vetoed", self.name(), next.name());
        }
        allowed
    }

    //--- Phase Operations -------------------------------------------------

    pub(crate) fn run_load(&self, transition: Option<&Rc<TransitionInfo>>) -> Routine {
        let this = self.clone();
        let transition = transition.cloned();
        async move {
            if !this.enter_phase("load", &[SituationState::Standby]) {
                return;
            }

            this.inner.core.borrow_mut().load_scope = Scope::new();
            let routine = this.invoke("load_routine", transition.as_ref(), |behavior, cx| {
                behavior.load_routine(cx)
            });
            routine.await;

            this.set_state(SituationState::Loaded);
        }
        .boxed_local()
    }

    pub(crate) fn run_setup(&self, transition: Option<&Rc<TransitionInfo>>) {
        if !self.enter_phase("setup", &[SituationState::Loaded]) {
            return;
        }

        self.inner.core.borrow_mut().setup_scope = Scope::new();
        self.invoke("on_setup", transition, |behavior, cx| behavior.on_setup(cx));
        self.set_state(SituationState::SetupFinished);
    }

    pub(crate) fn run_open(&self, transition: Option<&Rc<TransitionInfo>>) -> Routine {
        let this = self.clone();
        let transition = transition.cloned();
        async move {
            if !this.enter_phase("open", &[SituationState::SetupFinished]) {
                return;
            }

            let guard = this.fresh_animation_scope().guard();
            let routine = this.invoke("open_routine", transition.as_ref(), |behavior, cx| {
                behavior.open_routine(cx)
            });
            routine.await;

            this.set_state(SituationState::Active);
            drop(guard);
        }
        .boxed_local()
    }

    pub(crate) fn run_close(&self, transition: Option<&Rc<TransitionInfo>>) -> Routine {
        let this = self.clone();
        let transition = transition.cloned();
        async move {
            if !this.enter_phase("close", &[SituationState::Active]) {
                return;
            }

            let guard = this.fresh_animation_scope().guard();
            this.set_state(SituationState::SetupFinished);
            let routine = this.invoke("close_routine", transition.as_ref(), |behavior, cx| {
                behavior.close_routine(cx)
            });
            routine.await;

            drop(guard);
        }
        .boxed_local()
    }

    pub(crate) fn run_cleanup(&self, transition: Option<&Rc<TransitionInfo>>) {
        if !self.enter_phase("cleanup", &[SituationState::SetupFinished, SituationState::Active]) {
            return;
        }

        self.set_state(SituationState::Loaded);
        self.invoke("on_cleanup", transition, |behavior, cx| behavior.on_cleanup(cx));
        let scope = self.inner.core.borrow().setup_scope.clone();
        scope.dispose();
    }

    pub(crate) fn run_unload(&self, transition: Option<&Rc<TransitionInfo>>) {
        if !self.enter_phase("unload", &[SituationState::Loaded]) {
            return;
        }

        self.set_state(SituationState::Standby);
        self.invoke("on_unload", transition, |behavior, cx| behavior.on_unload(cx));
        let scope = self.inner.core.borrow().load_scope.clone();
        scope.dispose();
    }

    //--- Internal Helpers -------------------------------------------------

    pub(crate) fn downgrade(&self) -> WeakSituation {
        WeakSituation(Rc::downgrade(&self.inner))
    }

    fn set_state(&self, state: SituationState) {
        let previous = std::mem::replace(&mut self.inner.core.borrow_mut().state, state);
        trace!(target: "situation", "{}: {} -> {}", self.name(), previous, state);
    }

    /// Checks the phase guard, logging the phase or the skip.
    fn enter_phase(&self, phase: &str, from: &[SituationState]) -> bool {
        let state = self.state();
        if from.contains(&state) {
            debug!(target: "situation", "{}: {}", self.name(), phase);
            true
        } else {
            trace!(target: "situation", "{}: {} skipped in {}", self.name(), phase, state);
            false
        }
    }

    fn fresh_animation_scope(&self) -> Scope {
        let scope = Scope::new();
        self.inner.core.borrow_mut().animation_scope = scope.clone();
        scope
    }

    fn context<'a>(&'a self, transition: Option<&'a Rc<TransitionInfo>>) -> SituationContext<'a> {
        let core = self.inner.core.borrow();
        SituationContext {
            situation: self,
            services: core.services.clone(),
            load_scope: core.load_scope.clone(),
            setup_scope: core.setup_scope.clone(),
            animation_scope: core.animation_scope.clone(),
            transition,
        }
    }

    /// Runs one behaviour hook with a fresh context.
    fn invoke<R>(
        &self,
        hook: &str,
        transition: Option<&Rc<TransitionInfo>>,
        call: impl FnOnce(&dyn Situation, &SituationContext<'_>) -> R,
    ) -> R {
        trace!(target: "situation", "{}: {}", self.name(), hook);
        let cx = self.context(transition);
        call(self.inner.behavior.as_ref(), &cx)
    }
}

/// Last path segment of a type name, without generic arguments:
/// `app::menu::Menu<game::Data>` becomes `Menu`.
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl PartialEq for SituationHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SituationHandle {}

impl fmt::Debug for SituationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SituationHandle")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

//=== SituationLifecycle ==================================================

/// Phase operations available to transition strategies.
///
/// Each phase only runs from the state it starts in (load from `Standby`,
/// setup from `Loaded`, open from `SetupFinished`, close from `Active`,
/// cleanup from `SetupFinished` or `Active`, unload from `Loaded`) and is
/// skipped otherwise, so a strategy may request every phase of a pass
/// without checking where the situation currently is.
pub trait SituationLifecycle {
    /// Acquire resources. `Standby → Loaded` once the routine finishes.
    fn load_routine(&self, transition: &Rc<TransitionInfo>) -> Routine;

    /// Wire services. `Loaded → SetupFinished`.
    fn setup(&self, transition: &Rc<TransitionInfo>);

    /// Enter presentation. `SetupFinished → Active` once the routine finishes.
    fn open_routine(&self, transition: &Rc<TransitionInfo>) -> Routine;

    /// Exit presentation. `Active → SetupFinished` before the hook runs.
    fn close_routine(&self, transition: &Rc<TransitionInfo>) -> Routine;

    /// Undo setup. `→ Loaded`, then the setup scope expires.
    fn cleanup(&self, transition: &Rc<TransitionInfo>);

    /// Undo load. `Loaded → Standby`, then the load scope expires.
    fn unload(&self, transition: &Rc<TransitionInfo>);
}

impl SituationLifecycle for SituationHandle {
    fn load_routine(&self, transition: &Rc<TransitionInfo>) -> Routine {
        self.run_load(Some(transition))
    }

    fn setup(&self, transition: &Rc<TransitionInfo>) {
        self.run_setup(Some(transition));
    }

    fn open_routine(&self, transition: &Rc<TransitionInfo>) -> Routine {
        self.run_open(Some(transition))
    }

    fn close_routine(&self, transition: &Rc<TransitionInfo>) -> Routine {
        self.run_close(Some(transition))
    }

    fn cleanup(&self, transition: &Rc<TransitionInfo>) {
        self.run_cleanup(Some(transition));
    }

    fn unload(&self, transition: &Rc<TransitionInfo>) {
        self.run_unload(Some(transition));
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
