//=========================================================================
// Situation Container
//=========================================================================
//
// Ordered stack of situations plus the single in-flight transition.
//
// Architecture:
//   SituationContainer
//     ├─ stack: Vec<SituationHandle>       (index 0 = bottom, last = top)
//     ├─ runner: CoroutineRunner           (hosts the transition routine)
//     ├─ current: Option<TransitionInfo>   (in-flight marker)
//     └─ owner: root services | owning situation
//
// Request flow (`transition`):
//   busy? → foreign? → plan (forward | back to index | replace slot)
//   → can_transition? → mutate stack → schedule routine → standby(next)
//
// Every check runs before the stack is touched, so a refused request
// leaves the container exactly as it was.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::handle::WeakSituation;
use super::transition::{
    OutInTransition, Transition, TransitionEffect, TransitionHandle, TransitionInfo,
    TransitionState,
};
use super::{SituationHandle, TransitionError};
use crate::core::coroutine::CoroutineRunner;
use crate::core::globals::GlobalContext;
use crate::core::services::ServiceContainer;

//=== Container Internals =================================================

enum ContainerOwner {
    Root(ServiceContainer),
    Situation(WeakSituation),
}

struct ContainerInner {
    owner: ContainerOwner,
    stack: RefCell<Vec<SituationHandle>>,
    runner: CoroutineRunner,
    current: RefCell<Option<Rc<TransitionInfo>>>,
    default_transition: RefCell<Rc<dyn Transition>>,
}

/// Stack mutation computed for an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    /// Push the target on top.
    Forward,
    /// Pop everything above `index` (everything for `None`); with
    /// `replace`, the slot at `index` takes the target.
    Back { index: Option<usize>, replace: bool },
}

/// Non-owning reference held by attached situations and transitions.
#[derive(Clone)]
pub(crate) struct WeakContainer(Weak<ContainerInner>);

impl WeakContainer {
    pub(crate) fn upgrade(&self) -> Option<SituationContainer> {
        self.0.upgrade().map(|inner| SituationContainer { inner })
    }

    /// True if this refers to `container`.
    pub(crate) fn is(&self, container: &SituationContainer) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&container.inner))
    }

    #[cfg(test)]
    pub(crate) fn dangling() -> Self {
        Self(Weak::new())
    }
}

//=== SituationContainer ==================================================

/// A stack of situations with one transition in flight at a time.
///
/// The application creates one root container; every situation embeds
/// another as its child stack. Handles are cheap to clone and compare by
/// identity.
#[derive(Clone)]
pub struct SituationContainer {
    inner: Rc<ContainerInner>,
}

impl SituationContainer {
    /// Creates a root container. Situations attached to it resolve missing
    /// services from `context`.
    pub fn new(context: &GlobalContext) -> Self {
        Self::with_owner(ContainerOwner::Root(context.services.clone()))
    }

    pub(crate) fn owned_by(owner: WeakSituation) -> Self {
        Self::with_owner(ContainerOwner::Situation(owner))
    }

    fn with_owner(owner: ContainerOwner) -> Self {
        Self {
            inner: Rc::new(ContainerInner {
                owner,
                stack: RefCell::new(Vec::new()),
                runner: CoroutineRunner::new(),
                current: RefCell::new(None),
                default_transition: RefCell::new(Rc::new(OutInTransition::new())),
            }),
        }
    }

    //--- Navigation -------------------------------------------------------

    /// Requests navigation to `target`, or closes everything for `None`.
    ///
    /// - A target not on the stack is pushed (forward).
    /// - A target already on the stack pops everything above it (back).
    /// - A new instance of a type already on the stack replaces that slot
    ///   and pops everything above it (back).
    ///
    /// `transition` falls back to the container default. Refusals are
    /// reported through the returned handle; the stack is untouched.
    pub fn transition(
        &self,
        target: Option<&SituationHandle>,
        transition: Option<Rc<dyn Transition>>,
        effects: Vec<Box<dyn TransitionEffect>>,
    ) -> TransitionHandle {
        match self.begin(target, transition, effects) {
            Ok(info) => TransitionHandle::started(info),
            Err(error) => {
                debug!(
                    target: "transition",
                    "Request for {} refused: {}",
                    label(target),
                    error
                );
                TransitionHandle::failed(error)
            }
        }
    }

    /// Navigates to the entry below the top, or closes the last entry.
    pub fn back(
        &self,
        transition: Option<Rc<dyn Transition>>,
        effects: Vec<Box<dyn TransitionEffect>>,
    ) -> TransitionHandle {
        let target = {
            let stack = self.inner.stack.borrow();
            stack.len().checked_sub(2).map(|index| stack[index].clone())
        };
        self.transition(target.as_ref(), transition, effects)
    }

    /// Cancels the in-flight transition and releases every entry, top first.
    pub fn dispose(&self) {
        self.inner.runner.stop_all();

        let entries = std::mem::take(&mut *self.inner.stack.borrow_mut());
        if !entries.is_empty() {
            debug!(target: "situation", "Disposing container with {} situations", entries.len());
        }
        for situation in entries.iter().rev() {
            situation.release(self);
        }
    }

    //--- Update Loop ------------------------------------------------------

    /// Advances the in-flight transition by one step, then ticks `prev` and
    /// `next` while it runs, or the top situation otherwise.
    pub fn update(&self) {
        self.inner.runner.update();
        for situation in self.tick_targets() {
            situation.update();
        }
    }

    /// Same targets as [`update`](Self::update), without advancing the transition.
    pub fn late_update(&self) {
        for situation in self.tick_targets() {
            situation.late_update();
        }
    }

    //--- Query API --------------------------------------------------------

    /// The top of the stack.
    pub fn current(&self) -> Option<SituationHandle> {
        self.inner.stack.borrow().last().cloned()
    }

    /// Snapshot of the stack, bottom first.
    pub fn stack(&self) -> Vec<SituationHandle> {
        self.inner.stack.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.stack.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.stack.borrow().is_empty()
    }

    pub fn contains(&self, situation: &SituationHandle) -> bool {
        self.inner.stack.borrow().contains(situation)
    }

    /// True while a transition routine is running.
    pub fn is_transitioning(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    /// Handle to the in-flight transition, if any.
    pub fn in_flight(&self) -> Option<TransitionHandle> {
        self.inner
            .current
            .borrow()
            .clone()
            .map(TransitionHandle::started)
    }

    /// The situation owning this container. `None` for a root container.
    pub fn owner(&self) -> Option<SituationHandle> {
        match &self.inner.owner {
            ContainerOwner::Root(_) => None,
            ContainerOwner::Situation(owner) => owner.upgrade(),
        }
    }

    //--- Configuration ----------------------------------------------------

    /// Strategy used when a request does not name one.
    pub fn set_default_transition(&self, transition: Rc<dyn Transition>) {
        *self.inner.default_transition.borrow_mut() = transition;
    }

    pub fn default_transition(&self) -> Rc<dyn Transition> {
        self.inner.default_transition.borrow().clone()
    }

    //--- Internal Helpers -------------------------------------------------

    pub(crate) fn downgrade(&self) -> WeakContainer {
        WeakContainer(Rc::downgrade(&self.inner))
    }

    /// Registry that situations attached here chain their own to.
    pub(crate) fn services_for_children(&self) -> ServiceContainer {
        match &self.inner.owner {
            ContainerOwner::Root(services) => services.clone(),
            ContainerOwner::Situation(owner) => match owner.upgrade() {
                Some(owner) => owner.services(),
                None => {
                    warn!(target: "situation", "Owning situation dropped; child services are unparented");
                    ServiceContainer::new()
                }
            },
        }
    }

    fn begin(
        &self,
        target: Option<&SituationHandle>,
        transition: Option<Rc<dyn Transition>>,
        effects: Vec<Box<dyn TransitionEffect>>,
    ) -> Result<Rc<TransitionInfo>, TransitionError> {
        if self.is_transitioning() {
            return Err(TransitionError::Busy);
        }
        if target.is_some_and(|target| target.attached_elsewhere(self)) {
            return Err(TransitionError::Foreign);
        }

        let plan = self.plan(target)?;
        let prev = self.current();
        let transition = transition.unwrap_or_else(|| self.default_transition());

        if let (Some(prev), Some(next)) = (&prev, target) {
            if !prev.allows_transition(next, transition.as_ref()) {
                return Err(TransitionError::Rejected);
            }
        }

        let back = matches!(plan, Plan::Back { .. });
        debug!(
            target: "transition",
            "{} -> {} via {} ({})",
            label(prev.as_ref()),
            label(target),
            transition.name(),
            if back { "back" } else { "forward" }
        );

        let stale = self.apply(plan, target, prev.as_ref());
        let info = Rc::new(TransitionInfo::new(
            self.downgrade(),
            prev,
            target.cloned(),
            back,
            effects,
        ));
        *self.inner.current.borrow_mut() = Some(info.clone());

        for situation in &stale {
            situation.release(self);
        }

        let routine = transition.transition_routine(info.clone());
        let container = self.downgrade();
        let finished = info.clone();
        self.inner.runner.start_with(routine, move || match container.upgrade() {
            Some(container) => container.finish(&finished),
            None => finished.set_state(TransitionState::Canceled),
        });

        if let Some(next) = target {
            next.standby(self);
        }

        Ok(info)
    }

    /// Decides the stack mutation for `target` without touching the stack.
    fn plan(&self, target: Option<&SituationHandle>) -> Result<Plan, TransitionError> {
        let stack = self.inner.stack.borrow();

        let Some(target) = target else {
            return if stack.is_empty() {
                Err(TransitionError::AlreadyCurrent)
            } else {
                Ok(Plan::Back {
                    index: None,
                    replace: false,
                })
            };
        };

        let top = stack.len().saturating_sub(1);
        for (index, entry) in stack.iter().enumerate().rev() {
            if entry == target {
                if index == top {
                    return Err(TransitionError::AlreadyCurrent);
                }
                return Ok(Plan::Back {
                    index: Some(index),
                    replace: false,
                });
            }
            if entry.type_id() == target.type_id() {
                return Ok(Plan::Back {
                    index: Some(index),
                    replace: true,
                });
            }
        }

        Ok(Plan::Forward)
    }

    /// Mutates the stack and returns the entries to release now, top first.
    /// `prev` is never among them; it is released once its routine ends.
    fn apply(
        &self,
        plan: Plan,
        target: Option<&SituationHandle>,
        prev: Option<&SituationHandle>,
    ) -> Vec<SituationHandle> {
        let mut stack = self.inner.stack.borrow_mut();

        let (index, replace) = match (plan, target) {
            (Plan::Forward, Some(target)) => {
                stack.push(target.clone());
                return Vec::new();
            }
            (Plan::Forward, None) => return Vec::new(),
            (Plan::Back { index, replace }, _) => (index, replace),
        };

        let keep = index.map_or(0, |index| index + 1);
        let mut removed: Vec<SituationHandle> = stack.drain(keep..).rev().collect();

        if let (true, Some(index), Some(target)) = (replace, index, target) {
            let stale = std::mem::replace(&mut stack[index], target.clone());
            removed.push(stale);
        }

        removed.retain(|situation| Some(situation) != prev);
        removed
    }

    /// Completion callback of the transition routine.
    fn finish(&self, info: &Rc<TransitionInfo>) {
        if info.state() != TransitionState::Completed {
            warn!(
                target: "transition",
                "Transition to {} ended in {}; marking canceled",
                label(info.next()),
                info.state()
            );
            info.set_state(TransitionState::Canceled);
        }

        self.inner.current.borrow_mut().take();

        if info.is_back() {
            if let Some(prev) = info.prev() {
                if !self.contains(prev) {
                    prev.release(self);
                }
            }
        }

        debug!(target: "transition", "Transition to {} finished", label(info.next()));
    }

    fn tick_targets(&self) -> Vec<SituationHandle> {
        let current = self.inner.current.borrow().clone();
        match current {
            Some(info) => info.prev().into_iter().chain(info.next()).cloned().collect(),
            None => self.current().into_iter().collect(),
        }
    }
}

impl PartialEq for SituationContainer {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SituationContainer {}

impl fmt::Debug for SituationContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .inner
            .stack
            .borrow()
            .iter()
            .map(SituationHandle::name)
            .collect();
        f.debug_struct("SituationContainer")
            .field("stack", &names)
            .field("transitioning", &self.is_transitioning())
            .finish()
    }
}

fn label(situation: Option<&SituationHandle>) -> &'static str {
    situation.map_or("<none>", SituationHandle::name)
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::situation::testing::{probe, settle, tick, EventLog, Probe};
    use crate::core::situation::{Situation, SituationContext, SituationState};
    use std::cell::Cell;

    fn root() -> SituationContainer {
        SituationContainer::new(&GlobalContext::default())
    }

    fn push(container: &SituationContainer, situation: &SituationHandle) -> u32 {
        let handle = container.transition(Some(situation), None, Vec::new());
        assert_eq!(handle.error(), None, "push of {} refused", situation.name());
        settle(container, &handle)
    }

    //--- Lifecycle --------------------------------------------------------

    #[test]
    fn push_then_pop_runs_full_lifecycle() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).spawn();

        let handle = root.transition(Some(&a), None, Vec::new());
        assert!(!handle.is_done());
        assert!(!handle.is_back());
        assert_eq!(log.entries(), vec!["a:standby"], "standby is synchronous");

        settle(&root, &handle);
        assert_eq!(a.state(), SituationState::Active);
        assert_eq!(
            log.take(),
            vec![
                "a:standby",
                "a:load",
                "a:loaded",
                "a:setup",
                "a:open",
                "a:opened",
                "a:open_scope",
            ]
        );

        let handle = root.transition(None, None, Vec::new());
        assert!(handle.is_back());
        settle(&root, &handle);

        assert_eq!(a.state(), SituationState::Invalid);
        assert!(root.is_empty());
        assert_eq!(
            log.take(),
            vec![
                "a:close",
                "a:closed",
                "a:close_scope",
                "a:cleanup",
                "a:setup_scope",
                "a:unload",
                "a:load_scope",
                "a:release",
            ]
        );
    }

    #[test]
    fn handle_reports_prev_and_next() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).spawn();
        let b = Probe::<1>::new("b", &log).spawn();

        push(&root, &a);
        let handle = root.transition(Some(&b), None, Vec::new());

        assert_eq!(handle.prev(), Some(a));
        assert_eq!(handle.next(), Some(b));
        assert_eq!(handle.state(), Some(TransitionState::Standby));

        settle(&root, &handle);
        assert_eq!(handle.state(), Some(TransitionState::Completed));
        assert_eq!(handle.error(), None);
    }

    //--- Refusals ---------------------------------------------------------

    #[test]
    fn second_request_while_busy_is_refused() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).load_ticks(2).spawn();
        let b = Probe::<1>::new("b", &log).spawn();

        let first = root.transition(Some(&a), None, Vec::new());
        let second = root.transition(Some(&b), None, Vec::new());

        assert!(second.is_done());
        assert_eq!(second.error(), Some(TransitionError::Busy));
        assert_eq!(root.stack(), vec![a.clone()]);
        assert_eq!(b.state(), SituationState::Invalid);

        settle(&root, &first);
        assert!(!root.is_transitioning());
        assert_eq!(root.transition(Some(&b), None, Vec::new()).error(), None);
    }

    #[test]
    fn navigating_to_current_top_is_a_noop() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).spawn();
        push(&root, &a);
        log.take();

        let handle = root.transition(Some(&a), None, Vec::new());

        assert!(handle.is_done());
        assert_eq!(handle.error(), Some(TransitionError::AlreadyCurrent));
        assert!(!root.is_transitioning());
        tick(&root);
        assert!(log.entries().is_empty());
        assert_eq!(a.state(), SituationState::Active);
    }

    #[test]
    fn closing_an_empty_stack_is_already_current() {
        let root = root();
        let handle = root.transition(None, None, Vec::new());
        assert_eq!(handle.error(), Some(TransitionError::AlreadyCurrent));
        assert_eq!(root.back(None, Vec::new()).error(), Some(TransitionError::AlreadyCurrent));
    }

    #[test]
    fn rejected_request_leaves_stack_untouched() {
        let log = EventLog::new();
        let root = root();
        let allow = Rc::new(Cell::new(true));
        let a = probe("a", &log).gate(&allow).spawn();
        let b = Probe::<1>::new("b", &log).spawn();
        push(&root, &a);
        log.take();

        allow.set(false);
        let handle = root.transition(Some(&b), None, Vec::new());

        assert_eq!(handle.error(), Some(TransitionError::Rejected));
        assert_eq!(root.stack(), vec![a.clone()]);
        assert_eq!(b.state(), SituationState::Invalid);
        assert!(log.entries().is_empty());

        // Closing everything is never vetoed.
        let handle = root.transition(None, None, Vec::new());
        assert_eq!(handle.error(), None);
    }

    #[test]
    fn target_from_another_container_is_foreign() {
        let log = EventLog::new();
        let first = root();
        let second = root();
        let a = probe("a", &log).spawn();
        push(&first, &a);

        let handle = second.transition(Some(&a), None, Vec::new());

        assert_eq!(handle.error(), Some(TransitionError::Foreign));
        assert!(second.is_empty());
        assert_eq!(a.parent(), Some(first));
    }

    //--- Stack Shapes -----------------------------------------------------

    #[test]
    fn back_to_lower_entry_keeps_it_active() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).spawn();
        let b = Probe::<1>::new("b", &log).spawn();

        push(&root, &a);
        push(&root, &b);
        assert_eq!(root.stack(), vec![a.clone(), b.clone()]);

        let a_ticks = log.ticks("a");
        for _ in 0..3 {
            tick(&root);
        }
        assert_eq!(log.ticks("a"), a_ticks, "covered situation receives no ticks");
        assert_eq!(a.state(), SituationState::Active);
        log.take();

        let handle = root.transition(Some(&a), None, Vec::new());
        assert!(handle.is_back());
        settle(&root, &handle);

        assert_eq!(root.stack(), vec![a.clone()]);
        assert_eq!(a.state(), SituationState::Active);
        assert_eq!(b.state(), SituationState::Invalid);
        assert_eq!(
            log.take(),
            vec![
                "b:close",
                "b:closed",
                "b:close_scope",
                "b:cleanup",
                "b:setup_scope",
                "b:unload",
                "b:load_scope",
                "b:release",
            ],
            "a does not reload, set up or reopen"
        );

        let a_ticks = log.ticks("a");
        tick(&root);
        assert_eq!(log.ticks("a"), a_ticks + 1);
    }

    #[test]
    fn back_pops_to_the_entry_below() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).spawn();
        let b = Probe::<1>::new("b", &log).spawn();
        let c = Probe::<2>::new("c", &log).spawn();

        push(&root, &a);
        push(&root, &b);
        push(&root, &c);

        let handle = root.back(None, Vec::new());
        assert_eq!(handle.next(), Some(b.clone()));
        settle(&root, &handle);

        assert_eq!(root.stack(), vec![a, b]);
        assert_eq!(c.state(), SituationState::Invalid);
    }

    #[test]
    fn popping_several_levels_releases_intermediate_entries_first() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).spawn();
        let b = Probe::<1>::new("b", &log).spawn();
        let c = Probe::<2>::new("c", &log).spawn();

        push(&root, &a);
        push(&root, &b);
        push(&root, &c);
        log.take();

        let handle = root.transition(Some(&a), None, Vec::new());
        assert!(log.contains("b:release"), "intermediate entries go synchronously");
        assert!(!log.contains("c:close"));
        assert_eq!(root.stack(), vec![a.clone()]);

        settle(&root, &handle);
        log.assert_before("b:release", "c:close");
        assert_eq!(b.state(), SituationState::Invalid);
        assert_eq!(c.state(), SituationState::Invalid);
    }

    #[test]
    fn same_type_replaces_slot_and_stays_reachable() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).spawn();
        let b = Probe::<1>::new("b", &log).spawn();
        let c = Probe::<2>::new("c", &log).spawn();
        let a2 = probe("a2", &log).spawn();

        push(&root, &a);
        push(&root, &b);
        push(&root, &c);
        log.take();

        let handle = root.transition(Some(&a2), None, Vec::new());
        assert!(handle.is_back());
        assert_eq!(root.stack(), vec![a2.clone()]);
        log.assert_before("b:release", "a:release");

        settle(&root, &handle);
        assert_eq!(a.state(), SituationState::Invalid);
        assert_eq!(b.state(), SituationState::Invalid);
        assert_eq!(c.state(), SituationState::Invalid);
        assert_eq!(a2.state(), SituationState::Active);

        let d = Probe::<3>::new("d", &log).spawn();
        push(&root, &d);
        let handle = root.transition(Some(&a2), None, Vec::new());
        assert!(handle.is_back());
        settle(&root, &handle);
        assert_eq!(root.stack(), vec![a2]);
    }

    #[test]
    fn replacing_the_top_defers_release_until_closed() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).close_ticks(1).spawn();
        let a2 = probe("a2", &log).spawn();

        push(&root, &a);
        log.take();

        let handle = root.transition(Some(&a2), None, Vec::new());
        assert_eq!(handle.prev(), Some(a.clone()));
        assert!(!log.contains("a:release"));

        settle(&root, &handle);
        log.assert_before("a:closed", "a:release");
        log.assert_before("a2:opened", "a:release");
        assert_eq!(a.state(), SituationState::Invalid);
        assert_eq!(root.stack(), vec![a2]);
    }

    //--- Ticking ----------------------------------------------------------

    #[test]
    fn prev_and_next_both_tick_while_in_flight() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).spawn();
        let b = Probe::<1>::new("b", &log).open_ticks(3).spawn();
        push(&root, &a);

        let handle = root.transition(Some(&b), None, Vec::new());
        let a_ticks = log.ticks("a");
        tick(&root);
        tick(&root);

        assert!(!handle.is_done());
        assert_eq!(log.ticks("a"), a_ticks + 2);
        assert_eq!(log.late_ticks("b"), 0, "next only ticks once active");

        settle(&root, &handle);
        let a_ticks = log.ticks("a");
        tick(&root);
        assert_eq!(log.ticks("a"), a_ticks);
        assert!(log.ticks("b") > 0);
    }

    #[test]
    fn late_update_does_not_advance_transitions() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).spawn();

        let handle = root.transition(Some(&a), None, Vec::new());
        for _ in 0..5 {
            root.late_update();
        }
        assert_eq!(handle.state(), Some(TransitionState::Standby));

        root.update();
        assert!(handle.is_done());
    }

    //--- Disposal ---------------------------------------------------------

    #[test]
    fn dispose_cancels_in_flight_transition() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).open_ticks(3).spawn();

        let handle = root.transition(Some(&a), None, Vec::new());
        tick(&root);
        assert_eq!(handle.state(), Some(TransitionState::Opening));
        log.take();

        root.dispose();

        assert!(handle.is_done());
        assert_eq!(handle.error(), Some(TransitionError::Canceled));
        assert!(!root.is_transitioning());
        assert!(root.is_empty());
        assert_eq!(a.state(), SituationState::Invalid);
        assert_eq!(
            log.take(),
            vec![
                "a:open_scope",
                "a:cleanup",
                "a:setup_scope",
                "a:unload",
                "a:load_scope",
                "a:release",
            ]
        );
    }

    #[test]
    fn dispose_during_load_expires_load_scope() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).load_ticks(5).spawn();

        let handle = root.transition(Some(&a), None, Vec::new());
        for _ in 0..3 {
            if log.contains("a:load") {
                break;
            }
            tick(&root);
        }
        assert!(log.contains("a:load"));
        assert_eq!(a.state(), SituationState::Standby);
        log.take();

        root.dispose();

        assert_eq!(handle.error(), Some(TransitionError::Canceled));
        assert_eq!(a.state(), SituationState::Invalid);
        assert_eq!(log.take(), vec!["a:load_scope", "a:release"]);
    }

    #[test]
    fn dispose_releases_top_first() {
        let log = EventLog::new();
        let root = root();
        let a = probe("a", &log).spawn();
        let b = Probe::<1>::new("b", &log).spawn();
        push(&root, &a);
        push(&root, &b);

        root.dispose();

        log.assert_before("b:release", "a:release");
        assert!(root.is_empty());
    }

    //--- Nesting ----------------------------------------------------------

    #[test]
    fn child_stacks_chain_services_and_ticks() {
        let log = EventLog::new();
        let context = GlobalContext::default();
        context.services.set(String::from("root config"));
        let root = SituationContainer::new(&context);

        let a = probe("a", &log).spawn();
        let child = Probe::<1>::new("child", &log).spawn();
        push(&root, &a);
        a.services().set(42u32);

        let handle = a.transition(Some(&child), None, Vec::new());
        settle(a.children(), &handle);

        assert_eq!(child.parent_situation(), Some(a.clone()));
        assert_eq!(child.services().get::<u32>().as_deref(), Some(&42));
        assert_eq!(
            child.services().get::<String>().as_deref().map(String::as_str),
            Some("root config")
        );

        let child_ticks = log.ticks("child");
        tick(&root);
        assert_eq!(log.ticks("child"), child_ticks + 1);

        root.dispose();
        log.assert_before("child:release", "a:release");
        assert_eq!(child.state(), SituationState::Invalid);
    }

    //--- Navigation From Hooks -------------------------------------------

    /// Error of the request made from inside the hook, once it was made.
    type HookOutcome = Rc<Cell<Option<Option<TransitionError>>>>;

    /// Requests navigation from its own `on_update` once a target is set.
    struct Navigator {
        target: Rc<RefCell<Option<SituationHandle>>>,
        allow: bool,
        consulted: Rc<Cell<u32>>,
        outcome: HookOutcome,
    }

    impl Navigator {
        fn spawn(
            target: &Rc<RefCell<Option<SituationHandle>>>,
            allow: bool,
        ) -> (SituationHandle, Rc<Cell<u32>>, HookOutcome) {
            let consulted = Rc::new(Cell::new(0));
            let outcome = Rc::new(Cell::new(None));
            let handle = SituationHandle::new(Navigator {
                target: target.clone(),
                allow,
                consulted: consulted.clone(),
                outcome: outcome.clone(),
            });
            (handle, consulted, outcome)
        }
    }

    impl Situation for Navigator {
        fn on_update(&self, cx: &SituationContext<'_>) {
            let Some(target) = self.target.borrow_mut().take() else {
                return;
            };
            if let Some(parent) = cx.situation().parent() {
                let handle = parent.transition(Some(&target), None, Vec::new());
                self.outcome.set(Some(handle.error()));
            }
        }

        fn can_transition(&self, _next: &SituationHandle, _transition: &dyn Transition) -> bool {
            self.consulted.set(self.consulted.get() + 1);
            self.allow
        }
    }

    #[test]
    fn situation_may_navigate_its_own_stack_from_update() {
        let log = EventLog::new();
        let root = root();
        let target = Rc::new(RefCell::new(None));
        let (navigator, consulted, outcome) = Navigator::spawn(&target, true);
        let b = probe("b", &log).spawn();

        push(&root, &navigator);
        *target.borrow_mut() = Some(b.clone());

        tick(&root);
        assert_eq!(outcome.get(), Some(None));
        assert_eq!(consulted.get(), 1);

        let handle = root.in_flight().expect("transition in flight");
        settle(&root, &handle);
        assert_eq!(root.stack(), vec![navigator, b.clone()]);
        assert_eq!(b.state(), SituationState::Active);
    }

    #[test]
    fn veto_applies_to_requests_made_from_inside_a_hook() {
        let log = EventLog::new();
        let root = root();
        let target = Rc::new(RefCell::new(None));
        let (navigator, consulted, outcome) = Navigator::spawn(&target, false);
        let b = probe("b", &log).spawn();

        push(&root, &navigator);
        *target.borrow_mut() = Some(b.clone());

        tick(&root);
        assert_eq!(outcome.get(), Some(Some(TransitionError::Rejected)));
        assert_eq!(consulted.get(), 1);
        assert!(!root.is_transitioning());
        assert_eq!(root.stack(), vec![navigator]);
        assert_eq!(b.state(), SituationState::Invalid);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn default_transition_is_configurable() {
        use crate::core::situation::CrossTransition;

        let root = root();
        assert_eq!(root.default_transition().name(), "OutIn");
        root.set_default_transition(Rc::new(CrossTransition));
        assert_eq!(root.default_transition().name(), "Cross");
    }
}
