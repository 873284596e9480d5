//=========================================================================
// Transitions
//=========================================================================
//
// Strategy, effect and bookkeeping types for one navigation.
//
// Flow:
//   SituationContainer::transition()
//     → TransitionInfo { prev, next, back, effects }
//     → Transition::transition_routine(info)  (scheduled on the runner)
//     → SituationLifecycle phases on prev / next
//     → TransitionState::Completed (or Canceled if removed early)
//
// Strategies:
// - `OutInTransition`: prev fully out, then next in (default)
// - `CrossTransition`: next loads first, then both animate together
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use log::{trace, warn};

//=== Internal Dependencies ===============================================

use super::container::WeakContainer;
use super::{SituationContainer, SituationHandle, TransitionError};
use crate::core::coroutine::{done, merged, next_tick, Routine};

//=== Module Declarations =================================================

mod cross;
mod out_in;

//=== Public API ==========================================================

pub use cross::CrossTransition;
pub use out_in::OutInTransition;

//=== Transition Trait ====================================================

/// Choreography of the phases between an outgoing and incoming situation.
///
/// The routine owns the [`TransitionInfo`] for its whole run and must move
/// its state forward to [`TransitionState::Completed`] before finishing.
/// Both `prev` and `next` may be absent.
pub trait Transition {
    /// Label used in logs.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn transition_routine(&self, info: Rc<TransitionInfo>) -> Routine;
}

//=== TransitionEffect ====================================================

/// Visual overlay driven alongside a transition (fade, wipe, spinner).
pub trait TransitionEffect {
    /// Covers the outgoing situation.
    fn enter_routine(&mut self) -> Routine {
        done()
    }

    /// Called once per step while the incoming situation is loading.
    fn update(&mut self) {}

    /// Reveals the incoming situation.
    fn exit_routine(&mut self) -> Routine {
        done()
    }
}

//=== TransitionState =====================================================

/// Progress of a [`TransitionInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionState {
    Standby,
    Initializing,
    Opening,
    Completed,
    Canceled,
}

impl fmt::Display for TransitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

//=== TransitionInfo ======================================================

/// Shared record of one in-flight navigation.
pub struct TransitionInfo {
    container: WeakContainer,
    prev: Option<SituationHandle>,
    next: Option<SituationHandle>,
    back: bool,
    state: Cell<TransitionState>,
    effects: RefCell<Vec<Box<dyn TransitionEffect>>>,
}

impl TransitionInfo {
    pub(crate) fn new(
        container: WeakContainer,
        prev: Option<SituationHandle>,
        next: Option<SituationHandle>,
        back: bool,
        effects: Vec<Box<dyn TransitionEffect>>,
    ) -> Self {
        Self {
            container,
            prev,
            next,
            back,
            state: Cell::new(TransitionState::Standby),
            effects: RefCell::new(effects),
        }
    }

    //--- Query API --------------------------------------------------------

    /// The container that accepted the request, while it is alive.
    pub fn container(&self) -> Option<SituationContainer> {
        self.container.upgrade()
    }

    /// The top of the stack when the request was accepted.
    pub fn prev(&self) -> Option<&SituationHandle> {
        self.prev.as_ref()
    }

    /// The target. `None` closes everything.
    pub fn next(&self) -> Option<&SituationHandle> {
        self.next.as_ref()
    }

    /// True for pop-to, replace and close-everything navigation.
    pub fn is_back(&self) -> bool {
        self.back
    }

    /// True when `prev` was removed from the stack by this navigation and
    /// must be closed and unwound by the strategy.
    pub fn prev_leaves_stack(&self) -> bool {
        self.back && self.prev.is_some()
    }

    /// `prev`, if it leaves the stack.
    pub fn leaving(&self) -> Option<&SituationHandle> {
        self.prev.as_ref().filter(|_| self.back)
    }

    pub fn state(&self) -> TransitionState {
        self.state.get()
    }

    /// Advances the recorded progress. Called by strategies.
    pub fn set_state(&self, state: TransitionState) {
        let previous = self.state.replace(state);
        trace!(target: "transition", "{} -> {}", previous, state);
    }

    /// True once completed or canceled.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state.get(),
            TransitionState::Completed | TransitionState::Canceled
        )
    }

    pub fn effect_count(&self) -> usize {
        self.effects.borrow().len()
    }

    //--- Effect Phases ----------------------------------------------------

    /// Every effect's enter routine, joined.
    pub fn enter_effects(&self) -> Routine {
        self.collect_effects(|effect| effect.enter_routine())
    }

    /// Ticks every effect once.
    pub fn update_effects(&self) {
        match self.effects.try_borrow_mut() {
            Ok(mut effects) => effects.iter_mut().for_each(|effect| effect.update()),
            Err(_) => warn!(target: "transition", "Re-entrant effect update skipped"),
        }
    }

    /// Every effect's exit routine, joined.
    pub fn exit_effects(&self) -> Routine {
        self.collect_effects(|effect| effect.exit_routine())
    }

    fn collect_effects(&self, phase: impl Fn(&mut dyn TransitionEffect) -> Routine) -> Routine {
        let routines: Vec<Routine> = match self.effects.try_borrow_mut() {
            Ok(mut effects) => effects.iter_mut().map(|effect| phase(&mut **effect)).collect(),
            Err(_) => {
                warn!(target: "transition", "Re-entrant effect phase skipped");
                Vec::new()
            }
        };
        merged(routines).boxed_local()
    }
}

impl fmt::Debug for TransitionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionInfo")
            .field("prev", &self.prev.as_ref().map(SituationHandle::name))
            .field("next", &self.next.as_ref().map(SituationHandle::name))
            .field("back", &self.back)
            .field("state", &self.state.get())
            .field("effects", &self.effect_count())
            .finish()
    }
}

//=== TransitionHandle ====================================================

#[derive(Debug, Clone)]
enum Outcome {
    Started(Rc<TransitionInfo>),
    Failed(TransitionError),
}

/// Outcome token returned by every transition request.
///
/// Polling only: holding or dropping a handle has no effect on the
/// transition itself.
#[derive(Debug, Clone)]
pub struct TransitionHandle {
    outcome: Outcome,
}

impl TransitionHandle {
    pub(crate) fn started(info: Rc<TransitionInfo>) -> Self {
        Self {
            outcome: Outcome::Started(info),
        }
    }

    pub(crate) fn failed(error: TransitionError) -> Self {
        Self {
            outcome: Outcome::Failed(error),
        }
    }

    /// True if the request failed or its routine has ended.
    pub fn is_done(&self) -> bool {
        match &self.outcome {
            Outcome::Started(info) => info.is_finished(),
            Outcome::Failed(_) => true,
        }
    }

    /// Why the transition did not happen, or `Canceled` if it was cut short.
    pub fn error(&self) -> Option<TransitionError> {
        match &self.outcome {
            Outcome::Started(info) if info.state() == TransitionState::Canceled => {
                Some(TransitionError::Canceled)
            }
            Outcome::Started(_) => None,
            Outcome::Failed(error) => Some(*error),
        }
    }

    pub fn is_back(&self) -> bool {
        self.info().is_some_and(|info| info.is_back())
    }

    /// Current progress, `None` if the request was refused.
    pub fn state(&self) -> Option<TransitionState> {
        self.info().map(|info| info.state())
    }

    pub fn prev(&self) -> Option<SituationHandle> {
        self.info().and_then(|info| info.prev().cloned())
    }

    pub fn next(&self) -> Option<SituationHandle> {
        self.info().and_then(|info| info.next().cloned())
    }

    pub fn info(&self) -> Option<&Rc<TransitionInfo>> {
        match &self.outcome {
            Outcome::Started(info) => Some(info),
            Outcome::Failed(_) => None,
        }
    }

    /// Resolves once the transition is done, one check per tick.
    pub fn wait(&self) -> LocalBoxFuture<'static, Result<(), TransitionError>> {
        let handle = self.clone();
        async move {
            while !handle.is_done() {
                next_tick().await;
            }
            match handle.error() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
        .boxed_local()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
