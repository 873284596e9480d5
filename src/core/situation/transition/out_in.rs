//=========================================================================
// Out-In Transition
//=========================================================================
//
// Sequential handoff: the outgoing situation finishes leaving before the
// incoming one starts loading.
//
// Timeline:
//   [prev close ∥ effects enter] → prev cleanup → prev unload
//   → pre-initialize hook
//   → Initializing: next load (effects updated per step) → next setup
//   → Opening: [next open ∥ effects exit]
//   → Completed
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::rc::Rc;

use futures_util::FutureExt;

//=== Internal Dependencies ===============================================

use super::{Transition, TransitionInfo, TransitionState};
use crate::core::coroutine::{merged, with_side_effect, Routine};
use crate::core::situation::SituationLifecycle;

//=== OutInTransition =====================================================

type PreInitialize = Rc<dyn Fn(&Rc<TransitionInfo>) -> Routine>;

/// Default strategy. See the module header for the phase order.
#[derive(Clone, Default)]
pub struct OutInTransition {
    pre_initialize: Option<PreInitialize>,
}

impl OutInTransition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` after the outgoing situation is unloaded and before the
    /// incoming one starts loading (e.g. to release a shared asset cache).
    pub fn with_pre_initialize<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Rc<TransitionInfo>) -> Routine + 'static,
    {
        self.pre_initialize = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for OutInTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutInTransition")
            .field("pre_initialize", &self.pre_initialize.is_some())
            .finish()
    }
}

impl Transition for OutInTransition {
    fn name(&self) -> &'static str {
        "OutIn"
    }

    fn transition_routine(&self, info: Rc<TransitionInfo>) -> Routine {
        let pre_initialize = self.pre_initialize.clone();

        async move {
            let leaving = info.leaving().cloned();

            // Out
            let mut out = Vec::with_capacity(2);
            if let Some(prev) = &leaving {
                out.push(prev.close_routine(&info));
            }
            out.push(info.enter_effects());
            merged(out).await;

            if let Some(prev) = &leaving {
                prev.cleanup(&info);
                prev.unload(&info);
            }

            if let Some(hook) = &pre_initialize {
                hook(&info).await;
            }

            // In
            match info.next().cloned() {
                Some(next) => {
                    info.set_state(TransitionState::Initializing);
                    let ticking = info.clone();
                    with_side_effect(next.load_routine(&info), move || ticking.update_effects())
                        .await;
                    next.setup(&info);

                    info.set_state(TransitionState::Opening);
                    merged(vec![next.open_routine(&info), info.exit_effects()]).await;
                }
                None => info.exit_effects().await,
            }

            info.set_state(TransitionState::Completed);
        }
        .boxed_local()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
