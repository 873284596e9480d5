//=========================================================================
// Cross Transition
//=========================================================================
//
// Overlapping handoff: the incoming situation is loaded and set up while
// the outgoing one is still presented, then both animate together.
//
// Timeline:
//   Initializing: effects enter → next load (effects updated per step)
//                 → next setup
//   Opening: [prev close ∥ next open ∥ effects exit]
//   → prev cleanup → prev unload → Completed
//
//=========================================================================

//=== External Dependencies ===============================================

use std::rc::Rc;

use futures_util::FutureExt;

//=== Internal Dependencies ===============================================

use super::{Transition, TransitionInfo, TransitionState};
use crate::core::coroutine::{merged, with_side_effect, Routine};
use crate::core::situation::SituationLifecycle;

//=== CrossTransition =====================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct CrossTransition;

impl CrossTransition {
    pub fn new() -> Self {
        Self
    }
}

impl Transition for CrossTransition {
    fn name(&self) -> &'static str {
        "Cross"
    }

    fn transition_routine(&self, info: Rc<TransitionInfo>) -> Routine {
        async move {
            let leaving = info.leaving().cloned();
            let next = info.next().cloned();

            info.set_state(TransitionState::Initializing);
            info.enter_effects().await;

            if let Some(next) = &next {
                let ticking = info.clone();
                with_side_effect(next.load_routine(&info), move || ticking.update_effects()).await;
                next.setup(&info);
            }

            info.set_state(TransitionState::Opening);
            let mut phase = Vec::with_capacity(3);
            if let Some(prev) = &leaving {
                phase.push(prev.close_routine(&info));
            }
            if let Some(next) = &next {
                phase.push(next.open_routine(&info));
            }
            phase.push(info.exit_effects());
            merged(phase).await;

            if let Some(prev) = &leaving {
                prev.cleanup(&info);
                prev.unload(&info);
            }

            info.set_state(TransitionState::Completed);
        }
        .boxed_local()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
