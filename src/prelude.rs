//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_situations::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine core
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::PlatformError;

// Global systems and context
pub use crate::core::globals::{GlobalContext, GlobalSystems};

// Situation system
pub use crate::core::situation::{
    CrossTransition, OutInTransition, Situation, SituationContainer, SituationContext,
    SituationHandle, SituationLifecycle, SituationState, Transition, TransitionEffect,
    TransitionError, TransitionHandle, TransitionInfo, TransitionState,
};

// Coroutines
pub use crate::core::coroutine::{
    completion, done, merged, next_tick, sequence, wait_ticks, wait_until, with_side_effect,
    Completer, Completion, CompletionError, CoroutineRunner, Routine,
};

// Scopes and services
pub use crate::core::scope::Scope;
pub use crate::core::services::{Dispose, ServiceContainer};
