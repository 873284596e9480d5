//=========================================================================
// Coroutine System
//=========================================================================
//
// Single-threaded cooperative routines advanced one step per tick.
//
// A routine is a boxed local future. The runner polls it once per
// `update()` with a no-op waker; suspension points are futures that
// return `Pending` once and `Ready` on the following tick.
//
// Architecture:
//   CoroutineRunner
//     └─ routines: Vec<(RoutineId, Routine, on_complete)>
//
//   update() → poll each routine once (start order) → finished? → callback
//
// Components:
// - `runner`: the tick-driven executor
// - `combinators`: join / sequence / side-effect / suspension helpers
// - `completion`: one-shot completion channel for external async work
//
//=========================================================================

//=== External Dependencies ===============================================

use futures_util::future::LocalBoxFuture;

//=== Module Declarations =================================================

mod combinators;
pub mod completion;
mod runner;

//=== Public API ==========================================================

pub use combinators::{
    done, merged, next_tick, sequence, wait_ticks, wait_until, with_side_effect, Merged, NextTick,
    WithSideEffect,
};
pub use completion::{completion, Completer, Completion, CompletionError};
pub use runner::{CoroutineRunner, RoutineId};

/// A suspendable task driven by a [`CoroutineRunner`].
pub type Routine = LocalBoxFuture<'static, ()>;
