//=========================================================================
// Transition Errors
//=========================================================================
//
// Recoverable outcomes of a rejected or interrupted transition request.
// None of these leave the stack in a modified state.
//
//=========================================================================

use thiserror::Error;

/// Why a transition request did not (fully) happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Another transition is still in flight on this container.
    #[error("a transition is already in progress")]
    Busy,

    /// The target is already the current situation (or the stack is empty
    /// and the target is nothing).
    #[error("target situation is already current")]
    AlreadyCurrent,

    /// The current situation's `can_transition` refused the request.
    #[error("transition rejected by the current situation")]
    Rejected,

    /// The target is attached to a different container.
    #[error("target situation belongs to another container")]
    Foreign,

    /// The transition routine was removed before it completed.
    #[error("transition canceled before completion")]
    Canceled,
}
