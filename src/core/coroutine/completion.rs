//=========================================================================
// Completion Channel
//=========================================================================
//
// One-shot completion signal for work that finishes outside the tick
// loop (asset loads, platform requests, background jobs).
//
// Architecture:
//   worker thread ── Completer::complete(value) ──▶ crossbeam(1)
//                                                      ↓
//   load routine ◀── Completion.await (try_recv once per tick)
//
// The completer is consumed by `complete`, so a signal can only ever be
// sent once. Dropping it unsent resolves the completion as abandoned.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use thiserror::Error;

//=== CompletionError =====================================================

/// Failure reported by a [`Completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// The [`Completer`] was dropped without completing.
    #[error("completion abandoned before a value was sent")]
    Abandoned,
}

//=== Constructor =========================================================

/// Creates a linked completer/completion pair.
pub fn completion<T: Send>() -> (Completer<T>, Completion<T>) {
    let (sender, receiver) = bounded(1);
    (Completer { sender }, Completion { receiver })
}

//=== Completer ===========================================================

/// Sending half. May be moved to another thread.
#[derive(Debug)]
pub struct Completer<T> {
    sender: Sender<T>,
}

impl<T> Completer<T> {
    /// Signals completion with `value`.
    ///
    /// Returns the value back if the receiving side is already gone.
    pub fn complete(self, value: T) -> Result<(), T> {
        self.sender.send(value).map_err(|e| e.into_inner())
    }
}

//=== Completion ==========================================================

/// Receiving half, awaited inside a routine.
///
/// Each poll checks the channel once without blocking, so awaiting it
/// from a routine costs one check per tick.
#[must_use = "futures do nothing unless polled"]
#[derive(Debug)]
pub struct Completion<T> {
    receiver: Receiver<T>,
}

impl<T> Completion<T> {
    /// Non-blocking check. `None` means still pending.
    pub fn try_take(&self) -> Option<Result<T, CompletionError>> {
        match self.receiver.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CompletionError::Abandoned)),
        }
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, CompletionError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.try_take() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
