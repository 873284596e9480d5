//=========================================================================
// Routine Combinators
//=========================================================================
//
// Building blocks for transition choreography.
//
// - `next_tick` / `wait_ticks` / `wait_until`: suspension points
// - `merged`: parallel join, done when every child is done
// - `sequence`: run children one after another
// - `with_side_effect`: run a primary routine, invoking a callback on
//   every step where the primary is still suspended
//
//=========================================================================

//=== External Dependencies ===============================================

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::FutureExt;

//=== Internal Dependencies ===============================================

use super::Routine;

//=== Suspension Points ===================================================

/// Future that suspends exactly once.
#[must_use = "futures do nothing unless polled"]
#[derive(Debug, Default)]
pub struct NextTick {
    yielded: bool,
}

impl Future for NextTick {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}

/// Suspends the current routine until the next tick.
pub fn next_tick() -> NextTick {
    NextTick::default()
}

/// A routine that finishes on its first step.
pub fn done() -> Routine {
    async {}.boxed_local()
}

/// Suspends for `ticks` steps.
pub fn wait_ticks(ticks: u32) -> Routine {
    async move {
        for _ in 0..ticks {
            next_tick().await;
        }
    }
    .boxed_local()
}

/// Suspends until `predicate` returns true. Checked once per step.
pub fn wait_until<F>(mut predicate: F) -> Routine
where
    F: FnMut() -> bool + 'static,
{
    async move {
        while !predicate() {
            next_tick().await;
        }
    }
    .boxed_local()
}

//=== Merged ==============================================================

/// Parallel join over routines. See [`merged`].
#[must_use = "futures do nothing unless polled"]
pub struct Merged {
    children: Vec<Option<Routine>>,
}

impl Merged {
    /// Number of children still running.
    pub fn remaining(&self) -> usize {
        self.children.iter().filter(|c| c.is_some()).count()
    }
}

impl Future for Merged {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        for slot in self.children.iter_mut() {
            let finished = match slot {
                Some(child) => child.as_mut().poll(cx).is_ready(),
                None => false,
            };
            if finished {
                *slot = None;
            }
        }

        if self.remaining() == 0 {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Runs every routine concurrently; finishes once all of them have.
///
/// Each child is advanced once per step, in the given order.
pub fn merged<I>(routines: I) -> Merged
where
    I: IntoIterator<Item = Routine>,
{
    Merged {
        children: routines.into_iter().map(Some).collect(),
    }
}

//=== Sequence ============================================================

/// Runs routines one after another.
pub fn sequence<I>(routines: I) -> Routine
where
    I: IntoIterator<Item = Routine>,
{
    let routines: Vec<Routine> = routines.into_iter().collect();
    async move {
        for routine in routines {
            routine.await;
        }
    }
    .boxed_local()
}

//=== WithSideEffect ======================================================

/// Primary routine paired with a per-step callback. See [`with_side_effect`].
#[must_use = "futures do nothing unless polled"]
pub struct WithSideEffect<F> {
    primary: Routine,
    side_effect: F,
}

impl<F> Future for WithSideEffect<F>
where
    F: FnMut() + Unpin,
{
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = &mut *self;
        match this.primary.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(()),
            Poll::Pending => {
                (this.side_effect)();
                Poll::Pending
            }
        }
    }
}

/// Runs `primary`, calling `side_effect` on every step it stays suspended.
pub fn with_side_effect<F>(primary: Routine, side_effect: F) -> WithSideEffect<F>
where
    F: FnMut() + Unpin,
{
    WithSideEffect {
        primary,
        side_effect,
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
