//=========================================================================
// Coroutine Runner
//=========================================================================
//
// Tick-driven executor for local routines.
//
// Every `update()` advances each running routine by exactly one step,
// in the order the routines were started. Finished routines are removed
// and their completion callback runs exactly once, after the whole tick
// has been polled.
//
// Re-entrancy:
//   Routines may start new routines on the runner that is polling them.
//   Those are queued behind the current set and first run next tick.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::task::{Context, Poll};

use futures_util::task::noop_waker_ref;
use log::trace;

//=== Internal Dependencies ===============================================

use super::Routine;

//=== RoutineId ===========================================================

/// Identifies a routine started on a [`CoroutineRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutineId(u64);

//=== Runner Entry ========================================================

type OnComplete = Box<dyn FnOnce()>;

struct RunningRoutine {
    id: RoutineId,
    routine: Routine,
    on_complete: Option<OnComplete>,
}

//=== CoroutineRunner =====================================================

/// Drives a set of routines cooperatively, one step per tick.
///
/// All methods take `&self` so routines can reach the runner that owns
/// them through shared handles while it is being updated.
#[derive(Default)]
pub struct CoroutineRunner {
    routines: RefCell<Vec<RunningRoutine>>,
    next_id: Cell<u64>,
}

impl CoroutineRunner {
    /// Creates an empty runner.
    pub fn new() -> Self {
        Self::default()
    }

    //--- Scheduling -------------------------------------------------------

    /// Schedules `routine`; it is first advanced on the next [`update`](Self::update).
    pub fn start(&self, routine: Routine) -> RoutineId {
        self.push(routine, None)
    }

    /// Schedules `routine` and runs `on_complete` once it finishes or is stopped.
    pub fn start_with<F>(&self, routine: Routine, on_complete: F) -> RoutineId
    where
        F: FnOnce() + 'static,
    {
        self.push(routine, Some(Box::new(on_complete)))
    }

    /// Removes a routine without finishing it. Its callback still runs.
    ///
    /// Returns false if the routine is unknown or currently being polled.
    pub fn stop(&self, id: RoutineId) -> bool {
        let removed = {
            let mut routines = self.routines.borrow_mut();
            routines
                .iter()
                .position(|r| r.id == id)
                .map(|pos| routines.remove(pos))
        };

        match removed {
            Some(mut entry) => {
                trace!("Stopped routine {:?}", id);
                drop(entry.routine);
                if let Some(callback) = entry.on_complete.take() {
                    callback();
                }
                true
            }
            None => false,
        }
    }

    /// Removes every routine, running their callbacks in start order.
    pub fn stop_all(&self) {
        let removed = std::mem::take(&mut *self.routines.borrow_mut());
        for mut entry in removed {
            trace!("Stopped routine {:?}", entry.id);
            drop(entry.routine);
            if let Some(callback) = entry.on_complete.take() {
                callback();
            }
        }
    }

    //--- Update Loop ------------------------------------------------------

    /// Advances every running routine by one step.
    pub fn update(&self) {
        let mut active = std::mem::take(&mut *self.routines.borrow_mut());
        if active.is_empty() {
            return;
        }

        let mut cx = Context::from_waker(noop_waker_ref());
        let mut finished = Vec::new();

        active.retain_mut(|entry| match entry.routine.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                trace!("Routine {:?} finished", entry.id);
                finished.push(entry.on_complete.take());
                false
            }
            Poll::Pending => true,
        });

        // Keep survivors ahead of routines started during this tick.
        {
            let mut routines = self.routines.borrow_mut();
            let started = std::mem::replace(&mut *routines, active);
            routines.extend(started);
        }

        for callback in finished.into_iter().flatten() {
            callback();
        }
    }

    //--- Query API --------------------------------------------------------

    /// True while `id` is scheduled and not being polled.
    pub fn is_running(&self, id: RoutineId) -> bool {
        self.routines.borrow().iter().any(|r| r.id == id)
    }

    /// Number of scheduled routines.
    pub fn len(&self) -> usize {
        self.routines.borrow().len()
    }

    /// True if no routine is scheduled.
    pub fn is_empty(&self) -> bool {
        self.routines.borrow().is_empty()
    }

    //--- Internal Helpers -------------------------------------------------

    fn push(&self, routine: Routine, on_complete: Option<OnComplete>) -> RoutineId {
        let id = RoutineId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        trace!("Starting routine {:?}", id);
        self.routines.borrow_mut().push(RunningRoutine {
            id,
            routine,
            on_complete,
        });
        id
    }
}

impl fmt::Debug for CoroutineRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoroutineRunner")
            .field("running", &self.len())
            .finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
