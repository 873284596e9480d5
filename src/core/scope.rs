//=========================================================================
// Scope
//=========================================================================
//
// One-shot cancellation and cleanup broadcast token.
//
// Code that acquires something for the lifetime of a phase registers a
// release callback on the phase's scope. Disposing the scope fires every
// callback once and forgets it.
//
// Lifecycle:
//   Scope::new() → on_expired(..)* → dispose() → [expired]
//                                  ↘ clear()   → (reusable)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

//=== ListenerId ==========================================================

/// Identifies a callback registered on a [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

//=== Scope ===============================================================

type Listener = Box<dyn FnOnce()>;

#[derive(Default)]
struct ScopeInner {
    expired: bool,
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

/// Cancellation and resource-lifetime token.
///
/// Cloning a scope yields another handle to the same token, so routines can
/// keep a copy and poll [`Scope::is_expired`] between suspension points.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<RefCell<ScopeInner>>,
}

impl Scope {
    /// Creates a live scope with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback to run when the scope fires.
    ///
    /// If the scope is already expired the callback runs immediately.
    pub fn on_expired<F>(&self, callback: F) -> ListenerId
    where
        F: FnOnce() + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;

        if inner.expired {
            drop(inner);
            callback();
        } else {
            inner.listeners.push((id, Box::new(callback)));
        }

        id
    }

    /// Unregisters a callback. Returns false if it already fired or was removed.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener, _)| *listener != id);
        inner.listeners.len() != before
    }

    /// Fires and forgets every registered callback, leaving the scope usable.
    pub fn clear(&self) {
        self.fire(false);
    }

    /// Fires and forgets every registered callback and marks the scope expired.
    ///
    /// Calling it again does nothing.
    pub fn dispose(&self) {
        self.fire(true);
    }

    /// True once [`Scope::dispose`] has been called.
    pub fn is_expired(&self) -> bool {
        self.inner.borrow().expired
    }

    /// Number of callbacks waiting for the next firing.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Resolves on the first poll after the scope is disposed.
    pub fn expired(&self) -> Expired {
        Expired {
            scope: self.clone(),
        }
    }

    /// Returns a guard that disposes this scope when dropped.
    ///
    /// Held across a routine's await points so the scope expires even if
    /// the routine is dropped before finishing.
    pub fn guard(&self) -> ScopeGuard {
        ScopeGuard {
            scope: self.clone(),
        }
    }

    //--- Internal Helpers -------------------------------------------------

    fn fire(&self, expire: bool) {
        // Listeners may touch this scope again, so run them unborrowed.
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            if inner.expired {
                return;
            }
            inner.expired = expire;
            std::mem::take(&mut inner.listeners)
        };

        for (_, listener) in listeners {
            listener();
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scope")
            .field("expired", &inner.expired)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

//=== ScopeGuard ==========================================================

/// Disposes its scope on drop. See [`Scope::guard`].
#[must_use = "the scope is disposed as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard {
    scope: Scope,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.scope.dispose();
    }
}

//=== Expired =============================================================

/// Future returned by [`Scope::expired`].
#[must_use = "futures do nothing unless polled"]
pub struct Expired {
    scope: Scope,
}

impl Future for Expired {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.scope.is_expired() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
