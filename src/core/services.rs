//=========================================================================
// Service Container
//=========================================================================
//
// Scoped, parent-chained service registry.
//
// Each situation owns one container whose parent is its parent
// situation's container (or the global root). Lookups that miss walk
// towards the root. Disposal runs `Dispose::dispose` on every instance
// registered as disposable, then drops all instances, both in reverse
// registration order.
//
// Architecture:
//   GlobalContext.services (root)
//     └─ Title.services
//          └─ Menu.services ── get::<T>() ──▶ local? ──▶ parent? ──▶ ...
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use log::{error, trace, warn};

//=== Dispose =============================================================

/// Explicit teardown for services whose lifetime ends with their registry.
///
/// The registry hands out shared `Rc`s, so dropping its own reference is
/// not enough to end a service that a caller still holds.
pub trait Dispose {
    fn dispose(&self);
}

//=== Service Entry =======================================================

type Disposer = Box<dyn Fn()>;

struct ServiceEntry {
    type_id: TypeId,
    index: usize,
    instance: Rc<dyn Any>,
    disposer: Option<Disposer>,
}

struct ServiceInner {
    parent: Option<ServiceContainer>,
    entries: RefCell<Vec<ServiceEntry>>,
    disposed: Cell<bool>,
}

//=== ServiceContainer ====================================================

/// Typed service registry with parent fallback.
///
/// Instances are stored behind `Rc` and handed out as `Rc<T>`. Several
/// instances of one type can live side by side under different indices.
#[derive(Clone)]
pub struct ServiceContainer {
    inner: Rc<ServiceInner>,
}

impl ServiceContainer {
    //--- Construction -----------------------------------------------------

    /// Creates a root container with no parent.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a container that falls back to `parent` on lookup misses.
    pub fn with_parent(parent: &ServiceContainer) -> Self {
        Self::build(Some(parent.clone()))
    }

    fn build(parent: Option<ServiceContainer>) -> Self {
        Self {
            inner: Rc::new(ServiceInner {
                parent,
                entries: RefCell::new(Vec::new()),
                disposed: Cell::new(false),
            }),
        }
    }

    //--- Registration -----------------------------------------------------

    /// Registers `instance` as the primary (index 0) service of its type.
    pub fn set<T: Any>(&self, instance: T) -> Rc<T> {
        let instance = Rc::new(instance);
        self.set_rc_at(instance.clone(), 0);
        instance
    }

    /// Registers `instance` under `index` for its type.
    ///
    /// `index` may replace an existing slot or append directly after the
    /// last one. Gaps are refused.
    pub fn set_at<T: Any>(&self, instance: T, index: usize) -> Rc<T> {
        let instance = Rc::new(instance);
        self.set_rc_at(instance.clone(), index);
        instance
    }

    /// Registers an already shared instance under `index`.
    pub fn set_rc_at<T: Any>(&self, instance: Rc<T>, index: usize) {
        self.insert(instance, index, None);
    }

    /// Registers `instance` as the primary service of its type and
    /// disposes it together with this registry.
    pub fn set_disposable<T: Any + Dispose>(&self, instance: T) -> Rc<T> {
        self.set_disposable_at(instance, 0)
    }

    /// Registers a disposable `instance` under `index`.
    pub fn set_disposable_at<T: Any + Dispose>(&self, instance: T, index: usize) -> Rc<T> {
        let instance = Rc::new(instance);
        let target = instance.clone();
        self.insert(instance.clone(), index, Some(Box::new(move || target.dispose())));
        instance
    }

    fn insert<T: Any>(&self, instance: Rc<T>, index: usize, disposer: Option<Disposer>) {
        if self.inner.disposed.get() {
            warn!("Ignoring {} registration on a disposed service container", type_name::<T>());
            return;
        }

        let type_id = TypeId::of::<T>();
        let mut entries = self.inner.entries.borrow_mut();

        if let Some(entry) = entries
            .iter_mut()
            .find(|e| e.type_id == type_id && e.index == index)
        {
            trace!("Replacing service {}[{}]", type_name::<T>(), index);
            entry.instance = instance;
            entry.disposer = disposer;
            return;
        }

        let count = entries.iter().filter(|e| e.type_id == type_id).count();
        if index > count {
            error!(
                "Cannot register {}[{}]: only {} instance(s) registered",
                type_name::<T>(),
                index,
                count
            );
            return;
        }

        trace!("Registering service {}[{}]", type_name::<T>(), index);
        entries.push(ServiceEntry {
            type_id,
            index,
            instance,
            disposer,
        });
    }

    //--- Lookup -----------------------------------------------------------

    /// Returns the primary service of type `T`, searching parents on a miss.
    pub fn get<T: Any>(&self) -> Option<Rc<T>> {
        self.get_at(0)
    }

    /// Returns the service of type `T` registered under `index`.
    ///
    /// If this container holds instances of `T` but none under `index`, the
    /// access is logged as an error and `None` is returned without asking
    /// the parent.
    pub fn get_at<T: Any>(&self, index: usize) -> Option<Rc<T>> {
        let type_id = TypeId::of::<T>();

        let (found, count) = {
            let entries = self.inner.entries.borrow();
            let found = entries
                .iter()
                .find(|e| e.type_id == type_id && e.index == index)
                .map(|e| e.instance.clone());
            let count = entries.iter().filter(|e| e.type_id == type_id).count();
            (found, count)
        };

        if let Some(instance) = found {
            return instance.downcast::<T>().ok();
        }

        if count > 0 {
            error!(
                "Unbound service index {}[{}] ({} registered)",
                type_name::<T>(),
                index,
                count
            );
            return None;
        }

        self.inner.parent.as_ref().and_then(|parent| parent.get_at(index))
    }

    /// Number of instances of `T` registered locally.
    pub fn count<T: Any>(&self) -> usize {
        let type_id = TypeId::of::<T>();
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|e| e.type_id == type_id)
            .count()
    }

    /// Returns the parent container, if any.
    pub fn parent(&self) -> Option<&ServiceContainer> {
        self.inner.parent.as_ref()
    }

    //--- Disposal ---------------------------------------------------------

    /// Disposes every registered [`Dispose`] instance, then drops every
    /// instance, last registered first.
    ///
    /// Plain instances still shared elsewhere live on until their last
    /// `Rc` goes away. Later registrations are ignored.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }

        let mut entries = std::mem::take(&mut *self.inner.entries.borrow_mut());
        trace!("Disposing service container ({} entries)", entries.len());
        while let Some(entry) = entries.pop() {
            if let Some(disposer) = &entry.disposer {
                disposer();
            }
            drop(entry);
        }
    }

    /// True once [`ServiceContainer::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl Dispose for ServiceContainer {
    fn dispose(&self) {
        ServiceContainer::dispose(self);
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("entries", &self.inner.entries.borrow().len())
            .field("has_parent", &self.inner.parent.is_some())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
