//=========================================================================
// Global Systems
//=========================================================================
//
// Container for engine-level systems with logic.
//
// Owns the root situation stack and drives it once per tick. Lives on the
// logic thread for its whole life.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::info;

//=== Internal Dependencies ===============================================

use super::GlobalContext;
use crate::core::situation::SituationContainer;

//=== GlobalSystems =======================================================

/// Engine-level logic systems.
///
/// # Available Systems
///
/// - `context`: shared root data (service registry)
/// - `situations`: root situation stack
pub struct GlobalSystems {
    /// Shared data passed to the root container.
    pub context: GlobalContext,

    /// The root situation stack.
    ///
    /// Push the first situation from an [`crate::Engine::init`] callback.
    pub situations: SituationContainer,

    ticks: u64,
}

impl GlobalSystems {
    /// Creates the systems with a fresh context and an empty root stack.
    pub fn new() -> Self {
        Self::with_context(GlobalContext::new())
    }

    /// Creates the systems around an existing context.
    pub fn with_context(context: GlobalContext) -> Self {
        let situations = SituationContainer::new(&context);
        Self {
            context,
            situations,
            ticks: 0,
        }
    }

    //--- Update Loop ------------------------------------------------------

    /// Runs one tick of the situation tree.
    ///
    /// # Processing Pipeline
    ///
    /// 1. **Update**: advances the in-flight transition, then ticks the
    ///    active situations (recursively through child stacks)
    /// 2. **Late Update**: second pass over the same situations
    pub fn update(&mut self) {
        self.situations.update();
        self.situations.late_update();
        self.ticks += 1;
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Releases every situation and the root registry.
    pub fn shutdown(&mut self) {
        info!("Shutting down situation tree after {} ticks", self.ticks);
        self.situations.dispose();
        self.context.services.dispose();
    }
}

impl Default for GlobalSystems {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::situation::testing::{probe, EventLog};
    use crate::core::situation::SituationState;

    #[test]
    fn update_drives_root_stack() {
        let log = EventLog::new();
        let mut systems = GlobalSystems::new();
        let a = probe("a", &log).spawn();

        systems.situations.transition(Some(&a), None, Vec::new());
        systems.update();

        assert_eq!(a.state(), SituationState::Active);
        assert_eq!(log.ticks("a"), 1);
        assert_eq!(log.late_ticks("a"), 1);
        assert_eq!(systems.ticks(), 1);
    }

    #[test]
    fn shutdown_releases_everything() {
        let log = EventLog::new();
        let mut systems = GlobalSystems::new();
        systems.context.services.set(3u8);
        let a = probe("a", &log).spawn();

        systems.situations.transition(Some(&a), None, Vec::new());
        systems.update();
        systems.shutdown();

        assert_eq!(a.state(), SituationState::Invalid);
        assert!(systems.situations.is_empty());
        assert!(systems.context.services.is_disposed());
    }
}
