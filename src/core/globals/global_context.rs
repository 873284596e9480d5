//=========================================================================
// Global Context
//=========================================================================
//
// Process-wide root data shared with situations.
//
// Contains:
// - services: root of the service registry chain; every situation on a
//   root container resolves missing services here
//
// The context is constructed explicitly and handed to the root container,
// never reached through a global.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::services::ServiceContainer;

//=== GlobalContext =======================================================

/// Shared root data for a situation tree.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct GlobalContext {
    /// Root service registry.
    ///
    /// Register application-wide services here before the first situation
    /// is pushed; situation registries chain up to it.
    pub services: ServiceContainer,
}

impl GlobalContext {
    /// Creates a context with an empty root registry.
    pub fn new() -> Self {
        Self::default()
    }
}
