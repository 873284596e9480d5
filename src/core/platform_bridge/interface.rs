//=========================================================================
// Platform Bridge Interface
//=========================================================================
//
// Platform-to-core interface types (events and errors).
//
// Defines the contract for communication between platform and core threads.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== PlatformEvent =======================================================

/// Events sent from platform to core over the bridge channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlatformEvent {
    /// Application suspended by the OS; situations stop ticking.
    Suspended,

    /// Application resumed; ticking continues.
    Resumed,

    /// Window close requested.
    WindowClosed,
}

//=== PlatformError =======================================================

/// Platform initialization and runtime errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Event loop creation failed (OS-level issue).
    #[error("Event loop creation failed: {0}")]
    EventLoopCreation(String),

    /// Event loop execution error.
    #[error("Event loop error: {0}")]
    EventLoopExecution(String),
}
