//=========================================================================
// Platform Bridge
//=========================================================================
//
// Bridges platform layer (winit/SDL/etc.) with core systems.
//
// This module defines the contract between platform implementations and
// core logic, enabling platform backends to be swapped without changing
// core code.
//
// Components:
// - `interface`: Event types and error definitions (the contract)
// - `event_collector`: Core-side event draining and pause tracking
//
//=========================================================================

//=== Module Declarations =================================================

pub(crate) mod event_collector;
pub(crate) mod interface;

//=== Internal API ========================================================

pub(crate) use event_collector::{EventCollector, TickControl};
pub(crate) use interface::PlatformEvent;

//=== Public API ==========================================================

pub use interface::PlatformError;
