//=========================================================================
// Aetheric Situations - Library Root
//
// Stack-based situation orchestration for the Aetheric Engine.
//
// Responsibilities:
// - Expose the situation core (`core::situation`, `core::coroutine`,
//   `core::scope`, `core::services`)
// - Expose the optional windowed runtime (`Engine`, `EngineBuilder`)
// - Keep internal modules (like `platform`) hidden from end users
//
// Typical usage:
// ```no_run
// use aetheric_situations::prelude::*;
//
// struct Title;
// impl Situation for Title {}
//
// fn main() -> Result<(), PlatformError> {
//     EngineBuilder::new()
//         .build()
//         .init(|systems| {
//             let title = SituationHandle::new(Title);
//             systems.situations.transition(Some(&title), None, Vec::new());
//         })
//         .run()
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the situation tree, the cooperative runner and the
// logic-thread orchestration. It can be driven directly (call `update` on
// a root `SituationContainer` every tick) without the windowed runtime.
//
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `platform` contains OS-specific logic (window, Winit integration,
// event loop) and is kept private, as it is not part of the public API.
//
// `engine` defines the main engine entry point and initialization logic.
//
mod engine;
mod platform;

//--- Public Exports ------------------------------------------------------

pub use crate::core::platform_bridge::PlatformError;
pub use engine::{Engine, EngineBuilder};
