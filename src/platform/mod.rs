//=========================================================================
// Platform Subsystem
//
// Bridges Winit (OS-level events) with the engine's core thread via a
// crossbeam channel.
//
// Architecture:
// ```text
//  Main Thread:                     Logic Thread:
//  ┌──────────────────────────┐    ┌──────────────────────┐
//  │  Winit Event Loop        │    │  EventCollector      │
//  │   ├─ resumed/suspended ──┼──▶ │   ↓                  │
//  │   ├─ CloseRequested ─────┼──▶ │  GlobalSystems       │
//  │   └─ RedrawRequested     │    │   └─ situation tree  │
//  │        ↓                 │    │                      │
//  │      request_redraw()    │    └──────────────────────┘
//  └──────────────────────────┘
// ```
//
// Key Design Decisions:
// - **Lifecycle only**: the platform forwards suspend, resume and close;
//   situations never cross to this thread
// - **Graceful channel disconnect**: if the core thread dies, the platform
//   logs a warning and keeps running so the window can still be closed
// - **Main thread requirement**: Winit mandates main thread on macOS/iOS,
//   so this runs on the thread that called `Engine::run()`
//
//=========================================================================

//=== External Crates =====================================================

use crossbeam_channel::Sender;
use log::*;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

//=== Internal Imports ====================================================

use crate::core::platform_bridge::{PlatformError, PlatformEvent};

//=== WindowSettings ======================================================

/// Window parameters chosen through the engine builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: String::from("Aetheric Engine"),
            width: 800,
            height: 600,
        }
    }
}

//=== Platform ============================================================

/// Window manager and lifecycle event forwarder.
///
/// Runs on the main thread (Winit requirement on macOS/iOS) and reports
/// lifecycle changes to the core thread.
///
/// # Lifecycle
///
/// 1. **Construction**: `Platform::new(sender, settings)`
/// 2. **Execution**: `platform.run()` - runs the event loop until exit
/// 3. **Shutdown**: User closes window → sends `WindowClosed` → exits
///
/// # Thread Safety
///
/// This type is NOT Send/Sync - it must remain on the main thread.
pub(crate) struct Platform {
    /// OS window handle (None until `resumed()` called).
    window: Option<Window>,

    settings: WindowSettings,

    /// Channel to send events to core thread.
    event_sender: Sender<PlatformEvent>,
}

impl Platform {
    //--- Construction -----------------------------------------------------

    /// Does not create the window yet; that happens lazily in `resumed()`.
    pub fn new(event_sender: Sender<PlatformEvent>, settings: WindowSettings) -> Self {
        info!(target: "platform", "Platform subsystem initialized");
        Self {
            window: None,
            settings,
            event_sender,
        }
    }

    //--- Execution --------------------------------------------------------

    /// Runs the event loop until the window is closed.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the event loop cannot be created or
    /// fails while running.
    ///
    /// # Panics
    ///
    /// Panics if called off the main thread (macOS/iOS Winit requirement).
    pub fn run(mut self) -> Result<(), PlatformError> {
        debug!(target: "platform", "Starting Winit event loop");

        let event_loop =
            EventLoop::new().map_err(|e| PlatformError::EventLoopCreation(e.to_string()))?;

        event_loop
            .run_app(&mut self)
            .map_err(|e| PlatformError::EventLoopExecution(e.to_string()))
    }

    //--- Internal Helpers -------------------------------------------------

    /// Forwards `event` to the core thread. A disconnected channel is
    /// logged and otherwise ignored.
    fn send(&self, event: PlatformEvent) {
        if self.event_sender.send(event).is_err() {
            warn!(target: "platform", "Channel disconnected, dropping {:?}", event);
        }
    }

    fn window_attributes(&self) -> WindowAttributes {
        WindowAttributes::default()
            .with_title(self.settings.title.clone())
            .with_inner_size(LogicalSize::new(self.settings.width, self.settings.height))
    }

    //--- Test Accessors ---------------------------------------------------

    #[cfg(test)]
    pub(crate) fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }
}

//=== Winit Integration ===================================================

impl ApplicationHandler for Platform {
    /// Called on startup and on every mobile resume.
    ///
    /// Creates the window the first time; afterwards only reports the
    /// resume to the core thread.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            debug!(target: "platform", "Resumed with existing window");
            self.send(PlatformEvent::Resumed);
            return;
        }

        match event_loop.create_window(self.window_attributes()) {
            Ok(window) => {
                info!(
                    target: "platform",
                    "Window created: {}x{} @ {}x DPI",
                    window.inner_size().width,
                    window.inner_size().height,
                    window.scale_factor()
                );
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                error!(target: "platform", "Window creation failed: {}", e);
                self.send(PlatformEvent::WindowClosed);
                event_loop.exit();
            }
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        debug!(target: "platform", "Suspended");
        self.send(PlatformEvent::Suspended);
    }

    /// Handles per-window events.
    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!(target: "platform", "Window close requested");
                self.send(PlatformEvent::WindowClosed);
                event_loop.exit();
            }

            WindowEvent::RedrawRequested => {
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {
                // Ignore: Resized, Focused, input, etc.
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
