//=========================================================================
// Aetheric Engine
//
// Main entry point and coordinator for the situation runtime.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──run()──>  [Runtime]
//         │                          │
//         ├─ with_tps()              ├─ init(): queue setup on logic thread
//         ├─ with_channel_capacity() └─ run(): spawns logic thread,
//         ├─ with_title()                      runs platform,
//         └─ with_window_size()                blocks until exit
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info};

//=== Internal Dependencies ===============================================

use crate::core::globals::GlobalSystems;
use crate::core::platform_bridge::{PlatformError, PlatformEvent};
use crate::core::CoreSystemsOrchestrator;
use crate::platform::{Platform, WindowSettings};

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **TPS**: 60.0 (logic updates per second)
/// - **Channel capacity**: 128 events
/// - **Title**: "Aetheric Engine"
/// - **Window size**: 800×600
///
/// # Examples
///
/// ```no_run
/// use aetheric_situations::prelude::*;
///
/// struct Title;
/// impl Situation for Title {}
///
/// EngineBuilder::new()
///     .with_tps(120.0)
///     .with_title("Situations")
///     .build()
///     .init(|systems| {
///         let title = SituationHandle::new(Title);
///         systems.situations.transition(Some(&title), None, Vec::new());
///     })
///     .run()
///     .expect("platform failure");
/// ```
pub struct EngineBuilder {
    tps: f64,
    channel_capacity: usize,
    window: WindowSettings,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            tps: 60.0,
            channel_capacity: 128,
            window: WindowSettings::default(),
        }
    }

    /// Sets the target ticks per second for the logic thread.
    ///
    /// Every tick advances in-flight transitions by one step, so this is
    /// also the resolution of transition timing.
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn with_tps(mut self, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        self.tps = tps;
        self
    }

    /// Sets the channel capacity for platform → core communication.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    /// Sets the window title.
    ///
    /// Default: "Aetheric Engine"
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.window.title = title.into();
        self
    }

    /// Sets the initial logical window size.
    ///
    /// Default: 800×600
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "Window size must be non-zero, got {}x{}", width, height);
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Builds the engine instance.
    pub fn build(self) -> Engine {
        info!(
            "Building engine (TPS: {}, channel: {}, window: {}x{})",
            self.tps, self.channel_capacity, self.window.width, self.window.height
        );

        Engine {
            orchestrator: CoreSystemsOrchestrator::new(),
            tps: self.tps,
            channel_capacity: self.channel_capacity,
            window: self.window,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Aetheric situation runtime.
///
/// # Architecture
///
/// ```text
/// Engine (Main Thread)
///   ├─► CoreSystemsOrchestrator (Logic Thread @ TPS)
///   │     └─► GlobalSystems → root SituationContainer
///   │
///   └─► Platform (Event Loop)
///         └─► Window, lifecycle events
///
/// Communication: crossbeam channel (PlatformEvent)
/// ```
pub struct Engine {
    orchestrator: CoreSystemsOrchestrator,
    tps: f64,
    channel_capacity: usize,
    window: WindowSettings,
}

impl Engine {
    //--- Initialization ---------------------------------------------------

    /// Queues initialization of the situation tree.
    ///
    /// `init_fn` runs on the logic thread before the first tick, so
    /// situations are created on the thread they live on. May be called
    /// several times; callbacks run in order.
    pub fn init<F>(mut self, init_fn: F) -> Self
    where
        F: FnOnce(&mut GlobalSystems) + Send + 'static,
    {
        self.orchestrator.init_systems(init_fn);
        info!("Queued engine initialization ({} pending)", self.orchestrator.pending_inits());
        self
    }

    //--- Execution --------------------------------------------------------

    /// Starts the engine runtime and blocks until the application exits.
    ///
    /// # Lifecycle
    ///
    /// 1. Creates the channel for platform → core communication
    /// 2. Spawns the logic thread running at configured TPS
    /// 3. Runs the platform event loop (blocks here)
    /// 4. On window close: platform exits → logic thread releases the
    ///    situation tree and terminates
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the event loop fails. The logic thread
    /// is still joined before returning.
    pub fn run(self) -> Result<(), PlatformError> {
        info!("Starting engine runtime (TPS: {})", self.tps);

        //--- 1. Create communication channel -----------------------------
        let (tx, rx): (Sender<PlatformEvent>, Receiver<PlatformEvent>) =
            bounded(self.channel_capacity);

        //--- 2. Spawn the core logic thread -------------------------------
        let core_handle = self.orchestrator.spawn_core_thread(rx, self.tps);
        info!("Core logic thread spawned");

        //--- 3. Launch the platform subsystem -----------------------------
        let platform = Platform::new(tx, self.window);
        let result = platform.run();
        if let Err(e) = &result {
            error!("Platform error: {}", e);
        }

        info!("Platform event loop exited");

        //--- 4. Cleanup: Wait for logic thread to terminate --------------
        // The platform (and its sender) is gone, so the collector sees a
        // disconnect even if no close event was sent.
        match core_handle.join() {
            Ok(()) => info!("Core thread terminated cleanly"),
            Err(e) => error!("Core thread panicked: {:?}", e),
        }

        info!("Engine shutdown complete");
        result
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
