//=========================================================================
// Core Systems Orchestrator
//
// Central coordinator for the situation tree running on the logic
// (non-platform) thread.
//
// Responsibilities:
// - Build `GlobalSystems` on the logic thread and run user init callbacks
// - Receive and process platform events via crossbeam channel
// - Maintain deterministic pacing using a fixed tick rate (TPS)
// - Shut the situation tree down when the platform goes away
//
// Notes:
// The situation tree is single-threaded (`Rc`-based) and never leaves
// the logic thread. Only `Send` init callbacks and platform events cross
// the thread boundary.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::thread;
use std::time::{Duration, Instant};

//=== External Crates =====================================================

use crossbeam_channel::Receiver;
use log::{debug, info};

//=== Internal Modules ====================================================

pub mod coroutine;
pub mod globals;
pub(crate) mod platform_bridge;
pub mod scope;
pub mod services;
pub mod situation;

use globals::GlobalSystems;
use platform_bridge::{EventCollector, PlatformEvent, TickControl};

//=== CoreSystemsOrchestrator =============================================

type InitFn = Box<dyn FnOnce(&mut GlobalSystems) + Send>;

/// Owns the pending init callbacks and spawns the logic thread.
#[derive(Default)]
pub(crate) struct CoreSystemsOrchestrator {
    init_fns: Vec<InitFn>,
}

impl CoreSystemsOrchestrator {
    //--- Construction -----------------------------------------------------

    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `init_fn` to run on the logic thread before the first tick.
    pub fn init_systems<F>(&mut self, init_fn: F)
    where
        F: FnOnce(&mut GlobalSystems) + Send + 'static,
    {
        self.init_fns.push(Box::new(init_fn));
    }

    pub fn pending_inits(&self) -> usize {
        self.init_fns.len()
    }

    //--- spawn_core_thread() ---------------------------------------------
    //
    // Spawns the logic thread ticking the situation tree at a fixed
    // frequency (TPS - ticks per second).
    //
    // Each tick:
    //  1. Collects platform events (pause / resume / exit)
    //  2. Updates the situation tree unless paused
    //  3. Sleeps to maintain fixed pacing
    //  4. Exits cleanly and releases every situation on shutdown
    //
    pub fn spawn_core_thread(
        self,
        receiver: Receiver<PlatformEvent>,
        tps: f64,
    ) -> thread::JoinHandle<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / tps);

        thread::spawn(move || {
            let mut systems = GlobalSystems::new();
            for init_fn in self.init_fns {
                init_fn(&mut systems);
            }
            debug!("Logic thread initialized with {} root situations", systems.situations.len());

            let mut collector = EventCollector::new(receiver);

            loop {
                let frame_start = Instant::now();

                //--- Step 1: Gather platform events ------------------------
                match collector.collect_frame() {
                    TickControl::Exit => {
                        info!("Core thread exiting.");
                        break;
                    }
                    TickControl::Paused => {}

                    //--- Step 2: Update the situation tree -----------------
                    TickControl::Continue => systems.update(),
                }

                //--- Step 3: Maintain deterministic pacing ----------------
                let elapsed = frame_start.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
            }

            systems.shutdown();
        })
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
