//=========================================================================
// Event Collector
//=========================================================================
//
// Platform event collector with bounded polling and shutdown detection.
//
// Architecture:
//   Receiver<PlatformEvent> → collect_frame() → paused flag → TickControl
//
// Bounded polling prevents starvation when the platform floods the
// channel. Pause state persists across frames until a resume arrives.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::PlatformEvent;

//=== TickControl =========================================================

/// Update loop control signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickControl {
    /// Run a tick.
    Continue,
    /// Skip the tick but keep pacing.
    Paused,
    /// Leave the loop.
    Exit,
}

//=== EventCollector ======================================================

/// Drains platform events once per tick.
pub(crate) struct EventCollector {
    receiver: Receiver<PlatformEvent>,
    paused: bool,
}

impl EventCollector {
    pub(crate) fn new(receiver: Receiver<PlatformEvent>) -> Self {
        Self {
            receiver,
            paused: false,
        }
    }

    /// Collects pending platform events (bounded to prevent starvation).
    pub(crate) fn collect_frame(&mut self) -> TickControl {
        const MAX_EVENTS_PER_FRAME: usize = 100;

        let mut drained = 0;
        while drained < MAX_EVENTS_PER_FRAME {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.handle_event(event) == TickControl::Exit {
                        return TickControl::Exit;
                    }
                    drained += 1;
                }
                Err(TryRecvError::Disconnected) => return TickControl::Exit,
                Err(TryRecvError::Empty) => break,
            }
        }

        if drained >= MAX_EVENTS_PER_FRAME {
            warn!(target: "platform", "Event queue backlog: drained {} events this frame", drained);
        }

        if self.paused {
            TickControl::Paused
        } else {
            TickControl::Continue
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    fn handle_event(&mut self, event: PlatformEvent) -> TickControl {
        match event {
            PlatformEvent::Suspended => {
                debug!(target: "platform", "Suspended; pausing ticks");
                self.paused = true;
                TickControl::Paused
            }
            PlatformEvent::Resumed => {
                debug!(target: "platform", "Resumed");
                self.paused = false;
                TickControl::Continue
            }
            PlatformEvent::WindowClosed => TickControl::Exit,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
