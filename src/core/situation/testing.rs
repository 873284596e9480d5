//=========================================================================
// Test Support
//=========================================================================
//
// Recording situation and effect used by the situation tests.
//
// `Probe` logs every lifecycle hook as "{name}:{hook}" and every scope
// expiry as "{name}:{scope}_scope". Per-tick hooks are counted separately
// so ordering assertions are not drowned in update noise.
//
//=========================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures_util::FutureExt;

use super::transition::{Transition, TransitionEffect, TransitionHandle};
use super::{Situation, SituationContainer, SituationContext, SituationHandle};
use crate::core::coroutine::{wait_ticks, Routine};

//=== EventLog ============================================================

#[derive(Clone, Default)]
pub(crate) struct EventLog {
    entries: Rc<RefCell<Vec<String>>>,
    ticks: Rc<RefCell<HashMap<String, u32>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Returns and clears the recorded entries. Tick counts are kept.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.borrow().iter().any(|e| e == entry)
    }

    pub fn assert_before(&self, first: &str, second: &str) {
        let entries = self.entries.borrow();
        let find = |needle: &str| {
            entries
                .iter()
                .position(|e| e == needle)
                .unwrap_or_else(|| panic!("{needle:?} not logged in {entries:?}"))
        };
        assert!(
            find(first) < find(second),
            "expected {first:?} before {second:?} in {entries:?}"
        );
    }

    pub fn ticks(&self, name: &str) -> u32 {
        self.count(name)
    }

    pub fn late_ticks(&self, name: &str) -> u32 {
        self.count(&format!("{name}:late"))
    }

    fn count(&self, key: &str) -> u32 {
        self.ticks.borrow().get(key).copied().unwrap_or(0)
    }

    fn bump(&self, key: String) {
        *self.ticks.borrow_mut().entry(key).or_default() += 1;
    }
}

//=== Probe ===============================================================

/// Recording situation. `KIND` gives otherwise identical probes distinct
/// types, since a stack holds one entry per type.
pub(crate) struct Probe<const KIND: u8 = 0> {
    name: &'static str,
    log: EventLog,
    load_ticks: u32,
    open_ticks: u32,
    close_ticks: u32,
    allow: Rc<Cell<bool>>,
}

pub(crate) fn probe(name: &'static str, log: &EventLog) -> Probe {
    Probe::new(name, log)
}

impl<const KIND: u8> Probe<KIND> {
    pub fn new(name: &'static str, log: &EventLog) -> Self {
        Self {
            name,
            log: log.clone(),
            load_ticks: 0,
            open_ticks: 0,
            close_ticks: 0,
            allow: Rc::new(Cell::new(true)),
        }
    }

    pub fn load_ticks(mut self, ticks: u32) -> Self {
        self.load_ticks = ticks;
        self
    }

    pub fn open_ticks(mut self, ticks: u32) -> Self {
        self.open_ticks = ticks;
        self
    }

    pub fn close_ticks(mut self, ticks: u32) -> Self {
        self.close_ticks = ticks;
        self
    }

    /// `can_transition` answers with the current value of `allow`.
    pub fn gate(mut self, allow: &Rc<Cell<bool>>) -> Self {
        self.allow = allow.clone();
        self
    }

    pub fn spawn(self) -> SituationHandle {
        SituationHandle::new(self)
    }

    fn record(&self, hook: &str) {
        self.log.push(format!("{}:{}", self.name, hook));
    }

    fn record_expiry(&self, scope: &crate::core::scope::Scope, label: &str) {
        let log = self.log.clone();
        let entry = format!("{}:{}", self.name, label);
        scope.on_expired(move || log.push(entry));
    }

    fn timed(&self, ticks: u32, finished: &str) -> Routine {
        let log = self.log.clone();
        let entry = format!("{}:{}", self.name, finished);
        async move {
            wait_ticks(ticks).await;
            log.push(entry);
        }
        .boxed_local()
    }
}

impl<const KIND: u8> Situation for Probe<KIND> {
    fn on_standby(&self, _cx: &SituationContext<'_>) {
        self.record("standby");
    }

    fn load_routine(&self, cx: &SituationContext<'_>) -> Routine {
        self.record("load");
        self.record_expiry(cx.load_scope(), "load_scope");
        self.timed(self.load_ticks, "loaded")
    }

    fn on_setup(&self, cx: &SituationContext<'_>) {
        self.record("setup");
        self.record_expiry(cx.setup_scope(), "setup_scope");
    }

    fn open_routine(&self, cx: &SituationContext<'_>) -> Routine {
        self.record("open");
        self.record_expiry(cx.animation_scope(), "open_scope");
        self.timed(self.open_ticks, "opened")
    }

    fn on_update(&self, _cx: &SituationContext<'_>) {
        self.log.bump(self.name.to_string());
    }

    fn on_late_update(&self, _cx: &SituationContext<'_>) {
        self.log.bump(format!("{}:late", self.name));
    }

    fn close_routine(&self, cx: &SituationContext<'_>) -> Routine {
        self.record("close");
        self.record_expiry(cx.animation_scope(), "close_scope");
        self.timed(self.close_ticks, "closed")
    }

    fn on_cleanup(&self, _cx: &SituationContext<'_>) {
        self.record("cleanup");
    }

    fn on_unload(&self, _cx: &SituationContext<'_>) {
        self.record("unload");
    }

    fn on_release(&self, _cx: &SituationContext<'_>) {
        self.record("release");
    }

    fn can_transition(&self, _next: &SituationHandle, _transition: &dyn Transition) -> bool {
        self.allow.get()
    }
}

//=== RecordingEffect =====================================================

/// Effect logging "{name}:enter/entered/exit/exited" from inside its
/// routines and counting `update` calls.
pub(crate) struct RecordingEffect {
    name: &'static str,
    log: EventLog,
    enter_ticks: u32,
    exit_ticks: u32,
    updates: Rc<Cell<u32>>,
}

impl RecordingEffect {
    pub fn new(name: &'static str, log: &EventLog) -> Self {
        Self {
            name,
            log: log.clone(),
            enter_ticks: 0,
            exit_ticks: 0,
            updates: Rc::default(),
        }
    }

    pub fn enter_ticks(mut self, ticks: u32) -> Self {
        self.enter_ticks = ticks;
        self
    }

    pub fn exit_ticks(mut self, ticks: u32) -> Self {
        self.exit_ticks = ticks;
        self
    }

    pub fn updates(&self) -> Rc<Cell<u32>> {
        self.updates.clone()
    }

    fn phase(&self, start: &str, end: &str, ticks: u32) -> Routine {
        let log = self.log.clone();
        let start = format!("{}:{}", self.name, start);
        let end = format!("{}:{}", self.name, end);
        async move {
            log.push(start);
            wait_ticks(ticks).await;
            log.push(end);
        }
        .boxed_local()
    }
}

impl TransitionEffect for RecordingEffect {
    fn enter_routine(&mut self) -> Routine {
        self.phase("enter", "entered", self.enter_ticks)
    }

    fn update(&mut self) {
        self.updates.set(self.updates.get() + 1);
    }

    fn exit_routine(&mut self) -> Routine {
        self.phase("exit", "exited", self.exit_ticks)
    }
}

//=== Tick Helpers ========================================================

/// One full tick: update then late update.
pub(crate) fn tick(container: &SituationContainer) {
    container.update();
    container.late_update();
}

/// Ticks until `handle` is done. Returns the number of ticks taken.
pub(crate) fn settle(container: &SituationContainer, handle: &TransitionHandle) -> u32 {
    let mut ticks = 0;
    while !handle.is_done() {
        tick(container);
        ticks += 1;
        assert!(ticks < 1_000, "transition never finished");
    }
    ticks
}
