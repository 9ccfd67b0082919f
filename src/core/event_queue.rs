//! Purpose: In-process event queue with a blocking wait that a break event can release.
//! Exports: `EventQueue`, `WaitOutcome`, `BREAK_DISCRIMINATOR`.
//! Role: Sink for events delivered across the boundary; `api::event_queue` serves it as the
//!       EventQueue module so callers use the ordinary Executor contract.
//! Invariants: Events come out in push order; each is delivered to exactly one waiter.
//! Invariants: `emit_break` enqueues a `core$LibBreakEvent`; it never drops queued events.
//! Notes: A poisoned lock is recovered; queued values stay valid after a panicking pusher.
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::core::registry::TYPE_KEY;
use crate::core::value::DynamicValue;

pub const BREAK_DISCRIMINATOR: &str = "core$LibBreakEvent";
const BREAK_CHANNEL: &str = "channel/lib_break";

#[derive(Clone, Debug, PartialEq)]
pub enum WaitOutcome {
    Event(DynamicValue),
    TimedOut,
}

#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<VecDeque<DynamicValue>>,
    ready: Condvar,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: DynamicValue) {
        let mut events = self.lock();
        events.push_back(event);
        trace!(queued = events.len(), "event queued");
        drop(events);
        self.ready.notify_one();
    }

    /// Blocks until an event is available.
    pub fn wait_event(&self) -> DynamicValue {
        let mut events = self.lock();
        loop {
            if let Some(event) = events.pop_front() {
                return event;
            }
            events = self
                .ready
                .wait(events)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn wait_event_timeout(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut events = self.lock();
        loop {
            if let Some(event) = events.pop_front() {
                return WaitOutcome::Event(event);
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::TimedOut;
            }
            events = self
                .ready
                .wait_timeout(events, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Non-blocking poll.
    pub fn get_event(&self) -> Option<DynamicValue> {
        self.lock().pop_front()
    }

    /// Releases one blocked (or the next) `wait_event` with a break event.
    pub fn emit_break(&self) {
        debug!("emitting break event");
        self.push(break_event());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DynamicValue>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The tagged break sentinel, in the same shape every other event uses.
fn break_event() -> DynamicValue {
    DynamicValue::Object(vec![
        (TYPE_KEY.to_string(), DynamicValue::string(BREAK_DISCRIMINATOR)),
        ("type".to_string(), DynamicValue::string("libBreak")),
        ("channel".to_string(), DynamicValue::string(BREAK_CHANNEL)),
        ("connectionId".to_string(), DynamicValue::Int64(-1)),
    ])
}
