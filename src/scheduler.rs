//! Timed event scheduler (§4.1): a priority-ordered queue of future triggers
//! shared between producer threads and the external driver loop.
//!
//! The queue is a min-heap on `when`. `add`/`clear` notify blocked waiters
//! and, when the earliest deadline changes, fire the wakeup callback on a
//! freshly spawned thread — never while holding the scheduler's own mutex,
//! so a wakeup (or a trigger) that re-enters the scheduler can't deadlock.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::running::RunningFlag;
use crate::time::{Clock, Timestamp};

/// How often `wait_next` re-checks the running flag while the queue is empty.
/// Flipping the flag doesn't itself notify the condvar (§5), so this bounds
/// the window between shutdown and the waiter noticing.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A pending trigger paired with the instant it becomes due.
pub struct ScheduledEvent {
    when: Timestamp,
    trigger: Box<dyn FnOnce() + Send>,
}

impl ScheduledEvent {
    pub fn new(when: Timestamp, trigger: impl FnOnce() + Send + 'static) -> Self {
        ScheduledEvent {
            when,
            trigger: Box::new(trigger),
        }
    }

    pub fn when(&self) -> Timestamp {
        self.when
    }

    /// Invoke the trigger. Consumes the event — delivery has already
    /// completed by the time a caller holds it, so a panic here is the
    /// caller's concern, not the scheduler's (§4.1 failure semantics).
    pub fn fire(self) {
        (self.trigger)()
    }
}

/// Heap entry ordered solely by `when`, inverted so `BinaryHeap` (a max-heap)
/// behaves as a min-heap. Ties are broken arbitrarily — two events with equal
/// `when` are unordered with respect to each other (§3 I1).
struct HeapEntry(ScheduledEvent);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.when == other.0.when
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.when.cmp(&self.0.when)
    }
}

type Wakeup = Arc<dyn Fn() + Send + Sync>;

struct Inner {
    heap: BinaryHeap<HeapEntry>,
    wakeup: Option<Wakeup>,
}

/// Process-scoped priority queue of `ScheduledEvent`s (§3 Lifecycle).
pub struct Scheduler {
    inner: Mutex<Inner>,
    condvar: Condvar,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Scheduler {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                wakeup: None,
            }),
            condvar: Condvar::new(),
            clock,
        }
    }

    /// Insert an event. Fires the wakeup (out of lock, on its own thread) and
    /// notifies waiters if this event is now the earliest; otherwise still
    /// notifies waiters so they can re-evaluate their predicate.
    pub fn add(&self, event: ScheduledEvent) {
        let is_new_min = {
            let mut inner = self.inner.lock();
            let is_new_min = match inner.heap.peek() {
                None => true,
                Some(top) => event.when < top.0.when,
            };
            inner.heap.push(HeapEntry(event));
            is_new_min
        };
        self.condvar.notify_all();
        if is_new_min {
            self.spawn_wakeup();
        }
    }

    /// Drain the queue. Fires the wakeup and notifies waiters using the same
    /// out-of-lock discipline as `add`, but only if the queue was non-empty.
    pub fn clear(&self) {
        let had_events = {
            let mut inner = self.inner.lock();
            let had_events = !inner.heap.is_empty();
            inner.heap.clear();
            had_events
        };
        self.condvar.notify_all();
        if had_events {
            self.spawn_wakeup();
        }
    }

    /// A copy of the minimum's `when`, or `None` if the queue is empty.
    pub fn peek_next_time(&self) -> Option<Timestamp> {
        self.inner.lock().heap.peek().map(|e| e.0.when)
    }

    /// Install or replace the wakeup callback. Serialized with `add`/`clear`
    /// via the same mutex, so an install is never interleaved with a fire.
    pub fn set_wakeup<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        inner.wakeup = Some(Arc::new(callback));
    }

    /// Block until an event is due, the running flag drops, or a new earlier
    /// event preempts the current wait. Time comparisons use the injected
    /// clock's local wall-clock, re-sampled on every wake-up.
    pub fn wait_next(&self, running: &RunningFlag) -> Option<ScheduledEvent> {
        let mut inner = self.inner.lock();
        loop {
            if !running.is_running() {
                return None;
            }
            let now = self.clock.now();
            match inner.heap.peek() {
                Some(top) if top.0.when <= now => {
                    return inner.heap.pop().map(|e| e.0);
                }
                Some(top) => {
                    // Capped at `IDLE_POLL_INTERVAL` even when the next event
                    // is far out, so a `running` flip with no concurrent
                    // `add`/`clear` to notify us is still noticed promptly
                    // (§5: flipping the flag "must cause ... `wait_next`
                    // calls to return ... promptly").
                    let wait_for = top.0.when.saturating_duration_since(now).min(IDLE_POLL_INTERVAL);
                    self.condvar.wait_for(&mut inner, wait_for);
                }
                None => {
                    self.condvar.wait_for(&mut inner, IDLE_POLL_INTERVAL);
                }
            }
        }
    }

    /// Non-blocking version of `wait_next`: pop the due event if one exists,
    /// otherwise return immediately.
    pub fn poll_next(&self, running: &RunningFlag) -> Option<ScheduledEvent> {
        if !running.is_running() {
            return None;
        }
        let mut inner = self.inner.lock();
        match inner.heap.peek() {
            Some(top) if top.0.when <= self.clock.now() => inner.heap.pop().map(|e| e.0),
            _ => None,
        }
    }

    fn spawn_wakeup(&self) {
        let wakeup = self.inner.lock().wakeup.clone();
        if let Some(cb) = wakeup {
            std::thread::spawn(move || cb());
        }
    }
}
