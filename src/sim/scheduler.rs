//! Virtual-time timer scheduler
//!
//! Delayed work is queued as plain task values keyed by fire time, never as
//! closures. Tasks fire in `(fire time, scheduling order)` order, one at a
//! time, on the caller's timeline. Time only moves when the owner advances it.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Simulation clock reading in whole milliseconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VirtualTime(u64);

impl VirtualTime {
    pub const ZERO: VirtualTime = VirtualTime(0);

    #[inline]
    pub fn from_millis(ms: u64) -> Self {
        VirtualTime(ms)
    }

    #[inline]
    pub fn millis(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f32(self) -> f32 {
        self.0 as f32 / 1000.0
    }

    /// `self` plus `ms`, saturating
    #[inline]
    pub fn plus(self, ms: u64) -> Self {
        VirtualTime(self.0.saturating_add(ms))
    }

    /// Milliseconds from `earlier` to `self` (0 if `earlier` is later)
    #[inline]
    pub fn since(self, earlier: VirtualTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T+{}ms", self.0)
    }
}

/// Seconds to whole milliseconds; negative and NaN delays become 0
pub fn secs_to_millis(secs: f32) -> u64 {
    if secs.is_nan() || secs <= 0.0 {
        0
    } else {
        (secs as f64 * 1000.0).round() as u64
    }
}

/// Identifies one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// A timer that has come due
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub handle: TimerHandle,
    pub at: VirtualTime,
    pub task: T,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    fire_at: VirtualTime,
    handle: TimerHandle,
    task: T,
}

// Reversed so the max-heap pops the earliest (time, handle) first.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.fire_at, other.handle).cmp(&(self.fire_at, self.handle))
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for Entry<T> {}

/// Deterministic timer queue over a virtual clock
#[derive(Debug, Clone)]
pub struct TimerScheduler<T> {
    now: VirtualTime,
    queue: BinaryHeap<Entry<T>>,
    /// Live timers and their fire times; cancelled entries stay in the heap
    /// and are skipped when popped.
    live: HashMap<TimerHandle, VirtualTime>,
    next_handle: u64,
}

impl<T> Default for TimerScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerScheduler<T> {
    pub fn new() -> Self {
        Self {
            now: VirtualTime::ZERO,
            queue: BinaryHeap::new(),
            live: HashMap::new(),
            next_handle: 1,
        }
    }

    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Run `task` once `delay_ms` of virtual time has passed
    pub fn schedule(&mut self, delay_ms: u64, task: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let fire_at = self.now.plus(delay_ms);
        self.queue.push(Entry {
            fire_at,
            handle,
            task,
        });
        self.live.insert(handle, fire_at);
        log::trace!("scheduled {handle} at {fire_at}");
        handle
    }

    /// Stop a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let cancelled = self.live.remove(&handle).is_some();
        if cancelled {
            log::trace!("cancelled {handle}");
        }
        cancelled
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Milliseconds until `handle` fires, if still pending
    pub fn remaining(&self, handle: TimerHandle) -> Option<u64> {
        self.live.get(&handle).map(|at| at.since(self.now))
    }

    /// Fire time of the earliest live timer
    pub fn next_fire_time(&mut self) -> Option<VirtualTime> {
        self.discard_cancelled();
        self.queue.peek().map(|e| e.fire_at)
    }

    /// Pop the earliest live timer due at or before `until`, moving the clock
    /// to its fire time.
    pub fn pop_due(&mut self, until: VirtualTime) -> Option<Fired<T>> {
        self.discard_cancelled();
        if self.queue.peek()?.fire_at > until {
            return None;
        }
        let entry = self.queue.pop()?;
        self.live.remove(&entry.handle);
        self.now = self.now.max(entry.fire_at);
        log::trace!("fired {} at {}", entry.handle, entry.fire_at);
        Some(Fired {
            handle: entry.handle,
            at: entry.fire_at,
            task: entry.task,
        })
    }

    /// Move the clock forward (never backward)
    pub fn advance_clock(&mut self, to: VirtualTime) {
        self.now = self.now.max(to);
    }

    /// Number of live timers
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Drop every pending timer; the clock keeps its reading
    pub fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.queue.peek() {
            if self.live.contains_key(&top.handle) {
                break;
            }
            self.queue.pop();
        }
    }
}
