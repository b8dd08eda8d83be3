//! Tick-driven timer scheduler.
//!
//! The host advances the scheduler once per frame with [`TimerScheduler::update`];
//! every timer whose fire time has been reached runs in `(expire_at, order)`
//! order during that call.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use socket_session::{Repeat, TimerScheduler};
//!
//! let scheduler = TimerScheduler::new();
//! let fired = Rc::new(Cell::new(0));
//!
//! let counter = Rc::clone(&fired);
//! scheduler
//!     .start(move || { counter.set(counter.get() + 1); Ok(()) }, 1.0, Repeat::Times(3))
//!     .unwrap();
//!
//! for _ in 0..4 {
//!     scheduler.update(1.0);
//! }
//! assert_eq!(fired.get(), 3);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::TimerId;

use super::queue::{TimerKey, TimerQueue};

// ============================================================================
// Constants
// ============================================================================

/// Insertion-order counter wraps back to zero past this value.
///
/// After a wrap, two live timers may share an order value; ties between them
/// then fall back to expire-time comparison only.
pub const MAX_ORDER_INDEX: u32 = 1_000_000;

/// Default initial capacity of the timer queue.
pub const DEFAULT_CAPACITY: usize = 1024;

// ============================================================================
// Types
// ============================================================================

/// Timer callback.
///
/// An `Err` is logged and does not stop other timers from firing.
pub type TimerCallback = Box<dyn FnMut() -> Result<()>>;

// ============================================================================
// Repeat
// ============================================================================

/// How many times a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    /// Fire once, then remove.
    #[default]
    Once,
    /// Fire exactly `n` times, then remove.
    Times(u32),
    /// Fire every interval until stopped.
    Forever,
}

impl Repeat {
    /// Maps a numeric repeat count: `0` once, `n > 0` n times, negative forever.
    #[inline]
    #[must_use]
    pub fn from_count(count: i32) -> Self {
        match count {
            c if c < 0 => Self::Forever,
            0 => Self::Once,
            n => Self::Times(n.unsigned_abs()),
        }
    }
}

// ============================================================================
// TimerNode
// ============================================================================

struct TimerNode {
    interval: f64,
    expire_at: f64,
    repeat: Repeat,
    current_count: u32,
    order: u32,
    paused: bool,
    remaining_on_pause: f64,
    /// Taken out while the callback runs.
    callback: Option<TimerCallback>,
}

impl TimerNode {
    #[inline]
    fn key(&self) -> TimerKey {
        TimerKey {
            expire_at: self.expire_at,
            order: self.order,
        }
    }

    /// Records one fire. Returns `true` if the timer must be re-armed.
    fn advance(&mut self) -> bool {
        match self.repeat {
            Repeat::Once => false,
            Repeat::Forever => true,
            Repeat::Times(n) => {
                self.current_count = self.current_count.saturating_add(1);
                self.current_count < n
            }
        }
    }
}

// ============================================================================
// SchedulerState
// ============================================================================

struct SchedulerState {
    now: f64,
    order_counter: u32,
    queue: TimerQueue,
    running: FxHashMap<TimerId, TimerNode>,
    paused: FxHashMap<TimerId, TimerNode>,
}

impl SchedulerState {
    fn next_order(&mut self) -> u32 {
        if self.order_counter >= MAX_ORDER_INDEX {
            self.order_counter = 0;
        }
        self.order_counter += 1;
        self.order_counter
    }

    /// Takes the callback of the next due timer out of its node.
    fn pop_due(&mut self) -> Option<(TimerId, Option<TimerCallback>)> {
        let (id, key) = self.queue.peek()?;
        if key.expire_at > self.now {
            return None;
        }
        self.queue.pop();
        let callback = self
            .running
            .get_mut(&id)
            .and_then(|node| node.callback.take());
        Some((id, callback))
    }

    /// Hands the callback back and re-arms or removes the timer.
    ///
    /// The callback may have stopped or paused its own timer; a stopped
    /// timer is gone from both indexes and its callback is dropped here.
    fn finish_fire(&mut self, id: TimerId, callback: Option<TimerCallback>) {
        let now = self.now;

        if let Some(node) = self.running.get_mut(&id) {
            node.callback = callback;
            if node.advance() {
                node.expire_at = now + node.interval;
                let key = node.key();
                self.queue.push(id, key);
            } else {
                self.running.remove(&id);
                trace!(timer_id = %id, "Timer exhausted");
            }
        } else if let Some(node) = self.paused.get_mut(&id) {
            node.callback = callback;
            if node.advance() {
                node.remaining_on_pause = node.interval;
            } else {
                self.paused.remove(&id);
            }
        }
    }
}

// ============================================================================
// TimerScheduler
// ============================================================================

/// Ordered callback execution against an internally advanced clock.
///
/// `TimerScheduler` is a cheap handle: clones share the same timers.
/// Callbacks may call back into the scheduler, including on their own timer.
///
/// # Thread Safety
///
/// Single-threaded by design; the handle is neither `Send` nor `Sync`.
#[derive(Clone)]
pub struct TimerScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TimerScheduler")
            .field("now", &state.now)
            .field("queued", &state.queue.len())
            .field("running", &state.running.len())
            .field("paused", &state.paused.len())
            .finish()
    }
}

// ============================================================================
// TimerScheduler - Constructor
// ============================================================================

impl TimerScheduler {
    /// Creates a scheduler with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a scheduler with room for `capacity` timers before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut running = FxHashMap::default();
        running.reserve(capacity);

        Self {
            state: Rc::new(RefCell::new(SchedulerState {
                now: 0.0,
                order_counter: 0,
                queue: TimerQueue::with_capacity(capacity),
                running,
                paused: FxHashMap::default(),
            })),
        }
    }
}

// ============================================================================
// TimerScheduler - Public API
// ============================================================================

impl TimerScheduler {
    /// Starts a timer that first fires `interval` seconds from now.
    ///
    /// # Arguments
    ///
    /// * `callback` - Invoked on every fire
    /// * `interval` - Seconds between fires, must be positive
    /// * `repeat` - How many times to fire
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `interval` is not a positive,
    /// finite number. Nothing is registered in that case.
    pub fn start<F>(&self, callback: F, interval: f64, repeat: Repeat) -> Result<TimerId>
    where
        F: FnMut() -> Result<()> + 'static,
    {
        if !interval.is_finite() || interval <= 0.0 {
            warn!(interval, "Timer start rejected: interval must be positive");
            return Err(Error::invalid_argument(format!(
                "timer interval must be positive, got {interval}"
            )));
        }

        let mut state = self.state.borrow_mut();
        let id = TimerId::next();
        let order = state.next_order();
        let node = TimerNode {
            interval,
            expire_at: state.now + interval,
            repeat,
            current_count: 0,
            order,
            paused: false,
            remaining_on_pause: 0.0,
            callback: Some(Box::new(callback)),
        };

        state.queue.push(id, node.key());
        state.running.insert(id, node);

        trace!(timer_id = %id, interval, ?repeat, "Timer started");
        Ok(id)
    }

    /// Stops a running or paused timer.
    ///
    /// Returns `false` if the id is unknown.
    pub fn stop(&self, id: TimerId) -> bool {
        let mut state = self.state.borrow_mut();

        if state.running.remove(&id).is_some() {
            state.queue.remove(id);
            return true;
        }
        state.paused.remove(&id).is_some()
    }

    /// Pauses a running timer, keeping the time left until its next fire.
    ///
    /// Returns `false` if the timer is not running.
    pub fn pause(&self, id: TimerId) -> bool {
        let mut state = self.state.borrow_mut();
        let now = state.now;

        let Some(mut node) = state.running.remove(&id) else {
            return false;
        };
        state.queue.remove(id);
        node.paused = true;
        node.remaining_on_pause = node.expire_at - now;
        state.paused.insert(id, node);
        true
    }

    /// Resumes a paused timer with the time it had left when paused.
    ///
    /// Returns `false` if the timer is not paused.
    pub fn resume(&self, id: TimerId) -> bool {
        let mut state = self.state.borrow_mut();
        let now = state.now;

        let Some(mut node) = state.paused.remove(&id) else {
            return false;
        };
        node.paused = false;
        node.expire_at = now + node.remaining_on_pause;
        state.queue.push(id, node.key());
        state.running.insert(id, node);
        true
    }

    /// Advances the clock by `dt` seconds and fires every due timer.
    ///
    /// Timers fire in `(expire_at, order)` order. A failing callback is
    /// logged and the loop continues with the next due timer. A negative or
    /// non-finite `dt` is logged and ignored.
    pub fn update(&self, dt: f64) {
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "Ignoring invalid frame delta");
            return;
        }
        self.state.borrow_mut().now += dt;

        loop {
            // The borrow is released before the callback runs.
            let Some((id, mut callback)) = self.state.borrow_mut().pop_due() else {
                break;
            };

            if let Some(callback) = callback.as_mut()
                && let Err(e) = callback()
            {
                error!(timer_id = %id, error = %e, "Timer callback failed");
            }

            self.state.borrow_mut().finish_fire(id, callback);
        }
    }

    /// Drops every timer and resets the insertion-order counter.
    ///
    /// Timer ids are never reused after a clear.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.queue.clear();
        state.running.clear();
        state.paused.clear();
        state.order_counter = 0;
    }
}

// ============================================================================
// TimerScheduler - Introspection
// ============================================================================

impl TimerScheduler {
    /// Returns the scheduler clock, in seconds.
    #[inline]
    #[must_use]
    pub fn now(&self) -> f64 {
        self.state.borrow().now
    }

    /// Returns the number of running and paused timers.
    #[inline]
    #[must_use]
    pub fn timer_count(&self) -> usize {
        let state = self.state.borrow();
        state.running.len() + state.paused.len()
    }

    /// Returns `true` if the timer is running.
    #[inline]
    #[must_use]
    pub fn is_running(&self, id: TimerId) -> bool {
        self.state.borrow().running.contains_key(&id)
    }

    /// Returns `true` if the timer is paused.
    #[inline]
    #[must_use]
    pub fn is_paused(&self, id: TimerId) -> bool {
        self.state
            .borrow()
            .paused
            .get(&id)
            .is_some_and(|node| node.paused)
    }

    /// Returns the seconds left until the timer next fires.
    ///
    /// For a paused timer this is the time it will have once resumed.
    #[must_use]
    pub fn remaining(&self, id: TimerId) -> Option<f64> {
        let state = self.state.borrow();
        if let Some(node) = state.running.get(&id) {
            return Some(node.expire_at - state.now);
        }
        state.paused.get(&id).map(|node| node.remaining_on_pause)
    }

    /// Returns the id of the next timer due to fire.
    #[inline]
    #[must_use]
    pub fn next_due(&self) -> Option<TimerId> {
        self.state.borrow().queue.peek().map(|(id, _)| id)
    }
}

// ============================================================================
// Tests
// ============================================================================
