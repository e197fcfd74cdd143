//! Host environment seam and a cooperative event loop.
//!
//! The widget never owns a thread or an OS timer. It asks the host, through
//! [`HostRuntime`], for the current time, for a periodic interval that drives
//! the simulation tick, and for keyboard/resize listener registrations. Every
//! registration comes back as an id that the widget must hand back when it
//! switches authority or tears down, so nothing the host holds can outlive
//! the widget.
//!
//! [`EventLoop`] is a single-threaded implementation of that seam: hosts poll
//! it for due timers and ask it whether a listener kind is still registered
//! before dispatching input. Handlers run to completion between polls.

use core::time::Duration;

use heapless::Vec;

use crate::error::{TankError, TankResult};
use crate::sample::TimestampMillis;

/// Identifier returned for an interval registration.
pub type TimerId = u32;
/// Identifier returned for a listener registration.
pub type ListenerId = u32;

/// Event sources a widget may subscribe to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ListenerKind {
    Keyboard,
    Resize,
}

/// Wall-clock source in milliseconds.
pub trait Clock {
    fn now_millis(&self) -> TimestampMillis;
}

/// Services the host environment provides to a widget.
pub trait HostRuntime {
    /// Current wall-clock time.
    fn now(&self) -> TimestampMillis;

    /// Starts a periodic interval whose first firing is one `period` from now.
    ///
    /// # Errors
    ///
    /// Returns [`TankError::HostCapacityExhausted`] when no slot is free.
    fn start_interval(&mut self, period: Duration) -> TankResult<TimerId>;

    /// Cancels an interval. Returns `false` when the id was not registered.
    fn cancel_interval(&mut self, id: TimerId) -> bool;

    /// Registers interest in an event source.
    ///
    /// # Errors
    ///
    /// Returns [`TankError::HostCapacityExhausted`] when no slot is free.
    fn add_listener(&mut self, kind: ListenerKind) -> TankResult<ListenerId>;

    /// Releases a listener. Returns `false` when the id was not registered.
    fn remove_listener(&mut self, id: ListenerId) -> bool;
}

/// Clock advanced explicitly by the caller; used by tests and the console.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ManualClock {
    now: TimestampMillis,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub const fn starting_at(start: TimestampMillis) -> Self {
        Self { now: start }
    }

    /// Moves the clock forward.
    pub fn advance(&mut self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now = self.now.saturating_add(millis);
    }

}

impl Clock for ManualClock {
    fn now_millis(&self) -> TimestampMillis {
        self.now
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct IntervalEntry {
    id: TimerId,
    period_ms: u64,
    next_due: TimestampMillis,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct ListenerEntry {
    id: ListenerId,
    kind: ListenerKind,
}

/// Default number of concurrently registered intervals.
pub const DEFAULT_TIMER_SLOTS: usize = 4;
/// Default number of concurrently registered listeners.
pub const DEFAULT_LISTENER_SLOTS: usize = 8;

/// Cooperative timer and listener registry.
pub struct EventLoop<
    C,
    const TIMERS: usize = DEFAULT_TIMER_SLOTS,
    const LISTENERS: usize = DEFAULT_LISTENER_SLOTS,
> {
    clock: C,
    timers: Vec<IntervalEntry, TIMERS>,
    listeners: Vec<ListenerEntry, LISTENERS>,
    next_id: u32,
}

impl<C, const TIMERS: usize, const LISTENERS: usize> EventLoop<C, TIMERS, LISTENERS>
where
    C: Clock,
{
    /// Creates an event loop with no registrations.
    pub const fn new(clock: C) -> Self {
        Self {
            clock,
            timers: Vec::new(),
            listeners: Vec::new(),
            next_id: 1,
        }
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Returns the next interval that is due at the current time and
    /// schedules its following firing.
    ///
    /// Call repeatedly until `None`. An interval that fell several periods
    /// behind fires once; its next deadline is the first period boundary
    /// after the current time.
    pub fn poll_due(&mut self) -> Option<TimerId> {
        let now = self.clock.now_millis();
        let entry = self
            .timers
            .iter_mut()
            .filter(|entry| entry.next_due <= now)
            .min_by_key(|entry| entry.next_due)?;
        let missed = (now - entry.next_due) / entry.period_ms + 1;
        entry.next_due = entry
            .next_due
            .saturating_add(missed.saturating_mul(entry.period_ms));
        Some(entry.id)
    }

    /// Earliest pending interval deadline, if any interval is registered.
    pub fn next_deadline(&self) -> Option<TimestampMillis> {
        self.timers.iter().map(|entry| entry.next_due).min()
    }

    /// Returns `true` while at least one listener of `kind` is registered.
    pub fn has_listener(&self, kind: ListenerKind) -> bool {
        self.listeners.iter().any(|entry| entry.kind == kind)
    }

    /// Number of live interval registrations.
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Number of live listener registrations.
    pub fn active_listeners(&self) -> usize {
        self.listeners.len()
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }
}

impl<C, const TIMERS: usize, const LISTENERS: usize> HostRuntime
    for EventLoop<C, TIMERS, LISTENERS>
where
    C: Clock,
{
    fn now(&self) -> TimestampMillis {
        self.clock.now_millis()
    }

    fn start_interval(&mut self, period: Duration) -> TankResult<TimerId> {
        if self.timers.is_full() {
            return Err(TankError::HostCapacityExhausted);
        }
        let period_ms = u64::try_from(period.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        let id = self.allocate_id();
        let next_due = self.clock.now_millis().saturating_add(period_ms);
        self.timers
            .push(IntervalEntry {
                id,
                period_ms,
                next_due,
            })
            .map_err(|_| TankError::HostCapacityExhausted)?;
        Ok(id)
    }

    fn cancel_interval(&mut self, id: TimerId) -> bool {
        match self.timers.iter().position(|entry| entry.id == id) {
            Some(index) => {
                self.timers.swap_remove(index);
                true
            }
            None => false,
        }
    }

    fn add_listener(&mut self, kind: ListenerKind) -> TankResult<ListenerId> {
        if self.listeners.is_full() {
            return Err(TankError::HostCapacityExhausted);
        }
        let id = self.allocate_id();
        self.listeners
            .push(ListenerEntry { id, kind })
            .map_err(|_| TankError::HostCapacityExhausted)?;
        Ok(id)
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        match self.listeners.iter().position(|entry| entry.id == id) {
            Some(index) => {
                self.listeners.swap_remove(index);
                true
            }
            None => false,
        }
    }
}
