//! Time event services.
//!
//! A [`TimedEvent`] binds one signal to one owning mailbox. When its timer
//! expires, the timer service posts the signal to the owner; nothing else
//! about the owner is touched from the timer side.
//!
//! All timers live on one [`TimerWheel`]. The wheel keeps a fixed-capacity
//! directory mapping each opaque [`TimerId`] back to its signal and owner.
//! The directory is filled during wiring and sealed before any actor runs,
//! so expiry lookups read it without locking.

use core::fmt;
use core::time::Duration;
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{StartError, TimerError};
use crate::event::{Event, Signal};
use crate::mailbox::Mailbox;
use crate::port::{CoreAffinity, Priority, TaskSpawner, TaskSpec, DEFAULT_STACK_SIZE};

/// Capacity of the timer directory.
pub const MAX_TIMERS: usize = 100;

/// Whether a timer stops or reloads after it fires.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    #[default]
    OneShot,
    Periodic,
}

/// Time source driving the wheel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Wall-clock time, expiries delivered by a timer service thread.
    #[default]
    Monotonic,
    /// Virtual time that only moves through [`TimerWheel::advance`].
    Manual,
}

/// Opaque handle identifying a timer on its wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u16);

impl TimerId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct TimedEventConfig {
    pub name: &'static str,
    pub signal: Signal,
    pub period: Duration,
    pub repeat: Repeat,
}

impl TimedEventConfig {
    pub fn new(name: &'static str, signal: Signal, period: Duration) -> Self {
        Self {
            name,
            signal,
            period,
            repeat: Repeat::OneShot,
        }
    }

    pub fn periodic(mut self) -> Self {
        self.repeat = Repeat::Periodic;
        self
    }

    pub fn one_shot(mut self) -> Self {
        self.repeat = Repeat::OneShot;
        self
    }
}

/// Directory entry recovered by the expiry handler.
#[derive(Debug, Clone)]
pub(crate) struct TimerEntry {
    pub(crate) name: &'static str,
    pub(crate) signal: Signal,
    pub(crate) owner: Mailbox,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    period: Duration,
    repeat: Repeat,
    /// Expiry time measured from the wheel's origin.
    deadline: Option<Duration>,
}

#[derive(Debug, Default)]
struct Schedule {
    slots: heapless::Vec<Slot, MAX_TIMERS>,
    /// Current time for [`Clock::Manual`].
    manual_now: Duration,
}

impl Schedule {
    fn earliest(&self) -> Option<Duration> {
        self.slots.iter().filter_map(|slot| slot.deadline).min()
    }

    /// Removes every timer due at `now` from the schedule, reloading periodic
    /// ones, and returns them in expiry order.
    fn take_due(&mut self, now: Duration) -> heapless::Vec<TimerId, MAX_TIMERS> {
        let mut due: heapless::Vec<(Duration, TimerId), MAX_TIMERS> = heapless::Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(deadline) = slot.deadline else {
                continue;
            };
            if deadline > now {
                continue;
            }
            slot.deadline = match slot.repeat {
                Repeat::OneShot => None,
                Repeat::Periodic => {
                    let next = deadline + slot.period;
                    // Missed periods are dropped rather than replayed.
                    Some(if next <= now { now + slot.period } else { next })
                }
            };
            // Both vectors share MAX_TIMERS, so this cannot overflow.
            let _ = due.push((deadline, TimerId(index as u16)));
        }
        due.sort_unstable();
        due.into_iter().map(|(_, id)| id).collect()
    }
}

/// Shared timer service for every [`TimedEvent`] of a runtime.
pub struct TimerWheel {
    clock: Clock,
    origin: Instant,
    directory: OnceLock<heapless::Vec<TimerEntry, MAX_TIMERS>>,
    schedule: Mutex<Schedule>,
    wake: Condvar,
}

impl TimerWheel {
    pub(crate) fn new(clock: Clock) -> Arc<Self> {
        Arc::new(Self {
            clock,
            origin: Instant::now(),
            directory: OnceLock::new(),
            schedule: Mutex::new(Schedule::default()),
            wake: Condvar::new(),
        })
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Time elapsed since the wheel was created, virtual for a manual clock.
    pub fn now(&self) -> Duration {
        let schedule = self.schedule.lock();
        self.now_locked(&schedule)
    }

    pub fn is_sealed(&self) -> bool {
        self.directory.get().is_some()
    }

    fn now_locked(&self, schedule: &Schedule) -> Duration {
        match self.clock {
            Clock::Monotonic => self.origin.elapsed(),
            Clock::Manual => schedule.manual_now,
        }
    }

    /// Creates the schedule slot for a new timer.
    pub(crate) fn create(&self, period: Duration, repeat: Repeat) -> Option<TimerId> {
        let mut schedule = self.schedule.lock();
        let id = TimerId(schedule.slots.len() as u16);
        schedule
            .slots
            .push(Slot {
                period,
                repeat,
                deadline: None,
            })
            .ok()?;
        Some(id)
    }

    /// Freezes the directory. Later calls are ignored.
    pub(crate) fn seal(&self, entries: heapless::Vec<TimerEntry, MAX_TIMERS>) {
        let count = entries.len();
        if self.directory.set(entries).is_err() {
            log::warn!("timer directory already sealed");
            return;
        }
        log::info!("timer directory sealed with {count} timed events");
    }

    fn start_timer(&self, id: TimerId) {
        let mut schedule = self.schedule.lock();
        let now = self.now_locked(&schedule);
        if let Some(slot) = schedule.slots.get_mut(id.index()) {
            slot.deadline = Some(now + slot.period);
        }
        drop(schedule);
        self.wake.notify_one();
    }

    fn stop_timer(&self, id: TimerId) {
        let mut schedule = self.schedule.lock();
        if let Some(slot) = schedule.slots.get_mut(id.index()) {
            slot.deadline = None;
        }
        drop(schedule);
        self.wake.notify_one();
    }

    /// Earliest pending expiry, measured like [`now`](Self::now).
    pub fn next_deadline(&self) -> Option<Duration> {
        self.schedule.lock().earliest()
    }

    fn remaining(&self, id: TimerId) -> Option<Duration> {
        let schedule = self.schedule.lock();
        let now = self.now_locked(&schedule);
        let deadline = schedule.slots.get(id.index())?.deadline?;
        Some(deadline.saturating_sub(now))
    }

    /// Moves a manual clock forward by `by`, firing every timer that comes
    /// due on the way in deadline order.
    ///
    /// # Panics
    ///
    /// Panics when called on a [`Clock::Monotonic`] wheel.
    pub fn advance(&self, by: Duration) {
        assert_eq!(
            self.clock,
            Clock::Manual,
            "only a manual clock can be advanced"
        );

        let target = self.schedule.lock().manual_now + by;
        loop {
            let mut schedule = self.schedule.lock();
            let next = schedule.earliest().filter(|deadline| *deadline <= target);
            let Some(deadline) = next else {
                schedule.manual_now = target;
                return;
            };
            schedule.manual_now = schedule.manual_now.max(deadline);
            let now = schedule.manual_now;
            let due = schedule.take_due(now);
            drop(schedule);
            for id in due {
                self.expire(id);
            }
        }
    }

    /// Spawns the timer service thread for a monotonic clock.
    pub(crate) fn start_service(
        self: &Arc<Self>,
        priority: u8,
        spawner: &dyn TaskSpawner,
    ) -> Result<Option<JoinHandle<()>>, StartError> {
        if self.clock == Clock::Manual {
            return Ok(None);
        }

        let spec = TaskSpec {
            name: "tmr-svc",
            stack_size: DEFAULT_STACK_SIZE,
            priority: Priority(priority),
            affinity: CoreAffinity::Any,
        };
        if !spec.priority.is_valid() {
            return Err(StartError::InvalidPriority(spec.name));
        }

        let wheel = Arc::clone(self);
        let handle = spawner
            .spawn(&spec, Box::new(move || wheel.service_loop()))
            .map_err(|source| StartError::Spawn {
                name: spec.name,
                source,
            })?;
        log::info!("timer service started");
        Ok(Some(handle))
    }

    fn service_loop(&self) {
        let mut schedule = self.schedule.lock();
        loop {
            let now = self.now_locked(&schedule);
            let due = schedule.take_due(now);
            if !due.is_empty() {
                // Owners may be blocked arming a timer; post with the lock released.
                MutexGuard::unlocked(&mut schedule, || {
                    for id in due {
                        self.expire(id);
                    }
                });
                continue;
            }

            match schedule.earliest() {
                Some(deadline) => {
                    self.wake.wait_until(&mut schedule, self.origin + deadline);
                }
                None => self.wake.wait(&mut schedule),
            }
        }
    }

    /// Expiry handler: recovers the timed event and posts its signal.
    fn expire(&self, id: TimerId) {
        let Some(entry) = self.directory.get().and_then(|dir| dir.get(id.index())) else {
            log::warn!("timer {id:?} expired outside the sealed directory");
            return;
        };
        log::debug!(
            "timer `{}` expired, posting {} to `{}`",
            entry.name,
            entry.signal,
            entry.owner.name()
        );
        entry.owner.post(Event::new(entry.signal));
    }
}

impl fmt::Debug for TimerWheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerWheel")
            .field("clock", &self.clock)
            .field("sealed", &self.is_sealed())
            .finish_non_exhaustive()
    }
}

/// A timer bound to one signal and one owning active object.
pub struct TimedEvent {
    id: TimerId,
    config: TimedEventConfig,
    wheel: Arc<TimerWheel>,
}

impl TimedEvent {
    /// Creates the underlying timer and its directory entry.
    pub(crate) fn register(
        wheel: &Arc<TimerWheel>,
        directory: &mut heapless::Vec<TimerEntry, MAX_TIMERS>,
        config: TimedEventConfig,
        owner: &Mailbox,
    ) -> Result<Self, TimerError> {
        if config.period.is_zero() {
            return Err(TimerError::ZeroPeriod(config.name));
        }

        let full = TimerError::DirectoryFull {
            name: config.name,
            capacity: MAX_TIMERS,
        };
        let entry = TimerEntry {
            name: config.name,
            signal: config.signal,
            owner: owner.clone(),
        };
        directory.push(entry).map_err(|_| full.clone())?;
        let id = wheel.create(config.period, config.repeat).ok_or(full)?;
        debug_assert_eq!(id.index() + 1, directory.len());

        Ok(Self {
            id,
            config,
            wheel: Arc::clone(wheel),
        })
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.config.name
    }

    pub fn signal(&self) -> Signal {
        self.config.signal
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    pub fn repeat(&self) -> Repeat {
        self.config.repeat
    }

    /// Starts the countdown from now, discarding any countdown in progress.
    pub fn arm(&self) {
        self.wheel.start_timer(self.id);
    }

    /// Stops the countdown; nothing fires until the next [`arm`](Self::arm).
    pub fn disarm(&self) {
        self.wheel.stop_timer(self.id);
    }

    pub fn is_armed(&self) -> bool {
        self.remaining().is_some()
    }

    /// Time left before the next expiry, if armed.
    pub fn remaining(&self) -> Option<Duration> {
        self.wheel.remaining(self.id)
    }
}

impl fmt::Debug for TimedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedEvent")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("signal", &self.config.signal)
            .field("period", &self.config.period)
            .field("repeat", &self.config.repeat)
            .finish()
    }
}
