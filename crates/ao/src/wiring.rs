//! Boot-time wiring and the running system.
//!
//! [`Wiring`] is the single-threaded phase in which mailboxes are allocated,
//! timed events are registered and behaviors are bound. [`Wiring::start`]
//! consumes it, seals the timer directory and only then spawns threads, so
//! no shared table can change once an actor runs.

use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::active::{ActiveBehavior, ActiveConfig, ActiveContext, ActiveObject};
use crate::error::{StartError, WiringError};
use crate::mailbox::{mailbox, Inbox, Mailbox};
use crate::port::{StdSpawner, TaskSpawner};
use crate::time::{Clock, TimedEvent, TimedEventConfig, TimerEntry, TimerWheel, MAX_TIMERS};

/// Runtime-wide settings, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub name: &'static str,
    /// How long a post may wait for mailbox space before failing.
    pub post_timeout: Duration,
    /// Wake-up interval of an idle active object loop.
    pub receive_timeout: Duration,
    pub clock: Clock,
    pub timer_priority: u8,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: "AO",
            post_timeout: Duration::from_millis(10),
            receive_timeout: Duration::from_millis(10),
            clock: Clock::Monotonic,
            timer_priority: 1,
        }
    }
}

impl RuntimeConfig {
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    pub fn post_timeout(mut self, timeout: Duration) -> Self {
        self.config.post_timeout = timeout;
        self
    }

    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.receive_timeout = timeout;
        self
    }

    /// Selects the time source for all timed events.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.config.clock = clock;
        self
    }

    /// Sets the priority of the timer service thread.
    pub fn timer_priority(mut self, priority: u8) -> Self {
        self.config.timer_priority = priority;
        self
    }

    pub fn build(self) -> RuntimeConfig {
        self.config
    }
}

/// An active object whose mailbox exists but whose thread does not yet.
#[derive(Debug)]
pub struct Declared {
    slot: usize,
    name: &'static str,
    mailbox: Mailbox,
}

impl Declared {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }
}

struct Slot {
    config: ActiveConfig,
    mailbox: Mailbox,
    inbox: Inbox,
    object: Option<ActiveObject>,
}

/// Builder for a system of active objects.
pub struct Wiring {
    config: RuntimeConfig,
    spawner: Box<dyn TaskSpawner>,
    slots: Vec<Slot>,
    timers: Arc<TimerWheel>,
    directory: heapless::Vec<TimerEntry, MAX_TIMERS>,
}

impl Wiring {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_spawner(config, StdSpawner)
    }

    /// Uses `spawner` as the thread provider for every active object.
    pub fn with_spawner<S: TaskSpawner + 'static>(config: RuntimeConfig, spawner: S) -> Self {
        let timers = TimerWheel::new(config.clock);
        Self {
            config,
            spawner: Box::new(spawner),
            slots: Vec::new(),
            timers,
            directory: heapless::Vec::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Allocates the mailbox of a new active object.
    pub fn declare(&mut self, config: ActiveConfig) -> Result<Declared, WiringError> {
        let (tx, rx) = mailbox(config.name, config.mailbox_capacity, self.config.post_timeout)?;
        let declared = Declared {
            slot: self.slots.len(),
            name: config.name,
            mailbox: tx.clone(),
        };
        log::debug!(
            "declared `{}` with a {}-event mailbox",
            config.name,
            config.mailbox_capacity
        );
        self.slots.push(Slot {
            config,
            mailbox: tx,
            inbox: rx,
            object: None,
        });
        Ok(declared)
    }

    /// Registers a timed event that posts its signal to `owner`.
    pub fn timed_event(
        &mut self,
        config: TimedEventConfig,
        owner: &Mailbox,
    ) -> Result<TimedEvent, WiringError> {
        let event = TimedEvent::register(&self.timers, &mut self.directory, config, owner)?;
        log::debug!("timed event `{}` -> `{}`", event.name(), owner.name());
        Ok(event)
    }

    /// Binds `behavior` to a declared active object.
    ///
    /// `declared` must come from this wiring; a handle declared elsewhere is
    /// rejected with [`WiringError::ForeignActor`].
    pub fn bind<B: ActiveBehavior>(
        &mut self,
        declared: Declared,
        behavior: B,
    ) -> Result<(), WiringError> {
        let slot = self
            .slots
            .get_mut(declared.slot)
            .filter(|slot| slot.mailbox.same_mailbox(&declared.mailbox))
            .ok_or(WiringError::ForeignActor(declared.name))?;
        if slot.object.is_some() {
            log::warn!("`{}` bound twice, keeping the latest behavior", declared.name);
        }
        slot.object = Some(ActiveObject::new(behavior));
        Ok(())
    }

    /// Seals the timer directory and starts the timer service and every
    /// active object, in declaration order.
    pub fn start(self) -> Result<Runtime, WiringError> {
        let Wiring {
            config,
            spawner,
            slots,
            timers,
            directory,
        } = self;

        if let Some(unbound) = slots.iter().find(|slot| slot.object.is_none()) {
            return Err(WiringError::Unbound(unbound.config.name));
        }
        // Reject bad priorities before any thread exists.
        if let Some(slot) = slots.iter().find(|slot| !slot.config.priority.is_valid()) {
            return Err(StartError::InvalidPriority(slot.config.name).into());
        }

        timers.seal(directory);
        let mut threads = Vec::with_capacity(slots.len() + 1);
        if let Some(handle) = timers.start_service(config.timer_priority, spawner.as_ref())? {
            threads.push(handle);
        }

        let mut actors = Vec::with_capacity(slots.len());
        for slot in slots {
            let Slot {
                config: active,
                mailbox,
                inbox,
                object,
            } = slot;
            let Some(object) = object else {
                continue;
            };
            actors.push(active.name);
            threads.push(object.start(
                &active,
                mailbox,
                inbox,
                config.receive_timeout,
                spawner.as_ref(),
            )?);
        }

        log::info!("runtime `{}` running {} active objects", config.name, actors.len());
        Ok(Runtime {
            config,
            timers,
            actors,
            threads,
        })
    }

    /// Seals the wiring like [`start`](Self::start) but runs every active
    /// object on the calling thread instead of spawning threads.
    ///
    /// Requires [`Clock::Manual`]: no timer service thread runs, so time
    /// only moves through [`Simulation::advance`].
    pub fn simulate(self) -> Result<Simulation, WiringError> {
        if self.config.clock != Clock::Manual {
            return Err(WiringError::SimulationNeedsManualClock(self.config.name));
        }

        let Wiring {
            config,
            slots,
            timers,
            directory,
            ..
        } = self;

        let mut actors = Vec::with_capacity(slots.len());
        for slot in slots {
            let Some(object) = slot.object else {
                return Err(WiringError::Unbound(slot.config.name));
            };
            if !slot.config.priority.is_valid() {
                return Err(StartError::InvalidPriority(slot.config.name).into());
            }
            actors.push(SimActor {
                ctx: ActiveContext::new(slot.config.name, slot.mailbox),
                config: slot.config,
                inbox: slot.inbox,
                object,
            });
        }
        timers.seal(directory);

        let mut simulation = Simulation {
            config,
            timers,
            actors,
        };
        for actor in &mut simulation.actors {
            actor.object.init(&mut actor.ctx);
        }
        simulation.run_until_idle();
        Ok(simulation)
    }
}

/// A started system. Active objects run for the rest of the process.
pub struct Runtime {
    config: RuntimeConfig,
    timers: Arc<TimerWheel>,
    actors: Vec<&'static str>,
    threads: Vec<JoinHandle<()>>,
}

impl Runtime {
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The timer wheel, e.g. to advance a manual clock.
    pub fn timers(&self) -> &Arc<TimerWheel> {
        &self.timers
    }

    /// Names of the running active objects, in start order.
    pub fn actors(&self) -> &[&'static str] {
        &self.actors
    }

    /// Blocks the caller for the lifetime of the runtime.
    pub fn join(self) {
        for handle in self.threads {
            if handle.join().is_err() {
                log::error!("runtime thread panicked");
            }
        }
    }
}

struct SimActor {
    config: ActiveConfig,
    ctx: ActiveContext,
    inbox: Inbox,
    object: ActiveObject,
}

/// A sealed system stepped cooperatively on one thread.
///
/// The highest-priority active object with a pending event runs first;
/// equal priorities run in declaration order.
pub struct Simulation {
    config: RuntimeConfig,
    timers: Arc<TimerWheel>,
    actors: Vec<SimActor>,
}

impl Simulation {
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn timers(&self) -> &Arc<TimerWheel> {
        &self.timers
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Dispatches one event to the highest-priority ready active object.
    pub fn dispatch_once(&mut self) -> bool {
        let mut ready: Option<usize> = None;
        for (index, actor) in self.actors.iter().enumerate() {
            if actor.inbox.is_empty() {
                continue;
            }
            let outranks = ready.map_or(true, |best| {
                actor.config.priority > self.actors[best].config.priority
            });
            if outranks {
                ready = Some(index);
            }
        }

        let Some(index) = ready else {
            return false;
        };
        let actor = &mut self.actors[index];
        match actor.inbox.try_receive() {
            Some(event) => {
                actor.object.dispatch(&mut actor.ctx, event);
                true
            }
            None => false,
        }
    }

    /// Dispatches until every mailbox is empty. Returns the event count.
    pub fn run_until_idle(&mut self) -> usize {
        let mut count = 0;
        while self.dispatch_once() {
            count += 1;
        }
        count
    }

    /// Advances the manual clock by `by`, letting every active object
    /// react to each expiry before the next one fires.
    pub fn advance(&mut self, by: Duration) -> usize {
        let target = self.timers.now() + by;
        let mut count = self.run_until_idle();
        while let Some(deadline) = self.timers.next_deadline().filter(|d| *d <= target) {
            let now = self.timers.now();
            self.timers.advance(deadline.saturating_sub(now));
            count += self.run_until_idle();
        }
        let now = self.timers.now();
        self.timers.advance(target.saturating_sub(now));
        count + self.run_until_idle()
    }
}
