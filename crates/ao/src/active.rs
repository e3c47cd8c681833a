//! Active object abstraction.
//!
//! An active object couples a behavior with a mailbox and one dedicated
//! thread. The behavior is only ever invoked from that thread, one event at
//! a time, so it can keep its state without locks.

use core::fmt;
use core::time::Duration;
use std::thread::JoinHandle;

use crate::error::StartError;
use crate::event::{Event, Signal};
use crate::mailbox::{Inbox, Mailbox};
use crate::port::{CoreAffinity, Priority, TaskSpawner, TaskSpec, DEFAULT_STACK_SIZE};

/// Default number of events an active object mailbox can hold.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 10;

/// Static start-up parameters for one active object.
#[derive(Debug, Clone)]
pub struct ActiveConfig {
    pub name: &'static str,
    pub stack_size: usize,
    pub priority: Priority,
    pub affinity: CoreAffinity,
    pub mailbox_capacity: usize,
}

impl ActiveConfig {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            stack_size: DEFAULT_STACK_SIZE,
            priority: Priority(1),
            affinity: CoreAffinity::Any,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }

    /// Sets the stack budget in bytes.
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Priority(priority);
        self
    }

    /// Pins the thread to `core`.
    pub fn pinned_to(mut self, core: usize) -> Self {
        self.affinity = CoreAffinity::Core(core);
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub(crate) fn task_spec(&self) -> TaskSpec {
        TaskSpec {
            name: self.name,
            stack_size: self.stack_size,
            priority: self.priority,
            affinity: self.affinity,
        }
    }
}

/// Per-dispatch context handed to behaviors.
pub struct ActiveContext {
    name: &'static str,
    mailbox: Mailbox,
    dispatched: u64,
}

impl ActiveContext {
    pub fn new(name: &'static str, mailbox: Mailbox) -> Self {
        Self {
            name,
            mailbox,
            dispatched: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The active object's own mailbox.
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Queues `event` behind everything already in the own mailbox.
    pub fn post_self(&self, event: Event) {
        self.mailbox.post(event);
    }

    /// Number of events dispatched so far, `Init` included.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

/// Trait implemented by application state machines.
///
/// The first event every behavior sees is [`Signal::INIT`].
pub trait ActiveBehavior: Send + 'static {
    fn on_event(&mut self, ctx: &mut ActiveContext, event: Event);
}

/// Convenience behavior for state machines that only react to signals.
pub trait SignalHandler: Send + 'static {
    fn handle_signal(&mut self, signal: Signal, ctx: &mut ActiveContext);
}

impl<T: SignalHandler> ActiveBehavior for T {
    fn on_event(&mut self, ctx: &mut ActiveContext, event: Event) {
        SignalHandler::handle_signal(self, event.signal(), ctx);
    }
}

/// A behavior bound to the active object machinery.
pub struct ActiveObject {
    behavior: Box<dyn ActiveBehavior>,
    initialized: bool,
}

impl ActiveObject {
    pub fn new<B: ActiveBehavior>(behavior: B) -> Self {
        Self {
            behavior: Box::new(behavior),
            initialized: false,
        }
    }

    /// Delivers the synthetic `Init` event. Returns `false` if it was
    /// already delivered.
    pub fn init(&mut self, ctx: &mut ActiveContext) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        self.deliver(ctx, Event::init());
        true
    }

    /// Dispatches one event, delivering `Init` first if it is still pending.
    pub fn dispatch(&mut self, ctx: &mut ActiveContext, event: Event) {
        self.init(ctx);
        self.deliver(ctx, event);
    }

    /// Dispatches everything currently queued in `inbox` without blocking.
    ///
    /// Returns the number of events dispatched. Useful for stepping an
    /// active object on the calling thread.
    pub fn run_until_idle(&mut self, ctx: &mut ActiveContext, inbox: &Inbox) -> usize {
        self.init(ctx);
        let mut count = 0;
        while let Some(event) = inbox.try_receive() {
            self.deliver(ctx, event);
            count += 1;
        }
        count
    }

    fn deliver(&mut self, ctx: &mut ActiveContext, event: Event) {
        log::trace!("`{}` <- {}", ctx.name, event.signal());
        ctx.dispatched += 1;
        self.behavior.on_event(ctx, event);
    }

    /// Spawns the thread that owns this active object from now on.
    pub(crate) fn start(
        self,
        config: &ActiveConfig,
        mailbox: Mailbox,
        inbox: Inbox,
        receive_timeout: Duration,
        spawner: &dyn TaskSpawner,
    ) -> Result<JoinHandle<()>, StartError> {
        if !config.priority.is_valid() {
            return Err(StartError::InvalidPriority(config.name));
        }

        let name = config.name;
        let ctx = ActiveContext::new(name, mailbox);
        let handle = spawner
            .spawn(
                &config.task_spec(),
                Box::new(move || self.event_loop(ctx, inbox, receive_timeout)),
            )
            .map_err(|source| StartError::Spawn { name, source })?;

        log::info!("active object `{name}` started");
        Ok(handle)
    }

    fn event_loop(mut self, mut ctx: ActiveContext, inbox: Inbox, receive_timeout: Duration) {
        self.init(&mut ctx);
        loop {
            // A timeout only gives the loop a chance to come around again.
            if let Some(event) = inbox.receive(receive_timeout) {
                self.deliver(&mut ctx, event);
            }
        }
    }
}

impl fmt::Debug for ActiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveObject")
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}
