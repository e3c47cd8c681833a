//! Bounded FIFO mailboxes.
//!
//! A mailbox is split into a cloneable producer half ([`Mailbox`]) and a
//! single consumer half ([`Inbox`]) owned by the active object's thread.
//! Both halves wait with a bounded timeout; an expired post is treated as a
//! violated capacity contract rather than as backpressure.

use core::fmt;
use core::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::error::{MailboxError, PostError};
use crate::event::Event;

/// Producer half of an active object's mailbox.
#[derive(Clone)]
pub struct Mailbox {
    name: &'static str,
    capacity: usize,
    post_timeout: Duration,
    tx: Sender<Event>,
}

/// Consumer half of an active object's mailbox.
pub struct Inbox {
    name: &'static str,
    rx: Receiver<Event>,
}

/// Allocates a mailbox holding at most `capacity` events.
pub fn mailbox(
    name: &'static str,
    capacity: usize,
    post_timeout: Duration,
) -> Result<(Mailbox, Inbox), MailboxError> {
    // A zero-capacity crossbeam channel is a rendezvous, not a queue.
    if capacity == 0 {
        return Err(MailboxError::ZeroCapacity(name));
    }

    let (tx, rx) = bounded(capacity);
    Ok((
        Mailbox {
            name,
            capacity,
            post_timeout,
            tx,
        },
        Inbox { name, rx },
    ))
}

impl Mailbox {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events currently queued.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Copies `event` into the mailbox, waiting at most the configured post
    /// timeout for space.
    pub fn try_post(&self, event: Event) -> Result<(), PostError> {
        match self.tx.send_timeout(event, self.post_timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(event)) => Err(PostError::Full {
                mailbox: self.name,
                signal: event.signal(),
                timeout: self.post_timeout,
            }),
            Err(SendTimeoutError::Disconnected(_)) => {
                Err(PostError::Disconnected { mailbox: self.name })
            }
        }
    }

    /// Posts `event`, terminating on failure.
    ///
    /// # Panics
    ///
    /// Panics when the mailbox stays full for the whole post timeout. Mailbox
    /// capacities are sized at wiring time; overflowing one is a defect.
    pub fn post(&self, event: Event) {
        if let Err(err) = self.try_post(event) {
            log::error!("{err}");
            panic!("{err}");
        }
    }

    /// Returns `true` if both handles feed the same mailbox.
    pub fn same_mailbox(&self, other: &Mailbox) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &self.tx.len())
            .finish()
    }
}

impl Inbox {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout. A closed mailbox also yields `None`, after
    /// sleeping out the timeout so a caller's loop never spins.
    pub fn receive(&self, timeout: Duration) -> Option<Event> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("mailbox `{}` has no remaining producers", self.name);
                std::thread::sleep(timeout);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Takes the next event without waiting.
    pub fn try_receive(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

impl fmt::Debug for Inbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbox")
            .field("name", &self.name)
            .field("len", &self.rx.len())
            .finish()
    }
}
