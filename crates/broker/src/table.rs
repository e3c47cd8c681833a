//! Subscription bookkeeping.

use std::collections::BTreeMap;

use ao::{Mailbox, Signal};
use thiserror::Error;

use crate::broker::Broker;

/// Maximum number of mailboxes subscribed to a single event kind.
pub const MAX_SUBSCRIBERS_PER_EVENT: usize = 10;

type Subscribers = heapless::Vec<Mailbox, MAX_SUBSCRIBERS_PER_EVENT>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("{0} is reserved and cannot be published")]
    Reserved(Signal),
    #[error("{kind} already has {capacity} subscribers, cannot add `{subscriber}`")]
    TableFull {
        kind: Signal,
        subscriber: &'static str,
        capacity: usize,
    },
}

/// Event kind to ordered subscriber set. Read-only once built.
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    kinds: BTreeMap<Signal, Subscribers>,
}

impl SubscriptionTable {
    /// Subscribers of `kind`, in subscription order.
    pub fn subscribers(&self, kind: Signal) -> &[Mailbox] {
        self.kinds.get(&kind).map(|subs| subs.as_slice()).unwrap_or(&[])
    }

    /// Event kinds with at least one subscriber.
    pub fn kinds(&self) -> impl Iterator<Item = Signal> + '_ {
        self.kinds.keys().copied()
    }
}

/// Collects subscriptions while the system is being wired.
#[derive(Debug, Default)]
pub struct BrokerBuilder {
    table: SubscriptionTable,
}

impl BrokerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `subscriber` to the set of mailboxes receiving `kind`.
    pub fn subscribe(&mut self, kind: Signal, subscriber: &Mailbox) -> Result<(), SubscribeError> {
        if kind.is_reserved() {
            return Err(SubscribeError::Reserved(kind));
        }

        let subs = self.table.kinds.entry(kind).or_default();
        if subs.iter().any(|existing| existing.same_mailbox(subscriber)) {
            log::warn!("`{}` subscribed to {kind} twice", subscriber.name());
        }
        subs.push(subscriber.clone())
            .map_err(|rejected| SubscribeError::TableFull {
                kind,
                subscriber: rejected.name(),
                capacity: MAX_SUBSCRIBERS_PER_EVENT,
            })?;

        log::debug!("`{}` subscribed to {kind}", subscriber.name());
        Ok(())
    }

    /// Freezes the subscription table into a broker behavior.
    pub fn build(self) -> Broker {
        Broker::new(self.table)
    }
}
