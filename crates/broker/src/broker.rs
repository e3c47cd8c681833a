//! The broker active object and its publishing handle.

use ao::{ActiveBehavior, ActiveContext, Event, Mailbox, Signal};

use crate::table::SubscriptionTable;

/// Active object fanning out every received event to its subscribers.
#[derive(Debug)]
pub struct Broker {
    table: SubscriptionTable,
}

impl Broker {
    pub(crate) fn new(table: SubscriptionTable) -> Self {
        Self { table }
    }

    /// Number of mailboxes subscribed to `kind`.
    pub fn subscribers(&self, kind: Signal) -> usize {
        self.table.subscribers(kind).len()
    }

    pub fn table(&self) -> &SubscriptionTable {
        &self.table
    }

    fn publish(&self, event: &Event) {
        let kind = event.signal();
        let subscribers = self.table.subscribers(kind);
        if subscribers.is_empty() {
            log::warn!("{kind} published with no subscribers");
            return;
        }

        // Subscribers only ever see the signal.
        let copy = event.signal_only();
        for subscriber in subscribers {
            subscriber.post(copy);
        }
        log::debug!("{kind} delivered to {} subscribers", subscribers.len());
    }
}

impl ActiveBehavior for Broker {
    fn on_event(&mut self, _ctx: &mut ActiveContext, event: Event) {
        if event.signal() == Signal::INIT {
            log::info!(
                "broker ready with {} subscribed event kinds",
                self.table.kinds().count()
            );
            return;
        }
        self.publish(&event);
    }
}

/// Producer-side handle for publishing through a broker.
#[derive(Debug, Clone)]
pub struct Publisher {
    broker: Mailbox,
}

impl Publisher {
    /// Wraps the mailbox of a declared broker active object.
    pub fn new(broker: &Mailbox) -> Self {
        Self {
            broker: broker.clone(),
        }
    }

    /// Publishes an event of kind `kind`.
    ///
    /// # Panics
    ///
    /// Panics if the broker's mailbox stays full for the post timeout.
    pub fn publish(&self, kind: Signal) {
        self.publish_event(Event::new(kind));
    }

    pub fn publish_event(&self, event: Event) {
        log::trace!("publishing {}", event.signal());
        self.broker.post(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BrokerBuilder;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_millis(1);

    #[test]
    fn init_is_not_broadcast() {
        let (sub, inbox) = ao::mailbox("sub", 4, TIMEOUT).unwrap();
        let mut builder = BrokerBuilder::new();
        builder.subscribe(Signal(1), &sub).unwrap();
        let mut broker = builder.build();

        let (own, _own_inbox) = ao::mailbox("broker", 4, TIMEOUT).unwrap();
        let mut ctx = ActiveContext::new("broker", own);
        broker.on_event(&mut ctx, Event::new(Signal::INIT));

        assert!(inbox.try_receive().is_none());
    }

    #[test]
    fn fan_out_strips_payload() {
        let (sub, inbox) = ao::mailbox("sub", 4, TIMEOUT).unwrap();
        let mut builder = BrokerBuilder::new();
        builder.subscribe(Signal(2), &sub).unwrap();
        let mut broker = builder.build();
        assert_eq!(broker.subscribers(Signal(2)), 1);

        let (own, _own_inbox) = ao::mailbox("broker", 4, TIMEOUT).unwrap();
        let mut ctx = ActiveContext::new("broker", own);
        broker.on_event(&mut ctx, Event::with_payload(Signal(2), &[7, 7]).unwrap());

        let delivered = inbox.try_receive().unwrap();
        assert_eq!(delivered.signal(), Signal(2));
        assert!(delivered.payload().is_empty());
    }

    #[test]
    #[should_panic(expected = "full")]
    fn full_subscriber_is_fatal() {
        let (sub, _inbox) = ao::mailbox("slow", 1, TIMEOUT).unwrap();
        let mut builder = BrokerBuilder::new();
        builder.subscribe(Signal(3), &sub).unwrap();
        let mut broker = builder.build();

        let (own, _own_inbox) = ao::mailbox("broker", 4, TIMEOUT).unwrap();
        let mut ctx = ActiveContext::new("broker", own);
        broker.on_event(&mut ctx, Event::new(Signal(3)));
        broker.on_event(&mut ctx, Event::new(Signal(3)));
    }
}
