//! # ao-broker
//!
//! Publish/subscribe fan-out for the `ao` runtime. The [`Broker`] is an
//! active object: producers post events to its mailbox through a
//! [`Publisher`], and the broker's own thread copies each event's signal to
//! every mailbox subscribed to that kind, in subscription order.
//!
//! Subscriptions are collected on a [`BrokerBuilder`] during wiring. Building
//! the broker freezes the table, so fan-out reads it without locking.

mod broker;
mod table;

pub use broker::{Broker, Publisher};
pub use table::{BrokerBuilder, SubscribeError, SubscriptionTable, MAX_SUBSCRIBERS_PER_EVENT};
