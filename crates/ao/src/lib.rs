//! # ao
//!
//! A small active object runtime for real-time targets. Each active object
//! owns a bounded mailbox and one thread of control; its behavior is only
//! ever dispatched from that thread, one event at a time.
//!
//! ## Module Overview
//! - [`event`]   – Signals and self-contained, copyable events.
//! - [`mailbox`] – Bounded FIFO mailboxes with timed post and receive.
//! - [`active`]  – Behaviors, dispatch context and the per-object event loop.
//! - [`time`]    – Timed events and the timer wheel that posts their expiries.
//! - [`port`]    – Thread provider boundary.
//! - [`wiring`]  – Boot-time wiring, the running system and a stepped simulation.
//! - [`error`]   – Capacity and configuration errors.
//!
//! Shared tables (the timer directory, and any subscription table built on
//! top of this crate) are filled while [`Wiring`] is alive and are read-only
//! once [`Wiring::start`] has consumed it.

pub mod active;
pub mod error;
pub mod event;
pub mod mailbox;
pub mod port;
pub mod time;
pub mod wiring;

pub use active::{ActiveBehavior, ActiveConfig, ActiveContext, ActiveObject, SignalHandler};
pub use error::{MailboxError, PostError, StartError, TimerError, WiringError};
pub use event::{Event, Payload, PayloadError, Signal, PAYLOAD_CAPACITY};
pub use mailbox::{mailbox, Inbox, Mailbox};
pub use port::{CoreAffinity, Priority, StdSpawner, TaskSpawner, TaskSpec};
pub use time::{Clock, Repeat, TimedEvent, TimedEventConfig, TimerId, TimerWheel, MAX_TIMERS};
pub use wiring::{Declared, Runtime, RuntimeConfig, RuntimeConfigBuilder, Simulation, Wiring};

#[cfg(test)]
mod tests;
