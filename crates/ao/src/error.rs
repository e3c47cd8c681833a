//! Error types for the boot-time wiring phase and mailbox traffic.
//!
//! Every error here describes a capacity or configuration defect. The
//! runtime never retries: wiring errors surface from [`crate::Wiring::start`]
//! so the application can abort before any actor runs, and runtime post
//! failures are escalated to a panic at the point of violation.

use core::time::Duration;

use thiserror::Error;

use crate::event::Signal;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailboxError {
    #[error("mailbox `{0}` requested with zero capacity")]
    ZeroCapacity(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostError {
    #[error("mailbox `{mailbox}` full: {signal} not accepted within {timeout:?}")]
    Full {
        mailbox: &'static str,
        signal: Signal,
        timeout: Duration,
    },
    #[error("mailbox `{mailbox}` has no receiver")]
    Disconnected { mailbox: &'static str },
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("active object `{0}` requires a priority greater than zero")]
    InvalidPriority(&'static str),
    #[error("failed to spawn thread for `{name}`: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("timer directory full ({capacity} entries), cannot register `{name}`")]
    DirectoryFull { name: &'static str, capacity: usize },
    #[error("timed event `{0}` requested with a zero period")]
    ZeroPeriod(&'static str),
}

#[derive(Debug, Error)]
pub enum WiringError {
    #[error(transparent)]
    Mailbox(#[from] MailboxError),
    #[error(transparent)]
    Timer(#[from] TimerError),
    #[error(transparent)]
    Start(#[from] StartError),
    #[error("active object `{0}` declared but never bound to a behavior")]
    Unbound(&'static str),
    #[error("active object `{0}` was declared by a different wiring")]
    ForeignActor(&'static str),
    #[error("runtime `{0}` can only be simulated on a manual clock")]
    SimulationNeedsManualClock(&'static str),
}
