//! # ao-button
//!
//! A debounced push-button active object. The line is sampled on a periodic
//! poll; a change must survive a one-shot debounce window before it is
//! committed and published through an event broker.

mod button;
mod input;

pub use button::{Button, ButtonConfig, DEBOUNCED_SIG, POLL_SIG, PRESSED_SIG, RELEASED_SIG};
pub use input::{InputLine, Level, Polarity, SimulatedLine};
