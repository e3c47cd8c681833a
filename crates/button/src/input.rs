//! Digital input boundary.
//!
//! Reading a line is a hardware-driver concern; at this layer a read is
//! synchronous, non-blocking and infallible.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Electrical level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Low level (0V)
    Low,
    /// High level (VCC)
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Which level means "pressed".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Pulled-up line, pressing shorts it to ground.
    #[default]
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    pub fn is_active(self, level: Level) -> bool {
        match self {
            Polarity::ActiveLow => level == Level::Low,
            Polarity::ActiveHigh => level == Level::High,
        }
    }
}

/// A single digital input line.
pub trait InputLine: Send + 'static {
    fn level(&self) -> Level;
}

impl<F> InputLine for F
where
    F: Fn() -> Level + Send + 'static,
{
    fn level(&self) -> Level {
        self()
    }
}

/// In-memory line driven by [`SimulatedLine::set`]. Clones share the level.
#[derive(Debug, Clone)]
pub struct SimulatedLine {
    high: Arc<AtomicBool>,
}

impl SimulatedLine {
    pub fn new(level: Level) -> Self {
        Self {
            high: Arc::new(AtomicBool::new(level.is_high())),
        }
    }

    pub fn set(&self, level: Level) {
        self.high.store(level.is_high(), Ordering::Release);
    }
}

impl InputLine for SimulatedLine {
    fn level(&self) -> Level {
        Level::from(self.high.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_line_clones_share_level() {
        let line = SimulatedLine::new(Level::High);
        let probe = line.clone();
        line.set(Level::Low);
        assert_eq!(probe.level(), Level::Low);
    }

    #[test]
    fn closures_are_lines() {
        let line = || Level::High;
        assert_eq!(InputLine::level(&line), Level::High);
    }

    #[test]
    fn polarity_maps_levels() {
        assert!(Polarity::ActiveLow.is_active(Level::Low));
        assert!(!Polarity::ActiveLow.is_active(Level::High));
        assert!(Polarity::ActiveHigh.is_active(Level::High));
    }
}
