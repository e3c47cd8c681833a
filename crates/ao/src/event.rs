//! Event and signal primitives.
//!
//! Events are small, self-contained messages identified by an integral
//! signal. Every event is `Copy` so it can be moved through a mailbox by
//! value without owning memory outside itself.

use core::fmt;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of payload bytes carried inline by an [`Event`].
pub const PAYLOAD_CAPACITY: usize = 8;

/// Identifier for an event signal.
///
/// Values below [`Signal::USER`] are reserved by the runtime.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signal(pub u16);

impl Signal {
    /// Delivered once to every active object before any other event.
    pub const INIT: Signal = Signal(0);
    /// First signal value available to applications.
    pub const USER: Signal = Signal(1);

    /// Returns the `offset`-th user signal.
    ///
    /// Valid offsets are `0..=u16::MAX - 1`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` leaves the signal range; in a `const` this is a
    /// compile error.
    pub const fn user(offset: u16) -> Self {
        match Self::checked_user(offset) {
            Some(signal) => signal,
            None => panic!("user signal offset out of range"),
        }
    }

    /// Like [`user`](Self::user), returning `None` when `offset` is out of range.
    pub const fn checked_user(offset: u16) -> Option<Self> {
        match Self::USER.0.checked_add(offset) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    pub const fn is_reserved(self) -> bool {
        self.0 < Self::USER.0
    }
}

impl From<u16> for Signal {
    #[inline]
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Signal::INIT => write!(f, "SIG(INIT)"),
            _ => write!(f, "SIG({:#06x})", self.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("payload of {len} bytes exceeds the {PAYLOAD_CAPACITY}-byte event capacity")]
pub struct PayloadError {
    pub len: usize,
}

/// Inline event payload.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    len: u8,
    bytes: [u8; PAYLOAD_CAPACITY],
}

impl Payload {
    pub const EMPTY: Payload = Payload {
        len: 0,
        bytes: [0; PAYLOAD_CAPACITY],
    };

    pub fn from_slice(data: &[u8]) -> Result<Self, PayloadError> {
        if data.len() > PAYLOAD_CAPACITY {
            return Err(PayloadError { len: data.len() });
        }
        let mut bytes = [0; PAYLOAD_CAPACITY];
        bytes[..data.len()].copy_from_slice(data);
        Ok(Self {
            len: data.len() as u8,
            bytes,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A signal plus an optional inline payload.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    signal: Signal,
    payload: Payload,
}

impl Event {
    pub const fn new(signal: Signal) -> Self {
        Self {
            signal,
            payload: Payload::EMPTY,
        }
    }

    pub fn with_payload(signal: Signal, data: &[u8]) -> Result<Self, PayloadError> {
        Ok(Self {
            signal,
            payload: Payload::from_slice(data)?,
        })
    }

    pub(crate) const fn init() -> Self {
        Self::new(Signal::INIT)
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Copy of this event carrying only its signal.
    pub fn signal_only(&self) -> Self {
        Self::new(self.signal)
    }
}

impl From<Signal> for Event {
    fn from(signal: Signal) -> Self {
        Self::new(signal)
    }
}
