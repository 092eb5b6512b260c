//! Error types for the dispatch layer

use std::fmt;

use thiserror::Error;

/// Identity of the physical resource an error concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceId {
    /// A physical pin
    Pin(usize),
    /// A UART module
    Uart(usize),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Pin(pin) => write!(f, "pin {pin}"),
            ResourceId::Uart(uart) => write!(f, "uart {uart}"),
        }
    }
}

/// Errors surfaced by event dispatch and claim registration
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The device reported resource activity the host has no model for.
    ///
    /// Fatal to the session: the host's ownership model and the hardware
    /// have diverged, so the dispatcher closes the link before returning
    /// this.
    #[error("protocol desync on {resource}: {detail}")]
    Desync {
        /// Resource the offending event addressed
        resource: ResourceId,
        /// What the model was missing
        detail: &'static str,
    },

    /// A decoded event's payload is internally inconsistent.
    ///
    /// Same fatality as [`Desync`](Self::Desync): the decoder produced a
    /// frame the host cannot have modeled correctly.
    #[error("protocol desync in \"{kind}\" event: {detail}")]
    MalformedEvent {
        /// Frame kind, as named by the event's `kind()`
        kind: &'static str,
        /// What was inconsistent
        detail: &'static str,
    },

    /// The decoded event kind has no host-side behavior yet
    #[error("no host-side handling for \"{0}\" events")]
    Unsupported(&'static str),

    /// Registration addressed a pin the board does not have
    #[error("pin {pin} out of range (board exposes {limit} pins)")]
    PinOutOfRange {
        /// Requested pin index
        pin: usize,
        /// Number of pins the board exposes
        limit: usize,
    },

    /// Registration addressed a UART module the board does not have
    #[error("uart module {uart} out of range (board exposes {limit} modules)")]
    UartOutOfRange {
        /// Requested module index
        uart: usize,
        /// Number of UART modules the board exposes
        limit: usize,
    },
}

impl DispatchError {
    /// Whether this error ends the session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DispatchError::Desync { .. } | DispatchError::MalformedEvent { .. }
        )
    }
}

/// The link closed before a connection was ever established
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("device link closed before a connection was established")]
pub struct ConnectionFailed;
