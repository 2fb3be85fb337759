//! Error types.
//!
//! Everything fallible in this crate returns [`Error`]. Display transport faults are split
//! out as [`DisplayFault`] because they are latched: once a fault is recorded by the
//! [`DisplayTransport`](crate::display::DisplayTransport), every later `present()` hands the
//! same fault back.
//!
//! Malformed or unrecognized MIDI input is **not** an error. It is dropped during decode and
//! never reaches this type.

use crate::device::{TransferSlot, TransferStatus};
use crate::event::ControlId;
use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Sticky display transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayFault {
    /// The bus rejected a transfer request.
    #[error("{slot} transfer submission rejected: {reason}")]
    Submit { slot: TransferSlot, reason: String },

    /// A transfer completed with a non-success status or a short write.
    #[error("{slot} transfer finished with {status:?} ({actual}/{requested} bytes)")]
    Completion {
        slot: TransferSlot,
        status: TransferStatus,
        requested: usize,
        actual: usize,
    },

    /// Servicing pending completions failed.
    #[error("servicing display transfers failed: {0}")]
    Service(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("usb error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("display device {vendor_id:04x}:{product_id:04x} not found")]
    DisplayNotFound { vendor_id: u16, product_id: u16 },

    #[error("no MIDI {direction} port matching `{pattern}`")]
    MidiPortNotFound {
        direction: &'static str,
        pattern: String,
    },

    #[error("midi error: {0}")]
    Midi(String),

    #[error("display fault: {0}")]
    Display(#[from] DisplayFault),

    #[error("frame data has {actual} pixels, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("control {0} is mapped more than once")]
    DuplicateMapping(ControlId),

    #[error("pad coordinate ({x}, {y}) is outside the 8x8 grid")]
    InvalidPad { x: u8, y: u8 },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start display writer: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid port pattern: {0}")]
    Pattern(#[from] regex::Error),
}
