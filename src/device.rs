//! Hardware seams.
//!
//! The core never talks to `rusb` or `midir` directly. It goes through three small traits so
//! the same state machines run against real hardware (`backends::usb`, `backends::midi`)
//! and against the in-memory `backends::virtual_input` used by tests and demos.
//!
//! ## Bulk transfers
//! A [`BulkTransport`] accepts owned buffers and later hands them back in a [`Completion`].
//! Completions are only ever delivered from [`BulkTransport::handle_events`], on the
//! caller's thread, so the caller decides exactly when transfer state may change.

use crate::error::Result;
use std::fmt;
use std::time::Duration;

/// Which half of a display frame a transfer carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferSlot {
    /// The fixed 16-byte frame header.
    Header,
    /// The pixel payload.
    Payload,
}

impl fmt::Display for TransferSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferSlot::Header => f.write_str("header"),
            TransferSlot::Payload => f.write_str("payload"),
        }
    }
}

/// Final status of one bulk transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Completed,
    TimedOut,
    Stalled,
    NoDevice,
    Cancelled,
    Error,
}

/// A finished transfer, returned with the buffer that was submitted.
#[derive(Debug)]
pub struct Completion {
    pub slot: TransferSlot,
    pub status: TransferStatus,
    /// Bytes requested at submission.
    pub requested: usize,
    /// Bytes the device actually accepted.
    pub actual: usize,
    pub buffer: Vec<u8>,
}

impl Completion {
    /// `true` for a complete, full-length write.
    pub fn is_success(&self) -> bool {
        self.status == TransferStatus::Completed && self.actual == self.requested
    }
}

/// Asynchronous bulk OUT endpoint.
pub trait BulkTransport {
    /// Queue `data` for transmission. Transfers are sent in submission order.
    fn submit(&mut self, slot: TransferSlot, data: Vec<u8>) -> Result<()>;

    /// Deliver finished transfers to `on_complete`, waiting at most `timeout` for the first
    /// one. A zero timeout never blocks. Returns the number of completions delivered.
    fn handle_events(
        &mut self,
        timeout: Duration,
        on_complete: &mut dyn FnMut(Completion),
    ) -> Result<usize>;
}

/// Outbound MIDI port.
pub trait MidiSink {
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

/// Handler invoked with every raw inbound MIDI message.
pub type MessageHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Keeps an inbound MIDI connection open until dropped.
pub type InputConnection = Box<dyn Send>;

/// Inbound MIDI port.
///
/// The handler may run on a thread owned by the MIDI library.
pub trait MidiSource {
    fn connect(self, handler: MessageHandler) -> Result<InputConnection>;
}
