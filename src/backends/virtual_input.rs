//! In-memory hardware.
//!
//! Stand-ins for the USB display endpoint and the MIDI ports, used by tests and by the
//! `virtual_demo` example. Each backend comes with a cloneable probe that shares its state,
//! so a test can keep inspecting and steering the device after handing the backend itself
//! to a [`DisplayTransport`](crate::display::DisplayTransport) or
//! [`ControlIo`](crate::control::ControlIo).

use crate::device::{
    BulkTransport, Completion, InputConnection, MessageHandler, MidiSink, MidiSource,
    TransferSlot, TransferStatus,
};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct BulkState {
    auto_complete: bool,
    reject: bool,
    submitted: Vec<(TransferSlot, Vec<u8>)>,
    pending: VecDeque<(TransferSlot, Vec<u8>)>,
    finished: VecDeque<Completion>,
}

/// Bulk endpoint that records every submission.
///
/// Transfers stay pending until the probe finishes them, unless the bus was built with
/// [`VirtualBulk::auto_complete`].
#[derive(Default)]
pub struct VirtualBulk {
    state: Arc<Mutex<BulkState>>,
}

impl VirtualBulk {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus whose transfers succeed as soon as they are submitted.
    pub fn auto_complete() -> Self {
        let bus = Self::default();
        lock(&bus.state).auto_complete = true;
        bus
    }

    pub fn probe(&self) -> BulkProbe {
        BulkProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl BulkTransport for VirtualBulk {
    fn submit(&mut self, slot: TransferSlot, data: Vec<u8>) -> Result<()> {
        let mut state = lock(&self.state);
        if state.reject {
            return Err(Error::Usb(rusb::Error::NoDevice));
        }
        state.submitted.push((slot, data.clone()));
        if state.auto_complete {
            let requested = data.len();
            state.finished.push_back(Completion {
                slot,
                status: TransferStatus::Completed,
                requested,
                actual: requested,
                buffer: data,
            });
        } else {
            state.pending.push_back((slot, data));
        }
        Ok(())
    }

    fn handle_events(
        &mut self,
        timeout: Duration,
        on_complete: &mut dyn FnMut(Completion),
    ) -> Result<usize> {
        let finished: Vec<Completion> = lock(&self.state).finished.drain(..).collect();
        if finished.is_empty() && !timeout.is_zero() {
            std::thread::sleep(timeout);
        }
        let count = finished.len();
        for completion in finished {
            on_complete(completion);
        }
        Ok(count)
    }
}

/// Shared view of a [`VirtualBulk`].
#[derive(Clone)]
pub struct BulkProbe {
    state: Arc<Mutex<BulkState>>,
}

impl BulkProbe {
    /// Every transfer submitted so far, in order.
    pub fn submitted(&self) -> Vec<(TransferSlot, Vec<u8>)> {
        lock(&self.state).submitted.clone()
    }

    /// Make further submissions fail (or succeed again).
    pub fn reject_submissions(&self, reject: bool) {
        lock(&self.state).reject = reject;
    }

    /// Finish every pending transfer with `status`, full length.
    pub fn complete_pending(&self, status: TransferStatus) {
        while self.finish_next(status, None) {}
    }

    /// Finish the oldest pending transfer with `status`, full length.
    pub fn complete_next(&self, status: TransferStatus) -> bool {
        self.finish_next(status, None)
    }

    /// Finish the oldest pending transfer successfully but with only `actual` bytes written.
    pub fn complete_next_short(&self, actual: usize) -> bool {
        self.finish_next(TransferStatus::Completed, Some(actual))
    }

    fn finish_next(&self, status: TransferStatus, actual: Option<usize>) -> bool {
        let mut state = lock(&self.state);
        let Some((slot, buffer)) = state.pending.pop_front() else {
            return false;
        };
        let requested = buffer.len();
        state.finished.push_back(Completion {
            slot,
            status,
            requested,
            actual: actual.unwrap_or(if status == TransferStatus::Completed {
                requested
            } else {
                0
            }),
            buffer,
        });
        true
    }
}

/// Inbound MIDI port fed by hand through a [`MidiFeeder`].
#[derive(Default)]
pub struct VirtualMidiIn {
    handler: Arc<Mutex<Option<MessageHandler>>>,
}

impl VirtualMidiIn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feeder(&self) -> MidiFeeder {
        MidiFeeder {
            handler: Arc::clone(&self.handler),
        }
    }
}

struct VirtualConnection {
    handler: Arc<Mutex<Option<MessageHandler>>>,
}

impl Drop for VirtualConnection {
    fn drop(&mut self) {
        lock(&self.handler).take();
    }
}

impl MidiSource for VirtualMidiIn {
    fn connect(self, handler: MessageHandler) -> Result<InputConnection> {
        *lock(&self.handler) = Some(handler);
        Ok(Box::new(VirtualConnection {
            handler: self.handler,
        }))
    }
}

/// Injects raw messages into a connected [`VirtualMidiIn`].
#[derive(Clone)]
pub struct MidiFeeder {
    handler: Arc<Mutex<Option<MessageHandler>>>,
}

impl MidiFeeder {
    /// Deliver one raw message. Returns `false` if nothing is connected.
    pub fn feed(&self, message: &[u8]) -> bool {
        match lock(&self.handler).as_mut() {
            Some(handler) => {
                handler(message);
                true
            }
            None => false,
        }
    }

    pub fn note_on(&self, note: u8, velocity: u8) -> bool {
        self.feed(&[0x90, note, velocity])
    }

    pub fn note_off(&self, note: u8) -> bool {
        self.feed(&[0x80, note, 0])
    }

    pub fn control_change(&self, number: u8, value: u8) -> bool {
        self.feed(&[0xb0, number, value])
    }
}

/// Outbound MIDI port that records what was sent.
#[derive(Default, Clone)]
pub struct RecordingMidiOut {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingMidiOut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first. Clones share the log.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        lock(&self.sent).clone()
    }

    pub fn clear(&self) {
        lock(&self.sent).clear();
    }
}

impl MidiSink for RecordingMidiOut {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        lock(&self.sent).push(message.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feeder_reaches_handler_until_connection_dropped() {
        let input = VirtualMidiIn::new();
        let feeder = input.feeder();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        assert!(!feeder.note_on(36, 100));
        let conn = input
            .connect(Box::new(move |msg| lock(&sink).push(msg.to_vec())))
            .unwrap();
        assert!(feeder.control_change(49, 127));
        drop(conn);
        assert!(!feeder.note_off(36));

        assert_eq!(*lock(&seen), vec![vec![0xb0, 49, 127]]);
    }

    #[test]
    fn auto_complete_bus_finishes_on_next_service() {
        let mut bus = VirtualBulk::auto_complete();
        bus.submit(TransferSlot::Header, vec![1, 2, 3]).unwrap();

        let mut done = Vec::new();
        let n = bus
            .handle_events(Duration::ZERO, &mut |c| done.push((c.slot, c.is_success())))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(done, vec![(TransferSlot::Header, true)]);
    }
}
