//! Push display over `rusb`.
//!
//! `rusb` only offers blocking bulk writes, so [`UsbBulk`] hands submitted buffers to a
//! writer thread that owns the device handle and performs the writes in submission order.
//! Finished writes are parked in a channel and only surface when the caller runs
//! [`BulkTransport::handle_events`], on the caller's thread. The transport state machine
//! therefore sees completions exactly where it would with a native async API: inside its
//! own service call.
//!
//! The writer stops after a write reports that the device is gone; the next
//! `handle_events` then fails.
//!
//! This module does **not**:
//! - retry or reconnect after a failed write
//! - support more than one display

use crate::config::DisplayConfig;
use crate::device::{BulkTransport, Completion, TransferSlot, TransferStatus};
use crate::error::{Error, Result};
use crate::metadata::DeviceMeta;
use rusb::{DeviceHandle, GlobalContext, UsbContext};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

struct Job {
    slot: TransferSlot,
    data: Vec<u8>,
}

/// Bulk OUT endpoint of the Push display.
pub struct UsbBulk {
    jobs: Option<Sender<Job>>,
    done: Receiver<Completion>,
    writer: Option<JoinHandle<()>>,
}

/// Describe every USB device on the bus, flagging the ones matching `config`.
pub fn list_devices(config: &DisplayConfig) -> Result<Vec<DeviceMeta>> {
    let mut out = Vec::new();
    for device in GlobalContext::default().devices()?.iter() {
        let descriptor = device.device_descriptor()?;
        out.push(DeviceMeta {
            bus: "usb".to_string(),
            vid: Some(descriptor.vendor_id()),
            pid: Some(descriptor.product_id()),
            class: Some(descriptor.class_code()),
            address: Some(format!("{:03}:{:03}", device.bus_number(), device.address())),
            port_name: None,
            matched: is_display(config, &descriptor),
        });
    }
    Ok(out)
}

fn is_display(config: &DisplayConfig, descriptor: &rusb::DeviceDescriptor) -> bool {
    descriptor.vendor_id() == config.vendor_id
        && descriptor.product_id() == config.product_id
        && descriptor.class_code() == config.device_class
}

fn open_display(config: &DisplayConfig) -> Result<DeviceHandle<GlobalContext>> {
    let not_found = Error::DisplayNotFound {
        vendor_id: config.vendor_id,
        product_id: config.product_id,
    };

    for device in GlobalContext::default().devices()?.iter() {
        let descriptor = device.device_descriptor()?;
        if !is_display(config, &descriptor) {
            continue;
        }

        let handle = device.open()?;
        handle.claim_interface(config.interface)?;
        log::info!(
            "opened display {:04x}:{:04x} on bus {:03} address {:03}",
            config.vendor_id,
            config.product_id,
            device.bus_number(),
            device.address()
        );
        return Ok(handle);
    }

    Err(not_found)
}

fn status_of(err: rusb::Error) -> TransferStatus {
    match err {
        rusb::Error::Timeout => TransferStatus::TimedOut,
        rusb::Error::Pipe => TransferStatus::Stalled,
        rusb::Error::NoDevice => TransferStatus::NoDevice,
        rusb::Error::Interrupted => TransferStatus::Cancelled,
        _ => TransferStatus::Error,
    }
}

/// Blocking half of the bus, owned by the writer thread.
trait BulkWriter: Send + 'static {
    fn write(&mut self, data: &[u8]) -> rusb::Result<usize>;
}

/// The claimed display interface. Released when the writer thread ends.
struct Endpoint {
    handle: DeviceHandle<GlobalContext>,
    interface: u8,
    address: u8,
    timeout: Duration,
}

impl BulkWriter for Endpoint {
    fn write(&mut self, data: &[u8]) -> rusb::Result<usize> {
        self.handle.write_bulk(self.address, data, self.timeout)
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        if let Err(err) = self.handle.release_interface(self.interface) {
            log::warn!("failed to release display interface: {err}");
        }
    }
}

/// Perform jobs in order until the job channel closes, the completion channel closes, or
/// the device is gone.
fn run_writer<W: BulkWriter>(mut writer: W, jobs: Receiver<Job>, done: Sender<Completion>) {
    for Job { slot, data } in jobs {
        let requested = data.len();
        let (status, actual) = match writer.write(&data) {
            Ok(n) => (TransferStatus::Completed, n),
            Err(err) => {
                log::debug!("{slot} bulk write failed: {err}");
                (status_of(err), 0)
            }
        };

        #[cfg(feature = "debug-log")]
        log::trace!("{slot} transfer {actual}/{requested} bytes, {status:?}");

        let completion = Completion {
            slot,
            status,
            requested,
            actual,
            buffer: data,
        };
        if done.send(completion).is_err() || status == TransferStatus::NoDevice {
            break;
        }
    }
}

impl UsbBulk {
    /// Find the display, claim its interface and start the writer thread.
    pub fn open(config: &DisplayConfig) -> Result<Self> {
        let endpoint = Endpoint {
            handle: open_display(config)?,
            interface: config.interface,
            address: config.endpoint,
            timeout: config.transfer_timeout(),
        };
        Self::spawn(endpoint)
    }

    fn spawn<W: BulkWriter>(writer: W) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let writer = std::thread::Builder::new()
            .name("push-display".to_string())
            .spawn(move || run_writer(writer, job_rx, done_tx))
            .map_err(Error::Spawn)?;

        Ok(Self {
            jobs: Some(job_tx),
            done: done_rx,
            writer: Some(writer),
        })
    }
}

impl BulkTransport for UsbBulk {
    fn submit(&mut self, slot: TransferSlot, data: Vec<u8>) -> Result<()> {
        let jobs = self.jobs.as_ref().ok_or(Error::Usb(rusb::Error::NoDevice))?;
        jobs.send(Job { slot, data })
            .map_err(|_| Error::Usb(rusb::Error::NoDevice))
    }

    fn handle_events(
        &mut self,
        timeout: Duration,
        on_complete: &mut dyn FnMut(Completion),
    ) -> Result<usize> {
        let mut delivered = 0;

        if !timeout.is_zero() {
            match self.done.recv_timeout(timeout) {
                Ok(completion) => {
                    on_complete(completion);
                    delivered += 1;
                }
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::Usb(rusb::Error::NoDevice))
                }
            }
        }

        loop {
            match self.done.try_recv() {
                Ok(completion) => {
                    on_complete(completion);
                    delivered += 1;
                }
                Err(TryRecvError::Empty) => return Ok(delivered),
                Err(TryRecvError::Disconnected) => {
                    return if delivered > 0 {
                        Ok(delivered)
                    } else {
                        Err(Error::Usb(rusb::Error::NoDevice))
                    };
                }
            }
        }
    }
}

impl Drop for UsbBulk {
    fn drop(&mut self) {
        // Closing the job channel ends the writer after its current write.
        self.jobs.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                log::error!("display writer thread panicked");
            }
        }
    }
}
