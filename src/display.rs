//! Push display transport.
//!
//! [`DisplayTransport`] keeps a software framebuffer in the display's native pixel format and
//! pushes it to the device as one frame = two chained bulk writes: a 16-byte
//! [`FRAME_HEADER`] followed by the full payload.
//!
//! ## Frame pipeline
//! 1. Renderers compose the framebuffer with [`DisplayTransport::blit`] (clipped, converts
//!    `0x00RRGGBB` to packed 5-6-5) or replace it wholesale with
//!    [`DisplayTransport::blit_raw`].
//! 2. [`DisplayTransport::present`] services finished transfers, then either drops the frame
//!    (a transfer is still in flight) or copies the framebuffer into the staging buffer,
//!    applies the signal-shaping XOR, and submits header + payload.
//!
//! At most one frame is ever in flight. The display refreshes faster than the render loop
//! ticks, so dropping a frame now and then is preferred over blocking the loop.
//!
//! ## Faults
//! A rejected submission, a failed or short completion, or a failed service call is latched
//! as a [`DisplayFault`]. From then on every `present()` returns that same fault without
//! touching the bus; the transport has to be recreated. Teardown still waits for every
//! submitted transfer to hand its buffer back, fault or not.

use crate::device::{BulkTransport, Completion, TransferSlot};
use crate::error::{DisplayFault, Error, Result};
use std::time::{Duration, Instant};

/// Visible width in pixels.
pub const SCREEN_WIDTH: usize = 960;
/// Visible height in pixels.
pub const SCREEN_HEIGHT: usize = 160;
/// Pixels per line on the wire (visible width plus padding).
pub const SCREEN_STRIDE: usize = 1024;
/// Pixels in one full frame.
pub const FRAME_PIXELS: usize = SCREEN_STRIDE * SCREEN_HEIGHT;
/// Bytes in one payload transfer.
pub const PAYLOAD_LEN: usize = FRAME_PIXELS * 2;

/// Marks the start of a frame.
pub const FRAME_HEADER: [u8; 16] = [
    0xff, 0xcc, 0xaa, 0x88, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00,
];

/// XOR mask applied to every 32-bit little-endian word of the payload.
pub const SIGNAL_SHAPING_PATTERN: u32 = 0xffe7_f3e7;

/// Pack `0x00RRGGBB` into the display's 16-bit format.
///
/// Blue lands in the top 5 bits, green in the middle 6, red in the low 5; each channel keeps
/// its high bits.
#[inline]
pub fn pack_pixel(color: u32) -> u16 {
    let r = (color >> 16) & 0xff;
    let g = (color >> 8) & 0xff;
    let b = color & 0xff;
    (((b & 0xf8) << 8) | ((g & 0xfc) << 3) | (r >> 3)) as u16
}

/// Apply the signal-shaping XOR in place. Applying it twice restores the input.
///
/// Trailing bytes that do not fill a whole word are left alone.
pub fn apply_signal_shaping(buffer: &mut [u8]) {
    let mask = SIGNAL_SHAPING_PATTERN.to_le_bytes();
    for word in buffer.chunks_exact_mut(4) {
        for (byte, m) in word.iter_mut().zip(mask) {
            *byte ^= m;
        }
    }
}

/// Source rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// What `present()` did with the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Header and payload were submitted.
    Submitted,
    /// The previous frame was still in flight; nothing was sent.
    Dropped,
}

/// Transfer bookkeeping, mutated by completions and read by the submission path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransferState {
    pub in_progress: bool,
    /// Transfers handed to the bus whose completion has not been seen yet.
    pub outstanding: usize,
    pub fault: Option<DisplayFault>,
}

impl TransferState {
    /// Completion handler. Runs inside `BulkTransport::handle_events`.
    ///
    /// Completions are always counted, even after a fault, so teardown knows when the bus
    /// has handed every buffer back.
    fn on_complete(&mut self, completion: &Completion) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if !completion.is_success() {
            if self.fault.is_none() {
                self.fault = Some(DisplayFault::Completion {
                    slot: completion.slot,
                    status: completion.status,
                    requested: completion.requested,
                    actual: completion.actual,
                });
            }
            return;
        }
        if completion.slot == TransferSlot::Payload {
            self.in_progress = false;
        }
    }
}

/// Frame counters, for diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub submitted: u64,
    pub dropped: u64,
}

/// Double-buffered display writer.
pub struct DisplayTransport<B: BulkTransport> {
    bus: B,
    framebuffer: Vec<u16>,
    // `None` while the buffer is owned by the bus.
    staging: Option<Vec<u8>>,
    header: Option<Vec<u8>>,
    state: TransferState,
    stats: FrameStats,
    drain_timeout: Duration,
}

impl<B: BulkTransport> DisplayTransport<B> {
    /// Wrap an opened bulk endpoint. The framebuffer starts black.
    ///
    /// `drain_timeout` bounds how long teardown waits for an in-flight frame.
    pub fn new(bus: B, drain_timeout: Duration) -> Self {
        Self {
            bus,
            framebuffer: vec![0; FRAME_PIXELS],
            staging: Some(vec![0; PAYLOAD_LEN]),
            header: Some(FRAME_HEADER.to_vec()),
            state: TransferState::default(),
            stats: FrameStats::default(),
            drain_timeout,
        }
    }

    /// Copy `rect` of a `0x00RRGGBB` source image (`src_width` pixels per line) to
    /// `dest = (x, y)` on screen, converting pixels as they go.
    ///
    /// The copy is clipped to the visible screen and to the source image; nothing outside
    /// either is read or written.
    pub fn blit(&mut self, src: &[u32], src_width: usize, rect: Rect, dest: (usize, usize)) {
        let (dest_x, dest_y) = dest;
        if src_width == 0 || dest_x >= SCREEN_WIDTH || dest_y >= SCREEN_HEIGHT {
            return;
        }
        let src_height = src.len() / src_width;
        if rect.x >= src_width || rect.y >= src_height {
            return;
        }

        let width = rect
            .width
            .min(SCREEN_WIDTH - dest_x)
            .min(src_width - rect.x);
        let height = rect
            .height
            .min(SCREEN_HEIGHT - dest_y)
            .min(src_height - rect.y);

        for row in 0..height {
            let src_start = (rect.y + row) * src_width + rect.x;
            let dst_start = (dest_y + row) * SCREEN_STRIDE + dest_x;
            let src_line = &src[src_start..src_start + width];
            let dst_line = &mut self.framebuffer[dst_start..dst_start + width];
            for (dst, &color) in dst_line.iter_mut().zip(src_line) {
                *dst = pack_pixel(color);
            }
        }
    }

    /// Replace the whole framebuffer with pre-packed pixels (`SCREEN_STRIDE × SCREEN_HEIGHT`).
    pub fn blit_raw(&mut self, pixels: &[u16]) -> Result<()> {
        if pixels.len() != FRAME_PIXELS {
            return Err(Error::FrameSize {
                expected: FRAME_PIXELS,
                actual: pixels.len(),
            });
        }
        self.framebuffer.copy_from_slice(pixels);
        Ok(())
    }

    /// Try to send the current framebuffer. Never blocks.
    ///
    /// Returns `Ok(Dropped)` while the previous frame is in flight, and the latched fault
    /// once anything has gone wrong.
    pub fn present(&mut self) -> Result<PresentOutcome> {
        if self.state.fault.is_none() {
            self.service(Duration::ZERO);
        }

        if let Some(fault) = &self.state.fault {
            return Err(fault.clone().into());
        }

        if self.state.in_progress {
            self.stats.dropped += 1;
            log::debug!("display busy, dropping frame ({} dropped)", self.stats.dropped);
            return Ok(PresentOutcome::Dropped);
        }

        let mut staging = self.staging.take().unwrap_or_else(|| vec![0; PAYLOAD_LEN]);
        for (bytes, pixel) in staging.chunks_exact_mut(2).zip(&self.framebuffer) {
            bytes.copy_from_slice(&pixel.to_le_bytes());
        }
        apply_signal_shaping(&mut staging);

        let header = self.header.take().unwrap_or_else(|| FRAME_HEADER.to_vec());
        if let Err(err) = self.bus.submit(TransferSlot::Header, header) {
            return Err(self.latch_submit(TransferSlot::Header, err));
        }
        self.state.outstanding += 1;
        if let Err(err) = self.bus.submit(TransferSlot::Payload, staging) {
            return Err(self.latch_submit(TransferSlot::Payload, err));
        }
        self.state.outstanding += 1;

        self.state.in_progress = true;
        self.stats.submitted += 1;
        Ok(PresentOutcome::Submitted)
    }

    /// Transfer bookkeeping as of the last service call.
    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Current framebuffer contents, packed, `SCREEN_STRIDE` pixels per line.
    pub fn framebuffer(&self) -> &[u16] {
        &self.framebuffer
    }

    /// Wait up to the drain timeout for every submitted transfer to complete.
    ///
    /// A latched fault does not stop the wait: the bus may still own a queued payload.
    /// Returns `true` if nothing is left outstanding.
    pub fn drain(&mut self) -> bool {
        let deadline = Instant::now() + self.drain_timeout;
        while self.state.outstanding > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.service(remaining) {
                break;
            }
        }
        self.state.outstanding == 0
    }

    /// Run the completion handler for every finished transfer.
    ///
    /// Returns `false` if the bus itself failed, after which nothing more will complete.
    fn service(&mut self, timeout: Duration) -> bool {
        let Self {
            bus,
            state,
            staging,
            header,
            ..
        } = self;
        let was_faulted = state.fault.is_some();

        let result = bus.handle_events(timeout, &mut |completion| {
            state.on_complete(&completion);
            match completion.slot {
                TransferSlot::Header => *header = Some(completion.buffer),
                TransferSlot::Payload => *staging = Some(completion.buffer),
            }
        });

        let serviceable = match result {
            Ok(_) => true,
            Err(err) => {
                if state.fault.is_none() {
                    state.fault = Some(DisplayFault::Service(err.to_string()));
                }
                false
            }
        };
        if let (false, Some(fault)) = (was_faulted, &state.fault) {
            log::error!("display transport failed: {fault}");
        }
        serviceable
    }

    fn latch_submit(&mut self, slot: TransferSlot, err: Error) -> Error {
        let fault = DisplayFault::Submit {
            slot,
            reason: err.to_string(),
        };
        log::error!("display transport failed: {fault}");
        self.state.fault = Some(fault.clone());
        fault.into()
    }
}

impl<B: BulkTransport> Drop for DisplayTransport<B> {
    fn drop(&mut self) {
        if self.state.outstanding > 0 && !self.drain() {
            log::warn!(
                "{} display transfer(s) still outstanding after {:?}, releasing anyway",
                self.state.outstanding,
                self.drain_timeout
            );
        }
    }
}
