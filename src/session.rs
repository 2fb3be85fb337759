//! Render-loop façade.
//!
//! A [`Session`] owns everything the game loop talks to: the display transport, the
//! control port and the key-event router. It is built once at startup and dropped once at
//! shutdown; dropping it waits (bounded by `drain_timeout_secs`) for an in-flight frame
//! before the USB device is released.
//!
//! Per tick the loop calls [`Session::draw_frame`] with the game's framebuffer and drains
//! [`Session::fetch_event`] until it returns `None`. Any `Err` from either is fatal.
//!
//! # Example
//! ```no_run
//! use push_bridge::{Config, Session};
//!
//! let mut session = Session::open(&Config::default()).expect("open Push");
//! let frame = vec![0u32; 320 * 200];
//! loop {
//!     session.draw_frame(&frame).expect("display failed");
//!     while let Some(event) = session.fetch_event() {
//!         println!("{:?}", event);
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(28));
//! }
//! ```

use crate::backends::midi::{self, PushMidiOut};
use crate::backends::usb::UsbBulk;
use crate::config::Config;
use crate::control::ControlIo;
use crate::device::{BulkTransport, MidiSink, MidiSource};
use crate::display::{DisplayTransport, PresentOutcome, Rect, FRAME_PIXELS, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::{Error, Result};
use crate::event::KeyEvent;
use crate::hud::{PlayerStatus, StatusBars};
use crate::router::Router;
use std::path::Path;

/// Where a source frame lands on the wide, short Push screen.
///
/// The source is centred horizontally. Rows that do not fit under the screen height are
/// drawn as a second strip directly to the right of the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub source_width: usize,
    pub source_height: usize,
}

impl FrameLayout {
    pub fn new(source_width: usize, source_height: usize) -> Self {
        Self {
            source_width,
            source_height,
        }
    }

    /// `(source rect, screen position)` pairs, main strip first.
    pub fn strips(&self) -> Vec<(Rect, (usize, usize))> {
        let left = SCREEN_WIDTH.saturating_sub(self.source_width) / 2;
        let main_rows = self.source_height.min(SCREEN_HEIGHT);

        let mut strips = vec![(Rect::new(0, 0, self.source_width, main_rows), (left, 0))];
        if self.source_height > main_rows {
            strips.push((
                Rect::new(0, main_rows, self.source_width, self.source_height - main_rows),
                (left + self.source_width, 0),
            ));
        }
        strips
    }
}

/// Load a raw background frame: `SCREEN_STRIDE × SCREEN_HEIGHT` little-endian pixels.
pub fn load_background(path: &Path) -> Result<Vec<u16>> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.len() != FRAME_PIXELS * 2 {
        return Err(Error::FrameSize {
            expected: FRAME_PIXELS,
            actual: bytes.len() / 2,
        });
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Push hardware plus key routing, owned by the render loop.
pub struct Session<B: BulkTransport, O: MidiSink> {
    router: Router,
    control: ControlIo<O>,
    display: DisplayTransport<B>,
    status: Option<StatusBars>,
    layout: FrameLayout,
}

impl Session<UsbBulk, PushMidiOut> {
    /// Find the Push, connect both buses and prepare the lights and screen.
    pub fn open(config: &Config) -> Result<Self> {
        let (midi_in, midi_out) = midi::open(&config.midi)?;
        let bus = UsbBulk::open(&config.display)?;
        Self::with_backends(config, bus, midi_in, midi_out)
    }
}

impl<B: BulkTransport, O: MidiSink> Session<B, O> {
    /// Build a session on already-opened backends.
    ///
    /// Order matters: the router exists before input is connected, every light is cleared
    /// before the mapped controls are lit, and the background is in place before the first
    /// frame.
    pub fn with_backends<I: MidiSource>(
        config: &Config,
        bus: B,
        midi_in: I,
        midi_out: O,
    ) -> Result<Self> {
        let router = Router::new(config.input.mappings.clone(), config.input.router_settings());
        let mut control = ControlIo::new(midi_in, midi_out, router.handler())?;
        router.light_controls(&mut control)?;

        let mut display = DisplayTransport::new(bus, config.display.drain_timeout());
        if let Some(path) = &config.display.background {
            display.blit_raw(&load_background(path)?)?;
            log::info!("loaded background {}", path.display());
        }

        log::info!(
            "session ready: {} mapped controls, status bars {}",
            config.input.mappings.len(),
            if config.hud.enabled { "on" } else { "off" }
        );

        Ok(Self {
            router,
            control,
            display,
            status: config.hud.enabled.then(StatusBars::new),
            layout: FrameLayout::new(config.display.source_width, config.display.source_height),
        })
    }

    /// Compose `frame` (`0x00RRGGBB`, `source_width` pixels per line) onto the screen and
    /// try to send it.
    pub fn draw_frame(&mut self, frame: &[u32]) -> Result<PresentOutcome> {
        let expected = self.layout.source_width * self.layout.source_height;
        if frame.len() < expected {
            return Err(Error::FrameSize {
                expected,
                actual: frame.len(),
            });
        }

        for (rect, dest) in self.layout.strips() {
            self.display.blit(frame, self.layout.source_width, rect, dest);
        }
        self.display.present()
    }

    /// Show player status on the button bars, if enabled.
    pub fn update_status(&mut self, status: PlayerStatus) -> Result<()> {
        match &mut self.status {
            Some(bars) => bars.update(&mut self.control, status),
            None => Ok(()),
        }
    }

    /// Oldest pending key event.
    pub fn fetch_event(&self) -> Option<KeyEvent> {
        self.router.fetch_event()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn display(&self) -> &DisplayTransport<B> {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplayTransport<B> {
        &mut self.display
    }

    pub fn control_mut(&mut self) -> &mut ControlIo<O> {
        &mut self.control
    }
}
