//! push-bridge: run a fixed-tick game loop on an Ableton Push 3.
//!
//! The crate bridges a render loop (framebuffer in, key events out) to the Push hardware:
//! - the 960×160 display, fed by asynchronous USB bulk transfers ([`display`])
//! - the pads and backlit buttons, spoken to over MIDI ([`control`])
//! - a static control → key mapping that feeds a FIFO of key events ([`router`])
//!
//! [`Session`] ties the three together for the common case. The hardware sits behind the
//! traits in [`device`], so everything also runs on the in-memory
//! [`backends::virtual_input`] devices.

pub mod backends;
pub mod binding;
pub mod config;
pub mod control;
pub mod device;
pub mod display;
pub mod error;
pub mod event;
pub mod hud;
pub mod logger;
pub mod metadata;
pub mod router;
pub mod session;

pub use binding::{InputMapping, MappingTable};
pub use config::Config;
pub use control::ControlIo;
pub use display::{DisplayTransport, PresentOutcome};
pub use error::{DisplayFault, Error, Result};
pub use event::*;
pub use hud::PlayerStatus;
pub use router::Router;
pub use session::Session;
