//! Hardware backends.
//!
//! Implementations of the [`device`](crate::device) seams:
//! - **`usb`**: the Push display's bulk endpoint through `rusb`
//! - **`midi`**: the Push control port through `midir`
//! - **`virtual_input`**: in-memory stand-ins for tests and demos
//!
//! Discovery is one-shot. If the hardware disappears later, the next display transfer or
//! MIDI send fails and the session has to be rebuilt.

pub mod midi;
pub mod usb;
pub mod virtual_input;

use crate::config::Config;
use crate::error::Result;
use crate::metadata::DeviceMeta;

/// Unified discovery report across both buses.
///
/// Entries with `matched == true` are what [`Session::open`](crate::session::Session::open)
/// would pick.
pub fn probe_devices(config: &Config) -> Result<Vec<DeviceMeta>> {
    let mut out = usb::list_devices(&config.display)?;
    out.extend(midi::list_ports(&config.midi)?);
    Ok(out)
}
