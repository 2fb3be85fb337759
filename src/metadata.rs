//! Descriptions of discovered hardware.
//!
//! [`DeviceMeta`] is a lightweight, serializable snapshot of one USB device or MIDI port,
//! used by discovery logging and the `diagnose` example. Backends fill in what they know;
//! unknown fields stay `None`.
//!
//! # Conventions
//! - `bus` is `"usb"` for the display and `"midi-in"` / `"midi-out"` for control ports.
//! - `matched` tells whether the entry satisfies the configured vendor/product ids or port
//!   pattern, i.e. whether a session would pick it.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// High-level bus classification.
    pub bus: String,

    /// USB Vendor ID (VID), if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<u16>,

    /// USB Product ID (PID), if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u16>,

    /// USB device class code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<u8>,

    /// USB bus number and address, e.g. `"001:004"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// MIDI port name as reported by the OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_name: Option<String>,

    pub matched: bool,
}

impl std::fmt::Display for DeviceMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.bus)?;
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            write!(f, " {vid:04x}:{pid:04x}")?;
        }
        if let Some(address) = &self.address {
            write!(f, " @{address}")?;
        }
        if let Some(name) = &self.port_name {
            write!(f, " \"{name}\"")?;
        }
        if self.matched {
            f.write_str(" [match]")?;
        }
        Ok(())
    }
}
