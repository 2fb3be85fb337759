//! TOML configuration.
//!
//! Every field has a default matching the Push 3 in standalone mode, so an empty file (or
//! [`Config::default`]) is a working setup. Sections:
//!
//! - `[display]`: USB identity of the display, endpoint, timeouts, optional background
//!   image, and the size of the source frames handed to the session.
//! - `[midi]`: client name and the regex that selects the control port.
//! - `[input]`: modifier/quick-save handling, default light, and the mapping table.
//! - `[hud]`: whether the status bars are drawn.
//!
//! Mapping tables are validated while parsing (duplicates and off-grid pads are errors).

use crate::binding::{MappingTable, DEFAULT_INTENSITY};
use crate::control::Intensity;
use crate::error::{Error, Result};
use crate::event::{keys, ButtonId, LogicalKey};
use crate::router::RouterSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub midi: MidiConfig,
    pub input: InputConfig,
    pub hud: HudConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// USB device class the display reports (miscellaneous).
    pub device_class: u8,
    pub interface: u8,
    /// Bulk OUT endpoint for header and payload.
    pub endpoint: u8,
    pub transfer_timeout_ms: u64,
    /// Upper bound on waiting for an in-flight frame at shutdown.
    pub drain_timeout_secs: u64,
    /// Raw `1024 × 160` little-endian 16-bit frame drawn underneath the game image.
    pub background: Option<PathBuf>,
    pub source_width: usize,
    pub source_height: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0x2982,
            product_id: 0x1969,
            device_class: 0xef,
            interface: 0,
            endpoint: 0x01,
            transfer_timeout_ms: 1000,
            drain_timeout_secs: 30,
            background: None,
            source_width: 320,
            source_height: 200,
        }
    }
}

impl DisplayConfig {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    pub client_name: String,
    /// Regex matched against the full port name.
    pub port_pattern: String,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: "push-bridge".to_string(),
            port_pattern: ".*Ableton Push 3 (Live Port|[0-9][0-9]:0).*".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub modifier_button: ButtonId,
    pub quick_save_key: LogicalKey,
    pub quick_load_key: LogicalKey,
    pub default_intensity: Intensity,
    pub mappings: MappingTable,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            modifier_button: ButtonId(49),
            quick_save_key: keys::F6,
            quick_load_key: keys::F9,
            default_intensity: DEFAULT_INTENSITY,
            mappings: MappingTable::default(),
        }
    }
}

impl InputConfig {
    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            modifier: self.modifier_button,
            quick_save: self.quick_save_key,
            quick_load: self.quick_load_key,
            default_intensity: self.default_intensity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HudConfig {
    pub enabled: bool,
}

impl Default for HudConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
