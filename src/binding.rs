//! Control → key bindings.
//!
//! A [`MappingTable`] lists every control that produces a key event. Controls not in the
//! table are ignored by the router. Each control may appear at most once; this is checked
//! when the table is built, so lookups are a plain first match.
//!
//! Tables are serializable so they can live in the `[input]` section of the config file:
//!
//! ```toml
//! [[input.mappings]]
//! control = { pad = { x = 0, y = 3 } }
//! key = 0xa3
//!
//! [[input.mappings]]
//! control = { button = 82 }
//! key = 0xc0
//! intensity = 122
//! ```

use crate::control::Intensity;
use crate::error::{Error, Result};
use crate::event::{keys, ButtonId, ControlId, LogicalKey, PadId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Light used for mapped controls without an explicit intensity.
pub const DEFAULT_INTENSITY: Intensity = 122;

/// Slightly dimmer light for the weapon-select pads.
const WEAPON_INTENSITY: Intensity = 121;

/// Maps one control to a logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMapping {
    pub control: ControlId,
    pub key: LogicalKey,
    /// Light for the control; `None` uses the router's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Intensity>,
}

impl InputMapping {
    pub const fn new(control: ControlId, key: LogicalKey) -> Self {
        Self {
            control,
            key,
            intensity: None,
        }
    }

    pub const fn with_intensity(mut self, intensity: Intensity) -> Self {
        self.intensity = Some(intensity);
        self
    }
}

/// Validated, immutable list of mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MappingTable {
    entries: Vec<InputMapping>,
}

impl MappingTable {
    /// Build a table, rejecting any control mapped twice.
    pub fn new(entries: Vec<InputMapping>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for mapping in &entries {
            if !seen.insert(mapping.control) {
                return Err(Error::DuplicateMapping(mapping.control));
            }
        }
        Ok(Self { entries })
    }

    /// Mapping for `control`, if any.
    pub fn lookup(&self, control: ControlId) -> Option<&InputMapping> {
        self.entries.iter().find(|m| m.control == control)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputMapping> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for MappingTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<InputMapping>::deserialize(deserializer)?;
        MappingTable::new(entries).map_err(serde::de::Error::custom)
    }
}

impl Default for MappingTable {
    /// The stock Doom layout: movement on the right-hand pads, fire/strafe/use/run on the
    /// left, weapons along the top row, menu keys on the buttons.
    fn default() -> Self {
        let pad = |x, y, key| InputMapping::new(ControlId::Pad(PadId::grid(x, y)), key);
        let button = |n, key| InputMapping::new(ControlId::Button(ButtonId(n)), key);

        let mut entries = vec![
            pad(0, 3, keys::FIRE),
            pad(1, 3, keys::LALT),
            pad(2, 3, keys::USE),
            pad(2, 5, keys::RSHIFT),
            pad(6, 2, keys::UP_ARROW),
            pad(5, 3, keys::LEFT_ARROW),
            pad(6, 3, keys::DOWN_ARROW),
            pad(7, 3, keys::RIGHT_ARROW),
            button(91, keys::ENTER),
            button(33, keys::ESCAPE),
            button(46, keys::UP_ARROW),
            button(47, keys::DOWN_ARROW),
            button(82, keys::F6),
        ];
        entries.extend(
            (0..7).map(|x| pad(x, 0, keys::digit(x + 1)).with_intensity(WEAPON_INTENSITY)),
        );

        Self { entries }
    }
}
