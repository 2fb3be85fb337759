//! Control identities and events.
//!
//! Push reports two kinds of physical controls, and both share one identity type:
//! - **Pads** sit on an 8×8 grid and are addressed by [`PadId`] (`x` = column, `y` = row,
//!   `y = 0` is the top row).
//! - **Buttons** are backlit controls outside the grid, addressed by the device's own
//!   numbering ([`ButtonId`]).
//!
//! [`ControlId`] is the sum of the two. Every site that acts on a control (lighting,
//! mapping lookup) matches on it exhaustively.
//!
//! Decoded hardware input becomes a [`ControlEvent`]; the router turns those into
//! [`KeyEvent`]s carrying a [`LogicalKey`] for the consumer's render loop.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of pad columns and rows.
pub const PAD_GRID_SIZE: u8 = 8;

/// One pad on the 8×8 grid.
///
/// Coordinates are validated on construction, so a `PadId` is always on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPad", into = "RawPad")]
pub struct PadId {
    x: u8,
    y: u8,
}

impl PadId {
    /// Checked constructor.
    pub fn new(x: u8, y: u8) -> Result<Self> {
        if x < PAD_GRID_SIZE && y < PAD_GRID_SIZE {
            Ok(Self { x, y })
        } else {
            Err(Error::InvalidPad { x, y })
        }
    }

    /// Constructor for coordinates known at compile time.
    ///
    /// Panics if the coordinate is off the grid (a compile error in const context).
    pub const fn grid(x: u8, y: u8) -> Self {
        assert!(x < PAD_GRID_SIZE && y < PAD_GRID_SIZE, "pad outside the 8x8 grid");
        Self { x, y }
    }

    #[inline]
    pub fn x(&self) -> u8 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> u8 {
        self.y
    }

    /// Iterate every pad, row by row from the top.
    pub fn all() -> impl Iterator<Item = PadId> {
        (0..PAD_GRID_SIZE).flat_map(|y| (0..PAD_GRID_SIZE).map(move |x| PadId { x, y }))
    }
}

#[derive(Serialize, Deserialize)]
struct RawPad {
    x: u8,
    y: u8,
}

impl TryFrom<RawPad> for PadId {
    type Error = Error;

    fn try_from(raw: RawPad) -> Result<Self> {
        PadId::new(raw.x, raw.y)
    }
}

impl From<PadId> for RawPad {
    fn from(pad: PadId) -> Self {
        RawPad { x: pad.x, y: pad.y }
    }
}

/// A backlit button, in the device's MIDI CC numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonId(pub u8);

/// Any physical control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlId {
    Pad(PadId),
    Button(ButtonId),
}

impl From<PadId> for ControlId {
    fn from(pad: PadId) -> Self {
        ControlId::Pad(pad)
    }
}

impl From<ButtonId> for ControlId {
    fn from(button: ButtonId) -> Self {
        ControlId::Button(button)
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlId::Pad(pad) => write!(f, "pad ({}, {})", pad.x, pad.y),
            ControlId::Button(ButtonId(n)) => write!(f, "button {n}"),
        }
    }
}

/// Press/release of one control, decoded from a single MIDI message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub id: ControlId,
    pub pressed: bool,
}

/// Key code understood by the consumer's input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalKey(pub u8);

/// Press/release of a logical key, as queued for the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: LogicalKey,
    pub pressed: bool,
}

/// Doom key codes used by the built-in mapping.
pub mod keys {
    use super::LogicalKey;

    pub const RIGHT_ARROW: LogicalKey = LogicalKey(0xae);
    pub const LEFT_ARROW: LogicalKey = LogicalKey(0xac);
    pub const UP_ARROW: LogicalKey = LogicalKey(0xad);
    pub const DOWN_ARROW: LogicalKey = LogicalKey(0xaf);
    pub const FIRE: LogicalKey = LogicalKey(0xa3);
    pub const USE: LogicalKey = LogicalKey(0xa2);
    pub const ENTER: LogicalKey = LogicalKey(13);
    pub const ESCAPE: LogicalKey = LogicalKey(27);
    pub const LALT: LogicalKey = LogicalKey(0x80 + 0x38);
    pub const RSHIFT: LogicalKey = LogicalKey(0x80 + 0x36);
    pub const F6: LogicalKey = LogicalKey(0x80 + 0x40);
    pub const F9: LogicalKey = LogicalKey(0x80 + 0x43);

    /// ASCII digit key (`'1'`..`'9'`), used for weapon selection.
    pub const fn digit(n: u8) -> LogicalKey {
        LogicalKey(b'0' + n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_new_rejects_off_grid() {
        assert!(PadId::new(7, 7).is_ok());
        assert!(matches!(
            PadId::new(8, 0),
            Err(Error::InvalidPad { x: 8, y: 0 })
        ));
        assert!(PadId::new(0, 8).is_err());
    }

    #[test]
    fn all_pads_cover_grid_once() {
        let pads: Vec<_> = PadId::all().collect();
        assert_eq!(pads.len(), 64);
        assert_eq!(pads[0], PadId::grid(0, 0));
        assert_eq!(pads[9], PadId::grid(1, 1));
        assert_eq!(pads[63], PadId::grid(7, 7));
    }

    #[test]
    fn control_id_equality_distinguishes_kinds() {
        let pad: ControlId = PadId::grid(0, 3).into();
        assert_eq!(pad, ControlId::Pad(PadId::grid(0, 3)));
        assert_ne!(pad, ControlId::Pad(PadId::grid(3, 0)));
        assert_ne!(ControlId::Button(ButtonId(3)), ControlId::Pad(PadId::grid(0, 3)));
    }

    #[test]
    fn control_id_display() {
        assert_eq!(ControlId::Pad(PadId::grid(2, 5)).to_string(), "pad (2, 5)");
        assert_eq!(ControlId::Button(ButtonId(82)).to_string(), "button 82");
    }

    #[test]
    fn digit_keys_are_ascii() {
        assert_eq!(keys::digit(1), LogicalKey(b'1'));
        assert_eq!(keys::digit(7), LogicalKey(b'7'));
    }
}
