//! Player status on the button LEDs.
//!
//! Three rows of eight buttons double as bar graphs: health on the buttons above the
//! display, armor on the ones below it, ammo on the scene-launch column. Each row is
//! numbered consecutively, so a bar is just `first..first + 8`.
//!
//! Bars are only re-sent when their lit count changes. [`StatusBars`] starts with no
//! last-sent counts rather than a snapshot of the player, so the first update always sends
//! all three bars, even ones that end up dark.

use crate::control::{ControlIo, Intensity};
use crate::device::MidiSink;
use crate::error::Result;
use crate::event::ButtonId;

/// Buttons per bar.
pub const BAR_LENGTH: u8 = 8;

const HEALTH_FIRST: u8 = 102;
const ARMOR_FIRST: u8 = 20;
const AMMO_FIRST: u8 = 36;

const CRITICAL: Intensity = 127;
const WARNING: Intensity = 7;
const HEALTHY: Intensity = 126;

/// Values read from the game each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerStatus {
    pub health: i32,
    pub armor: i32,
    pub ammo: i32,
    /// Capacity of the current weapon's ammo type; `0` for weapons without ammo.
    pub max_ammo: i32,
}

/// Scale `value / max` to `0..=BAR_LENGTH` lit buttons.
pub fn lit_count(value: i32, max: i32) -> u8 {
    if max <= 0 {
        return 0;
    }
    let scaled = (value as f32 / max as f32 * f32::from(BAR_LENGTH)).round();
    scaled.clamp(0.0, f32::from(BAR_LENGTH)) as u8
}

/// Colour for a bar with `lit` buttons on.
pub fn bar_intensity(lit: u8) -> Intensity {
    match lit {
        0..=2 => CRITICAL,
        3..=5 => WARNING,
        _ => HEALTHY,
    }
}

/// Last-sent state of the three bars.
#[derive(Debug, Default)]
pub struct StatusBars {
    health: Option<u8>,
    armor: Option<u8>,
    ammo: Option<u8>,
}

impl StatusBars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh whichever bars changed.
    pub fn update<O: MidiSink>(
        &mut self,
        control: &mut ControlIo<O>,
        status: PlayerStatus,
    ) -> Result<()> {
        let bars = [
            (&mut self.health, lit_count(status.health, 100), HEALTH_FIRST),
            (&mut self.armor, lit_count(status.armor, 100), ARMOR_FIRST),
            (&mut self.ammo, lit_count(status.ammo, status.max_ammo), AMMO_FIRST),
        ];

        for (last, lit, first) in bars {
            if *last == Some(lit) {
                continue;
            }
            set_bar(control, first, lit)?;
            *last = Some(lit);
        }
        Ok(())
    }
}

fn set_bar<O: MidiSink>(control: &mut ControlIo<O>, first: u8, lit: u8) -> Result<()> {
    let intensity = bar_intensity(lit);
    for i in 0..BAR_LENGTH {
        let value = if i < lit { intensity } else { 0 };
        control.set_button_light(ButtonId(first + i), value)?;
    }
    Ok(())
}
