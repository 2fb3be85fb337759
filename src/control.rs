//! Pad/button I/O over MIDI.
//!
//! Push speaks plain 3-byte channel messages on its control port:
//!
//! | Message              | Direction | Meaning                                   |
//! |----------------------|-----------|-------------------------------------------|
//! | `0x90 note vel`      | in / out  | pad pressed / pad light on (`vel` = colour) |
//! | `0x80 note 0`        | in / out  | pad released / pad light off              |
//! | `0xB0 number value`  | in / out  | button pressed (`value == 127`) or released / button light |
//!
//! Pads occupy notes `36..=99`, eight per row. [`PAD_ROW_BASE`] gives the first note of each
//! row, indexed from the top of the grid, so the bottom row starts at 36.
//!
//! Lights are fire-and-forget; nothing here tracks what is currently lit.

use crate::device::{InputConnection, MidiSink, MidiSource};
use crate::error::Result;
use crate::event::{ButtonId, ControlEvent, ControlId, PadId};

/// First note number of each pad row, `y = 0` (top) first.
pub const PAD_ROW_BASE: [u8; 8] = [92, 84, 76, 68, 60, 52, 44, 36];

/// Note numbers that belong to pads.
pub const PAD_NOTES: std::ops::RangeInclusive<u8> = 36..=99;

/// Button value reported while a button is held down.
pub const BUTTON_PRESSED_VALUE: u8 = 127;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xb0;

/// Button numbers in the valid range that have no physical button.
const UNUSED_BUTTONS: [u8; 10] = [52, 53, 66, 67, 68, 97, 98, 99, 100, 101];

/// Light colour/brightness code. Its meaning depends on the control.
pub type Intensity = u8;

/// Note number for a pad.
#[inline]
pub fn pad_note(pad: PadId) -> u8 {
    PAD_ROW_BASE[usize::from(pad.y())] + pad.x()
}

/// Pad for a note number, or `None` if the note is not a pad.
pub fn note_pad(note: u8) -> Option<PadId> {
    if !PAD_NOTES.contains(&note) {
        return None;
    }
    // Rows are listed top-down, so the first base at or below the note is its row.
    let (row, base) = PAD_ROW_BASE
        .iter()
        .enumerate()
        .find(|&(_, &base)| note >= base)?;
    PadId::new(note - base, row as u8).ok()
}

/// Every button the device has, in ascending order.
pub fn all_buttons() -> impl Iterator<Item = ButtonId> {
    [3u8, 9]
        .into_iter()
        .chain((20..=119).filter(|n| !UNUSED_BUTTONS.contains(n)))
        .map(ButtonId)
}

/// Decode one raw inbound message.
///
/// Anything that is not a 3-byte note on/off for a pad or a control change yields `None`.
pub fn decode(message: &[u8]) -> Option<ControlEvent> {
    let &[status, number, value] = message else {
        return None;
    };

    match status & 0xf0 {
        NOTE_ON => note_pad(number).map(|pad| ControlEvent {
            id: ControlId::Pad(pad),
            pressed: true,
        }),
        NOTE_OFF => note_pad(number).map(|pad| ControlEvent {
            id: ControlId::Pad(pad),
            pressed: false,
        }),
        CONTROL_CHANGE => Some(ControlEvent {
            id: ControlId::Button(ButtonId(number)),
            pressed: value == BUTTON_PRESSED_VALUE,
        }),
        _ => None,
    }
}

/// Control-port handle: lights out, decoded events in.
///
/// Decoded events go to the callback given at construction, on whatever thread the MIDI
/// backend delivers input on.
pub struct ControlIo<O: MidiSink> {
    output: O,
    message: [u8; 3],
    _input: InputConnection,
}

impl<O: MidiSink> ControlIo<O> {
    /// Connect both ports and switch every light off.
    pub fn new<I, F>(input: I, output: O, mut on_event: F) -> Result<Self>
    where
        I: MidiSource,
        F: FnMut(ControlEvent) + Send + 'static,
    {
        let connection = input.connect(Box::new(move |message| {
            if let Some(event) = decode(message) {
                on_event(event);
            }
        }))?;

        let mut io = Self {
            output,
            message: [0; 3],
            _input: connection,
        };
        io.reset_all_lights()?;
        Ok(io)
    }

    pub fn set_button_light(&mut self, button: ButtonId, intensity: Intensity) -> Result<()> {
        self.message = [CONTROL_CHANGE, button.0, intensity];
        self.output.send(&self.message)
    }

    /// Intensity `0` sends note-off, anything else note-on.
    pub fn set_pad_light(&mut self, pad: PadId, intensity: Intensity) -> Result<()> {
        let note = pad_note(pad);
        self.message = if intensity == 0 {
            [NOTE_OFF, note, 0]
        } else {
            [NOTE_ON, note, intensity]
        };
        self.output.send(&self.message)
    }

    pub fn set_light(&mut self, id: ControlId, intensity: Intensity) -> Result<()> {
        match id {
            ControlId::Pad(pad) => self.set_pad_light(pad, intensity),
            ControlId::Button(button) => self.set_button_light(button, intensity),
        }
    }

    /// Switch off every button and pad.
    pub fn reset_all_lights(&mut self) -> Result<()> {
        for button in all_buttons() {
            self.set_button_light(button, 0)?;
        }
        for pad in PadId::all() {
            self.set_pad_light(pad, 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::{RecordingMidiOut, VirtualMidiIn};
    use std::sync::{Arc, Mutex};

    #[test]
    fn pad_notes_round_trip_over_whole_grid() {
        for pad in PadId::all() {
            let note = pad_note(pad);
            assert!(PAD_NOTES.contains(&note));
            assert_eq!(note_pad(note), Some(pad), "note {note}");
        }
    }

    #[test]
    fn pad_note_corners() {
        assert_eq!(pad_note(PadId::grid(0, 0)), 92);
        assert_eq!(pad_note(PadId::grid(7, 0)), 99);
        assert_eq!(pad_note(PadId::grid(0, 7)), 36);
        assert_eq!(pad_note(PadId::grid(0, 3)), 68);
    }

    #[test]
    fn notes_outside_pad_range_are_not_pads() {
        assert_eq!(note_pad(35), None);
        assert_eq!(note_pad(100), None);
        assert_eq!(note_pad(0), None);
    }

    #[test]
    fn decode_note_on_off() {
        assert_eq!(
            decode(&[0x90, 68, 100]),
            Some(ControlEvent {
                id: ControlId::Pad(PadId::grid(0, 3)),
                pressed: true
            })
        );
        assert_eq!(
            decode(&[0x80, 99, 0]),
            Some(ControlEvent {
                id: ControlId::Pad(PadId::grid(7, 0)),
                pressed: false
            })
        );
    }

    #[test]
    fn decode_ignores_channel_nibble() {
        assert_eq!(
            decode(&[0x9f, 36, 1]).map(|e| e.id),
            Some(ControlId::Pad(PadId::grid(0, 7)))
        );
    }

    #[test]
    fn decode_control_change() {
        assert_eq!(
            decode(&[0xb0, 49, 127]),
            Some(ControlEvent {
                id: ControlId::Button(ButtonId(49)),
                pressed: true
            })
        );
        assert_eq!(
            decode(&[0xb0, 49, 0]).map(|e| e.pressed),
            Some(false)
        );
        assert_eq!(decode(&[0xb0, 49, 64]).map(|e| e.pressed), Some(false));
    }

    #[test]
    fn decode_drops_noise() {
        assert_eq!(decode(&[]), None);
        assert_eq!(decode(&[0x90, 68]), None);
        assert_eq!(decode(&[0x90, 68, 1, 0]), None);
        assert_eq!(decode(&[0x90, 12, 100]), None);
        assert_eq!(decode(&[0xa0, 68, 100]), None);
        assert_eq!(decode(&[0xe0, 0, 64]), None);
        assert_eq!(decode(&[0xf8, 0, 0]), None);
    }

    #[test]
    fn button_inventory() {
        let buttons: Vec<u8> = all_buttons().map(|b| b.0).collect();
        assert_eq!(buttons.len(), 92);
        assert_eq!(&buttons[..3], &[3, 9, 20]);
        assert_eq!(buttons.last(), Some(&119));
        for unused in UNUSED_BUTTONS {
            assert!(!buttons.contains(&unused));
        }
    }

    #[test]
    fn light_messages() {
        let out = RecordingMidiOut::new();
        let mut io = ControlIo::new(VirtualMidiIn::new(), out.clone(), |_| {}).unwrap();
        out.clear();

        io.set_pad_light(PadId::grid(1, 3), 122).unwrap();
        io.set_pad_light(PadId::grid(1, 3), 0).unwrap();
        io.set_button_light(ButtonId(49), 122).unwrap();
        io.set_light(ControlId::Pad(PadId::grid(0, 7)), 5).unwrap();

        assert_eq!(
            out.sent(),
            vec![
                vec![0x90, 69, 122],
                vec![0x80, 69, 0],
                vec![0xb0, 49, 122],
                vec![0x90, 36, 5],
            ]
        );
    }

    #[test]
    fn construction_turns_everything_off() {
        let out = RecordingMidiOut::new();
        let _io = ControlIo::new(VirtualMidiIn::new(), out.clone(), |_| {}).unwrap();

        let sent = out.sent();
        assert_eq!(sent.len(), 92 + 64);
        assert!(sent[..92].iter().all(|m| m[0] == 0xb0 && m[2] == 0));
        assert!(sent[92..].iter().all(|m| m[0] == 0x80 && m[2] == 0));
    }

    #[test]
    fn inbound_messages_reach_callback() {
        let input = VirtualMidiIn::new();
        let feeder = input.feeder();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _io = ControlIo::new(input, RecordingMidiOut::new(), move |ev| {
            sink.lock().unwrap().push(ev)
        })
        .unwrap();

        feeder.note_on(92, 127);
        feeder.feed(&[0x90, 5, 127]);
        feeder.control_change(82, 127);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].id, ControlId::Pad(PadId::grid(0, 0)));
        assert_eq!(seen[1].id, ControlId::Button(ButtonId(82)));
    }
}
