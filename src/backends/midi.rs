//! Push control port over `midir`.
//!
//! Discovery picks the first input and the first output whose name matches the configured
//! pattern (Push 3 standalone exposes its pads/buttons as "Ableton Push 3 Live Port" or a
//! numbered `NN:0` client port). The output is connected right away; the input is
//! connected when [`ControlIo`](crate::control::ControlIo) registers its handler.
//!
//! `midir` calls the input handler on its own thread.

use crate::config::MidiConfig;
use crate::device::{InputConnection, MessageHandler, MidiSink, MidiSource};
use crate::error::{Error, Result};
use crate::metadata::DeviceMeta;
use midir::{MidiIO, MidiInput, MidiInputPort, MidiOutput, MidiOutputConnection};
use regex::Regex;

/// Unconnected Push input port.
pub struct PushMidiIn {
    input: MidiInput,
    port: MidiInputPort,
    client_name: String,
}

/// Connected Push output port.
pub struct PushMidiOut {
    connection: MidiOutputConnection,
}

fn midi_err(err: impl std::fmt::Display) -> Error {
    Error::Midi(err.to_string())
}

/// Anchored version of the configured pattern, so it must match the whole port name.
fn port_regex(config: &MidiConfig) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{})$", config.port_pattern))?)
}

fn find_port<T: MidiIO>(io: &T, pattern: &Regex) -> Option<T::Port> {
    io.ports().into_iter().find(|port| {
        io.port_name(port)
            .map(|name| pattern.is_match(&name))
            .unwrap_or(false)
    })
}

/// Open the Push control ports.
pub fn open(config: &MidiConfig) -> Result<(PushMidiIn, PushMidiOut)> {
    let pattern = port_regex(config)?;

    let input = MidiInput::new(&config.client_name).map_err(midi_err)?;
    let in_port = find_port(&input, &pattern).ok_or_else(|| Error::MidiPortNotFound {
        direction: "input",
        pattern: config.port_pattern.clone(),
    })?;

    let output = MidiOutput::new(&config.client_name).map_err(midi_err)?;
    let out_port = find_port(&output, &pattern).ok_or_else(|| Error::MidiPortNotFound {
        direction: "output",
        pattern: config.port_pattern.clone(),
    })?;
    let out_name = output.port_name(&out_port).map_err(midi_err)?;
    let connection = output
        .connect(&out_port, &format!("{}-out", config.client_name))
        .map_err(midi_err)?;
    log::info!("opened MIDI output \"{out_name}\"");

    Ok((
        PushMidiIn {
            input,
            port: in_port,
            client_name: config.client_name.clone(),
        },
        PushMidiOut { connection },
    ))
}

/// Describe every MIDI port, flagging the ones matching the configured pattern.
pub fn list_ports(config: &MidiConfig) -> Result<Vec<DeviceMeta>> {
    let pattern = port_regex(config)?;
    let mut out = Vec::new();

    let input = MidiInput::new(&config.client_name).map_err(midi_err)?;
    describe_ports(&input, "midi-in", &pattern, &mut out);
    let output = MidiOutput::new(&config.client_name).map_err(midi_err)?;
    describe_ports(&output, "midi-out", &pattern, &mut out);

    Ok(out)
}

fn describe_ports<T: MidiIO>(io: &T, bus: &str, pattern: &Regex, out: &mut Vec<DeviceMeta>) {
    for port in io.ports() {
        let Ok(name) = io.port_name(&port) else {
            continue;
        };
        out.push(DeviceMeta {
            bus: bus.to_string(),
            matched: pattern.is_match(&name),
            port_name: Some(name),
            ..Default::default()
        });
    }
}

impl MidiSource for PushMidiIn {
    fn connect(self, mut handler: MessageHandler) -> Result<InputConnection> {
        let name = self.input.port_name(&self.port).map_err(midi_err)?;
        let connection = self
            .input
            .connect(
                &self.port,
                &format!("{}-in", self.client_name),
                move |_stamp, message, _| handler(message),
                (),
            )
            .map_err(midi_err)?;
        log::info!("opened MIDI input \"{name}\"");
        Ok(Box::new(connection))
    }
}

impl MidiSink for PushMidiOut {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection.send(message).map_err(midi_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pattern_matches_push_ports_only() {
        let pattern = port_regex(&MidiConfig::default()).unwrap();
        assert!(pattern.is_match("Ableton Push 3 Live Port"));
        assert!(pattern.is_match("Ableton Push 3:Ableton Push 3 Live Port 20:0"));
        assert!(pattern.is_match("Ableton Push 3 24:0"));
        assert!(!pattern.is_match("Ableton Push 3 User Port"));
        assert!(!pattern.is_match("Ableton Push 2 Live Port"));
        assert!(!pattern.is_match("Midi Through Port-0 14:0"));
    }

    #[test]
    fn bad_pattern_is_reported() {
        let config = MidiConfig {
            port_pattern: "(".to_string(),
            ..MidiConfig::default()
        };
        assert!(matches!(port_regex(&config), Err(Error::Pattern(_))));
    }
}
