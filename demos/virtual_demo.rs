use push_bridge::backends::virtual_input::{RecordingMidiOut, VirtualBulk, VirtualMidiIn};
use push_bridge::control::pad_note;
use push_bridge::{Config, PadId, Session};

fn main() {
    push_bridge::logger::init(log::LevelFilter::Debug).expect("install logger");

    // Virtual hardware: transfers finish immediately, MIDI is fed by hand.
    let bus = VirtualBulk::auto_complete();
    let frames = bus.probe();
    let midi_in = VirtualMidiIn::new();
    let pads = midi_in.feeder();
    let lights = RecordingMidiOut::new();

    let mut session = Session::with_backends(&Config::default(), bus, midi_in, lights.clone())
        .expect("build session");
    println!("(Virtual) {} light message(s) at startup", lights.sent().len());

    // Press fire, hold shift and hit save, release fire.
    pads.note_on(pad_note(PadId::grid(0, 3)), 100);
    pads.control_change(49, 127);
    pads.control_change(82, 127);
    pads.note_off(pad_note(PadId::grid(0, 3)));

    let frame = vec![0x00ff_8000u32; 320 * 200];
    for tick in 0..3 {
        let outcome = session.draw_frame(&frame).expect("draw frame");
        println!("(Virtual) tick {tick}: {outcome:?}");
        while let Some(event) = session.fetch_event() {
            println!("(Virtual) key {:#04x} pressed={}", event.key.0, event.pressed);
        }
    }

    println!("(Virtual) {} transfer(s) submitted", frames.submitted().len());
}
