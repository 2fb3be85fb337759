use push_bridge::backends::virtual_input::{
    BulkProbe, MidiFeeder, RecordingMidiOut, VirtualBulk, VirtualMidiIn,
};
use push_bridge::control::pad_note;
use push_bridge::device::{TransferSlot, TransferStatus};
use push_bridge::display::{apply_signal_shaping, PAYLOAD_LEN, SCREEN_STRIDE};
use push_bridge::{keys, Config, Error, KeyEvent, PadId, PlayerStatus, PresentOutcome, Session};

struct Rig {
    session: Session<VirtualBulk, RecordingMidiOut>,
    frames: BulkProbe,
    pads: MidiFeeder,
    lights: RecordingMidiOut,
}

fn rig(config: &Config) -> Rig {
    let bus = VirtualBulk::new();
    let frames = bus.probe();
    let midi_in = VirtualMidiIn::new();
    let pads = midi_in.feeder();
    let lights = RecordingMidiOut::new();
    let session = Session::with_backends(config, bus, midi_in, lights.clone()).unwrap();
    Rig {
        session,
        frames,
        pads,
        lights,
    }
}

fn quick_drain_config() -> Config {
    let mut config = Config::default();
    config.display.drain_timeout_secs = 0;
    config
}

#[test]
fn startup_clears_then_lights_mapping_and_modifier() {
    let rig = rig(&quick_drain_config());
    let sent = rig.lights.sent();

    // 92 buttons + 64 pads off, then 20 mapped controls + the modifier.
    assert_eq!(sent.len(), 92 + 64 + 20 + 1);
    let lit = &sent[156..];
    assert_eq!(lit[0], vec![0x90, pad_note(PadId::grid(0, 3)), 122]);
    assert!(lit.contains(&vec![0xb0, 82, 122]));
    assert!(lit.contains(&vec![0x90, pad_note(PadId::grid(6, 0)), 121]));
    assert_eq!(lit.last(), Some(&vec![0xb0, 49, 122]));
}

#[test]
fn pad_and_button_input_reaches_the_queue_in_order() {
    let rig = rig(&quick_drain_config());

    rig.pads.note_on(pad_note(PadId::grid(0, 3)), 90);
    rig.pads.control_change(91, 127);
    rig.pads.note_off(pad_note(PadId::grid(0, 3)));
    rig.pads.control_change(91, 0);
    // Unmapped pad, aftertouch and a clock tick are ignored.
    rig.pads.note_on(pad_note(PadId::grid(7, 7)), 90);
    rig.pads.feed(&[0xa0, 68, 30]);
    rig.pads.feed(&[0xf8]);

    let events: Vec<KeyEvent> = std::iter::from_fn(|| rig.session.fetch_event()).collect();
    assert_eq!(
        events,
        vec![
            KeyEvent { key: keys::FIRE, pressed: true },
            KeyEvent { key: keys::ENTER, pressed: true },
            KeyEvent { key: keys::FIRE, pressed: false },
            KeyEvent { key: keys::ENTER, pressed: false },
        ]
    );
    assert_eq!(rig.session.fetch_event(), None);
}

#[test]
fn shift_save_becomes_quick_load() {
    let rig = rig(&quick_drain_config());

    rig.pads.control_change(49, 127);
    rig.pads.control_change(82, 127);
    rig.pads.control_change(49, 0);
    rig.pads.control_change(82, 0);

    assert_eq!(
        rig.session.fetch_event(),
        Some(KeyEvent { key: keys::F9, pressed: true })
    );
    assert_eq!(
        rig.session.fetch_event(),
        Some(KeyEvent { key: keys::F6, pressed: false })
    );
}

#[test]
fn frames_are_composed_in_two_strips_and_paced_by_completions() {
    let mut rig = rig(&quick_drain_config());

    // Red top half of the source, blue bottom strip.
    let mut frame = vec![0x00ff_0000u32; 320 * 200];
    for px in &mut frame[320 * 160..] {
        *px = 0x0000_00ff;
    }

    assert_eq!(rig.session.draw_frame(&frame).unwrap(), PresentOutcome::Submitted);
    assert_eq!(rig.session.draw_frame(&frame).unwrap(), PresentOutcome::Dropped);

    let fb = rig.session.display().framebuffer();
    assert_eq!(fb[319], 0);
    assert_eq!(fb[320], 0x001f);
    assert_eq!(fb[159 * SCREEN_STRIDE + 639], 0x001f);
    assert_eq!(fb[640], 0xf800);
    assert_eq!(fb[39 * SCREEN_STRIDE + 959], 0xf800);
    assert_eq!(fb[40 * SCREEN_STRIDE + 640], 0);

    let sent = rig.frames.submitted();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].0, TransferSlot::Payload);
    let mut payload = sent[1].1.clone();
    assert_eq!(payload.len(), PAYLOAD_LEN);
    apply_signal_shaping(&mut payload);
    assert_eq!(&payload[640..642], &[0x1f, 0x00]);

    rig.frames.complete_pending(TransferStatus::Completed);
    assert_eq!(rig.session.draw_frame(&frame).unwrap(), PresentOutcome::Submitted);
    assert_eq!(rig.frames.submitted().len(), 4);
}

#[test]
fn transfer_failure_is_fatal_for_every_later_frame() {
    let mut rig = rig(&quick_drain_config());
    let frame = vec![0u32; 320 * 200];

    rig.session.draw_frame(&frame).unwrap();
    rig.frames.complete_pending(TransferStatus::NoDevice);

    assert!(matches!(rig.session.draw_frame(&frame), Err(Error::Display(_))));
    assert!(matches!(rig.session.draw_frame(&frame), Err(Error::Display(_))));
    assert_eq!(rig.frames.submitted().len(), 2);
}

#[test]
fn undersized_frame_is_rejected() {
    let mut rig = rig(&quick_drain_config());
    assert!(matches!(
        rig.session.draw_frame(&[0u32; 100]),
        Err(Error::FrameSize { expected: 64_000, actual: 100 })
    ));
    assert!(rig.frames.submitted().is_empty());
}

#[test]
fn status_bars_follow_player_status() {
    let mut rig = rig(&quick_drain_config());
    rig.lights.clear();

    let status = PlayerStatus {
        health: 100,
        armor: 50,
        ammo: 0,
        max_ammo: 0,
    };
    rig.session.update_status(status).unwrap();
    let sent = rig.lights.sent();
    assert_eq!(sent.len(), 24);
    assert_eq!(sent[0], vec![0xb0, 102, 126]);
    assert_eq!(sent[8], vec![0xb0, 20, 7]);
    assert_eq!(sent[16], vec![0xb0, 36, 0]);

    rig.lights.clear();
    rig.session.update_status(status).unwrap();
    assert!(rig.lights.sent().is_empty());
}

#[test]
fn status_bars_can_be_disabled() {
    let mut config = quick_drain_config();
    config.hud.enabled = false;
    let mut rig = rig(&config);
    rig.lights.clear();

    rig.session.update_status(PlayerStatus::default()).unwrap();
    assert!(rig.lights.sent().is_empty());
}

#[test]
fn input_stops_after_session_is_dropped() {
    let rig = rig(&quick_drain_config());
    let pads = rig.pads.clone();
    assert!(pads.control_change(91, 127));
    drop(rig);
    assert!(!pads.control_change(91, 127));
}
