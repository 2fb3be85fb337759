use push_bridge::{Config, PlayerStatus, PresentOutcome, Session};
use std::time::{Duration, Instant};

const WIDTH: usize = 320;
const HEIGHT: usize = 200;

/// Doom's tick rate.
const TICK: Duration = Duration::from_micros(1_000_000 / 35);

fn render(frame: &mut [u32], t: usize) {
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let r = ((x + t) % 256) as u32;
            let g = ((y * 2 + t) % 256) as u32;
            let b = if (x / 20 + y / 20 + t / 10) % 2 == 0 { 0xff } else { 0x00 };
            frame[y * WIDTH + x] = (r << 16) | (g << 8) | b;
        }
    }
}

fn main() {
    push_bridge::logger::init(log::LevelFilter::Info).expect("install logger");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path).expect("load config"),
        None => Config::default(),
    };
    let mut session = Session::open(&config).expect("open Push");

    let mut frame = vec![0u32; WIDTH * HEIGHT];
    let mut health = 100;

    // Aggregation counters (per flush window)
    let flush_every = Duration::from_secs(1);
    let mut last_flush = Instant::now();
    let mut submitted = 0u32;
    let mut dropped = 0u32;

    for t in 0.. {
        let started = Instant::now();

        // 1) Render and push a frame
        render(&mut frame, t);
        match session.draw_frame(&frame) {
            Ok(PresentOutcome::Submitted) => submitted += 1,
            Ok(PresentOutcome::Dropped) => dropped += 1,
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(-1);
            }
        }

        // 2) Drain key events; any key press knocks off some health
        while let Some(event) = session.fetch_event() {
            println!("key {:#04x} {}", event.key.0, if event.pressed { "down" } else { "up" });
            if event.pressed {
                health = (health - 10).max(0);
            }
        }
        let status = PlayerStatus {
            health,
            armor: 50,
            ammo: (t % 200) as i32,
            max_ammo: 200,
        };
        if let Err(err) = session.update_status(status) {
            eprintln!("Error: {err}");
            std::process::exit(-1);
        }

        // 3) Periodically report frame throughput
        if last_flush.elapsed() >= flush_every {
            println!("{submitted} frame(s) sent, {dropped} dropped");
            submitted = 0;
            dropped = 0;
            last_flush = Instant::now();
        }

        // Keep the tick rate
        if let Some(rest) = TICK.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }
}
