use push_bridge::backends::probe_devices;
use push_bridge::Config;

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path).expect("load config"),
        None => Config::default(),
    };

    let devices = probe_devices(&config).expect("probe devices");
    let json = std::env::args().any(|a| a == "--json");

    if json {
        println!("{}", serde_json::to_string_pretty(&devices).expect("serialize"));
        return;
    }

    for info in &devices {
        println!("{info}");
    }
    let matched = devices.iter().filter(|d| d.matched).count();
    println!("{} device(s)/port(s), {} matching", devices.len(), matched);
}
