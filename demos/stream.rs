//! Stream decoded EPOC frames to stdout.
//!
//! Usage: cargo run --example stream
//! Variant and idle policy come from EPOC_VARIANT / EPOC_YIELD_WHEN_IDLE.
//! Press Ctrl+C to stop.

use std::time::{Duration, Instant};

fn main() {
    env_logger::init();

    let options = epoc::OpenOptions::from_env();
    let mut device = match epoc::DeviceHandle::open_with_options(&options) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to open device: {}", e);
            std::process::exit(1);
        }
    };

    println!("Variant: {:?}", device.variant());
    println!("Serial:  {}", device.serial().unwrap_or("<unknown>"));
    println!();
    println!("Streaming frames (Ctrl+C to stop)...");

    let start = Instant::now();
    let mut last_report = Instant::now();
    let mut sequence = epoc::SequenceTracker::new();
    let mut quality = epoc::ContactQuality::new();

    loop {
        match device.wait_for_frame_timeout(Duration::from_secs(2)) {
            Ok(frame) => {
                sequence.observe(frame.counter());
                quality.observe(&frame);

                // Print every 32nd frame to avoid flooding the terminal
                if frame.counter() % 32 == 1 {
                    let values: Vec<String> = frame
                        .channels()
                        .map(|(c, r)| format!("{}={}", c, r.value))
                        .collect();
                    let g = frame.gyro();
                    println!(
                        "#{:<3} gyro=({:+}, {:+})  {}",
                        frame.counter(),
                        g.x,
                        g.y,
                        values.join(" ")
                    );
                }

                let now = Instant::now();
                if now.duration_since(last_report) >= Duration::from_secs(3) {
                    let elapsed = start.elapsed().as_secs_f64();
                    let hz = sequence.received() as f64 / elapsed;
                    let battery = device
                        .battery()
                        .map(|b| format!("{}%", b))
                        .unwrap_or_else(|| "?".into());
                    let contact: Vec<String> = epoc::Channel::ALL
                        .iter()
                        .map(|&c| format!("{}:{}", c, quality.get(c).map_or("-".into(), |q| q.to_string())))
                        .collect();
                    println!(
                        "--- {} frames, {} dropped in {:.1}s ({:.1} Hz), battery {} ---",
                        sequence.received(),
                        sequence.dropped(),
                        elapsed,
                        hz,
                        battery
                    );
                    println!("    contact {}", contact.join(" "));
                    last_report = now;
                }
            }
            Err(epoc::EpocError::Timeout) => {
                eprintln!("Timeout waiting for EEG data (is the headset switched on?)");
                break;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    device.close();
}
