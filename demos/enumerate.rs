//! Count connected Emotiv EPOC dongles.

fn main() {
    env_logger::init();

    let n = epoc::count(epoc::DeviceVariant::Consumer);
    println!("Found {} EPOC device(s)", n);
    if n > 1 {
        println!("Only the first one will be opened.");
    }
}
