//! HP 5334 Counter Example
//!
//! Identifies an HP 5334 universal counter, configures channel A, and takes
//! a frequency reading through the typed instrument wrapper.
//!
//! Usage: instrument_query <host> [pad]

use prologix::{constants::MODE_CONTROLLER, BusAddress, Hp5334, Prologix};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> prologix::Result<()> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| {
        eprintln!("Usage: instrument_query <host> [pad]");
        std::process::exit(2);
    });
    let pad = args.next().and_then(|p| p.parse().ok()).unwrap_or(3);

    let mut ctrl = Prologix::open_tcp(&host, None)?;
    ctrl.set_mode(MODE_CONTROLLER)?;
    ctrl.set_auto(true)?;

    let counter = Hp5334::new(BusAddress::new(pad)?);
    println!("instrument: {}", counter.instrument_id(&mut ctrl)?);

    counter.set_auto_trigger(&mut ctrl, true)?;
    counter.set_trigger_level(&mut ctrl, true, 0.0)?;

    let hz = counter.measure_frequency_a(&mut ctrl)?;
    println!("channel A frequency: {:.3} Hz", hz);

    ctrl.close()
}
