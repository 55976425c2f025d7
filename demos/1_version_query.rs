//! Controller Version Query Example
//!
//! Connects to a Prologix GPIB-ETHERNET controller, puts it in controller
//! mode, and prints its firmware version and current configuration.
//!
//! Usage: version_query <host> [port]

use prologix::{constants::MODE_CONTROLLER, Prologix};

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
        eprintln!("Usage: version_query <host> [port]");
        std::process::exit(2);
    });
    let port = args.next().and_then(|p| p.parse().ok());

    let mut ctrl = Prologix::open_tcp(&host, port)?;
    println!("connected: {:?}", ctrl);

    ctrl.set_mode(MODE_CONTROLLER)?;
    ctrl.save_config(false)?;

    println!("firmware version: {}", ctrl.version()?);
    println!("addressed instrument: {}", ctrl.address()?);
    println!("read-after-write: {}", ctrl.auto()?);
    println!("srq asserted: {}", ctrl.srq()?);

    ctrl.close()
}
