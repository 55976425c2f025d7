//! Raw Exchange Example
//!
//! Sends an identification query to the instrument at a given bus address
//! and reads the delimited response line, demonstrating the write/read
//! exchange discipline: clear the read buffer, write, then read one frame
//! under a deadline.
//!
//! Usage: read_frame <host> <gpib:pad[,sad]>

use std::time::Duration;

use prologix::{constants::MODE_CONTROLLER, BusAddress, Prologix, PrologixError, ReadTermination};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> prologix::Result<()> {
    let mut args = std::env::args().skip(1);
    let (host, address) = match (args.next(), args.next()) {
        (Some(host), Some(addr)) => (host, addr.parse::<BusAddress>()?),
        _ => {
            eprintln!("Usage: read_frame <host> <gpib:pad[,sad]>");
            std::process::exit(2);
        }
    };

    let mut ctrl = Prologix::open_tcp(&host, None)?;
    ctrl.set_mode(MODE_CONTROLLER)?;
    ctrl.set_address(&address)?;
    ctrl.set_auto(true)?;
    ctrl.set_read_timeout_ms(500)?;

    let stale = ctrl.clear_read_buffer();
    if !stale.is_empty() {
        println!("dropped {} stale bytes before the exchange", stale.len());
    }

    ctrl.send_data(b"*IDN?")?;
    match ctrl.read_frame(ReadTermination::OptCrLf, Duration::from_secs(2)) {
        Ok(frame) => println!("{} -> {}", address, String::from_utf8_lossy(&frame)),
        Err(e) if e.is_timeout() => {
            // Stale bytes from an aborted exchange must not leak into the
            // next one
            ctrl.clear_read_buffer();
            println!("no response from {} within 2s", address);
        }
        Err(PrologixError::MalformedFrame { termination, byte }) => {
            ctrl.clear_read_buffer();
            println!(
                "framing violation under {:?}: unexpected byte 0x{:02X}",
                termination, byte
            );
        }
        Err(e) => return Err(e),
    }

    ctrl.close()
}
