//! Byte channel transports
//!
//! This module provides the `ByteChannel` capability consumed by the
//! controller handle, plus the two concrete transports a Prologix bridge is
//! reached over: TCP for the GPIB-ETHERNET variant and a serial port for
//! the GPIB-USB variant (which enumerates as an FTDI serial device).

use std::io;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;

use crate::constants::{DEFAULT_BAUD_RATE, DEFAULT_TCP_PORT};
use crate::error::Result;

/// How long a single `read_some` call may block before reporting no data
///
/// The ingestion thread polls at this interval so it can observe a shutdown
/// request between reads.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A duplex ordered byte transport to the controller
///
/// The controller handle owns one instance for writing and hands a clone to
/// the background ingestion thread for reading. Implementations are plain
/// byte pipes; framing and escaping happen above this trait.
pub trait ByteChannel: Send {
    /// Write the whole byte sequence to the transport
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read whatever bytes are available, blocking at most briefly
    ///
    /// Returns `Ok(0)` when the transport has closed. A poll interval
    /// elapsing with no data is reported as an error of kind `TimedOut` or
    /// `WouldBlock`; callers poll again.
    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Clone the transport handle for the ingestion thread
    fn try_clone(&self) -> io::Result<Box<dyn ByteChannel>>;

    /// Tear down the transport, unblocking any reader
    fn shutdown(&mut self) -> io::Result<()>;
}

/// TCP transport to a Prologix GPIB-ETHERNET controller
pub struct TcpChannel {
    stream: TcpStream,
}

impl TcpChannel {
    /// Connect to a controller at `host` on the given port
    ///
    /// # Arguments
    /// * `host` - Hostname or IP address of the controller
    /// * `port` - TCP port, or `None` for the controller default (1234)
    pub fn connect(host: &str, port: Option<u16>) -> Result<Self> {
        let port = port.unwrap_or(DEFAULT_TCP_PORT);
        let addr = (host, port);
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(READ_POLL_INTERVAL))?;
        debug!("connected to {}:{}", host, port);
        Ok(Self { stream })
    }

    /// Connect with a bound on connection establishment time
    pub fn connect_timeout<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<Self> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no address resolved"))?;
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(READ_POLL_INTERVAL))?;
        debug!("connected to {}", addr);
        Ok(Self { stream })
    }
}

impl ByteChannel for TcpChannel {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.stream, bytes)
    }

    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.stream, buf)
    }

    fn try_clone(&self) -> io::Result<Box<dyn ByteChannel>> {
        Ok(Box::new(Self {
            stream: self.stream.try_clone()?,
        }))
    }

    fn shutdown(&mut self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            // Already gone is fine; shutdown is best effort
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Serial transport to a Prologix GPIB-USB controller
pub struct SerialChannel {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialChannel {
    /// Open the serial port the controller enumerated as
    ///
    /// The port is configured 8N1 with the built-in read timeout acting as
    /// the poll bound.
    ///
    /// # Arguments
    /// * `path` - Serial device path, e.g. `/dev/ttyUSB0` or `COM3`
    /// * `baud` - Baud rate, or `None` for the controller default (115200)
    pub fn open(path: &str, baud: Option<u32>) -> Result<Self> {
        let baud = baud.unwrap_or(DEFAULT_BAUD_RATE);
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(READ_POLL_INTERVAL)
            .open()?;
        debug!("opened serial port {} at {} baud", path, baud);
        Ok(Self { port })
    }
}

impl ByteChannel for SerialChannel {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.port, bytes)
    }

    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.port, buf)
    }

    fn try_clone(&self) -> io::Result<Box<dyn ByteChannel>> {
        let port = self.port.try_clone().map_err(io::Error::from)?;
        Ok(Box::new(Self { port }))
    }

    fn shutdown(&mut self) -> io::Result<()> {
        // Nothing to tear down; the reader unblocks on its poll timeout and
        // the port closes on drop
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory channel for exercising the controller without hardware

    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scriptable in-memory `ByteChannel`
    ///
    /// Tests keep a clone to feed incoming bytes and inspect what the
    /// controller wrote.
    #[derive(Clone, Default)]
    pub(crate) struct FakeChannel {
        incoming: Arc<Mutex<VecDeque<u8>>>,
        written: Arc<Mutex<Vec<u8>>>,
        closed: Arc<AtomicBool>,
    }

    impl FakeChannel {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Queue bytes for the ingestion thread to pick up
        pub(crate) fn push_incoming(&self, bytes: &[u8]) {
            self.incoming.lock().unwrap().extend(bytes);
        }

        /// Everything written to the channel so far
        pub(crate) fn written(&self) -> Vec<u8> {
            self.written.lock().unwrap().clone()
        }

        /// Forget previously written bytes
        pub(crate) fn reset_written(&self) {
            self.written.lock().unwrap().clear();
        }

        pub(crate) fn is_closed(&self) -> bool {
            self.closed.load(Ordering::Acquire)
        }
    }

    impl ByteChannel for FakeChannel {
        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            if self.is_closed() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "channel closed"));
            }
            self.written.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }

        fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.is_closed() {
                return Ok(0);
            }
            let mut incoming = self.incoming.lock().unwrap();
            if incoming.is_empty() {
                drop(incoming);
                std::thread::sleep(Duration::from_millis(1));
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
            }
            let count = buf.len().min(incoming.len());
            for slot in buf.iter_mut().take(count) {
                *slot = incoming.pop_front().unwrap();
            }
            Ok(count)
        }

        fn try_clone(&self) -> io::Result<Box<dyn ByteChannel>> {
            Ok(Box::new(self.clone()))
        }

        fn shutdown(&mut self) -> io::Result<()> {
            self.closed.store(true, Ordering::Release);
            Ok(())
        }
    }
}
