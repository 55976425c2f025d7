//! Prologix controller handle
//!
//! This module provides the `Prologix` struct: a handle over a byte channel
//! to a GPIB-ETHERNET or GPIB-USB controller, with a background ingestion
//! thread feeding the read buffer, deadline-bounded frame reads, and typed
//! helpers for the controller directive vocabulary.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::address::BusAddress;
use crate::buffer::ReadBuffer;
use crate::channel::{ByteChannel, SerialChannel, TcpChannel};
use crate::constants::{
    CMD_ADDR, CMD_AUTO, CMD_CLR, CMD_EOI, CMD_EOS, CMD_EOT_CHAR, CMD_EOT_ENABLE, CMD_IFC, CMD_LLO,
    CMD_LOC, CMD_LON, CMD_MODE, CMD_READ, CMD_READ_TMO_MS, CMD_RST, CMD_SAVECFG, CMD_SPOLL,
    CMD_SRQ, CMD_STATUS, CMD_TRG, CMD_VER, EOS_NONE, MODE_CONTROLLER, READ_TMO_MS_MAX,
};
use crate::encode::{encode_command, encode_data};
use crate::error::{PrologixError, Result};
use crate::frame::{DecodeStep, FrameDecoder, ReadTermination};

/// Default host-side deadline for queries
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Handle to a Prologix GPIB controller
///
/// One handle owns one byte channel. Opening spawns a single background
/// thread that ingests arriving bytes into the read buffer; the caller's
/// thread is the only consumer. The underlying device protocol is strictly
/// request/response with no request identifiers, so callers must serialize
/// exchanges: write, then read.
///
/// # Example
///
/// ```no_run
/// use prologix::{BusAddress, Prologix};
///
/// let mut ctrl = Prologix::open_tcp("192.168.1.80", None)?;
/// ctrl.set_mode(prologix::constants::MODE_CONTROLLER)?;
/// ctrl.set_address(&BusAddress::new(3)?)?;
/// ctrl.set_auto(true)?;
///
/// ctrl.send_data(b"*IDN?")?;
/// let frame = ctrl.read_frame(Default::default(), std::time::Duration::from_secs(1))?;
/// println!("{}", String::from_utf8_lossy(&frame));
/// # Ok::<(), prologix::PrologixError>(())
/// ```
pub struct Prologix {
    /// Write side of the byte channel
    channel: Box<dyn ByteChannel>,
    /// Bytes ingested from the channel, awaiting the frame reader
    buffer: Arc<ReadBuffer>,
    /// Tells the ingestion thread to stop
    stop: Arc<AtomicBool>,
    /// Background ingestion thread, joined on close
    ingest: Option<JoinHandle<()>>,
    /// Termination convention used by the typed queries
    termination: ReadTermination,
    /// Host-side deadline used by the typed queries
    timeout: Duration,
    /// Whether the channel is still usable
    open: bool,
}

impl Prologix {
    /// Connect to a GPIB-ETHERNET controller
    ///
    /// # Arguments
    /// * `host` - Hostname or IP address of the controller
    /// * `port` - TCP port, or `None` for the controller default (1234)
    pub fn open_tcp(host: &str, port: Option<u16>) -> Result<Self> {
        Self::from_channel(Box::new(TcpChannel::connect(host, port)?))
    }

    /// Open a GPIB-USB controller's serial port
    ///
    /// # Arguments
    /// * `path` - Serial device path, e.g. `/dev/ttyUSB0` or `COM3`
    /// * `baud` - Baud rate, or `None` for the controller default (115200)
    pub fn open_serial(path: &str, baud: Option<u32>) -> Result<Self> {
        Self::from_channel(Box::new(SerialChannel::open(path, baud)?))
    }

    /// Build a handle over an already-open byte channel
    ///
    /// Spawns the background ingestion thread. This is also the injection
    /// point for testing the handle without hardware.
    pub fn from_channel(channel: Box<dyn ByteChannel>) -> Result<Self> {
        let buffer = Arc::new(ReadBuffer::new());
        let stop = Arc::new(AtomicBool::new(false));
        let reader = channel.try_clone()?;
        let ingest = spawn_ingest(reader, Arc::clone(&buffer), Arc::clone(&stop))?;

        Ok(Self {
            channel,
            buffer,
            stop,
            ingest: Some(ingest),
            termination: ReadTermination::default(),
            timeout: DEFAULT_TIMEOUT,
            open: true,
        })
    }

    /// Termination convention used by the typed queries
    pub fn termination(&self) -> ReadTermination {
        self.termination
    }

    /// Change the termination convention used by the typed queries
    pub fn set_termination(&mut self, termination: ReadTermination) {
        self.termination = termination;
    }

    /// Host-side deadline used by the typed queries
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Change the host-side deadline used by the typed queries
    ///
    /// Fails with `InvalidTimeout` for a zero duration.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            return Err(PrologixError::InvalidTimeout);
        }
        self.timeout = timeout;
        Ok(())
    }

    /// Encode and send a controller directive
    ///
    /// The text is validated and LF-terminated by the encoder; nothing is
    /// written when validation fails.
    pub fn send_command(&mut self, text: &str) -> Result<()> {
        let bytes = encode_command(text)?;
        debug!("directive: {}", text);
        self.write_bytes(&bytes)
    }

    /// Escape and send an instrument data payload
    ///
    /// Escape-set bytes are ESC-prefixed so the controller forwards them to
    /// the bus instead of interpreting them, then the payload is
    /// LF-terminated.
    pub fn send_data(&mut self, payload: &[u8]) -> Result<()> {
        let bytes = encode_data(payload);
        debug!("data: {} payload bytes", payload.len());
        self.write_bytes(&bytes)
    }

    /// Read one response frame under the given termination convention
    ///
    /// A single absolute deadline is computed from `timeout` up front; every
    /// wait for the next byte is bounded by the time remaining, never by the
    /// full timeout restarted per byte. A zero timeout fails immediately
    /// with `InvalidTimeout`. On `Timeout` or `MalformedFrame` the bytes
    /// accumulated so far are discarded; callers should `clear_read_buffer`
    /// and retry the whole exchange.
    pub fn read_frame(&mut self, termination: ReadTermination, timeout: Duration) -> Result<Vec<u8>> {
        if timeout.is_zero() {
            return Err(PrologixError::InvalidTimeout);
        }

        let started = Instant::now();
        let deadline = started + timeout;
        let mut decoder = FrameDecoder::new(termination);

        loop {
            let byte = match self.buffer.next_byte(deadline) {
                Ok(byte) => byte,
                Err(PrologixError::Timeout { .. }) => {
                    return Err(PrologixError::Timeout {
                        elapsed: started.elapsed(),
                    });
                }
                Err(e) => return Err(e),
            };

            match decoder.push(byte)? {
                DecodeStep::Pending => continue,
                DecodeStep::Complete(frame) => {
                    trace!("frame: {:02X?}", frame);
                    return Ok(frame);
                }
            }
        }
    }

    /// Drop any bytes still waiting in the read buffer
    ///
    /// Returns what was discarded. Called before each new exchange so bytes
    /// left over from a previous, possibly timed-out exchange cannot
    /// corrupt the next read.
    pub fn clear_read_buffer(&mut self) -> Vec<u8> {
        let dropped = self.buffer.clear();
        if !dropped.is_empty() {
            debug!("discarded {} stale bytes: {:02X?}", dropped.len(), dropped);
        }
        dropped
    }

    /// One serialized request/response exchange for a directive
    ///
    /// Clears the read buffer, sends the directive, then reads one frame
    /// with the handle's default termination and timeout.
    pub fn query(&mut self, command: &str) -> Result<Vec<u8>> {
        self.clear_read_buffer();
        self.send_command(command)?;
        self.read_frame(self.termination, self.timeout)
    }

    /// One serialized request/response exchange for an instrument payload
    ///
    /// Assumes the controller is in read-after-write mode (`++auto 1`); with
    /// `++auto 0`, follow a `send_data` with [`request_read_eoi`] instead.
    ///
    /// [`request_read_eoi`]: Prologix::request_read_eoi
    pub fn query_data(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.clear_read_buffer();
        self.send_data(payload)?;
        self.read_frame(self.termination, self.timeout)
    }

    // ------------------------------------------------------------------
    // Typed directive setters and bus actions
    // ------------------------------------------------------------------

    /// `++addr` - address the given instrument
    pub fn set_address(&mut self, address: &BusAddress) -> Result<()> {
        self.send_command(&format!("{} {}", CMD_ADDR, address.directive_args()))
    }

    /// `++auto` - enable or disable read-after-write addressing
    pub fn set_auto(&mut self, enabled: bool) -> Result<()> {
        self.send_command(&format!("{} {}", CMD_AUTO, enabled as u8))
    }

    /// `++eoi` - enable or disable EOI assertion with the last data byte
    pub fn set_eoi(&mut self, enabled: bool) -> Result<()> {
        self.send_command(&format!("{} {}", CMD_EOI, enabled as u8))
    }

    /// `++eos` - select the end-of-string characters appended to data
    ///
    /// Accepts the `EOS_*` constants (0..=3).
    pub fn set_eos(&mut self, eos: u8) -> Result<()> {
        if eos > EOS_NONE {
            return Err(PrologixError::InvalidCommand {
                reason: format!("eos value {} out of range 0..={}", eos, EOS_NONE),
            });
        }
        self.send_command(&format!("{} {}", CMD_EOS, eos))
    }

    /// `++eot_enable` - append a character when EOI is detected on read
    pub fn set_eot_enable(&mut self, enabled: bool) -> Result<()> {
        self.send_command(&format!("{} {}", CMD_EOT_ENABLE, enabled as u8))
    }

    /// `++eot_char` - character appended when EOT is enabled
    pub fn set_eot_char(&mut self, character: u8) -> Result<()> {
        self.send_command(&format!("{} {}", CMD_EOT_CHAR, character))
    }

    /// `++mode` - select controller (1) or device (0) mode
    pub fn set_mode(&mut self, mode: u8) -> Result<()> {
        if mode > MODE_CONTROLLER {
            return Err(PrologixError::InvalidCommand {
                reason: format!("mode value {} out of range 0..=1", mode),
            });
        }
        self.send_command(&format!("{} {}", CMD_MODE, mode))
    }

    /// `++read_tmo_ms` - controller-side read timeout
    ///
    /// This programs the controller firmware and is independent of the
    /// host-side deadline passed to [`read_frame`](Prologix::read_frame).
    pub fn set_read_timeout_ms(&mut self, millis: u32) -> Result<()> {
        if millis > READ_TMO_MS_MAX {
            return Err(PrologixError::InvalidCommand {
                reason: format!("read timeout {} ms out of range 0..={}", millis, READ_TMO_MS_MAX),
            });
        }
        self.send_command(&format!("{} {}", CMD_READ_TMO_MS, millis))
    }

    /// `++lon` - enable or disable listen-only mode
    pub fn set_listen_only(&mut self, enabled: bool) -> Result<()> {
        self.send_command(&format!("{} {}", CMD_LON, enabled as u8))
    }

    /// `++savecfg` - enable or disable saving configuration to EPROM
    pub fn save_config(&mut self, enabled: bool) -> Result<()> {
        self.send_command(&format!("{} {}", CMD_SAVECFG, enabled as u8))
    }

    /// `++clr` - Selected Device Clear to the addressed instrument
    pub fn clear_device(&mut self) -> Result<()> {
        self.send_command(CMD_CLR)
    }

    /// `++ifc` - assert the GPIB IFC line
    pub fn interface_clear(&mut self) -> Result<()> {
        self.send_command(CMD_IFC)
    }

    /// `++llo` - Local Lockout to all instruments
    pub fn local_lockout(&mut self) -> Result<()> {
        self.send_command(CMD_LLO)
    }

    /// `++loc` - return the addressed instrument to local control
    pub fn local(&mut self) -> Result<()> {
        self.send_command(CMD_LOC)
    }

    /// `++rst` - power-on reset of the controller
    pub fn reset(&mut self) -> Result<()> {
        self.send_command(CMD_RST)
    }

    /// `++trg` - Group Execute Trigger to the addressed instrument(s)
    pub fn trigger(&mut self) -> Result<()> {
        self.send_command(CMD_TRG)
    }

    /// `++read eoi` - ask the controller to read from the addressed
    /// instrument until EOI
    pub fn request_read_eoi(&mut self) -> Result<()> {
        self.send_command(&format!("{} eoi", CMD_READ))
    }

    // ------------------------------------------------------------------
    // Typed directive queries
    // ------------------------------------------------------------------

    /// `++ver` - controller firmware version string
    pub fn version(&mut self) -> Result<String> {
        let frame = self.query(CMD_VER)?;
        frame_text(frame)
    }

    /// `++addr` - currently addressed instrument
    pub fn address(&mut self) -> Result<BusAddress> {
        let frame = self.query(CMD_ADDR)?;
        let text = frame_text(frame)?;
        let mut parts = text.split_whitespace();
        let pad = parse_number::<u8>(parts.next().unwrap_or(""))?;
        match parts.next() {
            Some(sad) => BusAddress::with_secondary(pad, parse_number(sad)?),
            None => BusAddress::new(pad),
        }
    }

    /// `++auto` - whether read-after-write addressing is enabled
    pub fn auto(&mut self) -> Result<bool> {
        let frame = self.query(CMD_AUTO)?;
        parse_bool(&frame_text(frame)?)
    }

    /// `++mode` - current controller/device mode
    pub fn mode(&mut self) -> Result<u8> {
        let frame = self.query(CMD_MODE)?;
        parse_number(&frame_text(frame)?)
    }

    /// `++srq` - state of the SRQ line
    pub fn srq(&mut self) -> Result<bool> {
        let frame = self.query(CMD_SRQ)?;
        parse_bool(&frame_text(frame)?)
    }

    /// `++spoll` - serial poll the addressed instrument
    pub fn serial_poll(&mut self) -> Result<u8> {
        let frame = self.query(CMD_SPOLL)?;
        parse_number(&frame_text(frame)?)
    }

    /// `++spoll <addr>` - serial poll a specific instrument
    pub fn serial_poll_at(&mut self, address: &BusAddress) -> Result<u8> {
        let frame = self.query(&format!("{} {}", CMD_SPOLL, address.directive_args()))?;
        parse_number(&frame_text(frame)?)
    }

    /// `++status` - device-mode status byte
    pub fn status_byte(&mut self) -> Result<u8> {
        let frame = self.query(CMD_STATUS)?;
        parse_number(&frame_text(frame)?)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Close the connection and stop the ingestion thread
    ///
    /// Safe to call more than once. After closing, writes fail with
    /// `ChannelUnavailable`.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.stop.store(true, Ordering::Release);
        let _ = self.channel.shutdown();
        if let Some(handle) = self.ingest.take() {
            if handle.join().is_err() {
                warn!("ingestion thread panicked");
            }
        }
        debug!("controller connection closed");
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.open {
            return Err(PrologixError::ChannelUnavailable);
        }
        trace!("write: {:02X?}", bytes);
        self.channel.write_all(bytes).map_err(|e| match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => PrologixError::ChannelUnavailable,
            _ => PrologixError::Io(e),
        })
    }
}

impl std::fmt::Debug for Prologix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prologix")
            .field("open", &self.open)
            .field("termination", &self.termination)
            .field("timeout", &self.timeout)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl Drop for Prologix {
    fn drop(&mut self) {
        // Best-effort teardown
        let _ = self.close();
    }
}

/// Spawn the background thread that moves bytes from the channel into the
/// read buffer until stopped or the channel closes
fn spawn_ingest(
    mut channel: Box<dyn ByteChannel>,
    buffer: Arc<ReadBuffer>,
    stop: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("prologix-ingest".into())
        .spawn(move || {
            let mut chunk = [0u8; 256];
            while !stop.load(Ordering::Acquire) {
                match channel.read_some(&mut chunk) {
                    Ok(0) => {
                        debug!("byte channel closed, ingestion stopping");
                        break;
                    }
                    Ok(count) => {
                        trace!("ingest: {:02X?}", &chunk[..count]);
                        buffer.extend(&chunk[..count]);
                    }
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::TimedOut
                                | io::ErrorKind::WouldBlock
                                | io::ErrorKind::Interrupted
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        if !stop.load(Ordering::Acquire) {
                            warn!("ingestion read failed: {}", e);
                        }
                        break;
                    }
                }
            }
        })
}

/// Decode a response frame as trimmed text
fn frame_text(frame: Vec<u8>) -> Result<String> {
    match String::from_utf8(frame) {
        Ok(text) => Ok(text.trim().to_string()),
        Err(e) => Err(PrologixError::InvalidResponse(format!(
            "non-UTF-8 response: {:02X?}",
            e.as_bytes()
        ))),
    }
}

/// Parse a numeric response field
fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| PrologixError::InvalidResponse(text.to_string()))
}

/// Parse a 0/1 response field
fn parse_bool(text: &str) -> Result<bool> {
    match parse_number::<u8>(text)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(PrologixError::InvalidResponse(other.to_string())),
    }
}
