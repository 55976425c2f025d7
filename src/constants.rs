//! Prologix protocol constants
//!
//! This module contains all the constants used in the Prologix line protocol,
//! including the controller directive vocabulary, framing bytes, the escape
//! set, and bus address limits.

// ============================================================================
// Framing Bytes
// ============================================================================

/// Every outgoing command or data payload ends with a single LF
pub const TERMINATOR: u8 = 0x0A;
/// Escape prefix for payload bytes the controller would misread as framing
pub const ESC: u8 = 0x1B;
/// Carriage return
pub const CR: u8 = 0x0D;
/// Line feed
pub const LF: u8 = 0x0A;
/// Bytes that must be ESC-prefixed inside a data payload: LF, CR, ESC, '+'
pub const ESCAPE_SET: [u8; 4] = [0x0A, 0x0D, 0x1B, 0x2B];
/// Two-character prefix that marks a controller directive
pub const DIRECTIVE_PREFIX: &str = "++";

// ============================================================================
// Controller Directives
// ============================================================================

/// Set or query the GPIB address the controller talks to
pub const CMD_ADDR: &str = "++addr";
/// Enable or disable read-after-write addressing
pub const CMD_AUTO: &str = "++auto";
/// Send Selected Device Clear to the addressed instrument
pub const CMD_CLR: &str = "++clr";
/// Enable or disable EOI assertion with the last data byte
pub const CMD_EOI: &str = "++eoi";
/// Select the end-of-string characters appended to instrument data
pub const CMD_EOS: &str = "++eos";
/// Enable or disable appending a character when EOI is detected on read
pub const CMD_EOT_ENABLE: &str = "++eot_enable";
/// Character appended when EOT is enabled
pub const CMD_EOT_CHAR: &str = "++eot_char";
/// Assert the GPIB IFC line (interface clear)
pub const CMD_IFC: &str = "++ifc";
/// Send Local Lockout to all instruments
pub const CMD_LLO: &str = "++llo";
/// Return the addressed instrument to local control
pub const CMD_LOC: &str = "++loc";
/// Enable or disable listen-only mode
pub const CMD_LON: &str = "++lon";
/// Select controller or device mode
pub const CMD_MODE: &str = "++mode";
/// Read from the addressed instrument
pub const CMD_READ: &str = "++read";
/// Controller-side read timeout in milliseconds
pub const CMD_READ_TMO_MS: &str = "++read_tmo_ms";
/// Power-on reset of the controller
pub const CMD_RST: &str = "++rst";
/// Enable or disable saving configuration to EPROM
pub const CMD_SAVECFG: &str = "++savecfg";
/// Serial poll the addressed (or specified) instrument
pub const CMD_SPOLL: &str = "++spoll";
/// Query the state of the SRQ line
pub const CMD_SRQ: &str = "++srq";
/// Query or set the device-mode status byte
pub const CMD_STATUS: &str = "++status";
/// Send Group Execute Trigger to the addressed instrument(s)
pub const CMD_TRG: &str = "++trg";
/// Query the controller firmware version string
pub const CMD_VER: &str = "++ver";
/// Print the controller's built-in help text
pub const CMD_HELP: &str = "++help";

// ============================================================================
// Directive Argument Values
// ============================================================================

/// `++mode` argument: device mode
pub const MODE_DEVICE: u8 = 0;
/// `++mode` argument: controller mode
pub const MODE_CONTROLLER: u8 = 1;

/// `++eos` argument: append CR+LF to instrument data
pub const EOS_CR_LF: u8 = 0;
/// `++eos` argument: append CR
pub const EOS_CR: u8 = 1;
/// `++eos` argument: append LF
pub const EOS_LF: u8 = 2;
/// `++eos` argument: append nothing
pub const EOS_NONE: u8 = 3;

/// Largest value accepted by `++read_tmo_ms`
pub const READ_TMO_MS_MAX: u32 = 3000;

// ============================================================================
// Bus Address Limits
// ============================================================================

/// Largest primary GPIB address
pub const PAD_MAX: u8 = 30;
/// Smallest non-zero secondary GPIB address
pub const SAD_MIN: u8 = 0x60;
/// Largest secondary GPIB address
pub const SAD_MAX: u8 = 0x7E;

// ============================================================================
// Transport Defaults
// ============================================================================

/// TCP port the GPIB-ETHERNET controller listens on
pub const DEFAULT_TCP_PORT: u16 = 1234;
/// Baud rate of the GPIB-USB controller's FTDI serial interface
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
