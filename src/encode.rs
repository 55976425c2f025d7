//! Outgoing command and data encoding
//!
//! Pure functions that prepare payloads for the controller's line protocol.
//! Directive commands are validated and terminated; instrument data is
//! escaped so the controller cannot mistake payload bytes for framing or a
//! `++` directive. Nothing here touches the transport.

use crate::constants::{DIRECTIVE_PREFIX, ESC, ESCAPE_SET, TERMINATOR};
use crate::error::{PrologixError, Result};

/// Encode a controller directive for transmission
///
/// The text must be at least two characters, start with the `++` directive
/// prefix, and contain only printable ASCII; anything else fails with
/// `InvalidCommand`. Directives are trusted, caller-built strings (address
/// plus numeric argument and the like), so no escaping is applied. A single
/// LF terminator is appended.
///
/// # Example
///
/// ```
/// let bytes = prologix::encode_command("++addr 3").unwrap();
/// assert_eq!(bytes, b"++addr 3\n");
/// ```
pub fn encode_command(text: &str) -> Result<Vec<u8>> {
    if text.len() < DIRECTIVE_PREFIX.len() {
        return Err(PrologixError::InvalidCommand {
            reason: format!("command too short: {:?}", text),
        });
    }
    if !text.starts_with(DIRECTIVE_PREFIX) {
        return Err(PrologixError::InvalidCommand {
            reason: format!("missing {:?} directive prefix: {:?}", DIRECTIVE_PREFIX, text),
        });
    }
    if let Some(c) = text.chars().find(|c| !c.is_ascii() || c.is_ascii_control()) {
        return Err(PrologixError::InvalidCommand {
            reason: format!("non-printable-ASCII character {:?} in {:?}", c, text),
        });
    }

    let mut out = Vec::with_capacity(text.len() + 1);
    out.extend_from_slice(text.as_bytes());
    out.push(TERMINATOR);
    Ok(out)
}

/// Encode an instrument data payload for transmission
///
/// Every byte in the escape set (LF, CR, ESC, `+`) is prefixed with ESC so
/// the controller passes it through to the GPIB bus instead of interpreting
/// it; all other bytes are copied unchanged. A single LF terminator is
/// appended (the terminator itself is not escaped). Infallible for any
/// input, including an empty payload.
pub fn encode_data(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 1);
    for &byte in bytes {
        if ESCAPE_SET.contains(&byte) {
            out.push(ESC);
        }
        out.push(byte);
    }
    out.push(TERMINATOR);
    out
}

/// Undo the escaping applied by [`encode_data`]
///
/// Takes the escaped payload body (without the trailing LF terminator) and
/// strips each ESC prefix, restoring the original bytes. A trailing ESC with
/// nothing after it is dropped.
pub fn unescape_data(escaped: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(escaped.len());
    let mut iter = escaped.iter();
    while let Some(&byte) = iter.next() {
        if byte == ESC {
            if let Some(&next) = iter.next() {
                out.push(next);
            }
        } else {
            out.push(byte);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        assert_eq!(encode_command("++addr 3").unwrap(), b"++addr 3\n");
        assert_eq!(encode_command("++ver").unwrap(), b"++ver\n");
        assert_eq!(encode_command("++").unwrap(), b"++\n");
    }

    #[test]
    fn test_encode_command_rejects_empty() {
        assert!(matches!(
            encode_command(""),
            Err(PrologixError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_encode_command_rejects_short() {
        assert!(matches!(
            encode_command("+"),
            Err(PrologixError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_encode_command_rejects_missing_prefix() {
        assert!(matches!(
            encode_command("xy"),
            Err(PrologixError::InvalidCommand { .. })
        ));
        assert!(matches!(
            encode_command("addr 3"),
            Err(PrologixError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_encode_command_rejects_non_ascii() {
        assert!(matches!(
            encode_command("++vér"),
            Err(PrologixError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_encode_command_rejects_embedded_control() {
        assert!(matches!(
            encode_command("++addr\n3"),
            Err(PrologixError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_encode_data_plain() {
        assert_eq!(encode_data(b"*IDN?"), b"*IDN?\n");
    }

    #[test]
    fn test_encode_data_empty() {
        assert_eq!(encode_data(b""), b"\n");
    }

    #[test]
    fn test_encode_data_escapes_all_four() {
        assert_eq!(
            encode_data(&[0x0A, 0x0D, 0x1B, 0x2B]),
            &[0x1B, 0x0A, 0x1B, 0x0D, 0x1B, 0x1B, 0x1B, 0x2B, 0x0A]
        );
    }

    #[test]
    fn test_encode_data_leaves_plus_prefix_readable() {
        // A payload that looks like a directive must not reach the
        // controller unescaped
        assert_eq!(encode_data(b"++addr"), b"\x1b+\x1b+addr\n");
    }

    #[test]
    fn test_unescape_round_trip() {
        let payloads: [&[u8]; 4] = [
            b"plain text",
            &[0x0A, 0x0D, 0x1B, 0x2B],
            b"MEAS:VOLT?\r\n",
            &[0x1B, 0x1B, 0x00, 0xFF],
        ];
        for payload in payloads {
            let wire = encode_data(payload);
            // Strip the trailing LF terminator before unescaping
            assert_eq!(unescape_data(&wire[..wire.len() - 1]), payload);
        }
    }
}
