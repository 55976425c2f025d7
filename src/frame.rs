//! Response-line framing
//!
//! This module provides the `FrameDecoder` state machine that reassembles
//! bytes arriving from the controller into discrete response frames, under
//! one of five line termination conventions.

use crate::constants::{CR, LF};
use crate::error::{PrologixError, Result};

/// How a frame boundary is recognized in the incoming byte stream
///
/// Different controller firmware and `++eos`/`++eot_char` configurations
/// terminate response lines differently, so the convention is selected per
/// read call. Recognized terminator bytes are never part of the returned
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadTermination {
    /// A single CR (0x0D) ends the frame
    Cr,
    /// A single LF (0x0A) ends the frame
    Lf,
    /// CR followed by a mandatory LF; any other byte after CR is an error
    CrLf,
    /// LF alone ends the frame; CR is accepted only when followed by LF.
    /// A bare CR followed by anything else is a framing violation rather
    /// than silently folded into the payload. This tolerates both line
    /// conventions seen on real hardware and is the default.
    #[default]
    OptCrLf,
    /// LF followed by a mandatory CR
    LfCr,
}

/// Outcome of feeding one byte to a [`FrameDecoder`]
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeStep {
    /// The byte was consumed; the frame is not complete yet
    Pending,
    /// The byte completed a frame; terminator bytes are excluded
    Complete(Vec<u8>),
}

/// Per-byte state machine that accumulates payload bytes until a terminator
/// sequence for the selected [`ReadTermination`] is recognized
///
/// The decoder is a pure value with no transport attached, so the framing
/// rules are testable byte by byte. Dropping a decoder discards whatever it
/// had accumulated; a failed read never yields a partial frame.
///
/// # Example
///
/// ```
/// use prologix::{DecodeStep, FrameDecoder, ReadTermination};
///
/// let mut decoder = FrameDecoder::new(ReadTermination::OptCrLf);
/// assert_eq!(decoder.push(b'O').unwrap(), DecodeStep::Pending);
/// assert_eq!(decoder.push(b'K').unwrap(), DecodeStep::Pending);
/// assert_eq!(decoder.push(b'\n').unwrap(), DecodeStep::Complete(b"OK".to_vec()));
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    termination: ReadTermination,
    accumulated: Vec<u8>,
    /// Set after the first byte of a two-byte terminator candidate
    pending_pair: bool,
}

impl FrameDecoder {
    /// Create a decoder for the given termination convention
    pub fn new(termination: ReadTermination) -> Self {
        Self {
            termination,
            accumulated: Vec::new(),
            pending_pair: false,
        }
    }

    /// The termination convention this decoder recognizes
    pub fn termination(&self) -> ReadTermination {
        self.termination
    }

    /// Number of payload bytes accumulated so far
    pub fn len(&self) -> usize {
        self.accumulated.len()
    }

    /// Whether no payload bytes have been accumulated yet
    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }

    /// Feed one byte to the state machine
    ///
    /// Returns `DecodeStep::Complete` with the accumulated payload once the
    /// terminator sequence is recognized, `DecodeStep::Pending` otherwise.
    /// Fails with `MalformedFrame` when the byte violates the terminator
    /// grammar of the selected mode (e.g. a bare CR not followed by LF under
    /// `OptCrLf`); the accumulated payload is discarded with the error.
    pub fn push(&mut self, byte: u8) -> Result<DecodeStep> {
        if self.pending_pair {
            return self.push_second(byte);
        }

        match self.termination {
            ReadTermination::Cr if byte == CR => Ok(self.complete()),
            ReadTermination::Lf if byte == LF => Ok(self.complete()),
            ReadTermination::CrLf if byte == CR => {
                self.pending_pair = true;
                Ok(DecodeStep::Pending)
            }
            ReadTermination::OptCrLf if byte == LF => Ok(self.complete()),
            ReadTermination::OptCrLf if byte == CR => {
                self.pending_pair = true;
                Ok(DecodeStep::Pending)
            }
            ReadTermination::LfCr if byte == LF => {
                self.pending_pair = true;
                Ok(DecodeStep::Pending)
            }
            _ => {
                self.accumulated.push(byte);
                Ok(DecodeStep::Pending)
            }
        }
    }

    /// Handle the byte after the first half of a two-byte terminator
    fn push_second(&mut self, byte: u8) -> Result<DecodeStep> {
        self.pending_pair = false;

        let expected = match self.termination {
            ReadTermination::CrLf | ReadTermination::OptCrLf => LF,
            ReadTermination::LfCr => CR,
            // Single-byte modes never enter the pending state
            ReadTermination::Cr | ReadTermination::Lf => unreachable!(),
        };

        if byte == expected {
            Ok(self.complete())
        } else {
            self.accumulated.clear();
            Err(PrologixError::MalformedFrame {
                termination: self.termination,
                byte,
            })
        }
    }

    fn complete(&mut self) -> DecodeStep {
        self.pending_pair = false;
        DecodeStep::Complete(std::mem::take(&mut self.accumulated))
    }
}
