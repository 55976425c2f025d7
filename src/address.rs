//! GPIB bus addresses
//!
//! This module provides the `BusAddress` value object: a validated primary
//! address with an optional secondary address, parseable from and rendered
//! as the `gpib:<pad>[,<sad>]` URL form.

use std::fmt;
use std::str::FromStr;

use crate::constants::{PAD_MAX, SAD_MAX, SAD_MIN};
use crate::error::{PrologixError, Result};

/// URL scheme prefix for bus address strings
const URL_PREFIX: &str = "gpib:";

/// A validated GPIB bus address
///
/// The primary address (pad) is 0..=30. The secondary address (sad) is
/// either 0, meaning absent, or 0x60..=0x7E per IEEE 488. Construction
/// fails with `InvalidAddress` for anything outside those ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusAddress {
    pad: u8,
    sad: u8,
}

impl BusAddress {
    /// Create an address with no secondary address
    ///
    /// # Arguments
    /// * `pad` - Primary address, 0..=30
    pub fn new(pad: u8) -> Result<Self> {
        Self::with_secondary(pad, 0)
    }

    /// Create an address with an explicit secondary address
    ///
    /// # Arguments
    /// * `pad` - Primary address, 0..=30
    /// * `sad` - Secondary address, 0 (absent) or 0x60..=0x7E
    pub fn with_secondary(pad: u8, sad: u8) -> Result<Self> {
        if pad > PAD_MAX {
            return Err(PrologixError::InvalidAddress {
                reason: format!("primary address {} out of range 0..={}", pad, PAD_MAX),
            });
        }
        if sad != 0 && !(SAD_MIN..=SAD_MAX).contains(&sad) {
            return Err(PrologixError::InvalidAddress {
                reason: format!(
                    "secondary address 0x{:02X} out of range 0x{:02X}..=0x{:02X}",
                    sad, SAD_MIN, SAD_MAX
                ),
            });
        }
        Ok(Self { pad, sad })
    }

    /// Primary address
    pub fn pad(&self) -> u8 {
        self.pad
    }

    /// Secondary address (0 when absent)
    pub fn sad(&self) -> u8 {
        self.sad
    }

    /// Whether a secondary address is present
    pub fn has_secondary(&self) -> bool {
        self.sad != 0
    }

    /// Render the decimal argument form expected by `++addr`
    ///
    /// `"3"` for a primary-only address, `"3 103"` when a secondary address
    /// is present.
    pub fn directive_args(&self) -> String {
        if self.has_secondary() {
            format!("{} {}", self.pad, self.sad)
        } else {
            format!("{}", self.pad)
        }
    }
}

impl FromStr for BusAddress {
    type Err = PrologixError;

    /// Parse the `gpib:<pad>[,<sad>]` URL form
    ///
    /// The prefix is case-insensitive and surrounding whitespace is
    /// tolerated.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let rest = trimmed
            .get(..URL_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(URL_PREFIX))
            .map(|_| &trimmed[URL_PREFIX.len()..])
            .ok_or_else(|| PrologixError::InvalidAddress {
                reason: format!("missing {:?} prefix: {:?}", URL_PREFIX, s),
            })?;

        let (pad_str, sad_str) = match rest.split_once(',') {
            Some((pad, sad)) => (pad, Some(sad)),
            None => (rest, None),
        };

        let pad = pad_str
            .parse::<u8>()
            .map_err(|_| PrologixError::InvalidAddress {
                reason: format!("invalid primary address: {:?}", pad_str),
            })?;

        match sad_str {
            Some(sad_str) => {
                let sad = sad_str
                    .parse::<u8>()
                    .map_err(|_| PrologixError::InvalidAddress {
                        reason: format!("invalid secondary address: {:?}", sad_str),
                    })?;
                Self::with_secondary(pad, sad)
            }
            None => Self::new(pad),
        }
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_secondary() {
            write!(f, "gpib:{},{}", self.pad, self.sad)
        } else {
            write!(f, "gpib:{}", self.pad)
        }
    }
}
