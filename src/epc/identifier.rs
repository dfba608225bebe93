//! RFID tag identifier (96-bit EPC).
//!
//! An identifier is 12 raw bytes. Its canonical text form is 24 uppercase hex
//! characters; lowercase input is accepted and normalised.
//!
//! # Example
//!
//! ```
//! use epc_lora_framer::epc::Identifier;
//!
//! let id: Identifier = "e28011606000020000003039".parse().unwrap();
//! assert_eq!(id.to_string(), "E28011606000020000003039");
//! assert_eq!(id.as_bytes()[0], 0xE2);
//! ```

use rand_core::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier size in raw bytes.
pub const IDENTIFIER_BYTES: usize = 12;

/// Identifier size in hex characters.
pub const IDENTIFIER_HEX_LEN: usize = IDENTIFIER_BYTES * 2;

/// A validated 96-bit RFID identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier([u8; IDENTIFIER_BYTES]);

impl Identifier {
    /// Create an identifier from raw bytes.
    pub const fn from_bytes(bytes: [u8; IDENTIFIER_BYTES]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the identifier.
    pub const fn as_bytes(&self) -> &[u8; IDENTIFIER_BYTES] {
        &self.0
    }

    /// Parse a 24-character hex string.
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        if input.len() != IDENTIFIER_HEX_LEN {
            return Err(IdentifierError::InvalidFormat {
                input: input.to_string(),
                reason: InvalidReason::Length(input.len()),
            });
        }
        if let Some(c) = input.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(IdentifierError::InvalidFormat {
                input: input.to_string(),
                reason: InvalidReason::NonHex(c),
            });
        }

        let mut bytes = [0u8; IDENTIFIER_BYTES];
        hex::decode_to_slice(input, &mut bytes).map_err(|_| IdentifierError::InvalidFormat {
            input: input.to_string(),
            reason: InvalidReason::Length(input.len()),
        })?;
        Ok(Self(bytes))
    }

    /// Generate a random identifier.
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; IDENTIFIER_BYTES];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Canonical 24-character uppercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; IDENTIFIER_BYTES]> for Identifier {
    fn from(bytes: [u8; IDENTIFIER_BYTES]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse every string in `inputs`, failing on the first malformed one.
pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Identifier>, IdentifierError> {
    inputs.iter().map(|s| Identifier::parse(s.as_ref())).collect()
}

/// Why an identifier string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Wrong number of characters.
    Length(usize),
    /// Character outside `[0-9A-Fa-f]`.
    NonHex(char),
}

/// Errors that can occur when validating identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Input is not exactly 24 hex characters.
    InvalidFormat {
        input: String,
        reason: InvalidReason,
    },
}

impl fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat { input, reason } => match reason {
                InvalidReason::Length(len) => write!(
                    f,
                    "invalid identifier format {:?}: {} characters (expected {})",
                    input, len, IDENTIFIER_HEX_LEN
                ),
                InvalidReason::NonHex(c) => write!(
                    f,
                    "invalid identifier format {:?}: non-hex character {:?}",
                    input, c
                ),
            },
        }
    }
}

impl std::error::Error for IdentifierError {}
