//! RFID identifier handling.
//!
//! This module contains:
//! - [`identifier`]: The validated 96-bit identifier type
//! - [`optimizer`]: Prefix clustering and the reconstruction check
//! - [`source`]: Loading identifier lists from text/CSV files

mod identifier;
mod optimizer;
mod source;

pub use identifier::{
    parse_all, Identifier, IdentifierError, InvalidReason, IDENTIFIER_BYTES, IDENTIFIER_HEX_LEN,
};
pub use optimizer::{
    group_summary, optimize, optimize_strs, reconstruct, Group, GroupMetrics,
    ReconstructionError, MIN_PREFIX_HEX,
};
pub use source::{load_identifiers, parse_lines, SourceError};
