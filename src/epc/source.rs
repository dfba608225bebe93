//! Identifier lists from text files.
//!
//! Accepts `.txt` (one identifier per line) and `.csv` (identifier in the
//! first column). Blank lines are ignored; malformed lines are skipped with a
//! warning so one bad scan does not sink a whole batch.

use super::identifier::Identifier;
use log::{info, warn};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Load identifiers from a `.txt` or `.csv` file.
pub fn load_identifiers(path: &Path) -> Result<Vec<Identifier>, SourceError> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("txt") | Some("csv") => {}
        _ => return Err(SourceError::UnsupportedFormat(path.display().to_string())),
    }

    let text = fs::read_to_string(path)?;
    let ids = parse_lines(&text);
    if ids.is_empty() {
        return Err(SourceError::Empty);
    }

    info!("Loaded {} valid identifiers from {}", ids.len(), path.display());
    Ok(ids)
}

/// Parse identifiers from text, skipping blank and malformed lines.
pub fn parse_lines(text: &str) -> Vec<Identifier> {
    let mut ids = Vec::new();
    for (line_num, line) in text.lines().enumerate() {
        let field = line.split(',').next().unwrap_or("").trim();
        if field.is_empty() {
            continue;
        }
        match Identifier::parse(field) {
            Ok(id) => ids.push(id),
            Err(e) => warn!("Skipping line {}: {}", line_num + 1, e),
        }
    }
    ids
}

/// Errors that can occur while loading identifiers.
#[derive(Debug)]
pub enum SourceError {
    /// Reading the file failed.
    Io(io::Error),
    /// File extension is not `.txt` or `.csv`.
    UnsupportedFormat(String),
    /// File held no valid identifiers.
    Empty,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read identifiers: {}", e),
            Self::UnsupportedFormat(path) => {
                write!(f, "unsupported file format: {} (use .txt or .csv)", path)
            }
            Self::Empty => write!(f, "no valid identifiers found"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SourceError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
