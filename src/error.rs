//! Crate-level error type.

use crate::epc::{IdentifierError, ReconstructionError, SourceError};
use crate::frame::FrameError;
use crate::lora::{PlanError, RadioConfigError};
use crate::transport::TransportError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Any error the pipeline can return.
#[derive(Debug)]
pub enum Error {
    Identifier(IdentifierError),
    RadioConfig(RadioConfigError),
    Frame(FrameError),
    Reconstruction(ReconstructionError),
    Plan(PlanError),
    Source(SourceError),
    Transport(TransportError),
    /// Writing a result record failed.
    Sink(io::Error),
    /// The output file could not be opened.
    Output { path: PathBuf, source: io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(e) => write!(f, "{}", e),
            Self::RadioConfig(e) => write!(f, "{}", e),
            Self::Frame(e) => write!(f, "{}", e),
            Self::Reconstruction(e) => write!(f, "{}", e),
            Self::Plan(e) => write!(f, "{}", e),
            Self::Source(e) => write!(f, "{}", e),
            Self::Transport(e) => write!(f, "{}", e),
            Self::Sink(e) => write!(f, "failed to write record: {}", e),
            Self::Output { path, source } => {
                write!(f, "cannot open output {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Identifier(e) => Some(e),
            Self::RadioConfig(e) => Some(e),
            Self::Frame(e) => Some(e),
            Self::Reconstruction(e) => Some(e),
            Self::Plan(e) => Some(e),
            Self::Source(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::Sink(e) => Some(e),
            Self::Output { source, .. } => Some(source),
        }
    }
}

impl From<IdentifierError> for Error {
    fn from(e: IdentifierError) -> Self {
        Self::Identifier(e)
    }
}

impl From<RadioConfigError> for Error {
    fn from(e: RadioConfigError) -> Self {
        Self::RadioConfig(e)
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

impl From<ReconstructionError> for Error {
    fn from(e: ReconstructionError) -> Self {
        Self::Reconstruction(e)
    }
}

impl From<PlanError> for Error {
    fn from(e: PlanError) -> Self {
        Self::Plan(e)
    }
}

impl From<SourceError> for Error {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Sink(e)
    }
}
