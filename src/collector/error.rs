//! Error types for counter discovery and sampling.

use std::fmt;
use std::path::PathBuf;

use crate::collector::procfs::ParseError;

/// Fatal error while setting up the collector.
#[derive(Debug)]
pub enum ConfigError {
    /// Neither `/proc/diskstats` nor `/proc/partitions` is readable.
    NoCounterSource { proc_path: String },
    /// A required discovery file could not be read.
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// `/proc/cpuinfo` lists no processors.
    NoProcessors,
    /// Registry capacity of zero.
    ZeroCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoCounterSource { proc_path } => {
                write!(f, "can't get I/O statistics on this system ({})", proc_path)
            }
            ConfigError::Unreadable { path, source } => {
                write!(f, "can't read {}: {}", path.display(), source)
            }
            ConfigError::NoProcessors => write!(f, "no processors listed in cpuinfo"),
            ConfigError::ZeroCapacity => write!(f, "device capacity must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Unreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Fatal error while re-reading counters during a run.
#[derive(Debug)]
pub enum SourceReadError {
    /// The counter file became unreadable.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// `/proc/stat` has no usable aggregate CPU line.
    Malformed { path: PathBuf, source: ParseError },
}

impl fmt::Display for SourceReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceReadError::Io { path, source } => {
                write!(f, "can't read {}: {}", path.display(), source)
            }
            SourceReadError::Malformed { path, source } => {
                write!(f, "error parsing {}: {}", path.display(), source.message)
            }
        }
    }
}

impl std::error::Error for SourceReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceReadError::Io { source, .. } => Some(source),
            SourceReadError::Malformed { source, .. } => Some(source),
        }
    }
}

/// Promotes a read failure during start-up into a configuration error.
impl From<SourceReadError> for ConfigError {
    fn from(e: SourceReadError) -> Self {
        match e {
            SourceReadError::Io { path, source } => ConfigError::Unreadable { path, source },
            SourceReadError::Malformed { path, source } => ConfigError::Unreadable {
                path,
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
            },
        }
    }
}
