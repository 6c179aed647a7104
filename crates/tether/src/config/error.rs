//! Error types for device configuration files.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// What went wrong with a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// The file does not exist.
    NotFound,
    /// The process may not read or write the file.
    PermissionDenied,
    /// The file exists but is not valid TOML for a device configuration.
    InvalidData,
    /// The configuration could not be encoded.
    Encode,
    /// Any other I/O failure.
    Io,
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::InvalidData => write!(f, "invalid configuration"),
            Self::Encode => write!(f, "encoding failed"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

/// A configuration file could not be read, parsed, or written.
#[derive(Debug, thiserror::Error)]
#[error("{kind}{}: {message}", .path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
pub struct ConfigError {
    kind: ConfigErrorKind,
    path: Option<PathBuf>,
    message: String,
    #[source]
    source: Option<io::Error>,
}

impl ConfigError {
    /// Wrap an I/O error for `path`.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ConfigErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ConfigErrorKind::PermissionDenied,
            io::ErrorKind::InvalidData => ConfigErrorKind::InvalidData,
            _ => ConfigErrorKind::Io,
        };
        Self {
            kind,
            path: Some(path.to_path_buf()),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// A file that parsed as TOML but not as a configuration, or not at all.
    pub fn invalid(message: impl Into<String>, path: Option<&Path>) -> Self {
        Self {
            kind: ConfigErrorKind::InvalidData,
            path: path.map(Path::to_path_buf),
            message: message.into(),
            source: None,
        }
    }

    /// A configuration that could not be encoded.
    pub fn encode(message: impl Into<String>) -> Self {
        Self {
            kind: ConfigErrorKind::Encode,
            path: None,
            message: message.into(),
            source: None,
        }
    }

    /// The failure category.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }

    /// The file involved, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the file was simply missing.
    pub fn is_not_found(&self) -> bool {
        self.kind == ConfigErrorKind::NotFound
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
