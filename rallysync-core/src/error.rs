//! Error types for rallysync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from reading or writing a sheet document.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Underlying I/O failure, with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path and serde_yaml line context.
    #[error("failed to parse sheet at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The sheet document did not exist at the expected path.
    #[error("sheet not found at {path}")]
    SheetNotFound { path: PathBuf },

    /// A write addressed a row the sheet does not have.
    #[error("row {position} is outside the sheet ({rows} rows)")]
    RowOutOfRange { position: usize, rows: usize },
}

/// All errors that can arise from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.rallysync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("config not found at {path}; run `rallysync init` first")]
    ConfigNotFound { path: PathBuf },

    #[error("invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

pub(crate) fn sheet_io(path: impl Into<PathBuf>, source: std::io::Error) -> SheetError {
    SheetError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
