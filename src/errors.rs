//! Module for errors.
use std::path::PathBuf;

use thiserror::Error;

/// Error from the archive scripts.
///
/// Failures of external tools are never represented here. Those are logged by the command
/// dispatcher and detected afterwards by the existence oracle.
#[derive(Debug, Error)]
pub enum ArchiveErr {
    // Inherited errors from std
    /// Error forwarded from std
    #[error("std lib io error: {0}")]
    IO(#[from] ::std::io::Error),

    // Other forwarded errors
    /// A glob pattern could not be compiled.
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    /// A glob match could not be read.
    #[error("error reading glob match: {0}")]
    Glob(#[from] glob::GlobError),
    /// A regular expression could not be compiled.
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),
    /// Loading the settings failed.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    // My own errors from this crate
    /// Bad command line usage, the message carries the usage text.
    #[error("{0}")]
    Usage(String),
    /// A date argument had the wrong number of digits or was not a calendar date.
    #[error("invalid date {value:?}, expected {expected}")]
    InvalidDate {
        /// The offending argument.
        value: String,
        /// Description of the expected format.
        expected: &'static str,
    },
    /// A numeric argument did not parse.
    #[error("invalid value for --{flag}: {value:?}")]
    InvalidNumber {
        /// Name of the flag.
        flag: &'static str,
        /// The offending argument.
        value: String,
    },
    /// Model or observation name not in the registry.
    #[error("{kind} {name} not recognized")]
    UnknownSource {
        /// What kind of name this was, model, obs, or filetype.
        kind: &'static str,
        /// The name given.
        name: String,
    },
    /// A source is known but this operation is not available for it.
    #[error("{operation} is not supported for {name}")]
    Unsupported {
        /// The operation requested.
        operation: &'static str,
        /// The source name.
        name: String,
    },
    /// A date older than the oldest layout a retrieval knows about.
    #[error("farthest date back supported is {earliest}, requested {requested}")]
    DateTooEarly {
        /// The oldest supported date.
        earliest: &'static str,
        /// The date asked for.
        requested: String,
    },
    /// An archive directory that must exist does not.
    #[error("{} does not exist", .0.display())]
    MissingDirectory(PathBuf),
    /// A required environment value is empty.
    #[error("{0} is not set")]
    MissingSetting(&'static str),
}

impl From<figment::Error> for ArchiveErr {
    fn from(err: figment::Error) -> ArchiveErr {
        ArchiveErr::Config(Box::new(err))
    }
}
