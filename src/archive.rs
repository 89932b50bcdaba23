//! An archive directory tree and the drivers that fill, check, bundle, restore, and prune it.

use std::path::PathBuf;

/// The archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Archive {
    root: PathBuf, // The root directory.
}

mod audit;
mod bundle;
mod canl;
mod fetch;
mod hpss;
mod prune;
mod root;

pub use self::fetch::FetchSummary;
pub use self::hpss::{FileType, HpssEra};
