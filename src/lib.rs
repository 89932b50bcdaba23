#![deny(missing_docs)]
//! Fetch, convert, check, bundle, and prune an archive of global model, observation, and
//! verification data.

//
// Public API
//
pub use archive::{Archive, FetchSummary, FileType, HpssEra};
pub use cmd_line::ScriptArgs;
pub use config::{Session, Settings};
pub use dates::{CycleDate, DateWindow, ForecastHours, YearMonth};
pub use errors::ArchiveErr;
pub use fit2obs::Fit2obs;
pub use inventory::MissingFileReport;
pub use machine::MachinePair;
pub use models::Model;
pub use obs::Obs;
pub use shell::{Cmd, CommandRunner, SystemRunner};
pub use task::{FetchTask, Outcome, Source, Step};

pub mod cmd_line;
pub mod dates;
pub mod files;
pub mod logging;
pub mod tools;

//
// Implementation only
//
mod archive;
mod config;
mod errors;
mod evs;
mod fit2obs;
mod inventory;
mod machine;
mod models;
mod obs;
mod shell;
mod task;
