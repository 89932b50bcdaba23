//! Delete one day of local archive copies, here and on the partner machine.
//!
//! Deletion is keyed only on the date in the file names. Nothing checks that the files made it
//! into an HPSS bundle first.

use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::Archive;

use crate::{
    config::Session,
    dates::{julian, pdy},
    errors::ArchiveErr,
    files::{glob_in, remove_path},
    machine::MachinePair,
    shell::quote_path,
    tools,
};

impl Archive {
    /// Glob pattern selecting the files of `date` in this archive directory.
    pub fn prune_pattern(&self, date: NaiveDate) -> String {
        let name = self
            .root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match name.as_str() {
            "get_d" => format!("*{}*", julian(date)),
            "osi_saf" => format!("ice_conc_*_polstere-100_multi_*{}1200.nc", pdy(date)),
            "ghrsst_ospo" => format!("{}_OSPO_L4_GHRSST", pdy(date)),
            _ => format!("*{}*", pdy(date)),
        }
    }

    /// The files and directories of `date`, sorted.
    pub fn prune_targets(&self, date: NaiveDate) -> Result<Vec<PathBuf>, ArchiveErr> {
        // EVS keeps one directory per model and day next to the model directory itself.
        if self.root.to_string_lossy().contains("evs_data") {
            let day_dir = PathBuf::from(format!("{}.{}", self.root.display(), pdy(date)));
            return Ok(if day_dir.exists() { vec![day_dir] } else { vec![] });
        }

        glob_in(&self.root, &self.prune_pattern(date))
    }

    /// Remove everything of `date` locally, then on the partner machine when it is known.
    ///
    /// Returns what was removed locally.
    pub fn prune(
        &self,
        session: &Session,
        machines: &MachinePair,
        date: NaiveDate,
    ) -> Result<Vec<PathBuf>, ArchiveErr> {
        info!("In directory: {}", self.root.display());

        let targets = self.prune_targets(date)?;
        if targets.is_empty() {
            info!("No files to remove for {} in {}", pdy(date), self.root.display());
            return Ok(targets);
        }

        info!(
            "Removing {} files {}",
            targets.len(),
            targets
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
        for path in &targets {
            remove_path(path)?;
        }

        match &machines.other {
            Some(other) => {
                let user = session.settings.user()?;
                session.runner.run(&tools::ssh(
                    &format!("{}@{}", user, other),
                    remote_remove(&targets),
                ));
            }
            None => warn!("Partner machine unknown, not removing files there"),
        }

        Ok(targets)
    }
}

fn remote_remove(paths: &[PathBuf]) -> String {
    format!(
        "rm -rf {}",
        paths
            .iter()
            .map(|path| quote_path(path))
            .collect::<Vec<_>>()
            .join(" ")
    )
}
