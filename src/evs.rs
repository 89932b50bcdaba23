//! EVS verification statistics, mirrored from the production tree.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::{config::Settings, dates::pdy, task::FetchTask};

/// Verification cases archived for each model.
pub const VERIF_CASES: &[&str] = &["grid2grid", "grid2obs"];

/// Directory, relative to the archive root and the production EVS root, holding the stats.
pub fn stats_dir(root: &Path) -> PathBuf {
    root.join("stats").join("global_det")
}

/// Name of one day's stat file.
pub fn stat_name(model: &str, verif_case: &str, date: NaiveDate) -> String {
    format!("evs.stats.{}.atmos.{}.v{}.stat", model, verif_case, pdy(date))
}

/// Fetch tasks copying one day of `model` statistics into the archive.
pub fn fetch_tasks(
    settings: &Settings,
    archive_root: &Path,
    model: &str,
    run_dir: &Path,
    date: NaiveDate,
) -> Vec<FetchTask> {
    let day_dir = format!("{}.{}", model, pdy(date));
    let prod = stats_dir(&settings.comroot.join("evs").join(&settings.evs_ver)).join(&day_dir);
    let archive = stats_dir(archive_root).join(&day_dir);

    VERIF_CASES
        .iter()
        .map(|verif_case| {
            let name = stat_name(model, verif_case, date);
            FetchTask::copy(prod.join(&name), run_dir.join(&name), archive.join(&name))
        })
        .collect()
}
