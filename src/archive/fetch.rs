//! The fetch drivers: walk the date window and run every source's fetch tasks.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use super::Archive;

use crate::{
    config::Session,
    dates::{pdy, CycleDate, DateWindow, ForecastHours},
    errors::ArchiveErr,
    evs,
    fit2obs::Fit2obs,
    models::{Model, ModelRun},
    obs::{Obs, ObsRun},
    task::{run_tasks, FetchTask, Outcome},
};

/// Tally of how the tasks of one fetch run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Written to the archive by this run.
    pub archived: usize,
    /// Already present.
    pub already_archived: usize,
    /// Made in the run directory only, archiving is off.
    pub staged: usize,
    /// Not available yet, or broken somewhere along the way.
    pub not_archived: usize,
}

impl FetchSummary {
    pub(super) fn add(&mut self, outcomes: &[Outcome]) {
        for outcome in outcomes {
            match outcome {
                Outcome::Archived => self.archived += 1,
                Outcome::AlreadyArchived => self.already_archived += 1,
                Outcome::Staged => self.staged += 1,
                _ => self.not_archived += 1,
            }
        }
    }

    pub(super) fn log(&self, label: &str) {
        info!(
            "{}: {} archived, {} already archived, {} staged only, {} not archived",
            label, self.archived, self.already_archived, self.staged, self.not_archived
        );
    }
}

impl Archive {
    /// Fetch one cycle of `model` for every date in the window.
    pub fn fetch_model(
        &self,
        session: &Session,
        model: Model,
        run_root: &Path,
        window: &DateWindow,
        cycle: u32,
        fhrs: ForecastHours,
    ) -> Result<FetchSummary, ArchiveErr> {
        let restricted = model.is_restricted();
        let base_run_dir = self.prepare_fetch(
            session,
            &model.archive_dirs(&self.root),
            run_root,
            model.as_ref(),
            restricted,
        )?;

        let mut summary = FetchSummary::default();
        for date in window.dates() {
            let cycle = CycleDate::new(date, cycle)?;
            let run_dir = base_run_dir.join(cycle.cdate());
            Archive::prepare_dir(session, &run_dir, restricted)?;
            info!("In run directory: {}", run_dir.display());

            let run = ModelRun {
                settings: session.settings,
                archive_root: self.root.clone(),
                run_dir,
                cycle,
                fhrs,
            };
            summary.add(&run_tasks(session, &model.fetch_tasks(&run))?);
        }

        summary.log(model.as_ref());
        Ok(summary)
    }

    /// Fetch every date in the window for an observation source.
    pub fn fetch_obs(
        &self,
        session: &Session,
        obs: Obs,
        run_root: &Path,
        window: &DateWindow,
    ) -> Result<FetchSummary, ArchiveErr> {
        let archive_dir = obs.archive_dir(&self.root);
        let restricted = obs.is_restricted();

        let obs_run = |run_dir: &Path, date| ObsRun {
            settings: session.settings,
            archive_dir: archive_dir.clone(),
            run_dir: run_dir.to_path_buf(),
            date,
        };
        let plan = |run_dir: &Path, date| obs.fetch_tasks(&obs_run(run_dir, date));
        let follow_up = |run_dir: &Path, date| Ok(obs.follow_up_tasks(&obs_run(run_dir, date)));
        let name = obs.as_ref();
        self.fetch_daily(session, &archive_dir, run_root, name, restricted, window, plan, follow_up)
    }

    /// Fetch every date in the window of fit-to-obs statistics.
    pub fn fetch_fit2obs(
        &self,
        session: &Session,
        source: Fit2obs,
        run_root: &Path,
        window: &DateWindow,
    ) -> Result<FetchSummary, ArchiveErr> {
        let archive_dir = source.archive_dir(&self.root);

        let plan = |run_dir: &Path, date| {
            Ok(source.fetch_tasks(session.settings, &archive_dir, run_dir, date))
        };
        let restricted = source.is_restricted();
        let name = source.as_ref();
        self.fetch_daily(session, &archive_dir, run_root, name, restricted, window, plan, nothing)
    }

    /// Fetch every date in the window of EVS statistics for `model`.
    pub fn fetch_evs(
        &self,
        session: &Session,
        model: &str,
        run_root: &Path,
        window: &DateWindow,
    ) -> Result<FetchSummary, ArchiveErr> {
        let archive_dir = evs::stats_dir(&self.root);

        let plan = |run_dir: &Path, date| {
            Ok(evs::fetch_tasks(session.settings, &self.root, model, run_dir, date))
        };
        self.fetch_daily(session, &archive_dir, run_root, model, false, window, plan, nothing)
    }

    // Archive and base run directories, returning the base run directory.
    fn prepare_fetch<P: AsRef<Path>>(
        &self,
        session: &Session,
        archive_dirs: &[P],
        run_root: &Path,
        name: &str,
        restricted: bool,
    ) -> Result<PathBuf, ArchiveErr> {
        if session.settings.send_to_archive() {
            for dir in archive_dirs {
                Archive::prepare_dir(session, dir.as_ref(), restricted)?;
            }
        }

        let base_run_dir = run_root.join(name);
        Archive::prepare_dir(session, &base_run_dir, restricted)?;
        info!("In run directory: {}", base_run_dir.display());

        Ok(base_run_dir)
    }

    // Sources with one run directory per day, named by PDY.
    #[allow(clippy::too_many_arguments)]
    fn fetch_daily<F, G>(
        &self,
        session: &Session,
        archive_dir: &Path,
        run_root: &Path,
        name: &str,
        restricted: bool,
        window: &DateWindow,
        plan: F,
        follow_up: G,
    ) -> Result<FetchSummary, ArchiveErr>
    where
        F: Fn(&Path, NaiveDate) -> Result<Vec<FetchTask>, ArchiveErr>,
        G: Fn(&Path, NaiveDate) -> Result<Vec<FetchTask>, ArchiveErr>,
    {
        let base_run_dir = self.prepare_fetch(session, &[archive_dir], run_root, name, restricted)?;

        let mut summary = FetchSummary::default();
        for date in window.dates() {
            let run_dir = base_run_dir.join(pdy(date));
            let tasks = plan(&run_dir, date)?;

            Archive::prepare_dir(session, &run_dir, restricted)?;
            info!("In run directory: {}", run_dir.display());
            summary.add(&run_tasks(session, &tasks)?);

            // Planned late so they see what the tasks above archived.
            let tasks = follow_up(&run_dir, date)?;
            summary.add(&run_tasks(session, &tasks)?);
        }

        summary.log(name);
        Ok(summary)
    }
}

// Daily sources with nothing to build from their own archive.
fn nothing(_: &Path, _: NaiveDate) -> Result<Vec<FetchTask>, ArchiveErr> {
    Ok(vec![])
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::{
        config::Settings,
        shell::testing::{write_last_arg, RecordingRunner},
    };

    use std::fs;

    use tempdir::TempDir;

    fn window() -> DateWindow {
        DateWindow::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
    }

    #[test]
    fn test_fetch_cmc_idempotent() {
        let tmp = TempDir::new("global-archive-test-fetch").unwrap();
        let mut settings = Settings::defaults("/home/ga");
        settings.comroot = tmp.path().join("com");
        settings.dcomroot = tmp.path().join("dcom");
        let runner = RecordingRunner::with_effect(write_last_arg);
        let session = Session::new(&settings, &runner);

        let arch = Archive::new(tmp.path().join("model_archive"));
        let run_root = tmp.path().join("run");
        let fhrs = ForecastHours::new(0, 24, 24).unwrap();

        let first = arch
            .fetch_model(&session, Model::Cmc, &run_root, &window(), 0, fhrs)
            .unwrap();
        assert_eq!(first.archived + first.already_archived, 0);
        assert!(first.not_archived > 0);
        assert!(run_root.join("cmc").join("2024011500").is_dir());
        assert!(run_root.join("cmc").join("2024010800").is_dir());
        assert!(arch.root().join("cmc").is_dir());

        // With every date of the window already archived nothing runs.
        let cmc_dir = arch.root().join("cmc");
        for date in window().dates() {
            let cycle = CycleDate::new(date, 0).unwrap();
            for name in Model::Cmc.expected_files(&cycle, fhrs) {
                fs::write(cmc_dir.join(name), b"GRIB").unwrap();
            }
        }
        let calls_before = runner.calls().len();
        let again = arch
            .fetch_model(&session, Model::Cmc, &run_root, &window(), 0, fhrs)
            .unwrap();
        assert_eq!(again.not_archived, 0);
        assert!(again.already_archived > 0);
        assert_eq!(runner.calls().len(), calls_before);
    }

    #[test]
    fn test_fetch_graphcast_dirs() {
        let tmp = TempDir::new("global-archive-test-fetch").unwrap();
        let settings = Settings::defaults("/home/ga");
        let runner = RecordingRunner::new();
        let session = Session::new(&settings, &runner);

        let arch = Archive::new(tmp.path().join("model_archive"));
        let fhrs = ForecastHours::new(0, 6, 6).unwrap();
        let summary = arch
            .fetch_model(&session, Model::Graphcastgfs, &tmp.path().join("run"), &window(), 0, fhrs)
            .unwrap();

        assert_eq!(summary.not_archived, 8 * 2 * 2);
        assert!(arch.root().join("graphcastgfs13").is_dir());
        assert!(arch.root().join("graphcastgfs13_test").is_dir());
        assert!(!arch.root().join("graphcastgfs").exists());
    }

    #[test]
    fn test_fetch_evs() {
        let tmp = TempDir::new("global-archive-test-fetch").unwrap();
        let mut settings = Settings::defaults("/home/ga");
        settings.comroot = tmp.path().join("com");
        let runner = RecordingRunner::new();
        let session = Session::new(&settings, &runner);

        let date = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        let prod = evs::stats_dir(&settings.comroot.join("evs").join(&settings.evs_ver))
            .join("gfs.20240114");
        fs::create_dir_all(&prod).unwrap();
        fs::write(prod.join(evs::stat_name("gfs", "grid2grid", date)), b"stat").unwrap();

        let arch = Archive::new(tmp.path().join("evs_archive"));
        let summary = arch
            .fetch_evs(&session, "gfs", &tmp.path().join("run"), &window())
            .unwrap();

        assert_eq!(summary.archived, 1);
        assert_eq!(summary.not_archived, 15);
        assert!(evs::stats_dir(arch.root())
            .join("gfs.20240114")
            .join("evs.stats.gfs.atmos.grid2grid.v20240114.stat")
            .exists());
    }

    #[test]
    fn test_fetch_obs_archiving_off() {
        let tmp = TempDir::new("global-archive-test-fetch").unwrap();
        let mut settings = Settings::defaults("/home/ga");
        settings.comroot = tmp.path().join("com");
        settings.sendarch = "NO".to_owned();
        let runner = RecordingRunner::new();
        let session = Session::new(&settings, &runner);

        let prod = settings
            .comroot
            .join("verf_precip")
            .join(&settings.verf_precip_ver)
            .join("precip.20240115");
        fs::create_dir_all(&prod).unwrap();
        fs::write(prod.join("ccpa.2024011512.24h"), b"GRIB").unwrap();

        let arch = Archive::new(tmp.path().join("obs_archive"));
        let run_root = tmp.path().join("run");
        let summary = arch
            .fetch_obs(&session, Obs::CcpaAccum24hr, &run_root, &window())
            .unwrap();

        assert_eq!(summary.staged, 1);
        assert_eq!(summary.archived, 0);
        assert!(!arch.root().exists());
        assert!(run_root
            .join("ccpa_accum24hr")
            .join("20240115")
            .join("ccpa.2024011512.24h")
            .exists());
    }

    #[test]
    fn test_fetch_osi_saf_weekly_uses_todays_daily() {
        let tmp = TempDir::new("global-archive-test-fetch").unwrap();
        let mut settings = Settings::defaults(tmp.path().join("home"));
        settings.devdcomroot = tmp.path().join("devdcom");
        let runner = RecordingRunner::with_effect(write_last_arg);
        let session = Session::new(&settings, &runner);

        let prod = settings.devdcomroot.join("20240114").join("seaice").join("osisaf");
        fs::create_dir_all(&prod).unwrap();
        for hem in &["nh", "sh"] {
            let name = format!("ice_conc_{}_polstere-100_multi_202401141200.nc", hem);
            fs::write(prod.join(name), b"nc").unwrap();
        }

        let arch = Archive::new(tmp.path().join("obs_archive"));
        let archive_dir = Obs::OsiSaf.archive_dir(arch.root());
        fs::create_dir_all(&archive_dir).unwrap();
        let earlier = [
            ("20240108", "20240109"),
            ("20240110", "20240111"),
            ("20240112", "20240113"),
        ];
        for (start, end) in &earlier {
            let name = format!("osi_saf.multi.{}00to{}00_G004.nc", start, end);
            fs::write(archive_dir.join(name), b"nc").unwrap();
        }

        let run_root = tmp.path().join("run");
        arch.fetch_obs(&session, Obs::OsiSaf, &run_root, &window()).unwrap();

        assert!(archive_dir.join("osi_saf.multi.2024011400to2024011500_G004.nc").exists());
        assert!(archive_dir.join("osi_saf.multi.2024010800to2024011500_G004.nc").exists());

        let grid = settings.fix("cdo_grids").join("G004.grid");
        let remap = format!("remapbil,{}", grid.display());
        assert!(runner.calls().iter().any(|cmd| cmd.argv().contains(&remap)));
        let ncea = runner
            .calls()
            .into_iter()
            .find(|cmd| cmd.argv()[0] == "ncea")
            .unwrap();
        assert_eq!(ncea.argv().len(), 2 + 4 + 2);
    }

    #[test]
    fn test_fetch_obs_unsupported() {
        let tmp = TempDir::new("global-archive-test-fetch").unwrap();
        let settings = Settings::defaults("/home/ga");
        let runner = RecordingRunner::new();
        let session = Session::new(&settings, &runner);

        let arch = Archive::new(tmp.path().join("obs_archive"));
        let result = arch.fetch_obs(&session, Obs::NdbcBuoy, &tmp.path().join("run"), &window());
        assert!(matches!(result, Err(ArchiveErr::Unsupported { .. })));
    }
}
