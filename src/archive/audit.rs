//! Completeness audits: compare the expected file lists with what is on disk.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use super::Archive;

use crate::{
    dates::{pdy, CycleDate, ForecastHours},
    errors::ArchiveErr,
    files::make_dir,
    fit2obs::Fit2obs,
    inventory::{manifest_name, MissingFileReport},
    models::Model,
    obs::Obs,
};

impl Archive {
    /// Check one cycle of `model`, writing a manifest of missing files into `run_dir`.
    pub fn audit_model(
        &self,
        model: Model,
        cycle: &CycleDate,
        fhrs: ForecastHours,
        run_dir: &Path,
    ) -> Result<MissingFileReport, ArchiveErr> {
        let dir = model.archive_dir(&self.root);
        let expected = model.expected_files(cycle, fhrs);
        let manifest = manifest_name("model", model.as_ref(), &cycle.cdate());

        audit(&dir, expected, run_dir, &manifest, &cycle.cdate())
    }

    /// Check one day of an observation source.
    pub fn audit_obs(
        &self,
        obs: Obs,
        date: NaiveDate,
        run_dir: &Path,
    ) -> Result<MissingFileReport, ArchiveErr> {
        let dir = obs.archive_dir(&self.root);
        let expected = obs.expected_files(date);
        let manifest = manifest_name("obs", obs.as_ref(), &pdy(date));

        audit(&dir, expected, run_dir, &manifest, &pdy(date))
    }

    /// Check one cycle of fit-to-obs statistics.
    pub fn audit_fit2obs(
        &self,
        source: Fit2obs,
        cycle: &CycleDate,
        run_dir: &Path,
    ) -> Result<MissingFileReport, ArchiveErr> {
        let dir = source.archive_dir(&self.root);
        let expected = source.expected_files(cycle);
        let manifest = manifest_name("fit2obs", source.as_ref(), &cycle.cdate());

        audit(&dir, expected, run_dir, &manifest, &cycle.cdate())
    }
}

// A missing archive directory means nothing is expected of it.
fn audit(
    dir: &Path,
    expected: Vec<PathBuf>,
    run_dir: &Path,
    manifest: &str,
    date: &str,
) -> Result<MissingFileReport, ArchiveErr> {
    make_dir(run_dir)?;
    info!("In run directory: {}", run_dir.display());

    let expected: Vec<PathBuf> = if dir.is_dir() {
        expected.into_iter().map(|name| dir.join(name)).collect()
    } else {
        info!("{} does not exist", dir.display());
        vec![]
    };

    let report = MissingFileReport::new(expected)?;
    report.log_summary(&format!("{} in {}", date, dir.display()));
    report.write_manifest(&run_dir.join(manifest))?;

    Ok(report)
}

#[cfg(test)]
mod unit {
    use super::*;

    use std::fs;

    use tempdir::TempDir;

    fn cycle(cyc: u32) -> CycleDate {
        CycleDate::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), cyc).unwrap()
    }

    #[test]
    fn test_audit_model() {
        let tmp = TempDir::new("global-archive-test-audit").unwrap();
        let arch = Archive::new(tmp.path().join("model_archive"));
        let run_dir = tmp.path().join("run_check_model_data");
        let cmc_dir = arch.root().join("cmc");
        fs::create_dir_all(&cmc_dir).unwrap();
        fs::write(cmc_dir.join("pgbanl.cmc.2024011500"), b"GRIB").unwrap();
        fs::write(cmc_dir.join("pgbf24.cmc.2024011500"), b"GRIB").unwrap();

        let fhrs = ForecastHours::new(0, 48, 24).unwrap();
        let report = arch.audit_model(Model::Cmc, &cycle(0), fhrs, &run_dir).unwrap();

        assert_eq!(report.found.len(), 2);
        assert_eq!(
            report.missing,
            vec![cmc_dir.join("pgbf00.cmc.2024011500"), cmc_dir.join("pgbf48.cmc.2024011500")]
        );

        let manifest = run_dir.join("missing_files_model_cmc_2024011500.txt");
        let text = fs::read_to_string(&manifest).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|line| Path::new(line).is_absolute()));
    }

    #[test]
    fn test_audit_missing_dir() {
        let tmp = TempDir::new("global-archive-test-audit").unwrap();
        let arch = Archive::new(tmp.path().join("obs_archive"));
        let run_dir = tmp.path().join("run_check_obs_data");

        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let report = arch.audit_obs(Obs::PrepbufrGdas, date, &run_dir).unwrap();

        assert_eq!(report.expected(), 0);
        assert!(run_dir.is_dir());
        assert_eq!(fs::read_dir(&run_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_audit_complete_fit2obs() {
        let tmp = TempDir::new("global-archive-test-audit").unwrap();
        let arch = Archive::new(tmp.path().join("fit2obs_archive"));
        let run_dir = tmp.path().join("run_check_fit2obs_data");
        let fnl = arch.root().join("fnl");

        for name in Fit2obs::Fnl.expected_files(&cycle(12)) {
            let path = fnl.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"fit").unwrap();
        }

        let report = arch.audit_fit2obs(Fit2obs::Fnl, &cycle(12), &run_dir).unwrap();
        assert_eq!(report.found.len(), 70);
        assert!(report.missing.is_empty());
        assert!(!run_dir.join("missing_files_fit2obs_fnl_2024011512.txt").exists());
    }
}
