//! Production GFS files pulled back out of the HPSS run history.
//!
//! The production tarballs changed name and layout with each GFS implementation, so the tarball
//! and member names depend on which era the cycle falls in.

use std::path::Path;

use chrono::NaiveDate;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::{Archive, FetchSummary};

use crate::{
    config::{Session, Settings},
    dates::{fhr2, fhr3, CycleDate, ForecastHours},
    errors::ArchiveErr,
    models::{archive_name, Model},
    task::{run_tasks, FetchTask, Source, Step},
    tools,
};

/// Kinds of production GFS file that can be retrieved.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString, AsRefStr, Display, EnumIter, Hash)]
pub enum FileType {
    /// 1 degree pressure level files
    #[strum(serialize = "pgb")]
    Pgb,
    /// Native grid surface flux files
    #[strum(serialize = "flx")]
    Flx,
}

/// GFS production layouts in the run history, oldest first.
#[derive(Clone, Copy, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum HpssEra {
    /// `com2` on the IBM machines.
    Com2,
    /// The Cray `gpfs/hps` file system.
    GpfsHps,
    /// The Dell `gpfs/dell1` file system, one directory per cycle.
    GpfsDell1,
    /// `com` on the Dell machines.
    Com,
    /// `com` with the atmos subdirectory.
    ComAtmos,
}

const ERA_STARTS: &[(HpssEra, (i32, u32, u32))] = &[
    (HpssEra::ComAtmos, (2021, 3, 21)),
    (HpssEra::Com, (2020, 2, 26)),
    (HpssEra::GpfsDell1, (2019, 6, 12)),
    (HpssEra::GpfsHps, (2017, 7, 20)),
    (HpssEra::Com2, (2016, 5, 10)),
];

const EARLIEST: &str = "20160510";
const FLUX_MATCH: &str = "(:PRATE:surface:)|(:TMP:2 m above ground:)";
// Where flux files lived on the Cray, stored with the full path in the tarballs.
const GPFS_HPS_COM: &str = "/gpfs/hps/nco/ops/com/gfs/prod";

impl HpssEra {
    /// The era a cycle's production files were archived in.
    pub fn of(cycle: &CycleDate) -> Result<Self, ArchiveErr> {
        ERA_STARTS
            .iter()
            .find(|(_, (y, m, d))| {
                NaiveDate::from_ymd_opt(*y, *m, *d).map_or(false, |start| cycle.date() >= start)
            })
            .map(|(era, _)| *era)
            .ok_or_else(|| ArchiveErr::DateTooEarly {
                earliest: EARLIEST,
                requested: cycle.pdy(),
            })
    }

    // One directory per cycle instead of one tarball per cycle date.
    fn per_cycle_dirs(self) -> bool {
        self >= HpssEra::GpfsDell1
    }

    fn tar_prefix(self, cycle: &CycleDate) -> String {
        let (pdy, cyc) = (cycle.pdy(), cycle.cyc());
        match self {
            HpssEra::ComAtmos | HpssEra::Com => format!("com_gfs_prod_gfs.{}_{}.gfs", pdy, cyc),
            HpssEra::GpfsDell1 => {
                format!("gpfs_dell1_nco_ops_com_gfs_prod_gfs.{}_{}.gfs", pdy, cyc)
            }
            HpssEra::GpfsHps => format!("gpfs_hps_nco_ops_com_gfs_prod_gfs.{}", cycle.cdate()),
            HpssEra::Com2 => format!("com2_gfs_prod_gfs.{}", cycle.cdate()),
        }
    }

    fn file_prefix(self, cycle: &CycleDate) -> String {
        let (pdy, cyc) = (cycle.pdy(), cycle.cyc());
        match self {
            HpssEra::ComAtmos => format!("gfs.{}/{}/atmos/gfs.t{}z.", pdy, cyc, cyc),
            HpssEra::Com | HpssEra::GpfsDell1 => format!("gfs.{}/{}/gfs.t{}z.", pdy, cyc, cyc),
            HpssEra::GpfsHps | HpssEra::Com2 => format!("gfs.t{}z.", cyc),
        }
    }

    /// Full HPSS path of the tarball holding `file_type` for `cycle`.
    pub fn tarball(self, settings: &Settings, cycle: &CycleDate, file_type: FileType) -> String {
        let suffix = match (file_type, self.per_cycle_dirs()) {
            (FileType::Pgb, true) => "_pgrb2.tar",
            (FileType::Flx, true) => "_flux.tar",
            (FileType::Pgb, false) => ".pgrb2_1p00.tar",
            (FileType::Flx, false) => ".sfluxgrb.tar",
        };

        let date = cycle.date();
        format!(
            "{}/rh{}/{}/{}/{}{}",
            settings.hpss_prod_dir.trim_end_matches('/'),
            date.format("%Y"),
            date.format("%Y%m"),
            cycle.pdy(),
            self.tar_prefix(cycle),
            suffix
        )
    }

    /// Name of one forecast hour's file inside the tarball.
    pub fn member(self, cycle: &CycleDate, file_type: FileType, fhr: u32) -> String {
        let prefix = self.file_prefix(cycle);
        match (file_type, self) {
            (FileType::Pgb, _) => format!("./{}pgrb2.1p00.f{}", prefix, fhr3(fhr)),
            (FileType::Flx, HpssEra::GpfsHps) => format!(
                "{}/gfs.{}/{}sfluxgrbf{}.grib2",
                GPFS_HPS_COM,
                cycle.pdy(),
                prefix,
                fhr2(fhr)
            ),
            (FileType::Flx, HpssEra::Com2) => format!("./{}sfluxgrbf{}.grib2", prefix, fhr2(fhr)),
            (FileType::Flx, _) => format!("./{}sfluxgrbf{}.grib2", prefix, fhr3(fhr)),
        }
    }
}

impl Archive {
    /// Retrieve production GFS files for one cycle and convert them the way the GFS fetch does.
    ///
    /// The archive root is the GFS directory itself.
    pub fn fetch_prod_gfs(
        &self,
        session: &Session,
        file_type: FileType,
        cycle: &CycleDate,
        fhrs: ForecastHours,
        run_dir: &Path,
    ) -> Result<FetchSummary, ArchiveErr> {
        let era = HpssEra::of(cycle)?;

        if session.settings.send_to_archive() {
            Archive::prepare_dir(session, &self.root, false)?;
        }
        Archive::prepare_dir(session, run_dir, false)?;
        tracing::info!("In run directory: {}", run_dir.display());

        let tasks: Vec<FetchTask> = Model::Gfs
            .forecast_hours(fhrs)
            .into_iter()
            .map(|fhr| self.prod_gfs_task(session.settings, era, file_type, cycle, fhr, run_dir))
            .collect();

        let mut summary = FetchSummary::default();
        summary.add(&run_tasks(session, &tasks)?);
        summary.log(&format!("gfs {} {}", file_type, cycle));
        Ok(summary)
    }

    fn prod_gfs_task(
        &self,
        settings: &Settings,
        era: HpssEra,
        file_type: FileType,
        cycle: &CycleDate,
        fhr: u32,
        run_dir: &Path,
    ) -> FetchTask {
        let source = Source::Htar {
            tarball: era.tarball(settings, cycle, file_type),
            member: era.member(cycle, file_type, fhr),
        };
        let cdate = cycle.cdate();

        match file_type {
            FileType::Pgb => {
                let name = archive_name(&format!("pgbf{}", fhr2(fhr)), "gfs", cycle);
                let tmp = run_dir.join(format!("tmp.pgrb2.1p00.gfs.{}.{}", fhr3(fhr), cdate));
                let run_file = run_dir.join(&name);

                FetchTask::new(self.root.join(&name), run_dir)
                    .stage(source, &tmp)
                    .step(
                        Step::new(&run_file)
                            .input(&tmp)
                            .command(tools::cnvgrib_g21(settings, &tmp, &run_file)),
                    )
            }
            FileType::Flx => {
                let name = archive_name(&format!("flxf{}", fhr2(fhr)), "gfs", cycle);
                let tmp = run_dir.join(format!("tmp.sfluxgrb.gfs.{}.{}", fhr3(fhr), cdate));
                let subset = run_dir.join(format!(
                    "tmp.sfluxgrb.gfs.PRATE.2mTMP.{}.{}",
                    fhr3(fhr),
                    cdate
                ));
                let run_file = run_dir.join(&name);

                FetchTask::new(self.root.join(&name), run_dir)
                    .stage(source, &tmp)
                    .step(
                        Step::new(&subset)
                            .input(&tmp)
                            .command(tools::wgrib2_match(settings, &tmp, FLUX_MATCH, &subset)),
                    )
                    .step(
                        Step::new(&run_file)
                            .input(&subset)
                            .command(tools::cnvgrib_g21(settings, &subset, &run_file)),
                    )
            }
        }
    }
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::shell::{
        testing::{write_last_arg, RecordingRunner},
        Cmd,
    };

    use std::{fs, str::FromStr};

    use tempdir::TempDir;

    fn cycle(y: i32, m: u32, d: u32, cyc: u32) -> CycleDate {
        CycleDate::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), cyc).unwrap()
    }

    #[test]
    fn test_eras() {
        assert_eq!(HpssEra::of(&cycle(2024, 1, 15, 0)).unwrap(), HpssEra::ComAtmos);
        assert_eq!(HpssEra::of(&cycle(2021, 3, 21, 0)).unwrap(), HpssEra::ComAtmos);
        assert_eq!(HpssEra::of(&cycle(2021, 3, 20, 18)).unwrap(), HpssEra::Com);
        assert_eq!(HpssEra::of(&cycle(2019, 6, 12, 0)).unwrap(), HpssEra::GpfsDell1);
        assert_eq!(HpssEra::of(&cycle(2018, 1, 1, 0)).unwrap(), HpssEra::GpfsHps);
        assert_eq!(HpssEra::of(&cycle(2016, 5, 10, 0)).unwrap(), HpssEra::Com2);
        assert!(matches!(
            HpssEra::of(&cycle(2016, 5, 9, 18)),
            Err(ArchiveErr::DateTooEarly { .. })
        ));
    }

    #[test]
    fn test_names() {
        let settings = Settings::defaults("/home/ga");

        let new = cycle(2024, 1, 15, 6);
        let era = HpssEra::of(&new).unwrap();
        assert_eq!(
            era.tarball(&settings, &new, FileType::Pgb),
            "/NCEPPROD/hpssprod/runhistory/rh2024/202401/20240115/\
             com_gfs_prod_gfs.20240115_06.gfs_pgrb2.tar"
        );
        assert_eq!(
            era.member(&new, FileType::Flx, 24),
            "./gfs.20240115/06/atmos/gfs.t06z.sfluxgrbf024.grib2"
        );

        let old = cycle(2018, 1, 1, 12);
        let era = HpssEra::of(&old).unwrap();
        assert_eq!(
            era.tarball(&settings, &old, FileType::Flx),
            "/NCEPPROD/hpssprod/runhistory/rh2018/201801/20180101/\
             gpfs_hps_nco_ops_com_gfs_prod_gfs.2018010112.sfluxgrb.tar"
        );
        assert_eq!(
            era.member(&old, FileType::Flx, 6),
            "/gpfs/hps/nco/ops/com/gfs/prod/gfs.20180101/gfs.t12z.sfluxgrbf06.grib2"
        );
        assert_eq!(
            era.member(&old, FileType::Pgb, 6),
            "./gfs.t12z.pgrb2.1p00.f006"
        );

        let oldest = cycle(2016, 6, 1, 0);
        assert_eq!(
            HpssEra::of(&oldest).unwrap().member(&oldest, FileType::Flx, 6),
            "./gfs.t00z.sfluxgrbf06.grib2"
        );

        assert_eq!(FileType::from_str("flx").unwrap(), FileType::Flx);
        assert!(FileType::from_str("sfc").is_err());
    }

    #[test]
    fn test_fetch_flux() {
        let tmp = TempDir::new("global-archive-test-hpss").unwrap();
        let settings = Settings::defaults("/home/ga");
        let run_dir = tmp.path().join("run");

        // htar leaves the member under the run directory, the GRIB tools write their output.
        let extract_root = run_dir.clone();
        let runner = RecordingRunner::with_effect(move |cmd: &Cmd| {
            let argv = cmd.argv();
            if argv[0] == "htar" {
                let member = argv[3].trim_start_matches("./");
                let path = extract_root.join(member);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, b"GRIB2").map(|_| 0).unwrap_or(1)
            } else {
                write_last_arg(cmd)
            }
        });
        let session = Session::new(&settings, &runner);

        let arch = Archive::new(tmp.path().join("gfs"));
        let fhrs = ForecastHours::new(0, 6, 6).unwrap();
        let summary = arch
            .fetch_prod_gfs(&session, FileType::Flx, &cycle(2024, 1, 15, 0), fhrs, &run_dir)
            .unwrap();

        assert_eq!(summary.archived, 2);
        assert_eq!(
            runner.programs(),
            vec!["htar", "wgrib2", "cnvgrib", "htar", "wgrib2", "cnvgrib"]
        );
        assert!(arch.root().join("flxf06.gfs.2024011500").exists());
        assert!(run_dir.join("tmp.sfluxgrb.gfs.006.2024011500").exists());
    }
}
