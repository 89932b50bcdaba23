//! Fit-to-obs statistics, archived as directory trees per cycle.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
    config::Settings,
    dates::{pdy, CycleDate},
    task::{FetchTask, Step},
    tools,
};

/// Fit-to-obs statistics sources.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString, AsRefStr, Display, EnumIter, Hash)]
pub enum Fit2obs {
    /// Operational GFS final analysis fits
    #[strum(serialize = "fnl")]
    Fnl,
}

/// Cycles with statistics each day.
pub const FIT2OBS_CYCLES: &[u32] = &[0, 6, 12, 18];

/// Directories, relative to the source's archive directory, that hold statistics.
pub const FIT2OBS_SUBDIRS: &[&str] = &["fits", "horiz/fcs", "horiz/anl"];

const FIT_TYPES: &[&str] = &["acar", "acft", "raob", "sfc", "surf"];
const FIT_HOURS: &[&str] = &[
    "00", "06", "12", "24", "36", "48", "60", "72", "84", "96", "108", "120",
];
const HORIZ_SUBDIRS: &[&str] = &["anl", "fcs"];
const HORIZ_TYPES: &[&str] = &["adpsfc", "adpupa.mand", "aircar", "aircft", "sfcshp"];

impl Fit2obs {
    /// Fit-to-obs statistics are all restricted.
    pub fn is_restricted(self) -> bool {
        true
    }

    /// The source's directory under the archive root.
    pub fn archive_dir(self, archive_root: &Path) -> PathBuf {
        archive_root.join(self.as_ref())
    }

    /// Name of the yearly bundle.
    pub fn bundle_name(self, year: i32) -> String {
        format!("{}_{}.tar", self, year)
    }

    /// Shell style pattern selecting one year from each statistics directory.
    pub fn bundle_pattern(self, year: i32) -> String {
        format!("*.{}*", year)
    }

    /// Files the archive should hold for one cycle, relative to the source's archive directory.
    pub fn expected_files(self, cycle: &CycleDate) -> Vec<PathBuf> {
        let cdate = cycle.cdate();
        let cdate = cdate.as_str();
        let fits = FIT_TYPES.iter().flat_map(|kind| {
            FIT_HOURS
                .iter()
                .map(move |fhr| PathBuf::from(format!("fits/f{}.{}.{}", fhr, kind, cdate)))
        });
        let horiz = HORIZ_SUBDIRS.iter().flat_map(|subdir| {
            HORIZ_TYPES
                .iter()
                .map(move |kind| PathBuf::from(format!("horiz/{}/{}.{}", subdir, kind, cdate)))
        });

        fits.chain(horiz).collect()
    }

    /// Fetch tasks for one day: unpack each cycle's tarball and copy the trees into the archive.
    ///
    /// The 24 hour radiosonde fit stands in for the whole cycle when checking the archive.
    pub fn fetch_tasks(
        self,
        settings: &Settings,
        archive_dir: &Path,
        run_dir: &Path,
        date: NaiveDate,
    ) -> Vec<FetchTask> {
        let prod = settings
            .comroot
            .join("cfs")
            .join(&settings.cfs_ver)
            .join("fit2obs")
            .join("GFS.fits")
            .join(date.format("%Y").to_string());

        FIT2OBS_CYCLES
            .iter()
            .map(|cycle| {
                let cdate = format!("{}{:02}", pdy(date), cycle);
                let gate = format!("f24.raob.{}", cdate);
                let tarball = prod.join(format!("GFS.fits.{}", cdate));

                FetchTask::new(archive_dir.join("fits").join(&gate), run_dir)
                    .step(
                        Step::new(run_dir.join("fits").join(&gate))
                            .input(&tarball)
                            .command(tools::tar_extract(&tarball, run_dir)),
                    )
                    .publish_tree(run_dir, archive_dir, FIT2OBS_SUBDIRS)
                    .restricted(self.is_restricted())
            })
            .collect()
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_expected_files() {
        let cycle = CycleDate::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), 6).unwrap();
        let expected = Fit2obs::Fnl.expected_files(&cycle);

        assert_eq!(expected.len(), 5 * 12 + 2 * 5);
        assert_eq!(expected[0], PathBuf::from("fits/f00.acar.2024011506"));
        assert!(expected.contains(&PathBuf::from("fits/f120.surf.2024011506")));
        assert_eq!(
            expected.last(),
            Some(&PathBuf::from("horiz/fcs/sfcshp.2024011506"))
        );
    }

    #[test]
    fn test_fetch_tasks() {
        let settings = Settings::defaults("/home/ga");
        let tasks = Fit2obs::Fnl.fetch_tasks(
            &settings,
            Path::new("/fit2obs_archive/fnl"),
            Path::new("/run/fnl/20240115"),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        );

        assert_eq!(tasks.len(), 4);
        assert!(tasks.iter().all(FetchTask::is_restricted));
        assert_eq!(
            tasks[3].archive(),
            Path::new("/fit2obs_archive/fnl/fits/f24.raob.2024011518")
        );
        assert_eq!(Fit2obs::Fnl.bundle_name(2024), "fnl_2024.tar");
    }
}
