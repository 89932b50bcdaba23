//! The common analysis: the mean of the GFS, ECMWF, UKMO, and CMC analyses on a 1 degree grid.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::info;

use super::Archive;

use crate::{
    config::Session,
    dates::CycleDate,
    errors::ArchiveErr,
    files::{check_file, glob_in, restrict},
    models::archive_name,
    shell::Cmd,
    task::{FetchTask, Outcome, Step},
    tools,
};

// Member models and the archived file used as each one's analysis, in input order.
const CANL_MEMBERS: &[(&str, &str)] = &[
    ("gfs", "pgbanl"),
    ("ecm", "pgbf00"),
    ("ukm", "pgbf00"),
    ("cmc", "pgbf00"),
];

const CANL_GRID: u32 = 3;
// Points on the 1 degree global grid.
const CANL_NPTS: &str = "65160";
// Variables and their GRIB1 parameter numbers.
const CANL_VARS: &[(&str, &str)] = &[("HGT", "7"), ("TMP", "11"), ("UGRD", "33"), ("VGRD", "34")];
const CANL_LEVELS: &[&str] = &["1000", "925", "850", "700", "500", "250", "200"];
const ISOBARIC: &str = "100";

impl Archive {
    /// Build `canl/pgbanl.canl.CDATE` from the member analyses already in this archive.
    ///
    /// Every member is required. When one is missing nothing is averaged and the outcome is
    /// [`Outcome::Blocked`].
    pub fn create_canl(
        &self,
        session: &Session,
        cycle: &CycleDate,
        run_root: &Path,
    ) -> Result<Outcome, ArchiveErr> {
        let archive_dir = self.root.join("canl");
        let name = archive_name("pgbanl", "canl", cycle);
        let archive = archive_dir.join(&name);

        if session.settings.send_to_archive() {
            Archive::prepare_dir(session, &archive_dir, false)?;
        }
        let run_dir = run_root.join("canl").join(cycle.cdate());
        Archive::prepare_dir(session, &run_dir, false)?;
        info!("In run directory: {}", run_dir.display());

        if check_file(&archive)? {
            return Ok(Outcome::AlreadyArchived);
        }

        let run_file = run_dir.join(&name);
        if !check_file(&run_file)? {
            if !self.regrid_members(session, cycle, &run_dir)? {
                info!("Not all analyses are available for {}", cycle);
                return Ok(Outcome::Blocked);
            }
            mean_analyses(session, &run_dir)?;
            concatenate(&glob_in(&run_dir, "outtmp_*")?, &run_file)?;
        }

        FetchTask::new(&archive, &run_dir)
            .step(Step::new(&run_file))
            .run(session)
    }

    // Regrid each member to inputN in the run directory. False if any is missing.
    fn regrid_members(
        &self,
        session: &Session,
        cycle: &CycleDate,
        run_dir: &Path,
    ) -> Result<bool, ArchiveErr> {
        let mut complete = true;

        for (n, (model, kind)) in CANL_MEMBERS.iter().enumerate() {
            let member = self.root.join(model).join(archive_name(kind, model, cycle));
            if !check_file(&member)? {
                complete = false;
                continue;
            }

            let input = run_dir.join(format!("input{}", n + 1));
            if !check_file(&input)? {
                session.runner.run(&tools::copygb_regrid(
                    session.settings,
                    CANL_GRID,
                    &member,
                    &input,
                ));
            }
            if !check_file(&input)? {
                complete = false;
            } else if *model == "ecm" {
                restrict(session.runner, &input);
            }
        }

        Ok(complete)
    }
}

// One mean_anl run per variable and level. Each leaves `outtmp`, renamed after what it holds.
fn mean_analyses(session: &Session, run_dir: &Path) -> Result<(), ArchiveErr> {
    let mean_anl = session.settings.exec("mean_anl");
    let members = CANL_MEMBERS.len().to_string();
    let outtmp = run_dir.join("outtmp");

    for (var, kpds5) in CANL_VARS {
        for level in CANL_LEVELS {
            session.runner.run(
                &Cmd::new(&mean_anl)
                    .args(&[members.as_str(), *kpds5, ISOBARIC, *level, CANL_NPTS])
                    .current_dir(run_dir),
            );
            if check_file(&outtmp)? {
                fs::rename(&outtmp, run_dir.join(format!("outtmp_{}{}", var, level)))?;
            }
        }
    }

    Ok(())
}

fn concatenate(parts: &[PathBuf], output: &Path) -> Result<(), ArchiveErr> {
    if parts.is_empty() {
        return Ok(());
    }

    let mut out = fs::File::create(output)?;
    for part in parts {
        io::copy(&mut fs::File::open(part)?, &mut out)?;
    }
    out.flush()?;

    Ok(())
}
