//! Monthly and yearly HPSS bundles, and restoring a monthly model bundle.
//!
//! Members are always passed to `tar`/`htar` as an explicit list of names relative to the
//! archive directory, which is also the working directory of the command.

use std::path::{Path, PathBuf};

use tracing::info;

use super::Archive;

use crate::{
    config::Session,
    dates::YearMonth,
    errors::ArchiveErr,
    files::{glob_in, remove_path, RESTRICTED_GROUP, RESTRICTED_MODE},
    fit2obs::{Fit2obs, FIT2OBS_SUBDIRS},
    models::Model,
    obs::{get_d_date, Obs},
    tools,
};

impl Archive {
    /// Bundle one month of one cycle of `model` into `{hpss_root}/{model}`.
    ///
    /// Returns the HPSS path of the bundle, or `None` when there was nothing to bundle.
    pub fn bundle_model_month(
        &self,
        session: &Session,
        model: Model,
        month: YearMonth,
        cycle: u32,
        hpss_root: &str,
    ) -> Result<Option<String>, ArchiveErr> {
        let dir = self.existing_dir(model.archive_dir(&self.root))?;
        let hpss_dir = hpss_dir(hpss_root, model.as_ref());
        make_hpss_dir(session, &hpss_dir, model.is_restricted());

        info!("In directory: {}", dir.display());
        let members = relative(&dir, glob_in(&dir, &model.bundle_pattern(month, cycle))?);
        if members.is_empty() {
            info!("No files for {} in {}", month, dir.display());
            return Ok(None);
        }

        let tarball = format!("{}/{}", hpss_dir, model.bundle_name(month, cycle));
        session.runner.run(&tools::htar_create(&tarball, &dir, &members));
        if model.is_restricted() {
            restrict_hpss(session, &tarball);
        }

        Ok(Some(tarball))
    }

    /// Bundle one month of an observation source into `{hpss_root}/{obs}`.
    ///
    /// GET-D files are named by julian day, so they are picked by the date in the name and go
    /// through a local tar and `hsi put`.
    pub fn bundle_obs_month(
        &self,
        session: &Session,
        obs: Obs,
        month: YearMonth,
        hpss_root: &str,
    ) -> Result<Option<String>, ArchiveErr> {
        let dir = self.existing_dir(obs.archive_dir(&self.root))?;
        let hpss_dir = hpss_dir(hpss_root, obs.as_ref());
        make_hpss_dir(session, &hpss_dir, obs.is_restricted());

        info!("In directory: {}", dir.display());
        let name = obs.bundle_name(month);
        let tarball = format!("{}/{}", hpss_dir, name);

        if obs == Obs::GetD {
            let in_month = |path: &PathBuf| {
                path.file_name()
                    .and_then(|name| get_d_date(&name.to_string_lossy()))
                    .map_or(false, |date| YearMonth::containing(date) == month)
            };
            let files = glob_in(&dir, &format!("*{}*", month.year()))?
                .into_iter()
                .filter(in_month)
                .collect();
            let members = relative(&dir, files);
            if members.is_empty() {
                info!("No files for {} in {}", month, dir.display());
                return Ok(None);
            }

            put_local_tar(session, &dir, &name, &members, &tarball)?;
        } else {
            let members = relative(&dir, glob_in(&dir, &obs.bundle_pattern(month))?);
            if members.is_empty() {
                info!("No files for {} in {}", month, dir.display());
                return Ok(None);
            }

            session.runner.run(&tools::htar_create(&tarball, &dir, &members));
        }

        if obs.is_restricted() {
            restrict_hpss(session, &tarball);
        }

        Ok(Some(tarball))
    }

    /// Bundle one year of fit-to-obs statistics into `{hpss_root}/{source}`.
    pub fn bundle_fit2obs_year(
        &self,
        session: &Session,
        source: Fit2obs,
        year: i32,
        hpss_root: &str,
    ) -> Result<Option<String>, ArchiveErr> {
        let dir = self.existing_dir(source.archive_dir(&self.root))?;
        let hpss_dir = hpss_dir(hpss_root, source.as_ref());
        make_hpss_dir(session, &hpss_dir, source.is_restricted());

        info!("In directory: {}", dir.display());
        let pattern = source.bundle_pattern(year);
        let mut files = vec![];
        for subdir in FIT2OBS_SUBDIRS {
            files.extend(glob_in(&dir, &format!("{}/{}", subdir, pattern))?);
        }
        let members = relative(&dir, files);
        if members.is_empty() {
            info!("No files for {} in {}", year, dir.display());
            return Ok(None);
        }

        let name = source.bundle_name(year);
        let tarball = format!("{}/{}", hpss_dir, name);
        put_local_tar(session, &dir, &name, &members, &tarball)?;
        if source.is_restricted() {
            restrict_hpss(session, &tarball);
        }

        Ok(Some(tarball))
    }

    /// Unpack one monthly model bundle from `{hpss_root}/{model}` into the model's directory.
    pub fn restore_model_month(
        &self,
        session: &Session,
        model: Model,
        month: YearMonth,
        cycle: u32,
        hpss_root: &str,
    ) -> Result<PathBuf, ArchiveErr> {
        let dir = model.archive_dir(&self.root);
        Archive::prepare_dir(session, &dir, model.is_restricted())?;
        info!("In directory: {}", dir.display());

        let tarball = format!(
            "{}/{}",
            hpss_dir(hpss_root, model.as_ref()),
            model.bundle_name(month, cycle)
        );
        session.runner.run(&tools::htar_extract(&tarball, &dir, &[]));

        Ok(dir)
    }
}

fn hpss_dir(hpss_root: &str, name: &str) -> String {
    format!("{}/{}", hpss_root.trim_end_matches('/'), name)
}

fn make_hpss_dir(session: &Session, hpss_dir: &str, restricted: bool) {
    session
        .runner
        .run(&tools::hsi(format!("mkdir -p {}", hpss_dir)));
    if restricted {
        restrict_hpss(session, hpss_dir);
    }
}

fn restrict_hpss(session: &Session, path: &str) {
    session
        .runner
        .run(&tools::hsi(format!("chmod {} {}", RESTRICTED_MODE, path)));
    session
        .runner
        .run(&tools::hsi(format!("chgrp {} {}", RESTRICTED_GROUP, path)));
}

// Tar the members in the archive directory, send the tarball to HPSS, and drop the local copy.
fn put_local_tar(
    session: &Session,
    dir: &Path,
    name: &str,
    members: &[PathBuf],
    tarball: &str,
) -> Result<(), ArchiveErr> {
    let local = dir.join(name);
    session.runner.run(&tools::tar_create(&local, dir, members));
    session
        .runner
        .run(&tools::hsi_put(&local, tarball).current_dir(dir));
    remove_path(&local)
}

fn relative(dir: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter_map(|path| path.strip_prefix(dir).ok().map(Path::to_path_buf))
        .collect()
}
