//! The existence oracle and the file moves built on it.
//!
//! [`check_file`] is the gate in front of every fetch, convert, and publish step. "true" means the
//! file is already done and the step is skipped.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::{
    errors::ArchiveErr,
    shell::{Cmd, CommandRunner},
};

/// Group given read access to restricted data.
pub const RESTRICTED_GROUP: &str = "rstprod";
/// Mode applied to restricted data.
pub const RESTRICTED_MODE: &str = "750";

/// Report whether `path` exists with a non-zero size.
///
/// A zero-size file is deleted and reported as missing. Anything other than "not found" while
/// looking at or deleting the file is returned as an error.
pub fn check_file(path: &Path) -> Result<bool, ArchiveErr> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() != 0 => {
            info!("{} EXISTS", path.display());
            Ok(true)
        }
        Ok(_) => {
            info!("{} SIZE 0, REMOVING", path.display());
            remove_path(path)?;
            Ok(false)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!("{} DOES NOT EXIST", path.display());
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

/// Copy `src` to `dest` if `src` is present and non-empty.
///
/// The data lands in a hidden sibling first and is renamed into place, so `dest` is never seen
/// half written. An empty `dest` left behind afterwards is removed.
pub fn copy_file(src: &Path, dest: &Path) -> Result<(), ArchiveErr> {
    match fs::metadata(src) {
        Ok(meta) if meta.len() != 0 => {
            let partial = partial_path(dest);
            if let Err(err) = fs::copy(src, &partial).and_then(|_| fs::rename(&partial, dest)) {
                remove_path(&partial)?;
                return Err(err.into());
            }
        }
        Ok(_) => info!("{} SIZE 0, NOT COPYING", src.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!("{} DOES NOT EXIST", src.display())
        }
        Err(err) => return Err(err.into()),
    }

    remove_if_empty(dest)
}

/// Symlink `dest` to `src` if `src` exists.
pub fn link_file(src: &Path, dest: &Path) -> Result<(), ArchiveErr> {
    if src.exists() {
        // A dangling link fails the oracle but still blocks a new one.
        if fs::symlink_metadata(dest).is_ok() {
            fs::remove_file(dest)?;
        }
        symlink(src, dest)?;
    } else {
        info!("{} DOES NOT EXIST", src.display());
    }

    remove_if_empty(dest)
}

/// Create `dir` and any missing parents. Returns true when something was created.
pub fn make_dir(dir: &Path) -> Result<bool, ArchiveErr> {
    if dir.is_dir() {
        Ok(false)
    } else {
        info!("Making directory {}", dir.display());
        fs::create_dir_all(dir)?;
        Ok(true)
    }
}

/// Limit `path` to the restricted group with `chmod` and `chgrp`.
pub fn restrict(runner: &dyn CommandRunner, path: &Path) {
    runner.run(&Cmd::new("chmod").arg(RESTRICTED_MODE).arg(path));
    runner.run(&Cmd::new("chgrp").arg(RESTRICTED_GROUP).arg(path));
}

/// Paths under `dir` whose names match the shell style `pattern`, sorted.
pub fn glob_in(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, ArchiveErr> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    let mut matches = glob::glob(&full)?
        .collect::<Result<Vec<_>, _>>()?;
    matches.sort();
    Ok(matches)
}

/// Remove a file, a link, or a whole directory tree.
pub fn remove_path(path: &Path) -> Result<(), ArchiveErr> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn remove_if_empty(path: &Path) -> Result<(), ArchiveErr> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 && meta.is_file() => {
            warn!("{} SIZE 0, REMOVING", path.display());
            remove_path(path)
        }
        _ => Ok(()),
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.partial", name))
}

#[cfg(unix)]
fn symlink(src: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dest)
}

#[cfg(not(unix))]
fn symlink(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest).map(|_| ())
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::shell::testing::RecordingRunner;

    use tempdir::TempDir;

    #[test]
    fn test_check_file() {
        let tmp = TempDir::new("global-archive-test-files").unwrap();

        let missing = tmp.path().join("pgbf00.gfs.2024011500");
        assert!(!check_file(&missing).unwrap());
        assert!(!missing.exists());

        let empty = tmp.path().join("pgbf06.gfs.2024011500");
        fs::write(&empty, b"").unwrap();
        assert!(!check_file(&empty).unwrap());
        assert!(!empty.exists(), "zero size file should be removed");

        let full = tmp.path().join("pgbf12.gfs.2024011500");
        fs::write(&full, b"GRIB").unwrap();
        assert!(check_file(&full).unwrap());
        assert_eq!(fs::read(&full).unwrap(), b"GRIB");
    }

    #[test]
    fn test_check_file_dangling_link() {
        let tmp = TempDir::new("global-archive-test-files").unwrap();
        let link = tmp.path().join("pgbanl.cmc.2024011500");
        symlink(&tmp.path().join("nothing"), &link).unwrap();

        assert!(!check_file(&link).unwrap());
    }

    #[test]
    fn test_copy_file() {
        let tmp = TempDir::new("global-archive-test-files").unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("dest");

        copy_file(&src, &dest).unwrap();
        assert!(!dest.exists());

        fs::write(&src, b"").unwrap();
        copy_file(&src, &dest).unwrap();
        assert!(!dest.exists());

        fs::write(&src, b"data").unwrap();
        copy_file(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"data");
        assert!(!tmp.path().join(".dest.partial").exists());
    }

    #[test]
    fn test_copy_file_failure_cleans_up() {
        let tmp = TempDir::new("global-archive-test-files").unwrap();
        let src = tmp.path().join("src");
        fs::write(&src, b"data").unwrap();

        // A directory in the way makes the final rename fail.
        let dest = tmp.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("inside"), b"x").unwrap();

        assert!(copy_file(&src, &dest).is_err());
        assert!(!tmp.path().join(".dest.partial").exists());
        assert!(dest.join("inside").exists());
    }

    #[test]
    fn test_link_file() {
        let tmp = TempDir::new("global-archive-test-files").unwrap();
        let src = tmp.path().join("pgbf00.cmc.2024011500");
        let dest = tmp.path().join("pgbanl.cmc.2024011500");

        link_file(&src, &dest).unwrap();
        assert!(fs::symlink_metadata(&dest).is_err());

        fs::write(&src, b"GRIB").unwrap();
        link_file(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"GRIB");

        // Relinking over an existing link works.
        link_file(&src, &dest).unwrap();
        assert!(check_file(&dest).unwrap());
    }

    #[test]
    fn test_glob_and_remove() {
        let tmp = TempDir::new("global-archive-test-files").unwrap();
        for name in &["a.20240115", "b.20240115", "c.20240116"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }
        fs::create_dir(tmp.path().join("nam.20240115")).unwrap();
        fs::write(tmp.path().join("nam.20240115").join("f"), b"x").unwrap();

        let found = glob_in(tmp.path(), "*20240115*").unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.windows(2).all(|w| w[0] < w[1]));

        for path in &found {
            remove_path(path).unwrap();
        }
        assert_eq!(glob_in(tmp.path(), "*").unwrap().len(), 1);
    }

    #[test]
    fn test_restrict() {
        let runner = RecordingRunner::new();
        restrict(&runner, Path::new("/archive/ecm"));

        let argv: Vec<Vec<String>> = runner.calls().iter().map(Cmd::argv).collect();
        assert_eq!(argv[0], vec!["chmod", "750", "/archive/ecm"]);
        assert_eq!(argv[1], vec!["chgrp", "rstprod", "/archive/ecm"]);
    }
}
