use std::path::{Path, PathBuf};

use super::Archive;

use crate::{
    config::Session,
    errors::ArchiveErr,
    files::{make_dir, restrict},
};

impl Archive {
    /// An archive rooted at `root`. Nothing on disk is touched.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Archive { root: root.into() }
    }

    /// Open an archive whose root must already exist.
    pub fn connect(root: impl Into<PathBuf>) -> Result<Self, ArchiveErr> {
        let root = root.into();
        if root.is_dir() {
            Ok(Archive { root })
        } else {
            Err(ArchiveErr::MissingDirectory(root))
        }
    }

    /// Retrieve a path to the root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A directory below the root that must already exist.
    pub(crate) fn existing_dir(&self, dir: PathBuf) -> Result<PathBuf, ArchiveErr> {
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(ArchiveErr::MissingDirectory(dir))
        }
    }

    /// Create `dir` if needed, restricting it when it is new and holds restricted data.
    pub(crate) fn prepare_dir(
        session: &Session,
        dir: &Path,
        restricted: bool,
    ) -> Result<(), ArchiveErr> {
        if make_dir(dir)? && restricted {
            restrict(session.runner, dir);
        }
        Ok(())
    }
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::{config::Settings, shell::testing::RecordingRunner};

    use tempdir::TempDir;

    #[test]
    fn test_connect() {
        let tmp = TempDir::new("global-archive-test-root").unwrap();

        let arch = Archive::connect(tmp.path()).unwrap();
        assert_eq!(arch.root(), tmp.path());

        match Archive::connect(tmp.path().join("model_archive")) {
            Err(ArchiveErr::MissingDirectory(dir)) => assert!(dir.ends_with("model_archive")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(arch.existing_dir(tmp.path().join("gfs")).is_err());
    }

    #[test]
    fn test_prepare_dir() {
        let tmp = TempDir::new("global-archive-test-root").unwrap();
        let settings = Settings::defaults("/home/ga");
        let runner = RecordingRunner::new();
        let session = Session::new(&settings, &runner);

        let dir = tmp.path().join("ecm").join("2024011500");
        Archive::prepare_dir(&session, &dir, true).unwrap();
        assert!(dir.is_dir());
        assert_eq!(runner.programs(), vec!["chmod", "chgrp"]);

        // Already there, nothing more to do.
        Archive::prepare_dir(&session, &dir, true).unwrap();
        assert_eq!(runner.calls().len(), 2);
    }
}
