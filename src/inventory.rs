use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{errors::ArchiveErr, files::check_file};

/// Which expected archive files are present and which are not.
///
/// Built by checking each expected path with the existence oracle, so empty files count as
/// missing (and are removed along the way).
#[allow(missing_docs)]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MissingFileReport {
    pub found: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

impl MissingFileReport {
    /// Check every path in `expected`, keeping the input order in both lists.
    pub fn new(expected: impl IntoIterator<Item = PathBuf>) -> Result<Self, ArchiveErr> {
        let mut report = MissingFileReport::default();

        for path in expected {
            if check_file(&path)? {
                report.found.push(path);
            } else {
                report.missing.push(path);
            }
        }

        Ok(report)
    }

    /// The number of files checked.
    pub fn expected(&self) -> usize {
        self.found.len() + self.missing.len()
    }

    /// Log the tally for `label`, nothing if no files were expected.
    pub fn log_summary(&self, label: &str) {
        if self.expected() > 0 {
            info!(
                "Found {}, missing {}, expected {} for {}",
                self.found.len(),
                self.missing.len(),
                self.expected(),
                label
            );
        }
    }

    /// Write the missing paths to `manifest`, one per line, replacing any earlier manifest.
    ///
    /// Nothing is written when nothing is missing. Returns whether a manifest was written.
    pub fn write_manifest(&self, manifest: &Path) -> Result<bool, ArchiveErr> {
        if self.missing.is_empty() {
            return Ok(false);
        }

        info!("Writing missing files to {}", manifest.display());
        if manifest.exists() {
            fs::remove_file(manifest)?;
        }

        let mut file = fs::File::create(manifest)?;
        for path in &self.missing {
            writeln!(file, "{}", path.display())?;
        }

        Ok(true)
    }
}

/// Name of the manifest for one kind of data, one source, and one date.
pub fn manifest_name(kind: &str, name: &str, date: &str) -> String {
    format!("missing_files_{}_{}_{}.txt", kind, name, date)
}

#[cfg(test)]
mod unit {
    use super::*;

    use tempdir::TempDir;

    #[test]
    fn test_partition() {
        let tmp = TempDir::new("global-archive-test-inventory").unwrap();
        let present = tmp.path().join("pgbf00.gfs.2024011500");
        let empty = tmp.path().join("pgbf24.gfs.2024011500");
        let absent = tmp.path().join("pgbanl.gfs.2024011500");
        fs::write(&present, b"GRIB").unwrap();
        fs::write(&empty, b"").unwrap();

        let report =
            MissingFileReport::new(vec![absent.clone(), present.clone(), empty.clone()]).unwrap();

        assert_eq!(report.found, vec![present]);
        assert_eq!(report.missing, vec![absent, empty.clone()]);
        assert_eq!(report.expected(), 3);
        assert!(!empty.exists());
    }

    #[test]
    fn test_manifest() {
        let tmp = TempDir::new("global-archive-test-inventory").unwrap();
        let manifest = tmp
            .path()
            .join(manifest_name("model", "gfs", "2024011500"));
        assert!(manifest.ends_with("missing_files_model_gfs_2024011500.txt"));

        fs::write(&manifest, "stale\n").unwrap();
        let report = MissingFileReport {
            found: vec![],
            missing: vec![PathBuf::from("/a/x"), PathBuf::from("/a/y")],
        };
        assert!(report.write_manifest(&manifest).unwrap());
        assert_eq!(fs::read_to_string(&manifest).unwrap(), "/a/x\n/a/y\n");

        let complete = MissingFileReport {
            found: vec![PathBuf::from("/a/x")],
            missing: vec![],
        };
        fs::remove_file(&manifest).unwrap();
        assert!(!complete.write_manifest(&manifest).unwrap());
        assert!(!manifest.exists());
    }
}
