//! Which half of the production/development machine pair we are running on.

use std::{fs, io, path::Path};

use regex::Regex;
use tracing::{info, warn};

use crate::errors::ArchiveErr;

const CACTUS_XFER: &str = "cdxfer.wcoss2.ncep.noaa.gov";
const DOGWOOD_XFER: &str = "ddxfer.wcoss2.ncep.noaa.gov";
// Login nodes: clogin01 on cactus, dlogin01 on dogwood.
const LOGIN_PATTERN: &str = r"^([cd])login[0-9]{2}$";

/// The production role mapping and the transfer hosts for this node and its partner.
///
/// Any field may be missing; only the pruner uses `other`, and it skips the remote delete when
/// that is absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MachinePair {
    /// Machine currently in the production role.
    pub prod: Option<String>,
    /// Machine currently in the development role.
    pub dev: Option<String>,
    /// Transfer host of the node this process runs on.
    pub current: Option<String>,
    /// Transfer host of the partner node.
    pub other: Option<String>,
}

impl MachinePair {
    /// Resolve from the text of the production machine file and a hostname.
    pub fn resolve(machine_file: &str, hostname: &str) -> Result<Self, ArchiveErr> {
        let mut pair = MachinePair::default();

        for line in machine_file.lines().map(str::trim) {
            if let Some(name) = line.strip_prefix("primary:") {
                pair.prod = Some(name.trim().to_owned());
            } else if let Some(name) = line.strip_prefix("backup:") {
                pair.dev = Some(name.trim().to_owned());
            }
        }

        let login = Regex::new(LOGIN_PATTERN)?;
        let site = login
            .captures(hostname)
            .and_then(|caps| caps.get(1))
            .map(|site| site.as_str());

        let (current, other) = match site {
            Some("c") => (Some(CACTUS_XFER), Some(DOGWOOD_XFER)),
            Some("d") => (Some(DOGWOOD_XFER), Some(CACTUS_XFER)),
            _ => (None, None),
        };
        pair.current = current.map(str::to_owned);
        pair.other = other.map(str::to_owned);

        Ok(pair)
    }

    /// Resolve from the machine file on disk and the `HOSTNAME` environment variable.
    ///
    /// A missing machine file leaves the production roles empty.
    pub fn from_system(machine_file: &Path) -> Result<Self, ArchiveErr> {
        let contents = match fs::read_to_string(machine_file) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("{} DOES NOT EXIST", machine_file.display());
                String::new()
            }
            Err(err) => return Err(err.into()),
        };
        let hostname = std::env::var("HOSTNAME").unwrap_or_default();

        let pair = MachinePair::resolve(&contents, &hostname)?;
        info!(
            "PROD: {:?}, DEV: {:?}, CURRENT: {:?}, OTHER: {:?}",
            pair.prod, pair.dev, pair.current, pair.other
        );
        Ok(pair)
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    const MACHINE_FILE: &str = "primary:cactus\nbackup:dogwood\n";

    #[test]
    fn test_cactus_login() {
        let pair = MachinePair::resolve(MACHINE_FILE, "clogin04").unwrap();

        assert_eq!(pair.prod.as_deref(), Some("cactus"));
        assert_eq!(pair.dev.as_deref(), Some("dogwood"));
        assert_eq!(pair.current.as_deref(), Some("cdxfer.wcoss2.ncep.noaa.gov"));
        assert_eq!(pair.other.as_deref(), Some("ddxfer.wcoss2.ncep.noaa.gov"));
    }

    #[test]
    fn test_dogwood_login() {
        let pair = MachinePair::resolve("backup:cactus\nprimary:dogwood", "dlogin09").unwrap();

        assert_eq!(pair.prod.as_deref(), Some("dogwood"));
        assert_eq!(pair.current.as_deref(), Some("ddxfer.wcoss2.ncep.noaa.gov"));
        assert_eq!(pair.other.as_deref(), Some("cdxfer.wcoss2.ncep.noaa.gov"));
    }

    #[test]
    fn test_unmatched_host() {
        for host in &["clogin4", "clogin041", "xlogin04", "dlogin0a", ""] {
            let pair = MachinePair::resolve(MACHINE_FILE, host).unwrap();
            assert!(pair.current.is_none());
            assert!(pair.other.is_none());
            assert_eq!(pair.prod.as_deref(), Some("cactus"));
        }
    }

    #[test]
    fn test_missing_machine_file() {
        let pair = MachinePair::from_system(Path::new("/no/such/prodmachinefile")).unwrap();
        assert!(pair.prod.is_none());
        assert!(pair.dev.is_none());
    }
}
