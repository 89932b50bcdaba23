//! Run settings, built once at startup from defaults and the environment.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{errors::ArchiveErr, shell::CommandRunner};

const GRIB_UTIL_BIN: &str = "/apps/ops/prod/libs/intel/19.1.3.304/grib_util/1.2.3/bin";
const WGRIB2_BIN: &str = "/apps/ops/prod/libs/intel/19.1.3.304/wgrib2/2.0.8/bin";

// Environment variables that may override a default. Matching is case insensitive.
const ENV_KEYS: &[&str] = &[
    "COMROOT",
    "DCOMROOT",
    "DEVDCOMROOT",
    "PARACOMROOT",
    "PRODMACHINEFILE",
    "HPSS_PROD_DIR",
    "HOMEemc_global_archive",
    "SENDARCH",
    "USER",
    "CNVGRIB",
    "COPYGB",
    "WGRIB",
    "WGRIB2",
    "cdas_ver",
    "cmc_ver",
    "cfs_ver",
    "ens_tracker_ver",
    "gefs_ver",
    "gfs_ver",
    "naefs_ver",
    "ccpa_ver",
    "nam_ver",
    "obsproc_ver",
    "verf_precip_ver",
    "evs_ver",
];

/// Everything a driver needs to know about the machine it runs on.
///
/// Immutable after [`Settings::load`]; drivers take it by reference.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    // Data roots
    pub comroot: PathBuf,
    pub dcomroot: PathBuf,
    pub devdcomroot: PathBuf,
    pub paracomroot: PathBuf,
    pub prodmachinefile: PathBuf,
    pub hpss_prod_dir: String,
    #[serde(rename = "homeemc_global_archive")]
    pub home: PathBuf,
    pub sendarch: String,
    pub user: String,

    // Tools
    pub cnvgrib: PathBuf,
    pub copygb: PathBuf,
    pub wgrib: PathBuf,
    pub wgrib2: PathBuf,

    // Production package versions
    pub cdas_ver: String,
    pub cmc_ver: String,
    pub cfs_ver: String,
    pub ens_tracker_ver: String,
    pub gefs_ver: String,
    pub gfs_ver: String,
    pub naefs_ver: String,
    pub ccpa_ver: String,
    pub nam_ver: String,
    pub obsproc_ver: String,
    pub verf_precip_ver: String,
    pub evs_ver: String,
}

impl Settings {
    /// Built in defaults, with `home` as the package directory.
    pub fn defaults(home: impl Into<PathBuf>) -> Self {
        let grib_util = Path::new(GRIB_UTIL_BIN);

        Settings {
            comroot: PathBuf::from("/lfs/h1/ops/prod/com"),
            dcomroot: PathBuf::from("/lfs/h1/ops/prod/dcom"),
            devdcomroot: PathBuf::from("/lfs/h1/ops/dev/dcom"),
            paracomroot: PathBuf::from("/lfs/h1/ops/para/com"),
            prodmachinefile: PathBuf::from("/lfs/h1/ops/prod/config/prodmachinefile"),
            hpss_prod_dir: "/NCEPPROD/hpssprod/runhistory".to_owned(),
            home: home.into(),
            sendarch: "YES".to_owned(),
            user: String::new(),

            cnvgrib: grib_util.join("cnvgrib"),
            copygb: grib_util.join("copygb"),
            wgrib: grib_util.join("wgrib"),
            wgrib2: Path::new(WGRIB2_BIN).join("wgrib2"),

            cdas_ver: "v1.2".to_owned(),
            cmc_ver: "v1.2".to_owned(),
            cfs_ver: "v2.3".to_owned(),
            ens_tracker_ver: "v1.3".to_owned(),
            gefs_ver: "v12.3".to_owned(),
            gfs_ver: "v16.3".to_owned(),
            naefs_ver: "v6.1".to_owned(),
            ccpa_ver: "v4.2".to_owned(),
            nam_ver: "v4.2".to_owned(),
            obsproc_ver: "v1.1".to_owned(),
            verf_precip_ver: "v4.5".to_owned(),
            evs_ver: "v1.0".to_owned(),
        }
    }

    /// Load the settings for this process: defaults, then environment overrides.
    ///
    /// The package home defaults to the parent of the current working directory.
    pub fn load() -> Result<Self, ArchiveErr> {
        let home = std::env::current_dir()?.join("..");
        Self::figment(home).extract().map_err(ArchiveErr::from)
    }

    /// The layered configuration before extraction.
    pub fn figment(home: impl Into<PathBuf>) -> Figment {
        Figment::from(Serialized::defaults(Settings::defaults(home)))
            .merge(Env::raw().only(ENV_KEYS))
    }

    /// Whether finished files should be copied into the archive.
    pub fn send_to_archive(&self) -> bool {
        self.sendarch.trim().eq_ignore_ascii_case("YES")
    }

    /// The login name used for default paths and remote commands.
    pub fn user(&self) -> Result<&str, ArchiveErr> {
        if self.user.is_empty() {
            Err(ArchiveErr::MissingSetting("USER"))
        } else {
            Ok(&self.user)
        }
    }

    /// Location of a helper executable shipped with this package.
    pub fn exec(&self, name: &str) -> PathBuf {
        self.home.join("exec").join(name)
    }

    /// Location of a fixed data file shipped with this package.
    pub fn fix(&self, name: &str) -> PathBuf {
        self.home.join("fix").join(name)
    }
}

/// The settings plus the runner that executes external tools, handed to every driver.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    /// Run settings.
    pub settings: &'a Settings,
    /// Executes external tools.
    pub runner: &'a dyn CommandRunner,
}

impl<'a> Session<'a> {
    /// Bundle settings and a runner.
    pub fn new(settings: &'a Settings, runner: &'a dyn CommandRunner) -> Self {
        Session { settings, runner }
    }
}
