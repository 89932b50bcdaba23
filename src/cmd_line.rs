//! Command line options that are used across the archive programs.
//!
//! Every program takes `--key=value` long options only. Values are kept as text until they are
//! asked for, so the defaults that depend on `USER` or today's date are only computed when the
//! option was left off.

use std::{ffi::OsString, path::PathBuf, str::FromStr};

use chrono::{Datelike, Duration, Local, NaiveDate};
use clap::{crate_version, Arg, ArgAction, ArgMatches, Command};

use crate::{
    config::Settings,
    dates::{parse_cycle, parse_pdy, parse_year, ForecastHours, YearMonth},
    errors::ArchiveErr,
};

/// Root of the disk archives, one directory per user below it.
pub const NOSCRUB_ROOT: &str = "/lfs/h2/emc/vpppg/noscrub";
/// Root of the scratch space for run directories.
pub const STMP_ROOT: &str = "/lfs/h2/emc/stmp";
/// Root of the HPSS bundles.
pub const HPSS_ROOT: &str = "/NCEPDEV/emc-global/5year";

const DEFAULT_CYCLE: &str = "00";
const DEFAULT_FHRMIN: &str = "0";
const DEFAULT_FHRMAX: &str = "120";
const DEFAULT_FHRINC: &str = "24";
// How far back the pruner reaches when no date is given.
const DEFAULT_REMOVE_DAYS: i64 = 7;

/// Parsed arguments of one program, with defaults filled in on access.
#[derive(Clone, Debug)]
pub struct ScriptArgs<'a> {
    script: String,
    settings: &'a Settings,
    matches: ArgMatches,
}

/// A `--name=VALUE` option.
pub fn option(name: &'static str, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name(value_name)
        .num_args(1)
        .require_equals(true)
        .help(help)
}

/// `--date=PDY`
pub fn date_arg() -> Arg {
    option("date", "PDY", "Date to process, YYYYMMDD. Defaults to today.")
}

/// `--archdir=ARCHIVE_DIR`
pub fn archdir_arg() -> Arg {
    option("archdir", "ARCHIVE_DIR", "Path to the archive directory.")
}

/// `--rundir=RUN_DIR`
pub fn rundir_arg() -> Arg {
    option("rundir", "RUN_DIR", "Path to the run directory.")
}

/// `--hpssdir=HPSS_DIR`
pub fn hpssdir_arg() -> Arg {
    option("hpssdir", "HPSS_DIR", "Path to the HPSS directory.")
}

/// `--cycle=CYCLE`
pub fn cycle_arg() -> Arg {
    option("cycle", "CYCLE", "Cycle hour, e.g. 00. Defaults to 00.")
}

/// `--fhrmin=FHR_MIN`, `--fhrmax=FHR_MAX`, and `--fhrinc=FHR_INC`
pub fn fhr_args() -> [Arg; 3] {
    [
        option("fhrmin", "FHR_MIN", "First forecast hour. Defaults to 0."),
        option("fhrmax", "FHR_MAX", "Last forecast hour. Defaults to 120."),
        option("fhrinc", "FHR_INC", "Forecast hour increment. Defaults to 24."),
    ]
}

/// `--model=MODEL`
pub fn model_arg(default: &'static str) -> Arg {
    option("model", "MODEL", "").help(format!("Model name. Defaults to {}.", default))
}

/// `--obs=OBS`
pub fn obs_arg() -> Arg {
    option("obs", "OBS", "Observation source name. Defaults to prepbufr_gdas.")
}

impl<'a> ScriptArgs<'a> {
    /// Start the command for a program. The options are added by the caller.
    ///
    /// Help is an ordinary flag here: asking for it is a usage error, like any other misuse.
    pub fn new_app(script: &'static str, about: &'static str) -> Command {
        Command::new(script)
            .about(about)
            .version(crate_version!())
            .disable_help_flag(true)
            .disable_version_flag(true)
            .arg(
                Arg::new("help")
                    .short('h')
                    .long("help")
                    .action(ArgAction::SetTrue)
                    .help("Print this message and exit."),
            )
    }

    /// Parse the process arguments, allowing at most `max_args` of them.
    pub fn matches(
        app: Command,
        max_args: usize,
        settings: &'a Settings,
    ) -> Result<Self, ArchiveErr> {
        Self::matches_from(app, max_args, settings, std::env::args_os())
    }

    /// Parse `args`, the first of which is the program name.
    pub fn matches_from<I, T>(
        mut app: Command,
        max_args: usize,
        settings: &'a Settings,
        args: I,
    ) -> Result<Self, ArchiveErr>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

        if args.len().saturating_sub(1) > max_args {
            return Err(ArchiveErr::Usage(format!(
                "Too many arguments\n{}",
                app.render_usage()
            )));
        }

        let matches = app
            .try_get_matches_from_mut(args)
            .map_err(|err| ArchiveErr::Usage(err.to_string()))?;

        if matches.get_flag("help") {
            return Err(ArchiveErr::Usage(app.render_help().to_string()));
        }

        Ok(ScriptArgs {
            script: app.get_name().to_owned(),
            settings,
            matches,
        })
    }

    /// Name of the program.
    pub fn script(&self) -> &str {
        &self.script
    }

    fn value(&self, id: &str) -> Option<&str> {
        self.matches
            .try_get_one::<String>(id)
            .ok()
            .flatten()
            .map(String::as_str)
    }

    /// `--date`, an 8 digit date, defaulting to today.
    pub fn date(&self) -> Result<NaiveDate, ArchiveErr> {
        match self.value("date") {
            Some(value) => parse_pdy(value),
            None => Ok(today()),
        }
    }

    /// `--removedate`, an 8 digit date, defaulting to a week ago.
    pub fn remove_date(&self) -> Result<NaiveDate, ArchiveErr> {
        match self.value("removedate") {
            Some(value) => parse_pdy(value),
            None => Ok(today() - Duration::days(DEFAULT_REMOVE_DAYS)),
        }
    }

    /// `--yearmon`, a 6 digit month, defaulting to this month.
    pub fn year_month(&self) -> Result<YearMonth, ArchiveErr> {
        match self.value("yearmon") {
            Some(value) => YearMonth::parse(value),
            None => Ok(YearMonth::containing(today())),
        }
    }

    /// `--year`, 4 digits, defaulting to this year.
    pub fn year(&self) -> Result<i32, ArchiveErr> {
        match self.value("year") {
            Some(value) => parse_year(value),
            None => Ok(today().year()),
        }
    }

    /// `--cycle`, defaulting to 00.
    pub fn cycle(&self) -> Result<u32, ArchiveErr> {
        parse_cycle(self.value("cycle").unwrap_or(DEFAULT_CYCLE))
    }

    /// `--fhrmin`, `--fhrmax`, and `--fhrinc` together.
    pub fn forecast_hours(&self) -> Result<ForecastHours, ArchiveErr> {
        let min = self.number("fhrmin", DEFAULT_FHRMIN)?;
        let max = self.number("fhrmax", DEFAULT_FHRMAX)?;
        let inc = self.number("fhrinc", DEFAULT_FHRINC)?;

        ForecastHours::new(min, max, inc)
    }

    fn number(&self, flag: &'static str, default: &str) -> Result<u32, ArchiveErr> {
        let value = self.value(flag).unwrap_or(default);
        value.parse().map_err(|_| ArchiveErr::InvalidNumber {
            flag,
            value: value.to_owned(),
        })
    }

    /// A registry name such as `--model` or `--obs`, parsed into its enum.
    pub fn source<T: FromStr>(
        &self,
        id: &'static str,
        default: &str,
    ) -> Result<T, ArchiveErr> {
        let name = self.value(id).unwrap_or(default);
        T::from_str(name).map_err(|_| ArchiveErr::UnknownSource {
            kind: id,
            name: name.to_owned(),
        })
    }

    /// A free form name option, as given or the default.
    pub fn name<'b>(&'b self, id: &'static str, default: &'b str) -> &'b str {
        self.value(id).unwrap_or(default)
    }

    /// `--archdir`, defaulting to `archive` under the user's noscrub directory.
    pub fn archdir(&self, archive: &str) -> Result<PathBuf, ArchiveErr> {
        match self.value("archdir") {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(PathBuf::from(NOSCRUB_ROOT)
                .join(self.settings.user()?)
                .join(archive)),
        }
    }

    /// `--rundir`, defaulting to `run_<program>` under the user's scratch directory.
    pub fn rundir(&self) -> Result<PathBuf, ArchiveErr> {
        match self.value("rundir") {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(PathBuf::from(STMP_ROOT)
                .join(self.settings.user()?)
                .join(format!("run_{}", self.script))),
        }
    }

    /// `--hpssdir`, defaulting to `archive` under the user's 5 year HPSS directory.
    pub fn hpssdir(&self, archive: &str) -> Result<String, ArchiveErr> {
        match self.value("hpssdir") {
            Some(dir) => Ok(dir.to_owned()),
            None => Ok(format!(
                "{}/{}/{}",
                HPSS_ROOT,
                self.settings.user()?,
                archive
            )),
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::models::Model;

    fn settings() -> Settings {
        let mut settings = Settings::defaults("/home/ga");
        settings.user = "emc.glopara".to_owned();
        settings
    }

    fn app() -> Command {
        ScriptArgs::new_app("get_model_data", "Fetch model data.")
            .arg(date_arg())
            .arg(archdir_arg())
            .arg(rundir_arg())
            .arg(model_arg("gfs"))
            .arg(cycle_arg())
            .args(fhr_args())
    }

    fn parse<'a>(settings: &'a Settings, args: &[&str]) -> Result<ScriptArgs<'a>, ArchiveErr> {
        let argv = std::iter::once("get_model_data").chain(args.iter().copied());
        ScriptArgs::matches_from(app(), 8, settings, argv)
    }

    #[test]
    fn test_defaults() {
        let settings = settings();
        let args = parse(&settings, &[]).unwrap();

        assert_eq!(args.date().unwrap(), today());
        assert_eq!(args.cycle().unwrap(), 0);
        assert_eq!(
            args.forecast_hours().unwrap(),
            ForecastHours::new(0, 120, 24).unwrap()
        );
        assert_eq!(args.source::<Model>("model", "gfs").unwrap(), Model::Gfs);
        assert_eq!(
            args.archdir("model_archive").unwrap(),
            PathBuf::from("/lfs/h2/emc/vpppg/noscrub/emc.glopara/model_archive")
        );
        assert_eq!(
            args.rundir().unwrap(),
            PathBuf::from("/lfs/h2/emc/stmp/emc.glopara/run_get_model_data")
        );
        assert_eq!(
            args.hpssdir("model_archive").unwrap(),
            "/NCEPDEV/emc-global/5year/emc.glopara/model_archive"
        );
        assert_eq!(
            args.remove_date().unwrap(),
            today() - Duration::days(7)
        );
    }

    #[test]
    fn test_values() {
        let settings = settings();
        let args = parse(
            &settings,
            &[
                "--date=20240115",
                "--archdir=/data/archive",
                "--model=cmc",
                "--cycle=12",
                "--fhrmax=240",
            ],
        )
        .unwrap();

        assert_eq!(args.date().unwrap(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(args.archdir("model_archive").unwrap(), PathBuf::from("/data/archive"));
        assert_eq!(args.source::<Model>("model", "gfs").unwrap(), Model::Cmc);
        assert_eq!(args.cycle().unwrap(), 12);
        assert_eq!(args.forecast_hours().unwrap().max(), 240);
    }

    #[test]
    fn test_usage_errors() {
        let settings = settings();

        let too_many = [
            "--date=20240115",
            "--archdir=a",
            "--rundir=r",
            "--model=gfs",
            "--cycle=00",
            "--fhrmin=0",
            "--fhrmax=120",
            "--fhrinc=24",
            "--cycle=06",
        ];
        match parse(&settings, &too_many) {
            Err(ArchiveErr::Usage(msg)) => assert!(msg.starts_with("Too many arguments")),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }

        assert!(matches!(parse(&settings, &["-h"]), Err(ArchiveErr::Usage(_))));
        assert!(matches!(parse(&settings, &["--help"]), Err(ArchiveErr::Usage(_))));
        assert!(matches!(parse(&settings, &["--bogus=1"]), Err(ArchiveErr::Usage(_))));
    }

    #[test]
    fn test_bad_values() {
        let settings = settings();

        let args = parse(&settings, &["--date=2024011"]).unwrap();
        assert!(matches!(args.date(), Err(ArchiveErr::InvalidDate { .. })));

        let args = parse(&settings, &["--date=20240230"]).unwrap();
        assert!(matches!(args.date(), Err(ArchiveErr::InvalidDate { .. })));

        let args = parse(&settings, &["--model=gfs2"]).unwrap();
        assert!(matches!(
            args.source::<Model>("model", "gfs"),
            Err(ArchiveErr::UnknownSource { kind: "model", .. })
        ));

        let args = parse(&settings, &["--fhrinc=six"]).unwrap();
        assert!(matches!(
            args.forecast_hours(),
            Err(ArchiveErr::InvalidNumber { flag: "fhrinc", .. })
        ));
    }

    #[test]
    fn test_missing_user() {
        let settings = Settings::defaults("/home/ga");
        let args = parse(&settings, &[]).unwrap();

        assert!(matches!(args.rundir(), Err(ArchiveErr::MissingSetting("USER"))));
        // Explicit directories do not need it.
        let args = parse(&settings, &["--rundir=/tmp/run"]).unwrap();
        assert_eq!(args.rundir().unwrap(), PathBuf::from("/tmp/run"));
    }
}
