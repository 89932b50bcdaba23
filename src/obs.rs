//! Observation sources archived alongside the models.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveTime};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
    config::Settings,
    dates::{julian, pdy, YearMonth},
    errors::ArchiveErr,
    task::{FetchTask, Source, Step},
    tools,
};

/// Observation data sets in the archive.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString, AsRefStr, Display, EnumIter, Hash)]
pub enum Obs {
    /// GDAS prepbufr, restricted
    #[strum(serialize = "prepbufr_gdas")]
    PrepbufrGdas,
    /// NAM prepbufr, restricted
    #[strum(serialize = "prepbufr_nam")]
    PrepbufrNam,
    /// RAP prepbufr, restricted
    #[strum(serialize = "prepbufr_rap")]
    PrepbufrRap,
    /// CCPA 24 hour precipitation
    #[strum(serialize = "ccpa_accum24hr")]
    CcpaAccum24hr,
    /// CCPA 6 hour precipitation
    #[strum(serialize = "ccpa_accum6hr")]
    CcpaAccum6hr,
    /// NOHRSC 24 hour snowfall
    #[strum(serialize = "nohrsc_accum24hr")]
    NohrscAccum24hr,
    /// OSI SAF sea ice concentration
    #[strum(serialize = "osi_saf")]
    OsiSaf,
    /// NESDIS GET-D evapotranspiration
    #[strum(serialize = "get_d")]
    GetD,
    /// GHRSST multi product ensemble median SST
    #[strum(serialize = "ghrsst_median")]
    GhrsstMedian,
    /// CPC rain gauge reports
    #[strum(serialize = "OBSPRCP")]
    Obsprcp,
    /// OSPO GHRSST analyses, archived by other means
    #[strum(serialize = "ghrsst_ospo")]
    GhrsstOspo,
    /// NDBC buoy reports, archived by other means
    #[strum(serialize = "ndbc_buoy")]
    NdbcBuoy,
}

/// Everything an observation source needs to plan the fetches for one day.
#[derive(Clone, Debug)]
pub struct ObsRun<'a> {
    /// Run settings.
    pub settings: &'a Settings,
    /// The source's own archive directory.
    pub archive_dir: PathBuf,
    /// Scratch directory for this day.
    pub run_dir: PathBuf,
    /// The day being fetched.
    pub date: NaiveDate,
}

const PREPBUFR_CYCLES: &[&str] = &["00", "06", "12", "18"];
const PREPBUFR_NAM_SUFFIXES: &[&str] = &["tm00", "tm03"];
const PREPBUFR_RAP_CYCLES: &[&str] = &["00", "03", "06", "09", "12", "15", "18", "21"];
const CCPA_VALID_HOURS: &[&str] = &["00", "06", "12", "18"];

const GET_D_FTP: &str = "ftp://ftp.star.nesdis.noaa.gov";
const GET_D_FTP_DIR: &str = "pub/smcd/emb/lfang/GET-D_ET_H_updated";
const CPC_RAIN_GAUGE_URL: &str = "https://ftp.cpc.ncep.noaa.gov/GIS/JAWF/Precip";

const OSI_SAF_HEMISPHERES: &[&str] = &["nh", "sh"];
// Weekly means need at least this many of the seven daily files.
const OSI_SAF_WEEKLY_MIN: usize = 4;
const OSI_SAF_EPOCH: (i32, u32, u32) = (1978, 1, 1);
const GHRSST_MEDIAN_PRODUCT: &str = "UKMO-L4_GHRSST-SSTfnd-GMPE-GLOB";

impl Obs {
    /// Whether this source is restricted to the rstprod group.
    pub fn is_restricted(self) -> bool {
        matches!(self, Obs::PrepbufrGdas | Obs::PrepbufrNam | Obs::PrepbufrRap)
    }

    /// The source's directory under the archive root. Prepbufr sources nest, `prepbufr/gdas`.
    pub fn archive_dir(self, archive_root: &Path) -> PathBuf {
        let name = self.as_ref();
        match name.split_once('_') {
            Some((kind, run)) if self.is_restricted() => archive_root.join(kind).join(run),
            _ => archive_root.join(name),
        }
    }

    /// Shell style pattern selecting one month from the source's archive directory.
    pub fn bundle_pattern(self, month: YearMonth) -> String {
        match self {
            Obs::Obsprcp => format!("*-{}*", month),
            Obs::OsiSaf => format!("ice_conc_*_polstere-100_multi_{}*", month),
            Obs::GhrsstOspo => format!("{}*", month),
            Obs::NdbcBuoy => format!("buoy_{}*", month),
            _ => format!("*.{}*", month),
        }
    }

    /// Name of the monthly HPSS bundle.
    pub fn bundle_name(self, month: YearMonth) -> String {
        format!("{}_{}.tar", self, month)
    }

    /// Files the archive should hold for one day, relative to the source's archive directory.
    pub fn expected_files(self, date: NaiveDate) -> Vec<PathBuf> {
        let today = pdy(date);
        let day_before = pdy(date - Duration::days(1));
        let week_before = pdy(date - Duration::days(7));

        let names: Vec<String> = match self {
            Obs::PrepbufrGdas => PREPBUFR_CYCLES
                .iter()
                .map(|cyc| format!("prepbufr.gdas.{}{}", today, cyc))
                .collect(),
            Obs::PrepbufrNam => PREPBUFR_CYCLES
                .iter()
                .flat_map(|cyc| {
                    let today = &today;
                    PREPBUFR_NAM_SUFFIXES.iter().map(move |suffix| {
                        format!("nam.{}/nam.t{}z.prepbufr.{}", today, cyc, suffix)
                    })
                })
                .collect(),
            Obs::PrepbufrRap => PREPBUFR_RAP_CYCLES
                .iter()
                .map(|cyc| format!("rap.{}/rap.t{}z.prepbufr.tm00", today, cyc))
                .collect(),
            Obs::CcpaAccum24hr => vec![format!("ccpa.{}12.24h", today)],
            Obs::CcpaAccum6hr => CCPA_VALID_HOURS
                .iter()
                .map(|hh| format!("ccpa.hrap.{}{}.6h", today, hh))
                .collect(),
            Obs::NohrscAccum24hr => vec![format!("nohrsc.{}12.24h", today)],
            Obs::GetD => vec![get_d_name(date)],
            Obs::OsiSaf => vec![
                osi_saf_name(&day_before, &today),
                osi_saf_name(&week_before, &today),
            ],
            Obs::GhrsstMedian => vec![ghrsst_median_name(&day_before, &today)],
            Obs::Obsprcp => vec![format!("usa-dlyprcp-{}", today)],
            Obs::GhrsstOspo | Obs::NdbcBuoy => vec![],
        };

        names.into_iter().map(PathBuf::from).collect()
    }

    /// Fetch tasks for one day. Sources that are only bundled and pruned here have none.
    pub fn fetch_tasks(self, run: &ObsRun) -> Result<Vec<FetchTask>, ArchiveErr> {
        let tasks = match self {
            Obs::PrepbufrGdas => prepbufr_gdas(run),
            Obs::PrepbufrNam => prepbufr_nam(run),
            Obs::PrepbufrRap => prepbufr_rap(run),
            Obs::CcpaAccum24hr => {
                let s = run.settings;
                let name = format!("ccpa.{}12.24h", pdy(run.date));
                vec![copy_into(
                    run,
                    s.comroot
                        .join("verf_precip")
                        .join(&s.verf_precip_ver)
                        .join(format!("precip.{}", pdy(run.date)))
                        .join(&name),
                    &name,
                )]
            }
            Obs::CcpaAccum6hr => ccpa_accum6hr(run),
            Obs::NohrscAccum24hr => {
                let today = pdy(run.date);
                vec![copy_into(
                    run,
                    run.settings
                        .dcomroot
                        .join(&today)
                        .join("wgrbbul")
                        .join("nohrsc_snowfall")
                        .join(format!("sfav2_CONUS_24h_{}12_grid184.grb2", today)),
                    &format!("nohrsc.{}12.24h", today),
                )]
            }
            Obs::OsiSaf => osi_saf(run),
            Obs::GetD => {
                let name = get_d_name(run.date);
                let source = Source::Ftp {
                    host: GET_D_FTP.to_owned(),
                    dir: GET_D_FTP_DIR.to_owned(),
                    remote: format!("{}/{}", run.date.format("%Y"), name),
                };
                vec![FetchTask::new(run.archive_dir.join(&name), &run.run_dir)
                    .stage(source, run.run_dir.join(&name))]
            }
            Obs::GhrsstMedian => vec![ghrsst_median(run)],
            Obs::Obsprcp => {
                let today = pdy(run.date);
                let url = format!("{}/prcp-obs-{}.txt", CPC_RAIN_GAUGE_URL, today);
                let name = format!("usa-dlyprcp-{}", today);
                vec![FetchTask::new(run.archive_dir.join(&name), &run.run_dir)
                    .stage(Source::Url(url), run.run_dir.join(&name))]
            }
            Obs::GhrsstOspo | Obs::NdbcBuoy => {
                return Err(ArchiveErr::Unsupported {
                    operation: "fetch",
                    name: self.to_string(),
                })
            }
        };

        Ok(tasks
            .into_iter()
            .map(|task| task.restricted(self.is_restricted()))
            .collect())
    }

    /// Tasks built from what [`Obs::fetch_tasks`] archived for the same day. Plan these only
    /// after those have run.
    pub fn follow_up_tasks(self, run: &ObsRun) -> Vec<FetchTask> {
        match self {
            Obs::OsiSaf => vec![osi_saf_weekly(run).restricted(self.is_restricted())],
            _ => vec![],
        }
    }
}

/// Name of the GET-D file for a day, keyed by julian date.
pub fn get_d_name(date: NaiveDate) -> String {
    format!("GETDL3_DAL_CONUS_{}_1.0.nc", julian(date))
}

/// The day a GET-D file holds, if the name is one.
pub fn get_d_date(name: &str) -> Option<NaiveDate> {
    let julian = name
        .strip_prefix("GETDL3_DAL_CONUS_")?
        .strip_suffix("_1.0.nc")?;
    NaiveDate::parse_from_str(julian, "%Y%j").ok()
}

fn osi_saf_name(start: &str, end: &str) -> String {
    format!("osi_saf.multi.{}00to{}00_G004.nc", start, end)
}

fn ghrsst_median_name(start: &str, end: &str) -> String {
    format!("{}_valid{}00to{}00.nc", GHRSST_MEDIAN_PRODUCT, start, end)
}

// Same name in the run and archive directories.
fn copy_into(run: &ObsRun, source: PathBuf, name: &str) -> FetchTask {
    FetchTask::copy(source, run.run_dir.join(name), run.archive_dir.join(name))
}

fn obsproc_dir(settings: &Settings) -> PathBuf {
    settings.comroot.join("obsproc").join(&settings.obsproc_ver)
}

fn prepbufr_gdas(run: &ObsRun) -> Vec<FetchTask> {
    let today = pdy(run.date);
    let prod = obsproc_dir(run.settings).join(format!("gdas.{}", today));

    PREPBUFR_CYCLES
        .iter()
        .map(|cyc| {
            copy_into(
                run,
                prod.join(cyc)
                    .join("atmos")
                    .join(format!("gdas.t{}z.prepbufr", cyc)),
                &format!("prepbufr.gdas.{}{}", today, cyc),
            )
        })
        .collect()
}

fn prepbufr_nam(run: &ObsRun) -> Vec<FetchTask> {
    let today = pdy(run.date);
    let prod = obsproc_dir(run.settings).join(format!("nam.{}", today));
    let archive_dir = run.archive_dir.join(format!("nam.{}", today));

    PREPBUFR_CYCLES
        .iter()
        .flat_map(|cyc| PREPBUFR_NAM_SUFFIXES.iter().map(move |suffix| (cyc, suffix)))
        .map(|(cyc, suffix)| {
            let name = format!("nam.t{}z.prepbufr.{}", cyc, suffix);
            FetchTask::copy(prod.join(&name), run.run_dir.join(&name), archive_dir.join(&name))
        })
        .collect()
}

fn prepbufr_rap(run: &ObsRun) -> Vec<FetchTask> {
    let today = pdy(run.date);
    let prod = obsproc_dir(run.settings).join(format!("rap.{}", today));
    let archive_dir = run.archive_dir.join(format!("rap.{}", today));

    PREPBUFR_RAP_CYCLES
        .iter()
        .map(|cyc| {
            let name = format!("rap.t{}z.prepbufr.tm00", cyc);
            FetchTask::copy(prod.join(&name), run.run_dir.join(&name), archive_dir.join(&name))
        })
        .collect()
}

fn ccpa_accum6hr(run: &ObsRun) -> Vec<FetchTask> {
    let s = run.settings;
    let today = pdy(run.date);
    let prod = s
        .comroot
        .join("ccpa")
        .join(&s.ccpa_ver)
        .join(format!("ccpa.{}", today));

    CCPA_VALID_HOURS
        .iter()
        .map(|hh| {
            copy_into(
                run,
                prod.join(hh).join(format!("ccpa.t{}z.06h.hrap.conus.gb2", hh)),
                &format!("ccpa.hrap.{}{}.6h", today, hh),
            )
        })
        .collect()
}

fn osi_saf(run: &ObsRun) -> Vec<FetchTask> {
    let s = run.settings;
    let today = pdy(run.date);
    let day_before = run.date - Duration::days(1);
    let m1 = pdy(day_before);
    let grid = s.fix("cdo_grids").join("G004.grid");
    let prod = s.devdcomroot.join(&m1).join("seaice").join("osisaf");

    // Daily: regrid each hemisphere, then stitch them together.
    let daily_name = osi_saf_name(&m1, &today);
    let daily_run = run.run_dir.join(&daily_name);
    let mut daily = FetchTask::new(run.archive_dir.join(&daily_name), &run.run_dir);
    let mut regridded = vec![];
    for hem in OSI_SAF_HEMISPHERES {
        let staged = run
            .run_dir
            .join(format!("osi_saf.multi.{}.{}00to{}00.nc", hem, m1, today));
        let on_grid = run
            .run_dir
            .join(format!("osi_saf.multi.{}.{}00to{}00_G004.nc", hem, m1, today));
        let source = prod.join(format!("ice_conc_{}_polstere-100_multi_{}1200.nc", hem, m1));

        daily = daily.stage(Source::File(source), &staged).step(
            Step::new(&on_grid)
                .input(&staged)
                .command(tools::cdo_remapbil(&grid, &staged, &on_grid)),
        );
        regridded.push(on_grid);
    }
    let daily = daily.step(
        Step::new(&daily_run)
            .input(&regridded[0])
            .input(&regridded[1])
            .command(tools::cdo_mergegrid(&regridded[0], &regridded[1], &daily_run))
            .command(tools::ncatted_global(
                &daily_run,
                &[("southernmost_latitude", "-90"), ("area", "Global")],
            ))
            .command(tools::ncap2_in_place("time=time+43200", &daily_run)),
    );

    vec![daily]
}

// Weekly mean of whichever daily files from the past week are archived, today's included.
fn osi_saf_weekly(run: &ObsRun) -> FetchTask {
    let today = pdy(run.date);
    let week_before = run.date - Duration::days(7);
    let name = osi_saf_name(&pdy(week_before), &today);
    let run_file = run.run_dir.join(&name);
    let task = FetchTask::new(run.archive_dir.join(&name), &run.run_dir);

    let mut dailies: Vec<PathBuf> = (1..=7)
        .map(|back| {
            let start = run.date - Duration::days(back);
            let end = start + Duration::days(1);
            run.archive_dir.join(osi_saf_name(&pdy(start), &pdy(end)))
        })
        .filter(|path| path.exists())
        .collect();
    dailies.reverse();

    if dailies.len() < OSI_SAF_WEEKLY_MIN {
        let found: Vec<String> = dailies.iter().map(|p| p.display().to_string()).collect();
        return task.blocked(format!(
            "Not enough files to make {}: {}",
            run.archive_dir.join(&name).display(),
            found.join(" ")
        ));
    }

    let start = week_before.and_time(NaiveTime::MIN);
    let epoch = NaiveDate::from_ymd_opt(OSI_SAF_EPOCH.0, OSI_SAF_EPOCH.1, OSI_SAF_EPOCH.2)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN);
    let start_date = start.format("%Y-%m-%d %H:%M:%S").to_string();
    let time_bnds = format!("time_bnds(0,0)={}", (start - epoch).num_seconds());

    let step = dailies
        .iter()
        .fold(Step::new(&run_file), |step, daily| step.input(daily))
        .command(tools::ncea(&dailies, &run_file))
        .command(tools::ncatted_global(&run_file, &[("start_date", start_date.as_str())]))
        .command(tools::ncap2_in_place(&time_bnds, &run_file));

    task.step(step)
}

fn ghrsst_median(run: &ObsRun) -> FetchTask {
    let today = pdy(run.date);
    let m1 = pdy(run.date - Duration::days(1));
    let product = format!("{}120000-{}-v03.0-fv03.0.nc", m1, GHRSST_MEDIAN_PRODUCT);
    let source = run
        .settings
        .devdcomroot
        .join(&m1)
        .join("validation_data")
        .join("marine")
        .join("ghrsst")
        .join(&product);
    let tmp = run.run_dir.join(&product);
    let name = ghrsst_median_name(&m1, &today);
    let run_file = run.run_dir.join(&name);

    // Shift the time stamp to the middle of the day before archiving.
    FetchTask::new(run.archive_dir.join(&name), &run.run_dir)
        .stage(Source::File(source), &tmp)
        .step(
            Step::new(&run_file)
                .input(&tmp)
                .command(tools::ncap2("time=time+43200", &tmp, &run_file)),
        )
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
