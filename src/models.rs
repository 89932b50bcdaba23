//! Models archived from the production disks.
//!
//! Each [`Model`] knows where its files come from, how they are converted, what the archive
//! should hold for one cycle, and which archive files belong in a monthly bundle. The fetch,
//! audit, and bundle drivers all work from these tables.

use std::path::{Path, PathBuf};

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
    config::Settings,
    dates::{fhr2, fhr3, CycleDate, ForecastHours, YearMonth},
    shell::Cmd,
    task::{FetchTask, Source, Step},
    tools,
};

/// Models potentially stored in the archive.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString, AsRefStr, Display, EnumIter, Hash)]
pub enum Model {
    /// NCEP/NCAR reanalysis GFS
    #[strum(serialize = "cdas")]
    Cdas,
    /// Climate Forecast System reanalysis
    #[strum(serialize = "cfsr")]
    Cfsr,
    /// Canadian Meteorological Centre global model
    #[strum(serialize = "cmc")]
    Cmc,
    /// ECMWF high resolution, restricted
    #[strum(serialize = "ecm")]
    Ecm,
    /// ECMWF surface fields, restricted
    #[strum(serialize = "ecmg4")]
    Ecmg4,
    /// Navy NAVGEM
    #[strum(serialize = "fno")]
    Fno,
    /// GEFS control member
    #[strum(serialize = "gefsc")]
    Gefsc,
    /// GEFS ensemble mean
    #[strum(serialize = "gefsm")]
    Gefsm,
    /// The U.S. Global Forecast System
    #[strum(serialize = "gfs")]
    Gfs,
    /// GFS from the parallel production suite
    #[strum(serialize = "gfs_wcoss2_para")]
    GfsWcoss2Para,
    /// Japan Meteorological Agency global model
    #[strum(serialize = "jma")]
    Jma,
    /// NCMRWF (India) GDAS
    #[strum(serialize = "ncmrwf")]
    Ncmrwf,
    /// UK Met Office high resolution
    #[strum(serialize = "ukm")]
    Ukm,
    /// GraphCast driven by GFS initial conditions
    #[strum(serialize = "graphcastgfs")]
    Graphcastgfs,
}

/// Everything a model needs to plan the fetches for one cycle.
#[derive(Clone, Debug)]
pub struct ModelRun<'a> {
    /// Run settings.
    pub settings: &'a Settings,
    /// Directory holding one subdirectory per model.
    pub archive_root: PathBuf,
    /// Scratch directory for this cycle.
    pub run_dir: PathBuf,
    /// The cycle being fetched.
    pub cycle: CycleDate,
    /// Forecast hours requested.
    pub fhrs: ForecastHours,
}

impl<'a> ModelRun<'a> {
    fn run_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.run_dir.join(name)
    }
}

// GFS flux records kept for verification.
const GFS_FLUX_MATCH: &str = "(:PRATE:surface:)|(:TMP:2 m above ground:)";

// GFS flux files stop at this forecast hour, and forecast output goes to 12 hourly after it.
const GFS_LONG_RANGE: u32 = 240;

// UKM files are named by a lead time code instead of the hour.
const UKM_LEAD_IDS: &[(u32, &str)] = &[
    (0, "AAT"),
    (6, "BBT"),
    (12, "CCT"),
    (18, "DDT"),
    (24, "EET"),
    (30, "FFT"),
    (36, "GGT"),
    (42, "HHT"),
    (48, "IIT"),
    (54, "JJT"),
    (60, "JJT"),
    (66, "KKT"),
    (72, "KKT"),
    (78, "QQT"),
    (84, "LLT"),
    (90, "TTT"),
    (96, "MMT"),
    (102, "UUT"),
    (108, "NNT"),
    (114, "VVT"),
    (120, "OOT"),
    (126, "11T"),
    (132, "PPA"),
    (138, "22T"),
    (144, "PPA"),
];

// copygb namelist for pulling surface fields out of the ECMWF files.
const ECMG4_NAMELIST: &str = " &NLCOPYGB IDS(49)=2, IDS(165)=2, IDS(166)=2, IDS(168)=2, \
    IDS(167)=2, IDS(159)=2, IDS(59)=2, IDS(31)=2, IDS(156)=2, IDS(151)=2, IDS(3)=2, \
    IDS(157)=2, IDS(134)=2, IDS(130)=2, IDS(131)=2, IDS(132)=2, IDS(138)=7, IDS(121)=2, \
    IDS(122)=2, IDS(143)=4, IDS(142)=4, IDS(141)=4, IDS(144)=4, IDS(164)=4, IDS(136)=4, \
    IDS(228)=4, IDS(135)=4, /";

// KPDS selections for the ecmg4 surface fields: winds, temperature, dew point, pressure,
// snow depth, cloud cover, column water, precipitation.
const ECMG4_KPDS: &[&str] = &[
    "4*-1,165,1,0",
    "4*-1,166,1,0",
    "4*-1,167,1,0",
    "4*-1,168,1,0",
    "4*-1,151,1,0",
    "4*-1,141,1,0",
    "4*-1,164,1,0",
    "4*-1,136,1,0",
    "4*-1,228,1,0",
];

/// Archive name of a model file, `{kind}.{model}.{CDATE}`.
pub fn archive_name(kind: &str, model: &str, cycle: &CycleDate) -> String {
    format!("{}.{}.{}", kind, model, cycle.cdate())
}

impl Model {
    /// Whether this model's data is restricted to the rstprod group.
    pub fn is_restricted(self) -> bool {
        matches!(self, Model::Ecm | Model::Ecmg4)
    }

    /// The model's directory under the archive root.
    pub fn archive_dir(self, archive_root: &Path) -> PathBuf {
        archive_root.join(self.as_ref())
    }

    /// Directories a fetch publishes into. Usually just [`Model::archive_dir`].
    pub fn archive_dirs(self, archive_root: &Path) -> Vec<PathBuf> {
        match self {
            Model::Graphcastgfs => GRAPHCAST_LEVELS
                .iter()
                .map(|levels| graphcast_dir(archive_root, levels))
                .collect(),
            _ => vec![self.archive_dir(archive_root)],
        }
    }

    /// Forecast hours fetched and expected for this model.
    pub fn forecast_hours(self, fhrs: ForecastHours) -> Vec<u32> {
        match self {
            Model::Gfs | Model::GfsWcoss2Para => fhrs
                .iter_with(|fhr| if fhr >= GFS_LONG_RANGE { 12 } else { fhrs.inc() })
                .collect(),
            _ => fhrs.iter().collect(),
        }
    }

    /// Shell style pattern selecting one month of one cycle from the model's archive directory.
    pub fn bundle_pattern(self, month: YearMonth, cycle: u32) -> String {
        format!("*.{}*{:02}", month, cycle)
    }

    /// Name of the monthly HPSS bundle.
    pub fn bundle_name(self, month: YearMonth, cycle: u32) -> String {
        format!("{}{:02}_{}.tar", self, cycle, month)
    }

    /// Files the archive should hold for one cycle, relative to the model's archive directory.
    pub fn expected_files(self, cycle: &CycleDate, fhrs: ForecastHours) -> Vec<PathBuf> {
        let name = self.as_ref();
        let mut expected = vec![];

        if self != Model::Ecmg4 {
            expected.push(archive_name("pgbanl", name, cycle));
        }

        // Only the analysis time is kept off the main ECMWF cycles.
        let fhrs = if self == Model::Ecm && (cycle.cycle() == 6 || cycle.cycle() == 18) {
            fhrs.with_max(0)
        } else {
            fhrs
        };

        for fhr in self.forecast_hours(fhrs) {
            if self == Model::Ecmg4 {
                expected.push(archive_name(&format!("flxf{}", fhr2(fhr)), "ecm", cycle));
            } else {
                expected.push(archive_name(&format!("pgbf{}", fhr2(fhr)), name, cycle));
            }
            if self == Model::Gfs && fhr <= GFS_LONG_RANGE {
                expected.push(archive_name(&format!("flxf{}", fhr2(fhr)), name, cycle));
            }
        }

        if self == Model::Gfs {
            for kind in &["pgbanl", "pgbf00", "pgbf06"] {
                expected.push(archive_name(kind, "gdas", cycle));
            }
            expected.push(archive_name("atcfunix", "gfs", cycle));
        }

        expected.into_iter().map(PathBuf::from).collect()
    }

    /// Fetch tasks for one cycle.
    pub fn fetch_tasks(self, run: &ModelRun) -> Vec<FetchTask> {
        let tasks = match self {
            Model::Cdas => cdas(run),
            Model::Cfsr => cfsr(run),
            Model::Cmc => cmc(run),
            Model::Ecm => ecm(run),
            Model::Ecmg4 => ecmg4(run),
            Model::Fno => fno(run),
            Model::Gefsc => gefs(run, self, "gec00"),
            Model::Gefsm => gefs(run, self, "geavg"),
            Model::Gfs => gfs(run, self, &run.settings.comroot, true),
            Model::GfsWcoss2Para => gfs(run, self, &run.settings.paracomroot, false),
            Model::Jma => jma(run),
            Model::Ncmrwf => ncmrwf(run),
            Model::Ukm => ukm(run),
            Model::Graphcastgfs => graphcast(run),
        };

        tasks
            .into_iter()
            .map(|task| task.restricted(self.is_restricted()))
            .collect()
    }
}

//
// Per model fetch plans
//

// Analysis entry linked to the model's own f00 file.
fn analysis_link(run: &ModelRun, model: Model) -> FetchTask {
    let dir = model.archive_dir(&run.archive_root);
    let name = model.as_ref();
    FetchTask::link(
        dir.join(archive_name("pgbf00", name, &run.cycle)),
        dir.join(archive_name("pgbanl", name, &run.cycle)),
    )
}

fn cdas(run: &ModelRun) -> Vec<FetchTask> {
    let s = run.settings;
    let dir = Model::Cdas.archive_dir(&run.archive_root);
    let month = YearMonth::containing(run.cycle.date());
    let prod = s
        .comroot
        .join("cdas")
        .join(&s.cdas_ver)
        .join(format!("cdas.{}", month));

    let mut tasks: Vec<FetchTask> = Model::Cdas
        .forecast_hours(run.fhrs)
        .into_iter()
        .map(|fhr| {
            let name = archive_name(&format!("pgbf{}", fhr2(fhr)), "cdas", &run.cycle);
            FetchTask::copy(
                prod.join(format!("pgb.f{}{}", fhr2(fhr), run.cycle.cdate())),
                run.run_file(&name),
                dir.join(&name),
            )
        })
        .collect();
    tasks.push(analysis_link(run, Model::Cdas));
    tasks
}

fn cfsr(run: &ModelRun) -> Vec<FetchTask> {
    let s = run.settings;
    let dir = Model::Cfsr.archive_dir(&run.archive_root);
    let cfs = s.comroot.join("cfs").join(&s.cfs_ver);
    let cdate = run.cycle.cdate();
    let prod = cfs
        .join(format!("cfs.{}", run.cycle.pdy()))
        .join(run.cycle.cyc())
        .join("6hrly_grib_01");

    let mut tasks: Vec<FetchTask> = Model::Cfsr
        .forecast_hours(run.fhrs)
        .into_iter()
        .map(|fhr| {
            let name = archive_name(&format!("pgbf{}", fhr2(fhr)), "cfsr", &run.cycle);
            FetchTask::copy(
                prod.join(format!("pgbf{}.01.{}.grb2", run.cycle.valid_cdate(fhr), cdate)),
                run.run_file(&name),
                dir.join(&name),
            )
        })
        .collect();

    let name = archive_name("pgbanl", "cfsr", &run.cycle);
    tasks.push(FetchTask::copy(
        cfs.join(format!("cdas.{}", run.cycle.pdy()))
            .join(format!("cdas1.t{}z.pgrblanl", run.cycle.cyc())),
        run.run_file(&name),
        dir.join(&name),
    ));
    tasks
}

fn cmc(run: &ModelRun) -> Vec<FetchTask> {
    let s = run.settings;
    let dir = Model::Cmc.archive_dir(&run.archive_root);
    let prod = s
        .comroot
        .join("cmc")
        .join(&s.cmc_ver)
        .join(format!("cmc.{}", run.cycle.pdy()));

    let mut tasks: Vec<FetchTask> = Model::Cmc
        .forecast_hours(run.fhrs)
        .into_iter()
        .map(|fhr| {
            let name = archive_name(&format!("pgbf{}", fhr2(fhr)), "cmc", &run.cycle);
            FetchTask::copy(
                prod.join(format!("cmc_{}f{}", run.cycle.cdate(), fhr3(fhr))),
                run.run_file(&name),
                dir.join(&name),
            )
        })
        .collect();
    tasks.push(analysis_link(run, Model::Cmc));
    tasks
}

// One ECMWF file converted to look like a GFS file.
fn ecm_convert(run: &ModelRun, cycle: &CycleDate, fhr: u32) -> FetchTask {
    let s = run.settings;
    let dir = Model::Ecm.archive_dir(&run.archive_root);
    let source = s
        .dcomroot
        .join(run.cycle.pdy())
        .join("wgrbbul")
        .join("ecmwf")
        .join(format!(
            "DCD{}00{}001",
            cycle.init_time().format("%m%d%H"),
            cycle.valid_time(fhr).format("%m%d%H")
        ));
    let tmp = run.run_file(format!("tmp.f{}.{}", fhr3(fhr), cycle.cdate()));
    let name = archive_name(&format!("pgbf{}", fhr2(fhr)), "ecm", cycle);
    let run_file = run.run_file(&name);

    FetchTask::new(dir.join(&name), &run.run_dir)
        .stage(Source::File(source), &tmp)
        .step(
            Step::new(&run_file)
                .input(&tmp)
                .command(Cmd::new(s.exec("ecm_gfs_look_alike_new")).arg(&tmp).arg(&run_file)),
        )
}

fn ecm(run: &ModelRun) -> Vec<FetchTask> {
    let dir = Model::Ecm.archive_dir(&run.archive_root);
    let mut tasks: Vec<FetchTask> = Model::Ecm
        .forecast_hours(run.fhrs)
        .into_iter()
        .map(|fhr| ecm_convert(run, &run.cycle, fhr))
        .collect();

    // Analyses for every cycle of the day come along with any one cycle.
    for hour in &[0, 6, 12, 18] {
        if let Ok(cycle) = CycleDate::new(run.cycle.date(), *hour) {
            tasks.push(ecm_convert(run, &cycle, 0));
            tasks.push(FetchTask::link(
                dir.join(archive_name("pgbf00", "ecm", &cycle)),
                dir.join(archive_name("pgbanl", "ecm", &cycle)),
            ));
        }
    }
    tasks
}

fn ecmg4(run: &ModelRun) -> Vec<FetchTask> {
    let s = run.settings;
    let dir = Model::Ecmg4.archive_dir(&run.archive_root);
    let prod = s.dcomroot.join(run.cycle.pdy()).join("wgrbbul").join("ecmwf");
    let namelist = run.run_file("tmpnlcopygb");

    Model::Ecmg4
        .forecast_hours(run.fhrs)
        .into_iter()
        .map(|fhr| {
            let suffix = if fhr == 0 { "011" } else { "001" };
            let source = prod.join(format!(
                "U1D{}00{}{}",
                run.cycle.init_time().format("%m%d%H"),
                run.cycle.valid_time(fhr).format("%m%d%H"),
                suffix
            ));
            let tmp = run.run_file(format!("tmp.f{}.{}", fhr3(fhr), run.cycle.cdate()));
            let name = archive_name(&format!("flxf{}", fhr2(fhr)), "ecm", &run.cycle);
            let run_file = run.run_file(&name);

            let step = ECMG4_KPDS.iter().fold(
                Step::new(&run_file).input(&tmp).input(&namelist),
                |step, kpds| {
                    step.command(
                        Cmd::new(&s.copygb)
                            .arg("-N")
                            .arg(&namelist)
                            .arg(format!("-k{}", kpds))
                            .arg("-a")
                            .arg("-x")
                            .arg(&tmp)
                            .arg(&run_file),
                    )
                },
            );

            FetchTask::new(dir.join(&name), &run.run_dir)
                .stage(Source::Text(ECMG4_NAMELIST.to_owned()), &namelist)
                .stage(Source::File(source), &tmp)
                .step(step)
        })
        .collect()
}

fn fno(run: &ModelRun) -> Vec<FetchTask> {
    let s = run.settings;
    let dir = Model::Fno.archive_dir(&run.archive_root);
    let cdate = run.cycle.cdate();

    let mut tasks: Vec<FetchTask> = Model::Fno
        .forecast_hours(run.fhrs)
        .into_iter()
        .map(|fhr| {
            let source = s.dcomroot.join("navgem").join(format!(
                "US058GMET-OPSbd2.NAVGEM{}-{}-NOAA-halfdeg.gr2",
                fhr3(fhr),
                cdate
            ));
            let grib2 = run.run_file(format!("tmp.f{}.{}", fhr3(fhr), cdate));
            let grib1 = run.run_file(format!("tmp.grib1.f{}.{}", fhr3(fhr), cdate));
            let name = archive_name(&format!("pgbf{}", fhr2(fhr)), "fno", &run.cycle);
            let run_file = run.run_file(&name);

            FetchTask::new(dir.join(&name), &run.run_dir)
                .stage(Source::File(source), &grib2)
                .step(
                    Step::new(&grib1)
                        .input(&grib2)
                        .command(tools::cnvgrib_g21(s, &grib2, &grib1)),
                )
                .step(
                    Step::new(&run_file)
                        .input(&grib1)
                        .command(tools::copygb_regrid(s, 3, &grib1, &run_file)),
                )
        })
        .collect();
    tasks.push(analysis_link(run, Model::Fno));
    tasks
}

fn gefs(run: &ModelRun, model: Model, member: &str) -> Vec<FetchTask> {
    let s = run.settings;
    let dir = model.archive_dir(&run.archive_root);
    let cyc = run.cycle.cyc();
    let prod = s
        .comroot
        .join("gefs")
        .join(&s.gefs_ver)
        .join(format!("gefs.{}", run.cycle.pdy()))
        .join(&cyc)
        .join("atmos")
        .join("pgrb2ap5");

    let mut tasks: Vec<FetchTask> = model
        .forecast_hours(run.fhrs)
        .into_iter()
        .map(|fhr| {
            let tmp = run.run_file(format!("tmp.f{}.{}", fhr3(fhr), run.cycle.cdate()));
            let name = archive_name(&format!("pgbf{}", fhr2(fhr)), model.as_ref(), &run.cycle);
            let run_file = run.run_file(&name);
            grib2_to_grib1(
                s,
                dir.join(&name),
                &run.run_dir,
                prod.join(format!("{}.t{}z.pgrb2a.0p50.f{}", member, cyc, fhr3(fhr))),
                tmp,
                run_file,
            )
        })
        .collect();

    if model == Model::Gefsm {
        // The mean has no analysis of its own.
        tasks.push(FetchTask::link(
            Model::Gfs
                .archive_dir(&run.archive_root)
                .join(archive_name("pgbanl", "gfs", &run.cycle)),
            dir.join(archive_name("pgbanl", "gefsm", &run.cycle)),
        ));
    } else {
        tasks.push(analysis_link(run, model));
    }
    tasks
}

// Stage a GRIB2 file and convert it to GRIB1.
fn grib2_to_grib1(
    settings: &Settings,
    archive: PathBuf,
    run_dir: &Path,
    source: PathBuf,
    tmp: PathBuf,
    run_file: PathBuf,
) -> FetchTask {
    FetchTask::new(archive, run_dir)
        .stage(Source::File(source), &tmp)
        .step(
            Step::new(&run_file)
                .input(&tmp)
                .command(tools::cnvgrib_g21(settings, &tmp, &run_file)),
        )
}

fn gfs(run: &ModelRun, model: Model, comroot: &Path, with_tracker: bool) -> Vec<FetchTask> {
    let s = run.settings;
    let dir = model.archive_dir(&run.archive_root);
    let cyc = run.cycle.cyc();
    let cdate = run.cycle.cdate();
    let prod = comroot
        .join("gfs")
        .join(&s.gfs_ver)
        .join(format!("gfs.{}", run.cycle.pdy()))
        .join(&cyc)
        .join("atmos");

    let mut tasks = vec![];
    for fhr in model.forecast_hours(run.fhrs) {
        let name = archive_name(&format!("pgbf{}", fhr2(fhr)), "gfs", &run.cycle);
        tasks.push(grib2_to_grib1(
            s,
            dir.join(&name),
            &run.run_dir,
            prod.join(format!("gfs.t{}z.pgrb2.1p00.f{}", cyc, fhr3(fhr))),
            run.run_file(format!("tmp.pgrb2.1p00.gfs.f{}.{}", fhr3(fhr), cdate)),
            run.run_file(&name),
        ));

        if fhr <= GFS_LONG_RANGE {
            let name = archive_name(&format!("flxf{}", fhr2(fhr)), "gfs", &run.cycle);
            let flux = run.run_file(format!("tmp.sfluxgrb.gfs.f{}.{}", fhr3(fhr), cdate));
            let subset = run.run_file(format!(
                "tmp.sfluxgrb.gfs.PRATE.2mTMP.f{}.{}",
                fhr3(fhr),
                cdate
            ));
            let run_file = run.run_file(&name);

            tasks.push(
                FetchTask::new(dir.join(&name), &run.run_dir)
                    .stage(
                        Source::File(prod.join(format!(
                            "gfs.t{}z.sfluxgrbf{}.grib2",
                            cyc,
                            fhr3(fhr)
                        ))),
                        &flux,
                    )
                    .step(
                        Step::new(&subset)
                            .input(&flux)
                            .command(tools::wgrib2_match(s, &flux, GFS_FLUX_MATCH, &subset)),
                    )
                    .step(
                        Step::new(&run_file)
                            .input(&subset)
                            .command(tools::cnvgrib_g21(s, &subset, &run_file)),
                    ),
            );
        }
    }

    let name = archive_name("pgbanl", "gfs", &run.cycle);
    tasks.push(grib2_to_grib1(
        s,
        dir.join(&name),
        &run.run_dir,
        prod.join(format!("gfs.t{}z.pgrb2.1p00.anl", cyc)),
        run.run_file(format!("tmp.pgrb2.1p00.gfs.anl.{}", cdate)),
        run.run_file(&name),
    ));

    // GDAS always comes from the production disk.
    let gdas = s
        .comroot
        .join("gfs")
        .join(&s.gfs_ver)
        .join(format!("gdas.{}", run.cycle.pdy()))
        .join(&cyc)
        .join("atmos");
    for (suffix, kind) in &[("anl", "pgbanl"), ("f000", "pgbf00"), ("f006", "pgbf06")] {
        let name = archive_name(kind, "gdas", &run.cycle);
        tasks.push(grib2_to_grib1(
            s,
            dir.join(&name),
            &run.run_dir,
            gdas.join(format!("gdas.t{}z.pgrb2.1p00.{}", cyc, suffix)),
            run.run_file(format!("tmp.pgrb2.1p00.gdas.{}.{}", suffix, cdate)),
            run.run_file(&name),
        ));
    }

    if with_tracker {
        let name = archive_name("atcfunix", "gfs", &run.cycle);
        tasks.push(FetchTask::copy(
            s.comroot
                .join("ens_tracker")
                .join(&s.ens_tracker_ver)
                .join(format!("gfs.{}", run.cycle.pdy()))
                .join(&cyc)
                .join("tctrack")
                .join(format!("avn.t{}z.cyclone.trackatcfunix", cyc)),
            run.run_file(&name),
            dir.join(&name),
        ));
    }

    tasks
}

fn jma(run: &ModelRun) -> Vec<FetchTask> {
    let s = run.settings;
    let dir = Model::Jma.archive_dir(&run.archive_root);
    let cyc = run.cycle.cyc();
    let cdate = run.cycle.cdate();
    let prod = s.dcomroot.join(run.cycle.pdy()).join("wgrbbul");
    let north = run.run_file(format!("tmp.n.{}", cdate));
    let south = run.run_file(format!("tmp.s.{}", cdate));

    let mut tasks: Vec<FetchTask> = Model::Jma
        .forecast_hours(run.fhrs)
        .into_iter()
        .map(|fhr| {
            let record = if fhr == 0 {
                ":anl".to_owned()
            } else {
                format!("{}hr", fhr2(fhr))
            };
            let north_fhr = format!("tmp.n.f{}.{}", fhr3(fhr), cdate);
            let south_fhr = format!("tmp.s.f{}.{}", fhr3(fhr), cdate);
            let name = archive_name(&format!("pgbf{}", fhr2(fhr)), "jma", &run.cycle);

            FetchTask::new(dir.join(&name), &run.run_dir)
                .stage(Source::File(prod.join(format!("jma_n_{}", cyc))), &north)
                .stage(Source::File(prod.join(format!("jma_s_{}", cyc))), &south)
                .step(
                    Step::new(run.run_file(&north_fhr)).input(&north).command(
                        tools::wgrib_extract(s, &north, &record, Path::new(&north_fhr))
                            .current_dir(&run.run_dir),
                    ),
                )
                .step(
                    Step::new(run.run_file(&south_fhr)).input(&south).command(
                        tools::wgrib_extract(s, &south, &record, Path::new(&south_fhr))
                            .current_dir(&run.run_dir),
                    ),
                )
                .step(
                    Step::new(run.run_file(&name))
                        .input(run.run_file(&north_fhr))
                        .input(run.run_file(&south_fhr))
                        .command(
                            Cmd::new(s.exec("jma_merge"))
                                .args(&[&north_fhr, &south_fhr, &name])
                                .current_dir(&run.run_dir),
                        ),
                )
        })
        .collect();
    tasks.push(analysis_link(run, Model::Jma));
    tasks
}

fn ncmrwf(run: &ModelRun) -> Vec<FetchTask> {
    let s = run.settings;
    let dir = Model::Ncmrwf.archive_dir(&run.archive_root);
    let prod = s
        .dcomroot
        .join(run.cycle.pdy())
        .join("wgrbbul")
        .join("ncmrwf_gdas");

    let mut tasks: Vec<FetchTask> = Model::Ncmrwf
        .forecast_hours(run.fhrs)
        .into_iter()
        .map(|fhr| {
            let name = archive_name(&format!("pgbf{}", fhr2(fhr)), "ncmrwf", &run.cycle);
            grib2_to_grib1(
                s,
                dir.join(&name),
                &run.run_dir,
                prod.join(format!("gdas1.t{}z.grbf{}", run.cycle.cyc(), fhr2(fhr))),
                run.run_file(format!("tmp.f{}.{}", fhr3(fhr), run.cycle.cdate())),
                run.run_file(&name),
            )
        })
        .collect();
    tasks.push(analysis_link(run, Model::Ncmrwf));
    tasks
}

fn ukm(run: &ModelRun) -> Vec<FetchTask> {
    let s = run.settings;
    let dir = Model::Ukm.archive_dir(&run.archive_root);
    let cyc = run.cycle.cyc();
    let prod = s.dcomroot.join(run.cycle.pdy()).join("wgrbbul").join("ukmet_hires");

    let mut tasks: Vec<FetchTask> = Model::Ukm
        .forecast_hours(run.fhrs)
        .into_iter()
        .filter_map(|fhr| {
            let lead_id = UKM_LEAD_IDS
                .iter()
                .find(|(hour, _)| *hour == fhr)
                .map(|(_, id)| *id)?;
            let record = if fhr == 0 {
                "anl".to_owned()
            } else {
                format!("{}hr", fhr)
            };
            let source = prod.join(format!("GAB{}{}.GRB", cyc, lead_id));
            let extracted = format!("tmp.GAB{}{}.GRB.f{}", cyc, lead_id, fhr);
            let name = archive_name(&format!("pgbf{}", fhr2(fhr)), "ukm", &run.cycle);

            Some(
                FetchTask::new(dir.join(&name), &run.run_dir)
                    .step(
                        Step::new(run.run_file(&extracted)).input(&source).command(
                            tools::wgrib_extract(s, &source, &record, Path::new(&extracted))
                                .current_dir(&run.run_dir),
                        ),
                    )
                    .step(
                        Step::new(run.run_file(&name))
                            .input(run.run_file(&extracted))
                            .command(
                                Cmd::new(s.exec("ukm_hires_merge"))
                                    .args(&[&extracted, &name, &fhr.to_string()])
                                    .current_dir(&run.run_dir),
                            ),
                    ),
            )
        })
        .collect();
    tasks.push(analysis_link(run, Model::Ukm));
    tasks
}

const GRAPHCAST_BUCKET: &str = "https://noaa-nws-graphcastgfs-pds.s3.amazonaws.com";
const GRAPHCAST_LEVELS: &[&str] = &["13", "13_test"];

fn graphcast_dir(archive_root: &Path, levels: &str) -> PathBuf {
    archive_root.join(format!("graphcastgfs{}", levels))
}

fn graphcast(run: &ModelRun) -> Vec<FetchTask> {
    let cyc = run.cycle.cyc();
    let pdy = run.cycle.pdy();
    let mut tasks = vec![];

    for levels in GRAPHCAST_LEVELS {
        let dir = graphcast_dir(&run.archive_root, levels)
            .join(format!("graphcastgfs.{}", pdy))
            .join(&cyc);
        let run_dir = run.run_dir.join(levels);
        let url_dir = if *levels == "13_test" {
            "forecasts_13_levels_test".to_owned()
        } else {
            format!("forecasts_{}_levels", levels)
        };

        for fhr in Model::Graphcastgfs.forecast_hours(run.fhrs) {
            let name = format!("graphcastgfs.t{}z.pgrb2.0p25.f{}", cyc, fhr3(fhr));
            let url = format!(
                "{}/graphcastgfs.{}/{}/{}/{}",
                GRAPHCAST_BUCKET, pdy, cyc, url_dir, name
            );
            tasks.push(
                FetchTask::new(dir.join(&name), &run_dir)
                    .stage(Source::Url(url), run_dir.join(&name)),
            );
        }
    }
    tasks
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
