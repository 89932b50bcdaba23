//! Bundle one month of an observation source onto HPSS.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, hpssdir_arg, obs_arg, option},
    logging, Archive, Obs, ScriptArgs, Session, Settings, SystemRunner,
};

const SCRIPT: &str = "create_monthly_obs_hpss_tar";

fn main() {
    if let Err(ref e) = run() {
        println!("error: {}", e);

        for cause in e.chain().skip(1) {
            println!("caused by: {}", cause);
        }

        ::std::process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    logging::init();
    let settings = Settings::load()?;

    let app = ScriptArgs::new_app(SCRIPT, "Put a month of observations from the archive on HPSS.")
        .arg(option("yearmon", "YYYYMM", "Month to process. Defaults to this month."))
        .arg(archdir_arg())
        .arg(hpssdir_arg())
        .arg(obs_arg());
    let args = ScriptArgs::matches(app, 4, &settings)?;

    let month = args.year_month()?;
    let obs: Obs = args.source("obs", "prepbufr_gdas")?;
    let arch = Archive::connect(args.archdir("obs_archive")?)?;
    let hpss_root = args.hpssdir("obs_archive")?;

    logging::begin(SCRIPT);
    let session = Session::new(&settings, &SystemRunner);
    arch.bundle_obs_month(&session, obs, month, &hpss_root)?;
    logging::end(SCRIPT);

    Ok(())
}
