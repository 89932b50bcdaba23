//! Check one day of an observation source in the archive for missing files.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, date_arg, obs_arg, rundir_arg},
    logging, Archive, Obs, ScriptArgs, Settings,
};

const SCRIPT: &str = "check_obs_data";

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

    let app = ScriptArgs::new_app(SCRIPT, "Check the observation archive for missing files.")
        .arg(date_arg())
        .arg(archdir_arg())
        .arg(rundir_arg())
        .arg(obs_arg());
    let args = ScriptArgs::matches(app, 4, &settings)?;

    let date = args.date()?;
    let obs: Obs = args.source("obs", "prepbufr_gdas")?;
    let arch = Archive::new(args.archdir("obs_archive")?);
    let run_dir = args.rundir()?;

    logging::begin(SCRIPT);
    arch.audit_obs(obs, date, &run_dir)?;
    logging::end(SCRIPT);

    Ok(())
}
