//! Get observation data and put it in the observation archive.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, date_arg, obs_arg, rundir_arg},
    logging, Archive, DateWindow, Obs, ScriptArgs, Session, Settings, SystemRunner,
};

const SCRIPT: &str = "get_obs_data";

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

    let app = ScriptArgs::new_app(SCRIPT, "Get observation data and put it in the archive.")
        .arg(date_arg())
        .arg(archdir_arg())
        .arg(rundir_arg())
        .arg(obs_arg());
    let args = ScriptArgs::matches(app, 4, &settings)?;

    let window = DateWindow::new(args.date()?);
    let obs: Obs = args.source("obs", "prepbufr_gdas")?;
    let arch = Archive::new(args.archdir("obs_archive")?);
    let run_root = args.rundir()?;

    logging::begin(SCRIPT);
    let session = Session::new(&settings, &SystemRunner);
    arch.fetch_obs(&session, obs, &run_root, &window)?;
    logging::end(SCRIPT);

    Ok(())
}
