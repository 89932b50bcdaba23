//! Get model data and put it in the model archive.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, cycle_arg, date_arg, fhr_args, model_arg, rundir_arg},
    logging, Archive, DateWindow, Model, ScriptArgs, Session, Settings, SystemRunner,
};

const SCRIPT: &str = "get_model_data";

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

    let app = ScriptArgs::new_app(SCRIPT, "Get model data and put it in the archive.")
        .arg(date_arg())
        .arg(archdir_arg())
        .arg(rundir_arg())
        .arg(model_arg("gfs"))
        .arg(cycle_arg())
        .args(fhr_args());
    let args = ScriptArgs::matches(app, 8, &settings)?;

    let window = DateWindow::new(args.date()?);
    let model: Model = args.source("model", "gfs")?;
    let cycle = args.cycle()?;
    let fhrs = args.forecast_hours()?;
    let arch = Archive::new(args.archdir("model_archive")?);
    let run_root = args.rundir()?;

    logging::begin(SCRIPT);
    let session = Session::new(&settings, &SystemRunner);
    arch.fetch_model(&session, model, &run_root, &window, cycle, fhrs)?;
    logging::end(SCRIPT);

    Ok(())
}
