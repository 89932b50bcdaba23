//! Check one cycle of a model in the archive for missing files.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, cycle_arg, date_arg, fhr_args, model_arg, rundir_arg},
    logging, Archive, CycleDate, Model, ScriptArgs, Settings,
};

const SCRIPT: &str = "check_model_data";

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

    let app = ScriptArgs::new_app(SCRIPT, "Check the model archive for missing files.")
        .arg(date_arg())
        .arg(archdir_arg())
        .arg(rundir_arg())
        .arg(model_arg("gfs"))
        .arg(cycle_arg())
        .args(fhr_args());
    let args = ScriptArgs::matches(app, 8, &settings)?;

    let cycle = CycleDate::new(args.date()?, args.cycle()?)?;
    let model: Model = args.source("model", "gfs")?;
    let fhrs = args.forecast_hours()?;
    let arch = Archive::new(args.archdir("model_archive")?);
    let run_dir = args.rundir()?;

    logging::begin(SCRIPT);
    arch.audit_model(model, &cycle, fhrs, &run_dir)?;
    logging::end(SCRIPT);

    Ok(())
}
