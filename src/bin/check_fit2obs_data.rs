//! Check one cycle of fit-to-obs statistics in the archive for missing files.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, cycle_arg, date_arg, model_arg, rundir_arg},
    logging, Archive, CycleDate, Fit2obs, ScriptArgs, Settings,
};

const SCRIPT: &str = "check_fit2obs_data";

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

    let app = ScriptArgs::new_app(SCRIPT, "Check the fit2obs archive for missing files.")
        .arg(date_arg())
        .arg(cycle_arg())
        .arg(archdir_arg())
        .arg(rundir_arg())
        .arg(model_arg("fnl"));
    let args = ScriptArgs::matches(app, 5, &settings)?;

    let cycle = CycleDate::new(args.date()?, args.cycle()?)?;
    let source: Fit2obs = args.source("model", "fnl")?;
    let arch = Archive::new(args.archdir("fit2obs_archive")?);
    let run_dir = args.rundir()?;

    logging::begin(SCRIPT);
    arch.audit_fit2obs(source, &cycle, &run_dir)?;
    logging::end(SCRIPT);

    Ok(())
}
