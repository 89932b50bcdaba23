//! Bundle one month of one model cycle onto HPSS.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, cycle_arg, hpssdir_arg, model_arg, option},
    logging, Archive, Model, ScriptArgs, Session, Settings, SystemRunner,
};

const SCRIPT: &str = "create_monthly_model_hpss_tar";

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

    let app = ScriptArgs::new_app(SCRIPT, "Put a month of model data from the archive on HPSS.")
        .arg(option("yearmon", "YYYYMM", "Month to process. Defaults to this month."))
        .arg(archdir_arg())
        .arg(hpssdir_arg())
        .arg(model_arg("gfs"))
        .arg(cycle_arg());
    let args = ScriptArgs::matches(app, 5, &settings)?;

    let month = args.year_month()?;
    let model: Model = args.source("model", "gfs")?;
    let cycle = args.cycle()?;
    let arch = Archive::connect(args.archdir("model_archive")?)?;
    let hpss_root = args.hpssdir("model_archive")?;

    logging::begin(SCRIPT);
    let session = Session::new(&settings, &SystemRunner);
    arch.bundle_model_month(&session, model, month, cycle, &hpss_root)?;
    logging::end(SCRIPT);

    Ok(())
}
