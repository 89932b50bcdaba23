//! Bundle one year of fit-to-obs statistics onto HPSS.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, hpssdir_arg, model_arg, option},
    logging, Archive, Fit2obs, ScriptArgs, Session, Settings, SystemRunner,
};

const SCRIPT: &str = "create_yearly_fit2obs_hpss_tar";

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

    let app = ScriptArgs::new_app(SCRIPT, "Put a year of fit-to-obs statistics on HPSS.")
        .arg(option("year", "YYYY", "Year to process. Defaults to this year."))
        .arg(archdir_arg())
        .arg(hpssdir_arg())
        .arg(model_arg("fnl"));
    let args = ScriptArgs::matches(app, 4, &settings)?;

    let year = args.year()?;
    let source: Fit2obs = args.source("model", "fnl")?;
    let arch = Archive::connect(args.archdir("fit2obs_archive")?)?;
    let hpss_root = args.hpssdir("fit2obs_archive")?;

    logging::begin(SCRIPT);
    let session = Session::new(&settings, &SystemRunner);
    arch.bundle_fit2obs_year(&session, source, year, &hpss_root)?;
    logging::end(SCRIPT);

    Ok(())
}
