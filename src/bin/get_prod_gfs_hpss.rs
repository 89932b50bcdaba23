//! Get production GFS files from the HPSS run history and put them in the GFS archive.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, cycle_arg, date_arg, fhr_args, option, rundir_arg},
    logging, Archive, CycleDate, FileType, ScriptArgs, Session, Settings, SystemRunner,
};

const SCRIPT: &str = "get_prod_gfs_hpss";

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

    let app = ScriptArgs::new_app(SCRIPT, "Get production GFS files from HPSS.")
        .arg(date_arg())
        .arg(archdir_arg())
        .arg(rundir_arg())
        .arg(option("filetype", "FILETYPE", "pgb or flx. Defaults to pgb."))
        .arg(cycle_arg())
        .args(fhr_args());
    let args = ScriptArgs::matches(app, 8, &settings)?;

    let cycle = CycleDate::new(args.date()?, args.cycle()?)?;
    let file_type: FileType = args.source("filetype", "pgb")?;
    let fhrs = args.forecast_hours()?;
    let arch = Archive::new(args.archdir("model_archive/gfs")?);
    let run_dir = args.rundir()?;

    logging::begin(SCRIPT);
    let session = Session::new(&settings, &SystemRunner);
    arch.fetch_prod_gfs(&session, file_type, &cycle, fhrs, &run_dir)?;
    logging::end(SCRIPT);

    Ok(())
}
