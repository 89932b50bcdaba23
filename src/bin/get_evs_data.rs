//! Get EVS verification statistics and put them in the EVS archive.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, date_arg, model_arg, rundir_arg},
    logging, Archive, DateWindow, ScriptArgs, Session, Settings, SystemRunner,
};

const SCRIPT: &str = "get_evs_data";

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

    let app = ScriptArgs::new_app(SCRIPT, "Get EVS statistics and put them in the archive.")
        .arg(date_arg())
        .arg(archdir_arg())
        .arg(rundir_arg())
        .arg(model_arg("gfs"));
    let args = ScriptArgs::matches(app, 4, &settings)?;

    let window = DateWindow::new(args.date()?);
    let model = args.name("model", "gfs");
    let arch = Archive::new(args.archdir("evs_archive")?);
    let run_root = args.rundir()?;

    logging::begin(SCRIPT);
    let session = Session::new(&settings, &SystemRunner);
    arch.fetch_evs(&session, model, &run_root, &window)?;
    logging::end(SCRIPT);

    Ok(())
}
