//! Remove one day of files from an archive directory, here and on the partner machine.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, option},
    logging, Archive, MachinePair, ScriptArgs, Session, Settings, SystemRunner,
};

const SCRIPT: &str = "remove_data";

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

    let app = ScriptArgs::new_app(SCRIPT, "Remove a day of files from an archive directory.")
        .arg(option(
            "removedate",
            "PDY",
            "Date to remove, YYYYMMDD. Defaults to a week ago.",
        ))
        .arg(archdir_arg());
    let args = ScriptArgs::matches(app, 2, &settings)?;

    let date = args.remove_date()?;
    let arch = Archive::connect(args.archdir("model_archive/gfs")?)?;

    logging::begin(SCRIPT);
    let machines = MachinePair::from_system(&settings.prodmachinefile)?;
    let session = Session::new(&settings, &SystemRunner);
    arch.prune(&session, &machines, date)?;
    logging::end(SCRIPT);

    Ok(())
}
