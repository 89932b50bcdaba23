//! Average the member analyses into the common analysis.

use anyhow::Error;
use global_archive::{
    cmd_line::{archdir_arg, cycle_arg, date_arg, rundir_arg},
    logging, Archive, CycleDate, ScriptArgs, Session, Settings, SystemRunner,
};

const SCRIPT: &str = "create_canl";

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

    let app = ScriptArgs::new_app(SCRIPT, "Create the common analysis from archived analyses.")
        .arg(date_arg())
        .arg(archdir_arg())
        .arg(rundir_arg())
        .arg(cycle_arg());
    let args = ScriptArgs::matches(app, 4, &settings)?;

    let cycle = CycleDate::new(args.date()?, args.cycle()?)?;
    let arch = Archive::new(args.archdir("model_archive")?);
    let run_root = args.rundir()?;

    logging::begin(SCRIPT);
    let session = Session::new(&settings, &SystemRunner);
    let outcome = arch.create_canl(&session, &cycle, &run_root)?;
    tracing::info!("canl {}: {}", cycle, outcome);
    logging::end(SCRIPT);

    Ok(())
}
