//! Running external tools.
//!
//! Commands are built as argument vectors. The few places that genuinely need a pipeline use
//! [`Cmd::shell`], which hands one script string to `/bin/sh -c`. Every path spliced into such a
//! script goes through [`quote`] first.
//!
//! A non-zero exit code is logged and returned, never raised. Callers find out whether a step
//! worked by checking its output file with the existence oracle.

use std::{
    ffi::{OsStr, OsString},
    fmt,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{error, info};

/// One external command, either an argument vector or an explicit shell script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cmd {
    kind: CmdKind,
    cwd: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum CmdKind {
    Args { program: OsString, args: Vec<OsString> },
    Shell(String),
}

impl Cmd {
    /// Start a command that runs `program` directly.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Cmd {
            kind: CmdKind::Args {
                program: program.as_ref().to_owned(),
                args: vec![],
            },
            cwd: None,
        }
    }

    /// A script for `/bin/sh -c`. Only for pipelines.
    pub fn shell(script: impl Into<String>) -> Self {
        Cmd {
            kind: CmdKind::Shell(script.into()),
            cwd: None,
        }
    }

    /// Append one argument. Ignored for shell scripts.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        if let CmdKind::Args { ref mut args, .. } = self.kind {
            args.push(arg.as_ref().to_owned());
        }
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        args.into_iter().fold(self, |cmd, arg| cmd.arg(arg))
    }

    /// Run the command from inside `dir`.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// The working directory, if one was set.
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Whether this command goes through the shell.
    pub fn is_shell(&self) -> bool {
        matches!(self.kind, CmdKind::Shell(_))
    }

    /// The program and arguments as they will be executed.
    pub fn argv(&self) -> Vec<String> {
        match &self.kind {
            CmdKind::Args { program, args } => std::iter::once(program)
                .chain(args.iter())
                .map(|s| s.to_string_lossy().into_owned())
                .collect(),
            CmdKind::Shell(script) => vec!["/bin/sh".to_owned(), "-c".to_owned(), script.clone()],
        }
    }

    fn to_command(&self) -> Command {
        let mut command = match &self.kind {
            CmdKind::Args { program, args } => {
                let mut command = Command::new(program);
                command.args(args);
                command
            }
            CmdKind::Shell(script) => {
                let mut command = Command::new("/bin/sh");
                command.arg("-c").arg(script);
                command
            }
        };

        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }

        command
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            CmdKind::Args { program, args } => {
                write!(f, "{}", program.to_string_lossy())?;
                for arg in args {
                    write!(f, " {}", arg.to_string_lossy())?;
                }
                Ok(())
            }
            CmdKind::Shell(script) => write!(f, "{}", script),
        }
    }
}

/// Quote a string for safe inclusion in a `/bin/sh` script.
pub fn quote(raw: &str) -> String {
    let is_plain = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));

    if is_plain {
        raw.to_owned()
    } else {
        format!("'{}'", raw.replace('\'', r"'\''"))
    }
}

/// [`quote`] for paths.
pub fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Something that can execute a [`Cmd`] and report its exit code.
pub trait CommandRunner {
    /// Execute the command and return its exit code. Failure to start counts as a non-zero code.
    fn execute(&self, cmd: &Cmd) -> i32;

    /// Log, execute, and log again if the command failed.
    fn run(&self, cmd: &Cmd) -> i32 {
        info!("--- RUNNING {}", cmd);
        let code = self.execute(cmd);
        if code != 0 {
            error!("ERROR: {} gave return code {}", cmd, code);
        }
        code
    }

    /// Run a list of commands in order, regardless of failures.
    fn run_all(&self, cmds: &[Cmd]) {
        for cmd in cmds {
            self.run(cmd);
        }
    }
}

/// Runs commands as child processes of this one and blocks until they finish.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn execute(&self, cmd: &Cmd) -> i32 {
        match cmd.to_command().status() {
            // Killed by a signal
            Ok(status) => status.code().unwrap_or(-1),
            Err(err) => {
                error!("could not start {}: {}", cmd, err);
                127
            }
        }
    }
}


#[cfg(test)]
mod unit {
    use super::testing::RecordingRunner;
    use super::*;

    #[test]
    fn test_display_and_argv() {
        let cmd = Cmd::new("cnvgrib")
            .args(&["-g21", "in.grb2", "out.grb"])
            .current_dir("/tmp");

        assert!(!cmd.is_shell());
        assert_eq!(cmd.to_string(), "cnvgrib -g21 in.grb2 out.grb");
        assert_eq!(cmd.argv(), vec!["cnvgrib", "-g21", "in.grb2", "out.grb"]);
        assert_eq!(cmd.cwd(), Some(Path::new("/tmp")));

        let cmd = Cmd::shell("wgrib a | grep ':anl' | wgrib a -i -grib -o b").arg("ignored");
        assert!(cmd.is_shell());
        assert_eq!(cmd.argv()[2], "wgrib a | grep ':anl' | wgrib a -i -grib -o b");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("/lfs/h1/ops/prod/com"), "/lfs/h1/ops/prod/com");
        assert_eq!(quote(":anl"), ":anl");
        assert_eq!(quote("two words"), "'two words'");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
        assert_eq!(quote("*.2024*"), "'*.2024*'");
    }

    #[test]
    fn test_system_runner_exit_codes() {
        assert_eq!(SystemRunner.run(&Cmd::new("true")), 0);
        assert_ne!(SystemRunner.run(&Cmd::new("false")), 0);
        assert_eq!(SystemRunner.run(&Cmd::shell("exit 3")), 3);
        assert_eq!(
            SystemRunner.run(&Cmd::new("/no/such/program/anywhere")),
            127
        );
    }

    #[test]
    fn test_recording_runner() {
        let runner = RecordingRunner::with_effect(|cmd| if cmd.is_shell() { 1 } else { 0 });

        assert_eq!(runner.run(&Cmd::new("/usr/bin/hsi").arg("ls")), 0);
        assert_eq!(runner.run(&Cmd::shell("wgrib x | grep y")), 1);

        assert_eq!(runner.calls().len(), 2);
        assert_eq!(runner.programs(), vec!["hsi", "wgrib"]);
    }
}
