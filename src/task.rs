//! The check, stage, convert, publish pipeline every fetch driver runs per file.
//!
//! A [`FetchTask`] is plain data describing where a file comes from, which commands turn it into
//! the run local output, and where that output is archived. [`FetchTask::run`] moves strictly
//! forward through the states and stops at the first one whose output fails the existence
//! oracle. An archive file that already passes the oracle short circuits everything, so running
//! a task twice writes nothing the second time.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    config::Session,
    errors::ArchiveErr,
    files::{check_file, copy_file, link_file, make_dir, restrict},
    shell::Cmd,
    tools,
};

/// Where staged data comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// A file on a production disk.
    File(PathBuf),
    /// An HTTPS download.
    Url(String),
    /// A file on an FTP server.
    Ftp {
        /// `ftp://` host
        host: String,
        /// Directory to change into on the server.
        dir: String,
        /// Path of the file below `dir`.
        remote: String,
    },
    /// One member of an HPSS tarball.
    Htar {
        /// Full HPSS path of the tarball.
        tarball: String,
        /// Member name as stored in the tarball.
        member: String,
    },
    /// Literal text, for generated control files.
    Text(String),
}

/// One file to stage into the run directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    source: Source,
    dest: PathBuf,
}

/// One conversion: commands that read `inputs` and should leave `output` behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    inputs: Vec<PathBuf>,
    commands: Vec<Cmd>,
    output: PathBuf,
}

impl Step {
    /// A step that produces `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Step {
            inputs: vec![],
            commands: vec![],
            output: output.into(),
        }
    }

    /// Require `path` to pass the oracle before any command runs.
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    /// Append a command.
    pub fn command(mut self, cmd: Cmd) -> Self {
        self.commands.push(cmd);
        self
    }

    /// The file this step produces.
    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// How the run local output reaches the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Publish {
    /// Copy the output file to the archive path.
    Copy,
    /// Symlink the archive path to the output, which is itself already archived.
    Link,
    /// Copy every file in each of `subdirs` below `from` to the same place below `to`.
    Tree {
        /// Run side root.
        from: PathBuf,
        /// Archive side root.
        to: PathBuf,
        /// Directories, relative to both roots.
        subdirs: Vec<PathBuf>,
    },
}

/// Final state of one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The archive file was already there.
    AlreadyArchived,
    /// A precondition other than the source files was not met.
    Blocked,
    /// A source file could not be staged.
    StageFailed,
    /// A conversion did not produce its output.
    ConvertFailed,
    /// The output was made but archiving is turned off.
    Staged,
    /// Publishing did not leave a usable archive file.
    PublishFailed,
    /// The archive file was written by this run.
    Archived,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            Outcome::AlreadyArchived => "already archived",
            Outcome::Blocked => "blocked",
            Outcome::StageFailed => "stage failed",
            Outcome::ConvertFailed => "convert failed",
            Outcome::Staged => "staged, not archived",
            Outcome::PublishFailed => "publish failed",
            Outcome::Archived => "archived",
        };
        write!(f, "{}", text)
    }
}

/// Everything needed to bring one archive file into existence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTask {
    archive: PathBuf,
    workdir: PathBuf,
    stages: Vec<Stage>,
    steps: Vec<Step>,
    output: Option<PathBuf>,
    publish: Publish,
    restricted: bool,
    blocked: Option<String>,
}

impl FetchTask {
    /// A task that archives to `archive` and does its scratch work in `workdir`.
    pub fn new(archive: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        FetchTask {
            archive: archive.into(),
            workdir: workdir.into(),
            stages: vec![],
            steps: vec![],
            output: None,
            publish: Publish::Copy,
            restricted: false,
            blocked: None,
        }
    }

    /// Shorthand for copying a production file straight into the archive by way of the run
    /// directory.
    pub fn copy(
        source: impl Into<PathBuf>,
        run_file: impl Into<PathBuf>,
        archive: impl Into<PathBuf>,
    ) -> Self {
        let run_file = run_file.into();
        let workdir = run_file.parent().map(Path::to_path_buf).unwrap_or_default();
        FetchTask::new(archive, workdir).stage(Source::File(source.into()), run_file)
    }

    /// Shorthand for an archive entry that is a link to another archived file.
    pub fn link(target: impl Into<PathBuf>, archive: impl Into<PathBuf>) -> Self {
        let archive = archive.into();
        let workdir = archive.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut task = FetchTask::new(archive, workdir);
        task.output = Some(target.into());
        task.publish = Publish::Link;
        task
    }

    /// Stage `source` into `dest`. The last stage or step added is what gets published.
    pub fn stage(mut self, source: Source, dest: impl Into<PathBuf>) -> Self {
        let dest = dest.into();
        self.output = Some(dest.clone());
        self.stages.push(Stage { source, dest });
        self
    }

    /// Add a conversion step.
    pub fn step(mut self, step: Step) -> Self {
        self.output = Some(step.output.clone());
        self.steps.push(step);
        self
    }

    /// Publish a directory tree instead of a single file. The archive path acts as the gate.
    pub fn publish_tree(
        mut self,
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        subdirs: &[&str],
    ) -> Self {
        self.publish = Publish::Tree {
            from: from.into(),
            to: to.into(),
            subdirs: subdirs.iter().map(PathBuf::from).collect(),
        };
        self
    }

    /// Apply restricted permissions to what gets archived.
    pub fn restricted(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }

    /// Mark the task as unable to proceed for `reason`, checked after the archive.
    pub fn blocked(mut self, reason: impl Into<String>) -> Self {
        self.blocked = Some(reason.into());
        self
    }

    /// The archive path this task produces.
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// The run local output that gets published.
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Whether archived data gets restricted permissions.
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Take the task as far as it can go.
    pub fn run(&self, session: &Session) -> Result<Outcome, ArchiveErr> {
        // CHECK-ARCHIVE
        if check_file(&self.archive)? {
            return Ok(Outcome::AlreadyArchived);
        }
        if let Some(reason) = &self.blocked {
            info!("{}", reason);
            return Ok(Outcome::Blocked);
        }

        // STAGE
        for stage in &self.stages {
            if !check_file(&stage.dest)? {
                self.fetch(session, stage)?;
                if !check_file(&stage.dest)? {
                    return Ok(Outcome::StageFailed);
                }
            }
        }

        // CONVERT
        for step in &self.steps {
            if check_file(&step.output)? {
                continue;
            }
            for input in &step.inputs {
                if !check_file(input)? {
                    return Ok(Outcome::ConvertFailed);
                }
            }
            session.runner.run_all(&step.commands);
            if !check_file(&step.output)? {
                return Ok(Outcome::ConvertFailed);
            }
        }

        let output = match &self.output {
            Some(output) => output,
            None => return Ok(Outcome::StageFailed),
        };
        if self.stages.is_empty() && self.steps.is_empty() && !check_file(output)? {
            return Ok(Outcome::StageFailed);
        }

        if !session.settings.send_to_archive() {
            return Ok(Outcome::Staged);
        }

        // PUBLISH
        self.publish(session, output)?;
        if check_file(&self.archive)? {
            if self.restricted {
                restrict(session.runner, &self.archive);
            }
            Ok(Outcome::Archived)
        } else {
            Ok(Outcome::PublishFailed)
        }
    }

    fn fetch(&self, session: &Session, stage: &Stage) -> Result<(), ArchiveErr> {
        let dest = &stage.dest;
        debug!("staging {}", dest.display());
        if let Some(parent) = dest.parent() {
            make_dir(parent)?;
        }

        match &stage.source {
            Source::File(src) => copy_file(src, dest)?,
            Source::Url(url) => {
                session.runner.run(&tools::wget(url, dest).current_dir(&self.workdir));
            }
            Source::Ftp { host, dir, remote } => {
                session
                    .runner
                    .run(&tools::lftp_get(host, dir, remote, dest).current_dir(&self.workdir));
            }
            Source::Htar { tarball, member } => {
                session
                    .runner
                    .run(&tools::htar_extract(tarball, &self.workdir, &[member.as_str()]));
                let extracted = self
                    .workdir
                    .join(member.trim_start_matches("./").trim_start_matches('/'));
                if extracted.is_file() {
                    fs::rename(&extracted, dest)?;
                }
            }
            Source::Text(text) => fs::write(dest, text)?,
        }

        Ok(())
    }

    fn publish(&self, session: &Session, output: &Path) -> Result<(), ArchiveErr> {
        if let Some(parent) = self.archive.parent() {
            if make_dir(parent)? && self.restricted {
                restrict(session.runner, parent);
            }
        }

        match &self.publish {
            Publish::Copy => copy_file(output, &self.archive),
            Publish::Link => link_file(output, &self.archive),
            Publish::Tree { from, to, subdirs } => {
                for subdir in subdirs {
                    let src_dir = from.join(subdir);
                    let dest_dir = to.join(subdir);
                    if !src_dir.is_dir() {
                        info!("{} DOES NOT EXIST", src_dir.display());
                        continue;
                    }
                    if make_dir(&dest_dir)? && self.restricted {
                        restrict(session.runner, &dest_dir);
                    }
                    for entry in fs::read_dir(&src_dir)? {
                        let path = entry?.path();
                        if let (true, Some(name)) = (path.is_file(), path.file_name()) {
                            let dest = dest_dir.join(name);
                            copy_file(&path, &dest)?;
                            if self.restricted && dest.exists() {
                                restrict(session.runner, &dest);
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// Run every task, logging how each one ended. Returns the outcomes in task order.
pub fn run_tasks(session: &Session, tasks: &[FetchTask]) -> Result<Vec<Outcome>, ArchiveErr> {
    tasks
        .iter()
        .map(|task| {
            let outcome = task.run(session)?;
            debug!("{}: {}", task.archive().display(), outcome);
            Ok(outcome)
        })
        .collect()
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::{
        config::Settings,
        shell::{testing::RecordingRunner, testing::write_last_arg},
    };

    use tempdir::TempDir;

    struct TestDirs {
        _tmp: TempDir,
        prod: PathBuf,
        run: PathBuf,
        archive: PathBuf,
    }

    fn test_dirs() -> TestDirs {
        let tmp = TempDir::new("global-archive-test-task").unwrap();
        let prod = tmp.path().join("prod");
        let run = tmp.path().join("run");
        let archive = tmp.path().join("archive");
        for dir in &[&prod, &run] {
            fs::create_dir_all(dir).unwrap();
        }
        TestDirs {
            _tmp: tmp,
            prod,
            run,
            archive,
        }
    }

    fn convert_task(dirs: &TestDirs, settings: &Settings) -> FetchTask {
        let tmp = dirs.run.join("tmp.f024.2024011500");
        let run_file = dirs.run.join("pgbf24.gfs.2024011500");
        FetchTask::new(dirs.archive.join("pgbf24.gfs.2024011500"), &dirs.run)
            .stage(Source::File(dirs.prod.join("gfs.t00z.pgrb2.1p00.f024")), &tmp)
            .step(
                Step::new(&run_file)
                    .input(&tmp)
                    .command(tools::cnvgrib_g21(settings, &tmp, &run_file)),
            )
    }

    #[test]
    fn test_full_pipeline() {
        let dirs = test_dirs();
        let settings = Settings::defaults("/home/ga");
        let runner = RecordingRunner::with_effect(write_last_arg);
        let session = Session::new(&settings, &runner);

        fs::write(dirs.prod.join("gfs.t00z.pgrb2.1p00.f024"), b"GRIB2").unwrap();
        let task = convert_task(&dirs, &settings);

        assert_eq!(task.run(&session).unwrap(), Outcome::Archived);
        assert_eq!(runner.programs(), vec!["cnvgrib"]);
        assert!(check_file(task.archive()).unwrap());
    }

    #[test]
    fn test_idempotent_when_archived() {
        let dirs = test_dirs();
        let settings = Settings::defaults("/home/ga");
        let runner = RecordingRunner::with_effect(write_last_arg);
        let session = Session::new(&settings, &runner);

        fs::create_dir_all(&dirs.archive).unwrap();
        fs::write(dirs.archive.join("pgbf24.gfs.2024011500"), b"GRIB").unwrap();
        let task = convert_task(&dirs, &settings).restricted(true);

        assert_eq!(task.run(&session).unwrap(), Outcome::AlreadyArchived);
        assert!(runner.calls().is_empty());
        assert!(fs::read_dir(&dirs.run).unwrap().next().is_none());
    }

    #[test]
    fn test_missing_source() {
        let dirs = test_dirs();
        let settings = Settings::defaults("/home/ga");
        let runner = RecordingRunner::new();
        let session = Session::new(&settings, &runner);

        let task = convert_task(&dirs, &settings);
        assert_eq!(task.run(&session).unwrap(), Outcome::StageFailed);
        assert!(runner.calls().is_empty());
        assert!(!dirs.archive.exists());
    }

    #[test]
    fn test_failed_conversion() {
        let dirs = test_dirs();
        let settings = Settings::defaults("/home/ga");
        // Tool fails and leaves an empty output behind.
        let runner = RecordingRunner::with_effect(|cmd| {
            let out = cmd.argv().last().cloned().unwrap_or_default();
            fs::write(out, b"").unwrap();
            1
        });
        let session = Session::new(&settings, &runner);

        fs::write(dirs.prod.join("gfs.t00z.pgrb2.1p00.f024"), b"GRIB2").unwrap();
        let task = convert_task(&dirs, &settings);

        assert_eq!(task.run(&session).unwrap(), Outcome::ConvertFailed);
        assert!(!dirs.run.join("pgbf24.gfs.2024011500").exists());
        assert!(!task.archive().exists());
    }

    #[test]
    fn test_archiving_disabled() {
        let dirs = test_dirs();
        let mut settings = Settings::defaults("/home/ga");
        settings.sendarch = "NO".to_owned();
        let runner = RecordingRunner::new();
        let session = Session::new(&settings, &runner);

        fs::write(dirs.prod.join("cmc_2024011500f024"), b"GRIB").unwrap();
        let task = FetchTask::copy(
            dirs.prod.join("cmc_2024011500f024"),
            dirs.run.join("pgbf24.cmc.2024011500"),
            dirs.archive.join("pgbf24.cmc.2024011500"),
        );

        assert_eq!(task.run(&session).unwrap(), Outcome::Staged);
        assert!(dirs.run.join("pgbf24.cmc.2024011500").exists());
        assert!(!dirs.archive.exists());
    }

    #[test]
    fn test_link_and_restrict() {
        let dirs = test_dirs();
        let settings = Settings::defaults("/home/ga");
        let runner = RecordingRunner::new();
        let session = Session::new(&settings, &runner);

        fs::create_dir_all(&dirs.archive).unwrap();
        let f00 = dirs.archive.join("pgbf00.ecm.2024011500");
        let anl = dirs.archive.join("pgbanl.ecm.2024011500");

        let task = FetchTask::link(&f00, &anl).restricted(true);
        assert_eq!(task.run(&session).unwrap(), Outcome::StageFailed);

        fs::write(&f00, b"GRIB").unwrap();
        assert_eq!(task.run(&session).unwrap(), Outcome::Archived);
        assert_eq!(runner.programs(), vec!["chmod", "chgrp"]);
        assert_eq!(fs::read(&anl).unwrap(), b"GRIB");
    }

    #[test]
    fn test_blocked() {
        let dirs = test_dirs();
        let settings = Settings::defaults("/home/ga");
        let runner = RecordingRunner::new();
        let session = Session::new(&settings, &runner);

        let task = FetchTask::new(dirs.archive.join("weekly.nc"), &dirs.run)
            .blocked("Not enough files to make weekly.nc");
        assert_eq!(task.run(&session).unwrap(), Outcome::Blocked);
    }

    #[test]
    fn test_tree_publish() {
        let dirs = test_dirs();
        let settings = Settings::defaults("/home/ga");
        let runner = RecordingRunner::new();
        let session = Session::new(&settings, &runner);

        for (sub, name) in &[
            ("fits", "f24.raob.2024011500"),
            ("fits", "f00.acar.2024011500"),
            ("horiz/anl", "adpsfc.2024011500"),
        ] {
            fs::create_dir_all(dirs.run.join(sub)).unwrap();
            fs::write(dirs.run.join(sub).join(name), b"fit").unwrap();
        }

        let gate = dirs.archive.join("fits").join("f24.raob.2024011500");
        let task = FetchTask::new(&gate, &dirs.run)
            .step(Step::new(dirs.run.join("fits").join("f24.raob.2024011500")))
            .publish_tree(&dirs.run, &dirs.archive, &["fits", "horiz/fcs", "horiz/anl"]);

        assert_eq!(task.run(&session).unwrap(), Outcome::Archived);
        assert!(dirs.archive.join("fits").join("f00.acar.2024011500").exists());
        assert!(dirs.archive.join("horiz/anl").join("adpsfc.2024011500").exists());
        assert!(!dirs.archive.join("horiz/fcs").exists());
    }
}
