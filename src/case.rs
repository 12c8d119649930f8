//! Test cases and the target they run against.

use crate::capture::{CommandScript, ExecutionOutcome, Transcript, capture};
use crate::config::HarnessConfig;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Default prompt printed by the target before each command.
pub const DEFAULT_PROMPT: &str = "smash > ";

pub const DEFAULT_SHUTDOWN: &str = "quit";

/// Shutdown that also terminates the target's background jobs.
pub const DEFAULT_SHUTDOWN_KILL: &str = "quit kill";

/// Default deadline for interactive cases.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The single classification a test case produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    /// An assertion did not hold. Carries the literal values for debugging.
    Fail {
        expected: Option<String>,
        actual: Option<String>,
    },
    /// The case itself broke (fixture error, panic, ...).
    Errored { message: String },
}

impl Verdict {
    pub fn fail(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Verdict::Fail {
            expected: Some(expected.into()),
            actual: Some(actual.into()),
        }
    }

    /// `Pass` if `passed`, otherwise `Fail` with the given diagnostics.
    pub fn check(passed: bool, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        if passed {
            Verdict::Pass
        } else {
            Verdict::fail(expected, actual)
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Unexpected faults raised out of a case procedure.
#[derive(Debug, Error)]
pub enum CaseError {
    /// Creating or writing a fixture file failed.
    #[error("fixture error: {0}")]
    Fixture(#[from] std::io::Error),
    /// A case built a regex that does not compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Why a run cannot start at all.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Nothing exists at the target path.
    #[error("target executable not found at {}", .0.display())]
    Missing(PathBuf),
    /// The target path exists but is a directory or other non-file.
    #[error("target path is not a file: {}", .0.display())]
    NotAFile(PathBuf),
}

/// The program under test and the conventions it follows.
#[derive(Debug, Clone)]
pub struct Target {
    pub program: PathBuf,
    /// Extra arguments passed on every spawn (normally none).
    pub args: Vec<String>,
    pub prompt: String,
    pub shutdown: String,
    pub shutdown_kill: String,
    pub timeout: Duration,
}

impl Target {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            prompt: DEFAULT_PROMPT.to_string(),
            shutdown: DEFAULT_SHUTDOWN.to_string(),
            shutdown_kill: DEFAULT_SHUTDOWN_KILL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a target for `program` using the conventions in `config`.
    pub fn from_config(program: impl Into<PathBuf>, config: &HarnessConfig) -> Self {
        Self {
            program: program.into(),
            args: config.args.clone(),
            prompt: config.prompt.clone(),
            shutdown: config.shutdown.clone(),
            shutdown_kill: config.shutdown_kill.clone(),
            timeout: Duration::from_secs(config.timeout),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Check that the executable is present before anything runs.
    pub fn verify(&self) -> Result<(), SetupError> {
        if !self.program.exists() {
            return Err(SetupError::Missing(self.program.clone()));
        }
        if !self.program.is_file() {
            return Err(SetupError::NotAFile(self.program.clone()));
        }
        Ok(())
    }

    /// Start describing a session that sends `commands`.
    pub fn send<I, S>(&self, commands: I) -> Interaction<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Interaction {
            target: self,
            commands: commands.into_iter().map(Into::into).collect(),
            kill_on_quit: false,
            deadline: self.timeout,
        }
    }
}

/// One planned session with the target.
#[derive(Debug)]
pub struct Interaction<'a> {
    target: &'a Target,
    commands: Vec<String>,
    kill_on_quit: bool,
    deadline: Duration,
}

impl Interaction<'_> {
    /// End the session with the shutdown-with-kill directive.
    pub fn kill_on_quit(mut self) -> Self {
        self.kill_on_quit = true;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn script(&self) -> CommandScript {
        let shutdown = if self.kill_on_quit {
            &self.target.shutdown_kill
        } else {
            &self.target.shutdown
        };
        CommandScript::new(self.commands.iter().cloned(), shutdown)
    }

    pub fn run(&self) -> ExecutionOutcome {
        capture(
            &self.target.program,
            &self.target.args,
            &self.script(),
            self.deadline,
        )
    }

    /// Run the session and apply `check` if it completed.
    pub fn check<F>(&self, check: F) -> Verdict
    where
        F: FnOnce(&Transcript) -> Verdict,
    {
        self.run().into_verdict(check)
    }
}

/// A uniquely named temporary file, removed when dropped.
///
/// Removal therefore happens on every exit path of a case, including a
/// failed assertion or a panic.
#[derive(Debug)]
pub struct Fixture {
    file: NamedTempFile,
}

impl Fixture {
    pub fn with_contents(contents: &str) -> Result<Self, CaseError> {
        let mut file = tempfile::Builder::new()
            .prefix("shellprobe-")
            .suffix(".txt")
            .tempfile()?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn empty() -> Result<Self, CaseError> {
        Self::with_contents("")
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The path as it is written on a command line.
    pub fn arg(&self) -> String {
        self.path().display().to_string()
    }
}

/// A case procedure: runs one or more sessions and returns its verdict.
pub type Procedure = fn(&Target) -> Result<Verdict, CaseError>;

#[derive(Clone, Copy)]
pub struct TestCase {
    pub name: &'static str,
    pub procedure: Procedure,
}

impl TestCase {
    pub const fn new(name: &'static str, procedure: Procedure) -> Self {
        Self { name, procedure }
    }
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate test case {case:?} in category {category:?}")]
    DuplicateCase { category: String, case: String },
}

/// A named, ordered group of test cases.
#[derive(Debug, Clone)]
pub struct Category {
    name: String,
    cases: Vec<TestCase>,
}

impl Category {
    /// Case names must be unique within a category.
    pub fn new(name: impl Into<String>, cases: Vec<TestCase>) -> Result<Self, CatalogError> {
        let name = name.into();
        let mut seen = HashSet::new();
        for case in &cases {
            if !seen.insert(case.name) {
                return Err(CatalogError::DuplicateCase {
                    category: name,
                    case: case.name.to_string(),
                });
            }
        }
        Ok(Self { name, cases })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }
}
