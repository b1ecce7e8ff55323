//! Shared fixtures for the workspace-level specs: a disposable `$HOME` per
//! test plus a small builder DSL over `assert_cmd` in the shape the specs
//! below actually use (`cli().args(..).env_home(&project).passes().stdout_has(..)`).

use assert_cmd::Command;
use std::path::PathBuf;

/// An isolated home/cache directory for one test. `crew` resolves all of its
/// persisted state (runs, sessions, traces, agent stats) under `$HOME`, so
/// giving each test its own keeps them from tripping over each other's state.
pub struct Project {
    home: tempfile::TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Project { home: tempfile::tempdir().expect("create temp home") }
    }

    pub fn home_path(&self) -> &std::path::Path {
        self.home.path()
    }

    /// Writes a file relative to the project's workspace directory, creating
    /// parent directories as needed.
    pub fn file(&self, relative_path: &str, contents: &str) -> PathBuf {
        let path = self.home.path().join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }
}

pub struct CliBuilder {
    cmd: Command,
    home: Option<PathBuf>,
}

pub fn cli() -> CliBuilder {
    CliBuilder { cmd: Command::cargo_bin("crew").expect("find crew binary"), home: None }
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    /// Points `$HOME` (and so every `crew`-persisted path) at the given project.
    pub fn env_home(mut self, project: &Project) -> Self {
        self.cmd.env("HOME", project.home_path());
        self.home = Some(project.home_path().to_path_buf());
        self
    }

    pub fn passes(mut self) -> Assertion {
        let output = self.cmd.output().expect("run crew");
        assert!(
            output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        Assertion { output }
    }

    pub fn fails_with_code(mut self, code: i32) -> Assertion {
        let output = self.cmd.output().expect("run crew");
        assert_eq!(output.status.code(), Some(code), "unexpected exit code");
        Assertion { output }
    }
}

pub struct Assertion {
    output: std::process::Output,
}

impl Assertion {
    pub fn stdout_has(self, needle: &str) -> Self {
        let stdout = String::from_utf8_lossy(&self.output.stdout);
        assert!(stdout.contains(needle), "stdout did not contain {needle:?}:\n{stdout}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let stderr = String::from_utf8_lossy(&self.output.stderr);
        assert!(stderr.contains(needle), "stderr did not contain {needle:?}:\n{stderr}");
        self
    }
}
