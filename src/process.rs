use crate::tool::Tool;
use anyhow::Context;
use log::{debug, error, info};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::str;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("`{command}` failed: {status}")]
    BadExitCode { command: String, status: ExitStatus },

    #[error("Process output isn't valid UTF-8")]
    InvalidUtf8,
}

pub trait CommandExt {
    fn run(&mut self, stdin: Option<&str>) -> anyhow::Result<()>;
    fn run_text_output(&mut self) -> anyhow::Result<String>;
}

impl CommandExt for Command {
    fn run(&mut self, stdin: Option<&str>) -> anyhow::Result<()> {
        let description = format!("{:?}", self);
        let (exit_status, written) = match stdin {
            Some(data) => {
                let mut child = self
                    .stdin(Stdio::piped())
                    .spawn()
                    .with_context(|| format!("Cannot spawn {}", description))?;
                // Reaped even when it stopped reading early.
                let written = child
                    .stdin
                    .take()
                    .map_or(Ok(()), |mut pipe| pipe.write_all(data.as_bytes()));
                (child.wait()?, written)
            }
            None => (
                self.stdin(Stdio::null())
                    .spawn()
                    .with_context(|| format!("Cannot spawn {}", description))?
                    .wait()?,
                Ok(()),
            ),
        };

        if !exit_status.success() {
            return Err(ProcessError::BadExitCode {
                command: description,
                status: exit_status,
            }
            .into());
        }
        written.with_context(|| format!("Cannot write to {}", description))?;

        Ok(())
    }

    fn run_text_output(&mut self) -> anyhow::Result<String> {
        let description = format!("{:?}", self);
        let output = self
            .output()
            .with_context(|| format!("Cannot spawn {}", description))?;

        if !output.status.success() {
            let stderr = str::from_utf8(&output.stderr).unwrap_or("[INVALID UTF8]");
            error!("{}", stderr);
            return Err(ProcessError::BadExitCode {
                command: description,
                status: output.status,
            }
            .into());
        }

        Ok(String::from(
            str::from_utf8(&output.stdout).map_err(|_| ProcessError::InvalidUtf8)?,
        ))
    }
}

/// A single external command, described independently of how it gets run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<OsString>,
    stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Data fed to the process on stdin. Never logged.
    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn stdin_data(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    /// Shell-like rendering used for logs and assertions.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push('\'');
                line.push_str(&arg);
                line.push('\'');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Executes invocations and writes files on behalf of the installer.
pub trait Runner {
    fn run(&self, invocation: &Invocation) -> anyhow::Result<()>;
    fn output(&self, invocation: &Invocation) -> anyhow::Result<String>;
    fn write_file(&self, path: &Path, contents: &str, mode: Option<u32>) -> anyhow::Result<()>;
}

/// Spawns real processes and blocks until they finish.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(invocation: &Invocation) -> anyhow::Result<Command> {
        let mut command = Tool::find(invocation.program())?.execute();
        command.args(&invocation.args);
        Ok(command)
    }
}

impl Runner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> anyhow::Result<()> {
        debug!("Running {}", invocation);
        Self::command(invocation)?.run(invocation.stdin_data())
    }

    fn output(&self, invocation: &Invocation) -> anyhow::Result<String> {
        debug!("Running {} (capturing output)", invocation);
        Self::command(invocation)?.run_text_output()
    }

    fn write_file(&self, path: &Path, contents: &str, mode: Option<u32>) -> anyhow::Result<()> {
        debug!("Writing {}", path.display());
        fs::write(path, contents).with_context(|| format!("Cannot write {}", path.display()))?;
        if let Some(mode) = mode {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
                .with_context(|| format!("Cannot set permissions of {}", path.display()))?;
        }
        Ok(())
    }
}

/// Logs what would happen and touches nothing.
#[derive(Debug, Default)]
pub struct DryRunRunner;

impl Runner for DryRunRunner {
    fn run(&self, invocation: &Invocation) -> anyhow::Result<()> {
        info!("[dry-run] {}", invocation);
        Ok(())
    }

    fn output(&self, invocation: &Invocation) -> anyhow::Result<String> {
        info!("[dry-run] {}", invocation);
        Ok(String::new())
    }

    fn write_file(&self, path: &Path, _contents: &str, mode: Option<u32>) -> anyhow::Result<()> {
        match mode {
            Some(mode) => info!("[dry-run] write {} (mode {:o})", path.display(), mode),
            None => info!("[dry-run] write {}", path.display()),
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::os::unix::process::ExitStatusExt;
    use std::path::PathBuf;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Run(String),
        Output(String),
        Write(PathBuf),
    }

    #[derive(Debug, Clone)]
    pub struct Written {
        pub path: PathBuf,
        pub contents: String,
        pub mode: Option<u32>,
    }

    /// Records every call and fails each command containing the needle.
    #[derive(Debug, Default)]
    pub struct RecordingRunner {
        calls: RefCell<Vec<Call>>,
        written: RefCell<Vec<Written>>,
        stdin: RefCell<Vec<(String, String)>>,
        outputs: Vec<(String, String)>,
        fail_on: Option<String>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(needle: &str) -> Self {
            Self {
                fail_on: Some(needle.to_string()),
                ..Self::default()
            }
        }

        pub fn with_output(mut self, needle: &str, output: &str) -> Self {
            self.outputs.push((needle.to_string(), output.to_string()));
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        /// Command lines of every run or captured invocation, in order.
        pub fn commands(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|call| match call {
                    Call::Run(line) | Call::Output(line) => Some(line.clone()),
                    Call::Write(_) => None,
                })
                .collect()
        }

        pub fn ran(&self, needle: &str) -> bool {
            self.commands().iter().any(|line| line.contains(needle))
        }

        pub fn written(&self, path: &str) -> Option<Written> {
            self.written
                .borrow()
                .iter()
                .rev()
                .find(|w| w.path == Path::new(path))
                .cloned()
        }

        pub fn stdin_of(&self, needle: &str) -> Option<String> {
            self.stdin
                .borrow()
                .iter()
                .find(|(line, _)| line.contains(needle))
                .map(|(_, data)| data.clone())
        }

        pub fn stdin_all(&self, needle: &str) -> Vec<String> {
            self.stdin
                .borrow()
                .iter()
                .filter(|(line, _)| line.contains(needle))
                .map(|(_, data)| data.clone())
                .collect()
        }

        fn check(&self, line: &str) -> anyhow::Result<()> {
            match &self.fail_on {
                Some(needle) if line.contains(needle.as_str()) => {
                    Err(ProcessError::BadExitCode {
                        command: line.to_string(),
                        status: ExitStatus::from_raw(1 << 8),
                    }
                    .into())
                }
                _ => Ok(()),
            }
        }

        fn record_stdin(&self, invocation: &Invocation) {
            if let Some(data) = invocation.stdin_data() {
                self.stdin
                    .borrow_mut()
                    .push((invocation.command_line(), data.to_string()));
            }
        }
    }

    impl Runner for RecordingRunner {
        fn run(&self, invocation: &Invocation) -> anyhow::Result<()> {
            let line = invocation.command_line();
            self.calls.borrow_mut().push(Call::Run(line.clone()));
            self.record_stdin(invocation);
            self.check(&line)
        }

        fn output(&self, invocation: &Invocation) -> anyhow::Result<String> {
            let line = invocation.command_line();
            self.calls.borrow_mut().push(Call::Output(line.clone()));
            self.check(&line)?;
            Ok(self
                .outputs
                .iter()
                .find(|(needle, _)| line.contains(needle.as_str()))
                .map(|(_, output)| output.clone())
                .unwrap_or_default())
        }

        fn write_file(&self, path: &Path, contents: &str, mode: Option<u32>) -> anyhow::Result<()> {
            self.calls
                .borrow_mut()
                .push(Call::Write(path.to_path_buf()));
            self.written.borrow_mut().push(Written {
                path: path.to_path_buf(),
                contents: contents.to_string(),
                mode,
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn command_line_quotes_whitespace() {
        let invocation = Invocation::new("bash")
            .arg("-c")
            .arg("cd /tmp && makepkg -si")
            .arg("");

        assert_eq!(
            invocation.command_line(),
            "bash -c 'cd /tmp && makepkg -si' ''"
        );
    }

    #[test]
    fn stdin_is_not_rendered() {
        let invocation = Invocation::new("chpasswd").stdin("root:secret\n");

        assert_eq!(invocation.to_string(), "chpasswd");
        assert_eq!(invocation.stdin_data(), Some("root:secret\n"));
    }

    #[test]
    fn system_runner_reports_exit_code() {
        let error = SystemRunner.run(&Invocation::new("false")).unwrap_err();
        assert!(error.downcast_ref::<ProcessError>().is_some());
    }

    #[test]
    fn exit_code_wins_over_a_closed_stdin() {
        let payload = "x".repeat(1 << 20);
        let error = SystemRunner
            .run(&Invocation::new("false").stdin(payload))
            .unwrap_err();

        match error.downcast_ref::<ProcessError>() {
            Some(ProcessError::BadExitCode { status, .. }) => assert_eq!(status.code(), Some(1)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn system_runner_feeds_stdin() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out");
        SystemRunner
            .run(
                &Invocation::new("tee")
                    .arg(&target)
                    .stdin("hello\n"),
            )
            .unwrap();

        assert_eq!(fs::read_to_string(target).unwrap(), "hello\n");
    }

    #[test]
    fn system_runner_captures_output() {
        let output = SystemRunner
            .output(&Invocation::new("echo").arg("vda"))
            .unwrap();
        assert_eq!(output, "vda\n");
    }

    #[test]
    fn write_file_replaces_and_sets_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sudoers");

        SystemRunner.write_file(&path, "first\n", None).unwrap();
        SystemRunner.write_file(&path, "second\n", Some(0o440)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o440);
    }

    #[test]
    fn recording_runner_fails_on_needle() {
        let runner = mock::RecordingRunner::failing_on("grub-install");

        assert!(runner.run(&Invocation::new("pacman").arg("-S")).is_ok());
        assert!(runner
            .run(&Invocation::new("grub-install").arg("/dev/vda"))
            .is_err());
        assert_eq!(runner.commands(), vec!["pacman -S", "grub-install /dev/vda"]);
    }
}
