use crate::process::{Invocation, Runner};
use std::path::{Path, PathBuf};

/// Runs commands inside the installed tree through `arch-chroot`.
/// Every call returns its own result; nothing is inherited between calls.
pub struct Chroot<'r> {
    runner: &'r dyn Runner,
    root: PathBuf,
}

impl<'r> Chroot<'r> {
    pub fn new(runner: &'r dyn Runner, root: &Path) -> Self {
        Self {
            runner,
            root: root.to_path_buf(),
        }
    }

    fn invocation(&self, args: &[&str]) -> Invocation {
        Invocation::new("arch-chroot").arg(&self.root).args(args)
    }

    pub fn run(&self, args: &[&str]) -> anyhow::Result<()> {
        self.runner.run(&self.invocation(args))
    }

    pub fn run_with_stdin(&self, args: &[&str], stdin: &str) -> anyhow::Result<()> {
        self.runner.run(&self.invocation(args).stdin(stdin))
    }

    pub fn run_as(&self, user: &str, args: &[&str]) -> anyhow::Result<()> {
        let mut full = vec!["sudo", "-H", "-u", user];
        full.extend_from_slice(args);
        self.run(&full)
    }

    pub fn run_shell_as(&self, user: &str, script: &str) -> anyhow::Result<()> {
        self.run_as(user, &["bash", "-c", script])
    }

    /// Writes `path` (absolute inside the target) from the host side.
    pub fn write(&self, path: &str, contents: &str, mode: Option<u32>) -> anyhow::Result<()> {
        self.runner
            .write_file(&self.host_path(path), contents, mode)
    }

    pub fn host_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}
