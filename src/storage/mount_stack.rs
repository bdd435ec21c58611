use super::Filesystem;
use crate::error::ErrorKind;
use crate::process::{Invocation, Runner};
use log::{debug, warn};
use std::path::PathBuf;

/// Mounts made during a run; released in reverse order.
pub struct MountStack<'r> {
    runner: &'r dyn Runner,
    targets: Vec<PathBuf>,
}

impl<'r> MountStack<'r> {
    pub fn new(runner: &'r dyn Runner) -> Self {
        MountStack {
            runner,
            targets: Vec::new(),
        }
    }

    pub fn mount(&mut self, filesystem: &Filesystem, target: PathBuf) -> anyhow::Result<()> {
        let source = filesystem.block().path();
        debug!("Mounting {:?} to {:?}", filesystem, target);
        self.runner.run(
            &Invocation::new("mount")
                .arg("-t")
                .arg(filesystem.fs_type().to_mount_type())
                .arg(source)
                .arg(&target),
        )?;
        self.targets.push(target);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn umount(&mut self) -> anyhow::Result<()> {
        let mut result = Ok(());

        while let Some(target) = self.targets.pop() {
            debug!("Unmounting {}", target.display());
            if let Err(e) = self.runner.run(&Invocation::new("umount").arg(&target)) {
                warn!("Unable to umount {}: {}", target.display(), e);
                result = Err(e.context(ErrorKind::UmountFailure));
            };
        }

        result
    }
}

impl<'r> Drop for MountStack<'r> {
    fn drop(&mut self) {
        self.umount().ok();
    }
}
