use crate::error::ErrorKind;
use crate::process::{Invocation, Runner};
use crate::storage::{BlockDevice, Filesystem, MountStack};
use anyhow::Context;
use log::{debug, info};
use std::path::Path;

/// Mounts the root filesystem at `mount_path` and, when there is one, the
/// ESP at `esp_path` below it.
pub fn mount(
    runner: &dyn Runner,
    mount_stack: &mut MountStack,
    mount_path: &Path,
    root_filesystem: &Filesystem,
    esp: Option<(&Filesystem, &Path)>,
) -> anyhow::Result<()> {
    debug!(
        "Root partition: {}",
        root_filesystem.block().path().display()
    );

    info!("Mounting filesystems to {}", mount_path.display());
    mount_stack
        .mount(root_filesystem, mount_path.into())
        .context(ErrorKind::Mounting)?;

    if let Some((esp_filesystem, esp_path)) = esp {
        runner
            .run(&Invocation::new("mkdir").arg("-p").arg(esp_path))
            .context(ErrorKind::Mounting)?;

        mount_stack
            .mount(esp_filesystem, esp_path.into())
            .context(ErrorKind::Mounting)?;
    }

    Ok(())
}
