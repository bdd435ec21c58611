use crate::error::ErrorKind;
use crate::process::{Invocation, Runner};
use anyhow::Context;
use log::info;
use std::path::Path;

const HEADER: &str = "# Generated by archstrap from genfstab -U\n";

/// Regenerates `<mount_point>/etc/fstab` from what is mounted below
/// `mount_point`. The file is replaced, so running it twice is harmless.
pub fn generate(runner: &dyn Runner, mount_point: &Path) -> anyhow::Result<()> {
    info!("Generating fstab");
    let table = runner
        .output(&Invocation::new("genfstab").arg("-U").arg(mount_point))
        .context(ErrorKind::Fstab)?;

    runner
        .write_file(&mount_point.join("etc/fstab"), &render(&table), None)
        .context(ErrorKind::Fstab)?;

    Ok(())
}

fn render(table: &str) -> String {
    let mut contents = String::from(HEADER);
    contents.push_str(table.trim_end());
    contents.push('\n');
    contents
}
