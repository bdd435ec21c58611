use super::markers::BlockDevice;
use crate::error::ErrorKind;
use crate::process::{Invocation, Runner};
use anyhow::Context;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesystemType {
    Ext4,
    Btrfs,
    Vfat,
}

impl FilesystemType {
    pub fn to_mount_type(self) -> &'static str {
        match self {
            FilesystemType::Ext4 => "ext4",
            FilesystemType::Btrfs => "btrfs",
            FilesystemType::Vfat => "vfat",
        }
    }

    /// The file system type hint `parted mkpart` expects.
    pub fn to_parted_type(self) -> &'static str {
        match self {
            FilesystemType::Ext4 => "ext4",
            FilesystemType::Btrfs => "btrfs",
            FilesystemType::Vfat => "fat32",
        }
    }

    pub fn mkfs_tool(self) -> &'static str {
        match self {
            FilesystemType::Ext4 => "mkfs.ext4",
            FilesystemType::Btrfs => "mkfs.btrfs",
            FilesystemType::Vfat => "mkfs.fat",
        }
    }

    pub fn mkfs(self, block: &dyn BlockDevice) -> Invocation {
        let command = Invocation::new(self.mkfs_tool());
        match self {
            FilesystemType::Ext4 => command.arg("-F").arg(block.path()),
            FilesystemType::Btrfs => command.arg("-f").arg(block.path()),
            FilesystemType::Vfat => command.arg("-F32").arg(block.path()),
        }
    }
}

impl fmt::Display for FilesystemType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.to_mount_type())
    }
}

#[derive(Debug)]
pub struct Filesystem<'a> {
    fs_type: FilesystemType,
    block: &'a dyn BlockDevice,
}

impl<'a> Filesystem<'a> {
    pub fn format(
        runner: &dyn Runner,
        block: &'a dyn BlockDevice,
        fs_type: FilesystemType,
    ) -> anyhow::Result<Self> {
        runner
            .run(&fs_type.mkfs(block))
            .context(ErrorKind::Formatting)?;

        Ok(Self { fs_type, block })
    }

    pub fn from_partition(block: &'a dyn BlockDevice, fs_type: FilesystemType) -> Self {
        Self { fs_type, block }
    }

    pub fn block(&self) -> &dyn BlockDevice {
        self.block
    }

    pub fn fs_type(&self) -> FilesystemType {
        self.fs_type
    }
}
