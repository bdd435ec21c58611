use super::markers::BlockDevice;
use super::partition::Partition;
use crate::error::ErrorKind;
use crate::preflight::Host;
use anyhow::anyhow;
use log::debug;
use std::path::{Path, PathBuf};

/// How the kernel names partitions for a family of devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    /// `sda` -> `sda1`, `vda` -> `vda1`
    Plain,
    /// `nvme0n1` -> `nvme0n1p1`, `mmcblk0` -> `mmcblk0p1`, `loop0` -> `loop0p1`
    Separated,
}

impl DeviceFamily {
    pub fn of(name: &str) -> Self {
        match name.chars().last() {
            Some(c) if c.is_ascii_digit() => DeviceFamily::Separated,
            _ => DeviceFamily::Plain,
        }
    }

    pub fn partition_name(self, disk: &str, index: u8) -> String {
        match self {
            DeviceFamily::Plain => format!("{}{}", disk, index),
            DeviceFamily::Separated => format!("{}p{}", disk, index),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Disk {
    name: String,
    path: PathBuf,
    family: DeviceFamily,
}

impl Disk {
    /// Resolves an operator-supplied device name below `prefix`.
    /// The result must be an existing block device.
    pub fn select(prefix: &Path, suffix: &str, host: &dyn Host) -> anyhow::Result<Self> {
        let name = suffix.trim();
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(anyhow!("Invalid device name: {:?}", suffix)
                .context(ErrorKind::NoSuchDisk(suffix.to_string())));
        }

        let path = prefix.join(name);
        debug!("Selected disk path: {}", path.display());
        if !host.is_block_device(&path) {
            return Err(ErrorKind::NoSuchDisk(path.display().to_string()).into());
        }

        Ok(Self::new(prefix, name))
    }

    fn new(prefix: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: prefix.join(name),
            family: DeviceFamily::of(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn partition(&self, index: u8) -> Partition {
        let mut path = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        path.push(self.family.partition_name(&self.name, index));

        debug!("Partition {} for {} is {:?}", index, self.name, path);
        Partition::new(index, path)
    }
}

impl BlockDevice for Disk {
    fn path(&self) -> &Path {
        &self.path
    }
}
