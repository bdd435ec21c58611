use super::disk::Disk;
use super::filesystem::FilesystemType;
use super::markers::BlockDevice;
use super::partition::Partition;
use crate::constants::ESP_PARTITION_INDEX;
use crate::preflight::BootMode;
use crate::process::Invocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionTable {
    Gpt,
    Msdos,
}

impl PartitionTable {
    fn label(self) -> &'static str {
        match self {
            PartitionTable::Gpt => "gpt",
            PartitionTable::Msdos => "msdos",
        }
    }
}

/// UEFI: GPT with an ESP in front of the root partition.
/// BIOS: msdos label with a single bootable root partition.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    disk: Disk,
    table: PartitionTable,
    esp: Option<Partition>,
    root: Partition,
    root_fs: FilesystemType,
    esp_mib: u64,
}

impl PartitionLayout {
    pub fn for_mode(disk: Disk, boot_mode: BootMode, root_fs: FilesystemType, esp_mib: u64) -> Self {
        match boot_mode {
            BootMode::Uefi => Self {
                table: PartitionTable::Gpt,
                esp: Some(disk.partition(ESP_PARTITION_INDEX)),
                root: disk.partition(ESP_PARTITION_INDEX + 1),
                disk,
                root_fs,
                esp_mib,
            },
            BootMode::Bios => Self {
                table: PartitionTable::Msdos,
                esp: None,
                root: disk.partition(1),
                disk,
                root_fs,
                esp_mib,
            },
        }
    }

    pub fn disk(&self) -> &Disk {
        &self.disk
    }

    pub fn table(&self) -> PartitionTable {
        self.table
    }

    pub fn esp(&self) -> Option<&Partition> {
        self.esp.as_ref()
    }

    pub fn root(&self) -> &Partition {
        &self.root
    }

    pub fn root_fs(&self) -> FilesystemType {
        self.root_fs
    }

    fn parted(&self) -> Invocation {
        Invocation::new("parted").arg("-s").arg(self.disk.path())
    }

    /// The `parted` invocations that lay the table out, in order.
    pub fn partition_commands(&self) -> Vec<Invocation> {
        let mut commands = vec![self.parted().args(&["mklabel", self.table.label()])];

        match &self.esp {
            Some(esp) => {
                let esp_end = format!("{}MiB", 1 + self.esp_mib);
                let esp_index = esp.index().to_string();
                commands.push(self.parted().args(&[
                    "mkpart",
                    "ESP",
                    FilesystemType::Vfat.to_parted_type(),
                    "1MiB",
                    esp_end.as_str(),
                ]));
                commands.push(self.parted().args(&["set", esp_index.as_str(), "esp", "on"]));
                commands.push(self.parted().args(&[
                    "mkpart",
                    "root",
                    self.root_fs.to_parted_type(),
                    esp_end.as_str(),
                    "100%",
                ]));
            }
            None => {
                let root_index = self.root.index().to_string();
                commands.push(self.parted().args(&[
                    "mkpart",
                    "primary",
                    self.root_fs.to_parted_type(),
                    "1MiB",
                    "100%",
                ]));
                commands.push(self.parted().args(&["set", root_index.as_str(), "boot", "on"]));
            }
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preflight::StaticHost;
    use std::path::Path;

    fn layout(name: &str, boot_mode: BootMode) -> PartitionLayout {
        let disk = Disk::select(Path::new("/dev"), name, &StaticHost::for_mode(boot_mode)).unwrap();
        PartitionLayout::for_mode(disk, boot_mode, FilesystemType::Ext4, 512)
    }

    fn lines(commands: Vec<Invocation>) -> Vec<String> {
        commands.iter().map(Invocation::command_line).collect()
    }

    #[test]
    fn uefi_layout_has_esp_then_root() {
        let layout = layout("vda", BootMode::Uefi);

        assert_eq!(layout.table(), PartitionTable::Gpt);
        assert_eq!(layout.esp().unwrap().path(), Path::new("/dev/vda1"));
        assert_eq!(layout.root().path(), Path::new("/dev/vda2"));
        assert_eq!(
            lines(layout.partition_commands()),
            vec![
                "parted -s /dev/vda mklabel gpt",
                "parted -s /dev/vda mkpart ESP fat32 1MiB 513MiB",
                "parted -s /dev/vda set 1 esp on",
                "parted -s /dev/vda mkpart root ext4 513MiB 100%",
            ]
        );
    }

    #[test]
    fn bios_layout_is_a_single_bootable_partition() {
        let layout = layout("vda", BootMode::Bios);

        assert_eq!(layout.table(), PartitionTable::Msdos);
        assert!(layout.esp().is_none());
        assert_eq!(layout.root().path(), Path::new("/dev/vda1"));
        assert_eq!(
            lines(layout.partition_commands()),
            vec![
                "parted -s /dev/vda mklabel msdos",
                "parted -s /dev/vda mkpart primary ext4 1MiB 100%",
                "parted -s /dev/vda set 1 boot on",
            ]
        );
    }

    #[test]
    fn nvme_partitions_are_separated() {
        let layout = layout("nvme0n1", BootMode::Uefi);

        assert_eq!(layout.esp().unwrap().path(), Path::new("/dev/nvme0n1p1"));
        assert_eq!(layout.root().path(), Path::new("/dev/nvme0n1p2"));
    }
}
