mod disk;
mod filesystem;
mod layout;
mod markers;
mod mount_stack;
mod partition;

pub use disk::{DeviceFamily, Disk};
pub use filesystem::{Filesystem, FilesystemType};
pub use layout::{PartitionLayout, PartitionTable};
pub use markers::BlockDevice;
pub use mount_stack::MountStack;
pub use partition::Partition;
