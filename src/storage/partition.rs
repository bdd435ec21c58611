use super::markers::BlockDevice;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    index: u8,
    path: PathBuf,
}

impl Partition {
    pub fn new(index: u8, path: PathBuf) -> Self {
        Self { index, path }
    }

    pub fn index(&self) -> u8 {
        self.index
    }
}

impl BlockDevice for Partition {
    fn path(&self) -> &Path {
        &self.path
    }
}
