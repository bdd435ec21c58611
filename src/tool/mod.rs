mod chroot;
mod mount;

use crate::error::ErrorKind;
use anyhow::Context;
pub use chroot::Chroot;
pub use mount::mount;

use std::path::PathBuf;
use std::process::Command;
use which::which;

#[derive(Debug)]
pub struct Tool {
    exec: PathBuf,
}

impl Tool {
    pub fn find(name: &str) -> anyhow::Result<Self> {
        Ok(Self {
            exec: which(name).context(ErrorKind::NoTool(name.to_string()))?,
        })
    }

    pub fn execute(&self) -> Command {
        Command::new(&self.exec)
    }
}

/// Host programs a run needs, given the root filesystem it will create.
pub fn required_tools(root_mkfs: &'static str) -> Vec<&'static str> {
    vec![
        "ping",
        "parted",
        "partprobe",
        "udevadm",
        "mkfs.fat",
        root_mkfs,
        "mkdir",
        "mount",
        "umount",
        "pacstrap",
        "genfstab",
        "arch-chroot",
        "sync",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_classified() {
        let error = Tool::find("archstrap-no-such-tool").unwrap_err();
        assert_eq!(
            crate::error::kind_of(&error),
            Some(&ErrorKind::NoTool("archstrap-no-such-tool".into()))
        );
    }

    #[test]
    fn required_tools_include_root_mkfs() {
        let tools = required_tools("mkfs.btrfs");
        assert!(tools.contains(&"mkfs.btrfs"));
        assert!(tools.contains(&"arch-chroot"));
        assert!(tools.contains(&"partprobe"));
        assert!(tools.contains(&"udevadm"));
    }
}
