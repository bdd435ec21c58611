use crate::constants::EFI_VARS_PATH;
use crate::error::ErrorKind;
use crate::process::{Invocation, Runner};
use log::{debug, info};
use std::fmt;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use which::which;

/// Facts about the machine the installer runs on.
pub trait Host {
    fn is_privileged(&self) -> bool;
    fn efi_variables_present(&self) -> bool;
    fn is_block_device(&self, path: &Path) -> bool;
    fn has_tool(&self, name: &str) -> bool;
}

#[derive(Debug)]
pub struct LiveHost {
    efivars: PathBuf,
}

impl LiveHost {
    pub fn new() -> Self {
        Self::with_efivars_path(EFI_VARS_PATH)
    }

    pub fn with_efivars_path(path: impl Into<PathBuf>) -> Self {
        Self {
            efivars: path.into(),
        }
    }
}

impl Host for LiveHost {
    fn is_privileged(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }

    fn efi_variables_present(&self) -> bool {
        self.efivars.is_dir()
    }

    fn is_block_device(&self, path: &Path) -> bool {
        path.metadata()
            .map(|m| m.file_type().is_block_device())
            .unwrap_or(false)
    }

    fn has_tool(&self, name: &str) -> bool {
        which(name).is_ok()
    }
}

/// A host whose answers are fixed up front. Backs `plan` and the tests.
#[derive(Debug, Clone)]
pub struct StaticHost {
    pub privileged: bool,
    pub efi: bool,
    pub block_devices: bool,
    pub tools: bool,
}

impl StaticHost {
    pub fn for_mode(boot_mode: BootMode) -> Self {
        Self {
            privileged: true,
            efi: boot_mode == BootMode::Uefi,
            block_devices: true,
            tools: true,
        }
    }
}

impl Host for StaticHost {
    fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn efi_variables_present(&self) -> bool {
        self.efi
    }

    fn is_block_device(&self, _path: &Path) -> bool {
        self.block_devices
    }

    fn has_tool(&self, _name: &str) -> bool {
        self.tools
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    Uefi,
    Bios,
}

impl BootMode {
    pub fn detect(host: &dyn Host) -> Self {
        if host.efi_variables_present() {
            BootMode::Uefi
        } else {
            BootMode::Bios
        }
    }
}

impl fmt::Display for BootMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            BootMode::Uefi => "UEFI",
            BootMode::Bios => "BIOS",
        })
    }
}

pub fn check_privilege(host: &dyn Host) -> anyhow::Result<()> {
    if !host.is_privileged() {
        return Err(ErrorKind::NotRoot.into());
    }
    debug!("Running with root privileges");
    Ok(())
}

pub fn check_network(runner: &dyn Runner, host: &str) -> anyhow::Result<()> {
    info!("Checking connectivity to {}", host);
    runner
        .run(
            &Invocation::new("ping")
                .args(&["-c", "1", "-W", "5"])
                .arg(host),
        )
        .map_err(|e| e.context(ErrorKind::NoNetwork(host.to_string())))
}

pub fn check_tools(host: &dyn Host, tools: &[&str]) -> anyhow::Result<()> {
    if let Some(missing) = tools.iter().find(|tool| !host.has_tool(tool)) {
        return Err(ErrorKind::NoTool(missing.to_string()).into());
    }
    debug!("All required tools found: {}", tools.join(", "));
    Ok(())
}
