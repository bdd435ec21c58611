use crate::aur::AurHelper;
use crate::constants::*;
use crate::error::ErrorKind;
use crate::storage::FilesystemType;
use anyhow::Context;
use byte_unit::Byte;
use log::debug;
use serde::Deserialize;
use std::convert::TryFrom;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const ROOT_PASSWORD_VAR: &str = "ARCHSTRAP_ROOT_PASSWORD";
pub const USER_PASSWORD_VAR: &str = "ARCHSTRAP_USER_PASSWORD";

const PLACEHOLDER_SECRET: &str = "<placeholder>";

/// A password. Never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Everything an installation is parameterised by.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallConfig {
    /// Static hostname, a single RFC 1123 label.
    pub hostname: String,
    /// Zone below `/usr/share/zoneinfo`, e.g. `Europe/Berlin`.
    pub timezone: String,
    /// Locale name as listed in `/etc/locale.gen`, e.g. `en_US.UTF-8`.
    pub locale: String,
    /// Console keymap written to `/etc/vconsole.conf`.
    pub keymap: String,
    /// Login of the administrative user.
    pub username: String,
    /// Root password. Overridden by `ARCHSTRAP_ROOT_PASSWORD`.
    pub root_password: Option<Secret>,
    /// Password of `username`. Overridden by `ARCHSTRAP_USER_PASSWORD`.
    pub user_password: Option<Secret>,
    /// Root file system, `ext4` or `btrfs`.
    pub filesystem: FilesystemType,
    /// Size of the EFI system partition, e.g. `512MiB`.
    pub esp_size: String,
    /// Where the new system is assembled.
    pub mount_point: PathBuf,
    /// Prepended to the disk name the operator types.
    pub device_prefix: PathBuf,
    /// Host pinged before anything is touched.
    pub connectivity_host: String,
    pub base_packages: Vec<String>,
    pub utility_packages: Vec<String>,
    pub desktop_packages: Vec<String>,
    pub display_manager: String,
    pub extra_packages: Vec<String>,
    pub aur_helper: AurHelper,
    pub aur_packages: Vec<String>,
    /// Login shell of the user.
    pub shell: String,
    /// Install oh-my-zsh for the user.
    pub shell_framework: bool,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.into(),
            timezone: DEFAULT_TIMEZONE.into(),
            locale: DEFAULT_LOCALE.into(),
            keymap: DEFAULT_KEYMAP.into(),
            username: DEFAULT_USERNAME.into(),
            root_password: None,
            user_password: None,
            filesystem: FilesystemType::Ext4,
            esp_size: DEFAULT_ESP_SIZE.into(),
            mount_point: PathBuf::from(MOUNT_POINT),
            device_prefix: PathBuf::from(DEVICE_PREFIX),
            connectivity_host: CONNECTIVITY_HOST.into(),
            base_packages: owned(&BASE_PACKAGES),
            utility_packages: owned(&UTILITY_PACKAGES),
            desktop_packages: owned(&DESKTOP_PACKAGES),
            display_manager: DEFAULT_DISPLAY_MANAGER.into(),
            extra_packages: owned(&EXTRA_PACKAGES),
            aur_helper: AurHelper::Yay,
            aur_packages: owned(&AUR_PACKAGES),
            shell: DEFAULT_SHELL.into(),
            shell_framework: true,
        }
    }
}

fn invalid(reason: String) -> anyhow::Error {
    ErrorKind::InvalidConfig(reason).into()
}

fn is_valid_hostname(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_valid_username(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_lowercase() || c == '_');

    first_ok
        && name.len() <= 32
        && name != "root"
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

fn is_valid_timezone(zone: &str) -> bool {
    !zone.is_empty()
        && !zone.starts_with('/')
        && zone.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
        && zone
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/_-+".contains(c))
}

fn is_plain_word(value: &str) -> bool {
    !value.is_empty() && !value.contains(char::is_whitespace) && !value.contains('/')
}

impl InstallConfig {
    /// Reads the TOML file if given, applies environment overrides and
    /// validates everything except the passwords.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                let data = fs::read_to_string(path)
                    .with_context(|| format!("Cannot read {}", path.display()))?;
                Self::from_toml(&data)
                    .with_context(|| format!("Cannot load {}", path.display()))?
            }
            None => Self::default(),
        };

        config.apply_environment(|name| env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(data: &str) -> anyhow::Result<Self> {
        toml::from_str(data).map_err(|e| invalid(e.to_string()))
    }

    pub fn apply_environment<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ROOT_PASSWORD_VAR) {
            self.root_password = Some(Secret::new(value));
        }
        if let Some(value) = lookup(USER_PASSWORD_VAR) {
            self.user_password = Some(Secret::new(value));
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !is_valid_hostname(&self.hostname) {
            return Err(invalid(format!("invalid hostname {:?}", self.hostname)));
        }
        if !is_valid_username(&self.username) {
            return Err(invalid(format!("invalid username {:?}", self.username)));
        }
        if !is_valid_timezone(&self.timezone) {
            return Err(invalid(format!("invalid timezone {:?}", self.timezone)));
        }
        if !is_plain_word(&self.locale) {
            return Err(invalid(format!("invalid locale {:?}", self.locale)));
        }
        if !is_plain_word(&self.keymap) {
            return Err(invalid(format!("invalid keymap {:?}", self.keymap)));
        }
        if self.filesystem == FilesystemType::Vfat {
            return Err(invalid("the root file system cannot be vfat".into()));
        }
        if !self.mount_point.is_absolute() || !self.device_prefix.is_absolute() {
            return Err(invalid(
                "mount_point and device_prefix must be absolute paths".into(),
            ));
        }
        if !Path::new(&self.shell).is_absolute() {
            return Err(invalid(format!("shell {:?} is not an absolute path", self.shell)));
        }
        if !is_plain_word(&self.display_manager) || !is_plain_word(&self.connectivity_host) {
            return Err(invalid("display_manager and connectivity_host must be single words".into()));
        }
        if self.base_packages.is_empty() {
            return Err(invalid("base_packages must not be empty".into()));
        }

        let packages = self
            .base_packages
            .iter()
            .chain(&self.utility_packages)
            .chain(&self.desktop_packages)
            .chain(&self.extra_packages)
            .chain(&self.aur_packages);
        for package in packages {
            if !is_plain_word(package) || package.starts_with('-') {
                return Err(invalid(format!("invalid package name {:?}", package)));
            }
        }

        self.esp_mib()?;
        Ok(())
    }

    /// Rejects missing, empty and well-known default passwords.
    pub fn validate_secrets(&self) -> anyhow::Result<()> {
        for (owner, secret) in &[
            ("root", &self.root_password),
            (self.username.as_str(), &self.user_password),
        ] {
            let value = match secret {
                Some(secret) => secret.expose(),
                None => {
                    return Err(invalid(format!(
                        "no password given for {} (set it in the configuration file or {})",
                        owner,
                        if *owner == "root" {
                            ROOT_PASSWORD_VAR
                        } else {
                            USER_PASSWORD_VAR
                        }
                    )))
                }
            };

            if value.trim().is_empty() {
                return Err(invalid(format!("the password for {} is empty", owner)));
            }
            if value.contains(|c: char| c == '\n' || c == ':') {
                return Err(invalid(format!(
                    "the password for {} contains a newline or a colon",
                    owner
                )));
            }
            if WEAK_PASSWORDS.contains(&value) || value == self.username || value == *owner {
                return Err(invalid(format!(
                    "the password for {} is a well-known default",
                    owner
                )));
            }
        }

        Ok(())
    }

    /// Fills in passwords that are missing so a plan can be rendered.
    pub fn with_placeholder_secrets(mut self) -> Self {
        if self.root_password.is_none() {
            self.root_password = Some(Secret::new(PLACEHOLDER_SECRET));
        }
        if self.user_password.is_none() {
            self.user_password = Some(Secret::new(PLACEHOLDER_SECRET));
        }
        self
    }

    pub fn root_password(&self) -> anyhow::Result<&str> {
        self.root_password
            .as_ref()
            .map(Secret::expose)
            .ok_or_else(|| invalid("no root password".into()))
    }

    pub fn user_password(&self) -> anyhow::Result<&str> {
        self.user_password
            .as_ref()
            .map(Secret::expose)
            .ok_or_else(|| invalid(format!("no password for {}", self.username)))
    }

    /// ESP size in whole MiB.
    pub fn esp_mib(&self) -> anyhow::Result<u64> {
        let bytes = Byte::from_str(&self.esp_size)
            .map_err(|_| invalid(format!("invalid esp_size {:?}", self.esp_size)))?;
        let bytes = u64::try_from(bytes.get_bytes())
            .map_err(|_| invalid(format!("esp_size {:?} is too large", self.esp_size)))?;

        let mib = bytes / (1024 * 1024);
        if mib < MIN_ESP_MIB {
            return Err(invalid(format!(
                "esp_size {:?} is below {} MiB",
                self.esp_size, MIN_ESP_MIB
            )));
        }
        Ok(mib)
    }

    pub fn esp_mount_point(&self) -> PathBuf {
        self.mount_point.join(ESP_MOUNT_SUBPATH)
    }
}
