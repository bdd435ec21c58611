use crate::error::ErrorKind;
use serde::Deserialize;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum AurHelper {
    Yay,
    Paru,
}

impl AurHelper {
    pub fn name(self) -> &'static str {
        match self {
            AurHelper::Yay => "yay",
            AurHelper::Paru => "paru",
        }
    }

    /// Prebuilt paru avoids compiling a Rust toolchain inside the target.
    pub fn repository(self) -> &'static str {
        match self {
            AurHelper::Yay => "https://aur.archlinux.org/yay-bin.git",
            AurHelper::Paru => "https://aur.archlinux.org/paru-bin.git",
        }
    }

    /// Installs packages without asking anything.
    pub fn install_command(self) -> Vec<&'static str> {
        match self {
            AurHelper::Yay => vec![
                "yay",
                "-S",
                "--needed",
                "--noconfirm",
                "--answerdiff",
                "None",
                "--answerclean",
                "None",
                "--removemake",
            ],
            AurHelper::Paru => vec![
                "paru",
                "-S",
                "--needed",
                "--noconfirm",
                "--skipreview",
                "--removemake",
            ],
        }
    }
}

impl FromStr for AurHelper {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yay" => Ok(AurHelper::Yay),
            "paru" => Ok(AurHelper::Paru),
            _ => Err(ErrorKind::InvalidConfig(format!(
                "unsupported AUR helper {:?}",
                s
            ))),
        }
    }
}

impl TryFrom<String> for AurHelper {
    type Error = ErrorKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for AurHelper {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
