use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "archstrap", about = "Unattended Arch Linux installer")]
pub struct App {
    /// Verbose output
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,

    /// Also write a debug log to this file
    #[structopt(long = "log-file", parse(from_os_str), value_name = "path")]
    pub log_file: Option<PathBuf>,

    #[structopt(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(StructOpt)]
pub enum Command {
    #[structopt(name = "install", about = "Install Arch Linux to a disk (default)")]
    Install(InstallCommand),

    #[structopt(name = "plan", about = "Print the commands an install would run")]
    Plan(PlanCommand),
}

impl Default for Command {
    fn default() -> Self {
        Command::Install(InstallCommand::default())
    }
}

#[derive(StructOpt, Default)]
pub struct InstallCommand {
    /// Path to a TOML configuration file
    #[structopt(short = "c", long = "config", parse(from_os_str), value_name = "path")]
    pub config: Option<PathBuf>,

    /// Target disk name, such as vda or nvme0n1. Asked for when missing
    #[structopt(short = "d", long = "disk", value_name = "name")]
    pub disk: Option<String>,

    /// Log the commands instead of running them
    #[structopt(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(StructOpt)]
pub struct PlanCommand {
    /// Path to a TOML configuration file
    #[structopt(short = "c", long = "config", parse(from_os_str), value_name = "path")]
    pub config: Option<PathBuf>,

    /// Target disk name, such as vda or nvme0n1
    #[structopt(short = "d", long = "disk", value_name = "name")]
    pub disk: String,

    /// Plan for a BIOS machine regardless of how this one booted
    #[structopt(long = "bios")]
    pub bios: bool,
}
