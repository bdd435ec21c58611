mod args;
mod aur;
mod config;
mod configure;
mod constants;
mod error;
mod fstab;
mod installer;
mod preflight;
mod process;
mod prompt;
mod steps;
mod storage;
mod tool;
mod ui;

use args::{App, Command, InstallCommand, PlanCommand};
use config::InstallConfig;
use error::{kind_of, ErrorKind};
use installer::InstallOptions;
use log::{error, warn};
use preflight::{BootMode, LiveHost, StaticHost};
use process::{DryRunRunner, Runner, SystemRunner};
use prompt::{ScriptedPrompter, TerminalPrompter};
use simplelog::*;
use std::fs::File;
use std::path::Path;
use std::process::exit;
use structopt::StructOpt;

fn install(command: InstallCommand) -> anyhow::Result<()> {
    let config = InstallConfig::load(command.config.as_deref())?;
    let runner: &dyn Runner = if command.dry_run {
        &DryRunRunner
    } else {
        &SystemRunner
    };
    let options = InstallOptions {
        disk: command.disk,
        dry_run: command.dry_run,
    };

    installer::install(
        runner,
        &LiveHost::new(),
        &mut TerminalPrompter::stdio(),
        &config,
        &options,
    )
}

fn plan(command: PlanCommand) -> anyhow::Result<()> {
    let config = InstallConfig::load(command.config.as_deref())?.with_placeholder_secrets();
    let boot_mode = if command.bios {
        BootMode::Bios
    } else {
        BootMode::detect(&LiveHost::new())
    };
    let options = InstallOptions {
        disk: Some(command.disk),
        dry_run: true,
    };

    installer::install(
        &DryRunRunner,
        &StaticHost::for_mode(boot_mode),
        &mut ScriptedPrompter::new(vec!["y", "n"]),
        &config,
        &options,
    )
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        let file = File::create(path)?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), file));
    }

    CombinedLogger::init(loggers)?;
    Ok(())
}

fn main() {
    let app = App::from_args();

    if let Err(error) = init_logging(app.verbose, app.log_file.as_deref()) {
        ui::error(&format!("Cannot set up logging: {}", error));
        exit(1);
    }

    let result = match app.cmd.unwrap_or_default() {
        Command::Install(command) => install(command),
        Command::Plan(command) => plan(command),
    };

    match result {
        Ok(()) => {
            exit(0);
        }
        Err(error) => {
            if kind_of(&error) == Some(&ErrorKind::Declined) {
                warn!("Installation aborted");
                exit(1);
            }

            ui::error(&error.to_string());
            for cause in error.chain().skip(1) {
                error!("  {}", cause);
            }
            exit(1);
        }
    }
}
