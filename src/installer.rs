use crate::config::InstallConfig;
use crate::configure::{self, TargetContext};
use crate::constants::BTRFS_PACKAGE;
use crate::error::ErrorKind;
use crate::fstab;
use crate::preflight::{self, BootMode, Host};
use crate::process::{Invocation, Runner};
use crate::prompt::Prompter;
use crate::steps::{run_steps, Step};
use crate::storage::{BlockDevice, Disk, Filesystem, FilesystemType, MountStack, PartitionLayout};
use crate::tool::{self, Chroot};
use crate::ui;
use anyhow::Context;
use log::{debug, info, warn};

#[derive(Debug, Default, Clone)]
pub struct InstallOptions {
    /// Disk name below the device prefix; asked for when missing.
    pub disk: Option<String>,
    /// Nothing gets executed, so the privilege check is skipped.
    pub dry_run: bool,
}

struct InstallContext<'a> {
    runner: &'a dyn Runner,
    config: &'a InstallConfig,
    layout: &'a PartitionLayout,
    boot_mode: BootMode,
    mounts: MountStack<'a>,
}

fn install_steps<'a>() -> Vec<Step<InstallContext<'a>>> {
    vec![
        Step::new("partition", partition),
        Step::new("format", format),
        Step::new("mount", mount),
        Step::new("pacstrap", pacstrap),
        Step::new("fstab", generate_fstab),
        Step::new("configure", configure_target),
        Step::new("unmount", unmount),
    ]
}

fn partition(context: &mut InstallContext) -> anyhow::Result<()> {
    info!(
        "Partitioning {} ({:?})",
        context.layout.disk().path().display(),
        context.layout.table()
    );
    let disk = context.layout.disk();
    debug!("{} partitions are named as {:?}", disk.name(), disk.family());
    for command in context.layout.partition_commands() {
        context
            .runner
            .run(&command)
            .context(ErrorKind::Partitioning)?;
    }

    // The partition nodes must exist before anything is formatted.
    context
        .runner
        .run(&Invocation::new("partprobe").arg(disk.path()))
        .context(ErrorKind::Partitioning)?;
    context
        .runner
        .run(&Invocation::new("udevadm").arg("settle"))
        .context(ErrorKind::Partitioning)?;
    Ok(())
}

fn format(context: &mut InstallContext) -> anyhow::Result<()> {
    info!("Formatting filesystems");
    let layout = context.layout;
    if let Some(esp) = layout.esp() {
        Filesystem::format(context.runner, esp, FilesystemType::Vfat)?;
    }
    Filesystem::format(context.runner, layout.root(), layout.root_fs())?;
    Ok(())
}

fn mount(context: &mut InstallContext) -> anyhow::Result<()> {
    let layout = context.layout;
    let config = context.config;
    let root = Filesystem::from_partition(layout.root(), layout.root_fs());
    let esp = layout
        .esp()
        .map(|partition| Filesystem::from_partition(partition, FilesystemType::Vfat));
    let esp_path = config.esp_mount_point();

    tool::mount(
        context.runner,
        &mut context.mounts,
        &config.mount_point,
        &root,
        esp.as_ref().map(|fs| (fs, esp_path.as_path())),
    )
}

/// The base packages plus what the root filesystem needs at boot.
fn bootstrap_packages(config: &InstallConfig) -> Vec<&str> {
    let mut packages: Vec<&str> = config.base_packages.iter().map(String::as_str).collect();
    if config.filesystem == FilesystemType::Btrfs && !packages.contains(&BTRFS_PACKAGE) {
        packages.push(BTRFS_PACKAGE);
    }
    packages
}

fn pacstrap(context: &mut InstallContext) -> anyhow::Result<()> {
    info!("Bootstrapping system");
    context
        .runner
        .run(
            &Invocation::new("pacstrap")
                .arg("-K")
                .arg(&context.config.mount_point)
                .args(bootstrap_packages(context.config)),
        )
        .context(ErrorKind::Pacstrap)
}

fn generate_fstab(context: &mut InstallContext) -> anyhow::Result<()> {
    fstab::generate(context.runner, &context.config.mount_point)
}

fn configure_target(context: &mut InstallContext) -> anyhow::Result<()> {
    let mut target = TargetContext {
        chroot: Chroot::new(context.runner, &context.config.mount_point),
        config: context.config,
        boot_mode: context.boot_mode,
        disk: context.layout.disk().path(),
    };

    let report = configure::run(&mut target);
    if !report.is_success() {
        warn!("Configuration stopped after: {}", report.completed.join(", "));
    }
    report.into_result()?;
    Ok(())
}

fn unmount(context: &mut InstallContext) -> anyhow::Result<()> {
    info!("Unmounting filesystems");
    context.mounts.umount()?;
    context
        .runner
        .run(&Invocation::new("sync"))
        .context(ErrorKind::UmountFailure)
}

fn select_disk(
    host: &dyn Host,
    prompter: &mut dyn Prompter,
    config: &InstallConfig,
    options: &InstallOptions,
) -> anyhow::Result<Disk> {
    let name = match &options.disk {
        Some(name) => name.clone(),
        None => prompter.ask("Target disk (e.g. vda, sda, nvme0n1): ")?,
    };
    Disk::select(&config.device_prefix, &name, host)
}

fn print_summary(config: &InstallConfig, boot_mode: BootMode) {
    ui::section("Installation complete");
    ui::notice(&format!("Boot mode: {}", boot_mode));
    ui::notice(&format!("Hostname: {}", config.hostname));
    ui::notice(&format!(
        "Log in as {} with the password from your configuration",
        config.username
    ));
}

/// Runs a whole installation: checks, disk selection, the destructive
/// confirmation, the install steps and the closing reboot prompt.
pub fn install(
    runner: &dyn Runner,
    host: &dyn Host,
    prompter: &mut dyn Prompter,
    config: &InstallConfig,
    options: &InstallOptions,
) -> anyhow::Result<()> {
    ui::section("Pre-flight checks");
    if options.dry_run {
        warn!("Dry run: commands are logged, not executed");
    } else {
        preflight::check_privilege(host)?;
    }
    config.validate_secrets()?;

    let boot_mode = BootMode::detect(host);
    info!("Boot mode: {}", boot_mode);

    preflight::check_network(runner, &config.connectivity_host)?;
    if !options.dry_run {
        preflight::check_tools(host, &tool::required_tools(config.filesystem.mkfs_tool()))?;
    }
    let esp_mib = config.esp_mib()?;

    ui::section("Disk selection");
    let disk = select_disk(host, prompter, config, options)?;
    let question = format!(
        "All data on {} will be destroyed. Continue?",
        disk.path().display()
    );
    if !prompter.confirm(&question)? {
        return Err(ErrorKind::Declined.into());
    }

    let layout = PartitionLayout::for_mode(disk, boot_mode, config.filesystem, esp_mib);
    let mut context = InstallContext {
        runner,
        config,
        layout: &layout,
        boot_mode,
        mounts: MountStack::new(runner),
    };
    let completed = run_steps("Installing Arch Linux", &install_steps(), &mut context)
        .into_result()?;
    debug!("Install steps completed: {}", completed.join(", "));
    drop(context);

    print_summary(config, boot_mode);
    if prompter.confirm("Reboot now?")? {
        runner.run(&Invocation::new("systemctl").arg("reboot"))?;
    }

    Ok(())
}
