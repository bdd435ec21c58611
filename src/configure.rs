use crate::config::InstallConfig;
use crate::constants::*;
use crate::error::ErrorKind;
use crate::preflight::BootMode;
use crate::steps::{run_steps, RunReport, Step};
use crate::tool::Chroot;
use anyhow::Context;
use log::info;
use std::path::Path;

/// State shared by the configuration steps.
pub struct TargetContext<'a> {
    pub chroot: Chroot<'a>,
    pub config: &'a InstallConfig,
    pub boot_mode: BootMode,
    pub disk: &'a Path,
}

pub fn steps<'a>() -> Vec<Step<TargetContext<'a>>> {
    vec![
        Step::new("timezone", timezone),
        Step::new("locale", locale),
        Step::new("hostname", hostname),
        Step::new("root-password", root_password),
        Step::new("bootloader", bootloader),
        Step::new("utilities", utilities),
        Step::new("user", user),
        Step::new("desktop", desktop),
        Step::new("extra-packages", extra_packages),
        Step::new("aur-helper", aur_helper),
        Step::new("shell", shell),
    ]
}

/// Configures the installed tree. Stops at the first failing step and
/// reports which steps completed.
pub fn run(context: &mut TargetContext) -> RunReport {
    run_steps("Configuring the new system", &steps(), context)
}

fn install_packages(chroot: &Chroot, packages: &[String]) -> anyhow::Result<()> {
    if packages.is_empty() {
        return Ok(());
    }

    let mut args = vec!["pacman", "-S", "--noconfirm", "--needed"];
    args.extend(packages.iter().map(String::as_str));
    chroot.run(&args)
}

fn timezone(context: &mut TargetContext) -> anyhow::Result<()> {
    let zone = format!("/usr/share/zoneinfo/{}", context.config.timezone);
    let chroot = &context.chroot;

    chroot
        .run(&["ln", "-sf", zone.as_str(), "/etc/localtime"])
        .context(ErrorKind::Configuration)?;
    chroot
        .run(&["hwclock", "--systohc"])
        .context(ErrorKind::Configuration)?;
    Ok(())
}

/// The `/etc/locale.gen` line for a locale name.
pub fn locale_gen_entry(locale: &str) -> String {
    match locale.split_once('.') {
        Some((_, charset)) => format!("{} {}", locale, charset),
        None => format!("{} ISO-8859-1", locale),
    }
}

fn escape(text: &str, special: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `s/^#<entry>/<entry>/` for uncommenting a line of `/etc/locale.gen`.
pub fn uncomment_expression(entry: &str) -> String {
    format!(
        "s/^#{}/{}/",
        escape(entry, ".[]*^$\\/"),
        escape(entry, "&\\/")
    )
}

fn locale(context: &mut TargetContext) -> anyhow::Result<()> {
    let config = context.config;
    let chroot = &context.chroot;
    let entry = locale_gen_entry(&config.locale);
    let expression = uncomment_expression(&entry);

    chroot
        .run(&["sed", "-i", expression.as_str(), "/etc/locale.gen"])
        .context(ErrorKind::Configuration)?;
    chroot
        .run(&["locale-gen"])
        .context(ErrorKind::Configuration)?;
    chroot
        .write("/etc/locale.conf", &format!("LANG={}\n", config.locale), None)
        .context(ErrorKind::Configuration)?;
    chroot
        .write("/etc/vconsole.conf", &format!("KEYMAP={}\n", config.keymap), None)
        .context(ErrorKind::Configuration)?;
    Ok(())
}

pub fn hosts_file(hostname: &str) -> String {
    format!(
        "127.0.0.1\tlocalhost\n::1\t\tlocalhost\n127.0.1.1\t{0}.localdomain\t{0}\n",
        hostname
    )
}

fn hostname(context: &mut TargetContext) -> anyhow::Result<()> {
    let hostname = &context.config.hostname;
    info!("Setting hostname to {}", hostname);

    context
        .chroot
        .write("/etc/hostname", &format!("{}\n", hostname), None)
        .context(ErrorKind::Configuration)?;
    context
        .chroot
        .write("/etc/hosts", &hosts_file(hostname), None)
        .context(ErrorKind::Configuration)?;
    Ok(())
}

fn set_password(chroot: &Chroot, user: &str, password: &str) -> anyhow::Result<()> {
    chroot.run_with_stdin(&["chpasswd"], &format!("{}:{}\n", user, password))
}

fn root_password(context: &mut TargetContext) -> anyhow::Result<()> {
    let password = context.config.root_password()?;
    set_password(&context.chroot, "root", password).context(ErrorKind::Configuration)
}

fn bootloader(context: &mut TargetContext) -> anyhow::Result<()> {
    let chroot = &context.chroot;
    let mut packages = vec![String::from("grub")];
    if context.boot_mode == BootMode::Uefi {
        packages.push(String::from("efibootmgr"));
    }
    install_packages(chroot, &packages).context(ErrorKind::Bootloader)?;

    info!("Installing the bootloader ({})", context.boot_mode);
    let installed = match context.boot_mode {
        BootMode::Uefi => {
            let efi_directory = format!("--efi-directory=/{}", ESP_MOUNT_SUBPATH);
            let bootloader_id = format!("--bootloader-id={}", BOOTLOADER_ID);
            chroot.run(&[
                "grub-install",
                "--target=x86_64-efi",
                efi_directory.as_str(),
                bootloader_id.as_str(),
            ])
        }
        BootMode::Bios => {
            let disk = context.disk.display().to_string();
            chroot.run(&["grub-install", "--target=i386-pc", disk.as_str()])
        }
    };
    installed.context(ErrorKind::Bootloader)?;

    chroot
        .run(&["grub-mkconfig", "-o", GRUB_CONFIG])
        .context(ErrorKind::Bootloader)?;
    Ok(())
}

fn utilities(context: &mut TargetContext) -> anyhow::Result<()> {
    install_packages(&context.chroot, &context.config.utility_packages)
        .context(ErrorKind::Configuration)?;
    context
        .chroot
        .run(&["systemctl", "enable", NETWORK_SERVICE])
        .context(ErrorKind::Configuration)?;
    Ok(())
}

fn user(context: &mut TargetContext) -> anyhow::Result<()> {
    let config = context.config;
    let chroot = &context.chroot;
    let username = config.username.as_str();
    info!("Creating user {}", username);

    chroot
        .run(&["useradd", "-m", "-G", ADMIN_GROUP, "-s", "/bin/bash", username])
        .context(ErrorKind::Configuration)?;
    set_password(chroot, username, config.user_password()?)
        .context(ErrorKind::Configuration)?;

    chroot
        .write(SUDOERS_ADMIN_PATH, SUDOERS_ADMIN_RULE, Some(SUDOERS_MODE))
        .context(ErrorKind::Configuration)?;
    chroot
        .run(&["visudo", "-cf", SUDOERS_ADMIN_PATH])
        .context(ErrorKind::Configuration)?;
    Ok(())
}

fn desktop(context: &mut TargetContext) -> anyhow::Result<()> {
    let config = context.config;
    let mut packages = config.desktop_packages.clone();
    if !packages.contains(&config.display_manager) {
        packages.push(config.display_manager.clone());
    }

    install_packages(&context.chroot, &packages).context(ErrorKind::Configuration)?;
    context
        .chroot
        .run(&["systemctl", "enable", config.display_manager.as_str()])
        .context(ErrorKind::Configuration)?;
    Ok(())
}

fn extra_packages(context: &mut TargetContext) -> anyhow::Result<()> {
    install_packages(&context.chroot, &context.config.extra_packages)
        .context(ErrorKind::Configuration)
}

/// Where the helper gets built. `/tmp` is a fresh tmpfs for every
/// `arch-chroot` call, so it cannot be used across invocations.
fn build_directory(context: &TargetContext) -> String {
    format!("/var/tmp/{}", context.config.aur_helper.name())
}

fn build_aur_packages(context: &TargetContext) -> anyhow::Result<()> {
    let config = context.config;
    let chroot = &context.chroot;
    let helper = config.aur_helper;
    let username = config.username.as_str();
    let build_dir = build_directory(context);

    info!("Bootstrapping {}", helper);
    chroot.run_as(
        username,
        &["git", "clone", helper.repository(), build_dir.as_str()],
    )?;
    chroot.run_shell_as(
        username,
        &format!("cd {} && makepkg -si --noconfirm", build_dir),
    )?;

    if !config.aur_packages.is_empty() {
        info!("Installing {} from the AUR", config.aur_packages.join(", "));
        let mut command = helper.install_command();
        command.extend(config.aur_packages.iter().map(String::as_str));
        chroot.run_as(username, &command)?;
    }

    Ok(())
}

fn aur_helper(context: &mut TargetContext) -> anyhow::Result<()> {
    let chroot = &context.chroot;
    let build_dir = build_directory(context);

    // makepkg and the helper call sudo non-interactively while building.
    chroot
        .write(
            SUDOERS_BUILD_PATH,
            &format!("{} ALL=(ALL:ALL) NOPASSWD: ALL\n", context.config.username),
            Some(SUDOERS_MODE),
        )
        .context(ErrorKind::AurHelper)?;

    let result = build_aur_packages(context);
    let cleanup = chroot.run(&["rm", "-rf", SUDOERS_BUILD_PATH, build_dir.as_str()]);

    result.context(ErrorKind::AurHelper)?;
    cleanup.context(ErrorKind::AurHelper)
}

fn shell(context: &mut TargetContext) -> anyhow::Result<()> {
    let config = context.config;
    let chroot = &context.chroot;
    let username = config.username.as_str();

    if config.shell_framework {
        info!("Installing oh-my-zsh for {}", username);
        chroot
            .run_shell_as(
                username,
                &format!(
                    "sh -c \"$(curl -fsSL {})\" \"\" --unattended",
                    SHELL_FRAMEWORK_INSTALLER
                ),
            )
            .context(ErrorKind::Configuration)?;
    }

    chroot
        .run(&["chsh", "-s", config.shell.as_str(), username])
        .context(ErrorKind::Configuration)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use crate::error::kind_of;
    use crate::process::mock::RecordingRunner;

    fn config() -> InstallConfig {
        let mut config = InstallConfig::default();
        config.hostname = "devbox".into();
        config.timezone = "Europe/Berlin".into();
        config.root_password = Some(Secret::new("r00t-pw"));
        config.user_password = Some(Secret::new("us3r-pw"));
        config
    }

    fn configure(runner: &RecordingRunner, config: &InstallConfig, boot_mode: BootMode) -> RunReport {
        let mut context = TargetContext {
            chroot: Chroot::new(runner, Path::new("/mnt")),
            config,
            boot_mode,
            disk: Path::new("/dev/vda"),
        };
        run(&mut context)
    }

    fn position(commands: &[String], needle: &str) -> usize {
        commands
            .iter()
            .position(|line| line.contains(needle))
            .unwrap_or_else(|| panic!("`{}` was never run", needle))
    }

    #[test]
    fn all_steps_run_in_order() {
        let runner = RecordingRunner::new();
        let config = config();

        let report = configure(&runner, &config, BootMode::Uefi);

        assert!(report.is_success());
        assert_eq!(
            report.completed,
            vec![
                "timezone",
                "locale",
                "hostname",
                "root-password",
                "bootloader",
                "utilities",
                "user",
                "desktop",
                "extra-packages",
                "aur-helper",
                "shell",
            ]
        );

        let commands = runner.commands();
        let order = [
            "ln -sf /usr/share/zoneinfo/Europe/Berlin /etc/localtime",
            "hwclock --systohc",
            "locale-gen",
            "chpasswd",
            "grub-install --target=x86_64-efi --efi-directory=/boot/efi --bootloader-id=GRUB",
            "grub-mkconfig -o /boot/grub/grub.cfg",
            "systemctl enable NetworkManager",
            "useradd -m -G wheel -s /bin/bash user",
            "visudo -cf /etc/sudoers.d/10-wheel",
            "systemctl enable sddm",
            "git clone https://aur.archlinux.org/yay-bin.git /var/tmp/yay",
            "makepkg -si --noconfirm",
            "yay -S --needed --noconfirm",
            "rm -rf /etc/sudoers.d/99-aur-build /var/tmp/yay",
            "curl -fsSL https://raw.githubusercontent.com/ohmyzsh/ohmyzsh/",
            "chsh -s /usr/bin/zsh user",
        ];
        let positions: Vec<usize> = order.iter().map(|n| position(&commands, n)).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);

        assert!(commands.iter().all(|c| c.starts_with("arch-chroot /mnt ")));
    }

    #[test]
    fn files_are_written_into_the_target() {
        let runner = RecordingRunner::new();
        configure(&runner, &config(), BootMode::Uefi);

        assert_eq!(runner.written("/mnt/etc/hostname").unwrap().contents, "devbox\n");
        assert!(runner
            .written("/mnt/etc/hosts")
            .unwrap()
            .contents
            .contains("127.0.1.1\tdevbox.localdomain\tdevbox"));
        assert_eq!(
            runner.written("/mnt/etc/locale.conf").unwrap().contents,
            "LANG=en_US.UTF-8\n"
        );
        let sudoers = runner.written("/mnt/etc/sudoers.d/10-wheel").unwrap();
        assert_eq!(sudoers.contents, "%wheel ALL=(ALL:ALL) ALL\n");
        assert_eq!(sudoers.mode, Some(0o440));
    }

    #[test]
    fn passwords_only_travel_on_stdin() {
        let runner = RecordingRunner::new();
        configure(&runner, &config(), BootMode::Bios);

        assert!(runner
            .commands()
            .iter()
            .all(|c| !c.contains("r00t-pw") && !c.contains("us3r-pw")));
        assert_eq!(
            runner.stdin_all("chpasswd"),
            vec!["root:r00t-pw\n", "user:us3r-pw\n"]
        );
    }

    #[test]
    fn bios_installs_grub_to_the_disk() {
        let runner = RecordingRunner::new();
        configure(&runner, &config(), BootMode::Bios);

        assert!(runner.ran("grub-install --target=i386-pc /dev/vda"));
        assert!(!runner.ran("efibootmgr"));
    }

    #[test]
    fn bootloader_failure_stops_the_phase() {
        let runner = RecordingRunner::failing_on("grub-install");
        let report = configure(&runner, &config(), BootMode::Uefi);

        let failed = report.failed.as_ref().unwrap();
        assert_eq!(failed.name, "bootloader");
        assert_eq!(kind_of(&failed.error), Some(&ErrorKind::Bootloader));
        assert_eq!(
            report.completed,
            vec!["timezone", "locale", "hostname", "root-password"]
        );

        assert_eq!(runner.commands().last().unwrap(), "arch-chroot /mnt grub-install --target=x86_64-efi --efi-directory=/boot/efi --bootloader-id=GRUB");
        assert!(!runner.ran("grub-mkconfig"));
        assert!(!runner.ran("useradd"));
        assert!(runner.written("/mnt/etc/sudoers.d/10-wheel").is_none());
    }

    #[test]
    fn failed_aur_build_still_removes_the_build_rule() {
        let runner = RecordingRunner::failing_on("makepkg");
        let report = configure(&runner, &config(), BootMode::Uefi);

        let failed = report.failed.as_ref().unwrap();
        assert_eq!(failed.name, "aur-helper");
        assert_eq!(kind_of(&failed.error), Some(&ErrorKind::AurHelper));
        assert!(runner.ran("rm -rf /etc/sudoers.d/99-aur-build"));
        assert!(!runner.ran("yay -S"));
        assert!(!runner.ran("chsh"));
    }

    #[test]
    fn shell_framework_can_be_skipped() {
        let runner = RecordingRunner::new();
        let mut config = config();
        config.shell_framework = false;
        config.aur_packages.clear();

        configure(&runner, &config, BootMode::Uefi);

        assert!(!runner.ran("curl -fsSL"));
        assert!(!runner.ran("ohmyzsh"));
        assert!(!runner.ran("yay -S"));
        assert!(runner.ran("chsh -s /usr/bin/zsh user"));
    }

    #[test]
    fn locale_gen_entries() {
        assert_eq!(locale_gen_entry("en_US.UTF-8"), "en_US.UTF-8 UTF-8");
        assert_eq!(locale_gen_entry("de_DE"), "de_DE ISO-8859-1");
        assert_eq!(
            uncomment_expression("en_US.UTF-8 UTF-8"),
            "s/^#en_US\\.UTF-8 UTF-8/en_US.UTF-8 UTF-8/"
        );
    }
}
