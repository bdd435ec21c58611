pub const EFI_VARS_PATH: &str = "/sys/firmware/efi/efivars";
pub const DEVICE_PREFIX: &str = "/dev";
pub const MOUNT_POINT: &str = "/mnt";
pub const ESP_MOUNT_SUBPATH: &str = "boot/efi";
pub const CONNECTIVITY_HOST: &str = "archlinux.org";

pub const ESP_PARTITION_INDEX: u8 = 1;
pub const MIN_ESP_MIB: u64 = 64;
pub const DEFAULT_ESP_SIZE: &str = "512MiB";

pub const DEFAULT_HOSTNAME: &str = "archvm";
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_LOCALE: &str = "en_US.UTF-8";
pub const DEFAULT_KEYMAP: &str = "us";
pub const DEFAULT_USERNAME: &str = "user";
pub const DEFAULT_SHELL: &str = "/usr/bin/zsh";
pub const DEFAULT_DISPLAY_MANAGER: &str = "sddm";

pub const ADMIN_GROUP: &str = "wheel";
pub const NETWORK_SERVICE: &str = "NetworkManager";
pub const BOOTLOADER_ID: &str = "GRUB";
pub const GRUB_CONFIG: &str = "/boot/grub/grub.cfg";

pub const SUDOERS_ADMIN_PATH: &str = "/etc/sudoers.d/10-wheel";
pub const SUDOERS_ADMIN_RULE: &str = "%wheel ALL=(ALL:ALL) ALL\n";
pub const SUDOERS_BUILD_PATH: &str = "/etc/sudoers.d/99-aur-build";
pub const SUDOERS_MODE: u32 = 0o440;

pub const SHELL_FRAMEWORK_INSTALLER: &str =
    "https://raw.githubusercontent.com/ohmyzsh/ohmyzsh/master/tools/install.sh";

pub const BTRFS_PACKAGE: &str = "btrfs-progs";

pub const BASE_PACKAGES: [&str; 4] = ["base", "linux", "linux-firmware", "sudo"];

pub const UTILITY_PACKAGES: [&str; 9] = [
    "networkmanager",
    "base-devel",
    "git",
    "vim",
    "curl",
    "wget",
    "zsh",
    "htop",
    "openssh",
];

pub const DESKTOP_PACKAGES: [&str; 4] = ["xorg-server", "plasma-meta", "konsole", "dolphin"];

pub const EXTRA_PACKAGES: [&str; 5] = [
    "firefox",
    "neovim",
    "tmux",
    "qemu-guest-agent",
    "spice-vdagent",
];

pub const AUR_PACKAGES: [&str; 1] = ["visual-studio-code-bin"];

pub const WEAK_PASSWORDS: [&str; 6] = [
    "password",
    "root",
    "toor",
    "changeme",
    "123456",
    "archlinux",
];
