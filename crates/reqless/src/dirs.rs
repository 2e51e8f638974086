use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;

/// Directory holding reqless configuration inside a config root
pub(crate) const APP_DIR: &str = "reqless";

/// Name of every reqless configuration file
pub const CONFIG_FILE_NAME: &str = "reqless.toml";

/// Returns the per-user configuration file location, whether or not it exists.
///
/// Follows `XDG_CONFIG_HOME` (or `~/.config`) on Linux and macOS and
/// `%APPDATA%` on Windows.
pub fn user_config_file() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Returns the first existing system-wide configuration file.
///
/// Unix-like systems search each entry of `XDG_CONFIG_DIRS` (default `/etc/xdg`)
/// before `/etc/reqless/reqless.toml`. Windows looks under
/// `%SYSTEMDRIVE%\ProgramData`.
pub fn system_config_file() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        let drive = std::env::var("SYSTEMDRIVE").ok()?;
        find_in_program_data(Path::new(&drive))
    }

    #[cfg(not(windows))]
    {
        let xdg_dirs = std::env::var("XDG_CONFIG_DIRS").ok();
        find_in_xdg_dirs(xdg_dirs.as_deref()).or_else(|| {
            let fallback = Path::new("/etc").join(APP_DIR).join(CONFIG_FILE_NAME);
            match fallback.try_exists() {
                Ok(true) => Some(fallback),
                Ok(false) => None,
                Err(err) => {
                    log::warn!("Failed to query system configuration file: {err}");
                    None
                }
            }
        })
    }
}

#[cfg(not(windows))]
fn find_in_xdg_dirs(value: Option<&str>) -> Option<PathBuf> {
    let dirs = value.filter(|dirs| !dirs.is_empty()).unwrap_or("/etc/xdg");
    dirs.split(':')
        .take_while(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(APP_DIR).join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(windows)]
fn find_in_program_data(system_drive: &Path) -> Option<PathBuf> {
    let candidate = system_drive
        .join("ProgramData")
        .join(APP_DIR)
        .join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}
