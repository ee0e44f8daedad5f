use std::{
    env,
    path::{Path, PathBuf},
};

use etcetera::BaseStrategy;

/// Returns the path to the user configuration directory.
///
/// On Windows, use, e.g., C:\Users\Alice\AppData\Roaming
/// On Linux and macOS, use `XDG_CONFIG_HOME` or $HOME/.config, e.g., /home/alice/.config.
pub fn user_config_dir() -> Option<PathBuf> {
    etcetera::choose_base_strategy()
        .map(|dirs| dirs.config_dir())
        .ok()
}

pub fn user_lupine_config_dir() -> Option<PathBuf> {
    user_config_dir().map(|mut path| {
        path.push("lupine");
        path
    })
}

#[cfg(not(windows))]
fn locate_system_config_xdg(value: Option<&str>) -> Option<PathBuf> {
    // On Linux and macOS, read the `XDG_CONFIG_DIRS` environment variable.
    let default = "/etc/xdg";
    let config_dirs = value.filter(|s| !s.is_empty()).unwrap_or(default);

    for dir in config_dirs.split(':').take_while(|s| !s.is_empty()) {
        let lupine_toml_path = Path::new(dir).join("lupine").join("lupine.toml");
        if lupine_toml_path.is_file() {
            return Some(lupine_toml_path);
        }
    }
    None
}

#[cfg(windows)]
fn locate_system_config_windows(system_drive: impl AsRef<Path>) -> Option<PathBuf> {
    // On Windows, use `%SYSTEMDRIVE%\ProgramData\lupine\lupine.toml` (e.g., `C:\ProgramData`).
    let candidate = system_drive
        .as_ref()
        .join("ProgramData")
        .join("lupine")
        .join("lupine.toml");
    candidate.as_path().is_file().then_some(candidate)
}

/// Returns the path to the system configuration file.
///
/// On Unix-like systems, uses the `XDG_CONFIG_DIRS` environment variable (falling back to
/// `/etc/xdg/lupine/lupine.toml` if unset or empty) and then `/etc/lupine/lupine.toml`
///
/// On Windows, uses `%SYSTEMDRIVE%\ProgramData\lupine\lupine.toml`.
pub fn system_config_file() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        env::var("SYSTEMDRIVE")
            .ok()
            .and_then(|system_drive| locate_system_config_windows(PathBuf::from(system_drive)))
    }

    #[cfg(not(windows))]
    {
        if let Some(path) = locate_system_config_xdg(env::var("XDG_CONFIG_DIRS").ok().as_deref()) {
            return Some(path);
        }

        // Fallback to `/etc/lupine/lupine.toml` if `XDG_CONFIG_DIRS` is not set or no valid
        // path is found.
        let candidate = Path::new("/etc/lupine/lupine.toml");
        match candidate.try_exists() {
            Ok(true) => Some(candidate.to_path_buf()),
            Ok(false) => None,
            Err(err) => {
                log::warn!("Failed to query system configuration file: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    #[cfg(windows)]
    use crate::dirs::locate_system_config_windows;
    #[cfg(not(windows))]
    use crate::dirs::locate_system_config_xdg;

    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[cfg(not(windows))]
    fn test_locate_system_config_xdg() -> anyhow::Result<()> {
        // Write a `lupine.toml` to a temporary directory.
        let context = TempDir::new()?;
        let config_dir = context.path().join("lupine");
        fs::create_dir_all(&config_dir)?;
        fs::write(config_dir.join("lupine.toml"), "isolate = true")?;

        // The system configuration file should be discovered via the XDG path.
        assert_eq!(
            locate_system_config_xdg(Some(context.path().to_str().unwrap())),
            Some(config_dir.join("lupine.toml"))
        );

        // An empty or unset `XDG_CONFIG_DIRS` should fall back to the default,
        // which does not contain our temporary file.
        assert_eq!(locate_system_config_xdg(Some("")), None);
        assert_eq!(locate_system_config_xdg(None), None);

        Ok(())
    }

    #[test]
    #[cfg(windows)]
    fn test_locate_system_config_windows() -> anyhow::Result<()> {
        let context = TempDir::new()?;
        let config_dir = context.path().join("ProgramData").join("lupine");
        fs::create_dir_all(&config_dir)?;
        fs::write(config_dir.join("lupine.toml"), "isolate = true")?;

        assert_eq!(
            locate_system_config_windows(context.path()),
            Some(config_dir.join("lupine.toml"))
        );

        Ok(())
    }
}
