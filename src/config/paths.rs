//! Filesystem layout the daemon works against

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::constants::{config, logs};

/// Every location the daemon reads or writes
#[derive(Debug, Clone)]
pub struct Paths {
    /// ReShade shader directory the compositor loads effects from
    pub shader_dir: PathBuf,
    pub texture_dir: PathBuf,
    /// Shaders shipped alongside the daemon
    pub bundled_shader_dir: PathBuf,
    /// Where the OS helpers drop extracted mura maps
    pub mura_tmp_dir: PathBuf,
    /// Per-panel mura maps kept by gamescope
    pub mura_config_dir: PathBuf,
    pub steam_log_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl Paths {
    /// Standard Steam Deck layout under `home`
    pub fn from_home(home: &Path, settings_dir: PathBuf, bundled_shader_dir: PathBuf) -> Self {
        let reshade = home.join(".local/share/gamescope/reshade");
        Self {
            shader_dir: reshade.join("Shaders"),
            texture_dir: reshade.join("Textures"),
            bundled_shader_dir,
            mura_tmp_dir: PathBuf::from("/tmp/mura"),
            mura_config_dir: home.join(".config/gamescope/mura"),
            steam_log_dir: home.join(".steam/steam/logs"),
            settings_file: settings_dir.join(config::FILENAME),
        }
    }

    /// Resolve from the environment, honouring explicit overrides
    pub fn resolve(settings_dir: Option<PathBuf>, bundled_shader_dir: Option<PathBuf>) -> Result<Self> {
        let home = dirs::home_dir().context("Failed to determine home directory")?;

        let settings_dir = match settings_dir {
            Some(dir) => dir,
            None => match std::env::var_os(config::SETTINGS_DIR_ENV) {
                Some(dir) => PathBuf::from(dir),
                None => dirs::config_dir()
                    .unwrap_or_else(|| home.join(".config"))
                    .join(config::APP_DIR),
            },
        };

        let bundled_shader_dir = match bundled_shader_dir {
            Some(dir) => dir,
            None => std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|p| p.join("shaders")))
                .unwrap_or_else(|| PathBuf::from("shaders")),
        };

        Ok(Self::from_home(&home, settings_dir, bundled_shader_dir))
    }

    pub fn effect(&self, file: &str) -> PathBuf {
        self.shader_dir.join(file)
    }

    /// Logs carrying colorspace and game lifecycle lines
    pub fn color_logs(&self) -> Vec<PathBuf> {
        vec![
            self.steam_log_dir.join(logs::CONSOLE),
            self.steam_log_dir.join(logs::GAME_PROCESS),
        ]
    }

    /// Log carrying display topology changes
    pub fn display_log(&self) -> PathBuf {
        self.steam_log_dir.join(logs::DISPLAY_MANAGER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_home() {
        let paths = Paths::from_home(
            Path::new("/home/deck"),
            PathBuf::from("/home/deck/settings"),
            PathBuf::from("/opt/mura/shaders"),
        );
        assert_eq!(paths.shader_dir, PathBuf::from("/home/deck/.local/share/gamescope/reshade/Shaders"));
        assert_eq!(paths.effect("MuraDeck_SDR.fx"), PathBuf::from("/home/deck/.local/share/gamescope/reshade/Shaders/MuraDeck_SDR.fx"));
        assert_eq!(paths.settings_file, PathBuf::from("/home/deck/settings/settings.json"));
        assert_eq!(paths.display_log(), PathBuf::from("/home/deck/.steam/steam/logs/systemdisplaymanager.txt"));
        assert_eq!(paths.color_logs().len(), 2);
    }
}
