//! Shader and texture installation
//!
//! Effects and mura textures live in the gamescope ReShade directory. The
//! textures come from the factory calibration extracted by the OS helpers.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::Paths;
use crate::constants::{assets, effects};
use crate::shader::reload_name;

/// True when every shader and both textures are installed
pub fn check_shader_status(paths: &Paths) -> bool {
    let shaders = assets::SHADER_FILES
        .iter()
        .all(|f| paths.shader_dir.join(f).exists());
    let textures = assets::TEXTURE_FILES
        .iter()
        .all(|f| paths.texture_dir.join(f).exists());
    shaders && textures
}

/// Reinstall shaders and any missing texture. Individual copy failures are
/// logged; only failing to create the target directories is an error.
pub async fn install(paths: &Paths, display: &str) -> Result<()> {
    fs::create_dir_all(&paths.shader_dir)
        .with_context(|| format!("Failed to create shader directory {:?}", paths.shader_dir))?;
    fs::create_dir_all(&paths.texture_dir)
        .with_context(|| format!("Failed to create texture directory {:?}", paths.texture_dir))?;

    info!("Installing shaders (forced reinstall)...");
    for cmd in assets::SETUP_COMMANDS {
        run_setup_command(cmd, display).await;
    }

    for file in assets::SHADER_FILES {
        let src = paths.bundled_shader_dir.join(file);
        let dst = paths.shader_dir.join(file);
        match install_shader(&src, &dst) {
            Ok(()) => info!(shader = %file, "Installed shader"),
            Err(e) => error!(shader = %file, error = ?e, "Install shader failed"),
        }
    }

    install_textures(paths);
    Ok(())
}

async fn run_setup_command(cmd: &str, display: &str) {
    let output = Command::new(cmd)
        .env("DISPLAY", display)
        .output()
        .await;
    match output {
        Ok(out) if out.status.success() => info!(command = %cmd, "Setup helper OK"),
        Ok(out) => error!(
            command = %cmd,
            status = %out.status,
            stderr = %String::from_utf8_lossy(&out.stderr).trim(),
            "Setup helper failed"
        ),
        Err(e) => error!(command = %cmd, error = %e, "Failed to run setup helper"),
    }
}

fn install_shader(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst).with_context(|| format!("Failed to copy {:?} to {:?}", src, dst))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dst, fs::Permissions::from_mode(assets::SHADER_MODE))
            .with_context(|| format!("Failed to set permissions on {:?}", dst))?;
    }
    Ok(())
}

/// First file in `dir` whose name ends with `suffix`
fn find_with_suffix(dir: &Path, suffix: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with(suffix))
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

fn copy_texture_if_missing(src: &Path, texture_dir: &Path, name: &str) {
    let dst = texture_dir.join(name);
    if dst.exists() {
        return;
    }
    match fs::copy(src, &dst) {
        Ok(_) => info!(texture = %name, source = %src.display(), "Copied texture"),
        Err(e) => error!(texture = %name, error = %e, "Copy texture failed"),
    }
}

/// Fill in missing textures from the extractor output, then from the first
/// per-panel gamescope folder that has both maps
pub fn install_textures(paths: &Paths) {
    for name in assets::TEXTURE_FILES {
        if let Some(src) = find_with_suffix(&paths.mura_tmp_dir, name) {
            copy_texture_if_missing(&src, &paths.texture_dir, name);
        }
    }

    let Ok(entries) = fs::read_dir(&paths.mura_config_dir) else {
        return;
    };
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    candidates.sort();

    for candidate in candidates {
        let green = find_with_suffix(&candidate, assets::GREEN_TEXTURE);
        let red = find_with_suffix(&candidate, assets::RED_TEXTURE);
        if let (Some(green), Some(red)) = (green, red) {
            copy_texture_if_missing(&green, &paths.texture_dir, assets::GREEN_TEXTURE);
            copy_texture_if_missing(&red, &paths.texture_dir, assets::RED_TEXTURE);
            break;
        }
    }
}

/// Delete installed shaders, their reload copies and the textures
pub fn remove_installed(paths: &Paths) {
    let shaders = assets::SHADER_FILES
        .iter()
        .map(|f| f.to_string())
        .chain(
            assets::SHADER_FILES
                .iter()
                .filter(|f| f.ends_with(effects::EXTENSION))
                .map(|f| reload_name(f)),
        );

    let files = shaders
        .map(|f| paths.shader_dir.join(f))
        .chain(assets::TEXTURE_FILES.iter().map(|f| paths.texture_dir.join(f)));

    for path in files {
        match fs::remove_file(&path) {
            Ok(()) => info!(path = %path.display(), "Deleted asset"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Delete asset failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_in(root: &Path) -> Paths {
        Paths::from_home(root, root.join("settings"), root.join("bundled"))
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_status_requires_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        assert!(!check_shader_status(&paths));

        for f in assets::SHADER_FILES {
            touch(&paths.shader_dir.join(f));
        }
        assert!(!check_shader_status(&paths));

        touch(&paths.texture_dir.join(assets::GREEN_TEXTURE));
        touch(&paths.texture_dir.join(assets::RED_TEXTURE));
        assert!(check_shader_status(&paths));
    }

    #[test]
    fn test_textures_fall_back_to_gamescope_folder() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = paths_in(dir.path());
        paths.mura_tmp_dir = dir.path().join("no-tmp");
        fs::create_dir_all(&paths.texture_dir).unwrap();

        // first folder only has one map and is skipped
        touch(&paths.mura_config_dir.join("a").join("panel_green.png"));
        touch(&paths.mura_config_dir.join("b").join("panel_green.png"));
        touch(&paths.mura_config_dir.join("b").join("panel_red.png"));

        install_textures(&paths);
        assert!(paths.texture_dir.join(assets::GREEN_TEXTURE).exists());
        assert!(paths.texture_dir.join(assets::RED_TEXTURE).exists());
    }

    #[test]
    fn test_existing_textures_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        fs::create_dir_all(&paths.texture_dir).unwrap();
        fs::write(paths.texture_dir.join(assets::GREEN_TEXTURE), b"original").unwrap();
        fs::create_dir_all(&paths.mura_tmp_dir).ok();

        let tmp = dir.path().join("extract");
        fs::create_dir_all(&tmp).unwrap();
        fs::write(tmp.join("123_green.png"), b"new").unwrap();
        let paths = Paths { mura_tmp_dir: tmp, ..paths };

        install_textures(&paths);
        assert_eq!(fs::read(paths.texture_dir.join(assets::GREEN_TEXTURE)).unwrap(), b"original");
    }

    #[test]
    fn test_remove_installed_includes_reload_copies() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let reload = paths.shader_dir.join("MuraDeck_SDR_reload.fx");
        touch(&paths.shader_dir.join("MuraDeck_SDR.fx"));
        touch(&reload);
        touch(&paths.texture_dir.join(assets::RED_TEXTURE));

        remove_installed(&paths);
        assert!(!reload.exists());
        assert!(!paths.shader_dir.join("MuraDeck_SDR.fx").exists());
        assert!(!paths.texture_dir.join(assets::RED_TEXTURE).exists());
    }
}
