//! Test doubles shared across module tests

use anyhow::{Result, bail};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::activation::{Activator, Compositor};
use crate::config::{JsonSettings, Paths, SettingsStore};
use crate::constants::effects;
use crate::orchestrator::Orchestrator;

/// Compositor that records every property value it is asked to set
#[derive(Clone, Default)]
pub struct RecordingCompositor {
    sets: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<usize>>,
    hdr_feedback: Arc<Mutex<Option<bool>>>,
    fail: bool,
}

impl RecordingCompositor {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Successful property sets, in order
    pub fn sets(&self) -> Vec<String> {
        self.sets.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    /// Number of reload dances performed (each activation sets one reload name)
    pub fn activations(&self) -> usize {
        self.sets()
            .iter()
            .filter(|v| v.ends_with(&format!("{}{}", effects::RELOAD_SUFFIX, effects::EXTENSION)))
            .count()
    }

    /// Last value the property was left at
    pub fn current(&self) -> Option<String> {
        self.sets().last().cloned()
    }

    pub fn set_hdr_feedback(&self, value: Option<bool>) {
        *self.hdr_feedback.lock().unwrap() = value;
    }

    pub fn reset(&self) {
        self.sets.lock().unwrap().clear();
        *self.attempts.lock().unwrap() = 0;
    }
}

impl Compositor for RecordingCompositor {
    async fn set_effect_property(&self, value: &str) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if self.fail {
            bail!("xprop: unable to open display ':0'");
        }
        self.sets.lock().unwrap().push(value.to_string());
        Ok(())
    }

    async fn hdr_output_feedback(&self) -> Option<bool> {
        *self.hdr_feedback.lock().unwrap()
    }
}

/// Minimal effect source carrying every patchable block
pub const FULL_EFFECT: &str = "#include \"ReShadeUI.fxh\"\n\
uniform float MuraMapScale < __UNIFORM_SLIDER_FLOAT1\n\
> = 0.0;\n\
uniform float MuraFadeNearWhite < __UNIFORM_SLIDER_FLOAT1\n\
> = 1.0;\n\
uniform float Intensity < __UNIFORM_SLIDER_FLOAT1\n\
> = 0.0;\n\
uniform float3 RGB_Lift < __UNIFORM_SLIDER_FLOAT3\n\
> = 1.0;\n\
uniform float3 RGB_Gamma < __UNIFORM_SLIDER_FLOAT3\n\
> = 1.0;\n\
uniform bool CasEnabled <\n\
> = false;\n\
uniform float CasSharpness < __UNIFORM_SLIDER_FLOAT1\n\
> = 0.0;\n\
technique MuraDeck { pass { PixelShader = Main; } }\n";

/// Sharpen-only effect source
pub const CAS_EFFECT: &str = "#include \"ReShadeUI.fxh\"\n\
uniform bool CasEnabled <\n\
> = false;\n\
uniform float CasSharpness < __UNIFORM_SLIDER_FLOAT1\n\
> = 0.0;\n\
technique MuraDeckCAS { pass { PixelShader = Cas; } }\n";

/// Write every effect artifact into `dir`
pub fn install_effects(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    for file in [effects::SDR, effects::HDR10PQ, effects::HDR_SCRGB] {
        std::fs::write(dir.join(file), FULL_EFFECT).unwrap();
    }
    std::fs::write(dir.join(effects::CAS), CAS_EFFECT).unwrap();
}

/// Orchestrator over a temporary home with every effect installed, settings
/// seeded from `seed` and a zero reload delay
pub fn orchestrator(
    home: &Path,
    compositor: &RecordingCompositor,
    seed: &[(&str, Value)],
) -> (Orchestrator<RecordingCompositor>, Paths) {
    let paths = Paths::from_home(home, home.join("settings"), home.join("bundled"));
    install_effects(&paths.shader_dir);

    let mut settings = JsonSettings::load(&paths.settings_file).unwrap();
    for (key, value) in seed {
        settings.set(key, value.clone());
    }

    let activator = Activator::with_delay(compositor.clone(), Duration::ZERO);
    let orch = Orchestrator::new(Box::new(settings), paths.clone(), activator, ":0");
    (orch, paths)
}
