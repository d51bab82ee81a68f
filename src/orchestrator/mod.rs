//! Display correction state machine
//!
//! Owns the correction state and the settings handle. Every transition
//! re-derives uniform values from current state, patches the active artifact
//! and drives the compositor to reload it. Transitions never fail: problems
//! are logged and the correction stays where it was.

mod events;
mod session;
mod state;
mod toggles;


pub use session::SessionState;
pub use state::{CorrectionState, FeatureToggles, Sharpening};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::activation::{Activator, Compositor};
use crate::assets;
use crate::config::{Paths, SettingsStore, keys};
use crate::constants::{defaults, timing};
use crate::profile::{MonitorClass, Profile, ProfileClass};
use crate::shader::{self, PatchError};
use crate::tables::{self, ParameterSet};

/// Background watcher changes requested by a transition. The orchestrator
/// does not own the watcher tasks; whoever drives it applies these after the
/// transition returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherDirective {
    StartColor,
    StopColor,
    StartMonitor,
    StopMonitor,
}

pub struct Orchestrator<C: Compositor> {
    settings: Box<dyn SettingsStore>,
    paths: Paths,
    activator: Activator<C>,
    display: String,
    state: CorrectionState,
    session: SessionState,
    enabled: bool,
    brightness_enabled: bool,
    monitor_watch_enabled: bool,
    external_sharpen_only: bool,
    /// Plugin held off because an external display is connected and
    /// sharpen-only switching is turned off
    suspended_external: bool,
}

impl<C: Compositor> Orchestrator<C> {
    /// Build the initial state from persisted settings
    pub fn new(
        settings: Box<dyn SettingsStore>,
        paths: Paths,
        activator: Activator<C>,
        display: impl Into<String>,
    ) -> Self {
        let toggles = |class| FeatureToggles {
            grain: settings.get_bool(&keys::grain(class), true),
            lgg: settings.get_bool(&keys::lgg(class), true),
        };
        let sdr = toggles(ProfileClass::Sdr);
        let hdr = toggles(ProfileClass::Hdr);

        let enabled = settings.get_bool(keys::ENABLED, false);
        let brightness_enabled = settings.get_bool(keys::BRIGHTNESS_ENABLED, true);
        let monitor_watch_enabled = settings.get_bool(keys::WATCH_EXTERNAL_MONITOR, true);
        let external_sharpen_only = settings.get_bool(keys::EXTERNAL_SHARPEN_ONLY, true);

        let sharpening = global_sharpening(settings.as_ref(), MonitorClass::Internal);

        info!(
            enabled = enabled,
            brightness = brightness_enabled,
            monitor_watch = monitor_watch_enabled,
            sharpen_only = external_sharpen_only,
            "Orchestrator initialized"
        );

        Self {
            settings,
            paths,
            activator,
            display: display.into(),
            state: CorrectionState::new(sdr, hdr, sharpening),
            session: SessionState::new(),
            enabled,
            brightness_enabled,
            monitor_watch_enabled,
            external_sharpen_only,
            suspended_external: false,
        }
    }

    /// Watchers that should run right after startup
    pub fn startup_directives(&self) -> Vec<WatcherDirective> {
        let mut directives = Vec::new();
        if self.monitor_watch_enabled {
            directives.push(WatcherDirective::StartMonitor);
        }
        if self.enabled {
            directives.push(WatcherDirective::StartColor);
        }
        directives
    }

    #[cfg(test)]
    pub fn state(&self) -> &CorrectionState {
        &self.state
    }

    #[cfg(test)]
    pub fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    pub fn compositor(&self) -> &C {
        self.activator.compositor()
    }

    /// Whether corrections are currently written out
    fn active(&self) -> bool {
        self.enabled && !self.suspended_external
    }

    /// Patch `effect` for the current state and reload it. Returns whether
    /// the compositor accepted the new effect.
    async fn apply(&self, effect: &str, params: Option<ParameterSet>) -> bool {
        let path = self.paths.effect(effect);
        let targets = self.state.targets(params);

        match shader::patch_file(&path, &targets) {
            Ok(patched) => debug!(effect = %effect, blocks = patched, "Patched effect"),
            Err(e @ PatchError::NotFound { .. }) => {
                error!(error = %e, "Skipping activation");
                return false;
            }
            Err(e) => error!(error = ?e, "Patch failed, activating anyway"),
        }

        self.activator.activate(effect).await
    }

    /// Write `params` unless they are exactly what was last written
    async fn apply_parameters(&mut self, params: ParameterSet) {
        if self.state.last_applied == Some(params) {
            debug!(profile = %self.state.profile, strength = params.strength, "Parameters unchanged, skipping");
            return;
        }

        info!(
            profile = %self.state.profile,
            strength = params.strength,
            fade = ?params.fade,
            "Updating correction strength"
        );
        if self.apply(self.state.profile.effect_file(), Some(params)).await {
            self.state.last_applied = Some(params);
        }
    }

    async fn apply_static(&mut self) {
        let params = tables::static_params(self.state.profile);
        info!(profile = %self.state.profile, strength = params.strength, "Applying static correction");
        self.apply_parameters(params).await;
    }

    /// Only the sharpen-only artifact, or nothing when sharpening is off.
    /// Skipped when that is already what the compositor shows.
    async fn apply_sharpen_only(&mut self) {
        let sharpening = self.state.sharpening;
        if self.state.sharpen_only_applied == Some(sharpening) {
            debug!(enabled = sharpening.enabled, "Sharpen-only effect unchanged, skipping");
            return;
        }

        let applied = if sharpening.enabled {
            info!(strength = sharpening.strength, "Applying sharpen-only effect");
            self.apply(self.state.effect_file(), None).await
        } else {
            info!("Sharpen-only mode with sharpening off, clearing effect");
            self.activator.clear().await
        };
        if applied {
            self.state.sharpen_only_applied = Some(sharpening);
        }
    }

    /// Re-derive everything for the current profile and mode
    async fn apply_current_profile(&mut self) {
        if !self.active() {
            debug!("Inactive, not applying");
            return;
        }

        if self.state.cas_only {
            self.apply_sharpen_only().await;
        } else if !self.brightness_enabled {
            self.apply_static().await;
        } else if let Some(brightness) = self.state.brightness {
            self.apply_parameters(tables::lookup(self.state.profile, brightness)).await;
        } else {
            let effect = self.state.profile.effect_file();
            info!(profile = %self.state.profile, effect = %effect, "Applying base effect");
            self.apply(effect, None).await;
        }
    }

    /// Re-patch the current artifact keeping its correction strength
    async fn reapply_current(&mut self) {
        if !self.active() {
            return;
        }
        if self.state.cas_only {
            self.state.sharpen_only_applied = None;
            self.apply_sharpen_only().await;
        } else {
            self.apply(self.state.effect_file(), None).await;
        }
    }

    /// Sharpening for `appid` on the current monitor class. Per-app values
    /// only count when that app's override flag is set.
    fn sharpening_for(&self, appid: Option<u32>) -> Sharpening {
        let monitor = self.state.monitor();
        let global = global_sharpening(self.settings.as_ref(), monitor);

        let Some(appid) = appid else {
            return global;
        };
        if !self.settings.get_bool(&keys::app_override(appid, monitor), false) {
            return global;
        }

        Sharpening {
            enabled: self
                .settings
                .get_bool(&keys::app_cas_enabled(appid, monitor), global.enabled),
            strength: self
                .settings
                .get_f64(&keys::app_cas_strength(appid, monitor), global.strength),
        }
    }

    /// Pick up sharpening for the focused app and re-derive if it changed
    async fn refresh_sharpening(&mut self) {
        let sharpening = self.sharpening_for(self.state.current_appid);
        if self.state.set_sharpening(sharpening) {
            info!(enabled = sharpening.enabled, strength = sharpening.strength, "Sharpening changed");
            self.apply_current_profile().await;
        }
    }

    pub async fn set_profile(&mut self, profile: Profile) {
        let changed = self.state.switch_profile(profile);
        info!(
            profile = %profile,
            effect = %self.state.effect_file(),
            changed = changed,
            "Profile set"
        );
        self.apply_current_profile().await;
    }

    /// Feed a brightness reading in percent
    pub async fn apply_brightness(&mut self, pct: u8) {
        let pct = pct.min(100);
        self.state.brightness = Some(pct);

        if !self.active() {
            return;
        }
        if self.state.cas_only {
            debug!(brightness = pct, "Sharpen-only mode, brightness recorded");
            return;
        }
        if !self.brightness_enabled {
            self.apply_static().await;
            return;
        }

        debug!(brightness = pct, profile = %self.state.profile, "Brightness reading");
        self.apply_parameters(tables::lookup(self.state.profile, pct)).await;
    }

    /// Re-patch and reload the current effect after the device wakes
    pub async fn resume_from_suspend(&mut self) {
        if !self.enabled {
            info!("Plugin disabled, skipping resume handler");
            return;
        }
        info!(effect = %self.state.effect_file(), "Re-applying last known effect after suspend");
        self.reapply_current().await;
    }

    /// Set the current effect once without the reload dance
    pub async fn direct_effect(&self) -> bool {
        self.activator.direct(self.state.effect_file()).await
    }

    pub async fn clear_effect(&self) -> bool {
        self.activator.clear().await
    }

    /// Clear the effect, giving up after the teardown bound
    pub async fn clear_effect_bounded(&self) {
        match tokio::time::timeout(timing::TEARDOWN_CLEAR_TIMEOUT, self.activator.clear()).await {
            Ok(_) => {}
            Err(_) => error!(
                timeout_ms = timing::TEARDOWN_CLEAR_TIMEOUT.as_millis() as u64,
                "Clear effect timed out"
            ),
        }
    }

    pub fn check_shader_status(&self) -> bool {
        assets::check_shader_status(&self.paths)
    }

    /// First-run migration plus a forced reinstall of every asset
    pub async fn reinstall_shaders(&mut self) -> bool {
        if !self.settings.contains(keys::ENABLED) {
            info!("First run, plugin starts disabled");
            self.settings.set(keys::ENABLED, Value::Bool(false));
            self.enabled = false;
        }
        if !self.settings.contains(keys::HAS_SEEN_WELCOME) {
            self.settings.set(keys::HAS_SEEN_WELCOME, Value::Bool(false));
        }
        if let Err(e) = self.settings.commit() {
            warn!(error = ?e, "Failed to commit seeded settings");
        }

        match assets::install(&self.paths, &self.display).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = ?e, "Reinstall failed");
                false
            }
        }
    }

    /// Remove installed assets and unload the effect
    pub async fn uninstall(&mut self) {
        self.settings.persist(keys::HAS_SEEN_WELCOME, Value::Bool(false));
        info!("Reset welcome flag on uninstall");
        assets::remove_installed(&self.paths);
        self.state.forget_applied();
        self.clear_effect_bounded().await;
    }
}

fn global_sharpening(settings: &dyn SettingsStore, monitor: MonitorClass) -> Sharpening {
    Sharpening {
        enabled: settings.get_bool(&keys::cas_enabled(monitor), false),
        strength: settings
            .get_f64(&keys::cas_strength(monitor), defaults::SHARPNESS)
            .clamp(defaults::SHARPNESS_MIN, defaults::SHARPNESS_MAX),
    }
}
