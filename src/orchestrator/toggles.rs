//! User toggles and their getters
//!
//! Every setter persists its key first, then updates the in-memory mirror and
//! re-patches so the change shows without waiting for the next event.

use serde_json::Value;
use tracing::info;

use super::{Orchestrator, WatcherDirective};
use crate::activation::Compositor;
use crate::config::keys;
use crate::constants::defaults;

fn on_off(enable: bool) -> &'static str {
    if enable { "ON" } else { "OFF" }
}

impl<C: Compositor> Orchestrator<C> {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub async fn set_enabled(&mut self, enable: bool) -> Vec<WatcherDirective> {
        self.settings.persist(keys::ENABLED, Value::Bool(enable));
        self.enabled = enable;
        info!(enabled = enable, "Toggling plugin");

        if enable {
            self.state.forget_applied();
            let mut directives = Vec::new();
            if !self.suspended_external {
                directives.push(WatcherDirective::StartColor);
            }
            self.apply_current_profile().await;
            directives
        } else {
            self.activator.clear().await;
            vec![WatcherDirective::StopColor]
        }
    }

    #[cfg(test)]
    pub fn profile(&self) -> crate::profile::Profile {
        self.state.profile
    }

    /// Human label of the current profile
    pub fn display_mode(&self) -> &'static str {
        self.state.profile.display_name()
    }

    pub fn brightness_enabled(&self) -> bool {
        self.brightness_enabled
    }

    pub async fn set_brightness_enabled(&mut self, enable: bool) {
        self.settings.persist(keys::BRIGHTNESS_ENABLED, Value::Bool(enable));
        self.brightness_enabled = enable;
        self.state.forget_applied();
        info!(enabled = enable, "Brightness adaptation");
        self.apply_current_profile().await;
    }

    pub fn monitor_watch_enabled(&self) -> bool {
        self.monitor_watch_enabled
    }

    /// Without the watcher the internal panel is assumed
    pub async fn set_monitor_watch(&mut self, enable: bool) -> Vec<WatcherDirective> {
        self.settings
            .persist(keys::WATCH_EXTERNAL_MONITOR, Value::Bool(enable));
        self.monitor_watch_enabled = enable;
        info!(enabled = enable, "External monitor watcher");

        if enable {
            return vec![WatcherDirective::StartMonitor];
        }

        let mut directives = vec![WatcherDirective::StopMonitor];
        if self.state.external {
            directives.extend(self.on_external_monitor_change(false).await);
        }
        directives
    }

    pub fn external_sharpen_only(&self) -> bool {
        self.external_sharpen_only
    }

    /// Grain toggle of the current profile class
    pub fn grain(&self) -> bool {
        self.state.toggles().grain
    }

    pub async fn set_grain(&mut self, enable: bool) {
        let class = self.state.profile.class();
        self.settings.persist(&keys::grain(class), Value::Bool(enable));
        self.state.toggles_mut().grain = enable;
        info!(profile = %self.state.profile, "Grain={}", on_off(enable));
        self.reapply_current().await;
    }

    /// Lift/gamma toggle of the current profile class
    pub fn lgg(&self) -> bool {
        self.state.toggles().lgg
    }

    pub async fn set_lgg(&mut self, enable: bool) {
        let class = self.state.profile.class();
        self.settings.persist(&keys::lgg(class), Value::Bool(enable));
        self.state.toggles_mut().lgg = enable;
        info!(profile = %self.state.profile, "LGG={}", on_off(enable));
        self.reapply_current().await;
    }

    /// Global sharpening toggle for the current monitor class
    pub fn cas_enabled(&self) -> bool {
        let monitor = self.state.monitor();
        self.settings.get_bool(&keys::cas_enabled(monitor), false)
    }

    pub async fn set_cas_enabled(&mut self, enable: bool) {
        let monitor = self.state.monitor();
        self.settings
            .persist(&keys::cas_enabled(monitor), Value::Bool(enable));
        info!(monitor = ?monitor, "CAS={}", on_off(enable));
        self.refresh_sharpening().await;
    }

    pub fn cas_strength(&self) -> f64 {
        let monitor = self.state.monitor();
        self.settings
            .get_f64(&keys::cas_strength(monitor), defaults::SHARPNESS)
    }

    pub async fn set_cas_strength(&mut self, strength: f64) {
        let strength = strength.clamp(defaults::SHARPNESS_MIN, defaults::SHARPNESS_MAX);
        let monitor = self.state.monitor();
        self.settings
            .persist(&keys::cas_strength(monitor), Value::from(strength));
        info!(monitor = ?monitor, strength = strength, "CAS strength");
        self.refresh_sharpening().await;
    }

    /// Whether `appid` uses its own sharpening on the current monitor class
    pub fn app_override(&self, appid: u32) -> bool {
        let monitor = self.state.monitor();
        self.settings
            .get_bool(&keys::app_override(appid, monitor), false)
    }

    pub async fn set_app_override(&mut self, appid: u32, enable: bool) {
        let monitor = self.state.monitor();
        self.settings
            .persist(&keys::app_override(appid, monitor), Value::Bool(enable));
        info!(appid = appid, monitor = ?monitor, "CAS override={}", on_off(enable));
        self.refresh_sharpening().await;
    }

    /// Per-app sharpening toggle, falling back to the global one when unset
    pub fn app_cas_enabled(&self, appid: u32) -> bool {
        let monitor = self.state.monitor();
        self.settings
            .get_bool(&keys::app_cas_enabled(appid, monitor), self.cas_enabled())
    }

    pub async fn set_app_cas_enabled(&mut self, appid: u32, enable: bool) {
        let monitor = self.state.monitor();
        self.settings
            .persist(&keys::app_cas_enabled(appid, monitor), Value::Bool(enable));
        info!(appid = appid, monitor = ?monitor, "App CAS={}", on_off(enable));
        self.refresh_sharpening().await;
    }

    pub fn app_cas_strength(&self, appid: u32) -> f64 {
        let monitor = self.state.monitor();
        self.settings
            .get_f64(&keys::app_cas_strength(appid, monitor), self.cas_strength())
    }

    pub async fn set_app_cas_strength(&mut self, appid: u32, strength: f64) {
        let strength = strength.clamp(defaults::SHARPNESS_MIN, defaults::SHARPNESS_MAX);
        let monitor = self.state.monitor();
        self.settings
            .persist(&keys::app_cas_strength(appid, monitor), Value::from(strength));
        info!(appid = appid, monitor = ?monitor, strength = strength, "App CAS strength");
        self.refresh_sharpening().await;
    }

    pub fn has_seen_welcome(&self) -> bool {
        self.settings.get_bool(keys::HAS_SEEN_WELCOME, false)
    }

    pub fn set_has_seen_welcome(&mut self, seen: bool) {
        self.settings.persist(keys::HAS_SEEN_WELCOME, Value::Bool(seen));
    }
}
