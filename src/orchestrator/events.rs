//! Transitions driven by the host and the log watchers

use tracing::{debug, info};

use super::{Orchestrator, Sharpening, WatcherDirective};
use crate::activation::Compositor;
use crate::config::keys;
use crate::profile::Profile;

impl<C: Compositor> Orchestrator<C> {
    /// A game started or stopped. Repeated identical reports are dropped.
    pub async fn on_game_state_change(&mut self, appid: u32, running: bool) {
        if !self.session.record_running(appid, running) {
            debug!(appid = appid, running = running, "Duplicate game state, ignoring");
            return;
        }

        if running {
            info!(appid = appid, "Game started");
            // focus events may never arrive for the first game
            if self.state.current_appid.is_none() {
                self.state.current_appid = Some(appid);
            }
            if self.compositor().hdr_output_feedback().await == Some(false) {
                info!(appid = appid, "Output does not take HDR, forcing SDR");
                self.state.switch_profile(Profile::Sdr);
            }

            let sharpening = self.sharpening_for(Some(appid));
            self.state.set_sharpening(sharpening);
            self.apply_current_profile().await;
        } else {
            info!(appid = appid, "Game stopped");
            self.session.forget(appid);
            if self.state.current_appid == Some(appid) {
                self.state.current_appid = None;
            }
            let strength = self.state.sharpening.strength;
            self.state.set_sharpening(Sharpening { enabled: false, strength });
            self.set_profile(Profile::Sdr).await;
        }
    }

    /// Focus moved to `appid`. A profile cached for it is restored.
    pub async fn on_focus_change(&mut self, appid: u32) {
        if self.state.current_appid == Some(appid) {
            return;
        }

        if let Some(previous) = self.state.current_appid {
            self.session.remember(previous, self.state.profile);
        }
        self.state.current_appid = Some(appid);
        info!(appid = appid, "Focus changed");

        let Some(profile) = self.session.profile_for(appid) else {
            return;
        };

        info!(appid = appid, profile = %profile, "Restoring cached profile");
        self.state.switch_profile(profile);
        let sharpening = self.sharpening_for(Some(appid));
        self.state.set_sharpening(sharpening);
        self.apply_current_profile().await;
    }

    /// Colorspace line from the Steam log
    pub async fn on_colorspace(&mut self, profile: Profile) {
        self.set_profile(profile).await;
    }

    /// "game stopped" line from the Steam log
    pub async fn on_game_stopped_log(&mut self) {
        info!("Game stopped, reverting to SDR");
        self.state.current_appid = None;
        self.set_profile(Profile::Sdr).await;
    }

    /// An external display was connected or disconnected
    pub async fn on_external_monitor_change(&mut self, external: bool) -> Vec<WatcherDirective> {
        info!(external = external, "Monitor changed");
        self.state.external = external;

        // monitor class changed, so did the sharpening keys
        let sharpening = self.sharpening_for(self.state.current_appid);
        self.state.set_sharpening(sharpening);

        if self.external_sharpen_only {
            return self.switch_sharpen_only(external).await;
        }

        let mut directives = Vec::new();
        if external && self.enabled && !self.suspended_external {
            info!("External display, suspending correction");
            self.suspended_external = true;
            directives.push(WatcherDirective::StopColor);
            self.activator.clear().await;
        } else if !external && self.suspended_external {
            info!("Internal display, resuming correction");
            self.suspended_external = false;
            self.state.forget_applied();
            directives.push(WatcherDirective::StartColor);
            self.apply_current_profile().await;
        }
        directives
    }

    async fn switch_sharpen_only(&mut self, external: bool) -> Vec<WatcherDirective> {
        self.state.set_cas_only(external);

        let mut directives = Vec::new();
        if external && self.enabled {
            directives.push(WatcherDirective::StartColor);
        }
        if external {
            info!("External display, sharpen-only mode");
        } else {
            info!("Internal display, full correction");
        }
        self.apply_current_profile().await;
        directives
    }

    /// Choose between sharpen-only switching and suspending the plugin while
    /// an external display is connected
    pub async fn set_external_sharpen_only(&mut self, enable: bool) -> Vec<WatcherDirective> {
        self.settings.persist(keys::EXTERNAL_SHARPEN_ONLY, enable.into());
        if self.external_sharpen_only == enable {
            return Vec::new();
        }
        self.external_sharpen_only = enable;
        info!(enabled = enable, "External sharpen-only");

        if !self.state.external {
            return Vec::new();
        }

        // re-run the connect transition under the new mode
        self.suspended_external = false;
        self.state.set_cas_only(false);
        self.on_external_monitor_change(true).await
    }
}
