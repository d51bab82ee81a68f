use std::collections::HashMap;
use tracing::{debug, info};

use crate::profile::Profile;

/// Runtime state for application tracking
/// Session-only (not persisted to disk)
#[derive(Debug, Default)]
pub struct SessionState {
    /// App ID → profile it was last seen with
    /// Written when an app loses focus, read when it regains it
    pub app_profiles: HashMap<u32, Profile>,

    /// App ID → last reported running flag, used to drop repeated lifecycle events
    pub running: HashMap<u32, bool>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the profile an app was using when it lost focus
    pub fn remember(&mut self, appid: u32, profile: Profile) {
        self.app_profiles.insert(appid, profile);
        debug!(appid = appid, profile = %profile, "Cached profile for app");
    }

    /// Profile to restore when `appid` regains focus
    pub fn profile_for(&self, appid: u32) -> Option<Profile> {
        self.app_profiles.get(&appid).copied()
    }

    /// Forget everything about a stopped app
    pub fn forget(&mut self, appid: u32) {
        if self.app_profiles.remove(&appid).is_some() {
            info!(appid = appid, "Dropped cached profile for stopped app");
        }
    }

    /// Record a lifecycle event. Returns false when it repeats the last one.
    pub fn record_running(&mut self, appid: u32, running: bool) -> bool {
        self.running.insert(appid, running) != Some(running)
    }
}
