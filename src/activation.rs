//! Forcing the compositor to (re)load an effect
//!
//! Gamescope only re-reads an effect when `GAMESCOPE_RESHADE_EFFECT` changes
//! value. Activation therefore sets the reload copy first, waits, then sets
//! the real name.

use anyhow::{Context, Result, bail};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::constants::{gamescope, timing};
use crate::shader::reload_name;
use crate::x11_utils::RootWindow;

/// The display compositor as seen by the orchestrator
pub trait Compositor: Send + Sync + 'static {
    /// Set the effect property to `value`
    fn set_effect_property(&self, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// `Some(false)` when the output cannot take HDR content
    fn hdr_output_feedback(&self) -> impl Future<Output = Option<bool>> + Send;
}

/// Gamescope on the local X display: property sets through xprop, reads
/// through a direct X11 connection
pub struct Gamescope {
    display: String,
    root: Option<Arc<RootWindow>>,
}

impl Gamescope {
    pub fn new(display: impl Into<String>) -> Self {
        let display_name = display.into();
        let root = RootWindow::connect(&display_name)
            .inspect_err(|e| warn!(display = %display_name, error = ?e, "HDR output feedback unavailable"))
            .ok()
            .map(Arc::new);
        Self {
            display: display_name,
            root,
        }
    }
}

impl Compositor for Gamescope {
    async fn set_effect_property(&self, value: &str) -> Result<()> {
        let output = Command::new(gamescope::XPROP)
            .env("DISPLAY", &self.display)
            .args(["-root", "-f", gamescope::EFFECT_PROPERTY, gamescope::PROPERTY_FORMAT])
            .args(["-set", gamescope::EFFECT_PROPERTY, value])
            .output()
            .await
            .with_context(|| format!("Failed to run {}", gamescope::XPROP))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                gamescope::XPROP,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn hdr_output_feedback(&self) -> Option<bool> {
        let root = Arc::clone(self.root.as_ref()?);
        // X11 replies block; a stuck server must not hold up the caller
        let read = tokio::task::spawn_blocking(move || root.hdr_output_feedback());
        match tokio::time::timeout(timing::HDR_FEEDBACK_TIMEOUT, read).await {
            Ok(Ok(Ok(feedback))) => feedback,
            Ok(Ok(Err(e))) => {
                warn!(error = ?e, "Failed to read HDR output feedback");
                None
            }
            Ok(Err(e)) => {
                warn!(error = ?e, "HDR output feedback task failed");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = timing::HDR_FEEDBACK_TIMEOUT.as_millis() as u64,
                    "HDR output feedback timed out"
                );
                None
            }
        }
    }
}

/// Drives the effect property on a compositor
pub struct Activator<C> {
    compositor: C,
    reload_delay: Duration,
}

impl<C: Compositor> Activator<C> {
    pub fn new(compositor: C) -> Self {
        Self::with_delay(compositor, timing::RELOAD_DELAY)
    }

    pub fn with_delay(compositor: C, reload_delay: Duration) -> Self {
        Self { compositor, reload_delay }
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    /// Make the compositor reload `effect`. Returns whether it stuck.
    pub async fn activate(&self, effect: &str) -> bool {
        let reload = reload_name(effect);
        if let Err(e) = self.compositor.set_effect_property(&reload).await {
            error!(effect = %effect, error = ?e, "Set effect failed");
            return false;
        }

        tokio::time::sleep(self.reload_delay).await;

        match self.compositor.set_effect_property(effect).await {
            Ok(()) => {
                info!(effect = %effect, "Set effect");
                true
            }
            Err(e) => {
                error!(effect = %effect, error = ?e, "Set effect failed");
                false
            }
        }
    }

    /// Set `effect` once, without the reload dance
    pub async fn direct(&self, effect: &str) -> bool {
        match self.compositor.set_effect_property(effect).await {
            Ok(()) => {
                info!(effect = %effect, "Effect set directly");
                true
            }
            Err(e) => {
                error!(effect = %effect, error = ?e, "Direct effect failed");
                false
            }
        }
    }

    /// Unload any effect
    pub async fn clear(&self) -> bool {
        match self.compositor.set_effect_property(gamescope::CLEAR_VALUE).await {
            Ok(()) => {
                info!("Cleared ReShade effect");
                true
            }
            Err(e) => {
                error!(error = ?e, "Clear effect failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingCompositor;

    #[tokio::test]
    async fn test_activate_transits_reload_name() {
        let compositor = RecordingCompositor::default();
        let activator = Activator::with_delay(compositor.clone(), Duration::ZERO);

        assert!(activator.activate("MuraDeck_SDR.fx").await);
        assert_eq!(compositor.sets(), vec!["MuraDeck_SDR_reload.fx", "MuraDeck_SDR.fx"]);
    }

    #[tokio::test]
    async fn test_clear_sets_sentinel_once() {
        let compositor = RecordingCompositor::default();
        let activator = Activator::with_delay(compositor.clone(), Duration::ZERO);

        assert!(activator.clear().await);
        assert_eq!(compositor.sets(), vec!["None"]);
    }

    #[tokio::test]
    async fn test_unreachable_display_has_no_hdr_feedback() {
        let gamescope = Gamescope::new("not-a-display");
        assert!(gamescope.root.is_none());
        assert_eq!(gamescope.hdr_output_feedback().await, None);
    }

    #[tokio::test]
    async fn test_failure_stops_the_sequence() {
        let compositor = RecordingCompositor::failing();
        let activator = Activator::with_delay(compositor.clone(), Duration::ZERO);

        assert!(!activator.activate("MuraDeck_CAS.fx").await);
        // only the first attempt is made
        assert_eq!(compositor.attempts(), 1);
        assert!(compositor.sets().is_empty());
    }
}
