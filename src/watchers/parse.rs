//! Turning Steam log lines into events

use anyhow::{Context, Result};
use regex::Regex;

use crate::constants::logs;
use crate::profile::Profile;

/// Something the color/game log said
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorEvent {
    AppId(u32),
    Colorspace(Profile),
    GameStopped,
}

/// Matches console and game-process log lines. The first pattern that
/// matches a line decides its event.
pub struct ColorLogParser {
    app_id: Regex,
    colorspace: Regex,
    game_stopped: Regex,
}

impl ColorLogParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            app_id: Regex::new(logs::APP_ID_PATTERN).context("Invalid AppId pattern")?,
            colorspace: Regex::new(logs::COLORSPACE_PATTERN).context("Invalid colorspace pattern")?,
            game_stopped: Regex::new(logs::GAME_STOPPED_PATTERN)
                .context("Invalid game stopped pattern")?,
        })
    }

    pub fn parse(&self, line: &str) -> Option<ColorEvent> {
        if let Some(caps) = self.app_id.captures(line) {
            // out of range ids are not worth a fallback
            return caps[1].parse().ok().map(ColorEvent::AppId);
        }
        if let Some(caps) = self.colorspace.captures(line) {
            return Some(ColorEvent::Colorspace(Profile::from_colorspace(&caps[1])));
        }
        if self.game_stopped.is_match(line) {
            return Some(ColorEvent::GameStopped);
        }
        None
    }
}

/// Matches display manager topology lines
pub struct MonitorLogParser {
    external: Regex,
}

impl MonitorLogParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            external: Regex::new(logs::EXTERNAL_DISPLAY_PATTERN)
                .context("Invalid external display pattern")?,
        })
    }

    /// `Some(true)` when an external display became active
    pub fn parse(&self, line: &str) -> Option<bool> {
        self.external
            .captures(line)
            .map(|caps| &caps[1] == "1")
    }
}
