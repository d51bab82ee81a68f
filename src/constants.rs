//! Application-wide constants
//!
//! File names, property names, log patterns and the fixed shader values the
//! daemon writes into effect artifacts.

/// Effect artifact file names (relative to the ReShade shader directory)
pub mod effects {
    pub const SDR: &str = "MuraDeck_SDR.fx";
    pub const HDR10PQ: &str = "MuraDeck_HDR10PQ.fx";
    pub const HDR_SCRGB: &str = "MuraDeck_HDRscRGB.fx";

    /// Sharpen-only artifact used while an external display is connected
    pub const CAS: &str = "MuraDeck_CAS.fx";

    /// Inserted before the extension to name the reload copy of an artifact
    pub const RELOAD_SUFFIX: &str = "_reload";

    /// Extension shared by every effect artifact
    pub const EXTENSION: &str = ".fx";
}

/// Bundled shader and texture assets
pub mod assets {
    pub const SHADER_FILES: [&str; 6] = [
        super::effects::SDR,
        super::effects::HDR10PQ,
        super::effects::HDR_SCRGB,
        super::effects::CAS,
        "ReShade.fxh",
        "ReShadeUI.fxh",
    ];

    pub const GREEN_TEXTURE: &str = "green.png";
    pub const RED_TEXTURE: &str = "red.png";
    pub const TEXTURE_FILES: [&str; 2] = [GREEN_TEXTURE, RED_TEXTURE];

    /// Helpers shipped by the OS that extract the factory mura maps
    pub const SETUP_COMMANDS: [&str; 2] = ["galileo-mura-extractor", "galileo-mura-setup"];

    /// Permission bits for installed shader files
    pub const SHADER_MODE: u32 = 0o644;
}

/// Gamescope root window properties
pub mod gamescope {
    /// Property the compositor watches to load a ReShade effect
    pub const EFFECT_PROPERTY: &str = "GAMESCOPE_RESHADE_EFFECT";

    /// Cardinal set by the compositor when the output accepts HDR content
    pub const HDR_FEEDBACK_PROPERTY: &str = "GAMESCOPE_HDR_OUTPUT_FEEDBACK";

    /// Property format understood by xprop (8-bit unsigned list)
    pub const PROPERTY_FORMAT: &str = "8u";

    /// Value that unloads any effect
    pub const CLEAR_VALUE: &str = "None";

    pub const DEFAULT_DISPLAY: &str = ":0";

    /// Command line tool used to set root window properties
    pub const XPROP: &str = "xprop";
}

/// Timing of the activation protocol and teardown
pub mod timing {
    use std::time::Duration;

    /// Pause between the reload value and the real effect name
    pub const RELOAD_DELAY: Duration = Duration::from_millis(500);

    /// Upper bound on the final clear during teardown
    pub const TEARDOWN_CLEAR_TIMEOUT: Duration = Duration::from_secs(2);

    /// Upper bound on reading the HDR output feedback property
    pub const HDR_FEEDBACK_TIMEOUT: Duration = Duration::from_millis(500);
}

/// Steam client log files and the patterns matched in them
pub mod logs {
    pub const CONSOLE: &str = "console-linux.txt";
    pub const GAME_PROCESS: &str = "gameprocess_log.txt";
    pub const DISPLAY_MANAGER: &str = "systemdisplaymanager.txt";

    /// Follows files across rotation
    pub const TAIL: &str = "tail";

    pub const APP_ID_PATTERN: &str = r"AppId=(\d+)";
    pub const COLORSPACE_PATTERN: &str = r"colorspace:.*(HDR10_ST2084|SRGB_NONLINEAR|SRGB_LINEAR)";
    pub const GAME_STOPPED_PATTERN: &str = r"game stopped";
    pub const EXTERNAL_DISPLAY_PATTERN: &str = r"OnScreenChanged:\s+gamescope event external: (\d)";
}

/// Fixed uniform values written for each profile class
pub mod shader_values {
    /// Grain intensity when dithering is on (SDR and HDR10 PQ)
    pub const GRAIN_ON: f64 = 0.01;
    /// scRGB works in linear light and needs a far stronger grain
    pub const GRAIN_ON_SCRGB: f64 = 3.0;
    pub const GRAIN_OFF: f64 = 0.0;

    /// Neutral lift and gamma
    pub const NEUTRAL: f64 = 1.0;

    pub const SDR_LIFT: f64 = 0.95;
    pub const SDR_GAMMA: f64 = 0.98;

    pub const SCRGB_LIFT: f64 = 0.99995;

    /// HDR10 PQ only pulls down the green channel of the lift
    pub const HDR10PQ_LIFT: (f64, f64, f64) = (1.0, 0.99, 1.0);
}

/// Settings defaults applied when a key has never been written
pub mod defaults {
    pub const SHARPNESS: f64 = 0.5;
    pub const SHARPNESS_MIN: f64 = 0.0;
    pub const SHARPNESS_MAX: f64 = 1.0;
}

/// Configuration directory and file names
pub mod config {
    pub const APP_DIR: &str = "mura-deck";
    pub const FILENAME: &str = "settings.json";

    /// Set by the plugin host to point at the plugin's settings directory
    pub const SETTINGS_DIR_ENV: &str = "DECKY_PLUGIN_SETTINGS_DIR";

    pub const SOCKET_NAME: &str = "daemon.sock";
}
