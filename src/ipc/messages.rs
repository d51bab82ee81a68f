//! IPC message types for host ↔ daemon communication

use clap::{ArgAction, Subcommand};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requests sent from the host (or `mura-deck ctl`) to the daemon
#[derive(Subcommand, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Request {
    /// Health check
    Ping,

    /// Request graceful shutdown
    Shutdown,

    GetEnabled,
    /// Enable or disable all correction
    SetEnabled {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    /// Human readable current profile
    GetDisplayMode,

    /// Set the current effect once, without forcing a reload
    DirectEffect,

    /// Re-apply the current effect after the device wakes
    ResumeFromSuspend,

    /// Feed a brightness reading (percent)
    Brightness { percent: u8 },
    GetBrightnessEnabled,
    SetBrightnessEnabled {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    GetMonitorWatch,
    /// Follow the display manager log for external displays
    SetMonitorWatch {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    GetExternalSharpenOnly,
    /// On an external display keep sharpening only, instead of suspending
    SetExternalSharpenOnly {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    GetGrain,
    SetGrain {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    GetLgg,
    /// Lift/gamma adjustment
    SetLgg {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    GetCas,
    /// Sharpening for the current monitor class
    SetCas {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    GetCasStrength,
    SetCasStrength { strength: f64 },

    GetAppOverride { appid: u32 },
    /// Let an app use its own sharpening settings
    SetAppOverride {
        appid: u32,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    GetAppCas { appid: u32 },
    SetAppCas {
        appid: u32,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    GetAppCasStrength { appid: u32 },
    SetAppCasStrength { appid: u32, strength: f64 },

    /// The focused application changed
    FocusChanged { appid: u32 },
    /// An application started or stopped
    GameState {
        appid: u32,
        #[arg(action = ArgAction::Set)]
        running: bool,
    },

    GetHasSeenWelcome,
    SetHasSeenWelcome {
        #[arg(action = ArgAction::Set)]
        seen: bool,
    },

    /// Whether every shader and texture is installed
    CheckShaderStatus,
    ReinstallShaders,
    /// Remove installed assets and unload the effect
    Uninstall,
}

/// Responses sent from the daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Response {
    /// Request processed, nothing to report
    Ok,

    Bool(bool),

    Number(f64),

    Text(String),

    /// Health check response
    Pong,

    /// Error occurred
    Error(String),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "ok"),
            Response::Bool(v) => write!(f, "{v}"),
            Response::Number(v) => write!(f, "{v}"),
            Response::Text(v) => write!(f, "{v}"),
            Response::Pong => write!(f, "pong"),
            Response::Error(e) => write!(f, "error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Ctl {
        #[command(subcommand)]
        request: Request,
    }

    fn parse(args: &[&str]) -> Request {
        Ctl::try_parse_from(std::iter::once("ctl").chain(args.iter().copied()))
            .unwrap()
            .request
    }

    #[test]
    fn test_command_line_requests() {
        assert_eq!(parse(&["set-enabled", "true"]), Request::SetEnabled { enabled: true });
        assert_eq!(parse(&["brightness", "42"]), Request::Brightness { percent: 42 });
        assert_eq!(
            parse(&["game-state", "1091500", "false"]),
            Request::GameState { appid: 1091500, running: false }
        );
        assert_eq!(
            parse(&["set-app-cas-strength", "570", "0.3"]),
            Request::SetAppCasStrength { appid: 570, strength: 0.3 }
        );
    }

    #[test]
    fn test_brightness_out_of_byte_range_rejected() {
        let err = Ctl::try_parse_from(["ctl", "brightness", "300"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&Request::FocusChanged { appid: 570 }).unwrap();
        assert_eq!(json, r#"{"FocusChanged":{"appid":570}}"#);
        let back: Response = serde_json::from_str(r#"{"Text":"HDR10 PQ"}"#).unwrap();
        assert_eq!(back.to_string(), "HDR10 PQ");
    }
}
