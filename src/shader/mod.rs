//! Effect artifact patching
//!
//! Rewrites the recognised uniform declarations of a ReShade effect with new
//! default values and mirrors the result into a reload copy that the
//! activation protocol swaps in to force the compositor to re-read it.

mod parser;

use parser::EffectSource;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::effects;

/// Uniforms the daemon knows how to rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Uniform {
    MuraMapScale,
    MuraFadeNearWhite,
    GrainIntensity,
    RgbLift,
    RgbGamma,
    CasEnabled,
    CasSharpness,
}

/// Static UI annotation regenerated on every patch
struct UiMeta {
    widget: &'static str,
    range: Option<(&'static str, &'static str)>,
    label: &'static str,
    tooltip: &'static str,
}

impl Uniform {
    pub const ALL: [Uniform; 7] = [
        Uniform::MuraMapScale,
        Uniform::MuraFadeNearWhite,
        Uniform::GrainIntensity,
        Uniform::RgbLift,
        Uniform::RgbGamma,
        Uniform::CasEnabled,
        Uniform::CasSharpness,
    ];

    /// Blocks that only exist for panel non-uniformity correction
    #[cfg(test)]
    pub fn is_mura(self) -> bool {
        !matches!(self, Uniform::CasEnabled | Uniform::CasSharpness)
    }

    fn type_name(self) -> &'static str {
        match self {
            Uniform::RgbLift | Uniform::RgbGamma => "float3",
            Uniform::CasEnabled => "bool",
            _ => "float",
        }
    }

    /// Identifier as declared in the effect source
    pub fn name(self) -> &'static str {
        match self {
            Uniform::MuraMapScale => "MuraMapScale",
            Uniform::MuraFadeNearWhite => "MuraFadeNearWhite",
            Uniform::GrainIntensity => "Intensity",
            Uniform::RgbLift => "RGB_Lift",
            Uniform::RgbGamma => "RGB_Gamma",
            Uniform::CasEnabled => "CasEnabled",
            Uniform::CasSharpness => "CasSharpness",
        }
    }

    fn declaration(self) -> String {
        format!("uniform {} {}", self.type_name(), self.name())
    }

    fn meta(self) -> UiMeta {
        match self {
            Uniform::MuraMapScale => UiMeta {
                widget: " __UNIFORM_SLIDER_FLOAT1",
                range: Some(("0.0", "5")),
                label: "Mura Correction Strength",
                tooltip: "Scales how strongly the mura map is applied.",
            },
            Uniform::MuraFadeNearWhite => UiMeta {
                widget: " __UNIFORM_SLIDER_FLOAT1",
                range: Some(("0.1", "20")),
                label: "Mura Fade Near White",
                tooltip: "How quickly the correction fades out on bright pixels.",
            },
            Uniform::GrainIntensity => UiMeta {
                widget: " __UNIFORM_SLIDER_FLOAT1",
                range: Some(("0.0", "1.0")),
                label: "Grain Intensity",
                tooltip: "Dithering grain strength on dark areas.",
            },
            Uniform::RgbLift => UiMeta {
                widget: " __UNIFORM_SLIDER_FLOAT3",
                range: Some(("0.0", "2.0")),
                label: "RGB Lift",
                tooltip: "Adjust shadows.",
            },
            Uniform::RgbGamma => UiMeta {
                widget: " __UNIFORM_SLIDER_FLOAT3",
                range: Some(("0.1", "3.0")),
                label: "RGB Gamma",
                tooltip: "Adjust midtones.",
            },
            Uniform::CasEnabled => UiMeta {
                widget: "",
                range: None,
                label: "Sharpening",
                tooltip: "Contrast adaptive sharpening pass.",
            },
            Uniform::CasSharpness => UiMeta {
                widget: " __UNIFORM_SLIDER_FLOAT1",
                range: Some(("0.0", "1.0")),
                label: "Sharpening Strength",
                tooltip: "Amount of contrast adaptive sharpening.",
            },
        }
    }

    /// Does this line open a declaration of this uniform?
    pub fn opens(self, line: &str) -> bool {
        let decl = self.declaration();
        line.match_indices(&decl).any(|(idx, _)| {
            line[idx + decl.len()..]
                .chars()
                .next()
                .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
        })
    }

    /// Canonical replacement block carrying `value`
    pub fn canonical_block(self, value: &UniformValue) -> String {
        let meta = self.meta();
        let mut block = format!("{} <{}\n", self.declaration(), meta.widget);
        if let Some((min, max)) = meta.range {
            block.push_str(&format!("\tui_min = {min}; ui_max = {max};\n"));
        }
        block.push_str(&format!("\tui_label = \"{}\";\n", meta.label));
        block.push_str(&format!("\tui_tooltip = \"{}\";\n", meta.tooltip));
        block.push_str(&format!("> = {value};\n"));
        block
    }
}

/// Literal written after `> =`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f64),
    Float3(f64, f64, f64),
    Bool(bool),
}

impl fmt::Display for UniformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug keeps the trailing ".0" on whole numbers, which HLSL reads as float
        match self {
            UniformValue::Float(v) => write!(f, "{v:?}"),
            UniformValue::Float3(r, g, b) => write!(f, "float3({r:?}, {g:?}, {b:?})"),
            UniformValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Values to write, keyed by uniform
pub type Targets = BTreeMap<Uniform, UniformValue>;

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("Effect artifact not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Name of the reload copy for an effect file name or path
pub fn reload_name(effect: &str) -> String {
    match effect.strip_suffix(effects::EXTENSION) {
        Some(stem) => format!("{stem}{}{}", effects::RELOAD_SUFFIX, effects::EXTENSION),
        None => format!("{effect}{}", effects::RELOAD_SUFFIX),
    }
}

pub fn reload_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| reload_name(&n.to_string_lossy()))
        .unwrap_or_else(|| reload_name(""));
    path.with_file_name(name)
}

/// Rewrite `targets` inside the artifact at `path`, then refresh its reload copy.
/// Returns the number of blocks replaced.
pub fn patch_file(path: &Path, targets: &Targets) -> Result<usize, PatchError> {
    if !path.is_file() {
        return Err(PatchError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let original = fs::read_to_string(path).map_err(|source| PatchError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })?;

    let (patched, replaced) = EffectSource::parse(&original).render(targets);

    fs::write(path, &patched).map_err(|source| PatchError::Io {
        action: "write",
        path: path.to_path_buf(),
        source,
    })?;

    let reload = reload_path(path);
    fs::copy(path, &reload).map_err(|source| PatchError::Io {
        action: "copy reload artifact to",
        path: reload.clone(),
        source,
    })?;

    debug!(path = %path.display(), reload = %reload.display(), replaced, "Patched effect artifact");
    Ok(replaced)
}
