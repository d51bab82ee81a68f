//! Color profiles and the classes used to namespace feature settings

use std::fmt;

use crate::constants::effects;

/// Dynamic range / color space the compositor is currently outputting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Profile {
    #[default]
    Sdr,
    Hdr10Pq,
    HdrScRgb,
}

impl Profile {
    #[cfg(test)]
    pub const ALL: [Profile; 3] = [Profile::Sdr, Profile::Hdr10Pq, Profile::HdrScRgb];

    /// Map a colorspace token from the Steam console log.
    /// Anything unrecognised is treated as SDR.
    pub fn from_colorspace(token: &str) -> Self {
        match token {
            "HDR10_ST2084" => Profile::Hdr10Pq,
            "SRGB_LINEAR" => Profile::HdrScRgb,
            _ => Profile::Sdr,
        }
    }

    /// Effect artifact carrying this profile's correction
    pub fn effect_file(self) -> &'static str {
        match self {
            Profile::Sdr => effects::SDR,
            Profile::Hdr10Pq => effects::HDR10PQ,
            Profile::HdrScRgb => effects::HDR_SCRGB,
        }
    }

    /// HDR10 PQ and scRGB share one set of feature toggles
    pub fn class(self) -> ProfileClass {
        match self {
            Profile::Sdr => ProfileClass::Sdr,
            Profile::Hdr10Pq | Profile::HdrScRgb => ProfileClass::Hdr,
        }
    }

    /// Label shown to the user
    pub fn display_name(self) -> &'static str {
        match self {
            Profile::Sdr => "SDR",
            Profile::Hdr10Pq => "HDR10 PQ",
            Profile::HdrScRgb => "HDR scRGB",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Profile::Sdr => "SDR",
            Profile::Hdr10Pq => "HDR10PQ",
            Profile::HdrScRgb => "HDRscRGB",
        };
        f.write_str(name)
    }
}

/// Toggle group a profile belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileClass {
    Sdr,
    Hdr,
}

impl ProfileClass {
    /// Suffix used in settings keys
    pub fn key_suffix(self) -> &'static str {
        match self {
            ProfileClass::Sdr => "sdr",
            ProfileClass::Hdr => "hdr",
        }
    }
}

/// Which panel the image ends up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorClass {
    Internal,
    External,
}

impl MonitorClass {
    pub fn from_external(external: bool) -> Self {
        if external {
            MonitorClass::External
        } else {
            MonitorClass::Internal
        }
    }

    /// Suffix used in settings keys
    pub fn key_suffix(self) -> &'static str {
        match self {
            MonitorClass::Internal => "internal",
            MonitorClass::External => "external",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorspace_tokens_map_to_profiles() {
        assert_eq!(Profile::from_colorspace("HDR10_ST2084"), Profile::Hdr10Pq);
        assert_eq!(Profile::from_colorspace("SRGB_LINEAR"), Profile::HdrScRgb);
        assert_eq!(Profile::from_colorspace("SRGB_NONLINEAR"), Profile::Sdr);
        assert_eq!(Profile::from_colorspace("DISPLAY_P3"), Profile::Sdr);
    }

    #[test]
    fn test_hdr_profiles_share_a_class() {
        assert_eq!(Profile::Hdr10Pq.class(), Profile::HdrScRgb.class());
        assert_ne!(Profile::Sdr.class(), Profile::Hdr10Pq.class());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Profile::Sdr.display_name(), "SDR");
        assert_eq!(Profile::Hdr10Pq.display_name(), "HDR10 PQ");
        assert_eq!(Profile::HdrScRgb.display_name(), "HDR scRGB");
        assert_eq!(Profile::HdrScRgb.to_string(), "HDRscRGB");
    }
}
