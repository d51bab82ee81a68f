//! In-memory correction state and the uniform values derived from it

use crate::constants::{effects, shader_values};
use crate::profile::{MonitorClass, Profile, ProfileClass};
use crate::shader::{Targets, Uniform, UniformValue};
use crate::tables::ParameterSet;

/// Per profile-class feature switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureToggles {
    pub grain: bool,
    pub lgg: bool,
}

/// Contrast adaptive sharpening
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub enabled: bool,
    pub strength: f64,
}

#[derive(Debug, Clone)]
pub struct CorrectionState {
    pub profile: Profile,
    /// Last brightness reading in percent, unknown until the first one arrives
    pub brightness: Option<u8>,
    /// Parameters most recently written, used to skip redundant patches
    pub last_applied: Option<ParameterSet>,
    /// Sharpening most recently put in place by sharpen-only mode
    pub sharpen_only_applied: Option<Sharpening>,
    pub sdr_toggles: FeatureToggles,
    pub hdr_toggles: FeatureToggles,
    pub sharpening: Sharpening,
    /// Only the sharpen-only artifact is active
    pub cas_only: bool,
    pub external: bool,
    pub current_appid: Option<u32>,
}

impl CorrectionState {
    pub fn new(sdr_toggles: FeatureToggles, hdr_toggles: FeatureToggles, sharpening: Sharpening) -> Self {
        Self {
            profile: Profile::Sdr,
            brightness: None,
            last_applied: None,
            sharpen_only_applied: None,
            sdr_toggles,
            hdr_toggles,
            sharpening,
            cas_only: false,
            external: false,
            current_appid: None,
        }
    }

    /// Toggle group of the current profile
    pub fn toggles(&self) -> FeatureToggles {
        match self.profile.class() {
            ProfileClass::Sdr => self.sdr_toggles,
            ProfileClass::Hdr => self.hdr_toggles,
        }
    }

    pub fn toggles_mut(&mut self) -> &mut FeatureToggles {
        match self.profile.class() {
            ProfileClass::Sdr => &mut self.sdr_toggles,
            ProfileClass::Hdr => &mut self.hdr_toggles,
        }
    }

    pub fn monitor(&self) -> MonitorClass {
        MonitorClass::from_external(self.external)
    }

    /// Artifact that should be loaded right now
    pub fn effect_file(&self) -> &'static str {
        if self.cas_only {
            effects::CAS
        } else {
            self.profile.effect_file()
        }
    }

    /// Force the next derivation to patch and reload again
    pub fn forget_applied(&mut self) {
        self.last_applied = None;
        self.sharpen_only_applied = None;
    }

    /// Change profile, forgetting the applied parameters if it really changed.
    /// Returns whether it changed.
    pub fn switch_profile(&mut self, profile: Profile) -> bool {
        if self.profile == profile {
            return false;
        }
        self.profile = profile;
        self.last_applied = None;
        true
    }

    /// Returns whether sharpening changed. A change invalidates the
    /// applied-parameter memo so the next derivation patches again.
    pub fn set_sharpening(&mut self, sharpening: Sharpening) -> bool {
        if self.sharpening == sharpening {
            return false;
        }
        self.sharpening = sharpening;
        self.forget_applied();
        true
    }

    pub fn set_cas_only(&mut self, cas_only: bool) -> bool {
        if self.cas_only == cas_only {
            return false;
        }
        self.cas_only = cas_only;
        self.forget_applied();
        true
    }

    /// Uniform values for the active artifact. `params` carries the mura
    /// strength and fade; without it those blocks keep their current value.
    pub fn targets(&self, params: Option<ParameterSet>) -> Targets {
        let mut targets = Targets::new();

        targets.insert(Uniform::CasEnabled, UniformValue::Bool(self.sharpening.enabled));
        targets.insert(Uniform::CasSharpness, UniformValue::Float(self.sharpening.strength));

        if self.cas_only {
            return targets;
        }

        if let Some(params) = params {
            targets.insert(Uniform::MuraMapScale, UniformValue::Float(params.strength));
            if let Some(fade) = params.fade {
                targets.insert(Uniform::MuraFadeNearWhite, UniformValue::Float(fade));
            }
        }

        let toggles = self.toggles();
        let neutral = UniformValue::Float(shader_values::NEUTRAL);

        let (grain, lift, gamma) = match self.profile {
            Profile::Sdr => (
                shader_values::GRAIN_ON,
                UniformValue::Float(shader_values::SDR_LIFT),
                UniformValue::Float(shader_values::SDR_GAMMA),
            ),
            Profile::Hdr10Pq => {
                let (r, g, b) = shader_values::HDR10PQ_LIFT;
                (shader_values::GRAIN_ON, UniformValue::Float3(r, g, b), neutral)
            }
            Profile::HdrScRgb => (
                shader_values::GRAIN_ON_SCRGB,
                UniformValue::Float(shader_values::SCRGB_LIFT),
                neutral,
            ),
        };

        let grain = if toggles.grain { grain } else { shader_values::GRAIN_OFF };
        targets.insert(Uniform::GrainIntensity, UniformValue::Float(grain));
        targets.insert(Uniform::RgbLift, if toggles.lgg { lift } else { neutral });
        targets.insert(Uniform::RgbGamma, if toggles.lgg { gamma } else { neutral });

        targets
    }
}
