//! Brightness → correction strength lookup tables
//!
//! Each profile owns a table ordered highest threshold first. A reading picks
//! the first entry whose threshold is strictly below it; the terminal
//! threshold-0 entry catches everything else.

use crate::profile::Profile;

/// Strength of the mura map plus the optional fade-near-white distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    pub strength: f64,
    pub fade: Option<f64>,
}

impl ParameterSet {
    pub const fn new(strength: f64, fade: Option<f64>) -> Self {
        Self { strength, fade }
    }
}

/// One bracket of a brightness table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessEntry {
    pub threshold: u8,
    pub params: ParameterSet,
}

const fn entry(threshold: u8, strength: f64) -> BrightnessEntry {
    BrightnessEntry {
        threshold,
        params: ParameterSet::new(strength, None),
    }
}

const fn entry_with_fade(threshold: u8, strength: f64, fade: f64) -> BrightnessEntry {
    BrightnessEntry {
        threshold,
        params: ParameterSet::new(strength, Some(fade)),
    }
}

pub const SDR_TABLE: [BrightnessEntry; 3] = [
    entry(45, 0.0625),
    entry(40, 0.125),
    entry(0, 0.15),
];

pub const HDR10PQ_TABLE: [BrightnessEntry; 13] = [
    entry_with_fade(75, 0.125, 2.5),
    entry_with_fade(70, 0.15, 3.0),
    entry_with_fade(65, 0.175, 3.5),
    entry_with_fade(60, 0.2, 4.0),
    entry_with_fade(55, 0.25, 4.5),
    entry_with_fade(50, 0.3, 4.75),
    entry_with_fade(45, 0.3, 4.75),
    entry_with_fade(40, 0.3, 4.75),
    entry_with_fade(35, 0.35, 4.5),
    entry_with_fade(30, 0.4, 4.0),
    entry_with_fade(25, 0.45, 3.5),
    entry_with_fade(20, 0.5, 3.0),
    entry_with_fade(0, 0.525, 2.5),
];

pub const HDR_SCRGB_TABLE: [BrightnessEntry; 2] = [
    entry(40, 0.0125),
    entry(0, 0.065),
];

/// Table for a profile
pub fn table(profile: Profile) -> &'static [BrightnessEntry] {
    match profile {
        Profile::Sdr => &SDR_TABLE,
        Profile::Hdr10Pq => &HDR10PQ_TABLE,
        Profile::HdrScRgb => &HDR_SCRGB_TABLE,
    }
}

/// Parameters applied when brightness adaptation is turned off
pub fn static_params(profile: Profile) -> ParameterSet {
    match profile {
        Profile::Sdr => ParameterSet::new(0.0625, None),
        Profile::Hdr10Pq => ParameterSet::new(0.125, Some(2.5)),
        Profile::HdrScRgb => ParameterSet::new(0.0125, None),
    }
}

/// Parameters for a brightness reading (percent)
pub fn lookup(profile: Profile, brightness: u8) -> ParameterSet {
    let entries = table(profile);
    entries
        .iter()
        .find(|e| brightness > e.threshold)
        // a reading of exactly 0 still lands in the catch-all bracket
        .or_else(|| entries.last())
        .map(|e| e.params)
        .unwrap_or_else(|| static_params(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hdr10pq_brackets() {
        assert_eq!(lookup(Profile::Hdr10Pq, 80), ParameterSet::new(0.125, Some(2.5)));
        assert_eq!(lookup(Profile::Hdr10Pq, 72), ParameterSet::new(0.15, Some(3.0)));
        assert_eq!(lookup(Profile::Hdr10Pq, 10), ParameterSet::new(0.525, Some(2.5)));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // 75 is not > 75, so it falls into the 70 bracket
        assert_eq!(lookup(Profile::Hdr10Pq, 75), ParameterSet::new(0.15, Some(3.0)));
        assert_eq!(lookup(Profile::Hdr10Pq, 76), ParameterSet::new(0.125, Some(2.5)));
        assert_eq!(lookup(Profile::Sdr, 45).strength, 0.125);
        assert_eq!(lookup(Profile::Sdr, 46).strength, 0.0625);
    }

    #[test]
    fn test_zero_uses_catch_all() {
        assert_eq!(lookup(Profile::Sdr, 0).strength, 0.15);
        assert_eq!(lookup(Profile::HdrScRgb, 0).strength, 0.065);
        assert_eq!(lookup(Profile::Hdr10Pq, 0), ParameterSet::new(0.525, Some(2.5)));
    }

    #[test]
    fn test_tables_sorted_with_single_terminal_entry() {
        for profile in Profile::ALL {
            let entries = table(profile);
            assert!(entries.windows(2).all(|w| w[0].threshold > w[1].threshold));
            assert_eq!(entries.iter().filter(|e| e.threshold == 0).count(), 1);
            assert_eq!(entries.last().map(|e| e.threshold), Some(0));
        }
    }

    #[test]
    fn test_strength_non_increasing_as_brightness_rises() {
        for profile in Profile::ALL {
            let mut previous = f64::MAX;
            for b in 0..=100u8 {
                let strength = lookup(profile, b).strength;
                assert!(strength <= previous, "{profile} at {b}%");
                previous = strength;
            }
        }
    }

    #[test]
    fn test_fade_only_for_hdr10pq() {
        assert!(lookup(Profile::Sdr, 50).fade.is_none());
        assert!(lookup(Profile::HdrScRgb, 50).fade.is_none());
        assert!(static_params(Profile::Hdr10Pq).fade.is_some());
    }
}
