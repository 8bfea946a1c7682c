// Configuration, fixed at construction. Loaded from TOML; every field has a default
// matching the stock demo so an empty file (or no file) runs as-is.

use crate::error::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Accumulation ramp timing (seconds).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MaskAccumulationConfig {
    pub animation_intro_length: f32,
    pub animation_gain_length: f32,
    pub skip_intro_during_first_cycle: bool,
}

impl Default for MaskAccumulationConfig {
    fn default() -> Self {
        Self {
            animation_intro_length: 0.75,
            animation_gain_length: 3.0,
            skip_intro_during_first_cycle: true,
        }
    }
}

/// Pulsing "show me your hand" cue timing (seconds).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct OnboardingTextConfig {
    pub opacity_animation_intro_length: f32,
    pub opacity_animation_loop_length: f32,
}

impl Default for OnboardingTextConfig {
    fn default() -> Self {
        Self { opacity_animation_intro_length: 1.0, opacity_animation_loop_length: 2.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub viewport_width: usize,
    pub viewport_height: usize,
    /// Vertical field of view in degrees.
    pub vertical_fov: f32,
    pub near: f32,
    pub far: f32,
    /// Layer indices are valid in `[-num_layers_upper_bound, num_layers_upper_bound)`.
    pub num_layers_upper_bound: i32,
    pub hand_mask_radius_factor: f32,
    pub hand_hint_radius_factor: f32,
    /// Hands are ignored for this long after the first render.
    pub ignore_hands_intro_length: f32,
    pub distortion_strength: f32,
    pub mask_accumulation: MaskAccumulationConfig,
    pub onboarding_text: OnboardingTextConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            vertical_fov: 45.0,
            near: 1.0,
            far: 100.0,
            num_layers_upper_bound: 16,
            hand_mask_radius_factor: 2.5,
            hand_hint_radius_factor: 2.0,
            ignore_hands_intro_length: 2.0,
            distortion_strength: 0.5,
            mask_accumulation: MaskAccumulationConfig::default(),
            onboarding_text: OnboardingTextConfig::default(),
        }
    }
}

/// Temporal filter settings. The viewport size is taken from [`RenderConfig`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub low_pass_alpha: f32,
    pub hand_detection_lifetime_threshold: u32,
    pub hand_detection_presence_threshold: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_pass_alpha: 0.8,
            hand_detection_lifetime_threshold: 3,
            hand_detection_presence_threshold: 3,
        }
    }
}

/// Options handed to the hand tracking source.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerOptions {
    pub selfie_mode: bool,
    pub max_hands: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            selfie_mode: true,
            max_hands: 1,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.9,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding the frost/hand/onboarding textures.
    pub dir: Option<PathBuf>,
    /// Synthesize any texture whose file is missing.
    pub procedural_fallback: bool,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self { dir: None, procedural_fallback: true }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { index: 0, width: 1280, height: 720 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub effect: RenderConfig,
    pub filter: FilterConfig,
    pub tracker: TrackerOptions,
    pub assets: AssetConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let cfg: AppConfig =
            toml::from_str(text).map_err(|e| Error::Config(format!("parse: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the effect cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        let e = &self.effect;
        let bad = |msg: &str| Err(Error::Config(msg.to_string()));
        if e.viewport_width == 0 || e.viewport_height == 0 {
            return bad("viewport size must be positive");
        }
        if !(e.vertical_fov > 0.0 && e.vertical_fov < 180.0) {
            return bad("vertical_fov must be in (0, 180) degrees");
        }
        if !(e.near > 0.0 && e.near < e.far) {
            return bad("need 0 < near < far");
        }
        if e.num_layers_upper_bound <= 0 {
            return bad("num_layers_upper_bound must be positive");
        }
        if e.hand_mask_radius_factor <= 0.0 || e.hand_hint_radius_factor <= 0.0 {
            return bad("radius factors must be positive");
        }
        if e.ignore_hands_intro_length < 0.0
            || e.mask_accumulation.animation_intro_length < 0.0
            || e.onboarding_text.opacity_animation_intro_length < 0.0
        {
            return bad("intro lengths must not be negative");
        }
        if e.mask_accumulation.animation_gain_length <= 0.0
            || e.onboarding_text.opacity_animation_loop_length <= 0.0
        {
            return bad("gain and loop lengths must be positive");
        }
        let f = &self.filter;
        if !(f.low_pass_alpha > 0.0 && f.low_pass_alpha < 1.0) {
            return bad("low_pass_alpha must be in (0, 1)");
        }
        if f.hand_detection_lifetime_threshold == 0 || f.hand_detection_presence_threshold == 0 {
            return bad("hand detection thresholds must be positive");
        }
        if self.tracker.max_hands == 0 {
            return bad("max_hands must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_stock_demo() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.effect.viewport_width, 1280);
        assert_eq!(cfg.filter.hand_detection_presence_threshold, 3);
        assert!(cfg.effect.mask_accumulation.skip_intro_during_first_cycle);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml(
            "[effect]\nviewport_width = 640\nviewport_height = 480\n\
             [effect.onboarding_text]\nopacity_animation_loop_length = 4.0\n\
             [filter]\nlow_pass_alpha = 0.5\n",
        )
        .unwrap();
        assert_eq!(cfg.effect.viewport_width, 640);
        assert_eq!(cfg.effect.vertical_fov, 45.0);
        assert_eq!(cfg.effect.onboarding_text.opacity_animation_loop_length, 4.0);
        assert_eq!(cfg.effect.onboarding_text.opacity_animation_intro_length, 1.0);
        assert_eq!(cfg.filter.low_pass_alpha, 0.5);
    }

    #[test]
    fn rejects_alpha_outside_open_interval() {
        assert!(matches!(
            AppConfig::from_toml("[filter]\nlow_pass_alpha = 1.0\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn rejects_inverted_depth_range() {
        assert!(AppConfig::from_toml("[effect]\nnear = 10.0\nfar = 5.0\n").is_err());
    }

    #[test]
    fn rejects_zero_thresholds() {
        assert!(AppConfig::from_toml("[filter]\nhand_detection_lifetime_threshold = 0\n").is_err());
    }

    #[test]
    fn shipped_config_matches_defaults() {
        assert_eq!(AppConfig::from_toml(include_str!("../frost.toml")).unwrap(), AppConfig::default());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(AppConfig::from_toml("[effect"), Err(Error::Config(_))));
    }
}
