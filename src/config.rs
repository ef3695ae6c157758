//! Site tunables.
//!
//! Every value has a default matching the shipped stylesheet, so an absent or
//! partial `#site-config` block still yields a usable configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::SiteError;
use crate::sky::SkyConfig;

/// Viewport width (logical px) separating mobile from desktop behaviour.
pub const BREAKPOINT_PX: f64 = 768.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    pub breakpoint_px: f64,
    /// Worst-case entrance duration plus max stagger delay plus a buffer.
    pub entrance_guard_ms: u32,
    pub close_animation_ms: u32,
    pub popup_close_ms: u32,
    pub tab_exit_fallback_ms: u32,
    pub resize_debounce_ms: u32,
    pub default_case_study: String,
    pub entrance_animation: String,
    pub tab_enter_animation: String,
    pub tab_exit_animation: String,
    pub log_level: String,
    pub sky: SkyConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            breakpoint_px: BREAKPOINT_PX,
            entrance_guard_ms: 1400,
            close_animation_ms: 600,
            popup_close_ms: 300,
            tab_exit_fallback_ms: 800,
            resize_debounce_ms: 250,
            default_case_study: "docswell".to_owned(),
            entrance_animation: "modalContainerSlideUp".to_owned(),
            tab_enter_animation: "aboutModalBodyFadeIn".to_owned(),
            tab_exit_animation: "aboutModalBodyFadeOut".to_owned(),
            log_level: "info".to_owned(),
            sky: SkyConfig::default(),
        }
    }
}

impl SiteConfig {
    pub fn from_json(raw: &str) -> Result<Self, SiteError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn classify(&self, width: f64) -> ViewportClass {
        ViewportClass::classify(width, self.breakpoint_px)
    }

    pub fn entrance_guard(&self) -> Duration {
        Duration::from_millis(u64::from(self.entrance_guard_ms))
    }

    pub fn close_animation(&self) -> Duration {
        Duration::from_millis(u64::from(self.close_animation_ms))
    }

    pub fn popup_close(&self) -> Duration {
        Duration::from_millis(u64::from(self.popup_close_ms))
    }

    pub fn tab_exit_fallback(&self) -> Duration {
        Duration::from_millis(u64::from(self.tab_exit_fallback_ms))
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(u64::from(self.resize_debounce_ms))
    }

    /// Parsed `log_level`, falling back to `Info` for unknown names.
    pub fn level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }
}

/// Mobile/desktop classification of the current viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportClass {
    Mobile,
    Desktop,
}

impl ViewportClass {
    pub fn classify(width: f64, breakpoint: f64) -> Self {
        if width < breakpoint {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    pub fn is_mobile(self) -> bool {
        self == Self::Mobile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn breakpoint_is_exclusive_for_mobile() {
        let config = SiteConfig::default();
        assert_eq!(config.classify(767.9), ViewportClass::Mobile);
        assert_eq!(config.classify(768.0), ViewportClass::Desktop);
        assert_eq!(config.classify(1024.0), ViewportClass::Desktop);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SiteConfig::from_json(r#"{ "closeAnimationMs": 450, "sky": { "motionEnabled": true } }"#)
            .unwrap();
        assert_eq!(config.close_animation(), Duration::from_millis(450));
        assert_eq!(config.entrance_guard(), Duration::from_millis(1400));
        assert_eq!(config.resize_debounce(), Duration::from_millis(250));
        assert!(config.sky.motion_enabled);
        assert_eq!(config.default_case_study, "docswell");
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = SiteConfig::from_json("{ breakpointPx: }").unwrap_err();
        assert!(matches!(err, SiteError::Json(_)));
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let config = SiteConfig {
            log_level: "chatty".into(),
            ..SiteConfig::default()
        };
        assert_eq!(config.level(), log::Level::Info);
        let config = SiteConfig {
            log_level: "debug".into(),
            ..SiteConfig::default()
        };
        assert_eq!(config.level(), log::Level::Debug);
    }
}
