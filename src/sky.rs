//! Platform-independent parts of the sky background: tunables, the frame clock
//! and the aspect-correct coordinate mapping the fragment shader mirrors.

use serde::Deserialize;

use crate::config::ViewportClass;

/// Pause token held while motion is disabled.
pub const MOTION_FREEZE_TOKEN: &str = "motionFreeze";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SkyConfig {
    /// The shipped site keeps the sky frozen; motion is opt-in.
    pub motion_enabled: bool,
    /// Fixed per-frame time step (intentionally not wall-clock).
    pub frame_step: f32,
    pub cloud_speed: f32,
    pub cloud_density: f32,
    pub cloud_scale: f32,
    pub parallax_strength: f32,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            motion_enabled: false,
            frame_step: 0.016,
            cloud_speed: 0.15,
            cloud_density: 0.6,
            cloud_scale: 1.5,
            parallax_strength: 0.002,
        }
    }
}

/// Shader time source. Advances by a fixed step per rendered frame.
#[derive(Debug, Clone, Default)]
pub struct SkyClock {
    time: f32,
}

impl SkyClock {
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Time for the next frame; frozen when `advance` is false.
    pub fn tick(&mut self, advance: bool, step: f32) -> f32 {
        if advance {
            self.time += step;
        }
        self.time
    }
}

/// One soft elliptical region where clouds may appear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudBlob {
    pub center: [f32; 2],
    /// Zero disables the blob.
    pub radius: f32,
    pub feather: f32,
    pub ellipse: [f32; 2],
}

/// Layout-dependent shader parameters: the central clearing behind the hero
/// text and the two cloud placement blobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyTuning {
    pub cloud_density: f32,
    pub clear_radius: f32,
    pub clear_feather: f32,
    pub clear_strength: f32,
    pub clear_ellipse: [f32; 2],
    pub blobs: [CloudBlob; 2],
}

impl SkyTuning {
    pub fn for_viewport(viewport: ViewportClass, config: &SkyConfig) -> Self {
        match viewport {
            ViewportClass::Desktop => Self {
                cloud_density: config.cloud_density,
                clear_radius: 0.33,
                clear_feather: 0.22,
                clear_strength: 0.6,
                clear_ellipse: [1.6, 1.0],
                blobs: [
                    CloudBlob {
                        center: [0.08, 0.86],
                        radius: 0.29,
                        feather: 0.22,
                        ellipse: [1.25, 1.0],
                    },
                    CloudBlob {
                        center: [0.88, 0.4],
                        radius: 0.3,
                        feather: 0.24,
                        ellipse: [1.0, 1.1],
                    },
                ],
            },
            // A single wide band around the logo; the right blob is off.
            ViewportClass::Mobile => Self {
                cloud_density: (config.cloud_density + 0.1).min(1.0),
                clear_radius: 0.22,
                clear_feather: 0.22,
                clear_strength: 0.25,
                clear_ellipse: [1.2, 0.9],
                blobs: [
                    CloudBlob {
                        center: [0.22, 0.92],
                        radius: 0.185,
                        feather: 0.12,
                        ellipse: [2.35, 0.72],
                    },
                    CloudBlob {
                        center: [0.86, 0.42],
                        radius: 0.0,
                        feather: 0.0,
                        ellipse: [1.0, 1.1],
                    },
                ],
            },
        }
    }
}

/// Normalized pointer position for parallax, origin bottom-left.
pub fn pointer_uv(x: f64, y: f64, width: f64, height: f64) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.5, 0.5);
    }
    ((x / width) as f32, (1.0 - y / height) as f32)
}

/// Per-axis factors that squash the shorter side so the shader works in a
/// square coordinate space regardless of canvas aspect.
pub fn aspect_scale(width: f64, height: f64) -> (f64, f64) {
    if width <= 0.0 || height <= 0.0 {
        return (1.0, 1.0);
    }
    let m = width.min(height);
    (m / width, m / height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_clock_does_not_advance() {
        let mut clock = SkyClock::default();
        assert_eq!(clock.tick(false, 0.016), 0.0);
        clock.tick(true, 0.016);
        clock.tick(true, 0.016);
        assert!((clock.time() - 0.032).abs() < 1e-6);
        assert!((clock.tick(false, 0.016) - 0.032).abs() < 1e-6);
    }

    #[test]
    fn mobile_tuning_disables_right_blob() {
        let config = SkyConfig::default();
        let mobile = SkyTuning::for_viewport(ViewportClass::Mobile, &config);
        let desktop = SkyTuning::for_viewport(ViewportClass::Desktop, &config);
        assert_eq!(mobile.blobs[1].radius, 0.0);
        assert!(desktop.blobs[1].radius > 0.0);
        assert!(mobile.clear_strength < desktop.clear_strength);
        assert!((mobile.cloud_density - 0.7).abs() < 1e-6);
    }

    #[test]
    fn pointer_is_flipped_vertically() {
        assert_eq!(pointer_uv(0.0, 0.0, 200.0, 100.0), (0.0, 1.0));
        assert_eq!(pointer_uv(100.0, 100.0, 200.0, 100.0), (0.5, 0.0));
        assert_eq!(pointer_uv(10.0, 10.0, 0.0, 100.0), (0.5, 0.5));
    }

    #[test]
    fn degenerate_canvas_has_identity_aspect() {
        assert_eq!(aspect_scale(0.0, 300.0), (1.0, 1.0));
        assert_eq!(aspect_scale(400.0, 200.0), (0.5, 1.0));
    }
}
