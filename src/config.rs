//! Scene Configuration
//!
//! Tunables that were historically hard-coded inline: canvas size used for
//! 2D boundary projection and picking, default perspective parameters, and
//! the camera-flight timing constants.
//!
//! Every struct implements [`Default`] and deserialises with
//! `#[serde(default)]`, so a JSON document only needs to mention the values
//! it overrides.
//!
//! ```rust,ignore
//! use strata::config::SceneConfig;
//!
//! let config = SceneConfig::from_json_str(r#"{ "canvas": { "width": 1280, "height": 720 } }"#)?;
//! assert_eq!(config.flight.stop_fov, 55.0);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

// ---------------------------------------------------------------------------
// SceneConfig
// ---------------------------------------------------------------------------

/// Top-level configuration consumed by [`Scene::with_config`](crate::Scene::with_config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Canvas pixel dimensions.
    pub canvas: CanvasConfig,
    /// Defaults applied to every new [`CameraFlight`](crate::animation::CameraFlight).
    pub flight: FlightConfig,
    /// Perspective defaults applied to every new camera.
    pub camera: PerspectiveConfig,
    /// When `true`, objects created without a transform/geometry/camera/clips/lights
    /// fall back to lazily created `default.*` components.
    pub auto_defaults: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            flight: FlightConfig::default(),
            camera: PerspectiveConfig::default(),
            auto_defaults: true,
        }
    }
}

impl SceneConfig {
    /// Parses a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Canvas pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

impl CanvasConfig {
    #[inline]
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Camera-flight constants.
///
/// `stop_fov` is fed to `tan(stop_fov / 2)` exactly as given when computing
/// the stand-off distance from a target boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Flight duration in seconds.
    pub duration: f64,
    /// Quadratic ease-out when `true`, linear otherwise.
    pub easing: bool,
    /// Field-of-view constant for stand-off distance.
    pub stop_fov: f32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            duration: 0.5,
            easing: true,
            stop_fov: 55.0,
        }
    }
}

/// Perspective projection defaults (degrees, world units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveConfig {
    pub fovy: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveConfig {
    fn default() -> Self {
        Self {
            fovy: 60.0,
            near: 0.1,
            far: 10000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SceneConfig::from_json_str(r#"{ "canvas": { "width": 1024 } }"#).unwrap();
        assert_eq!(config.canvas.width, 1024);
        assert_eq!(config.canvas.height, 600);
        assert!((config.flight.duration - 0.5).abs() < f64::EPSILON);
        assert!(config.flight.easing);
        assert!(config.auto_defaults);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(SceneConfig::from_json_str("{ canvas: ").is_err());
    }
}
