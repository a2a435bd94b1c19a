//! Renderer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tilecast_raytrace::bvh::{expected_depth, BvhSettings, MAX_DEPTH};
use tilecast_scene::Light;
use tilecast_world::TileClassification;

use crate::ConfigError;

/// How dynamic actors reach the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorMode {
    /// Actor billboards are merged into the BVH and ray traced; the
    /// hierarchy is rebuilt every frame.
    #[default]
    Traced,
    /// Actors are drawn over the traced image by the sprite compositor; the
    /// hierarchy holds static geometry only and is rebuilt on invalidation.
    Composited,
}

/// Sprite compositor scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorSettings {
    /// Distance at which the scale factor is 1.
    pub scale_numerator: f32,
    /// Screen pixels per texel at scale 1.
    pub pixel_scale: f32,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            scale_numerator: 512.0,
            pixel_scale: 8.0,
        }
    }
}

/// Everything the [`Renderer`](crate::Renderer) is configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Framebuffer width in pixels.
    pub width: u32,
    /// Framebuffer height in pixels.
    pub height: u32,
    /// Objects per BVH leaf.
    pub leaf_threshold: usize,
    /// Ranges at least this large are built in parallel.
    pub parallel_threshold: usize,
    /// Largest scene accepted per frame.
    pub max_objects: usize,
    /// How actors are drawn.
    pub actor_mode: ActorMode,
    /// Scene lights; empty renders unlit.
    pub lights: Vec<Light>,
    /// Sprite compositor scaling.
    pub compositor: CompositorSettings,
    /// Map tile classification table.
    pub classification: TileClassification,
}

impl Default for RendererConfig {
    fn default() -> Self {
        let bvh = BvhSettings::default();
        Self {
            width: 640,
            height: 360,
            leaf_threshold: bvh.leaf_threshold,
            parallel_threshold: bvh.parallel_threshold,
            max_objects: 1 << 20,
            actor_mode: ActorMode::default(),
            lights: vec![Light::sun()],
            compositor: CompositorSettings::default(),
            classification: TileClassification::default(),
        }
    }
}

impl RendererConfig {
    /// Parse and validate a TOML config; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// BVH build settings.
    pub fn bvh_settings(&self) -> BvhSettings {
        BvhSettings {
            leaf_threshold: self.leaf_threshold,
            parallel_threshold: self.parallel_threshold,
        }
    }

    /// Validate settings.
    ///
    /// Rejects a `max_objects` whose hierarchy would be deeper than the
    /// kernel's traversal stack, so that limit is caught at startup rather
    /// than mid-frame.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(
                "width and height must be positive".into(),
            ));
        }
        if self.leaf_threshold == 0 {
            return Err(ConfigError::Invalid(
                "leaf_threshold must be at least 1".into(),
            ));
        }
        if self.max_objects == 0 {
            return Err(ConfigError::Invalid("max_objects must be positive".into()));
        }
        let depth = expected_depth(self.max_objects, self.leaf_threshold);
        if depth > MAX_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "max_objects {} gives BVH depth {depth}, traversal supports {MAX_DEPTH}",
                self.max_objects
            )));
        }
        if self.lights.iter().any(|l| !l.intensity.is_finite() || l.intensity < 0.0) {
            return Err(ConfigError::Invalid(
                "light intensity must be finite and non-negative".into(),
            ));
        }
        let CompositorSettings {
            scale_numerator,
            pixel_scale,
        } = self.compositor;
        if scale_numerator <= 0.0 || pixel_scale <= 0.0 {
            return Err(ConfigError::Invalid(
                "compositor scales must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tilecast_math::{Color, Vec3};

    #[test]
    fn test_defaults_are_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!((config.width, config.height), (640, 360));
        assert_eq!(config.leaf_threshold, 1);
        assert_eq!(config.lights.len(), 1);
    }

    #[test]
    fn test_partial_toml() {
        let config = RendererConfig::from_toml_str(
            r#"
            width = 320
            height = 180
            actor_mode = "composited"

            [classification]
            wall_indices = [1, 2]

            [[lights]]
            directional = true
            direction = [0.0, -1.0, 0.0]
            intensity = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.actor_mode, ActorMode::Composited);
        assert_eq!(config.leaf_threshold, 1);
        assert_eq!(config.lights.len(), 1);
        assert_eq!(config.lights[0].direction(), -Vec3::y());
        assert_eq!(config.classification.wall_property, "Wall");
        assert!(config.classification.wall_indices.contains(&2));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = RendererConfig {
            width: 128,
            actor_mode: ActorMode::Composited,
            ..RendererConfig::default()
        };
        config
            .lights
            .push(Light::point(Vec3::new(64.0, 128.0, 64.0), Color::rgba(255, 200, 100, 255), 1.5));
        let text = config.to_toml_string().unwrap();
        let mut parsed = RendererConfig::from_toml_str(&text).unwrap();

        // Directions are renormalized on load.
        assert_eq!(parsed.lights.len(), 2);
        assert_relative_eq!(parsed.lights[0].direction(), config.lights[0].direction(), epsilon = 1e-6);
        assert_eq!(parsed.lights[1], config.lights[1]);
        parsed.lights = config.lights.clone();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_deep_scenes() {
        let config = RendererConfig {
            max_objects: usize::MAX,
            ..RendererConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let coarse = RendererConfig {
            max_objects: 1 << 40,
            leaf_threshold: 1 << 10,
            ..RendererConfig::default()
        };
        assert!(coarse.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        for config in [
            RendererConfig {
                width: 0,
                ..RendererConfig::default()
            },
            RendererConfig {
                leaf_threshold: 0,
                ..RendererConfig::default()
            },
            RendererConfig {
                compositor: CompositorSettings {
                    pixel_scale: 0.0,
                    ..CompositorSettings::default()
                },
                ..RendererConfig::default()
            },
        ] {
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_malformed_toml() {
        let err = RendererConfig::from_toml_str("width = \"wide\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
