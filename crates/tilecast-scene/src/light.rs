//! Point and directional lights.

use serde::{Deserialize, Serialize};
use tilecast_math::{Color, Vec3};

/// A light source; directional lights carry a unit direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "LightDef", into = "LightDef")]
pub struct Light {
    /// World position (point lights).
    pub position: Vec3,
    /// Light color.
    pub color: Color,
    /// Scalar multiplier on diffuse and specular terms.
    pub intensity: f32,
    /// True for sun-like lights without attenuation.
    pub directional: bool,
    direction: Vec3,
}

impl Light {
    /// A point light with distance attenuation.
    pub fn point(position: Vec3, color: Color, intensity: f32) -> Self {
        Self {
            position,
            color,
            intensity,
            directional: false,
            direction: Vec3::zeros(),
        }
    }

    /// A directional light travelling along `direction`.
    ///
    /// A zero vector falls back to straight down.
    pub fn directional(direction: Vec3, color: Color, intensity: f32) -> Self {
        Self {
            position: Vec3::zeros(),
            color,
            intensity,
            directional: true,
            direction: direction
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(|| -Vec3::y()),
        }
    }

    /// Unit travel direction (zero for point lights).
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// The default sun: white, slightly tilted, intensity 1.
    pub fn sun() -> Self {
        Self::directional(Vec3::new(-0.3, -1.0, -0.2), Color::WHITE, 1.0)
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct LightDef {
    #[serde(default)]
    position: [f32; 3],
    #[serde(default = "white")]
    color: [u8; 4],
    #[serde(default = "one")]
    intensity: f32,
    #[serde(default)]
    directional: bool,
    #[serde(default)]
    direction: [f32; 3],
}

fn white() -> [u8; 4] {
    Color::WHITE.to_array()
}

fn one() -> f32 {
    1.0
}

impl From<LightDef> for Light {
    fn from(def: LightDef) -> Self {
        let color = Color::from(def.color);
        if def.directional {
            Light::directional(Vec3::from(def.direction), color, def.intensity)
        } else {
            Light::point(Vec3::from(def.position), color, def.intensity)
        }
    }
}

impl From<Light> for LightDef {
    fn from(light: Light) -> Self {
        Self {
            position: light.position.into(),
            color: light.color.to_array(),
            intensity: light.intensity,
            directional: light.directional,
            direction: light.direction.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_directional_is_normalized() {
        let light = Light::directional(Vec3::new(0.0, -10.0, 0.0), Color::WHITE, 2.0);
        assert_relative_eq!(light.direction(), -Vec3::y());
        assert!(light.directional);
    }

    #[test]
    fn test_zero_direction_falls_back_down() {
        let light = Light::directional(Vec3::zeros(), Color::WHITE, 1.0);
        assert_relative_eq!(light.direction(), -Vec3::y());
    }

    #[test]
    fn test_point_light() {
        let light = Light::point(Vec3::new(1.0, 2.0, 3.0), Color::RED, 0.5);
        assert!(!light.directional);
        assert_eq!(light.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_sun_direction_points_down() {
        assert!(Light::sun().direction().y < 0.0);
        assert_relative_eq!(Light::sun().direction().norm(), 1.0, epsilon = 1e-6);
    }
}
