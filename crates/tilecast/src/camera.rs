//! Per-frame camera value.

use tilecast_math::{up, Mat4, Vec3};

/// View and projection matrices plus the eye position, supplied by the host
/// every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World to view transform.
    pub view: Mat4,
    /// View to clip transform.
    pub projection: Mat4,
    /// World-space eye position.
    pub position: Vec3,
}

impl Camera {
    /// Wrap host-computed matrices.
    pub fn new(view: Mat4, projection: Mat4, position: Vec3) -> Self {
        Self {
            view,
            projection,
            position,
        }
    }

    /// Right-handed perspective camera at `eye` looking at `target`.
    pub fn look_at(eye: Vec3, target: Vec3, aspect: f32, fov_y_degrees: f32) -> Self {
        let view = Mat4::look_at_rh(&eye.into(), &target.into(), &up());
        let projection = Mat4::new_perspective(aspect, fov_y_degrees.to_radians(), 0.05, 10_000.0);
        Self::new(view, projection, eye)
    }

    /// Unit viewing direction in world space.
    pub fn forward(&self) -> Vec3 {
        // The view matrix's third row is the camera's backward axis.
        let back = Vec3::new(self.view[(2, 0)], self.view[(2, 1)], self.view[(2, 2)]);
        (-back).try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::z())
    }

    /// `projection * view`.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forward_points_at_target() {
        let eye = Vec3::new(64.0, 200.0, -100.0);
        let target = Vec3::new(32.0, 0.0, 32.0);
        let camera = Camera::look_at(eye, target, 16.0 / 9.0, 70.0);
        assert_relative_eq!(camera.forward(), (target - eye).normalize(), epsilon = 1e-5);
    }
}
