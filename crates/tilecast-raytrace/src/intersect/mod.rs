//! Ray intersection against the two object shapes: boxes and billboards.
//!
//! Each intersector reports the hit distance, the shading normal and the
//! texture coordinates; [`intersect_object`] dispatches on
//! [`ObjectKind`](tilecast_scene::ObjectKind).

mod billboard;
mod cuboid;

pub use billboard::{billboard_basis, intersect_billboard, BillboardHit};
pub use cuboid::{box_face, box_uv, intersect_box, Face, FACE_EPSILON};

use tilecast_math::{Vec2, Vec3};
use tilecast_scene::{ObjectKind, WorldObject};

use crate::Ray;

/// Where and how a ray met an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Parameter along the ray.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// Unit shading normal.
    pub normal: Vec3,
    /// Texture coordinates in `[0, 1]`.
    pub uv: Vec2,
    /// Box face that was hit (`None` for billboards).
    pub face: Option<Face>,
}

/// Intersect a ray with one object.
pub fn intersect_object(ray: &Ray, object: &WorldObject) -> Option<SurfaceHit> {
    match object.kind {
        ObjectKind::Sprite => {
            let hit = intersect_billboard(ray, object.position(), object.size())?;
            Some(SurfaceHit {
                distance: hit.distance,
                point: ray.at(hit.distance),
                normal: hit.normal,
                uv: hit.uv,
                face: None,
            })
        }
        ObjectKind::Tile | ObjectKind::Object | ObjectKind::Building => {
            let bounds = object.bounds();
            let distance = intersect_box(ray, &bounds)?;
            let point = ray.at(distance);
            let face = box_face(&bounds, &point);
            Some(SurfaceHit {
                distance,
                point,
                normal: face.normal(),
                uv: box_uv(&bounds, &point, face),
                face: Some(face),
            })
        }
    }
}
