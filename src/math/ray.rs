//! Ray casting through the canvas and against triangles.

use glam::{Mat4, Vec2, Vec3};

const RAY_EPSILON: f32 = 0.000_001;

/// A ray with a normalised direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    #[inline]
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Ray through a canvas pixel, expressed in the space that `clip_from_space`
/// maps into clip space.
///
/// Passing `projection * view * model` yields a model-space ray starting on
/// the near plane. Returns `None` when the matrix is singular.
#[must_use]
pub fn canvas_ray(clip_from_space: &Mat4, canvas_pos: Vec2, width: u32, height: u32) -> Option<Ray> {
    if clip_from_space.determinant().abs() <= f32::EPSILON {
        return None;
    }
    let inverse = clip_from_space.inverse();

    let half_w = width.max(1) as f32 / 2.0;
    let half_h = height.max(1) as f32 / 2.0;
    let clip_x = (canvas_pos.x - half_w) / half_w;
    let clip_y = -(canvas_pos.y - half_h) / half_h;

    let near = inverse.project_point3(Vec3::new(clip_x, clip_y, -1.0));
    let far = inverse.project_point3(Vec3::new(clip_x, clip_y, 1.0));

    let dir = (far - near).try_normalize()?;
    Some(Ray { origin: near, dir })
}

/// Möller–Trumbore intersection; back faces are culled.
///
/// Returns the distance along the ray.
#[must_use]
pub fn ray_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;

    let pvec = ray.dir.cross(edge2);
    let det = edge1.dot(pvec);
    if det < RAY_EPSILON {
        return None;
    }

    let tvec = ray.origin - a;
    let u = tvec.dot(pvec);
    if u < 0.0 || u > det {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.dir.dot(qvec);
    if v < 0.0 || u + v > det {
        return None;
    }

    Some(edge2.dot(qvec) / det)
}

/// Intersection of a ray with the plane through three points.
///
/// Returns `None` when the ray is parallel to the plane or the points are collinear.
#[must_use]
pub fn ray_plane(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    let n = (b - a).cross(c - a).try_normalize()?;
    let denom = ray.dir.dot(n);
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let d = -a.dot(n);
    let t = -(ray.origin.dot(n) + d) / denom;
    Some(ray.at(t))
}

/// Barycentric weights of `p` relative to triangle `abc`, or `None` for a
/// collinear triangle.
#[must_use]
pub fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;

    let dot00 = v0.dot(v0);
    let dot01 = v0.dot(v1);
    let dot02 = v0.dot(v2);
    let dot11 = v1.dot(v1);
    let dot12 = v1.dot(v2);

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom == 0.0 {
        return None;
    }
    let inv = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv;
    let v = (dot00 * dot12 - dot01 * dot02) * inv;

    Some(Vec3::new(1.0 - u - v, v, u))
}
