//! Math Helpers
//!
//! Thin layer over [`glam`] with the bounding-volume utilities the scene
//! graph needs:
//!
//! - [`Aabb`] / [`Aabb2`]: axis-aligned boxes in 3D and canvas space
//! - [`obb_corners`] / [`transform_obb`]: oriented boxes as eight corners
//! - [`points_to_aabb2`] / [`aabb2_to_canvas`]: projection helpers for 2D boundaries
//! - [`look_at`] / [`normal_matrix`]: view and normal matrices
//!
//! Mesh derivation (normals, tangents, pick primitives) lives in [`mesh`],
//! ray casting in [`ray`].

pub mod mesh;
pub mod ray;

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Sentinel extent used when accumulating boxes from point sets.
pub const AABB_SENTINEL: f32 = 100_000.0;

/// Sentinel extent used when accumulating canvas-space boxes.
const AABB2_SENTINEL: f32 = 10_000_000.0;

// ============================================================================
// Aabb
// ============================================================================

/// Axis-aligned bounding box given by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Inverted box that any point will expand.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(AABB_SENTINEL),
        max: Vec3::splat(-AABB_SENTINEL),
    };

    #[inline]
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing a flat `[x, y, z, x, y, z, ...]` array.
    ///
    /// An empty array yields [`Aabb::EMPTY`].
    #[must_use]
    pub fn from_positions(positions: &[f32]) -> Self {
        let mut aabb = Self::EMPTY;
        for p in positions.chunks_exact(3) {
            aabb.expand_point(Vec3::new(p[0], p[1], p[2]));
        }
        aabb
    }

    /// Smallest box enclosing the given points.
    #[must_use]
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut aabb = Self::EMPTY;
        for &p in points {
            aabb.expand_point(p);
        }
        aabb
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Length of the min→max diagonal.
    #[inline]
    #[must_use]
    pub fn diagonal(&self) -> f32 {
        self.size().length().abs()
    }

    /// `true` when any axis has `max <= min`.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y || self.max.z <= self.min.z
    }

    /// Grows this box to enclose `other`.
    pub fn expand(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn expand_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }
}

// ============================================================================
// Aabb2
// ============================================================================

/// Axis-aligned box in 2D (NDC or canvas pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for Aabb2 {
    fn default() -> Self {
        Self {
            min: Vec2::ZERO,
            max: Vec2::ZERO,
        }
    }
}

impl Aabb2 {
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }
}

// ============================================================================
// Oriented boxes & projection
// ============================================================================

/// Expands an AABB into its eight corners.
#[must_use]
pub fn obb_corners(aabb: &Aabb) -> [Vec3; 8] {
    let (min, max) = (aabb.min, aabb.max);
    [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(max.x, max.y, max.z),
        Vec3::new(min.x, max.y, max.z),
    ]
}

/// Transforms OBB corners by an affine matrix.
#[must_use]
pub fn transform_obb(corners: &[Vec3; 8], matrix: &Mat4) -> [Vec3; 8] {
    corners.map(|c| matrix.transform_point3(c))
}

/// Transforms points by a (possibly projective) matrix, keeping `w`.
#[must_use]
pub fn transform_points_homogeneous(points: &[Vec3], matrix: &Mat4) -> Vec<Vec4> {
    points.iter().map(|p| *matrix * p.extend(1.0)).collect()
}

/// 2D box enclosing homogeneous points after the perspective divide.
///
/// A `w` of exactly zero is treated as one.
#[must_use]
pub fn points_to_aabb2(points: &[Vec4]) -> Aabb2 {
    let mut min = Vec2::splat(AABB2_SENTINEL);
    let mut max = Vec2::splat(-AABB2_SENTINEL);
    for p in points {
        let w = if p.w == 0.0 { 1.0 } else { p.w };
        let xy = Vec2::new(p.x / w, p.y / w);
        min = min.min(xy);
        max = max.max(xy);
    }
    Aabb2 { min, max }
}

/// Maps an NDC box onto canvas pixels (origin top-left, y down on the canvas).
#[must_use]
pub fn aabb2_to_canvas(ndc: &Aabb2, width: u32, height: u32) -> Aabb2 {
    let w = width as f32;
    let h = height as f32;
    let mid_x = w * 0.5;
    let mid_y = h * 0.5;
    Aabb2 {
        min: Vec2::new(
            (ndc.min.x * mid_x + mid_x).floor(),
            h - (ndc.min.y * mid_y + mid_y).floor(),
        ),
        max: Vec2::new(
            (ndc.max.x * mid_x + mid_x).floor(),
            h - (ndc.max.y * mid_y + mid_y).floor(),
        ),
    }
}

// ============================================================================
// Matrices
// ============================================================================

/// Right-handed view matrix looking from `eye` toward `look`.
///
/// Falls back to identity when `eye` and `look` coincide.
#[must_use]
pub fn look_at(eye: Vec3, look: Vec3, up: Vec3) -> Mat4 {
    if (eye - look).length_squared() <= f32::EPSILON {
        return Mat4::IDENTITY;
    }
    Mat4::look_at_rh(eye, look, up)
}

/// Transpose of the inverse, or identity when `m` is singular.
#[must_use]
pub fn normal_matrix(m: &Mat4) -> Mat4 {
    if m.determinant().abs() <= f32::EPSILON {
        return Mat4::IDENTITY;
    }
    m.inverse().transpose()
}

/// Rotation about an arbitrary axis by `degrees`.
///
/// A zero-length axis yields identity.
#[must_use]
pub fn rotation_degrees(degrees: f32, axis: Vec3) -> Mat4 {
    match axis.try_normalize() {
        Some(axis) => Mat4::from_axis_angle(axis, degrees.to_radians()),
        None => Mat4::IDENTITY,
    }
}

/// Cubic Bernstein basis evaluation.
#[inline]
#[must_use]
pub fn bezier3(t: f32, p0: f32, p1: f32, p2: f32, p3: f32) -> f32 {
    let k = 1.0 - t;
    k * k * k * p0 + 3.0 * k * k * t * p1 + 3.0 * k * t * t * p2 + t * t * t * p3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_from_positions_and_diagonal() {
        let aabb = Aabb::from_positions(&[-1.0, -2.0, -3.0, 1.0, 2.0, 3.0]);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
        assert!((aabb.diagonal() - (4.0f32 + 16.0 + 36.0).sqrt()).abs() < 1e-5);
    }

    #[test]
    fn empty_positions_give_degenerate_box() {
        assert!(Aabb::from_positions(&[]).is_degenerate());
    }

    #[test]
    fn ndc_to_canvas_corners() {
        let ndc = Aabb2 {
            min: Vec2::new(-1.0, -1.0),
            max: Vec2::new(1.0, 1.0),
        };
        let px = aabb2_to_canvas(&ndc, 800, 600);
        assert_eq!(px.min, Vec2::new(0.0, 600.0));
        assert_eq!(px.max, Vec2::new(800.0, 0.0));
    }

    #[test]
    fn bezier_endpoints() {
        assert!((bezier3(0.0, 1.0, 5.0, 7.0, 2.0) - 1.0).abs() < 1e-6);
        assert!((bezier3(1.0, 1.0, 5.0, 7.0, 2.0) - 2.0).abs() < 1e-6);
    }
}
