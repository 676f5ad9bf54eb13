//! Pull-validated bounding volumes.
//!
//! A boundary never watches its source. Every getter first asks the source
//! whether it is dirty and, if so, recomputes everything once from the
//! source's current input. The owner decides the policy: a one-shot latch
//! ([`DirtyLatch`]) caches until the next invalidation, an always-true
//! predicate recomputes on every read.

use std::cell::Cell;

use glam::{Mat4, Vec2, Vec3};

use crate::math::{
    Aabb, Aabb2, aabb2_to_canvas, obb_corners, points_to_aabb2, transform_obb,
    transform_points_homogeneous,
};

/// A boolean flag that reports `true` once per invalidation.
#[derive(Debug)]
pub struct DirtyLatch(Cell<bool>);

impl Default for DirtyLatch {
    fn default() -> Self {
        Self(Cell::new(true))
    }
}

impl DirtyLatch {
    /// Sets the latch. Returns `true` if it was previously clear.
    pub fn set(&self) -> bool {
        !self.0.replace(true)
    }

    /// Clears the latch, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.replace(false)
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.get()
    }
}

// ============================================================================
// 3D
// ============================================================================

/// Data a [`Boundary3D`] can be recomputed from.
#[derive(Debug, Clone, Copy)]
pub enum Boundary3DInput<'a> {
    /// Flat `[x, y, z, ...]` positions.
    Positions(&'a [f32]),
    /// An oriented box, given as eight corners, and a matrix to apply to it.
    Obb { corners: [Vec3; 8], matrix: Mat4 },
    /// A precomputed axis-aligned box.
    Aabb(Aabb),
}

pub trait BoundarySource {
    /// Returns `true` when the cached volume must be recomputed.
    fn take_dirty(&self) -> bool;
    /// Current input. Only called after `take_dirty` returned `true`.
    fn input(&self) -> Boundary3DInput<'_>;
}

#[derive(Debug)]
pub struct Boundary3D {
    aabb: Cell<Aabb>,
    obb: Cell<[Vec3; 8]>,
    center: Cell<Vec3>,
    recomputes: Cell<u64>,
}

impl Default for Boundary3D {
    fn default() -> Self {
        Self {
            aabb: Cell::new(Aabb::EMPTY),
            obb: Cell::new([Vec3::ZERO; 8]),
            center: Cell::new(Vec3::ZERO),
            recomputes: Cell::new(0),
        }
    }
}

impl Boundary3D {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn refresh(&self, source: &impl BoundarySource) {
        if !source.take_dirty() {
            return;
        }
        let (aabb, obb) = match source.input() {
            Boundary3DInput::Positions(positions) => {
                let aabb = Aabb::from_positions(positions);
                (aabb, obb_corners(&aabb))
            }
            Boundary3DInput::Obb { corners, matrix } => {
                let obb = transform_obb(&corners, &matrix);
                (Aabb::from_points(&obb), obb)
            }
            Boundary3DInput::Aabb(aabb) => (aabb, obb_corners(&aabb)),
        };
        self.aabb.set(aabb);
        self.obb.set(obb);
        self.center.set(aabb.center());
        self.recomputes.set(self.recomputes.get() + 1);
    }

    #[must_use]
    pub fn aabb(&self, source: &impl BoundarySource) -> Aabb {
        self.refresh(source);
        self.aabb.get()
    }

    #[must_use]
    pub fn obb(&self, source: &impl BoundarySource) -> [Vec3; 8] {
        self.refresh(source);
        self.obb.get()
    }

    #[must_use]
    pub fn center(&self, source: &impl BoundarySource) -> Vec3 {
        self.refresh(source);
        self.center.get()
    }

    /// How many times this boundary has recomputed.
    #[must_use]
    pub fn recomputes(&self) -> u64 {
        self.recomputes.get()
    }
}

// ============================================================================
// 2D
// ============================================================================

/// Projects an oriented box into canvas pixels.
pub trait Boundary2DSource {
    fn take_dirty(&self) -> bool;
    fn obb(&self) -> [Vec3; 8];
    fn view_projection(&self) -> Mat4;
    /// Canvas size in pixels.
    fn canvas(&self) -> (u32, u32);
}

#[derive(Debug, Default)]
pub struct Boundary2D {
    aabb: Cell<Aabb2>,
    center: Cell<Vec2>,
}

impl Boundary2D {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn refresh(&self, source: &impl Boundary2DSource) {
        if !source.take_dirty() {
            return;
        }
        let clip = transform_points_homogeneous(&source.obb(), &source.view_projection());
        let ndc = points_to_aabb2(&clip);
        let (width, height) = source.canvas();
        let aabb = aabb2_to_canvas(&ndc, width, height);
        self.aabb.set(aabb);
        self.center.set(aabb.center());
    }

    #[must_use]
    pub fn aabb(&self, source: &impl Boundary2DSource) -> Aabb2 {
        self.refresh(source);
        self.aabb.get()
    }

    #[must_use]
    pub fn center(&self, source: &impl Boundary2DSource) -> Vec2 {
        self.refresh(source);
        self.center.get()
    }
}
