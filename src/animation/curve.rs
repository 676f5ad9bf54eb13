use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::bezier3;

/// Cubic Bézier curve through four control points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubicBezierCurve {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub v3: Vec3,
    t: f32,
}

impl CubicBezierCurve {
    #[must_use]
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, v3: Vec3) -> Self {
        Self { v0, v1, v2, v3, t: 0.0 }
    }

    #[inline]
    #[must_use]
    pub fn t(&self) -> f32 {
        self.t
    }

    /// Curve parameter, clamped to `[0, 1]`.
    pub fn set_t(&mut self, t: f32) {
        self.t = t.clamp(0.0, 1.0);
    }

    /// Point at the current parameter.
    #[must_use]
    pub fn point(&self) -> Vec3 {
        self.point_at(self.t)
    }

    #[must_use]
    pub fn point_at(&self, t: f32) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        Vec3::new(
            bezier3(t, self.v0.x, self.v1.x, self.v2.x, self.v3.x),
            bezier3(t, self.v0.y, self.v1.y, self.v2.y, self.v3.y),
            bezier3(t, self.v0.z, self.v1.z, self.v2.z, self.v3.z),
        )
    }

    /// Unit tangent at `t`. Zero where the derivative vanishes.
    #[must_use]
    pub fn tangent_at(&self, t: f32) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        let k = 1.0 - t;
        let d = 3.0 * k * k * (self.v1 - self.v0)
            + 6.0 * k * t * (self.v2 - self.v1)
            + 3.0 * t * t * (self.v3 - self.v2);
        d.normalize_or_zero()
    }

    /// `count + 1` evenly spaced points from `t = 0` to `t = 1`.
    #[must_use]
    pub fn points(&self, count: usize) -> Vec<Vec3> {
        let count = count.max(1);
        (0..=count)
            .map(|i| self.point_at(i as f32 / count as f32))
            .collect()
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "v0": self.v0.to_array(),
            "v1": self.v1.to_array(),
            "v2": self.v2.to_array(),
            "v3": self.v3.to_array(),
            "t": self.t,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> CubicBezierCurve {
        CubicBezierCurve::new(
            Vec3::ZERO,
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        )
    }

    #[test]
    fn endpoints_and_midpoint() {
        let mut c = curve();
        assert_eq!(c.point(), Vec3::ZERO);
        c.set_t(1.0);
        assert!((c.point() - Vec3::X).length() < 1e-6);
        // (0 + 3·0 + 3·1 + 1) / 8 = 0.5 and (0 + 3 + 3 + 0) / 8 = 0.75
        c.set_t(0.5);
        assert!((c.point() - Vec3::new(0.5, 0.75, 0.0)).length() < 1e-6);
    }

    #[test]
    fn t_is_clamped() {
        let mut c = curve();
        c.set_t(3.0);
        assert_eq!(c.t(), 1.0);
        c.set_t(-1.0);
        assert_eq!(c.t(), 0.0);
        assert_eq!(c.to_json()["t"], serde_json::json!(0.0));
    }

    #[test]
    fn tangent_starts_towards_first_handle() {
        let c = curve();
        assert!((c.tangent_at(0.0) - Vec3::Y).length() < 1e-6);
        assert_eq!(c.points(4).len(), 5);
    }
}
