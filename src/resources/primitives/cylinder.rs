use std::f32::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::resources::geometry::{GeometryDesc, Primitive};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CylinderOptions {
    pub radius_top: f32,
    pub radius_bottom: f32,
    pub height: f32,
    pub radial_segments: u32,
    pub height_segments: u32,
    /// Leaves out both caps.
    pub open_ended: bool,
}

impl Default for CylinderOptions {
    fn default() -> Self {
        Self {
            radius_top: 1.0,
            radius_bottom: 1.0,
            height: 1.0,
            radial_segments: 60,
            height_segments: 1,
            open_ended: false,
        }
    }
}

/// Cylinder (or cone frustum) along Y, centred on the origin.
///
/// The seam column is duplicated so `u` runs 0..1 around the side. Caps get
/// their own ring of vertices with flat normals and are skipped for a zero
/// radius. Triangles wind counter-clockwise seen from outside.
#[must_use]
pub fn create_cylinder(options: CylinderOptions) -> GeometryDesc {
    let radius_top = options.radius_top.abs();
    let radius_bottom = options.radius_bottom.abs();
    let height = options.height.abs();
    let radial = options.radial_segments.max(3);
    let rows = options.height_segments.max(1);
    let half = height / 2.0;
    let stride = radial + 1;

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uv = Vec::new();
    let mut indices = Vec::new();

    // Side. Rows run top to bottom.
    let slope = if height > 0.0 { (radius_bottom - radius_top) / height } else { 0.0 };
    for row in 0..=rows {
        let f = row as f32 / rows as f32;
        let radius = radius_top + (radius_bottom - radius_top) * f;
        let y = half - height * f;
        for i in 0..=radial {
            let u = i as f32 / radial as f32;
            let (sin, cos) = (u * TAU).sin_cos();
            positions.extend_from_slice(&[radius * sin, y, radius * cos]);
            normals.extend_from_slice(&Vec3::new(sin, slope, cos).normalize().to_array());
            uv.extend_from_slice(&[u, 1.0 - f]);
        }
    }
    for row in 0..rows {
        for i in 0..radial {
            let top = row * stride + i;
            let bottom = top + stride;
            indices.extend_from_slice(&[top, bottom, bottom + 1, top, bottom + 1, top + 1]);
        }
    }

    if !options.open_ended {
        for (radius, y, up) in [(radius_top, half, true), (radius_bottom, -half, false)] {
            if radius <= 0.0 {
                continue;
            }
            let normal = if up { Vec3::Y } else { Vec3::NEG_Y };
            let center = (positions.len() / 3) as u32;
            positions.extend_from_slice(&[0.0, y, 0.0]);
            normals.extend_from_slice(&normal.to_array());
            uv.extend_from_slice(&[0.5, 0.5]);
            for i in 0..=radial {
                let (sin, cos) = (i as f32 / radial as f32 * TAU).sin_cos();
                positions.extend_from_slice(&[radius * sin, y, radius * cos]);
                normals.extend_from_slice(&normal.to_array());
                uv.extend_from_slice(&[0.5 + 0.5 * sin, 0.5 + 0.5 * cos]);
            }
            for i in 0..radial {
                let first = center + 1 + i;
                if up {
                    indices.extend_from_slice(&[center, first, first + 1]);
                } else {
                    indices.extend_from_slice(&[center, first + 1, first]);
                }
            }
        }
    }

    GeometryDesc {
        primitive: Some(Primitive::Triangles),
        positions: Some(positions),
        normals: Some(normals),
        uv: Some(uv),
        indices: Some(indices),
        ..GeometryDesc::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cylinder_vertex_and_index_counts() {
        let cylinder = create_cylinder(CylinderOptions {
            radial_segments: 8,
            height_segments: 2,
            ..Default::default()
        });
        let side = 3 * 9;
        let caps = 2 * (1 + 9);
        assert_eq!(cylinder.positions.unwrap().len(), (side + caps) * 3);
        assert_eq!(cylinder.uv.unwrap().len(), (side + caps) * 2);
        assert_eq!(cylinder.indices.unwrap().len(), 2 * 8 * 6 + 2 * 8 * 3);
    }

    #[test]
    fn open_ended_and_pointed_ends_have_no_caps() {
        let open = create_cylinder(CylinderOptions {
            radial_segments: 4,
            open_ended: true,
            ..Default::default()
        });
        assert_eq!(open.indices.unwrap().len(), 4 * 6);

        let cone = create_cylinder(CylinderOptions {
            radius_top: 0.0,
            radial_segments: 4,
            ..Default::default()
        });
        assert_eq!(cone.indices.unwrap().len(), 4 * 6 + 4 * 3);
    }

    #[test]
    fn segment_counts_are_clamped() {
        let cylinder = create_cylinder(CylinderOptions {
            radial_segments: 1,
            height_segments: 0,
            open_ended: true,
            ..Default::default()
        });
        assert_eq!(cylinder.positions.unwrap().len(), 2 * 4 * 3);
    }

    #[test]
    fn cylinder_triangles_face_outwards() {
        let cylinder = create_cylinder(CylinderOptions {
            radius_top: 0.5,
            radial_segments: 12,
            ..Default::default()
        });
        let positions = cylinder.positions.unwrap();
        let at = |i: u32| Vec3::from_slice(&positions[i as usize * 3..i as usize * 3 + 3]);
        for tri in cylinder.indices.unwrap().chunks_exact(3) {
            let (a, b, c) = (at(tri[0]), at(tri[1]), at(tri[2]));
            let n = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(n.dot(centroid) > 0.0, "inward triangle {tri:?}");
        }
    }
}
