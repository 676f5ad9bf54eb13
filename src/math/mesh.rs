//! Per-vertex data derived from positions and indices.
//!
//! All arrays are flat (`[x, y, z, x, y, z, ...]`). Out-of-range indices are
//! skipped rather than trusted, so malformed input degrades to zero vectors
//! instead of panicking.

use glam::{Vec2, Vec3};

#[inline]
fn vec3_at(data: &[f32], index: usize) -> Option<Vec3> {
    let start = index * 3;
    data.get(start..start + 3).map(|s| Vec3::new(s[0], s[1], s[2]))
}

#[inline]
fn vec2_at(data: &[f32], index: usize) -> Option<Vec2> {
    let start = index * 2;
    data.get(start..start + 2).map(|s| Vec2::new(s[0], s[1]))
}

/// Averages the unit face normals of every triangle touching each vertex.
///
/// Vertices not referenced by any triangle get a zero normal.
#[must_use]
pub fn build_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut sums = vec![Vec3::ZERO; vertex_count];
    let mut counts = vec![0u32; vertex_count];

    for tri in indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (Some(v0), Some(v1), Some(v2)) = (
            vec3_at(positions, i0),
            vec3_at(positions, i1),
            vec3_at(positions, i2),
        ) else {
            continue;
        };

        let n = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        for i in [i0, i1, i2] {
            sums[i] += n;
            counts[i] += 1;
        }
    }

    sums.iter()
        .zip(&counts)
        .flat_map(|(sum, &count)| {
            let n = if count == 0 { Vec3::ZERO } else { *sum / count as f32 };
            n.to_array()
        })
        .collect()
}

/// Builds per-vertex tangents from positions, uv and indices.
///
/// Contributions from every triangle sharing a vertex are summed. Triangles
/// with degenerate uv mapping contribute nothing.
#[must_use]
pub fn build_tangents(positions: &[f32], indices: &[u32], uv: &[f32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut tangents = vec![Vec3::ZERO; vertex_count];

    for tri in indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (Some(v0), Some(v1), Some(v2), Some(uv0), Some(uv1), Some(uv2)) = (
            vec3_at(positions, i0),
            vec3_at(positions, i1),
            vec3_at(positions, i2),
            vec2_at(uv, i0),
            vec2_at(uv, i1),
            vec2_at(uv, i2),
        ) else {
            continue;
        };

        let delta_pos1 = v1 - v0;
        let delta_pos2 = v2 - v0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) / det;

        for i in [i0, i1, i2] {
            tangents[i] += tangent;
        }
    }

    tangents.iter().flat_map(|t| t.to_array()).collect()
}

/// Un-indexed triangle soup with one flat color per triangle, used for
/// color-indexed primitive picking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickPrimitives {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub indices: Vec<u32>,
}

/// Encodes a primitive index into an RGBA pick color.
///
/// The encoded value is `first_index + 1`, so black means "nothing".
#[must_use]
pub fn pick_color(first_index: usize) -> [f32; 4] {
    let id = first_index + 1;
    [
        (id & 0xFF) as f32 / 255.0,
        ((id >> 8) & 0xFF) as f32 / 255.0,
        ((id >> 16) & 0xFF) as f32 / 255.0,
        1.0,
    ]
}

/// Decodes a pick color written by [`pick_color`] back to the first index.
#[must_use]
pub fn decode_pick_color(rgba: [f32; 4]) -> Option<usize> {
    let channel = |v: f32| (v * 255.0).round() as usize;
    let id = channel(rgba[0]) | (channel(rgba[1]) << 8) | (channel(rgba[2]) << 16);
    id.checked_sub(1)
}

/// Expands an indexed triangle list into per-triangle pick geometry.
#[must_use]
pub fn pick_primitives(positions: &[f32], indices: &[u32]) -> PickPrimitives {
    let mut out = PickPrimitives::default();
    let mut next = 0u32;

    for (tri, corners) in indices.chunks_exact(3).enumerate() {
        let color = pick_color(tri * 3);
        for &i in corners {
            let p = vec3_at(positions, i as usize).unwrap_or(Vec3::ZERO);
            out.positions.extend_from_slice(&p.to_array());
            out.colors.extend_from_slice(&color);
            out.indices.push(next);
            next += 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: [f32; 12] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

    #[test]
    fn flat_quad_normals_point_up_z() {
        let normals = build_normals(&QUAD, &QUAD_INDICES);
        assert_eq!(normals.len(), 12);
        for n in normals.chunks_exact(3) {
            assert!((n[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn tangents_follow_u_axis() {
        let uv = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let tangents = build_tangents(&QUAD, &QUAD_INDICES, &uv);
        assert_eq!(tangents.len(), 12);
        assert!(tangents[0] > 0.0);
        assert!(tangents[1].abs() < 1e-6);
    }

    #[test]
    fn pick_color_round_trips() {
        for first in [0usize, 3, 255, 300, 70_000] {
            assert_eq!(decode_pick_color(pick_color(first)), Some(first));
        }
        assert_eq!(decode_pick_color([0.0, 0.0, 0.0, 1.0]), None);
    }

    #[test]
    fn pick_primitives_unrolls_triangles() {
        let pick = pick_primitives(&QUAD, &QUAD_INDICES);
        assert_eq!(pick.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(pick.positions.len(), 18);
        assert_eq!(pick.colors.len(), 24);
    }
}
