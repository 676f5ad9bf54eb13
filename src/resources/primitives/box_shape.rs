use glam::Vec3;

use crate::resources::geometry::{GeometryDesc, Primitive};

/// Face normal plus the two in-plane axes, chosen so `u × v == normal`.
const FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    (Vec3::Y, Vec3::Z, Vec3::X),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::X, Vec3::Y, Vec3::Z),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
];

/// Corner signs along `(u, v)` and the matching texture coordinates.
const QUAD: [(f32, f32, [f32; 2]); 4] = [
    (-1.0, -1.0, [0.0, 1.0]),
    (1.0, -1.0, [1.0, 1.0]),
    (1.0, 1.0, [1.0, 0.0]),
    (-1.0, 1.0, [0.0, 0.0]),
];

/// Axis-aligned box centred on the origin: 24 vertices, 4 per face, with
/// per-face normals and uv. Triangles wind counter-clockwise seen from outside.
#[must_use]
pub fn create_box(width: f32, height: f32, depth: f32) -> GeometryDesc {
    let half = Vec3::new(width, height, depth) / 2.0;

    let mut positions = Vec::with_capacity(24 * 3);
    let mut normals = Vec::with_capacity(24 * 3);
    let mut uv = Vec::with_capacity(24 * 2);
    let mut indices = Vec::with_capacity(36);

    for (face, (normal, u, v)) in FACES.iter().enumerate() {
        for (su, sv, tex) in QUAD {
            let corner = (*normal + *u * su + *v * sv) * half;
            positions.extend_from_slice(&corner.to_array());
            normals.extend_from_slice(&normal.to_array());
            uv.extend_from_slice(&tex);
        }
        let base = face as u32 * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
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
