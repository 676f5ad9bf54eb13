//! Geometry tests
//!
//! Tests for:
//! - Construction defaults (canonical box, generated line-strip indices)
//! - Deferred, coalesced buffer builds
//! - Structural vs. content changes and their effect on objects
//! - Buffer release on destroy
//! - Local boundary invalidation

use glam::Vec3;
use strata::render::BufferAllocator;
use strata::resources::{BufferUsage, CylinderOptions, create_cylinder};
use strata::{GeometryDesc, ObjectDesc, Primitive, Scene, SceneConfig, TickPhase};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

fn bare_scene() -> Scene {
    Scene::with_config(SceneConfig {
        auto_defaults: false,
        ..SceneConfig::default()
    })
}

fn triangle() -> GeometryDesc {
    GeometryDesc {
        primitive: Some(Primitive::Triangles),
        positions: Some(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
        indices: Some(vec![0, 1, 2]),
        ..GeometryDesc::default()
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn empty_desc_is_the_canonical_box() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(GeometryDesc::default()).unwrap();
    let geometry = scene.geometry(g).unwrap();

    assert_eq!(geometry.primitive(), Primitive::Triangles);
    assert_eq!(geometry.positions().unwrap().len(), 24 * 3);
    assert_eq!(geometry.normals().unwrap().len(), 24 * 3);
    assert_eq!(geometry.uv().unwrap().len(), 24 * 2);
    assert_eq!(geometry.indices().unwrap().len(), 36);

    let aabb = scene.geometry_aabb(g).unwrap();
    assert!(vec3_approx(aabb.min, Vec3::splat(-1.0)));
    assert!(vec3_approx(aabb.max, Vec3::splat(1.0)));
}

#[test]
fn default_box_has_six_faces_and_built_buffers() {
    let mut scene = Scene::new();
    let g = scene.default_geometry().unwrap();
    scene.tick_at(0.0);

    let geometry = scene.geometry(g).unwrap();
    let mut faces: Vec<Vec3> = Vec::new();
    for n in geometry.normals().unwrap().chunks_exact(3) {
        let n = Vec3::from_slice(n);
        if !faces.iter().any(|f| vec3_approx(*f, n)) {
            faces.push(n);
        }
    }
    assert_eq!(faces.len(), 6);

    let buffers = geometry.buffers();
    assert!(buffers.positions.is_some());
    assert!(buffers.normals.is_some());
    assert!(buffers.uv.is_some());
    assert!(buffers.indices.is_some());
}

#[test]
fn positions_without_indices_become_a_line_strip() {
    let mut scene = bare_scene();
    let g = scene
        .create_geometry(GeometryDesc {
            positions: Some(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]),
            ..GeometryDesc::default()
        })
        .unwrap();
    let geometry = scene.geometry(g).unwrap();
    assert_eq!(geometry.primitive(), Primitive::LineStrip);
    assert_eq!(geometry.indices(), Some(&[0, 1, 2, 3][..]));
}

#[test]
fn cylinder_primitive_builds() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(create_cylinder(CylinderOptions::default())).unwrap();
    scene.tick_at(0.0);
    assert_eq!(scene.geometry_build_count(g), 1);
    assert!(scene.geometry(g).unwrap().indices().is_some_and(|i| i.len() % 3 == 0));
}

// ============================================================================
// Deferred builds
// ============================================================================

#[test]
fn build_waits_for_the_tick_phase() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(triangle()).unwrap();

    assert!(scene.is_geometry_build_pending(g));
    assert_eq!(scene.geometry_build_count(g), 0);
    assert_eq!(scene.pending_tasks(TickPhase::Tick), 1);

    scene.tick_at(0.0);
    assert!(!scene.is_geometry_build_pending(g));
    assert_eq!(scene.geometry_build_count(g), 1);
    assert!(scene.geometry(g).unwrap().buffers().positions.is_some());
}

#[test]
fn repeated_edits_coalesce_into_one_build() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(triangle()).unwrap();
    scene.tick_at(0.0);

    for i in 0..5 {
        let x = i as f32;
        scene.set_geometry_positions(g, Some(vec![x, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]));
    }
    scene.set_geometry_colors(g, Some(vec![1.0; 12]));
    assert_eq!(scene.pending_tasks(TickPhase::Tick), 1);

    scene.tick_at(0.1);
    assert_eq!(scene.geometry_build_count(g), 2);

    // The single build saw the last write.
    let positions = scene.geometry(g).unwrap().buffers().positions.clone().unwrap();
    let data = scene.backend().read_f32(&positions).unwrap();
    assert!(approx_eq(data[0], 4.0));
}

#[test]
fn buffers_are_built_on_demand_before_the_tick() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(triangle()).unwrap();
    assert!(scene.geometry_buffers(g).unwrap().positions.is_some());
    assert_eq!(scene.geometry_build_count(g), 1);

    // The queued task finds nothing to do.
    scene.tick_at(0.0);
    assert_eq!(scene.geometry_build_count(g), 1);
}

#[test]
fn usage_change_reallocates_present_buffers() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(triangle()).unwrap();
    scene.tick_at(0.0);
    let before = scene.stats().renderer.buffers_allocated;

    scene.set_geometry_usage(g, BufferUsage::Dynamic);
    scene.tick_at(0.1);
    // positions + indices
    assert_eq!(scene.stats().renderer.buffers_allocated, before + 2);
    assert_eq!(scene.stats().renderer.live_buffers, 2);
}

#[test]
fn auto_normals_are_derived_from_faces() {
    let mut scene = bare_scene();
    let g = scene
        .create_geometry(GeometryDesc {
            auto_normals: true,
            ..triangle()
        })
        .unwrap();
    scene.tick_at(0.0);

    let normals = scene.geometry(g).unwrap().normals().unwrap().to_vec();
    assert_eq!(normals.len(), 9);
    for n in normals.chunks_exact(3) {
        assert!(vec3_approx(Vec3::from_slice(n), Vec3::Z));
    }
}

// ============================================================================
// Hash & object invalidation
// ============================================================================

#[test]
fn hash_tracks_primitive_and_attributes() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(triangle()).unwrap();
    let before = scene.geometry_hash(g).unwrap().to_string();
    assert!(before.contains("triangles"));

    scene.set_geometry_primitive(g, Primitive::Lines);
    let after = scene.geometry_hash(g).unwrap().to_string();
    assert!(after.contains("lines"));
    assert_ne!(before, after);
}

#[test]
fn structural_change_marks_objects_dirty() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(triangle()).unwrap();
    let o = scene
        .create_object(ObjectDesc {
            geometry: Some(g),
            ..ObjectDesc::default()
        })
        .unwrap();
    scene.tick_at(0.0);
    assert!(!scene.is_object_dirty(o));

    // Content-only edit: same attribute set, no recompile.
    scene.set_geometry_positions(g, Some(vec![0.0; 9]));
    assert!(!scene.is_object_dirty(o));

    // New attribute: different shader variant.
    scene.set_geometry_colors(g, Some(vec![1.0; 12]));
    assert!(scene.is_object_dirty(o));

    scene.tick_at(0.1);
    assert_eq!(scene.object(o).unwrap().compile_count(), 2);
}

#[test]
fn generated_normals_change_the_hash_and_recompile() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(triangle()).unwrap();
    let o = scene
        .create_object(ObjectDesc {
            geometry: Some(g),
            ..ObjectDesc::default()
        })
        .unwrap();
    scene.tick_at(0.0);
    assert_eq!(scene.geometry_hash(g), Some("/g/triangles;0;"));

    scene.set_geometry_auto_normals(g, true);
    assert!(!scene.is_object_dirty(o));

    scene.tick_at(0.1);
    assert_eq!(scene.geometry_hash(g), Some("/g/triangles;02;"));
    assert_eq!(scene.object(o).unwrap().compile_count(), 2);
    let program = scene.object(o).unwrap().compiled().unwrap().program_hash.clone();
    assert!(program.starts_with("/g/triangles;02;"));
}

#[test]
fn unknown_primitive_name_falls_back_to_triangles() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(triangle()).unwrap();
    scene.set_geometry_primitive(g, Primitive::Points);
    scene.set_geometry_primitive_name(g, "quads");
    assert_eq!(scene.geometry(g).unwrap().primitive(), Primitive::Triangles);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn destroy_releases_every_buffer() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(GeometryDesc::default()).unwrap();
    scene.tick_at(0.0);
    // positions, normals, uv, indices
    assert_eq!(scene.stats().renderer.live_buffers, 4);

    assert!(scene.destroy_component(g.into()));
    assert_eq!(scene.stats().renderer.live_buffers, 0);
    assert!(scene.geometry(g).is_none());

    // The queued task of a destroyed geometry is a no-op.
    scene.tick_at(0.1);
}

#[test]
fn positions_change_invalidates_local_boundary() {
    let mut scene = bare_scene();
    let g = scene.create_geometry(triangle()).unwrap();
    let aabb = scene.geometry_aabb(g).unwrap();
    assert!(vec3_approx(aabb.max, Vec3::new(1.0, 1.0, 0.0)));

    scene.set_geometry_positions(g, Some(vec![0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 2.0, 1.0]));
    let aabb = scene.geometry_aabb(g).unwrap();
    assert!(vec3_approx(aabb.max, Vec3::new(4.0, 2.0, 1.0)));
    assert!(vec3_approx(scene.geometry_center(g).unwrap(), Vec3::new(2.0, 1.0, 0.5)));
}
