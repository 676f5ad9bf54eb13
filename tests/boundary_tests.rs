//! Boundary tests
//!
//! Tests for:
//! - Object world AABB / OBB / center under a transform
//! - Re-latching after transform and geometry edits
//! - Scene-wide world boundary
//! - Canvas-space boundaries

use glam::{Vec2, Vec3};
use strata::{GeometryDesc, ObjectDesc, Scene, TranslateDesc};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-4;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

fn boxed_at(scene: &mut Scene, xyz: Vec3) -> (strata::ObjectKey, strata::TransformKey) {
    let transform = scene
        .create_translate(TranslateDesc {
            id: None,
            xyz,
            parent: None,
        })
        .unwrap();
    let object = scene
        .create_object(ObjectDesc {
            transform: Some(transform),
            ..ObjectDesc::default()
        })
        .unwrap();
    (object, transform)
}

// ============================================================================
// World space
// ============================================================================

#[test]
fn world_aabb_follows_the_transform() {
    let mut scene = Scene::new();
    let (o, t) = boxed_at(&mut scene, Vec3::new(5.0, 0.0, 0.0));

    let aabb = scene.object_world_aabb(o).unwrap();
    assert!(vec3_approx(aabb.min, Vec3::new(4.0, -1.0, -1.0)));
    assert!(vec3_approx(aabb.max, Vec3::new(6.0, 1.0, 1.0)));
    assert!(vec3_approx(scene.object_world_center(o).unwrap(), Vec3::new(5.0, 0.0, 0.0)));

    scene.set_translate_xyz(t, Vec3::new(0.0, 5.0, 0.0));
    let aabb = scene.object_world_aabb(o).unwrap();
    assert!(vec3_approx(aabb.min, Vec3::new(-1.0, 4.0, -1.0)));
    assert!(vec3_approx(aabb.max, Vec3::new(1.0, 6.0, 1.0)));
}

#[test]
fn world_obb_has_eight_translated_corners() {
    let mut scene = Scene::new();
    let (o, _) = boxed_at(&mut scene, Vec3::new(0.0, 0.0, 3.0));
    let obb = scene.object_world_obb(o).unwrap();
    for corner in obb {
        assert!(approx_eq(corner.x.abs(), 1.0));
        assert!(approx_eq(corner.y.abs(), 1.0));
        assert!(approx_eq(corner.z, 2.0) || approx_eq(corner.z, 4.0));
    }
}

#[test]
fn parent_transform_moves_the_boundary() {
    let mut scene = Scene::new();
    let parent = scene
        .create_translate(TranslateDesc {
            id: None,
            xyz: Vec3::X,
            parent: None,
        })
        .unwrap();
    let (o, t) = boxed_at(&mut scene, Vec3::ZERO);
    scene.set_transform_parent(t, Some(parent));
    assert!(vec3_approx(scene.object_world_center(o).unwrap(), Vec3::X));

    scene.set_translate_xyz(parent, Vec3::new(0.0, 0.0, -2.0));
    assert!(vec3_approx(scene.object_world_center(o).unwrap(), Vec3::new(0.0, 0.0, -2.0)));
}

#[test]
fn geometry_edit_moves_the_boundary() {
    let mut scene = Scene::new();
    let g = scene
        .create_geometry(GeometryDesc {
            positions: Some(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            indices: Some(vec![0, 1, 2]),
            ..GeometryDesc::default()
        })
        .unwrap();
    let o = scene
        .create_object(ObjectDesc {
            geometry: Some(g),
            ..ObjectDesc::default()
        })
        .unwrap();
    assert!(vec3_approx(scene.object_world_center(o).unwrap(), Vec3::new(0.5, 0.5, 0.0)));

    scene.set_geometry_positions(g, Some(vec![0.0, 0.0, 0.0, 2.0, 2.0, 2.0, 2.0, 0.0, 2.0]));
    assert!(vec3_approx(scene.object_world_center(o).unwrap(), Vec3::ONE));
}

#[test]
fn scene_boundary_is_the_union_of_objects() {
    let mut scene = Scene::new();
    boxed_at(&mut scene, Vec3::new(-5.0, 0.0, 0.0));
    boxed_at(&mut scene, Vec3::new(5.0, 2.0, 0.0));

    let aabb = scene.world_aabb();
    assert!(vec3_approx(aabb.min, Vec3::new(-6.0, -1.0, -1.0)));
    assert!(vec3_approx(aabb.max, Vec3::new(6.0, 3.0, 1.0)));
    assert!(vec3_approx(scene.world_center(), Vec3::new(0.0, 1.0, 0.0)));
}

#[test]
fn empty_scene_boundary_is_degenerate() {
    let scene = Scene::new();
    assert!(scene.world_aabb().is_degenerate());
}

// ============================================================================
// Canvas space
// ============================================================================

#[test]
fn centered_object_projects_to_canvas_center() {
    let mut scene = Scene::new();
    let o = scene.create_object(ObjectDesc::default()).unwrap();

    let center = scene.object_canvas_center(o).unwrap();
    assert!((center - Vec2::new(400.0, 300.0)).length() < 0.5);

    let aabb = scene.object_canvas_aabb(o).unwrap();
    assert!(aabb.min.x < 400.0 && aabb.max.x > 400.0);
    assert!(aabb.min.y < 300.0 && aabb.max.y > 300.0);
}

#[test]
fn canvas_boundary_follows_camera_moves() {
    let mut scene = Scene::new();
    let o = scene.create_object(ObjectDesc::default()).unwrap();
    let before = scene.object_canvas_aabb(o).unwrap();

    let view = scene.default_lookat().unwrap();
    scene.set_lookat_eye(view, Vec3::new(0.0, 0.0, -20.0));
    let after = scene.object_canvas_aabb(o).unwrap();
    assert!(after.max.x - after.min.x < before.max.x - before.min.x);
}
