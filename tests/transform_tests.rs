//! Transform hierarchy tests
//!
//! Tests for:
//! - Leaf matrix composition through parent chains
//! - Lazy leaf recomputation and invalidation cascades
//! - Re-parenting, cycle rejection and parent destruction
//! - Translate transforms

use glam::{Mat4, Vec3};
use strata::scene::TransformKind;
use strata::{ComponentEvent, Scene, SceneConfig, TransformDesc, TranslateDesc};

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

fn translate(scene: &mut Scene, xyz: Vec3, parent: Option<strata::TransformKey>) -> strata::TransformKey {
    scene
        .create_translate(TranslateDesc {
            id: None,
            xyz,
            parent,
        })
        .unwrap()
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn leaf_matrix_composes_parent_chain() {
    let mut scene = bare_scene();
    let root = translate(&mut scene, Vec3::new(1.0, 0.0, 0.0), None);
    let mid = translate(&mut scene, Vec3::new(0.0, 2.0, 0.0), Some(root));
    let leaf = translate(&mut scene, Vec3::new(0.0, 0.0, 3.0), Some(mid));

    let world = scene.leaf_matrix(leaf).unwrap();
    assert!(vec3_approx(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0)));
}

#[test]
fn parent_matrix_applies_before_local() {
    let mut scene = bare_scene();
    let parent = scene
        .create_transform(TransformDesc {
            matrix: Mat4::from_scale(Vec3::splat(2.0)),
            ..TransformDesc::default()
        })
        .unwrap();
    let child = translate(&mut scene, Vec3::X, Some(parent));

    // parent.leaf × local: the translation is scaled too.
    let world = scene.leaf_matrix(child).unwrap();
    assert!(vec3_approx(world.transform_point3(Vec3::ZERO), Vec3::new(2.0, 0.0, 0.0)));
}

#[test]
fn leaf_is_recomputed_only_when_dirty() {
    let mut scene = bare_scene();
    let root = translate(&mut scene, Vec3::ZERO, None);
    let child = translate(&mut scene, Vec3::Y, Some(root));

    assert_eq!(scene.is_leaf_matrix_dirty(child), Some(true));
    scene.leaf_matrix(child);
    assert_eq!(scene.is_leaf_matrix_dirty(child), Some(false));
    assert_eq!(scene.is_leaf_matrix_dirty(root), Some(false));

    scene.set_translate_xyz(root, Vec3::X);
    assert_eq!(scene.is_leaf_matrix_dirty(child), Some(true));

    let world = scene.leaf_matrix(child).unwrap();
    assert!(vec3_approx(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 1.0, 0.0)));
}

#[test]
fn root_write_invalidates_the_whole_chain_without_recomputing() {
    let mut scene = bare_scene();
    let a = scene.create_transform(TransformDesc::default()).unwrap();
    let b = translate(&mut scene, Vec3::Y, Some(a));
    let c = translate(&mut scene, Vec3::Z, Some(b));
    let before = scene.leaf_matrix(c).unwrap();
    assert_eq!(scene.is_leaf_matrix_dirty(b), Some(false));

    scene.set_transform_matrix(a, Mat4::from_translation(Vec3::X));
    assert_eq!(scene.is_leaf_matrix_dirty(a), Some(true));
    assert_eq!(scene.is_leaf_matrix_dirty(b), Some(true));
    assert_eq!(scene.is_leaf_matrix_dirty(c), Some(true));
    assert_eq!(scene.transform(b).unwrap().cached_leaf(), Mat4::from_translation(Vec3::Y));
    assert_eq!(scene.transform(c).unwrap().cached_leaf(), before);

    // Reading the leaf pulls the chain up to date.
    let world = scene.leaf_matrix(c).unwrap();
    assert!(vec3_approx(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 1.0, 1.0)));
    assert_eq!(scene.is_leaf_matrix_dirty(b), Some(false));
    assert_eq!(scene.transform(c).unwrap().cached_leaf(), world);
}

#[test]
fn normal_matrix_is_inverse_transpose() {
    let mut scene = bare_scene();
    let t = scene
        .create_transform(TransformDesc {
            matrix: Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)),
            ..TransformDesc::default()
        })
        .unwrap();
    let normal = scene.leaf_normal_matrix(t).unwrap();
    assert!(approx_eq(normal.x_axis.x, 0.5));
    assert!(approx_eq(normal.y_axis.y, 1.0));
}

// ============================================================================
// Translate
// ============================================================================

#[test]
fn unchanged_translate_is_ignored() {
    let mut scene = bare_scene();
    let t = translate(&mut scene, Vec3::X, None);
    scene.leaf_matrix(t);

    let updates = std::rc::Rc::new(std::cell::Cell::new(0));
    let seen = updates.clone();
    scene.on_component(t.into(), move |_, event| {
        if *event == ComponentEvent::Updated {
            seen.set(seen.get() + 1);
        }
    });

    scene.set_translate_xyz(t, Vec3::X);
    assert_eq!(updates.get(), 0);
    assert_eq!(scene.is_leaf_matrix_dirty(t), Some(false));

    scene.set_translate_xyz(t, Vec3::Y);
    assert_eq!(updates.get(), 1);
    assert_eq!(scene.transform(t).unwrap().kind(), TransformKind::Translate(Vec3::Y));
}

#[test]
fn translate_rejects_matrix_kind() {
    let mut scene = bare_scene();
    let t = scene.create_transform(TransformDesc::default()).unwrap();
    scene.set_translate_xyz(t, Vec3::ONE);
    assert_eq!(scene.transform(t).unwrap().matrix(), Mat4::IDENTITY);
}

// ============================================================================
// Re-parenting
// ============================================================================

#[test]
fn reparenting_moves_the_subtree() {
    let mut scene = bare_scene();
    let a = translate(&mut scene, Vec3::X, None);
    let b = translate(&mut scene, Vec3::Y, None);
    let child = translate(&mut scene, Vec3::Z, Some(a));
    scene.leaf_matrix(child);

    scene.set_transform_parent(child, Some(b));
    assert_eq!(scene.transform(child).unwrap().parent(), Some(b));

    let world = scene.leaf_matrix(child).unwrap();
    assert!(vec3_approx(world.transform_point3(Vec3::ZERO), Vec3::new(0.0, 1.0, 1.0)));

    // The old parent no longer invalidates the child.
    scene.set_translate_xyz(a, Vec3::splat(5.0));
    assert_eq!(scene.is_leaf_matrix_dirty(child), Some(false));
}

#[test]
fn cycles_are_rejected() {
    let mut scene = bare_scene();
    let root = translate(&mut scene, Vec3::ZERO, None);
    let child = translate(&mut scene, Vec3::ZERO, Some(root));
    let grandchild = translate(&mut scene, Vec3::ZERO, Some(child));

    scene.set_transform_parent(root, Some(grandchild));
    assert_eq!(scene.transform(root).unwrap().parent(), None);

    scene.set_transform_parent(root, Some(root));
    assert_eq!(scene.transform(root).unwrap().parent(), None);
}

#[test]
fn parent_by_id() {
    let mut scene = bare_scene();
    scene
        .create_transform(TransformDesc {
            id: Some("base".into()),
            matrix: Mat4::from_translation(Vec3::X),
            parent: None,
        })
        .unwrap();
    let child = translate(&mut scene, Vec3::ZERO, None);

    scene.set_transform_parent_id(child, "base");
    let world = scene.leaf_matrix(child).unwrap();
    assert!(vec3_approx(world.transform_point3(Vec3::ZERO), Vec3::X));

    // Unknown ids leave the parent unchanged.
    scene.set_transform_parent_id(child, "nope");
    assert!(scene.transform(child).unwrap().parent().is_some());
}

#[test]
fn destroying_parent_detaches_children() {
    let mut scene = bare_scene();
    let parent = translate(&mut scene, Vec3::X, None);
    let child = translate(&mut scene, Vec3::Y, Some(parent));
    scene.leaf_matrix(child);

    assert!(scene.destroy_component(parent.into()));
    assert_eq!(scene.transform(child).unwrap().parent(), None);

    let world = scene.leaf_matrix(child).unwrap();
    assert!(vec3_approx(world.transform_point3(Vec3::ZERO), Vec3::Y));
}

#[test]
fn stale_parent_fails_creation() {
    let mut scene = bare_scene();
    let parent = translate(&mut scene, Vec3::ZERO, None);
    scene.destroy_component(parent.into());

    let result = scene.create_translate(TranslateDesc {
        id: None,
        xyz: Vec3::ZERO,
        parent: Some(parent),
    });
    assert!(matches!(result, Err(strata::StrataError::StaleHandle(_))));
}
