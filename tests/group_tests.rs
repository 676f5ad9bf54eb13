//! Group tests
//!
//! Tests for:
//! - Adding and removing members by id, handle and type
//! - Coalesced Updated notification
//! - Automatic removal of destroyed members
//! - group_destroy_all

use std::cell::RefCell;
use std::rc::Rc;

use strata::scene::GroupMember;
use strata::{
    ComponentEvent, ComponentHandle, ComponentType, GroupDesc, ObjectDesc, Scene, SceneConfig, TickPhase, TransformDesc,
};

fn bare_scene() -> Scene {
    Scene::with_config(SceneConfig {
        auto_defaults: false,
        ..SceneConfig::default()
    })
}

fn transform(scene: &mut Scene, id: &str) -> strata::TransformKey {
    scene
        .create_transform(TransformDesc {
            id: Some(id.into()),
            ..TransformDesc::default()
        })
        .unwrap()
}

fn recorder(scene: &mut Scene, group: strata::GroupKey) -> Rc<RefCell<Vec<ComponentEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    scene.on_component(group.into(), move |_, event| sink.borrow_mut().push(event.clone()));
    events
}

// ============================================================================
// Membership
// ============================================================================

#[test]
fn members_from_desc_keep_order() {
    let mut scene = bare_scene();
    let a = transform(&mut scene, "a");
    let b = transform(&mut scene, "b");
    let group = scene
        .create_group(GroupDesc {
            id: None,
            members: vec!["b".into(), "a".into(), "b".into(), "ghost".into()],
        })
        .unwrap();

    let members = scene.group(group).unwrap().members();
    assert_eq!(members, &[ComponentHandle::from(b), ComponentHandle::from(a)]);
}

#[test]
fn add_by_type_and_remove_by_handle() {
    let mut scene = bare_scene();
    let a = transform(&mut scene, "a");
    let b = transform(&mut scene, "b");
    let o = scene.create_object(ObjectDesc::default()).unwrap();
    let group = scene.create_group(GroupDesc::default()).unwrap();

    scene.group_add(group, ComponentType::Transform);
    scene.group_add(group, GroupMember::Handle(o.into()));
    let state = scene.group(group).unwrap();
    assert_eq!(state.len(), 3);
    assert_eq!(state.members_of_type(ComponentType::Transform), &[ComponentHandle::from(a), ComponentHandle::from(b)]);
    assert_eq!(state.members_of_type(ComponentType::Object), &[ComponentHandle::from(o)]);

    scene.group_remove(group, "a");
    let state = scene.group(group).unwrap();
    assert!(!state.contains(a.into()));
    assert_eq!(state.members_of_type(ComponentType::Transform), &[ComponentHandle::from(b)]);
}

#[test]
fn group_cannot_contain_itself() {
    let mut scene = bare_scene();
    let group = scene.create_group(GroupDesc::default()).unwrap();
    scene.group_add(group, ComponentType::Group);
    assert!(scene.group(group).unwrap().is_empty());
}

// ============================================================================
// Notification
// ============================================================================

#[test]
fn changes_coalesce_into_one_update_per_frame() {
    let mut scene = bare_scene();
    transform(&mut scene, "a");
    transform(&mut scene, "b");
    let group = scene.create_group(GroupDesc::default()).unwrap();
    let events = recorder(&mut scene, group);

    scene.group_add(group, "a");
    scene.group_add(group, "b");
    scene.group_remove(group, "a");
    assert_eq!(scene.pending_tasks(TickPhase::Tick2), 1);

    scene.tick_at(0.0);
    let events = events.borrow();
    let updates = events.iter().filter(|e| **e == ComponentEvent::Updated).count();
    assert_eq!(updates, 1);
    assert_eq!(events.iter().filter(|e| matches!(e, ComponentEvent::Added(_))).count(), 2);
    assert_eq!(events.iter().filter(|e| matches!(e, ComponentEvent::Removed(_))).count(), 1);
}

#[test]
fn destroyed_member_is_removed() {
    let mut scene = bare_scene();
    let a = transform(&mut scene, "a");
    let group = scene
        .create_group(GroupDesc {
            id: None,
            members: vec!["a".into()],
        })
        .unwrap();
    scene.tick_at(0.0);
    let events = recorder(&mut scene, group);

    scene.destroy_component(a.into());
    assert!(scene.group(group).unwrap().is_empty());
    assert_eq!(*events.borrow(), vec![ComponentEvent::Removed(a.into())]);
}

#[test]
fn destroy_all_empties_the_group() {
    let mut scene = bare_scene();
    transform(&mut scene, "a");
    transform(&mut scene, "b");
    let group = scene.create_group(GroupDesc::default()).unwrap();
    scene.group_add(group, ComponentType::Transform);

    scene.group_destroy_all(group);
    assert!(scene.group(group).unwrap().is_empty());
    assert!(scene.components_of_type(ComponentType::Transform).is_empty());
    assert_eq!(scene.component_count(), 1);
}

#[test]
fn group_snapshot_lists_member_ids() {
    let mut scene = bare_scene();
    transform(&mut scene, "a");
    scene
        .create_group(GroupDesc {
            id: Some("g".into()),
            members: vec!["a".into()],
        })
        .unwrap();
    let json = scene.to_json();
    let group = json["components"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == "g")
        .unwrap()
        .clone();
    assert_eq!(group["members"], serde_json::json!(["a"]));
}
