//! Scheduler tests
//!
//! Tests for:
//! - Phase order within a frame
//! - One-shot tasks rescheduled into their own phase
//! - Listener snapshots and self-removal
//! - Clock bookkeeping passed through TickEvent
//! - Lookat build coalescing

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec3;
use strata::scene::ListenerKey;
use strata::{LookatDesc, Scene, SceneConfig, TickPhase};

fn bare_scene() -> Scene {
    Scene::with_config(SceneConfig {
        auto_defaults: false,
        ..SceneConfig::default()
    })
}

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn phases_run_in_order() {
    let mut scene = bare_scene();
    let entries = log();
    for phase in [TickPhase::Tick5, TickPhase::Tick3, TickPhase::Tick, TickPhase::Tick4, TickPhase::Tick2] {
        let sink = entries.clone();
        scene.on_tick(phase, move |_, event| sink.borrow_mut().push(event.phase.name().to_string()));
    }
    scene.tick_at(0.0);
    assert_eq!(*entries.borrow(), vec!["tick", "tick2", "tick3", "tick4", "tick5"]);
}

#[test]
fn tasks_run_before_listeners() {
    let mut scene = bare_scene();
    let entries = log();
    let sink = entries.clone();
    scene.on_tick(TickPhase::Tick, move |_, _| sink.borrow_mut().push("listener".into()));
    let sink = entries.clone();
    scene.once(TickPhase::Tick, move |_, _| sink.borrow_mut().push("task".into()));

    scene.tick_at(0.0);
    assert_eq!(*entries.borrow(), vec!["task", "listener"]);
}

#[test]
fn task_scheduled_for_its_own_phase_waits_a_frame() {
    let mut scene = bare_scene();
    let frames = Rc::new(RefCell::new(Vec::new()));
    let sink = frames.clone();
    scene.once(TickPhase::Tick, move |scene, event| {
        sink.borrow_mut().push(event.frame);
        let sink = sink.clone();
        scene.once(TickPhase::Tick, move |_, event| sink.borrow_mut().push(event.frame));
    });

    scene.tick_at(0.0);
    assert_eq!(*frames.borrow(), vec![1]);
    assert_eq!(scene.pending_tasks(TickPhase::Tick), 1);
    scene.tick_at(0.1);
    assert_eq!(*frames.borrow(), vec![1, 2]);
}

#[test]
fn task_scheduled_for_a_later_phase_runs_same_frame() {
    let mut scene = bare_scene();
    let frames = Rc::new(RefCell::new(Vec::new()));
    let sink = frames.clone();
    scene.once(TickPhase::Tick2, move |scene, _| {
        let sink = sink.clone();
        scene.once(TickPhase::Tick4, move |_, event| sink.borrow_mut().push(event.frame));
    });
    scene.tick_at(0.0);
    assert_eq!(*frames.borrow(), vec![1]);
}

// ============================================================================
// Listeners
// ============================================================================

#[test]
fn listener_added_mid_phase_starts_next_frame() {
    let mut scene = bare_scene();
    let runs = Rc::new(Cell::new(0));
    let added = Rc::new(Cell::new(false));

    let (r, a) = (runs.clone(), added.clone());
    scene.on_tick(TickPhase::Tick, move |scene, _| {
        if !a.get() {
            a.set(true);
            let r = r.clone();
            scene.on_tick(TickPhase::Tick, move |_, _| r.set(r.get() + 1));
        }
    });

    scene.tick_at(0.0);
    assert_eq!(runs.get(), 0);
    scene.tick_at(0.1);
    assert_eq!(runs.get(), 1);
}

#[test]
fn listener_can_unsubscribe_itself() {
    let mut scene = bare_scene();
    let runs = Rc::new(Cell::new(0));
    let key: Rc<Cell<Option<ListenerKey>>> = Rc::new(Cell::new(None));

    let (r, k) = (runs.clone(), key.clone());
    let listener = scene.on_tick(TickPhase::Tick3, move |scene, _| {
        r.set(r.get() + 1);
        if r.get() == 2
            && let Some(key) = k.get()
        {
            scene.off_tick(key);
        }
    });
    key.set(Some(listener));

    for i in 0..4 {
        scene.tick_at(f64::from(i) * 0.1);
    }
    assert_eq!(runs.get(), 2);
    assert!(!scene.off_tick(listener));
}

// ============================================================================
// Clock
// ============================================================================

#[test]
fn tick_event_carries_timing() {
    let mut scene = bare_scene();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    scene.on_tick(TickPhase::Tick, move |_, event| {
        sink.borrow_mut().push((event.start_time, event.prev_time, event.delta_time, event.frame));
    });

    scene.tick_at(1.0);
    scene.tick_at(1.5);
    let seen = seen.borrow();
    assert_eq!(seen[0], (1.0, 1.0, 0.0, 1));
    assert_eq!(seen[1], (1.0, 1.0, 0.5, 2));
    assert_eq!(scene.clock().frame, 2);
}

// ============================================================================
// Coalescing
// ============================================================================

#[test]
fn lookat_edits_coalesce_into_one_build() {
    let mut scene = bare_scene();
    let l = scene.create_lookat(LookatDesc::default()).unwrap();
    scene.tick_at(0.0);
    let builds = scene.lookat(l).unwrap().builds();

    scene.set_lookat_eye(l, Vec3::new(0.0, 0.0, -5.0));
    scene.set_lookat_look(l, Vec3::X);
    scene.set_lookat_up(l, Vec3::Z);
    assert_eq!(scene.pending_tasks(TickPhase::Tick2), 1);
    assert!(scene.lookat(l).unwrap().is_dirty());

    scene.tick_at(0.1);
    assert_eq!(scene.lookat(l).unwrap().builds(), builds + 1);
    assert!(!scene.lookat(l).unwrap().is_dirty());
}
