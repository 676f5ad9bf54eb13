//! Frame loop: phases, compile pass and render step.
//!
//! ```text
//! tick_at(t)
//!   ├─ tick  ─ tick2 ─ tick3 ─ tick4 ─ tick5   (tasks first, then listeners)
//!   ├─ compile                                 (dirty objects only)
//!   └─ render                                  (draws if the image is dirty)
//! ```

use glam::Mat4;

use crate::render::{DrawItem, Frame, RenderOptions};
use crate::scene::scheduler::{Listener, Task, TickPhase};
use crate::scene::{ObjectKey, Scene};

/// Scene time bookkeeping, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Clock {
    pub start_time: f64,
    pub time: f64,
    pub prev_time: f64,
    /// Frames started so far.
    pub frame: u64,
}

impl Clock {
    fn advance(&mut self, time: f64) {
        if self.frame == 0 {
            self.start_time = time;
            self.prev_time = time;
        } else {
            self.prev_time = self.time;
        }
        self.time = time;
        self.frame += 1;
    }

    #[must_use]
    pub fn delta_time(&self) -> f64 {
        self.time - self.prev_time
    }

    fn event(&self, scene_id: u32, phase: TickPhase) -> TickEvent {
        TickEvent {
            scene_id,
            phase,
            start_time: self.start_time,
            time: self.time,
            prev_time: self.prev_time,
            delta_time: self.delta_time(),
            frame: self.frame,
        }
    }
}

/// Passed to every task and listener of a phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEvent {
    pub scene_id: u32,
    pub phase: TickPhase,
    pub start_time: f64,
    pub time: f64,
    pub prev_time: f64,
    pub delta_time: f64,
    pub frame: u64,
}

impl Scene {
    /// Runs one frame stamped with the internal wall clock.
    pub fn tick(&mut self) -> bool {
        let time = self.timer.now();
        self.tick_at(time)
    }

    /// Runs one frame at `time` seconds: the five phases, the compile pass,
    /// then the render step. Returns whether the renderer drew.
    pub fn tick_at(&mut self, time: f64) -> bool {
        if self.is_destroyed() {
            log::warn!("tick on destroyed scene {}", self.id);
            return false;
        }
        self.clock.advance(time);
        for phase in TickPhase::ALL {
            self.run_phase(phase);
        }
        self.compile();

        self.stats.frames += 1;
        if let Some(fps) = self.fps.record(time) {
            log::debug!("Scene {}: {fps:.1} fps", self.id);
        }
        self.render(RenderOptions::default())
    }

    /// Drains the phase's task queue, then runs the listeners that were
    /// subscribed when the phase began.
    pub(crate) fn run_phase(&mut self, phase: TickPhase) {
        let event = self.clock.event(self.id, phase);

        for task in self.scheduler.take_queue(phase) {
            self.run_task(task, &event);
        }

        for key in self.scheduler.listeners_snapshot(phase) {
            let Some(mut listener) = self.scheduler.take_listener(key) else {
                continue;
            };
            match &mut listener {
                Listener::Flight(flight) => self.update_flight(*flight, &event),
                Listener::Callback(callback) => callback(self, &event),
            }
            self.scheduler.restore_listener(key, listener);
        }
    }

    fn run_task(&mut self, task: Task, event: &TickEvent) {
        match task {
            Task::BuildGeometry(key) => self.build_geometry(key),
            Task::BuildLookat(key) => self.build_lookat(key),
            Task::NotifyGroup(key) => self.notify_group(key),
            Task::Deferred(task) => task(self, event),
        }
    }

    /// Compiles every dirty object exactly once. Returns how many were compiled.
    pub fn compile(&mut self) -> usize {
        let dirty = std::mem::take(&mut self.dirty_objects);
        self.dirty_set.clear();
        for &key in &dirty {
            self.compile_object(key);
        }
        let count = dirty.len();
        if count > 0 {
            log::debug!("Scene {}: compiled {count} objects", self.id);
        }
        self.stats.objects_compiled += count as u64;
        count
    }

    /// Snapshot of every compiled object's current draw state.
    pub(crate) fn build_frame(&mut self) -> Frame {
        let keys: Vec<ObjectKey> = self
            .objects
            .iter()
            .filter(|(_, o)| o.compiled.is_some())
            .map(|(k, _)| k)
            .collect();

        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(object) = self.objects.get(key) else {
                continue;
            };
            let Some(compiled) = object.compiled.as_ref() else {
                continue;
            };
            let (transform, camera, visible) = (object.transform, object.camera, object.visible);
            let (geometry, primitive) = (compiled.geometry, compiled.primitive);
            let clips = compiled.clips.iter().filter_map(|k| self.clips.get(*k).copied()).collect();
            let lights = compiled.lights.iter().filter_map(|k| self.lights.get(*k).copied()).collect();

            let buffers = geometry
                .and_then(|g| self.geometry_buffers(g).cloned())
                .unwrap_or_default();
            let model = transform.and_then(|t| self.leaf_matrix(t)).unwrap_or(Mat4::IDENTITY);
            let normal = transform
                .and_then(|t| self.leaf_normal_matrix(t))
                .unwrap_or(Mat4::IDENTITY);
            let (view, view_normal, projection) = camera
                .and_then(|c| self.camera_matrices(c))
                .unwrap_or((Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY));

            items.push(DrawItem {
                object: key,
                visible,
                primitive,
                buffers,
                model,
                normal,
                view,
                view_normal,
                projection,
                clips,
                lights,
            });
        }

        Frame {
            canvas: (self.config.canvas.width, self.config.canvas.height),
            items,
        }
    }

    /// Hands the current frame to the renderer.
    pub fn render(&mut self, options: RenderOptions) -> bool {
        let frame = self.build_frame();
        let drawn = self.backend.render(&frame, options);
        if drawn {
            self.stats.frames_drawn += 1;
        }
        drawn
    }
}
