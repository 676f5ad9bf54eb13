use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Vec2, Vec3};
use rustc_hash::FxHashSet;
use serde::Serialize;
use slotmap::SlotMap;

use crate::animation::CameraFlight;
use crate::clipping::{Clip, Clips};
use crate::config::SceneConfig;
use crate::errors::{Result, StrataError};
use crate::lighting::{Light, Lights};
use crate::math::Aabb;
use crate::math::ray::{barycentric, canvas_ray, ray_plane};
use crate::render::{Backend, HeadlessRenderer, PickParams, RendererStats};
use crate::resources::boundary::{Boundary3D, Boundary3DInput, BoundarySource};
use crate::resources::geometry::{Geometry, MemoryStats, Primitive};
use crate::scene::camera::Camera;
use crate::scene::defaults::Defaults;
use crate::scene::events::{ComponentEvent, EventBus, SceneEvent, SubscriptionId};
use crate::scene::frame::{Clock, TickEvent};
use crate::scene::group::Group;
use crate::scene::lookat::Lookat;
use crate::scene::object::Object;
use crate::scene::observer::{ObserverGraph, Signals};
use crate::scene::registry::Registry;
use crate::scene::scheduler::{Listener, ListenerKey, Scheduler, Task, TickPhase};
use crate::scene::transform::Transform;
use crate::scene::{
    CameraKey, ClipKey, ClipsKey, ComponentHandle, ComponentType, FlightKey, GeometryKey, GroupKey,
    LightKey, LightsKey, LookatKey, ObjectKey, TransformKey,
};
use crate::utils::{FpsCounter, Timer};

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// Counters reported by [`Scene::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SceneStats {
    pub memory: MemoryStats,
    pub objects: usize,
    /// Frames ticked.
    pub frames: u64,
    /// Frames the renderer actually drew.
    pub frames_drawn: u64,
    /// Object compiles across all frames.
    pub objects_compiled: u64,
    pub fps: f32,
    pub renderer: RendererStats,
}

/// Result of [`Scene::pick`].
///
/// Everything past `primitive_index` is only filled for triangle geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub object: ObjectKey,
    pub id: String,
    pub primitive_index: usize,
    /// Vertex indices of the hit triangle.
    pub indices: Option<[u32; 3]>,
    /// Intersection in the geometry's local space.
    pub local_pos: Option<Vec3>,
    pub world_pos: Option<Vec3>,
    /// Weights of the three triangle vertices.
    pub barycentric: Option<Vec3>,
    pub normal: Option<Vec3>,
    pub uv: Option<Vec2>,
}

/// 场景
///
/// Owns every component, the dependency graph between them, the per-phase
/// scheduler and the rendering backend. Scenes are independent: ids,
/// defaults and statistics are all per instance.
pub struct Scene {
    pub(crate) id: u32,
    pub(crate) config: SceneConfig,

    pub(crate) registry: Registry,
    pub(crate) observers: ObserverGraph,
    pub(crate) events: EventBus,
    pub(crate) scheduler: Scheduler,
    pub(crate) backend: Box<dyn Backend>,

    // ====组件池====
    pub(crate) transforms: SlotMap<TransformKey, Transform>,
    pub(crate) geometries: SlotMap<GeometryKey, Geometry>,
    pub(crate) lookats: SlotMap<LookatKey, Lookat>,
    pub(crate) cameras: SlotMap<CameraKey, Camera>,
    pub(crate) clips: SlotMap<ClipKey, Clip>,
    pub(crate) clip_sets: SlotMap<ClipsKey, Clips>,
    pub(crate) lights: SlotMap<LightKey, Light>,
    pub(crate) light_sets: SlotMap<LightsKey, Lights>,
    pub(crate) objects: SlotMap<ObjectKey, Object>,
    pub(crate) flights: SlotMap<FlightKey, CameraFlight>,
    pub(crate) groups: SlotMap<GroupKey, Group>,

    // ====编译状态====
    pub(crate) dirty_objects: Vec<ObjectKey>,
    pub(crate) dirty_set: FxHashSet<ObjectKey>,
    pub(crate) defaults: Defaults,
    world_boundary: Boundary3D,

    pub(crate) clock: Clock,
    pub(crate) timer: Timer,
    pub(crate) fps: FpsCounter,
    pub(crate) stats: SceneStats,
    destroyed: bool,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("components", &self.registry.len())
            .field("dirty_objects", &self.dirty_objects.len())
            .field("clock", &self.clock)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        if !self.destroyed {
            self.destroy();
        }
    }
}

/// Always-dirty source: re-accumulates every object's world box on each read.
struct SceneWorld<'a>(&'a Scene);

impl BoundarySource for SceneWorld<'_> {
    fn take_dirty(&self) -> bool {
        true
    }

    fn input(&self) -> Boundary3DInput<'_> {
        let scene = self.0;
        let mut aabb = Aabb::EMPTY;
        for key in scene.objects.keys() {
            if let Some(object_aabb) = scene.object_world_aabb(key) {
                aabb.expand(&object_aabb);
            }
        }
        Boundary3DInput::Aabb(aabb)
    }
}

impl Scene {
    /// A scene with default configuration and a [`HeadlessRenderer`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    #[must_use]
    pub fn with_config(config: SceneConfig) -> Self {
        Self::with_backend(config, Box::new(HeadlessRenderer::new()))
    }

    #[must_use]
    pub fn with_backend(config: SceneConfig, backend: Box<dyn Backend>) -> Self {
        let id = NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("Scene {id} created");
        Self {
            id,
            config,
            registry: Registry::new(),
            observers: ObserverGraph::new(),
            events: EventBus::new(),
            scheduler: Scheduler::new(),
            backend,
            transforms: SlotMap::with_key(),
            geometries: SlotMap::with_key(),
            lookats: SlotMap::with_key(),
            cameras: SlotMap::with_key(),
            clips: SlotMap::with_key(),
            clip_sets: SlotMap::with_key(),
            lights: SlotMap::with_key(),
            light_sets: SlotMap::with_key(),
            objects: SlotMap::with_key(),
            flights: SlotMap::with_key(),
            groups: SlotMap::with_key(),
            dirty_objects: Vec::new(),
            dirty_set: FxHashSet::default(),
            defaults: Defaults::default(),
            world_boundary: Boundary3D::new(),
            clock: Clock::default(),
            timer: Timer::new(),
            fps: FpsCounter::new(),
            stats: SceneStats::default(),
            destroyed: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Resizes the canvas. Cameras following the canvas aspect and every
    /// canvas boundary are invalidated.
    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        if (self.config.canvas.width, self.config.canvas.height) == (width, height) {
            return;
        }
        self.config.canvas.width = width;
        self.config.canvas.height = height;
        self.canvas_resized();
        self.latch_canvas_boundaries();
        self.backend.mark_image_dirty();
    }

    // ========================================================================
    // Internal plumbing
    // ========================================================================

    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            log::error!("Scene {} has been destroyed", self.id);
            return Err(StrataError::SceneDestroyed(self.id));
        }
        Ok(())
    }

    /// Records a freshly inserted component and announces it.
    pub(crate) fn register(&mut self, id: String, ty: ComponentType, handle: ComponentHandle) {
        log::trace!("created {} '{id}'", ty.name());
        self.registry.insert(id.clone(), ty, handle);
        self.events
            .emit_scene(&SceneEvent::ComponentCreated { handle, id, ty });
    }

    #[inline]
    pub(crate) fn emit(&mut self, handle: ComponentHandle, event: ComponentEvent) {
        self.events.emit(handle, &event);
    }

    /// Delivers `signal` from `subject` to every interested observer.
    pub(crate) fn notify(&mut self, subject: ComponentHandle, signal: Signals) {
        for observer in self.observers.observers(subject, signal) {
            self.on_signal(observer, subject, signal);
        }
    }

    fn on_signal(&mut self, observer: ComponentHandle, subject: ComponentHandle, signal: Signals) {
        match observer {
            ComponentHandle::Transform(k) => self.transform_on_signal(k, subject, signal),
            ComponentHandle::Camera(k) => self.camera_on_signal(k, subject, signal),
            ComponentHandle::Clips(k) => self.clips_on_signal(k, subject, signal),
            ComponentHandle::Lights(k) => self.lights_on_signal(k, subject, signal),
            ComponentHandle::Object(k) => self.object_on_signal(k, subject, signal),
            ComponentHandle::Flight(k) => self.flight_on_signal(k, subject, signal),
            ComponentHandle::Group(k) => self.group_on_signal(k, subject, signal),
            ComponentHandle::Geometry(_)
            | ComponentHandle::Lookat(_)
            | ComponentHandle::Clip(_)
            | ComponentHandle::Light(_) => {}
        }
    }

    /// Resolves member ids for an aggregate. Missing ids and components of
    /// the wrong type are logged and skipped.
    pub(crate) fn resolve_members<K>(
        &self,
        ids: &[&str],
        expected: &'static str,
        accept: impl Fn(ComponentHandle) -> Option<K>,
    ) -> Vec<K> {
        let mut members = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(handle) = self.registry.get(id) else {
                log::error!("{}", StrataError::ComponentNotFound((*id).to_string()));
                continue;
            };
            match accept(handle) {
                Some(member) => members.push(member),
                None => log::error!(
                    "{}",
                    StrataError::TypeMismatch {
                        id: (*id).to_string(),
                        expected,
                        found: self.registry.type_of(handle).map_or("unknown", ComponentType::name),
                    }
                ),
            }
        }
        members
    }

    // ========================================================================
    // Registry queries
    // ========================================================================

    #[must_use]
    pub fn component_by_id(&self, id: &str) -> Option<ComponentHandle> {
        self.registry.get(id)
    }

    /// Components of one type, in creation order.
    #[must_use]
    pub fn components_of_type(&self, ty: ComponentType) -> &[ComponentHandle] {
        self.registry.of_type(ty)
    }

    #[must_use]
    pub fn component_id(&self, handle: ComponentHandle) -> Option<&str> {
        self.registry.id_of(handle)
    }

    #[must_use]
    pub fn component_type(&self, handle: ComponentHandle) -> Option<ComponentType> {
        self.registry.type_of(handle)
    }

    #[must_use]
    pub fn component_count(&self) -> usize {
        self.registry.len()
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn on_component(
        &mut self,
        handle: ComponentHandle,
        callback: impl FnMut(ComponentHandle, &ComponentEvent) + 'static,
    ) -> SubscriptionId {
        self.events.on_component(handle, Box::new(callback))
    }

    pub fn on_scene(&mut self, callback: impl FnMut(&SceneEvent) + 'static) -> SubscriptionId {
        self.events.on_scene(Box::new(callback))
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }

    /// Runs `callback` on every occurrence of `phase` until [`Scene::off_tick`].
    pub fn on_tick(
        &mut self,
        phase: TickPhase,
        callback: impl FnMut(&mut Scene, &TickEvent) + 'static,
    ) -> ListenerKey {
        self.scheduler.subscribe(phase, Listener::Callback(Box::new(callback)))
    }

    pub fn off_tick(&mut self, key: ListenerKey) -> bool {
        self.scheduler.unsubscribe(key)
    }

    /// Runs `task` once, at the next start of `phase`.
    pub fn once(&mut self, phase: TickPhase, task: impl FnOnce(&mut Scene, &TickEvent) + 'static) {
        self.scheduler.schedule(phase, Task::Deferred(Box::new(task)));
    }

    /// One-shot tasks waiting for `phase`.
    #[must_use]
    pub fn pending_tasks(&self, phase: TickPhase) -> usize {
        self.scheduler.pending(phase)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Destroys one component. Observers are told first, then the component
    /// is removed from every index. Returns `false` for stale handles.
    pub fn destroy_component(&mut self, handle: ComponentHandle) -> bool {
        let Some(entry) = self.registry.entry(handle).cloned() else {
            log::warn!("destroy_component: stale {} handle", handle.kind_name());
            return false;
        };

        if let ComponentHandle::Flight(k) = handle {
            self.stop_flight(k);
        }
        self.emit(handle, ComponentEvent::Destroyed);
        self.notify(handle, Signals::DESTROYED);

        match handle {
            ComponentHandle::Transform(k) => {
                self.transforms.remove(k);
            }
            ComponentHandle::Geometry(k) => {
                if let Some(geometry) = self.geometries.remove(k) {
                    self.release_geometry(geometry);
                }
            }
            ComponentHandle::Lookat(k) => {
                self.lookats.remove(k);
            }
            ComponentHandle::Camera(k) => {
                self.cameras.remove(k);
            }
            ComponentHandle::Clip(k) => {
                self.clips.remove(k);
            }
            ComponentHandle::Clips(k) => {
                self.clip_sets.remove(k);
            }
            ComponentHandle::Light(k) => {
                self.lights.remove(k);
            }
            ComponentHandle::Lights(k) => {
                self.light_sets.remove(k);
            }
            ComponentHandle::Object(k) => {
                self.objects.remove(k);
                self.backend.remove_object(k);
                if self.dirty_set.remove(&k) {
                    self.dirty_objects.retain(|o| *o != k);
                }
            }
            ComponentHandle::Flight(k) => {
                self.flights.remove(k);
            }
            ComponentHandle::Group(k) => {
                self.groups.remove(k);
            }
        }

        self.observers.forget(handle);
        self.defaults.forget(handle);
        self.registry.remove(handle);
        self.events.emit_scene(&SceneEvent::ComponentDestroyed {
            handle,
            id: entry.id.clone(),
            ty: entry.ty,
        });
        self.events.forget(handle);
        self.backend.mark_image_dirty();
        log::trace!("destroyed {} '{}'", entry.ty.name(), entry.id);
        true
    }

    /// Destroys one component by id.
    pub fn destroy_by_id(&mut self, id: &str) -> bool {
        match self.registry.get(id) {
            Some(handle) => self.destroy_component(handle),
            None => {
                log::warn!("{}", StrataError::ComponentNotFound(id.to_string()));
                false
            }
        }
    }

    /// Destroys every component, newest first. Defaults are re-created on demand.
    pub fn clear(&mut self) {
        let mut handles = self.registry.handles_in_order();
        handles.reverse();
        let count = handles.len();
        for handle in handles {
            // Earlier destructions may already have cascaded to this one.
            if self.registry.contains(handle) {
                self.destroy_component(handle);
            }
        }
        self.dirty_objects.clear();
        self.dirty_set.clear();
        log::debug!("Scene {} cleared ({count} components)", self.id);
    }

    /// Clears the scene and drops every subscription. Further constructors fail.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.clear();
        self.scheduler.clear();
        self.events.clear();
        self.observers.clear();
        self.destroyed = true;
        let renderer = self.backend.stats();
        if renderer.live_buffers > 0 {
            log::warn!("Scene {} destroyed with {} live buffers", self.id, renderer.live_buffers);
        }
        log::debug!("Scene {} destroyed", self.id);
    }

    // ========================================================================
    // Statistics & snapshots
    // ========================================================================

    #[must_use]
    pub fn stats(&self) -> SceneStats {
        SceneStats {
            objects: self.objects.len(),
            fps: self.fps.current(),
            renderer: self.backend.stats(),
            ..self.stats
        }
    }

    /// Every component as JSON, in creation order.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let id_of = |handle: Option<ComponentHandle>| handle.and_then(|h| self.registry.id_of(h));
        let components: Vec<serde_json::Value> = self
            .registry
            .handles_in_order()
            .into_iter()
            .filter_map(|handle| {
                let entry = self.registry.entry(handle)?;
                let mut json = match handle {
                    ComponentHandle::Transform(k) => {
                        let t = self.transforms.get(k)?;
                        let mut json = serde_json::json!({
                            "matrix": t.matrix().to_cols_array(),
                            "parent": id_of(t.parent().map(Into::into)),
                        });
                        if let crate::scene::TransformKind::Translate(xyz) = t.kind() {
                            json["xyz"] = serde_json::json!(xyz.to_array());
                        }
                        json
                    }
                    ComponentHandle::Geometry(k) => self.geometries.get(k)?.to_json(),
                    ComponentHandle::Lookat(k) => self.lookats.get(k)?.to_json(),
                    ComponentHandle::Camera(k) => {
                        let camera = self.cameras.get(k)?;
                        camera.to_json(id_of(camera.view().map(Into::into)))
                    }
                    ComponentHandle::Clip(k) => {
                        let clip = self.clips.get(k)?;
                        serde_json::json!({
                            "mode": clip.mode.name(),
                            "dir": clip.dir.to_array(),
                            "dist": clip.dist,
                        })
                    }
                    ComponentHandle::Clips(k) => {
                        let ids: Vec<_> = self.clip_sets.get(k)?.members().iter().map(|m| id_of(Some((*m).into()))).collect();
                        serde_json::json!({ "clips": ids })
                    }
                    ComponentHandle::Light(k) => self.lights.get(k)?.to_json(),
                    ComponentHandle::Lights(k) => {
                        let ids: Vec<_> = self.light_sets.get(k)?.members().iter().map(|m| id_of(Some((*m).into()))).collect();
                        serde_json::json!({ "lights": ids })
                    }
                    ComponentHandle::Object(k) => self.object_to_json(self.objects.get(k)?),
                    ComponentHandle::Flight(k) => {
                        let flight = self.flights.get(k)?;
                        flight.to_json(id_of(flight.camera().map(Into::into)))
                    }
                    ComponentHandle::Group(k) => self.group_to_json(self.groups.get(k)?),
                };
                json["id"] = serde_json::json!(entry.id);
                json["type"] = serde_json::json!(entry.ty.name());
                Some(json)
            })
            .collect();
        serde_json::json!({ "components": components })
    }

    // ========================================================================
    // World boundary
    // ========================================================================

    /// Union of every object's world AABB, recomputed on each call.
    #[must_use]
    pub fn world_aabb(&self) -> Aabb {
        self.world_boundary.aabb(&SceneWorld(self))
    }

    #[must_use]
    pub fn world_center(&self) -> Vec3 {
        self.world_boundary.center(&SceneWorld(self))
    }

    // ========================================================================
    // Picking
    // ========================================================================

    /// Casts a ray through a canvas position and reports the nearest hit.
    pub fn pick(&mut self, params: PickParams) -> Option<PickHit> {
        let frame = self.build_frame();
        let raw = self.backend.pick(&frame, &params)?;
        let item = frame.items.iter().find(|item| item.object == raw.object)?;

        let mut hit = PickHit {
            object: raw.object,
            id: self.registry.id_of(raw.object.into()).unwrap_or_default().to_string(),
            primitive_index: raw.primitive_index,
            indices: None,
            local_pos: None,
            world_pos: None,
            barycentric: None,
            normal: None,
            uv: None,
        };

        let geometry = self
            .objects
            .get(raw.object)
            .and_then(|o| o.geometry)
            .and_then(|g| self.geometries.get(g));
        let Some(geometry) = geometry.filter(|g| g.primitive() == Primitive::Triangles) else {
            return Some(hit);
        };
        let (Some(positions), Some(indices)) = (geometry.positions(), geometry.indices()) else {
            return Some(hit);
        };
        let Some(tri) = indices.get(raw.primitive_index..raw.primitive_index + 3) else {
            return Some(hit);
        };
        let tri = [tri[0], tri[1], tri[2]];
        hit.indices = Some(tri);

        let vertex3 = |data: &[f32], i: u32| {
            let i = i as usize * 3;
            data.get(i..i + 3).map(Vec3::from_slice)
        };
        let (Some(a), Some(b), Some(c)) = (
            vertex3(positions, tri[0]),
            vertex3(positions, tri[1]),
            vertex3(positions, tri[2]),
        ) else {
            return Some(hit);
        };

        let (width, height) = frame.canvas;
        let Some(local) = canvas_ray(&item.clip_from_model(), params.canvas_pos, width, height)
            .and_then(|ray| ray_plane(&ray, a, b, c))
        else {
            return Some(hit);
        };
        hit.local_pos = Some(local);
        hit.world_pos = Some(item.model.transform_point3(local));

        let Some(weights) = barycentric(local, a, b, c) else {
            return Some(hit);
        };
        hit.barycentric = Some(weights);

        if let Some(normals) = geometry.normals()
            && let (Some(na), Some(nb), Some(nc)) = (
                vertex3(normals, tri[0]),
                vertex3(normals, tri[1]),
                vertex3(normals, tri[2]),
            )
        {
            hit.normal = (na * weights.x + nb * weights.y + nc * weights.z).try_normalize();
        }

        if let Some(uv) = geometry.uv() {
            let vertex2 = |i: u32| {
                let i = i as usize * 2;
                uv.get(i..i + 2).map(Vec2::from_slice)
            };
            if let (Some(ua), Some(ub), Some(uc)) = (vertex2(tri[0]), vertex2(tri[1]), vertex2(tri[2])) {
                hit.uv = Some(ua * weights.x + ub * weights.y + uc * weights.z);
            }
        }
        Some(hit)
    }
}
