use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::math::{Aabb, Aabb2};
use crate::render::CompiledObject;
use crate::resources::boundary::{
    Boundary2D, Boundary2DSource, Boundary3D, Boundary3DInput, BoundarySource, DirtyLatch,
};
use crate::scene::events::{ComponentEvent, Property};
use crate::scene::observer::Signals;
use crate::scene::{
    CameraKey, ClipsKey, ComponentHandle, ComponentType, GeometryKey, LightsKey, ObjectKey, Scene,
    TransformKey,
};

/// 可绘制对象
///
/// Binds a transform, geometry, camera, clips and lights into something the
/// renderer can draw. The bindings are non-owning; destroying a bound
/// component leaves the slot empty and recompiles the object.
#[derive(Debug)]
pub struct Object {
    pub(crate) transform: Option<TransformKey>,
    pub(crate) geometry: Option<GeometryKey>,
    pub(crate) camera: Option<CameraKey>,
    pub(crate) clips: Option<ClipsKey>,
    pub(crate) lights: Option<LightsKey>,
    pub(crate) visible: bool,

    // === 包围盒缓存 ===
    world_boundary: Boundary3D,
    world_dirty: DirtyLatch,
    canvas_boundary: Boundary2D,
    canvas_dirty: DirtyLatch,

    pub(crate) compiled: Option<CompiledObject>,
    pub(crate) compiles: u64,
}

impl Object {
    #[inline]
    #[must_use]
    pub fn transform(&self) -> Option<TransformKey> {
        self.transform
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> Option<GeometryKey> {
        self.geometry
    }

    #[inline]
    #[must_use]
    pub fn camera(&self) -> Option<CameraKey> {
        self.camera
    }

    #[inline]
    #[must_use]
    pub fn clips(&self) -> Option<ClipsKey> {
        self.clips
    }

    #[inline]
    #[must_use]
    pub fn lights(&self) -> Option<LightsKey> {
        self.lights
    }

    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// State handed to the renderer by the last compile.
    #[inline]
    #[must_use]
    pub fn compiled(&self) -> Option<&CompiledObject> {
        self.compiled.as_ref()
    }

    /// How many times this object has been compiled.
    #[inline]
    #[must_use]
    pub fn compile_count(&self) -> u64 {
        self.compiles
    }

    fn latch_boundaries(&self) {
        self.world_dirty.set();
        self.canvas_dirty.set();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectDesc {
    pub id: Option<String>,
    pub transform: Option<TransformKey>,
    pub geometry: Option<GeometryKey>,
    pub camera: Option<CameraKey>,
    pub clips: Option<ClipsKey>,
    pub lights: Option<LightsKey>,
    pub visible: bool,
}

impl Default for ObjectDesc {
    fn default() -> Self {
        Self {
            id: None,
            transform: None,
            geometry: None,
            camera: None,
            clips: None,
            lights: None,
            visible: true,
        }
    }
}

const TRANSFORM_SIGNALS: Signals = Signals::UPDATED.union(Signals::DESTROYED);
const GEOMETRY_SIGNALS: Signals = Signals::DIRTY.union(Signals::BOUNDARY).union(Signals::DESTROYED);
const CAMERA_SIGNALS: Signals = Signals::UPDATED.union(Signals::DESTROYED);
const STATE_SIGNALS: Signals = Signals::DIRTY.union(Signals::DESTROYED);

fn signals_for(handle: ComponentHandle) -> Signals {
    match handle {
        ComponentHandle::Transform(_) => TRANSFORM_SIGNALS,
        ComponentHandle::Geometry(_) => GEOMETRY_SIGNALS,
        ComponentHandle::Camera(_) => CAMERA_SIGNALS,
        _ => STATE_SIGNALS,
    }
}

// ============================================================================
// Boundary sources
// ============================================================================

struct WorldSource<'a> {
    scene: &'a Scene,
    object: &'a Object,
}

impl BoundarySource for WorldSource<'_> {
    fn take_dirty(&self) -> bool {
        self.object.world_dirty.take()
    }

    fn input(&self) -> Boundary3DInput<'_> {
        let Some(corners) = self.object.geometry.and_then(|g| self.scene.geometry_obb(g)) else {
            return Boundary3DInput::Aabb(Aabb::EMPTY);
        };
        let matrix = self
            .object
            .transform
            .and_then(|t| self.scene.leaf_matrix(t))
            .unwrap_or(Mat4::IDENTITY);
        Boundary3DInput::Obb { corners, matrix }
    }
}

struct CanvasSource<'a> {
    scene: &'a Scene,
    object: &'a Object,
}

impl Boundary2DSource for CanvasSource<'_> {
    fn take_dirty(&self) -> bool {
        self.object.canvas_dirty.take()
    }

    fn obb(&self) -> [Vec3; 8] {
        self.object.world_boundary.obb(&WorldSource {
            scene: self.scene,
            object: self.object,
        })
    }

    fn view_projection(&self) -> Mat4 {
        let Some(camera) = self.object.camera.and_then(|c| self.scene.cameras.get(c)) else {
            return Mat4::IDENTITY;
        };
        let view = camera
            .view
            .and_then(|v| self.scene.lookats.get(v))
            .map_or(Mat4::IDENTITY, |l| l.matrix());
        camera.projection(self.scene.config.canvas.aspect()) * view
    }

    fn canvas(&self) -> (u32, u32) {
        (self.scene.config.canvas.width, self.scene.config.canvas.height)
    }
}

// ============================================================================
// Scene API
// ============================================================================

impl Scene {
    pub fn create_object(&mut self, desc: ObjectDesc) -> crate::Result<ObjectKey> {
        self.ensure_alive()?;
        let auto = self.config.auto_defaults;

        let transform = match desc.transform {
            None if auto => Some(self.default_transform()?),
            other => other.filter(|k| self.transforms.contains_key(*k)),
        };
        let geometry = match desc.geometry {
            None if auto => Some(self.default_geometry()?),
            other => other.filter(|k| self.geometries.contains_key(*k)),
        };
        let camera = match desc.camera {
            None if auto => Some(self.default_camera()?),
            other => other.filter(|k| self.cameras.contains_key(*k)),
        };
        let clips = match desc.clips {
            None if auto => Some(self.default_clips()?),
            other => other.filter(|k| self.clip_sets.contains_key(*k)),
        };
        let lights = match desc.lights {
            None if auto => Some(self.default_lights()?),
            other => other.filter(|k| self.light_sets.contains_key(*k)),
        };
        // Checked after the defaults, which register under well-known ids.
        let id = self.registry.reserve(desc.id.as_deref())?;

        let key = self.objects.insert(Object {
            transform,
            geometry,
            camera,
            clips,
            lights,
            visible: desc.visible,
            world_boundary: Boundary3D::new(),
            world_dirty: DirtyLatch::default(),
            canvas_boundary: Boundary2D::new(),
            canvas_dirty: DirtyLatch::default(),
            compiled: None,
            compiles: 0,
        });
        self.register(id, ComponentType::Object, key.into());

        let bound: [Option<ComponentHandle>; 5] = [
            transform.map(Into::into),
            geometry.map(Into::into),
            camera.map(Into::into),
            clips.map(Into::into),
            lights.map(Into::into),
        ];
        for handle in bound.into_iter().flatten() {
            self.observers.subscribe(handle, key.into(), signals_for(handle));
        }
        self.mark_object_dirty(key);
        Ok(key)
    }

    #[must_use]
    pub fn object(&self, key: ObjectKey) -> Option<&Object> {
        self.objects.get(key)
    }

    /// Queues an object for the next compile pass. Idempotent.
    pub(crate) fn mark_object_dirty(&mut self, key: ObjectKey) {
        if self.objects.contains_key(key) && self.dirty_set.insert(key) {
            self.dirty_objects.push(key);
        }
    }

    #[must_use]
    pub fn is_object_dirty(&self, key: ObjectKey) -> bool {
        self.dirty_set.contains(&key)
    }

    // ========================================================================
    // Rebinding
    // ========================================================================

    fn rebind_object(
        &mut self,
        key: ObjectKey,
        property: Property,
        old: Option<ComponentHandle>,
        new: Option<ComponentHandle>,
    ) {
        if let Some(old) = old {
            self.observers.unsubscribe(old, key.into(), signals_for(old));
        }
        if let Some(new) = new {
            self.observers.subscribe(new, key.into(), signals_for(new));
        }
        if let Some(object) = self.objects.get(key) {
            object.latch_boundaries();
        }
        self.backend.mark_image_dirty();
        self.mark_object_dirty(key);
        self.emit(key.into(), ComponentEvent::Changed(property));
    }

    pub fn set_object_transform(&mut self, key: ObjectKey, transform: Option<TransformKey>) {
        if transform.is_some_and(|t| !self.transforms.contains_key(t)) {
            log::error!("set_object_transform: stale transform handle");
            return;
        }
        let Some(object) = self.objects.get_mut(key) else {
            log::warn!("set_object_transform: stale object handle");
            return;
        };
        let old = std::mem::replace(&mut object.transform, transform);
        self.rebind_object(key, Property::Transform, old.map(Into::into), transform.map(Into::into));
    }

    pub fn set_object_geometry(&mut self, key: ObjectKey, geometry: Option<GeometryKey>) {
        if geometry.is_some_and(|g| !self.geometries.contains_key(g)) {
            log::error!("set_object_geometry: stale geometry handle");
            return;
        }
        let Some(object) = self.objects.get_mut(key) else {
            log::warn!("set_object_geometry: stale object handle");
            return;
        };
        let old = std::mem::replace(&mut object.geometry, geometry);
        self.rebind_object(key, Property::Geometry, old.map(Into::into), geometry.map(Into::into));
    }

    pub fn set_object_camera(&mut self, key: ObjectKey, camera: Option<CameraKey>) {
        if camera.is_some_and(|c| !self.cameras.contains_key(c)) {
            log::error!("set_object_camera: stale camera handle");
            return;
        }
        let Some(object) = self.objects.get_mut(key) else {
            log::warn!("set_object_camera: stale object handle");
            return;
        };
        let old = std::mem::replace(&mut object.camera, camera);
        self.rebind_object(key, Property::Camera, old.map(Into::into), camera.map(Into::into));
    }

    pub fn set_object_clips(&mut self, key: ObjectKey, clips: Option<ClipsKey>) {
        if clips.is_some_and(|c| !self.clip_sets.contains_key(c)) {
            log::error!("set_object_clips: stale clips handle");
            return;
        }
        let Some(object) = self.objects.get_mut(key) else {
            log::warn!("set_object_clips: stale object handle");
            return;
        };
        let old = std::mem::replace(&mut object.clips, clips);
        self.rebind_object(key, Property::Clips, old.map(Into::into), clips.map(Into::into));
    }

    pub fn set_object_lights(&mut self, key: ObjectKey, lights: Option<LightsKey>) {
        if lights.is_some_and(|l| !self.light_sets.contains_key(l)) {
            log::error!("set_object_lights: stale lights handle");
            return;
        }
        let Some(object) = self.objects.get_mut(key) else {
            log::warn!("set_object_lights: stale object handle");
            return;
        };
        let old = std::mem::replace(&mut object.lights, lights);
        self.rebind_object(key, Property::Lights, old.map(Into::into), lights.map(Into::into));
    }

    /// Visibility only affects drawing, so no recompile is needed.
    pub fn set_object_visible(&mut self, key: ObjectKey, visible: bool) {
        let Some(object) = self.objects.get_mut(key) else {
            log::warn!("set_object_visible: stale object handle");
            return;
        };
        if object.visible == visible {
            return;
        }
        object.visible = visible;
        self.backend.mark_image_dirty();
        self.emit(key.into(), ComponentEvent::Changed(Property::Visible));
    }

    pub(crate) fn object_on_signal(&mut self, key: ObjectKey, subject: ComponentHandle, signal: Signals) {
        let Some(object) = self.objects.get_mut(key) else {
            return;
        };

        if signal.contains(Signals::DESTROYED) {
            match subject {
                ComponentHandle::Transform(k) if object.transform == Some(k) => object.transform = None,
                ComponentHandle::Geometry(k) if object.geometry == Some(k) => object.geometry = None,
                ComponentHandle::Camera(k) if object.camera == Some(k) => object.camera = None,
                ComponentHandle::Clips(k) if object.clips == Some(k) => object.clips = None,
                ComponentHandle::Lights(k) if object.lights == Some(k) => object.lights = None,
                _ => return,
            }
            object.latch_boundaries();
            self.mark_object_dirty(key);
            return;
        }

        match subject {
            ComponentHandle::Transform(_) if signal.contains(Signals::UPDATED) => object.latch_boundaries(),
            ComponentHandle::Camera(_) if signal.contains(Signals::UPDATED) => {
                object.canvas_dirty.set();
            }
            ComponentHandle::Geometry(_) => {
                if signal.contains(Signals::BOUNDARY) {
                    object.latch_boundaries();
                }
                if signal.contains(Signals::DIRTY) {
                    self.mark_object_dirty(key);
                }
            }
            _ if signal.contains(Signals::DIRTY) => self.mark_object_dirty(key),
            _ => {}
        }
    }

    // ========================================================================
    // Boundaries
    // ========================================================================

    /// World-space AABB of the object's geometry under its leaf matrix.
    #[must_use]
    pub fn object_world_aabb(&self, key: ObjectKey) -> Option<Aabb> {
        let object = self.objects.get(key)?;
        Some(object.world_boundary.aabb(&WorldSource { scene: self, object }))
    }

    #[must_use]
    pub fn object_world_obb(&self, key: ObjectKey) -> Option<[Vec3; 8]> {
        let object = self.objects.get(key)?;
        Some(object.world_boundary.obb(&WorldSource { scene: self, object }))
    }

    #[must_use]
    pub fn object_world_center(&self, key: ObjectKey) -> Option<Vec3> {
        let object = self.objects.get(key)?;
        Some(object.world_boundary.center(&WorldSource { scene: self, object }))
    }

    fn build_object_view(&mut self, key: ObjectKey) {
        let view = self
            .objects
            .get(key)
            .and_then(|o| o.camera)
            .and_then(|c| self.cameras.get(c))
            .and_then(|c| c.view);
        if let Some(view) = view {
            self.build_lookat(view);
        }
    }

    /// Canvas-pixel AABB of the world boundary. Builds a dirty view first.
    pub fn object_canvas_aabb(&mut self, key: ObjectKey) -> Option<Aabb2> {
        self.build_object_view(key);
        let object = self.objects.get(key)?;
        Some(object.canvas_boundary.aabb(&CanvasSource { scene: self, object }))
    }

    pub fn object_canvas_center(&mut self, key: ObjectKey) -> Option<Vec2> {
        self.build_object_view(key);
        let object = self.objects.get(key)?;
        Some(object.canvas_boundary.center(&CanvasSource { scene: self, object }))
    }

    pub(crate) fn latch_canvas_boundaries(&self) {
        for object in self.objects.values() {
            object.canvas_dirty.set();
        }
    }

    // ========================================================================
    // Compile
    // ========================================================================

    /// Compiles the object's dependencies and hands the result to the renderer.
    pub(crate) fn compile_object(&mut self, key: ObjectKey) {
        let Some(object) = self.objects.get(key) else {
            return;
        };
        let (geometry, clips, lights) = (object.geometry, object.clips, object.lights);

        let mut program_hash = String::new();
        let mut primitive = crate::resources::Primitive::default();
        if let Some(g) = geometry {
            self.compile_geometry(g);
            if let Some(geometry) = self.geometries.get(g) {
                program_hash.push_str(&geometry.hash);
                primitive = geometry.primitive();
            }
        }
        let clip_keys = match clips {
            Some(c) => {
                self.compile_clips(c);
                self.clip_sets.get(c).map(|set| {
                    program_hash.push_str("/c/");
                    program_hash.push_str(set.hash());
                    set.snapshot().to_vec()
                })
            }
            None => None,
        };
        let light_keys = match lights {
            Some(l) => {
                self.compile_lights(l);
                self.light_sets.get(l).map(|set| {
                    program_hash.push_str("/l/");
                    program_hash.push_str(set.hash());
                    set.snapshot().to_vec()
                })
            }
            None => None,
        };
        self.build_object_view(key);

        let compiled = CompiledObject {
            primitive,
            program_hash,
            geometry,
            clips: clip_keys.unwrap_or_default(),
            lights: light_keys.unwrap_or_default(),
        };
        self.backend.build_object(key, &compiled);
        if let Some(object) = self.objects.get_mut(key) {
            object.compiled = Some(compiled);
            object.compiles += 1;
        }
    }

    pub(crate) fn object_to_json(&self, object: &Object) -> serde_json::Value {
        let id = |handle: Option<ComponentHandle>| handle.and_then(|h| self.registry.id_of(h));
        serde_json::json!({
            "transform": id(object.transform.map(Into::into)),
            "geometry": id(object.geometry.map(Into::into)),
            "camera": id(object.camera.map(Into::into)),
            "clips": id(object.clips.map(Into::into)),
            "lights": id(object.lights.map(Into::into)),
            "visible": object.visible,
        })
    }
}
