use std::cell::OnceCell;

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::errors::StrataError;
use crate::math::Aabb;
use crate::math::mesh::{build_normals, build_tangents, pick_primitives};
use crate::render::Backend;
use crate::resources::boundary::{Boundary3D, Boundary3DInput, BoundarySource, DirtyLatch};
use crate::resources::buffer::{BufferDescriptor, BufferKind, BufferRef, BufferSource, BufferUsage};
use crate::resources::primitives::create_box;
use crate::scene::events::{ComponentEvent, Property};
use crate::scene::observer::Signals;
use crate::scene::scheduler::{Task, TickPhase};
use crate::scene::{ComponentType, GeometryKey, Scene};

// ============================================================================
// Enums & flags
// ============================================================================

/// Primitive topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Primitive {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl Primitive {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::LineLoop => "line-loop",
            Self::LineStrip => "line-strip",
            Self::Triangles => "triangles",
            Self::TriangleStrip => "triangle-strip",
            Self::TriangleFan => "triangle-fan",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, StrataError> {
        match name {
            "points" => Ok(Self::Points),
            "lines" => Ok(Self::Lines),
            "line-loop" => Ok(Self::LineLoop),
            "line-strip" => Ok(Self::LineStrip),
            "triangles" => Ok(Self::Triangles),
            "triangle-strip" => Ok(Self::TriangleStrip),
            "triangle-fan" => Ok(Self::TriangleFan),
            other => Err(StrataError::InvalidPrimitive(other.to_string())),
        }
    }
}

bitflags! {
    /// Raw vertex attributes, used both as presence mask and dirty mask.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct AttributeFlags: u8 {
        const POSITIONS = 1 << 0;
        const COLORS    = 1 << 1;
        const NORMALS   = 1 << 2;
        const UV        = 1 << 3;
        const INDICES   = 1 << 4;
    }
}

// ============================================================================
// Derived buffers
// ============================================================================

/// GPU buffers built from a geometry's raw arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffers {
    pub positions: Option<BufferRef>,
    pub colors: Option<BufferRef>,
    pub normals: Option<BufferRef>,
    pub uv: Option<BufferRef>,
    pub indices: Option<BufferRef>,
}

impl GeometryBuffers {
    fn slot_mut(&mut self, attr: AttributeFlags) -> &mut Option<BufferRef> {
        if attr == AttributeFlags::POSITIONS {
            &mut self.positions
        } else if attr == AttributeFlags::COLORS {
            &mut self.colors
        } else if attr == AttributeFlags::NORMALS {
            &mut self.normals
        } else if attr == AttributeFlags::UV {
            &mut self.uv
        } else {
            &mut self.indices
        }
    }
}

/// Un-indexed, per-triangle colored geometry for color picking.
#[derive(Debug, Clone, PartialEq)]
pub struct PickBuffers {
    pub positions: BufferRef,
    pub colors: BufferRef,
    pub indices: BufferRef,
}

/// Per-attribute item counts held in GPU buffers, summed over a scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub meshes: usize,
    pub positions: usize,
    pub colors: usize,
    pub normals: usize,
    pub tangents: usize,
    pub uvs: usize,
    pub indices: usize,
}

impl MemoryStats {
    fn counter(&mut self, attr: AttributeFlags) -> &mut usize {
        if attr == AttributeFlags::POSITIONS {
            &mut self.positions
        } else if attr == AttributeFlags::COLORS {
            &mut self.colors
        } else if attr == AttributeFlags::NORMALS {
            &mut self.normals
        } else if attr == AttributeFlags::UV {
            &mut self.uvs
        } else {
            &mut self.indices
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Construction parameters for [`Scene::create_geometry`].
///
/// With no positions, normals, uv or indices the geometry becomes the
/// canonical 2×2×2 box. With positions but no indices, and a primitive that
/// is absent or `line-strip`, sequential line-strip indices are generated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryDesc {
    pub id: Option<String>,
    pub primitive: Option<Primitive>,
    pub usage: BufferUsage,
    pub positions: Option<Vec<f32>>,
    pub colors: Option<Vec<f32>>,
    pub normals: Option<Vec<f32>>,
    pub uv: Option<Vec<f32>>,
    pub indices: Option<Vec<u32>>,
    pub auto_normals: bool,
}

#[derive(Debug)]
pub struct Geometry {
    pub(crate) primitive: Primitive,
    pub(crate) usage: BufferUsage,
    pub(crate) positions: Option<Vec<f32>>,
    pub(crate) colors: Option<Vec<f32>>,
    pub(crate) normals: Option<Vec<f32>>,
    pub(crate) uv: Option<Vec<f32>>,
    pub(crate) indices: Option<Vec<u32>>,
    pub(crate) auto_normals: bool,

    // === GPU 资源 ===
    pub(crate) buffers: GeometryBuffers,
    pub(crate) tangents: Option<BufferRef>,
    pub(crate) pick: Option<PickBuffers>,

    // === 脏检查状态 ===
    pub(crate) dirty: AttributeFlags,
    pub(crate) build_scheduled: bool,
    pub(crate) tangents_dirty: bool,
    pub(crate) pick_dirty: bool,
    pub(crate) hash: String,
    pub(crate) hash_dirty: bool,

    pub(crate) boundary: OnceCell<Boundary3D>,
    pub(crate) boundary_dirty: DirtyLatch,
    pub(crate) builds: u64,
}

impl Geometry {
    fn from_desc(desc: GeometryDesc) -> Self {
        let GeometryDesc {
            primitive,
            usage,
            mut positions,
            colors,
            mut normals,
            mut uv,
            mut indices,
            auto_normals,
            ..
        } = desc;

        let mut primitive = primitive;
        if positions.is_none() && normals.is_none() && uv.is_none() && indices.is_none() {
            let cube = create_box(2.0, 2.0, 2.0);
            positions = cube.positions;
            normals = cube.normals;
            uv = cube.uv;
            indices = cube.indices;
            primitive = Some(Primitive::Triangles);
        } else if indices.is_none()
            && matches!(primitive, None | Some(Primitive::LineStrip))
            && let Some(p) = &positions
        {
            indices = Some((0..(p.len() / 3) as u32).collect());
            primitive = Some(Primitive::LineStrip);
        }

        let mut geometry = Self {
            primitive: primitive.unwrap_or_default(),
            usage,
            positions,
            colors,
            normals,
            uv,
            indices,
            auto_normals,
            buffers: GeometryBuffers::default(),
            tangents: None,
            pick: None,
            dirty: AttributeFlags::empty(),
            build_scheduled: false,
            tangents_dirty: true,
            pick_dirty: true,
            hash: String::new(),
            hash_dirty: true,
            boundary: OnceCell::new(),
            boundary_dirty: DirtyLatch::default(),
            builds: 0,
        };
        geometry.dirty = geometry.present();
        geometry
    }

    /// Attributes that currently hold data.
    #[must_use]
    pub fn present(&self) -> AttributeFlags {
        let mut flags = AttributeFlags::empty();
        flags.set(AttributeFlags::POSITIONS, self.positions.is_some());
        flags.set(AttributeFlags::COLORS, self.colors.is_some());
        flags.set(AttributeFlags::NORMALS, self.normals.is_some());
        flags.set(AttributeFlags::UV, self.uv.is_some());
        flags.set(AttributeFlags::INDICES, self.indices.is_some());
        flags
    }

    fn compute_hash(&self) -> String {
        let mut hash = format!("/g/{};", self.primitive.name());
        for (flag, code) in [
            (AttributeFlags::POSITIONS, '0'),
            (AttributeFlags::COLORS, '1'),
            (AttributeFlags::NORMALS, '2'),
            (AttributeFlags::UV, '3'),
        ] {
            if self.present().contains(flag) {
                hash.push(code);
            }
        }
        hash.push(';');
        hash
    }

    #[must_use]
    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    #[must_use]
    pub fn buffers(&self) -> &GeometryBuffers {
        &self.buffers
    }

    #[must_use]
    pub fn positions(&self) -> Option<&[f32]> {
        self.positions.as_deref()
    }

    #[must_use]
    pub fn normals(&self) -> Option<&[f32]> {
        self.normals.as_deref()
    }

    #[must_use]
    pub fn uv(&self) -> Option<&[f32]> {
        self.uv.as_deref()
    }

    #[must_use]
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "primitive": self.primitive.name(),
            "usage": self.usage.name(),
            "autoNormals": self.auto_normals,
            "positions": self.positions,
            "colors": self.colors,
            "normals": self.normals,
            "uv": self.uv,
            "indices": self.indices,
        })
    }
}

/// Reads a geometry's local boundary through its one-shot latch.
struct GeometryBoundary<'a>(&'a Geometry);

impl BoundarySource for GeometryBoundary<'_> {
    fn take_dirty(&self) -> bool {
        self.0.boundary_dirty.take()
    }

    fn input(&self) -> Boundary3DInput<'_> {
        Boundary3DInput::Positions(self.0.positions.as_deref().unwrap_or(&[]))
    }
}

/// Releases `slot` and allocates a replacement from `data`, keeping the memory counter in step.
fn rebuild_slot(
    backend: &mut dyn Backend,
    slot: &mut Option<BufferRef>,
    counter: &mut usize,
    desc: Option<BufferDescriptor<'_>>,
) {
    if let Some(old) = slot.take() {
        *counter = counter.saturating_sub(old.num_items());
        backend.release(&old);
    }
    if let Some(desc) = desc {
        let buffer = backend.allocate(&desc);
        *counter += buffer.num_items();
        *slot = Some(buffer);
    }
}

fn item_size(attr: AttributeFlags) -> u32 {
    if attr == AttributeFlags::POSITIONS || attr == AttributeFlags::NORMALS {
        3
    } else if attr == AttributeFlags::COLORS {
        4
    } else if attr == AttributeFlags::UV {
        2
    } else {
        1
    }
}

const BUILD_ORDER: [AttributeFlags; 5] = [
    AttributeFlags::POSITIONS,
    AttributeFlags::COLORS,
    AttributeFlags::NORMALS,
    AttributeFlags::UV,
    AttributeFlags::INDICES,
];

// ============================================================================
// Scene API
// ============================================================================

impl Scene {
    pub fn create_geometry(&mut self, desc: GeometryDesc) -> crate::Result<GeometryKey> {
        self.ensure_alive()?;
        let id = self.registry.reserve(desc.id.as_deref())?;
        let key = self.geometries.insert(Geometry::from_desc(desc));
        self.register(id, ComponentType::Geometry, key.into());
        self.stats.memory.meshes += 1;
        self.schedule_geometry_build(key);
        Ok(key)
    }

    #[must_use]
    pub fn geometry(&self, key: GeometryKey) -> Option<&Geometry> {
        self.geometries.get(key)
    }

    fn schedule_geometry_build(&mut self, key: GeometryKey) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            return;
        };
        if !geometry.build_scheduled {
            geometry.build_scheduled = true;
            self.scheduler.schedule(TickPhase::Tick, Task::BuildGeometry(key));
        }
    }

    fn geometry_attribute_changed(
        &mut self,
        key: GeometryKey,
        attr: AttributeFlags,
        property: Property,
        structural: bool,
    ) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            return;
        };
        geometry.dirty |= attr;
        if structural {
            geometry.hash_dirty = true;
        }
        self.schedule_geometry_build(key);
        self.emit(key.into(), ComponentEvent::Changed(property));
        if structural {
            self.emit(key.into(), ComponentEvent::Dirty);
            self.notify(key.into(), Signals::DIRTY);
        }
    }

    pub fn set_geometry_positions(&mut self, key: GeometryKey, positions: Option<Vec<f32>>) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            log::warn!("set_geometry_positions: stale geometry handle");
            return;
        };
        let structural = geometry.positions.is_some() != positions.is_some();
        geometry.positions = positions;
        let rising = geometry.boundary_dirty.set();
        let boundary_exists = geometry.boundary.get().is_some();

        self.geometry_attribute_changed(key, AttributeFlags::POSITIONS, Property::Positions, structural);
        if rising && boundary_exists {
            self.emit(key.into(), ComponentEvent::Boundary);
            self.notify(key.into(), Signals::BOUNDARY);
        }
    }

    pub fn set_geometry_colors(&mut self, key: GeometryKey, colors: Option<Vec<f32>>) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            log::warn!("set_geometry_colors: stale geometry handle");
            return;
        };
        let structural = geometry.colors.is_some() != colors.is_some();
        geometry.colors = colors;
        self.geometry_attribute_changed(key, AttributeFlags::COLORS, Property::Colors, structural);
    }

    pub fn set_geometry_normals(&mut self, key: GeometryKey, normals: Option<Vec<f32>>) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            log::warn!("set_geometry_normals: stale geometry handle");
            return;
        };
        let structural = geometry.normals.is_some() != normals.is_some();
        geometry.normals = normals;
        self.geometry_attribute_changed(key, AttributeFlags::NORMALS, Property::Normals, structural);
    }

    pub fn set_geometry_uv(&mut self, key: GeometryKey, uv: Option<Vec<f32>>) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            log::warn!("set_geometry_uv: stale geometry handle");
            return;
        };
        let structural = geometry.uv.is_some() != uv.is_some();
        geometry.uv = uv;
        self.geometry_attribute_changed(key, AttributeFlags::UV, Property::Uv, structural);
    }

    pub fn set_geometry_indices(&mut self, key: GeometryKey, indices: Option<Vec<u32>>) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            log::warn!("set_geometry_indices: stale geometry handle");
            return;
        };
        let structural = geometry.indices.is_some() != indices.is_some();
        geometry.indices = indices;
        self.geometry_attribute_changed(key, AttributeFlags::INDICES, Property::Indices, structural);
    }

    pub fn set_geometry_primitive(&mut self, key: GeometryKey, primitive: Primitive) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            log::warn!("set_geometry_primitive: stale geometry handle");
            return;
        };
        geometry.primitive = primitive;
        geometry.hash_dirty = true;
        self.backend.mark_image_dirty();
        self.emit(key.into(), ComponentEvent::Changed(Property::Primitive));
        self.emit(key.into(), ComponentEvent::Dirty);
        self.notify(key.into(), Signals::DIRTY);
    }

    /// Parses a primitive name. Unsupported names log an error and fall back to triangles.
    pub fn set_geometry_primitive_name(&mut self, key: GeometryKey, name: &str) {
        let primitive = Primitive::from_name(name).unwrap_or_else(|err| {
            log::error!("{err}, defaulting to 'triangles'");
            Primitive::Triangles
        });
        self.set_geometry_primitive(key, primitive);
    }

    /// Changing usage reallocates every present buffer on the next build.
    pub fn set_geometry_usage(&mut self, key: GeometryKey, usage: BufferUsage) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            log::warn!("set_geometry_usage: stale geometry handle");
            return;
        };
        if geometry.usage == usage {
            return;
        }
        geometry.usage = usage;
        geometry.dirty |= geometry.present();
        self.schedule_geometry_build(key);
        self.emit(key.into(), ComponentEvent::Changed(Property::Usage));
    }

    /// Parses a usage name. Unsupported names log an error and fall back to static.
    pub fn set_geometry_usage_name(&mut self, key: GeometryKey, name: &str) {
        let usage = BufferUsage::from_name(name).unwrap_or_else(|| {
            log::error!("{}, defaulting to 'static'", StrataError::InvalidUsage(name.to_string()));
            BufferUsage::Static
        });
        self.set_geometry_usage(key, usage);
    }

    pub fn set_geometry_auto_normals(&mut self, key: GeometryKey, auto_normals: bool) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            log::warn!("set_geometry_auto_normals: stale geometry handle");
            return;
        };
        geometry.auto_normals = auto_normals;
        geometry.dirty |= AttributeFlags::NORMALS;
        self.schedule_geometry_build(key);
        self.emit(key.into(), ComponentEvent::Changed(Property::AutoNormals));
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Runs the deferred buffer build. A no-op when nothing is dirty.
    pub(crate) fn build_geometry(&mut self, key: GeometryKey) {
        let Some(geometry) = self.geometries.get_mut(key) else {
            return;
        };
        geometry.build_scheduled = false;
        if geometry.dirty.is_empty() {
            return;
        }

        let mut gained_normals = false;
        if geometry.auto_normals
            && geometry.dirty.intersects(AttributeFlags::POSITIONS | AttributeFlags::INDICES | AttributeFlags::NORMALS)
            && let (Some(positions), Some(indices)) = (&geometry.positions, &geometry.indices)
        {
            gained_normals = geometry.normals.is_none();
            geometry.normals = Some(build_normals(positions, indices));
            geometry.dirty |= AttributeFlags::NORMALS;
            // A new attribute changes the shader variant.
            geometry.hash_dirty |= gained_normals;
        }

        let backend = self.backend.as_mut();
        let memory = &mut self.stats.memory;
        let usage = geometry.usage;
        let dirty = geometry.dirty;

        for attr in BUILD_ORDER.into_iter().filter(|a| dirty.contains(*a)) {
            let kind = if attr == AttributeFlags::INDICES {
                BufferKind::ElementArray
            } else {
                BufferKind::Array
            };
            let data = if attr == AttributeFlags::POSITIONS {
                geometry.positions.as_deref().map(BufferSource::F32)
            } else if attr == AttributeFlags::COLORS {
                geometry.colors.as_deref().map(BufferSource::F32)
            } else if attr == AttributeFlags::NORMALS {
                geometry.normals.as_deref().map(BufferSource::F32)
            } else if attr == AttributeFlags::UV {
                geometry.uv.as_deref().map(BufferSource::F32)
            } else {
                geometry.indices.as_deref().map(BufferSource::U32)
            };
            let desc = data.map(|data| BufferDescriptor {
                kind,
                data,
                item_size: item_size(attr),
                usage,
            });
            rebuild_slot(backend, geometry.buffers.slot_mut(attr), memory.counter(attr), desc);
        }

        if dirty.intersects(AttributeFlags::POSITIONS | AttributeFlags::INDICES) {
            geometry.pick_dirty = true;
        }
        if dirty.intersects(AttributeFlags::POSITIONS | AttributeFlags::NORMALS | AttributeFlags::UV | AttributeFlags::INDICES) {
            geometry.tangents_dirty = true;
        }
        geometry.dirty = AttributeFlags::empty();
        geometry.builds += 1;
        log::trace!("built geometry buffers ({dirty:?})");

        self.backend.mark_image_dirty();
        if gained_normals {
            self.emit(key.into(), ComponentEvent::Dirty);
            self.notify(key.into(), Signals::DIRTY);
        }
    }

    /// Builds now if a build is pending, then refreshes the hash.
    pub(crate) fn compile_geometry(&mut self, key: GeometryKey) {
        if self.geometries.get(key).is_some_and(|g| !g.dirty.is_empty()) {
            self.build_geometry(key);
        }
        if let Some(geometry) = self.geometries.get_mut(key)
            && geometry.hash_dirty
        {
            geometry.hash = geometry.compute_hash();
            geometry.hash_dirty = false;
        }
    }

    /// Current GPU buffers, building first if a build is pending.
    pub fn geometry_buffers(&mut self, key: GeometryKey) -> Option<&GeometryBuffers> {
        self.compile_geometry(key);
        self.geometries.get(key).map(|g| &g.buffers)
    }

    /// Shader-variant hash, e.g. `"/g/triangles;023;"`.
    pub fn geometry_hash(&mut self, key: GeometryKey) -> Option<&str> {
        self.compile_geometry(key);
        self.geometries.get(key).map(|g| g.hash.as_str())
    }

    /// `true` while a build task is queued and has not run yet.
    #[must_use]
    pub fn is_geometry_build_pending(&self, key: GeometryKey) -> bool {
        self.geometries.get(key).is_some_and(|g| g.build_scheduled)
    }

    /// Number of buffer builds performed so far.
    #[must_use]
    pub fn geometry_build_count(&self, key: GeometryKey) -> u64 {
        self.geometries.get(key).map_or(0, |g| g.builds)
    }

    /// Tangent buffer, rebuilt on demand from positions, indices and uv.
    pub fn geometry_tangents(&mut self, key: GeometryKey) -> Option<BufferRef> {
        self.compile_geometry(key);
        let geometry = self.geometries.get_mut(key)?;
        if geometry.tangents_dirty {
            geometry.tangents_dirty = false;
            let data = match (&geometry.positions, &geometry.indices, &geometry.uv) {
                (Some(p), Some(i), Some(uv)) => Some(build_tangents(p, i, uv)),
                _ => None,
            };
            let desc = data.as_deref().map(|d| BufferDescriptor {
                kind: BufferKind::Array,
                data: BufferSource::F32(d),
                item_size: 3,
                usage: geometry.usage,
            });
            rebuild_slot(
                self.backend.as_mut(),
                &mut geometry.tangents,
                &mut self.stats.memory.tangents,
                desc,
            );
        }
        geometry.tangents.clone()
    }

    /// Color-picking buffers, rebuilt on demand. Requires positions and indices.
    pub fn geometry_pick_buffers(&mut self, key: GeometryKey) -> Option<PickBuffers> {
        self.compile_geometry(key);
        let geometry = self.geometries.get_mut(key)?;
        if geometry.pick_dirty {
            geometry.pick_dirty = false;
            let backend = self.backend.as_mut();
            if let Some(old) = geometry.pick.take() {
                for buffer in [&old.positions, &old.colors, &old.indices] {
                    backend.release(buffer);
                }
            }
            if let (Some(positions), Some(indices)) = (&geometry.positions, &geometry.indices) {
                let pick = pick_primitives(positions, indices);
                let usage = geometry.usage;
                geometry.pick = Some(PickBuffers {
                    positions: backend.allocate(&BufferDescriptor {
                        kind: BufferKind::Array,
                        data: BufferSource::F32(&pick.positions),
                        item_size: 3,
                        usage,
                    }),
                    colors: backend.allocate(&BufferDescriptor {
                        kind: BufferKind::Array,
                        data: BufferSource::F32(&pick.colors),
                        item_size: 4,
                        usage,
                    }),
                    indices: backend.allocate(&BufferDescriptor {
                        kind: BufferKind::ElementArray,
                        data: BufferSource::U32(&pick.indices),
                        item_size: 1,
                        usage,
                    }),
                });
            }
        }
        geometry.pick.clone()
    }

    // ========================================================================
    // Boundary
    // ========================================================================

    /// Local-space AABB. Creates the boundary on first use.
    #[must_use]
    pub fn geometry_aabb(&self, key: GeometryKey) -> Option<Aabb> {
        let geometry = self.geometries.get(key)?;
        let boundary = geometry.boundary.get_or_init(Boundary3D::new);
        Some(boundary.aabb(&GeometryBoundary(geometry)))
    }

    #[must_use]
    pub fn geometry_center(&self, key: GeometryKey) -> Option<Vec3> {
        let geometry = self.geometries.get(key)?;
        let boundary = geometry.boundary.get_or_init(Boundary3D::new);
        Some(boundary.center(&GeometryBoundary(geometry)))
    }

    #[must_use]
    pub fn geometry_obb(&self, key: GeometryKey) -> Option<[Vec3; 8]> {
        let geometry = self.geometries.get(key)?;
        let boundary = geometry.boundary.get_or_init(Boundary3D::new);
        Some(boundary.obb(&GeometryBoundary(geometry)))
    }

    /// Releases every buffer held by a geometry that is being destroyed.
    pub(crate) fn release_geometry(&mut self, mut geometry: Geometry) {
        let backend = self.backend.as_mut();
        let memory = &mut self.stats.memory;
        for attr in BUILD_ORDER {
            rebuild_slot(backend, geometry.buffers.slot_mut(attr), memory.counter(attr), None);
        }
        rebuild_slot(backend, &mut geometry.tangents, &mut memory.tangents, None);
        if let Some(pick) = geometry.pick.take() {
            for buffer in [&pick.positions, &pick.colors, &pick.indices] {
                backend.release(buffer);
            }
        }
        memory.meshes = memory.meshes.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_desc_becomes_box() {
        let geometry = Geometry::from_desc(GeometryDesc::default());
        assert_eq!(geometry.positions.as_ref().map(Vec::len), Some(72));
        assert_eq!(geometry.indices.as_ref().map(Vec::len), Some(36));
        assert_eq!(geometry.primitive, Primitive::Triangles);
    }

    #[test]
    fn positions_only_becomes_line_strip() {
        let geometry = Geometry::from_desc(GeometryDesc {
            positions: Some(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]),
            ..Default::default()
        });
        assert_eq!(geometry.primitive, Primitive::LineStrip);
        assert_eq!(geometry.indices, Some(vec![0, 1, 2]));
    }

    #[test]
    fn hash_lists_present_attributes() {
        let geometry = Geometry::from_desc(GeometryDesc::default());
        assert_eq!(geometry.compute_hash(), "/g/triangles;023;");
    }

    #[test]
    fn primitive_names_parse() {
        assert_eq!(Primitive::from_name("line-loop").unwrap(), Primitive::LineLoop);
        assert!(Primitive::from_name("quads").is_err());
    }
}
