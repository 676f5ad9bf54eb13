//! CPU-only backend.
//!
//! Keeps a copy of every allocated buffer so frames can be validated and
//! picked without a GPU. Program hashes are interned; objects that compile to
//! the same hash share one program id.

use std::cell::Cell;

use glam::Vec3;
use lasso::{Rodeo, Spur};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::math::ray::{canvas_ray, ray_triangle};
use crate::render::{
    BufferAllocator, CompiledObject, DrawItem, Frame, PickParams, RawHit, RenderOptions, Renderer,
    RendererStats,
};
use crate::resources::buffer::{BufferDescriptor, BufferRef, BufferSource};
use crate::resources::geometry::Primitive;
use crate::scene::ObjectKey;

#[derive(Debug, Clone)]
enum BufferData {
    F32(Vec<f32>),
    U32(Vec<u32>),
}

#[derive(Debug, Clone, Copy)]
struct ObjectState {
    program: Spur,
    primitive: Primitive,
}

/// 无头渲染器
#[derive(Debug)]
pub struct HeadlessRenderer {
    next_buffer_id: u64,
    buffers: FxHashMap<u64, BufferData>,
    objects: FxHashMap<ObjectKey, ObjectState>,
    programs: Rodeo,
    image_dirty: Cell<bool>,
    stats: RendererStats,
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_buffer_id: 1,
            buffers: FxHashMap::default(),
            objects: FxHashMap::default(),
            programs: Rodeo::default(),
            image_dirty: Cell::new(true),
            stats: RendererStats::default(),
        }
    }

    /// CPU copy of an `f32` buffer, if still allocated.
    #[must_use]
    pub fn buffer_f32(&self, buffer: &BufferRef) -> Option<&[f32]> {
        match self.buffers.get(&buffer.id())? {
            BufferData::F32(data) => Some(data),
            BufferData::U32(_) => None,
        }
    }

    /// CPU copy of a `u32` buffer, if still allocated.
    #[must_use]
    pub fn buffer_u32(&self, buffer: &BufferRef) -> Option<&[u32]> {
        match self.buffers.get(&buffer.id())? {
            BufferData::U32(data) => Some(data),
            BufferData::F32(_) => None,
        }
    }

    #[must_use]
    pub fn is_live(&self, buffer: &BufferRef) -> bool {
        self.buffers.contains_key(&buffer.id())
    }

    /// Program hash the object was last built with.
    #[must_use]
    pub fn program_of(&self, key: ObjectKey) -> Option<&str> {
        self.objects.get(&key).map(|state| self.programs.resolve(&state.program))
    }

    fn triangles<'a>(&'a self, item: &DrawItem) -> Option<(&'a [f32], &'a [u32])> {
        if item.primitive != Primitive::Triangles {
            return None;
        }
        let positions = self.buffer_f32(item.buffers.positions.as_ref()?)?;
        let indices = self.buffer_u32(item.buffers.indices.as_ref()?)?;
        Some((positions, indices))
    }
}

fn vertex(positions: &[f32], index: u32) -> Option<Vec3> {
    let i = index as usize * 3;
    positions.get(i..i + 3).map(Vec3::from_slice)
}

impl BufferAllocator for HeadlessRenderer {
    fn allocate(&mut self, desc: &BufferDescriptor<'_>) -> BufferRef {
        let id = self.next_buffer_id;
        self.next_buffer_id += 1;
        let data = match desc.data {
            BufferSource::F32(d) => BufferData::F32(d.to_vec()),
            BufferSource::U32(d) => BufferData::U32(d.to_vec()),
        };
        self.buffers.insert(id, data);
        self.stats.buffers_allocated += 1;
        BufferRef::new(id, desc)
    }

    fn release(&mut self, buffer: &BufferRef) {
        if self.buffers.remove(&buffer.id()).is_some() {
            self.stats.buffers_released += 1;
        } else {
            log::warn!("Released unknown buffer {}", buffer.id());
        }
    }

    fn read_f32(&self, buffer: &BufferRef) -> Option<&[f32]> {
        self.buffer_f32(buffer)
    }
}

impl Renderer for HeadlessRenderer {
    fn build_object(&mut self, key: ObjectKey, compiled: &CompiledObject) {
        let program = self.programs.get_or_intern(&compiled.program_hash);
        self.objects.insert(
            key,
            ObjectState {
                program,
                primitive: compiled.primitive,
            },
        );
        self.image_dirty.set(true);
    }

    fn remove_object(&mut self, key: ObjectKey) {
        if self.objects.remove(&key).is_some() {
            self.image_dirty.set(true);
        }
    }

    fn mark_image_dirty(&self) {
        self.image_dirty.set(true);
    }

    fn image_dirty(&self) -> bool {
        self.image_dirty.get()
    }

    fn render(&mut self, frame: &Frame, options: RenderOptions) -> bool {
        if !self.image_dirty.get() && !options.force {
            return false;
        }
        let mut draws = 0;
        for item in frame.items.iter().filter(|item| item.visible) {
            let Some(state) = self.objects.get(&item.object) else {
                log::warn!("Draw item for an object that was never built");
                continue;
            };
            if state.primitive != item.primitive {
                log::debug!("Object primitive changed since last compile");
            }
            match &item.buffers.positions {
                Some(positions) if self.is_live(positions) => draws += 1,
                Some(_) => log::warn!("Draw item references a released positions buffer"),
                None => {}
            }
        }
        self.stats.draws += draws;
        self.stats.frames_drawn += 1;
        self.image_dirty.set(false);
        log::trace!("headless frame: {draws} draws, clear={}", options.clear);
        true
    }

    fn pick(&self, frame: &Frame, params: &PickParams) -> Option<RawHit> {
        let (width, height) = frame.canvas;
        let mut nearest: Option<(f32, RawHit)> = None;

        for item in frame.items.iter().filter(|item| item.visible) {
            let Some((positions, indices)) = self.triangles(item) else {
                continue;
            };
            let clip_from_model = item.clip_from_model();
            let Some(ray) = canvas_ray(&clip_from_model, params.canvas_pos, width, height) else {
                continue;
            };
            for (i, tri) in indices.chunks_exact(3).enumerate() {
                let (Some(a), Some(b), Some(c)) = (
                    vertex(positions, tri[0]),
                    vertex(positions, tri[1]),
                    vertex(positions, tri[2]),
                ) else {
                    continue;
                };
                let Some(t) = ray_triangle(&ray, a, b, c) else {
                    continue;
                };
                let depth = clip_from_model.project_point3(ray.at(t)).z;
                if nearest.is_none_or(|(d, _)| depth < d) {
                    nearest = Some((
                        depth,
                        RawHit {
                            object: item.object,
                            primitive_index: i * 3,
                        },
                    ));
                }
            }
        }
        nearest.map(|(_, hit)| hit)
    }

    fn stats(&self) -> RendererStats {
        let programs: FxHashSet<Spur> = self.objects.values().map(|s| s.program).collect();
        RendererStats {
            live_buffers: self.buffers.len(),
            objects: self.objects.len(),
            programs: programs.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::buffer::{BufferKind, BufferUsage};

    fn positions_desc(data: &[f32]) -> BufferDescriptor<'_> {
        BufferDescriptor {
            kind: BufferKind::Array,
            data: BufferSource::F32(data),
            item_size: 3,
            usage: BufferUsage::Static,
        }
    }

    #[test]
    fn allocate_and_release_track_live_buffers() {
        let mut renderer = HeadlessRenderer::new();
        let data = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let buffer = renderer.allocate(&positions_desc(&data));

        assert_eq!(buffer.num_items(), 2);
        assert_eq!(renderer.buffer_f32(&buffer), Some(&data[..]));
        assert_eq!(renderer.stats().live_buffers, 1);

        renderer.release(&buffer);
        assert!(!renderer.is_live(&buffer));
        assert_eq!(renderer.stats().buffers_released, 1);
    }

    #[test]
    fn render_skips_clean_image_unless_forced() {
        let mut renderer = HeadlessRenderer::new();
        let frame = Frame::default();

        assert!(renderer.render(&frame, RenderOptions::default()));
        assert!(!renderer.render(&frame, RenderOptions::default()));
        assert!(renderer.render(
            &frame,
            RenderOptions {
                clear: true,
                force: true
            }
        ));

        renderer.mark_image_dirty();
        assert!(renderer.image_dirty());
        assert!(renderer.render(&frame, RenderOptions::default()));
        assert_eq!(renderer.stats().frames_drawn, 3);
    }
}
