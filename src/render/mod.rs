//! Rendering Backend Interface
//!
//! The scene graph never talks to a graphics API directly. Everything it
//! needs from one is expressed by two traits:
//!
//! - [`BufferAllocator`]: turns CPU arrays into opaque [`BufferRef`]s and back
//! - [`Renderer`]: keeps compiled per-object state, draws frames and picks
//!
//! Any type implementing both is a [`Backend`]. The crate ships
//! [`HeadlessRenderer`], which keeps everything on the CPU and is what tests
//! and benches run against.
//!
//! # Frame flow
//!
//! ```text
//! compile pass ── CompiledObject ──▶ Renderer::build_object
//! render step  ── Frame(DrawItems) ─▶ Renderer::render
//! pick         ── Frame + PickParams ▶ Renderer::pick ──▶ RawHit
//! ```
//!
//! A [`CompiledObject`] only carries keys, the primitive and the program hash.
//! Matrices, clip planes and light values are read live into each
//! [`DrawItem`] when a frame is built, so content edits never need a
//! recompile.

pub mod headless;

use glam::{Mat4, Vec2};
use serde::Serialize;

use crate::clipping::Clip;
use crate::lighting::Light;
use crate::resources::buffer::{BufferDescriptor, BufferRef};
use crate::resources::geometry::{GeometryBuffers, Primitive};
use crate::scene::{ClipKey, GeometryKey, LightKey, ObjectKey};

pub use headless::HeadlessRenderer;

/// Per-call render flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Clear the target before drawing.
    pub clear: bool,
    /// Draw even when the image is not dirty.
    pub force: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            clear: true,
            force: false,
        }
    }
}

/// Shader-relevant state produced by compiling an object.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledObject {
    pub primitive: Primitive,
    /// Concatenated geometry, clips and lights hashes. Objects with equal
    /// hashes share a program.
    pub program_hash: String,
    pub geometry: Option<GeometryKey>,
    /// Clip planes as of the last aggregate rebuild, in order.
    pub clips: Vec<ClipKey>,
    /// Lights as of the last aggregate rebuild, in order.
    pub lights: Vec<LightKey>,
}

/// One object's draw state for a single frame.
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub object: ObjectKey,
    pub visible: bool,
    pub primitive: Primitive,
    pub buffers: GeometryBuffers,
    /// Leaf matrix of the object's transform.
    pub model: Mat4,
    pub normal: Mat4,
    pub view: Mat4,
    pub view_normal: Mat4,
    pub projection: Mat4,
    pub clips: Vec<Clip>,
    pub lights: Vec<Light>,
}

impl DrawItem {
    /// `projection × view × model`
    #[inline]
    #[must_use]
    pub fn clip_from_model(&self) -> Mat4 {
        self.projection * self.view * self.model
    }
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Canvas size in pixels.
    pub canvas: (u32, u32),
    pub items: Vec<DrawItem>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickParams {
    /// Canvas position in pixels, origin top-left.
    pub canvas_pos: Vec2,
}

/// What the renderer reports for a pick; the scene enriches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHit {
    pub object: ObjectKey,
    /// Position in the index array of the hit primitive's first index.
    pub primitive_index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RendererStats {
    pub buffers_allocated: u64,
    pub buffers_released: u64,
    pub live_buffers: usize,
    pub objects: usize,
    /// Distinct programs in use.
    pub programs: usize,
    pub frames_drawn: u64,
    pub draws: u64,
}

/// Creates and frees vertex and index buffers.
pub trait BufferAllocator {
    fn allocate(&mut self, desc: &BufferDescriptor<'_>) -> BufferRef;
    fn release(&mut self, buffer: &BufferRef);

    /// Reads back an `f32` buffer. Backends without CPU copies return `None`.
    fn read_f32(&self, _buffer: &BufferRef) -> Option<&[f32]> {
        None
    }
}

/// Receives compiled objects and draws frames.
pub trait Renderer {
    fn build_object(&mut self, key: ObjectKey, compiled: &CompiledObject);
    fn remove_object(&mut self, key: ObjectKey);

    /// Requests a redraw on the next render. Callable through `&self` so lazy
    /// getters can invalidate the image.
    fn mark_image_dirty(&self);
    fn image_dirty(&self) -> bool;

    /// Draws the frame if the image is dirty or `options.force` is set.
    /// Returns whether anything was drawn.
    fn render(&mut self, frame: &Frame, options: RenderOptions) -> bool;

    fn pick(&self, frame: &Frame, params: &PickParams) -> Option<RawHit>;

    fn stats(&self) -> RendererStats;
}

/// A complete rendering backend.
pub trait Backend: Renderer + BufferAllocator {}

impl<T: Renderer + BufferAllocator> Backend for T {}
