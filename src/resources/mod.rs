//! Geometry Resources
//!
//! CPU-side data that the scene turns into GPU buffers:
//! - [`Geometry`]: raw vertex arrays plus their derived buffers
//! - [`buffer`]: buffer descriptors and handles exchanged with the backend
//! - [`boundary`]: lazily recomputed bounding volumes
//! - [`primitives`]: box and cylinder generators

pub mod boundary;
pub mod buffer;
pub mod geometry;
pub mod primitives;

pub use boundary::{Boundary2D, Boundary2DSource, Boundary3D, Boundary3DInput, BoundarySource, DirtyLatch};
pub use buffer::{BufferDescriptor, BufferKind, BufferRef, BufferSource, BufferUsage};
pub use geometry::{
    AttributeFlags, Geometry, GeometryBuffers, GeometryDesc, MemoryStats, PickBuffers, Primitive,
};
pub use primitives::*;
