//! Clipping planes and their ordered aggregate.

pub mod clip;
pub mod clips;

pub use clip::{Clip, ClipDesc, ClipMode};
pub use clips::{Clips, ClipsDesc};
