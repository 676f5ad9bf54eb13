//! Utility Module
//!
//! - [`Timer`]: wall clock for [`Scene::tick`](crate::Scene::tick)
//! - [`FpsCounter`]: frame rate over one-second windows
//! - [`KeyboardAxisCamera`]: number-key snapping to axis-aligned views

pub mod axis_camera;
pub mod fps_counter;
pub mod time;

pub use axis_camera::KeyboardAxisCamera;
pub use fps_counter::FpsCounter;
pub use time::Timer;
