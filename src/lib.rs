#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod clipping;
pub mod config;
pub mod errors;
pub mod lighting;
pub mod math;
pub mod render;
pub mod resources;
pub mod scene;
pub mod utils;

pub use animation::{CameraFlight, CameraFlightDesc, CubicBezierCurve, FlightTarget, FlyTo};
pub use clipping::{Clip, ClipDesc, ClipMode, Clips, ClipsDesc};
pub use config::SceneConfig;
pub use errors::{Result, StrataError};
pub use lighting::{AmbientLightDesc, DirLightDesc, Light, LightSpace, Lights, LightsDesc, PointLightDesc};
pub use math::{Aabb, Aabb2};
pub use render::{Backend, HeadlessRenderer, PickParams, RenderOptions};
pub use resources::{Geometry, GeometryDesc, Primitive};
pub use scene::{
    CameraDesc, CameraKey, ClipKey, ClipsKey, ComponentEvent, ComponentHandle, ComponentType,
    FlightKey, GeometryKey, GroupDesc, GroupKey, LightKey, LightsKey, LookatDesc, LookatKey,
    ObjectDesc, ObjectKey, PickHit, Property, Scene, SceneEvent, TickEvent, TickPhase,
    TransformDesc, TransformKey, TranslateDesc,
};
pub use utils::KeyboardAxisCamera;
