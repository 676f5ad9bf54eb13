//! Ambient, directional and point lights, and their ordered aggregate.

pub mod light;
pub mod lights;

pub use light::{
    AmbientLightDesc, DirLightDesc, DirectionalLight, Light, LightKind, LightSpace, PointLight,
    PointLightDesc,
};
pub use lights::{Lights, LightsDesc};
