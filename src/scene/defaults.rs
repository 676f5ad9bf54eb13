//! Lazily created `default.*` components.
//!
//! Objects created without a transform, geometry, camera, clips or lights
//! share these. Each one is created on first request under its well-known
//! id. A live component of the right type already registered under that id
//! is adopted instead; if the id is taken by another type, the default gets
//! a generated id.

use glam::Vec3;

use crate::clipping::ClipsDesc;
use crate::lighting::{AmbientLightDesc, DirLightDesc, LightSpace, LightsDesc};
use crate::resources::geometry::GeometryDesc;
use crate::scene::camera::CameraDesc;
use crate::scene::lookat::LookatDesc;
use crate::scene::transform::TransformDesc;
use crate::scene::{
    CameraKey, ClipsKey, ComponentHandle, GeometryKey, LightsKey, LookatKey, Scene, TransformKey,
};

pub const DEFAULT_TRANSFORM_ID: &str = "default.transform";
pub const DEFAULT_LOOKAT_ID: &str = "default.lookat";
pub const DEFAULT_CAMERA_ID: &str = "default.camera";
pub const DEFAULT_GEOMETRY_ID: &str = "default.geometry";
pub const DEFAULT_CLIPS_ID: &str = "default.clips";
pub const DEFAULT_LIGHTS_ID: &str = "default.lights";

/// Keys of the defaults created so far.
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    pub(crate) transform: Option<TransformKey>,
    pub(crate) lookat: Option<LookatKey>,
    pub(crate) camera: Option<CameraKey>,
    pub(crate) geometry: Option<GeometryKey>,
    pub(crate) clips: Option<ClipsKey>,
    pub(crate) lights: Option<LightsKey>,
}

impl Defaults {
    /// Clears the slot holding `handle`, so the next request re-creates it.
    pub(crate) fn forget(&mut self, handle: ComponentHandle) {
        match handle {
            ComponentHandle::Transform(k) if self.transform == Some(k) => self.transform = None,
            ComponentHandle::Lookat(k) if self.lookat == Some(k) => self.lookat = None,
            ComponentHandle::Camera(k) if self.camera == Some(k) => self.camera = None,
            ComponentHandle::Geometry(k) if self.geometry == Some(k) => self.geometry = None,
            ComponentHandle::Clips(k) if self.clips == Some(k) => self.clips = None,
            ComponentHandle::Lights(k) if self.lights == Some(k) => self.lights = None,
            _ => {}
        }
    }
}

impl Scene {
    /// The well-known id, or `None` (generate one) if another component holds it.
    fn default_id(&self, id: &'static str) -> Option<String> {
        if self.registry.get(id).is_some() {
            log::warn!("'{id}' is taken by an unrelated component; default gets a generated id");
            None
        } else {
            Some(id.to_string())
        }
    }

    pub fn default_transform(&mut self) -> crate::Result<TransformKey> {
        if let Some(key) = self.defaults.transform {
            return Ok(key);
        }
        let key = match self.registry.get(DEFAULT_TRANSFORM_ID) {
            Some(ComponentHandle::Transform(key)) => key,
            _ => self.create_transform(TransformDesc {
                id: self.default_id(DEFAULT_TRANSFORM_ID),
                ..TransformDesc::default()
            })?,
        };
        self.defaults.transform = Some(key);
        Ok(key)
    }

    pub fn default_lookat(&mut self) -> crate::Result<LookatKey> {
        if let Some(key) = self.defaults.lookat {
            return Ok(key);
        }
        let key = match self.registry.get(DEFAULT_LOOKAT_ID) {
            Some(ComponentHandle::Lookat(key)) => key,
            _ => self.create_lookat(LookatDesc {
                id: self.default_id(DEFAULT_LOOKAT_ID),
                ..LookatDesc::default()
            })?,
        };
        self.defaults.lookat = Some(key);
        Ok(key)
    }

    pub fn default_camera(&mut self) -> crate::Result<CameraKey> {
        if let Some(key) = self.defaults.camera {
            return Ok(key);
        }
        let key = match self.registry.get(DEFAULT_CAMERA_ID) {
            Some(ComponentHandle::Camera(key)) => key,
            _ => {
                let view = self.default_lookat()?;
                self.create_camera(CameraDesc {
                    id: self.default_id(DEFAULT_CAMERA_ID),
                    view: Some(view),
                    perspective: None,
                })?
            }
        };
        self.defaults.camera = Some(key);
        Ok(key)
    }

    /// The 2×2×2 box.
    pub fn default_geometry(&mut self) -> crate::Result<GeometryKey> {
        if let Some(key) = self.defaults.geometry {
            return Ok(key);
        }
        let key = match self.registry.get(DEFAULT_GEOMETRY_ID) {
            Some(ComponentHandle::Geometry(key)) => key,
            _ => self.create_geometry(GeometryDesc {
                id: self.default_id(DEFAULT_GEOMETRY_ID),
                ..GeometryDesc::default()
            })?,
        };
        self.defaults.geometry = Some(key);
        Ok(key)
    }

    /// An empty clip list.
    pub fn default_clips(&mut self) -> crate::Result<ClipsKey> {
        if let Some(key) = self.defaults.clips {
            return Ok(key);
        }
        let key = match self.registry.get(DEFAULT_CLIPS_ID) {
            Some(ComponentHandle::Clips(key)) => key,
            _ => self.create_clips(ClipsDesc {
                id: self.default_id(DEFAULT_CLIPS_ID),
                clips: Vec::new(),
            })?,
        };
        self.defaults.clips = Some(key);
        Ok(key)
    }

    /// One ambient and two world-space directional lights.
    pub fn default_lights(&mut self) -> crate::Result<LightsKey> {
        if let Some(key) = self.defaults.lights {
            return Ok(key);
        }
        let key = match self.registry.get(DEFAULT_LIGHTS_ID) {
            Some(ComponentHandle::Lights(key)) => key,
            _ => {
                let ambient = self.create_ambient_light(AmbientLightDesc {
                    id: None,
                    color: Vec3::new(0.8, 0.8, 0.9),
                    intensity: 0.6,
                })?;
                let key_light = self.create_dir_light(DirLightDesc {
                    id: None,
                    dir: Vec3::new(-0.5, -0.5, 1.0),
                    color: Vec3::new(1.0, 1.0, 0.9),
                    intensity: 0.5,
                    space: LightSpace::World,
                })?;
                let fill_light = self.create_dir_light(DirLightDesc {
                    id: None,
                    dir: Vec3::new(1.0, -0.9, 0.7),
                    color: Vec3::ONE,
                    intensity: 0.5,
                    space: LightSpace::World,
                })?;
                let key = self.create_lights(LightsDesc {
                    id: self.default_id(DEFAULT_LIGHTS_ID),
                    lights: Vec::new(),
                })?;
                self.set_lights_keys(key, vec![ambient, key_light, fill_light]);
                key
            }
        };
        self.defaults.lights = Some(key);
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ComponentType;

    #[test]
    fn defaults_are_created_once() {
        let mut scene = Scene::new();
        let a = scene.default_lights().unwrap();
        let b = scene.default_lights().unwrap();
        assert_eq!(a, b);
        assert_eq!(scene.components_of_type(ComponentType::DirLight).len(), 2);
        assert_eq!(scene.component_id(a.into()), Some(DEFAULT_LIGHTS_ID));
    }

    #[test]
    fn existing_component_with_default_id_is_adopted() {
        let mut scene = Scene::new();
        let mine = scene
            .create_transform(TransformDesc {
                id: Some(DEFAULT_TRANSFORM_ID.to_string()),
                ..TransformDesc::default()
            })
            .unwrap();
        assert_eq!(scene.default_transform().unwrap(), mine);
    }

    #[test]
    fn destroyed_default_is_recreated() {
        let mut scene = Scene::new();
        let first = scene.default_geometry().unwrap();
        assert!(scene.destroy_component(first.into()));
        let second = scene.default_geometry().unwrap();
        assert_ne!(first, second);
        assert!(scene.geometry(second).is_some());
    }
}
