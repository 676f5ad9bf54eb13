use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::errors::StrataError;
use crate::scene::events::{ComponentEvent, Property};
use crate::scene::observer::Signals;
use crate::scene::{ComponentType, LightKey, Scene};

/// Coordinate system a directional or point light is defined in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightSpace {
    /// Fixed to the viewer.
    #[default]
    View,
    /// Fixed in the world.
    World,
}

impl LightSpace {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::World => "world",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, StrataError> {
        match name {
            "view" => Ok(Self::View),
            "world" => Ok(Self::World),
            other => Err(StrataError::InvalidLightSpace(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub dir: Vec3,
    pub space: LightSpace,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub pos: Vec3,
    /// Constant, linear and quadratic attenuation.
    pub attenuation: Vec3,
    pub space: LightSpace,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional(DirectionalLight),
    Point(PointLight),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
}

pub(crate) const DEFAULT_LIGHT_COLOR: Vec3 = Vec3::new(0.7, 0.7, 0.8);

impl Light {
    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        match self.kind {
            LightKind::Ambient => ComponentType::AmbientLight,
            LightKind::Directional(_) => ComponentType::DirLight,
            LightKind::Point(_) => ComponentType::PointLight,
        }
    }

    #[must_use]
    pub fn space(&self) -> Option<LightSpace> {
        match self.kind {
            LightKind::Ambient => None,
            LightKind::Directional(d) => Some(d.space),
            LightKind::Point(p) => Some(p.space),
        }
    }

    /// Hash fragment: type name followed by `w` for world space, `v` otherwise.
    #[must_use]
    pub fn hash_fragment(&self) -> String {
        let ty = match self.kind {
            LightKind::Ambient => "ambient",
            LightKind::Directional(_) => "dir",
            LightKind::Point(_) => "point",
        };
        let space = if self.space() == Some(LightSpace::World) { 'w' } else { 'v' };
        format!("{ty}{space}")
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        let mut json = serde_json::json!({
            "color": self.color.to_array(),
            "intensity": self.intensity,
        });
        match self.kind {
            LightKind::Ambient => {}
            LightKind::Directional(d) => {
                json["dir"] = serde_json::json!(d.dir.to_array());
                json["space"] = serde_json::json!(d.space.name());
            }
            LightKind::Point(p) => {
                json["pos"] = serde_json::json!(p.pos.to_array());
                json["constantAttenuation"] = serde_json::json!(p.attenuation.x);
                json["linearAttenuation"] = serde_json::json!(p.attenuation.y);
                json["quadraticAttenuation"] = serde_json::json!(p.attenuation.z);
                json["space"] = serde_json::json!(p.space.name());
            }
        }
        json
    }
}

// ============================================================================
// Descriptors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientLightDesc {
    pub id: Option<String>,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for AmbientLightDesc {
    fn default() -> Self {
        Self {
            id: None,
            color: DEFAULT_LIGHT_COLOR,
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirLightDesc {
    pub id: Option<String>,
    pub dir: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub space: LightSpace,
}

impl Default for DirLightDesc {
    fn default() -> Self {
        Self {
            id: None,
            dir: Vec3::NEG_Z,
            color: DEFAULT_LIGHT_COLOR,
            intensity: 1.0,
            space: LightSpace::View,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointLightDesc {
    pub id: Option<String>,
    pub pos: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub constant_attenuation: f32,
    pub linear_attenuation: f32,
    pub quadratic_attenuation: f32,
    pub space: LightSpace,
}

impl Default for PointLightDesc {
    fn default() -> Self {
        Self {
            id: None,
            pos: Vec3::ONE,
            color: DEFAULT_LIGHT_COLOR,
            intensity: 1.0,
            constant_attenuation: 0.0,
            linear_attenuation: 0.0,
            quadratic_attenuation: 0.0,
            space: LightSpace::View,
        }
    }
}

// ============================================================================
// Scene API
// ============================================================================

impl Scene {
    fn insert_light(&mut self, id: Option<&str>, light: Light) -> crate::Result<LightKey> {
        self.ensure_alive()?;
        let id = self.registry.reserve(id)?;
        let ty = light.component_type();
        let key = self.lights.insert(light);
        self.register(id, ty, key.into());
        Ok(key)
    }

    pub fn create_ambient_light(&mut self, desc: AmbientLightDesc) -> crate::Result<LightKey> {
        self.insert_light(
            desc.id.as_deref(),
            Light {
                color: desc.color,
                intensity: desc.intensity,
                kind: LightKind::Ambient,
            },
        )
    }

    pub fn create_dir_light(&mut self, desc: DirLightDesc) -> crate::Result<LightKey> {
        self.insert_light(
            desc.id.as_deref(),
            Light {
                color: desc.color,
                intensity: desc.intensity,
                kind: LightKind::Directional(DirectionalLight {
                    dir: desc.dir,
                    space: desc.space,
                }),
            },
        )
    }

    pub fn create_point_light(&mut self, desc: PointLightDesc) -> crate::Result<LightKey> {
        self.insert_light(
            desc.id.as_deref(),
            Light {
                color: desc.color,
                intensity: desc.intensity,
                kind: LightKind::Point(PointLight {
                    pos: desc.pos,
                    attenuation: Vec3::new(
                        desc.constant_attenuation,
                        desc.linear_attenuation,
                        desc.quadratic_attenuation,
                    ),
                    space: desc.space,
                }),
            },
        )
    }

    #[must_use]
    pub fn light(&self, key: LightKey) -> Option<&Light> {
        self.lights.get(key)
    }

    /// Applies a uniform-only edit: the image is redrawn, no shader rebuild.
    fn edit_light(&mut self, key: LightKey, property: Property, edit: impl FnOnce(&mut Light) -> bool) {
        let Some(light) = self.lights.get_mut(key) else {
            log::warn!("light {}: stale light handle", property.name());
            return;
        };
        if !edit(light) {
            log::warn!("'{}' does not apply to a {}", property.name(), light.component_type().name());
            return;
        }
        self.backend.mark_image_dirty();
        self.emit(key.into(), ComponentEvent::Changed(property));
    }

    pub fn set_light_color(&mut self, key: LightKey, color: Vec3) {
        self.edit_light(key, Property::Color, |light| {
            light.color = color;
            true
        });
    }

    pub fn set_light_intensity(&mut self, key: LightKey, intensity: f32) {
        self.edit_light(key, Property::Intensity, |light| {
            light.intensity = intensity;
            true
        });
    }

    /// Directional lights only.
    pub fn set_light_dir(&mut self, key: LightKey, dir: Vec3) {
        self.edit_light(key, Property::Dir, |light| match &mut light.kind {
            LightKind::Directional(d) => {
                d.dir = dir;
                true
            }
            _ => false,
        });
    }

    /// Point lights only.
    pub fn set_light_pos(&mut self, key: LightKey, pos: Vec3) {
        self.edit_light(key, Property::Pos, |light| match &mut light.kind {
            LightKind::Point(p) => {
                p.pos = pos;
                true
            }
            _ => false,
        });
    }

    /// Point lights only: constant, linear and quadratic factors.
    pub fn set_light_attenuation(&mut self, key: LightKey, attenuation: Vec3) {
        self.edit_light(key, Property::Attenuation, |light| match &mut light.kind {
            LightKind::Point(p) => {
                p.attenuation = attenuation;
                true
            }
            _ => false,
        });
    }

    /// Changing space selects a different shader variant.
    pub fn set_light_space(&mut self, key: LightKey, space: LightSpace) {
        let Some(light) = self.lights.get_mut(key) else {
            log::warn!("set_light_space: stale light handle");
            return;
        };
        match &mut light.kind {
            LightKind::Directional(d) => d.space = space,
            LightKind::Point(p) => p.space = space,
            LightKind::Ambient => {
                log::warn!("'space' does not apply to an AmbientLight");
                return;
            }
        }
        self.backend.mark_image_dirty();
        self.emit(key.into(), ComponentEvent::Changed(Property::Space));
        self.emit(key.into(), ComponentEvent::Dirty);
        self.notify(key.into(), Signals::DIRTY);
    }

    /// Unsupported names log an error and fall back to `view`.
    pub fn set_light_space_name(&mut self, key: LightKey, name: &str) {
        let space = LightSpace::from_name(name).unwrap_or_else(|err| {
            log::error!("{err}, defaulting to 'view'");
            LightSpace::View
        });
        self.set_light_space(key, space);
    }
}
