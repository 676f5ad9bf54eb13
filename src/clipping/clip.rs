use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::errors::StrataError;
use crate::scene::events::{ComponentEvent, Property};
use crate::scene::observer::Signals;
use crate::scene::{ClipKey, ComponentType, Scene};

/// Which side of the plane is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    #[default]
    Disabled,
    Inside,
    Outside,
}

impl ClipMode {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Inside => "inside",
            Self::Outside => "outside",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, StrataError> {
        match name {
            "disabled" => Ok(Self::Disabled),
            "inside" => Ok(Self::Inside),
            "outside" => Ok(Self::Outside),
            other => Err(StrataError::InvalidClipMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipDesc {
    pub id: Option<String>,
    pub mode: ClipMode,
    pub dir: Vec3,
    pub dist: f32,
}

impl Default for ClipDesc {
    fn default() -> Self {
        Self {
            id: None,
            mode: ClipMode::Disabled,
            dir: Vec3::X,
            dist: 1.0,
        }
    }
}

/// An arbitrarily-aligned clipping plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clip {
    pub mode: ClipMode,
    pub dir: Vec3,
    pub dist: f32,
}

impl Scene {
    pub fn create_clip(&mut self, desc: ClipDesc) -> crate::Result<ClipKey> {
        self.ensure_alive()?;
        let id = self.registry.reserve(desc.id.as_deref())?;
        let key = self.clips.insert(Clip {
            mode: desc.mode,
            dir: desc.dir,
            dist: desc.dist,
        });
        self.register(id, ComponentType::Clip, key.into());
        Ok(key)
    }

    #[must_use]
    pub fn clip(&self, key: ClipKey) -> Option<&Clip> {
        self.clips.get(key)
    }

    /// Mode changes select a different shader variant.
    pub fn set_clip_mode(&mut self, key: ClipKey, mode: ClipMode) {
        let Some(clip) = self.clips.get_mut(key) else {
            log::warn!("set_clip_mode: stale clip handle");
            return;
        };
        clip.mode = mode;
        self.backend.mark_image_dirty();
        self.emit(key.into(), ComponentEvent::Changed(Property::Mode));
        self.emit(key.into(), ComponentEvent::Dirty);
        self.notify(key.into(), Signals::DIRTY);
    }

    /// Unsupported names log an error and fall back to `disabled`.
    pub fn set_clip_mode_name(&mut self, key: ClipKey, name: &str) {
        let mode = ClipMode::from_name(name).unwrap_or_else(|err| {
            log::error!("{err}, defaulting to 'disabled'");
            ClipMode::Disabled
        });
        self.set_clip_mode(key, mode);
    }

    pub fn set_clip_dir(&mut self, key: ClipKey, dir: Vec3) {
        let Some(clip) = self.clips.get_mut(key) else {
            log::warn!("set_clip_dir: stale clip handle");
            return;
        };
        clip.dir = dir;
        self.backend.mark_image_dirty();
        self.emit(key.into(), ComponentEvent::Changed(Property::Dir));
    }

    pub fn set_clip_dist(&mut self, key: ClipKey, dist: f32) {
        let Some(clip) = self.clips.get_mut(key) else {
            log::warn!("set_clip_dist: stale clip handle");
            return;
        };
        clip.dist = dist;
        self.backend.mark_image_dirty();
        self.emit(key.into(), ComponentEvent::Changed(Property::Dist));
    }
}
