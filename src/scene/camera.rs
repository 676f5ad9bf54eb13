use std::cell::Cell;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::config::PerspectiveConfig;
use crate::scene::events::{ComponentEvent, Property};
use crate::scene::observer::Signals;
use crate::scene::{CameraKey, ComponentHandle, ComponentType, LookatKey, Scene};

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Perspective {
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub near: f32,
    pub far: f32,
    /// Width / height. `None` follows the canvas.
    pub aspect: Option<f32>,
}

impl Default for Perspective {
    fn default() -> Self {
        Self::from(PerspectiveConfig::default())
    }
}

impl From<PerspectiveConfig> for Perspective {
    fn from(config: PerspectiveConfig) -> Self {
        Self {
            fovy: config.fovy,
            near: config.near,
            far: config.far,
            aspect: None,
        }
    }
}

impl Perspective {
    #[must_use]
    pub fn matrix(&self, canvas_aspect: f32) -> Mat4 {
        let aspect = self.aspect.unwrap_or(canvas_aspect);
        Mat4::perspective_rh_gl(self.fovy.to_radians(), aspect, self.near, self.far)
    }
}

/// 相机组件
///
/// Pairs a view ([`Lookat`](crate::scene::Lookat)) with a perspective
/// projection. The projection matrix is cached until the parameters or the
/// canvas aspect change.
#[derive(Debug)]
pub struct Camera {
    pub(crate) view: Option<LookatKey>,
    pub(crate) perspective: Perspective,
    projection: Cell<Option<Mat4>>,
}

impl Camera {
    #[inline]
    #[must_use]
    pub fn view(&self) -> Option<LookatKey> {
        self.view
    }

    #[inline]
    #[must_use]
    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    /// Cached projection, computed with `canvas_aspect` when stale.
    #[must_use]
    pub fn projection(&self, canvas_aspect: f32) -> Mat4 {
        if let Some(m) = self.projection.get() {
            return m;
        }
        let m = self.perspective.matrix(canvas_aspect);
        self.projection.set(Some(m));
        m
    }

    pub(crate) fn invalidate_projection(&self) {
        self.projection.set(None);
    }

    pub(crate) fn to_json(&self, view_id: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "view": view_id,
            "fovy": self.perspective.fovy,
            "near": self.perspective.near,
            "far": self.perspective.far,
            "aspect": self.perspective.aspect,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDesc {
    pub id: Option<String>,
    /// Falls back to the scene's default lookat when auto defaults are on.
    pub view: Option<LookatKey>,
    /// Falls back to the configured perspective.
    pub perspective: Option<Perspective>,
}

const VIEW_SIGNALS: Signals = Signals::UPDATED.union(Signals::DESTROYED);

impl Scene {
    pub fn create_camera(&mut self, desc: CameraDesc) -> crate::Result<CameraKey> {
        self.ensure_alive()?;
        let view = match desc.view {
            Some(view) if self.lookats.contains_key(view) => Some(view),
            Some(_) => {
                log::error!("create_camera: stale lookat handle, using default view");
                self.fallback_lookat()?
            }
            None => self.fallback_lookat()?,
        };
        let perspective = desc
            .perspective
            .unwrap_or_else(|| Perspective::from(self.config.camera));
        // Fallbacks may have claimed a well-known id.
        let id = self.registry.reserve(desc.id.as_deref())?;
        let key = self.cameras.insert(Camera {
            view,
            perspective,
            projection: Cell::new(None),
        });
        self.register(id, ComponentType::Camera, key.into());
        if let Some(view) = view {
            self.observers.subscribe(view.into(), key.into(), VIEW_SIGNALS);
        }
        Ok(key)
    }

    fn fallback_lookat(&mut self) -> crate::Result<Option<LookatKey>> {
        if self.config.auto_defaults {
            self.default_lookat().map(Some)
        } else {
            Ok(None)
        }
    }

    #[must_use]
    pub fn camera(&self, key: CameraKey) -> Option<&Camera> {
        self.cameras.get(key)
    }

    /// Rebinds the view. `None` leaves the camera with an identity view.
    pub fn set_camera_view(&mut self, key: CameraKey, view: Option<LookatKey>) {
        let Some(camera) = self.cameras.get(key) else {
            log::warn!("set_camera_view: stale camera handle");
            return;
        };
        if let Some(v) = view
            && !self.lookats.contains_key(v)
        {
            log::error!("set_camera_view: stale lookat handle");
            return;
        }
        if let Some(old) = camera.view {
            self.observers.unsubscribe(old.into(), key.into(), VIEW_SIGNALS);
        }
        if let Some(new) = view {
            self.observers.subscribe(new.into(), key.into(), VIEW_SIGNALS);
        }
        self.cameras[key].view = view;
        self.backend.mark_image_dirty();
        self.emit(key.into(), ComponentEvent::Changed(Property::View));
        self.camera_updated(key);
    }

    pub fn set_camera_perspective(&mut self, key: CameraKey, perspective: Perspective) {
        let Some(camera) = self.cameras.get_mut(key) else {
            log::warn!("set_camera_perspective: stale camera handle");
            return;
        };
        camera.perspective = perspective;
        camera.invalidate_projection();
        self.backend.mark_image_dirty();
        self.emit(key.into(), ComponentEvent::Changed(Property::Perspective));
        self.camera_updated(key);
    }

    fn camera_updated(&mut self, key: CameraKey) {
        self.emit(key.into(), ComponentEvent::Updated);
        self.notify(key.into(), Signals::UPDATED);
    }

    pub(crate) fn camera_on_signal(&mut self, key: CameraKey, subject: ComponentHandle, signal: Signals) {
        let Some(camera) = self.cameras.get_mut(key) else {
            return;
        };
        if signal.contains(Signals::DESTROYED) {
            if camera.view.map(ComponentHandle::from) == Some(subject) {
                camera.view = None;
                self.emit(key.into(), ComponentEvent::Changed(Property::View));
            }
            self.camera_updated(key);
        } else if signal.contains(Signals::UPDATED) {
            self.camera_updated(key);
        }
    }

    /// View, view-normal and projection matrices, building the view if dirty.
    pub fn camera_matrices(&mut self, key: CameraKey) -> Option<(Mat4, Mat4, Mat4)> {
        let view = self.cameras.get(key)?.view;
        let (view_matrix, view_normal) = match view {
            Some(v) => (
                self.lookat_matrix(v).unwrap_or(Mat4::IDENTITY),
                self.lookat_normal_matrix(v).unwrap_or(Mat4::IDENTITY),
            ),
            None => (Mat4::IDENTITY, Mat4::IDENTITY),
        };
        let aspect = self.config.canvas.aspect();
        let projection = self.cameras.get(key)?.projection(aspect);
        Some((view_matrix, view_normal, projection))
    }

    /// Drops cached projections that follow the canvas aspect.
    pub(crate) fn canvas_resized(&mut self) {
        let following: Vec<CameraKey> = self
            .cameras
            .iter()
            .filter(|(_, c)| c.perspective.aspect.is_none())
            .map(|(k, _)| k)
            .collect();
        for key in following {
            self.cameras[key].invalidate_projection();
            self.camera_updated(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_follows_canvas_aspect() {
        let perspective = Perspective::default();
        let wide = perspective.matrix(2.0);
        let square = perspective.matrix(1.0);
        assert!((wide.x_axis.x * 2.0 - square.x_axis.x).abs() < 1e-5);
    }

    #[test]
    fn explicit_aspect_wins() {
        let perspective = Perspective {
            aspect: Some(1.0),
            ..Perspective::default()
        };
        assert_eq!(perspective.matrix(2.0), perspective.matrix(1.0));
    }
}
