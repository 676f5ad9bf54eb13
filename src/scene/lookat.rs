use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::math::{look_at, normal_matrix, rotation_degrees};
use crate::scene::events::{ComponentEvent, Property};
use crate::scene::observer::Signals;
use crate::scene::scheduler::{Task, TickPhase};
use crate::scene::{ComponentType, LookatKey, Scene};

/// Viewing transform defined by an eye position, a point of interest and an up vector.
#[derive(Debug, Clone)]
pub struct Lookat {
    pub(crate) eye: Vec3,
    pub(crate) look: Vec3,
    pub(crate) up: Vec3,
    matrix: Mat4,
    normal_matrix: Mat4,
    /// Also guards the scheduled build: set means one is queued.
    dirty: bool,
    builds: u64,
}

impl Lookat {
    #[inline]
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    #[inline]
    #[must_use]
    pub fn look(&self) -> Vec3 {
        self.look
    }

    #[inline]
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// View matrix as of the last build.
    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of matrix builds so far.
    #[inline]
    #[must_use]
    pub fn builds(&self) -> u64 {
        self.builds
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "eye": self.eye.to_array(),
            "look": self.look.to_array(),
            "up": self.up.to_array(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookatDesc {
    pub id: Option<String>,
    pub eye: Vec3,
    pub look: Vec3,
    pub up: Vec3,
}

impl Default for LookatDesc {
    fn default() -> Self {
        Self {
            id: None,
            eye: Vec3::new(0.0, 0.0, -10.0),
            look: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

impl Scene {
    pub fn create_lookat(&mut self, desc: LookatDesc) -> crate::Result<LookatKey> {
        self.ensure_alive()?;
        let id = self.registry.reserve(desc.id.as_deref())?;
        let key = self.lookats.insert(Lookat {
            eye: desc.eye,
            look: desc.look,
            up: desc.up,
            matrix: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            dirty: true,
            builds: 0,
        });
        self.register(id, ComponentType::Lookat, key.into());
        self.scheduler.schedule(TickPhase::Tick2, Task::BuildLookat(key));
        Ok(key)
    }

    #[must_use]
    pub fn lookat(&self, key: LookatKey) -> Option<&Lookat> {
        self.lookats.get(key)
    }

    fn lookat_dirty(&mut self, key: LookatKey) {
        let Some(lookat) = self.lookats.get_mut(key) else {
            return;
        };
        if !lookat.dirty {
            lookat.dirty = true;
            self.scheduler.schedule(TickPhase::Tick2, Task::BuildLookat(key));
        }
    }

    fn edit_lookat(&mut self, key: LookatKey, property: Property, edit: impl FnOnce(&mut Lookat)) {
        let Some(lookat) = self.lookats.get_mut(key) else {
            log::warn!("lookat {}: stale lookat handle", property.name());
            return;
        };
        edit(lookat);
        self.lookat_dirty(key);
        self.emit(key.into(), ComponentEvent::Changed(property));
    }

    pub fn set_lookat_eye(&mut self, key: LookatKey, eye: Vec3) {
        self.edit_lookat(key, Property::Eye, |l| l.eye = eye);
    }

    pub fn set_lookat_look(&mut self, key: LookatKey, look: Vec3) {
        self.edit_lookat(key, Property::Look, |l| l.look = look);
    }

    pub fn set_lookat_up(&mut self, key: LookatKey, up: Vec3) {
        self.edit_lookat(key, Property::Up, |l| l.up = up);
    }

    /// Sets eye, look and up together, emitting one change per property.
    pub fn set_lookat_pose(&mut self, key: LookatKey, eye: Vec3, look: Vec3, up: Vec3) {
        self.set_lookat_eye(key, eye);
        self.set_lookat_look(key, look);
        self.set_lookat_up(key, up);
    }

    /// Rebuilds the view matrix if dirty. Runs from the `Tick2` task or on demand.
    pub(crate) fn build_lookat(&mut self, key: LookatKey) {
        let Some(lookat) = self.lookats.get_mut(key) else {
            return;
        };
        if !lookat.dirty {
            return;
        }
        lookat.matrix = look_at(lookat.eye, lookat.look, lookat.up);
        lookat.normal_matrix = normal_matrix(&lookat.matrix);
        lookat.dirty = false;
        lookat.builds += 1;

        self.backend.mark_image_dirty();
        self.emit(key.into(), ComponentEvent::Changed(Property::Matrix));
        self.notify(key.into(), Signals::UPDATED);
    }

    /// View matrix, built immediately if dirty.
    pub fn lookat_matrix(&mut self, key: LookatKey) -> Option<Mat4> {
        self.build_lookat(key);
        self.lookats.get(key).map(|l| l.matrix)
    }

    pub fn lookat_normal_matrix(&mut self, key: LookatKey) -> Option<Mat4> {
        self.build_lookat(key);
        self.lookats.get(key).map(|l| l.normal_matrix)
    }

    // ========================================================================
    // Navigation helpers (degrees)
    // ========================================================================

    /// Orbits the eye about the look point, around the up vector.
    pub fn rotate_eye_y(&mut self, key: LookatKey, angle: f32) {
        let Some(&Lookat { eye, look, up, .. }) = self.lookats.get(key) else {
            return;
        };
        let rotated = rotation_degrees(angle, up).transform_point3(eye - look);
        self.set_lookat_eye(key, rotated + look);
    }

    /// Orbits the eye about the look point, around the horizontal axis.
    pub fn rotate_eye_x(&mut self, key: LookatKey, angle: f32) {
        let Some(&Lookat { eye, look, up, .. }) = self.lookats.get(key) else {
            return;
        };
        let eye2 = eye - look;
        let left = eye2.normalize_or_zero().cross(up.normalize_or_zero());
        let mat = rotation_degrees(angle, left);
        self.set_lookat_eye(key, mat.transform_point3(eye2) + look);
        self.set_lookat_up(key, mat.transform_point3(up));
    }

    /// Turns the look point about the eye, around the up vector.
    pub fn rotate_look_y(&mut self, key: LookatKey, angle: f32) {
        let Some(&Lookat { eye, look, up, .. }) = self.lookats.get(key) else {
            return;
        };
        let rotated = rotation_degrees(angle, up).transform_point3(look - eye);
        self.set_lookat_look(key, rotated + eye);
    }

    pub fn rotate_look_x(&mut self, key: LookatKey, angle: f32) {
        let Some(&Lookat { eye, look, up, .. }) = self.lookats.get(key) else {
            return;
        };
        let look2 = look - eye;
        let left = look2.normalize_or_zero().cross(up.normalize_or_zero());
        let mat = rotation_degrees(angle, left);
        self.set_lookat_look(key, mat.transform_point3(look2) + eye);
        self.set_lookat_up(key, mat.transform_point3(up));
    }

    /// Moves eye and look together: `x` along the left axis, `y` along up,
    /// `z` along the look→eye direction.
    pub fn pan(&mut self, key: LookatKey, pan: Vec3) {
        let Some(&Lookat { eye, look, up, .. }) = self.lookats.get(key) else {
            return;
        };
        let eye2 = (eye - look).normalize_or_zero();
        let up = up.normalize_or_zero();
        let mut offset = Vec3::ZERO;
        if pan.x != 0.0 {
            offset += eye2.cross(up) * pan.x;
        }
        if pan.y != 0.0 {
            offset += up * pan.y;
        }
        if pan.z != 0.0 {
            offset += eye2 * pan.z;
        }
        self.set_lookat_eye(key, eye + offset);
        self.set_lookat_look(key, look + offset);
    }

    /// Changes the eye→look distance by `delta`, keeping the direction.
    pub fn zoom(&mut self, key: LookatKey, delta: f32) {
        let Some(&Lookat { eye, look, .. }) = self.lookats.get(key) else {
            return;
        };
        let vec = eye - look;
        let len = (vec.length() + delta).abs();
        self.set_lookat_eye(key, look + vec.normalize_or_zero() * len);
    }
}
