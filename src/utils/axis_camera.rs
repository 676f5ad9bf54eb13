use glam::Vec3;

use crate::animation::{CameraFlightDesc, FlightTarget};
use crate::scene::{CameraKey, FlightKey, Scene};

/// One of the six axis-aligned views, selected by the number keys 1 to 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisView {
    Right,
    Back,
    Left,
    Front,
    Top,
    Bottom,
}

impl AxisView {
    /// Maps the key codes of '1' to '6' to their views.
    #[must_use]
    pub fn from_key_code(code: u32) -> Option<Self> {
        match code {
            49 => Some(Self::Right),
            50 => Some(Self::Back),
            51 => Some(Self::Left),
            52 => Some(Self::Front),
            53 => Some(Self::Top),
            54 => Some(Self::Bottom),
            _ => None,
        }
    }

    /// Unit offset from the center to the eye, and the up vector.
    #[must_use]
    pub fn eye_dir_and_up(self) -> (Vec3, Vec3) {
        match self {
            Self::Right => (Vec3::NEG_X, Vec3::Y),
            Self::Back => (Vec3::Z, Vec3::Y),
            Self::Left => (Vec3::X, Vec3::Y),
            Self::Front => (Vec3::NEG_Z, Vec3::Y),
            Self::Top => (Vec3::NEG_Y, Vec3::NEG_Z),
            Self::Bottom => (Vec3::Y, Vec3::Z),
        }
    }
}

/// Snaps a camera to axis-aligned views of the whole scene.
///
/// Owns a one-second [`CameraFlight`](crate::animation::CameraFlight); each
/// handled key flies the camera so the scene's world boundary fills the view.
#[derive(Debug)]
pub struct KeyboardAxisCamera {
    flight: FlightKey,
    active: bool,
}

impl KeyboardAxisCamera {
    /// `camera: None` binds the scene's default camera when auto defaults are on.
    pub fn new(scene: &mut Scene, camera: Option<CameraKey>) -> crate::Result<Self> {
        let flight = scene.create_camera_flight(CameraFlightDesc {
            camera,
            duration: Some(1.0),
            ..CameraFlightDesc::default()
        })?;
        Ok(Self { flight, active: true })
    }

    #[inline]
    #[must_use]
    pub fn flight(&self) -> FlightKey {
        self.flight
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Inactive controls ignore keys and stop their flight.
    pub fn set_active(&mut self, scene: &mut Scene, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        if !active {
            scene.stop_flight(self.flight);
        }
    }

    pub fn set_camera(&self, scene: &mut Scene, camera: Option<CameraKey>) {
        scene.set_flight_camera(self.flight, camera);
    }

    /// Handles a key press. Returns whether a flight was started.
    pub fn handle_key(&self, scene: &mut Scene, code: u32) -> bool {
        if !self.active {
            return false;
        }
        let Some(view) = AxisView::from_key_code(code) else {
            return false;
        };
        let Some(flight) = scene.flight(self.flight) else {
            log::warn!("KeyboardAxisCamera: flight was destroyed");
            return false;
        };
        if flight.camera().is_none() {
            return false;
        }

        let aabb = scene.world_aabb();
        if aabb.is_degenerate() {
            log::debug!("KeyboardAxisCamera: empty scene, nothing to frame");
            return false;
        }
        let stop_fov = scene.config().flight.stop_fov;
        let center = aabb.center();
        let dist = (aabb.diagonal() / (stop_fov / 2.0).tan()).abs();
        let (dir, up) = view.eye_dir_and_up();
        log::debug!("KeyboardAxisCamera: flying to {view:?} view");

        scene.fly_to(
            self.flight,
            FlightTarget::Pose {
                eye: Some(center + dir * dist),
                look: Some(center),
                up: Some(up),
            },
            None,
        )
    }

    /// Destroys the owned flight.
    pub fn destroy(self, scene: &mut Scene) {
        scene.destroy_component(self.flight.into());
    }
}
