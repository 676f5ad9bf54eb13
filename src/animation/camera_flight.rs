//! Camera flights.
//!
//! A [`CameraFlight`] interpolates the [`Lookat`](crate::scene::Lookat) of its
//! camera from the current pose to a target pose over a fixed duration. The
//! interpolation is driven by a [`Listener::Flight`] on [`TickPhase::Tick`],
//! which exists only while the flight is in the air.
//!
//! ```text
//!          fly_to                 t >= 1 / stop / rebind
//!   Idle ──────────▶ Flying ─────────────────────────────▶ Idle
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::Aabb;
use crate::scene::events::{ComponentEvent, Property};
use crate::scene::observer::Signals;
use crate::scene::scheduler::{Listener, ListenerKey, TickPhase};
use crate::scene::{
    CameraKey, ComponentHandle, ComponentType, FlightKey, ObjectKey, Scene, TickEvent,
};

/// Invoked once when a flight arrives or is stopped.
pub type FlightCallback = Box<dyn FnOnce()>;

/// Eye, look and up of a viewing transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub eye: Vec3,
    pub look: Vec3,
    pub up: Vec3,
}

impl Pose {
    #[must_use]
    pub fn lerp(&self, other: &Pose, t: f32) -> Pose {
        Pose {
            eye: self.eye.lerp(other.eye, t),
            look: self.look.lerp(other.look, t),
            up: self.up.lerp(other.up, t),
        }
    }
}

/// Where a flight should end up.
#[derive(Debug, Clone, PartialEq)]
pub enum FlightTarget {
    /// Frame an explicit world-space box.
    Aabb(Aabb),
    /// Frame an object's world boundary.
    WorldBoundary(ObjectKey),
    /// Fly to an explicit pose. Missing parts keep the current value.
    Pose {
        eye: Option<Vec3>,
        look: Option<Vec3>,
        up: Option<Vec3>,
    },
    /// Frame the world boundary of the object registered under this id.
    Component(String),
}

/// Arguments of [`Scene::fly_to`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlyTo {
    pub target: FlightTarget,
    /// Added to the framed boundary's center. Ignored for pose targets.
    pub offset: Vec3,
}

impl From<FlightTarget> for FlyTo {
    fn from(target: FlightTarget) -> Self {
        Self {
            target,
            offset: Vec3::ZERO,
        }
    }
}

impl From<Aabb> for FlyTo {
    fn from(aabb: Aabb) -> Self {
        FlightTarget::Aabb(aabb).into()
    }
}

impl From<ObjectKey> for FlyTo {
    fn from(key: ObjectKey) -> Self {
        FlightTarget::WorldBoundary(key).into()
    }
}

/// 相机飞行
pub struct CameraFlight {
    camera: Option<CameraKey>,
    duration: f64,
    easing: bool,
    stop_fov: f32,
    from: Pose,
    to: Pose,
    t1: Option<f64>,
    t2: Option<f64>,
    listener: Option<ListenerKey>,
    callback: Option<FlightCallback>,
}

impl std::fmt::Debug for CameraFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFlight")
            .field("camera", &self.camera)
            .field("duration", &self.duration)
            .field("easing", &self.easing)
            .field("flying", &self.is_flying())
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl CameraFlight {
    #[inline]
    #[must_use]
    pub fn camera(&self) -> Option<CameraKey> {
        self.camera
    }

    /// Seconds from departure to arrival.
    #[inline]
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    #[inline]
    #[must_use]
    pub fn easing(&self) -> bool {
        self.easing
    }

    #[inline]
    #[must_use]
    pub fn is_flying(&self) -> bool {
        self.listener.is_some()
    }

    /// Pose the current (or last) flight is heading for.
    #[inline]
    #[must_use]
    pub fn destination(&self) -> Pose {
        self.to
    }

    pub(crate) fn to_json(&self, camera_id: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "camera": camera_id,
            "duration": self.duration,
            "easing": self.easing,
        })
    }

    /// Interpolation factor at `time`, eased if enabled, plus whether the flight is done.
    ///
    /// Unstamped flights count as done.
    fn progress(&self, time: f64) -> (f32, bool) {
        let (Some(t1), Some(t2)) = (self.t1, self.t2) else {
            return (1.0, true);
        };
        let span = t2 - t1;
        let t = if span <= 0.0 { 1.0 } else { (time - t1) / span };
        let stopping = t >= 1.0;
        let t = t.clamp(0.0, 1.0) as f32;
        let t = if self.easing { t * (2.0 - t) } else { t };
        (t, stopping)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraFlightDesc {
    pub id: Option<String>,
    /// Falls back to the scene's default camera when auto defaults are on.
    pub camera: Option<CameraKey>,
    /// Falls back to the configured duration.
    pub duration: Option<f64>,
    /// Falls back to the configured easing.
    pub easing: Option<bool>,
}

const CAMERA_SIGNALS: Signals = Signals::DESTROYED;

impl Scene {
    pub fn create_camera_flight(&mut self, desc: CameraFlightDesc) -> crate::Result<FlightKey> {
        self.ensure_alive()?;
        let camera = match desc.camera {
            Some(camera) if self.cameras.contains_key(camera) => Some(camera),
            Some(_) => {
                log::error!("create_camera_flight: stale camera handle, using default camera");
                self.fallback_camera()?
            }
            None => self.fallback_camera()?,
        };
        let config = self.config.flight;
        let duration = desc.duration.unwrap_or(config.duration);
        if duration < 0.0 {
            log::warn!("create_camera_flight: negative duration {duration}, using 0");
        }
        let id = self.registry.reserve(desc.id.as_deref())?;
        let key = self.flights.insert(CameraFlight {
            camera,
            duration: duration.max(0.0),
            easing: desc.easing.unwrap_or(config.easing),
            stop_fov: config.stop_fov,
            from: Pose::default(),
            to: Pose::default(),
            t1: None,
            t2: None,
            listener: None,
            callback: None,
        });
        self.register(id, ComponentType::CameraFlight, key.into());
        if let Some(camera) = camera {
            self.observers.subscribe(camera.into(), key.into(), CAMERA_SIGNALS);
        }
        Ok(key)
    }

    fn fallback_camera(&mut self) -> crate::Result<Option<CameraKey>> {
        if self.config.auto_defaults {
            self.default_camera().map(Some)
        } else {
            Ok(None)
        }
    }

    #[must_use]
    pub fn flight(&self, key: FlightKey) -> Option<&CameraFlight> {
        self.flights.get(key)
    }

    /// Starts flying the bound camera towards `target`.
    ///
    /// A flight already in the air is stopped first, which fires its callback.
    /// With no camera, or a target that cannot be resolved, `callback` runs
    /// immediately. A degenerate boundary drops `callback` without running it.
    /// Returns whether a flight was started.
    pub fn fly_to(
        &mut self,
        key: FlightKey,
        target: impl Into<FlyTo>,
        callback: Option<FlightCallback>,
    ) -> bool {
        let FlyTo { target, offset } = target.into();
        let Some(flight) = self.flights.get(key) else {
            log::warn!("fly_to: stale camera flight handle");
            return false;
        };
        if flight.is_flying() {
            self.stop_flight(key);
        }

        let finish_now = |callback: Option<FlightCallback>| {
            if let Some(callback) = callback {
                callback();
            }
            false
        };

        let view = self.flights[key]
            .camera
            .and_then(|c| self.cameras.get(c))
            .and_then(|c| c.view());
        let Some(from) = view.and_then(|v| self.lookats.get(v)).map(|l| Pose {
            eye: l.eye(),
            look: l.look(),
            up: l.up(),
        }) else {
            log::debug!("fly_to: no camera view to fly");
            return finish_now(callback);
        };

        let aabb = match target {
            FlightTarget::Aabb(aabb) => aabb,
            FlightTarget::WorldBoundary(object) => match self.object_world_aabb(object) {
                Some(aabb) => aabb,
                None => {
                    log::error!("fly_to: stale object handle");
                    return finish_now(callback);
                }
            },
            FlightTarget::Component(ref id) => match self.registry.get(id) {
                Some(ComponentHandle::Object(object)) => match self.object_world_aabb(object) {
                    Some(aabb) => aabb,
                    None => return finish_now(callback),
                },
                Some(handle) => {
                    log::error!(
                        "Can't fly to component '{id}': a {} has no world boundary",
                        self.registry.type_of(handle).map_or("unknown", ComponentType::name)
                    );
                    return finish_now(callback);
                }
                None => {
                    log::error!("{}", crate::StrataError::ComponentNotFound(id.clone()));
                    return finish_now(callback);
                }
            },
            FlightTarget::Pose { eye, look, up } => {
                let to = Pose {
                    eye: eye.unwrap_or(from.eye),
                    look: look.unwrap_or(from.look),
                    up: up.unwrap_or(from.up),
                };
                self.depart(key, from, to, callback);
                return true;
            }
        };

        if aabb.is_degenerate() {
            log::debug!("fly_to: empty boundary, not flying");
            return false;
        }
        let stop_fov = self.flights[key].stop_fov;
        let look = aabb.center() + offset;
        let dist = (aabb.diagonal() / (stop_fov / 2.0).tan()).abs();
        let to = Pose {
            eye: look + (from.eye - from.look).normalize_or_zero() * dist,
            look,
            up: from.up,
        };
        self.depart(key, from, to, callback);
        true
    }

    /// Departure time is stamped by the first `Tick` the flight sees.
    fn depart(&mut self, key: FlightKey, from: Pose, to: Pose, callback: Option<FlightCallback>) {
        let listener = self.scheduler.subscribe(TickPhase::Tick, Listener::Flight(key));
        let flight = &mut self.flights[key];
        flight.from = from;
        flight.to = to;
        flight.callback = callback;
        flight.t1 = None;
        flight.t2 = None;
        flight.listener = Some(listener);
        self.emit(key.into(), ComponentEvent::Started);
    }

    /// Advances a flight to the tick's time. Runs as the flight's `Tick` listener.
    pub(crate) fn update_flight(&mut self, key: FlightKey, event: &TickEvent) {
        let Some(flight) = self.flights.get_mut(key) else {
            return;
        };
        if !flight.is_flying() {
            return;
        }
        if flight.t1.is_none() {
            flight.t1 = Some(event.time);
            flight.t2 = Some(event.time + flight.duration);
        }
        let (t, stopping) = flight.progress(event.time);
        let pose = flight.from.lerp(&flight.to, t);
        let view = flight
            .camera
            .and_then(|c| self.cameras.get(c))
            .and_then(|c| c.view());
        match view {
            Some(view) => self.set_lookat_pose(view, pose.eye, pose.look, pose.up),
            None => {
                log::debug!("camera flight lost its view mid-flight");
                self.stop_flight(key);
                return;
            }
        }
        if stopping {
            self.stop_flight(key);
        }
    }

    /// Ends a flight where it is. Fires the pending callback. No-op when idle.
    pub fn stop_flight(&mut self, key: FlightKey) {
        let Some(flight) = self.flights.get_mut(key) else {
            return;
        };
        let Some(listener) = flight.listener.take() else {
            return;
        };
        flight.t1 = None;
        flight.t2 = None;
        let callback = flight.callback.take();
        self.scheduler.unsubscribe(listener);
        if let Some(callback) = callback {
            callback();
        }
        self.emit(key.into(), ComponentEvent::Stopped);
    }

    /// Rebinds the camera. Stops any flight in progress.
    pub fn set_flight_camera(&mut self, key: FlightKey, camera: Option<CameraKey>) {
        let Some(flight) = self.flights.get(key) else {
            log::warn!("set_flight_camera: stale camera flight handle");
            return;
        };
        if let Some(c) = camera
            && !self.cameras.contains_key(c)
        {
            log::error!("set_flight_camera: stale camera handle");
            return;
        }
        if let Some(old) = flight.camera {
            self.observers.unsubscribe(old.into(), key.into(), CAMERA_SIGNALS);
        }
        if let Some(new) = camera {
            self.observers.subscribe(new.into(), key.into(), CAMERA_SIGNALS);
        }
        self.flights[key].camera = camera;
        self.emit(key.into(), ComponentEvent::Changed(Property::Camera));
        self.stop_flight(key);
    }

    /// Sets the duration in seconds. Stops any flight in progress.
    pub fn set_flight_duration(&mut self, key: FlightKey, duration: f64) {
        let Some(flight) = self.flights.get_mut(key) else {
            log::warn!("set_flight_duration: stale camera flight handle");
            return;
        };
        if duration < 0.0 {
            log::warn!("set_flight_duration: negative duration {duration}, using 0");
        }
        flight.duration = duration.max(0.0);
        self.emit(key.into(), ComponentEvent::Changed(Property::Duration));
        self.stop_flight(key);
    }

    pub fn set_flight_easing(&mut self, key: FlightKey, easing: bool) {
        let Some(flight) = self.flights.get_mut(key) else {
            log::warn!("set_flight_easing: stale camera flight handle");
            return;
        };
        flight.easing = easing;
        self.emit(key.into(), ComponentEvent::Changed(Property::Easing));
    }

    pub(crate) fn flight_on_signal(&mut self, key: FlightKey, subject: ComponentHandle, signal: Signals) {
        let Some(flight) = self.flights.get_mut(key) else {
            return;
        };
        if signal.contains(Signals::DESTROYED) && flight.camera.map(ComponentHandle::from) == Some(subject) {
            flight.camera = None;
            self.emit(key.into(), ComponentEvent::Changed(Property::Camera));
            self.stop_flight(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_eases_out() {
        let flight = CameraFlight {
            camera: None,
            duration: 2.0,
            easing: true,
            stop_fov: 55.0,
            from: Pose::default(),
            to: Pose::default(),
            t1: Some(1.0),
            t2: Some(3.0),
            listener: None,
            callback: None,
        };
        let (t, stopping) = flight.progress(2.0);
        assert!((t - 0.75).abs() < 1e-6);
        assert!(!stopping);
        let (t, stopping) = flight.progress(5.0);
        assert_eq!(t, 1.0);
        assert!(stopping);
    }

    #[test]
    fn zero_duration_arrives_immediately() {
        let flight = CameraFlight {
            camera: None,
            duration: 0.0,
            easing: false,
            stop_fov: 55.0,
            from: Pose::default(),
            to: Pose::default(),
            t1: Some(4.0),
            t2: Some(4.0),
            listener: None,
            callback: None,
        };
        assert_eq!(flight.progress(4.0), (1.0, true));
    }
}
