//! Animation
//!
//! Time-driven camera motion and curve evaluation.

pub mod camera_flight;
pub mod curve;

pub use camera_flight::{CameraFlight, CameraFlightDesc, FlightCallback, FlightTarget, FlyTo, Pose};
pub use curve::CubicBezierCurve;
