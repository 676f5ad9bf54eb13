//! Scene Graph
//!
//! Every component lives in a typed [`SlotMap`](slotmap::SlotMap) owned by the
//! [`Scene`]. Components reference each other only through the non-owning
//! keys declared here, so a shared child (a parent transform, a clip plane, a
//! light) can be bound by any number of owners.
//!
//! Each `impl Scene` block for a component kind lives next to that component's
//! data type, e.g. the transform setters are in [`transform`].

pub mod aggregate;
pub mod camera;
pub mod defaults;
pub mod events;
pub mod frame;
pub mod group;
pub mod lookat;
pub mod object;
pub mod observer;
pub mod registry;
pub mod scene;
pub mod scheduler;
pub mod transform;

pub use aggregate::Aggregate;
pub use camera::{Camera, CameraDesc, Perspective};
pub use events::{ComponentEvent, EventBus, Property, SceneEvent, SubscriptionId};
pub use frame::{Clock, TickEvent};
pub use group::{Group, GroupDesc, GroupMember};
pub use lookat::{Lookat, LookatDesc};
pub use object::{Object, ObjectDesc};
pub use observer::{ObserverGraph, Signals};
pub use registry::{Registry, RegistryEntry};
pub use scene::{PickHit, Scene, SceneStats};
pub use scheduler::{Listener, ListenerKey, Scheduler, Task, TickPhase};
pub use transform::{Transform, TransformDesc, TransformKind, TranslateDesc};

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    pub struct TransformKey;
    pub struct GeometryKey;
    pub struct LookatKey;
    pub struct CameraKey;
    pub struct ClipKey;
    pub struct ClipsKey;
    pub struct LightKey;
    pub struct LightsKey;
    pub struct ObjectKey;
    pub struct FlightKey;
    pub struct GroupKey;
}

/// Type tag stored in the registry for each component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentType {
    Transform,
    Translate,
    Geometry,
    Lookat,
    Camera,
    Clip,
    Clips,
    AmbientLight,
    DirLight,
    PointLight,
    Lights,
    Object,
    CameraFlight,
    Group,
}

impl ComponentType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Transform => "Transform",
            Self::Translate => "Translate",
            Self::Geometry => "Geometry",
            Self::Lookat => "Lookat",
            Self::Camera => "Camera",
            Self::Clip => "Clip",
            Self::Clips => "Clips",
            Self::AmbientLight => "AmbientLight",
            Self::DirLight => "DirLight",
            Self::PointLight => "PointLight",
            Self::Lights => "Lights",
            Self::Object => "Object",
            Self::CameraFlight => "CameraFlight",
            Self::Group => "Group",
        }
    }

    /// `true` for the light flavours accepted by a [`Lights`](crate::lighting::Lights) aggregate.
    #[must_use]
    pub fn is_light(self) -> bool {
        matches!(self, Self::AmbientLight | Self::DirLight | Self::PointLight)
    }
}

/// A typed, non-owning reference to any component in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentHandle {
    Transform(TransformKey),
    Geometry(GeometryKey),
    Lookat(LookatKey),
    Camera(CameraKey),
    Clip(ClipKey),
    Clips(ClipsKey),
    Light(LightKey),
    Lights(LightsKey),
    Object(ObjectKey),
    Flight(FlightKey),
    Group(GroupKey),
}

macro_rules! impl_handle_from {
    ($($key:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$key> for ComponentHandle {
                #[inline]
                fn from(key: $key) -> Self {
                    ComponentHandle::$variant(key)
                }
            }
        )*
    };
}

impl_handle_from! {
    TransformKey => Transform,
    GeometryKey => Geometry,
    LookatKey => Lookat,
    CameraKey => Camera,
    ClipKey => Clip,
    ClipsKey => Clips,
    LightKey => Light,
    LightsKey => Lights,
    ObjectKey => Object,
    FlightKey => Flight,
    GroupKey => Group,
}

impl ComponentHandle {
    /// Name of the storage this handle points into, used in log messages.
    #[must_use]
    pub fn kind_name(self) -> &'static str {
        match self {
            Self::Transform(_) => "transform",
            Self::Geometry(_) => "geometry",
            Self::Lookat(_) => "lookat",
            Self::Camera(_) => "camera",
            Self::Clip(_) => "clip",
            Self::Clips(_) => "clips",
            Self::Light(_) => "light",
            Self::Lights(_) => "lights",
            Self::Object(_) => "object",
            Self::Flight(_) => "camera flight",
            Self::Group(_) => "group",
        }
    }
}
