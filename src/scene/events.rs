//! User-facing event subscriptions.
//!
//! Callbacks are plain closures keyed by the component they observe. They do
//! not receive the [`Scene`](crate::Scene): logic that needs to mutate the
//! scene in response belongs in a tick listener instead.

use rustc_hash::FxHashMap;

use crate::scene::{ComponentHandle, ComponentType};

/// Property named by a [`ComponentEvent::Changed`] notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Matrix,
    Parent,
    Xyz,
    Positions,
    Colors,
    Normals,
    Uv,
    Indices,
    Primitive,
    Usage,
    AutoNormals,
    Eye,
    Look,
    Up,
    Perspective,
    View,
    Mode,
    Dir,
    Dist,
    Pos,
    Color,
    Intensity,
    Attenuation,
    Space,
    Clips,
    Lights,
    Transform,
    Geometry,
    Camera,
    Visible,
    Duration,
    Easing,
}

impl Property {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Matrix => "matrix",
            Self::Parent => "parent",
            Self::Xyz => "xyz",
            Self::Positions => "positions",
            Self::Colors => "colors",
            Self::Normals => "normals",
            Self::Uv => "uv",
            Self::Indices => "indices",
            Self::Primitive => "primitive",
            Self::Usage => "usage",
            Self::AutoNormals => "autoNormals",
            Self::Eye => "eye",
            Self::Look => "look",
            Self::Up => "up",
            Self::Perspective => "perspective",
            Self::View => "view",
            Self::Mode => "mode",
            Self::Dir => "dir",
            Self::Dist => "dist",
            Self::Pos => "pos",
            Self::Color => "color",
            Self::Intensity => "intensity",
            Self::Attenuation => "attenuation",
            Self::Space => "space",
            Self::Clips => "clips",
            Self::Lights => "lights",
            Self::Transform => "transform",
            Self::Geometry => "geometry",
            Self::Camera => "camera",
            Self::Visible => "visible",
            Self::Duration => "duration",
            Self::Easing => "easing",
        }
    }
}

/// Notification emitted by a single component.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentEvent {
    /// A property setter stored a new value.
    Changed(Property),
    /// Shader-relevant state changed.
    Dirty,
    /// A derived value was invalidated or rebuilt.
    Updated,
    Destroyed,
    /// A camera flight started.
    Started,
    /// A camera flight arrived or was stopped.
    Stopped,
    /// A member joined a group.
    Added(ComponentHandle),
    /// A member left a group.
    Removed(ComponentHandle),
    /// A geometry's boundary was invalidated.
    Boundary,
}

/// Scene-level lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    ComponentCreated {
        handle: ComponentHandle,
        id: String,
        ty: ComponentType,
    },
    ComponentDestroyed {
        handle: ComponentHandle,
        id: String,
        ty: ComponentType,
    },
}

/// Unique identifier returned for every subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type ComponentCallback = Box<dyn FnMut(ComponentHandle, &ComponentEvent)>;
pub type SceneCallback = Box<dyn FnMut(&SceneEvent)>;

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    component: FxHashMap<ComponentHandle, Vec<(SubscriptionId, ComponentCallback)>>,
    scene: Vec<(SubscriptionId, SceneCallback)>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("component_subscriptions", &self.component.values().map(Vec::len).sum::<usize>())
            .field("scene_subscriptions", &self.scene.len())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn on_component(&mut self, handle: ComponentHandle, callback: ComponentCallback) -> SubscriptionId {
        let id = self.next_id();
        self.component.entry(handle).or_default().push((id, callback));
        id
    }

    pub fn on_scene(&mut self, callback: SceneCallback) -> SubscriptionId {
        let id = self.next_id();
        self.scene.push((id, callback));
        id
    }

    /// Removes a subscription. Returns `false` if it was not found.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        if let Some(pos) = self.scene.iter().position(|(s, _)| *s == id) {
            self.scene.remove(pos);
            return true;
        }
        for list in self.component.values_mut() {
            if let Some(pos) = list.iter().position(|(s, _)| *s == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn emit(&mut self, handle: ComponentHandle, event: &ComponentEvent) {
        if let Some(list) = self.component.get_mut(&handle) {
            for (_, callback) in list.iter_mut() {
                callback(handle, event);
            }
        }
    }

    pub fn emit_scene(&mut self, event: &SceneEvent) {
        for (_, callback) in &mut self.scene {
            callback(event);
        }
    }

    /// Drops every subscription attached to `handle`.
    pub fn forget(&mut self, handle: ComponentHandle) {
        self.component.remove(&handle);
    }

    pub fn clear(&mut self) {
        self.component.clear();
        self.scene.clear();
    }
}
