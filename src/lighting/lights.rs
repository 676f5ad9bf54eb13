use serde::{Deserialize, Serialize};

use crate::scene::aggregate::Aggregate;
use crate::scene::events::{ComponentEvent, Property};
use crate::scene::observer::Signals;
use crate::scene::{ComponentHandle, ComponentType, LightKey, LightsKey, Scene};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsDesc {
    pub id: Option<String>,
    /// Ids of ambient, directional or point light components, in order.
    pub lights: Vec<String>,
}

/// Ordered set of lights applied together.
///
/// Hash: each member's type and space fragment (`"dirw"`, `"ambientv"`, ...)
/// concatenated, then `;`.
pub type Lights = Aggregate<LightKey>;

const OBSERVED: Signals = Signals::DIRTY.union(Signals::DESTROYED);

impl Scene {
    pub fn create_lights(&mut self, desc: LightsDesc) -> crate::Result<LightsKey> {
        self.ensure_alive()?;
        let id = self.registry.reserve(desc.id.as_deref())?;
        let key = self.light_sets.insert(Lights::default());
        self.register(id, ComponentType::Lights, key.into());
        let ids: Vec<&str> = desc.lights.iter().map(String::as_str).collect();
        let members = self.resolve_light_ids(&ids);
        self.bind_lights(key, members);
        Ok(key)
    }

    #[must_use]
    pub fn lights_set(&self, key: LightsKey) -> Option<&Lights> {
        self.light_sets.get(key)
    }

    fn resolve_light_ids(&self, ids: &[&str]) -> Vec<LightKey> {
        self.resolve_members(ids, "light", |handle| match handle {
            ComponentHandle::Light(k) => Some(k),
            _ => None,
        })
    }

    /// Replaces the member list by component id. Unknown ids and non-light
    /// components are logged and skipped.
    pub fn set_lights_members(&mut self, key: LightsKey, ids: &[&str]) {
        if !self.light_sets.contains_key(key) {
            log::warn!("set_lights_members: stale lights handle");
            return;
        }
        let members = self.resolve_light_ids(ids);
        self.set_lights_keys(key, members);
    }

    pub fn set_lights_keys(&mut self, key: LightsKey, members: Vec<LightKey>) {
        if !self.light_sets.contains_key(key) {
            log::warn!("set_lights_keys: stale lights handle");
            return;
        }
        self.bind_lights(key, members);
        self.emit(key.into(), ComponentEvent::Dirty);
        self.emit(key.into(), ComponentEvent::Changed(Property::Lights));
        self.notify(key.into(), Signals::DIRTY);
    }

    fn bind_lights(&mut self, key: LightsKey, members: Vec<LightKey>) {
        let Some(set) = self.light_sets.get_mut(key) else {
            return;
        };
        let old = std::mem::replace(&mut set.members, members.clone());
        set.dirty = true;
        for light in old {
            self.observers.unsubscribe(light.into(), key.into(), OBSERVED);
        }
        for light in members {
            self.observers.subscribe(light.into(), key.into(), OBSERVED);
        }
    }

    pub(crate) fn lights_on_signal(&mut self, key: LightsKey, subject: ComponentHandle, signal: Signals) {
        let Some(set) = self.light_sets.get_mut(key) else {
            return;
        };
        if signal.contains(Signals::DESTROYED) {
            if let ComponentHandle::Light(light) = subject {
                set.remove(light);
            }
        } else if signal.contains(Signals::DIRTY) {
            set.dirty = true;
        } else {
            return;
        }
        self.emit(key.into(), ComponentEvent::Dirty);
        self.notify(key.into(), Signals::DIRTY);
    }

    pub(crate) fn compile_lights(&mut self, key: LightsKey) {
        let Some(set) = self.light_sets.get_mut(key) else {
            return;
        };
        let lights = &self.lights;
        set.rebuild(|light| lights.get(light).map(|l| l.hash_fragment()).unwrap_or_default());
    }

    pub fn lights_hash(&mut self, key: LightsKey) -> Option<&str> {
        self.compile_lights(key);
        self.light_sets.get(key).map(|set| set.hash.as_str())
    }
}
