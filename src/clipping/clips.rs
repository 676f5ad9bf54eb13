use crate::scene::aggregate::Aggregate;
use crate::scene::events::{ComponentEvent, Property};
use crate::scene::observer::Signals;
use crate::scene::{ClipKey, ClipsKey, ComponentHandle, ComponentType, Scene};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipsDesc {
    pub id: Option<String>,
    /// Ids of [`Clip`](super::Clip) components, in order.
    pub clips: Vec<String>,
}

/// Ordered set of clipping planes applied together.
///
/// Hash: each member's mode name concatenated, then `;`.
pub type Clips = Aggregate<ClipKey>;

const OBSERVED: Signals = Signals::DIRTY.union(Signals::DESTROYED);

impl Scene {
    pub fn create_clips(&mut self, desc: ClipsDesc) -> crate::Result<ClipsKey> {
        self.ensure_alive()?;
        let id = self.registry.reserve(desc.id.as_deref())?;
        let key = self.clip_sets.insert(Clips::default());
        self.register(id, ComponentType::Clips, key.into());
        let ids: Vec<&str> = desc.clips.iter().map(String::as_str).collect();
        let members = self.resolve_clip_ids(&ids);
        self.bind_clips(key, members);
        Ok(key)
    }

    #[must_use]
    pub fn clips_set(&self, key: ClipsKey) -> Option<&Clips> {
        self.clip_sets.get(key)
    }

    fn resolve_clip_ids(&self, ids: &[&str]) -> Vec<ClipKey> {
        self.resolve_members(ids, ComponentType::Clip.name(), |handle| match handle {
            ComponentHandle::Clip(k) => Some(k),
            _ => None,
        })
    }

    /// Replaces the member list by component id. Unknown ids and non-clip
    /// components are logged and skipped.
    pub fn set_clips_members(&mut self, key: ClipsKey, ids: &[&str]) {
        if !self.clip_sets.contains_key(key) {
            log::warn!("set_clips_members: stale clips handle");
            return;
        }
        let members = self.resolve_clip_ids(ids);
        self.set_clips_keys(key, members);
    }

    pub fn set_clips_keys(&mut self, key: ClipsKey, members: Vec<ClipKey>) {
        if !self.clip_sets.contains_key(key) {
            log::warn!("set_clips_keys: stale clips handle");
            return;
        }
        self.bind_clips(key, members);
        self.emit(key.into(), ComponentEvent::Dirty);
        self.emit(key.into(), ComponentEvent::Changed(Property::Clips));
        self.notify(key.into(), Signals::DIRTY);
    }

    fn bind_clips(&mut self, key: ClipsKey, members: Vec<ClipKey>) {
        let Some(set) = self.clip_sets.get_mut(key) else {
            return;
        };
        let old = std::mem::replace(&mut set.members, members.clone());
        set.dirty = true;
        for clip in old {
            self.observers.unsubscribe(clip.into(), key.into(), OBSERVED);
        }
        for clip in members {
            self.observers.subscribe(clip.into(), key.into(), OBSERVED);
        }
    }

    pub(crate) fn clips_on_signal(&mut self, key: ClipsKey, subject: ComponentHandle, signal: Signals) {
        let Some(set) = self.clip_sets.get_mut(key) else {
            return;
        };
        if signal.contains(Signals::DESTROYED) {
            if let ComponentHandle::Clip(clip) = subject {
                set.remove(clip);
            }
        } else if signal.contains(Signals::DIRTY) {
            set.dirty = true;
        } else {
            return;
        }
        self.emit(key.into(), ComponentEvent::Dirty);
        self.notify(key.into(), Signals::DIRTY);
    }

    /// Rebuilds snapshot and hash if a member changed.
    pub(crate) fn compile_clips(&mut self, key: ClipsKey) {
        let Some(set) = self.clip_sets.get_mut(key) else {
            return;
        };
        let clips = &self.clips;
        set.rebuild(|clip| clips.get(clip).map_or("", |c| c.mode.name()).to_string());
    }

    /// Current hash, rebuilding first if needed.
    pub fn clips_hash(&mut self, key: ClipsKey) -> Option<&str> {
        self.compile_clips(key);
        self.clip_sets.get(key).map(|set| set.hash.as_str())
    }
}
