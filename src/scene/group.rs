use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::scene::events::ComponentEvent;
use crate::scene::observer::Signals;
use crate::scene::scheduler::{Task, TickPhase};
use crate::scene::{ComponentHandle, ComponentType, GroupKey, Scene};

/// Selects the members an add or remove applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupMember {
    /// A single component by id.
    Id(String),
    /// Every component of a type.
    Type(ComponentType),
    Handle(ComponentHandle),
}

impl From<ComponentHandle> for GroupMember {
    fn from(handle: ComponentHandle) -> Self {
        Self::Handle(handle)
    }
}

impl From<ComponentType> for GroupMember {
    fn from(ty: ComponentType) -> Self {
        Self::Type(ty)
    }
}

impl From<&str> for GroupMember {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

/// An ordered, non-owning collection of arbitrary components.
///
/// Membership changes are reported individually (`Added`/`Removed`) and
/// summarised by one `Updated` per `Tick2`.
#[derive(Debug, Default)]
pub struct Group {
    members: Vec<ComponentHandle>,
    by_type: FxHashMap<ComponentType, Vec<ComponentHandle>>,
    notify_scheduled: bool,
}

impl Group {
    #[must_use]
    pub fn members(&self) -> &[ComponentHandle] {
        &self.members
    }

    #[must_use]
    pub fn members_of_type(&self, ty: ComponentType) -> &[ComponentHandle] {
        self.by_type.get(&ty).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn contains(&self, handle: ComponentHandle) -> bool {
        self.members.contains(&handle)
    }

    fn push(&mut self, handle: ComponentHandle, ty: ComponentType) -> bool {
        if self.contains(handle) {
            return false;
        }
        self.members.push(handle);
        self.by_type.entry(ty).or_default().push(handle);
        true
    }

    fn remove(&mut self, handle: ComponentHandle) -> bool {
        let Some(pos) = self.members.iter().position(|h| *h == handle) else {
            return false;
        };
        self.members.remove(pos);
        for list in self.by_type.values_mut() {
            list.retain(|h| *h != handle);
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDesc {
    pub id: Option<String>,
    /// Member ids, added in order.
    pub members: Vec<String>,
}

impl Scene {
    pub fn create_group(&mut self, desc: GroupDesc) -> crate::Result<GroupKey> {
        self.ensure_alive()?;
        let id = self.registry.reserve(desc.id.as_deref())?;
        let key = self.groups.insert(Group::default());
        self.register(id, ComponentType::Group, key.into());
        for member in desc.members {
            self.group_add(key, GroupMember::Id(member));
        }
        Ok(key)
    }

    #[must_use]
    pub fn group(&self, key: GroupKey) -> Option<&Group> {
        self.groups.get(key)
    }

    fn resolve_group_member(&self, member: &GroupMember) -> Vec<(ComponentHandle, ComponentType)> {
        match member {
            GroupMember::Id(id) => match self.registry.get(id) {
                Some(handle) => self
                    .registry
                    .type_of(handle)
                    .map(|ty| vec![(handle, ty)])
                    .unwrap_or_default(),
                None => {
                    log::warn!("Group member not found: '{id}'");
                    Vec::new()
                }
            },
            GroupMember::Type(ty) => self.registry.of_type(*ty).iter().map(|h| (*h, *ty)).collect(),
            GroupMember::Handle(handle) => match self.registry.type_of(*handle) {
                Some(ty) => vec![(*handle, ty)],
                None => {
                    log::warn!("Group member is a stale {} handle", handle.kind_name());
                    Vec::new()
                }
            },
        }
    }

    /// Adds members. Components already present are skipped.
    pub fn group_add(&mut self, key: GroupKey, member: impl Into<GroupMember>) {
        if !self.groups.contains_key(key) {
            log::warn!("group_add: stale group handle");
            return;
        }
        let member = member.into();
        for (handle, ty) in self.resolve_group_member(&member) {
            if handle == ComponentHandle::Group(key) {
                continue;
            }
            if self.groups[key].push(handle, ty) {
                self.observers.subscribe(handle, key.into(), Signals::DESTROYED);
                self.emit(key.into(), ComponentEvent::Added(handle));
                self.schedule_group_notify(key);
            }
        }
    }

    pub fn group_remove(&mut self, key: GroupKey, member: impl Into<GroupMember>) {
        if !self.groups.contains_key(key) {
            log::warn!("group_remove: stale group handle");
            return;
        }
        let member = member.into();
        for (handle, _) in self.resolve_group_member(&member) {
            self.remove_group_member(key, handle);
        }
    }

    fn remove_group_member(&mut self, key: GroupKey, handle: ComponentHandle) {
        let Some(group) = self.groups.get_mut(key) else {
            return;
        };
        if group.remove(handle) {
            self.observers.unsubscribe(handle, key.into(), Signals::DESTROYED);
            self.emit(key.into(), ComponentEvent::Removed(handle));
            self.schedule_group_notify(key);
        }
    }

    fn schedule_group_notify(&mut self, key: GroupKey) {
        let Some(group) = self.groups.get_mut(key) else {
            return;
        };
        if !group.notify_scheduled {
            group.notify_scheduled = true;
            self.scheduler.schedule(TickPhase::Tick2, Task::NotifyGroup(key));
        }
    }

    /// Emits the coalesced `Updated` for a group. Runs from the `Tick2` task.
    pub(crate) fn notify_group(&mut self, key: GroupKey) {
        let Some(group) = self.groups.get_mut(key) else {
            return;
        };
        group.notify_scheduled = false;
        self.emit(key.into(), ComponentEvent::Updated);
        self.notify(key.into(), Signals::UPDATED);
    }

    pub(crate) fn group_on_signal(&mut self, key: GroupKey, subject: ComponentHandle, signal: Signals) {
        if signal.contains(Signals::DESTROYED) {
            self.remove_group_member(key, subject);
        }
    }

    /// Destroys every member, leaving the group empty.
    pub fn group_destroy_all(&mut self, key: GroupKey) {
        let Some(group) = self.groups.get(key) else {
            log::warn!("group_destroy_all: stale group handle");
            return;
        };
        let members = group.members.clone();
        for handle in members {
            self.destroy_component(handle);
        }
    }

    pub(crate) fn group_to_json(&self, group: &Group) -> serde_json::Value {
        let ids: Vec<&str> = group
            .members
            .iter()
            .filter_map(|h| self.registry.id_of(*h))
            .collect();
        serde_json::json!({ "members": ids })
    }
}
