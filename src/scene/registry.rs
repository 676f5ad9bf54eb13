use rustc_hash::FxHashMap;

use crate::errors::{Result, StrataError};
use crate::scene::{ComponentHandle, ComponentType};

/// Bookkeeping for one registered component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub id: String,
    pub ty: ComponentType,
    /// Monotonic creation counter, used to order snapshots.
    pub order: u64,
}

/// Per-scene index of components by id, by handle and by type.
///
/// Type lists keep creation order.
#[derive(Debug, Default)]
pub struct Registry {
    by_id: FxHashMap<String, ComponentHandle>,
    entries: FxHashMap<ComponentHandle, RegistryEntry>,
    by_type: FxHashMap<ComponentType, Vec<ComponentHandle>>,
    next_order: u64,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a requested id, or generates a fresh one.
    ///
    /// Nothing is inserted; call [`Registry::insert`] once the component exists.
    pub fn reserve(&self, requested: Option<&str>) -> Result<String> {
        match requested {
            Some(id) if self.by_id.contains_key(id) => {
                log::error!("Component id '{id}' is already in use, construction aborted");
                Err(StrataError::DuplicateId(id.to_string()))
            }
            Some(id) => Ok(id.to_string()),
            None => Ok(uuid::Uuid::new_v4().to_string()),
        }
    }

    pub fn insert(&mut self, id: String, ty: ComponentType, handle: ComponentHandle) {
        let order = self.next_order;
        self.next_order += 1;
        self.by_id.insert(id.clone(), handle);
        self.by_type.entry(ty).or_default().push(handle);
        self.entries.insert(handle, RegistryEntry { id, ty, order });
    }

    pub fn remove(&mut self, handle: ComponentHandle) -> Option<RegistryEntry> {
        let entry = self.entries.remove(&handle)?;
        self.by_id.remove(&entry.id);
        if let Some(list) = self.by_type.get_mut(&entry.ty) {
            list.retain(|h| *h != handle);
        }
        Some(entry)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<ComponentHandle> {
        self.by_id.get(id).copied()
    }

    #[must_use]
    pub fn entry(&self, handle: ComponentHandle) -> Option<&RegistryEntry> {
        self.entries.get(&handle)
    }

    #[must_use]
    pub fn contains(&self, handle: ComponentHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    #[must_use]
    pub fn id_of(&self, handle: ComponentHandle) -> Option<&str> {
        self.entries.get(&handle).map(|e| e.id.as_str())
    }

    #[must_use]
    pub fn type_of(&self, handle: ComponentHandle) -> Option<ComponentType> {
        self.entries.get(&handle).map(|e| e.ty)
    }

    #[must_use]
    pub fn of_type(&self, ty: ComponentType) -> &[ComponentHandle] {
        self.by_type.get(&ty).map_or(&[], Vec::as_slice)
    }

    /// All handles in creation order.
    #[must_use]
    pub fn handles_in_order(&self) -> Vec<ComponentHandle> {
        let mut all: Vec<_> = self.entries.iter().map(|(h, e)| (e.order, *h)).collect();
        all.sort_unstable_by_key(|(order, _)| *order);
        all.into_iter().map(|(_, h)| h).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::TransformKey;
    use slotmap::SlotMap;

    #[test]
    fn duplicate_id_is_rejected_without_side_effects() {
        let mut keys: SlotMap<TransformKey, ()> = SlotMap::with_key();
        let mut registry = Registry::new();

        let a = ComponentHandle::Transform(keys.insert(()));
        let id = registry.reserve(Some("spinner")).unwrap();
        registry.insert(id, ComponentType::Transform, a);

        assert!(matches!(
            registry.reserve(Some("spinner")),
            Err(StrataError::DuplicateId(_))
        ));
        assert_eq!(registry.get("spinner"), Some(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn generated_ids_are_unique() {
        let registry = Registry::new();
        let a = registry.reserve(None).unwrap();
        let b = registry.reserve(None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn type_lists_keep_creation_order_after_removal() {
        let mut keys: SlotMap<TransformKey, ()> = SlotMap::with_key();
        let mut registry = Registry::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let h = ComponentHandle::Transform(keys.insert(()));
                registry.insert(format!("t{i}"), ComponentType::Transform, h);
                h
            })
            .collect();

        registry.remove(handles[1]);

        assert_eq!(
            registry.of_type(ComponentType::Transform),
            &[handles[0], handles[2], handles[3]]
        );
        assert_eq!(registry.handles_in_order(), vec![handles[0], handles[2], handles[3]]);
        assert!(registry.get("t1").is_none());
    }
}
