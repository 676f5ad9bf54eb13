//! Ordered member list shared by the clips and lights aggregates.

/// An ordered list of non-owning member keys with a lazily rebuilt snapshot
/// and shader-variant hash.
#[derive(Debug, Clone)]
pub struct Aggregate<K> {
    pub(crate) members: Vec<K>,
    pub(crate) snapshot: Vec<K>,
    pub(crate) hash: String,
    pub(crate) dirty: bool,
    pub(crate) rebuilds: u64,
}

impl<K> Default for Aggregate<K> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            snapshot: Vec::new(),
            hash: String::new(),
            dirty: true,
            rebuilds: 0,
        }
    }
}

impl<K: Copy + PartialEq> Aggregate<K> {
    #[must_use]
    pub fn members(&self) -> &[K] {
        &self.members
    }

    /// Members as of the last rebuild, in list order.
    #[must_use]
    pub fn snapshot(&self) -> &[K] {
        &self.snapshot
    }

    /// Hash as of the last rebuild.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Removes every occurrence of `member`, keeping the others in order.
    pub(crate) fn remove(&mut self, member: K) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != member);
        let removed = self.members.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// Rebuilds snapshot and hash if dirty. Each member contributes one hash
    /// fragment; the hash is terminated with `;`.
    pub(crate) fn rebuild(&mut self, mut fragment: impl FnMut(K) -> String) -> bool {
        if !self.dirty {
            return false;
        }
        self.snapshot.clone_from(&self.members);
        let mut hash: String = self.members.iter().map(|m| fragment(*m)).collect();
        hash.push(';');
        self.hash = hash;
        self.dirty = false;
        self.rebuilds += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_preserves_order_at_every_position() {
        let original: Vec<u32> = (0..6).collect();
        for victim in 0..original.len() {
            let mut aggregate = Aggregate {
                members: original.clone(),
                dirty: false,
                ..Default::default()
            };
            assert!(aggregate.remove(original[victim]));

            let expected: Vec<u32> = original.iter().copied().filter(|m| *m != original[victim]).collect();
            assert_eq!(aggregate.members(), expected.as_slice());
            assert!(aggregate.is_dirty());
        }
    }

    #[test]
    fn empty_list_hashes_to_terminator() {
        let mut aggregate: Aggregate<u32> = Aggregate::default();
        assert!(aggregate.rebuild(|m| m.to_string()));
        assert_eq!(aggregate.hash(), ";");
        assert!(!aggregate.rebuild(|m| m.to_string()));
    }
}
