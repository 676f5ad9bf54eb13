//! Dependency edges between components.
//!
//! A subject notifies its observers with one of the [`Signals`]; the scene
//! dispatches each notification to the observer's handler. Handlers may
//! subscribe, unsubscribe or notify further while a notification is in flight
//! because [`ObserverGraph::observers`] hands out a snapshot.

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::scene::ComponentHandle;

bitflags! {
    /// Invalidation signals a component can send to its dependents.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Signals: u8 {
        /// A derived matrix changed (transform leaf, lookat view, group membership).
        const UPDATED   = 1 << 0;
        /// Shader-relevant state changed; dependents must recompile.
        const DIRTY     = 1 << 1;
        /// The subject is being destroyed.
        const DESTROYED = 1 << 2;
        /// A geometry's local boundary was invalidated.
        const BOUNDARY  = 1 << 3;
    }
}

type ObserverList = SmallVec<[(ComponentHandle, Signals); 4]>;

#[derive(Debug, Default)]
pub struct ObserverGraph {
    edges: FxHashMap<ComponentHandle, ObserverList>,
}

impl ObserverGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `observer` receive `signals` from `subject`. Flags accumulate.
    pub fn subscribe(&mut self, subject: ComponentHandle, observer: ComponentHandle, signals: Signals) {
        let list = self.edges.entry(subject).or_default();
        if let Some((_, existing)) = list.iter_mut().find(|(h, _)| *h == observer) {
            *existing |= signals;
        } else {
            list.push((observer, signals));
        }
    }

    pub fn unsubscribe(&mut self, subject: ComponentHandle, observer: ComponentHandle, signals: Signals) {
        let Some(list) = self.edges.get_mut(&subject) else {
            return;
        };
        for (_, flags) in list.iter_mut().filter(|(h, _)| *h == observer) {
            flags.remove(signals);
        }
        list.retain(|(_, flags)| !flags.is_empty());
        if list.is_empty() {
            self.edges.remove(&subject);
        }
    }

    /// Observers of `subject` interested in `signal`, in subscription order.
    #[must_use]
    pub fn observers(&self, subject: ComponentHandle, signal: Signals) -> SmallVec<[ComponentHandle; 4]> {
        self.edges
            .get(&subject)
            .map(|list| {
                list.iter()
                    .filter(|(_, flags)| flags.intersects(signal))
                    .map(|(h, _)| *h)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_subscribed(&self, subject: ComponentHandle, observer: ComponentHandle, signal: Signals) -> bool {
        self.edges
            .get(&subject)
            .is_some_and(|list| list.iter().any(|(h, f)| *h == observer && f.contains(signal)))
    }

    /// Drops every edge touching `handle`, in either direction.
    pub fn forget(&mut self, handle: ComponentHandle) {
        self.edges.remove(&handle);
        self.edges.retain(|_, list| {
            list.retain(|(h, _)| *h != handle);
            !list.is_empty()
        });
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::TransformKey;
    use slotmap::SlotMap;

    fn handles(n: usize) -> Vec<ComponentHandle> {
        let mut keys: SlotMap<TransformKey, ()> = SlotMap::with_key();
        (0..n).map(|_| ComponentHandle::Transform(keys.insert(()))).collect()
    }

    #[test]
    fn partial_unsubscribe_keeps_remaining_signals() {
        let h = handles(2);
        let mut graph = ObserverGraph::new();
        graph.subscribe(h[0], h[1], Signals::UPDATED | Signals::DESTROYED);
        graph.unsubscribe(h[0], h[1], Signals::UPDATED);

        assert!(graph.observers(h[0], Signals::UPDATED).is_empty());
        assert_eq!(graph.observers(h[0], Signals::DESTROYED).as_slice(), &[h[1]]);
    }

    #[test]
    fn forget_removes_both_directions() {
        let h = handles(3);
        let mut graph = ObserverGraph::new();
        graph.subscribe(h[0], h[1], Signals::DIRTY);
        graph.subscribe(h[1], h[2], Signals::DIRTY);

        graph.forget(h[1]);

        assert!(graph.observers(h[0], Signals::DIRTY).is_empty());
        assert!(graph.observers(h[1], Signals::DIRTY).is_empty());
    }
}
