//! Per-phase task queues and persistent tick listeners.
//!
//! A frame runs five phases in fixed order. Each phase owns:
//! - a queue of one-shot [`Task`]s, taken atomically when the phase starts,
//!   so a task that schedules work for its own phase lands in the next
//!   occurrence of that phase;
//! - an ordered list of persistent [`Listener`]s.
//!
//! The scheduler only stores work. [`Scene::run_phase`](crate::Scene) does the
//! dispatch, taking each listener out of its slot while it runs.

use slotmap::{SlotMap, new_key_type};

use crate::scene::{FlightKey, GeometryKey, GroupKey, LookatKey, Scene, TickEvent};

new_key_type! {
    /// Handle to a persistent tick listener.
    pub struct ListenerKey;
}

/// The five per-frame synchronisation points, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TickPhase {
    Tick,
    Tick2,
    Tick3,
    Tick4,
    Tick5,
}

impl TickPhase {
    pub const ALL: [TickPhase; 5] = [
        TickPhase::Tick,
        TickPhase::Tick2,
        TickPhase::Tick3,
        TickPhase::Tick4,
        TickPhase::Tick5,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Tick => "tick",
            Self::Tick2 => "tick2",
            Self::Tick3 => "tick3",
            Self::Tick4 => "tick4",
            Self::Tick5 => "tick5",
        }
    }
}

pub type DeferredFn = Box<dyn FnOnce(&mut Scene, &TickEvent)>;
pub type TickFn = Box<dyn FnMut(&mut Scene, &TickEvent)>;

/// One-shot work queued for the next occurrence of a phase.
pub enum Task {
    BuildGeometry(GeometryKey),
    BuildLookat(LookatKey),
    NotifyGroup(GroupKey),
    Deferred(DeferredFn),
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuildGeometry(k) => f.debug_tuple("BuildGeometry").field(k).finish(),
            Self::BuildLookat(k) => f.debug_tuple("BuildLookat").field(k).finish(),
            Self::NotifyGroup(k) => f.debug_tuple("NotifyGroup").field(k).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Work run on every occurrence of a phase until unsubscribed.
pub enum Listener {
    Flight(FlightKey),
    Callback(TickFn),
}

struct ListenerSlot {
    phase: TickPhase,
    listener: Option<Listener>,
}

#[derive(Default)]
pub struct Scheduler {
    listeners: SlotMap<ListenerKey, ListenerSlot>,
    order: [Vec<ListenerKey>; 5],
    queues: [Vec<Task>; 5],
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("listeners", &self.listeners.len())
            .field("pending", &self.queues.iter().map(Vec::len).collect::<Vec<_>>())
            .finish()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, phase: TickPhase, task: Task) {
        self.queues[phase.index()].push(task);
    }

    /// Number of one-shot tasks waiting for `phase`.
    #[must_use]
    pub fn pending(&self, phase: TickPhase) -> usize {
        self.queues[phase.index()].len()
    }

    pub fn subscribe(&mut self, phase: TickPhase, listener: Listener) -> ListenerKey {
        let key = self.listeners.insert(ListenerSlot {
            phase,
            listener: Some(listener),
        });
        self.order[phase.index()].push(key);
        key
    }

    /// Removes a listener. Safe to call while that listener is running.
    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        let Some(slot) = self.listeners.remove(key) else {
            return false;
        };
        self.order[slot.phase.index()].retain(|k| *k != key);
        true
    }

    #[must_use]
    pub fn listener_count(&self, phase: TickPhase) -> usize {
        self.order[phase.index()].len()
    }

    pub(crate) fn take_queue(&mut self, phase: TickPhase) -> Vec<Task> {
        std::mem::take(&mut self.queues[phase.index()])
    }

    pub(crate) fn listeners_snapshot(&self, phase: TickPhase) -> Vec<ListenerKey> {
        self.order[phase.index()].clone()
    }

    pub(crate) fn take_listener(&mut self, key: ListenerKey) -> Option<Listener> {
        self.listeners.get_mut(key).and_then(|slot| slot.listener.take())
    }

    /// Puts a listener back after it ran. Dropped if it unsubscribed meanwhile.
    pub(crate) fn restore_listener(&mut self, key: ListenerKey, listener: Listener) -> bool {
        match self.listeners.get_mut(key) {
            Some(slot) if slot.listener.is_none() => {
                slot.listener = Some(listener);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
        for list in &mut self.order {
            list.clear();
        }
        for queue in &mut self.queues {
            queue.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_taken_atomically() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(TickPhase::Tick2, Task::Deferred(Box::new(|_, _| {})));
        assert_eq!(scheduler.pending(TickPhase::Tick2), 1);

        let drained = scheduler.take_queue(TickPhase::Tick2);
        assert_eq!(drained.len(), 1);
        assert_eq!(scheduler.pending(TickPhase::Tick2), 0);
    }

    #[test]
    fn unsubscribed_listener_is_not_restored() {
        let mut scheduler = Scheduler::new();
        let key = scheduler.subscribe(TickPhase::Tick, Listener::Callback(Box::new(|_, _| {})));

        let listener = scheduler.take_listener(key).unwrap();
        assert!(scheduler.unsubscribe(key));
        assert!(!scheduler.restore_listener(key, listener));
        assert_eq!(scheduler.listener_count(TickPhase::Tick), 0);
    }

    #[test]
    fn phases_are_ordered() {
        let names: Vec<_> = TickPhase::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["tick", "tick2", "tick3", "tick4", "tick5"]);
    }
}
