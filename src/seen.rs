//! Seen-actor tracker
//!
//! Actors created straight into storage never touch a map; capturing them
//! would leak phantoms into the pool. This set records which non-player
//! humanlike actors have actually been placed in the simulation, and is
//! pruned on capture, death and destruction to stay bounded.

use std::collections::HashSet;

use crate::actor::{ActorId, FactionDirectory, Record};

#[derive(Debug, Default)]
pub struct SeenTracker {
    seen: HashSet<ActorId>,
}

impl SeenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that an actor entered the live simulation.
    pub fn mark(&mut self, record: &Record, factions: &FactionDirectory) {
        if !record.humanlike {
            return;
        }
        let Some(faction) = record.faction else { return };
        let Some(info) = factions.get(faction) else { return };
        if info.player {
            return;
        }
        self.seen.insert(record.id);
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.seen.contains(&id)
    }

    pub fn remove(&mut self, id: ActorId) {
        self.seen.remove(&id);
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
