//! Intake queue
//!
//! Producers hand departing actors over from arbitrary host threads; the
//! tick loop drains the whole buffer once per tick. The mutex guards only
//! the pending set and map — per-record capture work runs outside it.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tracing::debug;

use crate::actor::{ActorId, FactionDirectory, Record};
use crate::hooks::HostBridge;
use crate::pool::{CaptureOutcome, VeteranPool};
use crate::settings::PoolSettings;

#[derive(Debug, Default)]
struct Pending {
    ids: HashSet<ActorId>,
    records: HashMap<ActorId, Record>,
}

/// Concurrency-safe, deduplicating staging buffer for capture candidates.
#[derive(Debug, Default)]
pub struct IntakeQueue {
    pending: Mutex<Pending>,
}

impl IntakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a record for capture. Dead or destroyed records are dropped,
    /// and an identity already pending is left untouched.
    pub fn enqueue(&self, record: Record) {
        if record.health.dead || record.destroyed {
            return;
        }
        let id = record.id;

        let mut pending = self.pending.lock().unwrap();
        if pending.ids.insert(id) {
            pending.records.insert(id, record);
        }
    }

    pub fn is_pending(&self, id: ActorId) -> bool {
        self.pending.lock().unwrap().ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard everything pending. Called when a save is loaded.
    pub fn clear(&self) {
        let mut pending = self.pending.lock().unwrap();
        pending.ids.clear();
        pending.records.clear();
    }

    /// Swap the pending state for an empty one and return it. The lock is
    /// held only for the swap.
    fn drain(&self) -> HashMap<ActorId, Record> {
        let mut pending = self.pending.lock().unwrap();
        pending.ids.clear();
        std::mem::take(&mut pending.records)
    }

    /// Drain the buffer and feed every record into the pool's capture
    /// operation. A failed capture never aborts the batch.
    ///
    /// Returns the number of records actually stored.
    pub fn process(
        &self,
        pool: &mut VeteranPool,
        now: u64,
        settings: &PoolSettings,
        factions: &FactionDirectory,
        bridge: &mut dyn HostBridge,
    ) -> u32 {
        if self.is_empty() {
            return 0;
        }
        let drained = self.drain();

        let mut stored = 0;
        for (id, record) in drained {
            // State may have changed between enqueue and drain
            if record.health.dead || record.destroyed {
                continue;
            }
            match pool.add_veteran(record, now, settings, factions, bridge) {
                CaptureOutcome::Stored => stored += 1,
                CaptureOutcome::Rejected(reason) => {
                    debug!(id = id.0, ?reason, "capture declined");
                }
            }
        }
        stored
    }
}
