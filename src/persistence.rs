//! Persistence - export/import of pool state
//!
//! Serializes the pool to a versioned, self-contained save structure and
//! restores it with load-time repair. JSON is the interchange format;
//! bincode gives compact binary saves. The caller clears the intake queue
//! and seen tracker after a load, matching the save/load contract.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::actor::{ActorId, FactionId, Record};
use crate::error::PoolError;
use crate::pool::{VeteranGroup, VeteranPool};

const SAVE_VERSION: u8 = 1;

// ============================================================================
// Save Data Structures
// ============================================================================

/// Complete pool state for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u8,
    pub groups: Vec<SavedGroup>,
    pub add_ticks: Vec<(ActorId, u64)>,
    pub bio_age_snapshots: Vec<(ActorId, i64)>,
    pub notes: Vec<(ActorId, String)>,
    pub on_mission: Vec<ActorId>,
    pub pinned: Vec<ActorId>,
    pub ticks_to_next_cycle: i64,
}

/// One faction's ordered records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGroup {
    pub faction: FactionId,
    pub records: Vec<Record>,
}

/// What load-time repair had to fix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub records: usize,
    pub duplicates_removed: usize,
    pub cooldowns_pruned: usize,
    pub pins_pruned: usize,
}

// ============================================================================
// Export
// ============================================================================

/// Snapshot the pool. Destroyed records are scrubbed before the snapshot,
/// never written out.
pub fn export(pool: &VeteranPool) -> SaveData {
    let mut groups: Vec<SavedGroup> = pool
        .groups
        .iter()
        .map(|(faction, group)| SavedGroup {
            faction: *faction,
            records: group
                .records
                .iter()
                .filter(|r| !r.destroyed)
                .cloned()
                .collect(),
        })
        .collect();
    // Deterministic output regardless of map iteration order
    groups.sort_by_key(|g| g.faction.0);

    let mut add_ticks: Vec<_> = pool.add_ticks.iter().map(|(k, v)| (*k, *v)).collect();
    add_ticks.sort_by_key(|(id, _)| *id);
    let mut bio_age_snapshots: Vec<_> =
        pool.bio_age_snapshots.iter().map(|(k, v)| (*k, *v)).collect();
    bio_age_snapshots.sort_by_key(|(id, _)| *id);
    let mut notes: Vec<_> = pool.notes.iter().map(|(k, v)| (*k, v.clone())).collect();
    notes.sort_by_key(|(id, _)| *id);
    let mut on_mission: Vec<_> = pool.on_mission.iter().copied().collect();
    on_mission.sort();
    let mut pinned: Vec<_> = pool.pins.iter().copied().collect();
    pinned.sort();

    SaveData {
        version: SAVE_VERSION,
        groups,
        add_ticks,
        bio_age_snapshots,
        notes,
        on_mission,
        pinned,
        ticks_to_next_cycle: pool.ticks_to_next_cycle,
    }
}

pub fn to_json(pool: &VeteranPool) -> Result<String, PoolError> {
    Ok(serde_json::to_string(&export(pool))?)
}

pub fn to_bytes(pool: &VeteranPool) -> Result<Vec<u8>, PoolError> {
    Ok(bincode::serialize(&export(pool))?)
}

// ============================================================================
// Import
// ============================================================================

/// Rebuild a pool from saved state, repairing it on the way.
///
/// Repair: the identity index is rebuilt from group contents; duplicate
/// identities within and across groups keep their first occurrence and the
/// physical duplicate is destroyed; cooldown and snapshot entries for
/// unknown identities are pruned; pins already covered by membership, or
/// whose actor the host no longer knows (`host_knows`), are dropped.
pub fn restore(
    data: SaveData,
    host_knows: impl Fn(ActorId) -> bool,
) -> Result<(VeteranPool, RestoreReport), PoolError> {
    if data.version != SAVE_VERSION {
        return Err(PoolError::UnsupportedVersion(data.version));
    }

    let mut report = RestoreReport::default();
    let mut pool = VeteranPool::new();
    let mut seen_ids: HashSet<ActorId> = HashSet::new();

    for saved in data.groups {
        let mut group = VeteranGroup::default();
        for record in saved.records {
            if seen_ids.insert(record.id) {
                group.records.push(record);
            } else {
                warn!(id = record.id.0, name = %record.name, "duplicate record destroyed on load");
                report.duplicates_removed += 1;
            }
        }
        if !group.records.is_empty() {
            pool.groups.insert(saved.faction, group);
        }
    }
    pool.all_ids = seen_ids;
    report.records = pool.all_ids.len();

    let add_ticks: HashMap<ActorId, u64> = data.add_ticks.into_iter().collect();
    report.cooldowns_pruned = add_ticks
        .keys()
        .filter(|id| !pool.all_ids.contains(id))
        .count();
    pool.add_ticks = add_ticks
        .into_iter()
        .filter(|(id, _)| pool.all_ids.contains(id))
        .collect();

    pool.bio_age_snapshots = data
        .bio_age_snapshots
        .into_iter()
        .filter(|(id, _)| pool.all_ids.contains(id))
        .collect();

    pool.notes = data.notes.into_iter().collect();
    pool.on_mission = data.on_mission.into_iter().collect();

    let pins_before = data.pinned.len();
    pool.pins = data
        .pinned
        .into_iter()
        .filter(|id| !pool.all_ids.contains(id) && host_knows(*id))
        .collect();
    report.pins_pruned = pins_before - pool.pins.len();

    pool.ticks_to_next_cycle = data.ticks_to_next_cycle;

    debug!(
        records = report.records,
        duplicates = report.duplicates_removed,
        "pool restored"
    );
    Ok((pool, report))
}

pub fn from_json(
    json: &str,
    host_knows: impl Fn(ActorId) -> bool,
) -> Result<(VeteranPool, RestoreReport), PoolError> {
    let data: SaveData = serde_json::from_str(json)?;
    restore(data, host_knows)
}

pub fn from_bytes(
    bytes: &[u8],
    host_knows: impl Fn(ActorId) -> bool,
) -> Result<(VeteranPool, RestoreReport), PoolError> {
    let data: SaveData = bincode::deserialize(bytes)?;
    restore(data, host_knows)
}
