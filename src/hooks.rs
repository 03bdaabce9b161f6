//! Host integration surface
//!
//! The pool never patches the host; the host wires its simulation events to
//! these entry points instead: actor despawn, generation request, dormancy
//! eligibility review and GC retention. The `HostBridge` trait is the
//! custody seam the pool calls back through.

use rand::Rng;
use tracing::debug;

use crate::actor::{
    ActorId, Condition, ConditionId, FactionDirectory, Record, TICKS_PER_DAY,
};
use crate::error::PoolError;
use crate::pool::VeteranPool;
use crate::queue::IntakeQueue;
use crate::seen::SeenTracker;
use crate::settings::PoolSettings;
use crate::systems::dispatch::GenerationRequest;

/// Custody and storage callbacks the host provides.
pub trait HostBridge {
    /// Take custody of a record entering pool storage. Must be idempotent;
    /// an error aborts that capture with no pool state change.
    fn retain(&mut self, record: &Record) -> Result<(), PoolError>;

    /// Give custody back to the live simulation on dispatch.
    fn release(&mut self, _record: &Record) {}

    /// Whether the host currently holds this actor in deep freeze.
    /// Informational only.
    fn is_dormant(&self, _id: ActorId) -> bool {
        false
    }
}

/// Bridge for hosts without a custody layer, and for tests.
#[derive(Debug, Default)]
pub struct NoopBridge;

impl HostBridge for NoopBridge {
    fn retain(&mut self, _record: &Record) -> Result<(), PoolError> {
        Ok(())
    }
}

/// An actor is leaving the live simulation: decide whether it is worth
/// keeping and stage it for capture.
///
/// Returns true when the record was enqueued. Only previously-seen,
/// humanlike, living actors of visible non-player factions qualify;
/// actors from transient quest factions or kidnapped ones are skipped
/// unless manually pinned.
pub fn on_actor_despawn(
    record: Record,
    pool: &VeteranPool,
    queue: &IntakeQueue,
    seen: &mut SeenTracker,
    factions: &FactionDirectory,
) -> bool {
    let id = record.id;
    // Actors that never touched a map are phantoms; don't capture them
    if !seen.contains(id) {
        return false;
    }
    if !record.humanlike || record.health.dead || record.destroyed {
        return false;
    }
    let Some(faction) = record.faction else {
        return false;
    };
    let Some(info) = factions.get(faction) else {
        return false;
    };
    if info.player || info.hidden {
        return false;
    }
    if record.holding == Some(crate::actor::Holding::Building) {
        return false;
    }

    if !pool.is_pinned(id) && (info.transient || record.kidnapped) {
        return false;
    }

    seen.remove(id);
    queue.enqueue(record);
    true
}

/// The host wants a new actor: roll the recall chance, then consult the
/// dispatcher. `None` means generate normally.
pub fn on_generation_request(
    pool: &mut VeteranPool,
    request: &GenerationRequest,
    now: u64,
    settings: &PoolSettings,
    factions: &FactionDirectory,
    bridge: &mut dyn HostBridge,
    rng: &mut impl Rng,
) -> Option<Record> {
    let info = factions.get(request.faction)?;
    if info.player || !info.humanlike {
        return None;
    }
    if request.force_new || !request.can_generate_relations {
        return None;
    }
    if rng.gen::<f32>() >= settings.recall_chance {
        return None;
    }
    pool.try_get_veteran(request, now, settings, bridge)
}

/// The host computed a dormancy blocker for an actor; the pool may clear
/// or replace it for its own records.
///
/// Once the forced-freeze window after capture elapses the blocker is
/// cleared outright. Before that, dependency-class blockers (addictions,
/// highs, hangovers) are cleared too, unless some other active condition
/// still forbids sleep.
pub fn review_dormancy_blocker(
    pool: &VeteranPool,
    queue: &IntakeQueue,
    record: &Record,
    blocker: Option<&Condition>,
    now: u64,
    settings: &PoolSettings,
) -> Option<ConditionId> {
    let id = record.id;
    if !pool.is_known(id) && !queue.is_pending(id) {
        return blocker.map(|c| c.id.clone());
    }

    if let Some(added) = pool.captured_at(id) {
        if now >= added + settings.forced_freeze_days * TICKS_PER_DAY {
            if let Some(blocker) = blocker {
                debug!(
                    id = id.0,
                    name = %record.name,
                    ignored = %blocker.id.0,
                    "forced freeze window elapsed"
                );
            }
            return None;
        }
    }

    let blocker = blocker?;
    if blocker.kind.is_dependency() {
        // Dependencies may sleep; look for a real blocker underneath
        for condition in &record.health.conditions {
            if !condition.allows_dormancy
                && !condition.permanent
                && !condition.kind.is_dependency()
            {
                return Some(condition.id.clone());
            }
        }
        debug!(id = id.0, name = %record.name, dependency = %blocker.id.0, "sleeping through dependency");
        return None;
    }
    Some(blocker.id.clone())
}

/// Reason string the host's GC should treat as critical retention, if any.
pub fn retention_reason(
    pool: &VeteranPool,
    record: &Record,
    factions: &FactionDirectory,
) -> Option<&'static str> {
    let faction = record.faction?;
    let info = factions.get(faction)?;
    if info.player {
        return None;
    }
    if pool.is_known(record.id) {
        return Some("veteran_pool_member");
    }
    None
}
