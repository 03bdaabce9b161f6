//! Veteran pool - per-faction storage and tick orchestration
//!
//! The pool owns every retained record plus the derived indices the
//! dispatcher and the yearly cycle work from. Everything here runs on the
//! single simulation-tick thread; only the intake queue is shared.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actor::{
    ActorId, ConditionKind, FactionDirectory, FactionId, Record, TICKS_PER_DAY, TICKS_PER_YEAR,
};
use crate::catalog::Catalog;
use crate::hooks::HostBridge;
use crate::queue::IntakeQueue;
use crate::settings::PoolSettings;
use crate::systems::aging::{self, CycleReport};
use crate::systems::dispatch::{self, GenerationRequest};

/// Ordered per-faction collection of retained records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeteranGroup {
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Dead, destroyed, faction-less or hidden-faction record.
    Invalid,
    /// Faction group at capacity and the record is neither returning nor pinned.
    GroupFull,
    /// The host refused custody; no index was touched.
    Custody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Stored,
    Rejected(RejectReason),
}

/// What one simulation tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub captures: u32,
    pub cycle: Option<CycleReport>,
}

/// Interval between yearly cycles, shortened by faster external aging.
pub fn cycle_interval(aging_rate: f32) -> i64 {
    (TICKS_PER_YEAR as f32 / aging_rate.max(0.01)) as i64
}

/// The veteran pool manager.
///
/// Construct one per simulation session and pass it by reference to
/// whatever drives the tick loop and serves generation requests.
#[derive(Debug, Default)]
pub struct VeteranPool {
    pub(crate) groups: HashMap<FactionId, VeteranGroup>,
    /// Union of every retained identity across all groups.
    pub(crate) all_ids: HashSet<ActorId>,
    /// Identity -> tick of last capture; drives cooldown and forced freeze.
    pub(crate) add_ticks: HashMap<ActorId, u64>,
    /// Checked out to the live simulation; still group members, never candidates.
    pub(crate) on_mission: HashSet<ActorId>,
    /// One-shot manual retention flags.
    pub(crate) pins: HashSet<ActorId>,
    /// User-authored annotations; only explicit forget removes them.
    pub(crate) notes: HashMap<ActorId, String>,
    /// Identity -> biological age last observed by the yearly cycle.
    pub(crate) bio_age_snapshots: HashMap<ActorId, i64>,
    pub(crate) issued_this_tick: HashSet<ActorId>,
    pub(crate) last_issue_tick: Option<u64>,
    /// Countdown to the next yearly cycle; negative means uninitialized.
    pub(crate) ticks_to_next_cycle: i64,
}

impl VeteranPool {
    pub fn new() -> Self {
        Self {
            ticks_to_next_cycle: -1,
            ..Self::default()
        }
    }

    // ========================================================================
    // Capture
    // ========================================================================

    /// Capture a record into the pool.
    ///
    /// Returning and pinned records bypass the capacity limit; a pin is a
    /// one-shot ticket consumed here. A returning identity's stale stored
    /// copy is replaced by the fresh state. Indices are only mutated after
    /// the host accepted custody, so a custody failure leaves no partial
    /// update behind.
    pub fn add_veteran(
        &mut self,
        mut record: Record,
        now: u64,
        settings: &PoolSettings,
        factions: &FactionDirectory,
        bridge: &mut dyn HostBridge,
    ) -> CaptureOutcome {
        if record.health.dead || record.destroyed {
            return CaptureOutcome::Rejected(RejectReason::Invalid);
        }
        let Some(faction) = record.faction else {
            return CaptureOutcome::Rejected(RejectReason::Invalid);
        };
        let Some(info) = factions.get(faction) else {
            return CaptureOutcome::Rejected(RejectReason::Invalid);
        };
        if info.hidden {
            return CaptureOutcome::Rejected(RejectReason::Invalid);
        }

        let id = record.id;
        let is_returning = self.all_ids.contains(&id) || self.on_mission.contains(&id);
        let is_pinned = self.pins.contains(&id);

        if settings.enable_faction_limit && !is_returning && !is_pinned {
            let group_len = self.groups.get(&faction).map(|g| g.records.len()).unwrap_or(0);
            if group_len >= settings.faction_veteran_limit {
                return CaptureOutcome::Rejected(RejectReason::GroupFull);
            }
        }

        // Control transfers from the live map to storage
        record.mind.detach();
        clean_health(&mut record, false);
        record.spawned = false;

        if let Err(err) = bridge.retain(&record) {
            warn!(id = id.0, name = %record.name, %err, "custody transfer failed, capture aborted");
            return CaptureOutcome::Rejected(RejectReason::Custody);
        }

        self.on_mission.remove(&id);
        if is_pinned {
            // One-shot ticket used up
            self.pins.remove(&id);
        }

        if self.all_ids.contains(&id) {
            // Replace the stale copy wherever it lives
            for group in self.groups.values_mut() {
                group.records.retain(|r| r.id != id);
            }
        } else {
            self.all_ids.insert(id);
        }

        let bio_age = record.age.biological_ticks;
        debug!(id = id.0, name = %record.name, faction = faction.0, "veteran stored in pool");
        self.groups.entry(faction).or_default().records.push(record);
        self.add_ticks.insert(id, now);
        self.bio_age_snapshots.insert(id, bio_age);
        CaptureOutcome::Stored
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Run one simulation tick: drain the intake queue, then run the yearly
    /// cycle if its countdown expired. Dispatch requests served later in
    /// the same tick observe the post-cycle state.
    pub fn tick(
        &mut self,
        now: u64,
        queue: &IntakeQueue,
        settings: &PoolSettings,
        factions: &FactionDirectory,
        catalog: &Catalog,
        bridge: &mut dyn HostBridge,
        rng: &mut impl Rng,
    ) -> TickReport {
        let captures = queue.process(self, now, settings, factions, bridge);

        if self.ticks_to_next_cycle < 0 {
            self.ticks_to_next_cycle = cycle_interval(settings.aging_rate);
        }

        self.ticks_to_next_cycle -= 1;
        let mut cycle = None;
        if self.ticks_to_next_cycle <= 0 {
            self.ticks_to_next_cycle = cycle_interval(settings.aging_rate);
            debug!(
                days_to_next = self.ticks_to_next_cycle / TICKS_PER_DAY as i64,
                "yearly cycle started"
            );
            cycle = Some(aging::run_yearly_cycle(self, settings, factions, catalog, rng));
        }

        TickReport { captures, cycle }
    }

    /// Find and check out a record matching `request`, if any.
    pub fn try_get_veteran(
        &mut self,
        request: &GenerationRequest,
        now: u64,
        settings: &PoolSettings,
        bridge: &mut dyn HostBridge,
    ) -> Option<Record> {
        dispatch::try_get_veteran(self, request, now, settings, bridge)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether this identity is pool-known (retained or checked out).
    pub fn is_known(&self, id: ActorId) -> bool {
        self.all_ids.contains(&id)
    }

    /// Known and currently resting in a group, not checked out.
    pub fn is_retained(&self, id: ActorId) -> bool {
        self.all_ids.contains(&id) && !self.on_mission.contains(&id)
    }

    pub fn is_on_mission(&self, id: ActorId) -> bool {
        self.on_mission.contains(&id)
    }

    pub fn captured_at(&self, id: ActorId) -> Option<u64> {
        self.add_ticks.get(&id).copied()
    }

    pub fn group(&self, faction: FactionId) -> Option<&VeteranGroup> {
        self.groups.get(&faction)
    }

    pub fn known_ids(&self) -> &HashSet<ActorId> {
        &self.all_ids
    }

    pub fn total_retained(&self) -> usize {
        self.groups.values().map(|g| g.records.len()).sum()
    }

    pub fn ticks_to_next_cycle(&self) -> i64 {
        self.ticks_to_next_cycle
    }

    // ========================================================================
    // Manual curation
    // ========================================================================

    pub fn is_pinned(&self, id: ActorId) -> bool {
        self.pins.contains(&id)
    }

    /// Flag an identity for guaranteed one-time retention over capacity.
    pub fn pin(&mut self, id: ActorId) {
        self.pins.insert(id);
    }

    pub fn unpin(&mut self, id: ActorId) {
        self.pins.remove(&id);
    }

    pub fn note(&self, id: ActorId) -> Option<&str> {
        self.notes.get(&id).map(String::as_str)
    }

    /// Attach a free-text note; blank text removes it.
    pub fn set_note(&mut self, id: ActorId, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            self.notes.remove(&id);
        } else {
            self.notes.insert(id, text);
        }
    }

    /// Drop manual state for an identity: pin and note.
    pub fn forget(&mut self, id: ActorId) {
        self.pins.remove(&id);
        self.notes.remove(&id);
    }

    /// Wipe every group and derived index. Notes and pins survive.
    pub fn reset(&mut self) {
        self.groups.clear();
        self.all_ids.clear();
        self.add_ticks.clear();
        self.on_mission.clear();
        self.bio_age_snapshots.clear();
    }
}

/// Normalize a record's health: non-permanent injuries and blood loss are
/// always stripped; the full variant (yearly cycle only) also strips
/// sickness, tendable and intoxication conditions and restores needs.
pub(crate) fn clean_health(record: &mut Record, full_heal: bool) {
    record.health.conditions.retain(|c| {
        let strip = match c.kind {
            ConditionKind::Injury => !c.permanent,
            ConditionKind::BloodLoss => true,
            ConditionKind::Ailment { tendable, sickness } => full_heal && (tendable || sickness),
            ConditionKind::Intoxication => full_heal,
            _ => false,
        };
        !strip
    });
    if full_heal {
        record.needs.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Condition, FactionInfo, TechLevel};
    use crate::error::PoolError;
    use crate::hooks::NoopBridge;

    fn factions() -> FactionDirectory {
        let mut dir = FactionDirectory::new();
        dir.insert(FactionId(1), FactionInfo::new("Outlanders", TechLevel::Industrial));
        dir
    }

    fn record(id: u64) -> Record {
        Record::new(ActorId(id), format!("Actor_{id}"), FactionId(1))
    }

    /// Counts custody transfers; optionally fails for one identity.
    struct CountingBridge {
        retains: u32,
        fail_for: Option<ActorId>,
    }

    impl CountingBridge {
        fn new() -> Self {
            Self { retains: 0, fail_for: None }
        }
    }

    impl HostBridge for CountingBridge {
        fn retain(&mut self, record: &Record) -> Result<(), PoolError> {
            self.retains += 1;
            if self.fail_for == Some(record.id) {
                return Err(PoolError::CustodyTransfer("storage full".to_string()));
            }
            Ok(())
        }
    }

    fn invariant_holds(pool: &VeteranPool) -> bool {
        let union: HashSet<ActorId> = pool
            .groups
            .values()
            .flat_map(|g| g.records.iter().map(|r| r.id))
            .collect();
        union == pool.all_ids
    }

    #[test]
    fn test_capture_stores_and_stamps() {
        let mut pool = VeteranPool::new();
        let settings = PoolSettings::default();
        let dir = factions();

        let outcome = pool.add_veteran(record(5), 1234, &settings, &dir, &mut NoopBridge);
        assert_eq!(outcome, CaptureOutcome::Stored);
        assert!(pool.is_known(ActorId(5)));
        assert!(pool.is_retained(ActorId(5)));
        assert_eq!(pool.captured_at(ActorId(5)), Some(1234));
        assert!(invariant_holds(&pool));
    }

    #[test]
    fn test_capacity_limit_holds() {
        let mut pool = VeteranPool::new();
        let mut settings = PoolSettings::default();
        settings.faction_veteran_limit = 3;
        let dir = factions();

        for i in 0..4 {
            pool.add_veteran(record(i), 0, &settings, &dir, &mut NoopBridge);
        }
        assert_eq!(pool.total_retained(), 3);
        assert_eq!(
            pool.add_veteran(record(99), 0, &settings, &dir, &mut NoopBridge),
            CaptureOutcome::Rejected(RejectReason::GroupFull)
        );
        assert!(invariant_holds(&pool));
    }

    #[test]
    fn test_pinned_capture_bypasses_limit_once() {
        let mut pool = VeteranPool::new();
        let mut settings = PoolSettings::default();
        settings.faction_veteran_limit = 1;
        let dir = factions();

        pool.add_veteran(record(1), 0, &settings, &dir, &mut NoopBridge);
        pool.pin(ActorId(2));

        let outcome = pool.add_veteran(record(2), 0, &settings, &dir, &mut NoopBridge);
        assert_eq!(outcome, CaptureOutcome::Stored);
        assert_eq!(pool.total_retained(), 2);
        // One-shot: the pin is gone
        assert!(!pool.is_pinned(ActorId(2)));
    }

    #[test]
    fn test_returning_veteran_bypasses_limit_and_replaces_stale_copy() {
        let mut pool = VeteranPool::new();
        let mut settings = PoolSettings::default();
        settings.faction_veteran_limit = 1;
        let dir = factions();

        pool.add_veteran(record(1), 0, &settings, &dir, &mut NoopBridge);
        pool.on_mission.insert(ActorId(1));

        let mut fresh = record(1);
        fresh.age = crate::actor::AgeTracker::from_years(45);
        let outcome = pool.add_veteran(fresh, 100, &settings, &dir, &mut NoopBridge);
        assert_eq!(outcome, CaptureOutcome::Stored);
        assert_eq!(pool.total_retained(), 1);
        assert!(!pool.is_on_mission(ActorId(1)));
        let stored = &pool.group(FactionId(1)).unwrap().records[0];
        assert_eq!(stored.age.biological_years(), 45);
        assert!(invariant_holds(&pool));
    }

    #[test]
    fn test_custody_failure_leaves_no_partial_update() {
        let mut pool = VeteranPool::new();
        let settings = PoolSettings::default();
        let dir = factions();
        let mut bridge = CountingBridge::new();
        bridge.fail_for = Some(ActorId(7));
        pool.pin(ActorId(7));

        let outcome = pool.add_veteran(record(7), 0, &settings, &dir, &mut bridge);
        assert_eq!(outcome, CaptureOutcome::Rejected(RejectReason::Custody));
        assert!(!pool.is_known(ActorId(7)));
        assert!(pool.captured_at(ActorId(7)).is_none());
        // The pin was not consumed by the failed capture
        assert!(pool.is_pinned(ActorId(7)));
        assert!(invariant_holds(&pool));
    }

    #[test]
    fn test_queue_drain_processes_all_despite_one_failure() {
        let mut pool = VeteranPool::new();
        let settings = PoolSettings::default();
        let dir = factions();
        let queue = IntakeQueue::new();
        queue.enqueue(record(1));
        queue.enqueue(record(2));

        let mut bridge = CountingBridge::new();
        bridge.fail_for = Some(ActorId(1));

        let stored = queue.process(&mut pool, 0, &settings, &dir, &mut bridge);
        assert_eq!(stored, 1);
        // Both records got exactly one capture attempt
        assert_eq!(bridge.retains, 2);
        assert!(queue.is_empty());
        assert!(pool.is_known(ActorId(2)));
        assert!(!pool.is_known(ActorId(1)));
    }

    #[test]
    fn test_enqueue_twice_yields_one_capture_attempt() {
        let mut pool = VeteranPool::new();
        let settings = PoolSettings::default();
        let dir = factions();
        let queue = IntakeQueue::new();
        queue.enqueue(record(4));
        queue.enqueue(record(4));

        let mut bridge = CountingBridge::new();
        queue.process(&mut pool, 0, &settings, &dir, &mut bridge);
        assert_eq!(bridge.retains, 1);
    }

    #[test]
    fn test_capture_strips_fresh_injuries_keeps_scars() {
        let mut pool = VeteranPool::new();
        let settings = PoolSettings::default();
        let dir = factions();

        let mut wounded = record(8);
        wounded
            .health
            .conditions
            .push(Condition::new("gunshot", ConditionKind::Injury));
        wounded
            .health
            .conditions
            .push(Condition::new("old scar", ConditionKind::Injury).permanent());
        wounded
            .health
            .conditions
            .push(Condition::new("blood loss", ConditionKind::BloodLoss));
        wounded
            .health
            .conditions
            .push(Condition::new("flu", ConditionKind::Ailment { tendable: true, sickness: true }));

        pool.add_veteran(wounded, 0, &settings, &dir, &mut NoopBridge);
        let stored = &pool.group(FactionId(1)).unwrap().records[0];
        let ids: Vec<&str> = stored.health.conditions.iter().map(|c| c.id.0.as_str()).collect();
        // Plain capture: injuries and blood loss gone, sickness kept
        assert_eq!(ids, vec!["old scar", "flu"]);
    }

    #[test]
    fn test_hidden_faction_rejected() {
        let mut pool = VeteranPool::new();
        let settings = PoolSettings::default();
        let mut dir = factions();
        let mut hidden = FactionInfo::new("Shadow", TechLevel::Spacer);
        hidden.hidden = true;
        dir.insert(FactionId(9), hidden);

        let mut r = record(3);
        r.faction = Some(FactionId(9));
        assert_eq!(
            pool.add_veteran(r, 0, &settings, &dir, &mut NoopBridge),
            CaptureOutcome::Rejected(RejectReason::Invalid)
        );
    }

    #[test]
    fn test_reset_keeps_notes_and_pins() {
        let mut pool = VeteranPool::new();
        let settings = PoolSettings::default();
        let dir = factions();
        pool.add_veteran(record(1), 0, &settings, &dir, &mut NoopBridge);
        pool.pin(ActorId(50));
        pool.set_note(ActorId(1), "sniper, lost an eye at the mill");

        pool.reset();
        assert_eq!(pool.total_retained(), 0);
        assert!(pool.known_ids().is_empty());
        assert!(pool.is_pinned(ActorId(50)));
        assert_eq!(pool.note(ActorId(1)), Some("sniper, lost an eye at the mill"));
    }

    #[test]
    fn test_blank_note_removes_entry() {
        let mut pool = VeteranPool::new();
        pool.set_note(ActorId(1), "keep");
        pool.set_note(ActorId(1), "   ");
        assert_eq!(pool.note(ActorId(1)), None);
    }
}
