//! Dispatcher
//!
//! Serves generation requests from the pool: scans the faction's group in
//! insertion order and checks out the first record that survives the whole
//! filter chain. No scoring - the boolean chain is the match.

use tracing::debug;

use crate::actor::{
    FactionId, Gender, Holding, KindId, MutantKind, Record, StageMask, TraitId, XenotypeId,
    TICKS_PER_DAY,
};
use crate::hooks::HostBridge;
use crate::pool::VeteranPool;
use crate::settings::PoolSettings;

/// A request for one actor, as the host's generator describes it.
///
/// The acceptance predicate is an ordinary field; hosts set it directly
/// instead of hiding it behind reflection.
pub struct GenerationRequest {
    pub faction: FactionId,
    /// Required race / body type.
    pub kind: Option<KindId>,
    pub fixed_gender: Option<Gender>,
    /// Required biological age in years; matched within one year.
    pub fixed_biological_age: Option<i64>,
    pub fixed_last_name: Option<String>,
    pub fixed_birth_name: Option<String>,
    pub allowed_stages: StageMask,
    pub prohibited_traits: Vec<TraitId>,
    pub forced_xenotype: Option<XenotypeId>,
    pub forced_mutant: Option<MutantKind>,
    /// Host insists on a brand-new actor; the pool never serves these.
    pub force_new: bool,
    pub can_generate_relations: bool,
    /// External acceptance predicate supplied by other host systems.
    pub validator: Option<Box<dyn Fn(&Record) -> bool>>,
}

impl GenerationRequest {
    pub fn for_faction(faction: FactionId) -> Self {
        Self {
            faction,
            kind: None,
            fixed_gender: None,
            fixed_biological_age: None,
            fixed_last_name: None,
            fixed_birth_name: None,
            allowed_stages: StageMask::default(),
            prohibited_traits: Vec::new(),
            forced_xenotype: None,
            forced_mutant: None,
            force_new: false,
            can_generate_relations: true,
            validator: None,
        }
    }
}

/// Why a record cannot leave storage right now, if it cannot.
fn availability_block(record: &Record) -> Option<&'static str> {
    if let Some(holding) = record.holding {
        return Some(match holding {
            Holding::Building => "building",
            Holding::Container => "container",
            Holding::Caravan => "caravan",
            Holding::TransportPod => "transport pod",
        });
    }
    if record.quest_reserved {
        return Some("quest reservation");
    }
    None
}

fn matches_request(
    record: &Record,
    request: &GenerationRequest,
    validator: Option<&(dyn Fn(&Record) -> bool)>,
) -> bool {
    if let Some(kind) = &request.kind {
        if &record.kind != kind {
            return false;
        }
    }
    if let Some(gender) = request.fixed_gender {
        if record.gender != gender {
            return false;
        }
    }
    if let Some(age) = request.fixed_biological_age {
        if (record.age.biological_years() - age).abs() > 1 {
            return false;
        }
    }
    // Scripted characters with fixed names are never served from the pool
    if request.fixed_last_name.is_some() || request.fixed_birth_name.is_some() {
        return false;
    }
    if !request.allowed_stages.allows(record.age.stage()) {
        return false;
    }
    if request.prohibited_traits.iter().any(|t| record.has_trait(t)) {
        return false;
    }
    if let Some(xenotype) = &request.forced_xenotype {
        match &record.genes {
            Some(genes) if &genes.xenotype == xenotype => {}
            _ => return false,
        }
    }
    if let Some(mutant) = &request.forced_mutant {
        if record.mutant.as_ref() != Some(mutant) {
            return false;
        }
    }
    if let Some(validator) = validator {
        if !validator(record) {
            return false;
        }
    }
    true
}

/// Find and check out the first matching record for `request`.
///
/// `None` is the normal no-match answer; the caller falls back to ordinary
/// generation. A returned record is marked issued-this-tick and on-mission,
/// and its cooldown stamp is cleared.
pub fn try_get_veteran(
    pool: &mut VeteranPool,
    request: &GenerationRequest,
    now: u64,
    settings: &PoolSettings,
    bridge: &mut dyn HostBridge,
) -> Option<Record> {
    if pool.last_issue_tick != Some(now) {
        pool.issued_this_tick.clear();
        pool.last_issue_tick = Some(now);
    }

    // Resolve the predicate once, not per candidate
    let validator = request.validator.as_deref();
    let cooldown = settings.recall_cooldown_days * TICKS_PER_DAY;

    let group = pool.groups.get(&request.faction)?;
    let index = group.records.iter().position(|r| {
        if !r.is_alive() || r.destroyed || r.spawned {
            return false;
        }
        if pool.issued_this_tick.contains(&r.id) || pool.on_mission.contains(&r.id) {
            return false;
        }
        if let Some(&added) = pool.add_ticks.get(&r.id) {
            if now < added + cooldown {
                return false;
            }
        }
        if let Some(reason) = availability_block(r) {
            debug!(id = r.id.0, name = %r.name, reason, "candidate skipped");
            return false;
        }
        matches_request(r, request, validator)
    })?;

    let candidate = pool.groups.get(&request.faction)?.records[index].clone();
    let id = candidate.id;

    bridge.release(&candidate);
    pool.issued_this_tick.insert(id);
    pool.add_ticks.remove(&id);
    pool.on_mission.insert(id);

    let dormant = bridge.is_dormant(id);
    debug!(
        id = id.0,
        name = %candidate.name,
        from = if dormant { "deep freeze" } else { "active pool" },
        on_mission = pool.on_mission.len(),
        issued_this_tick = pool.issued_this_tick.len(),
        "veteran dispatched"
    );

    Some(candidate)
}
