//! Yearly aging cycle
//!
//! Once per in-simulation year the pool ages every resting record, tries a
//! skill level-up, runs the four mutation passes and rolls old-age
//! mortality. Records checked out or spawned are left alone; dead ones are
//! purged. Groups are walked in reverse index order so removal is safe.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::actor::{ActorId, FactionDirectory, Record, TechLevel, TICKS_PER_DAY, TICKS_PER_YEAR};
use crate::catalog::Catalog;
use crate::pool::{clean_health, VeteranPool};
use crate::settings::PoolSettings;
use crate::systems::mutation;

/// No retirement below this biological age.
pub const MORTALITY_AGE_THRESHOLD: i64 = 60;

/// Flat yearly retirement chance above the threshold, before multipliers.
pub const BASE_MORTALITY_CHANCE: f32 = 0.05;

/// Biological drift below this means external aging is stalled and the
/// cycle advances ages itself. One day of slack.
const AGE_DRIFT_TOLERANCE: i64 = TICKS_PER_DAY as i64;

/// What one yearly cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub level_ups: u32,
    pub deaths: u32,
    pub forced_agings: u32,
    pub mutations: u32,
    pub purged: u32,
}

/// Yearly retirement chance for a record of this age and tech tier.
///
/// Zero below the age threshold. The tech and settings multipliers only
/// apply when the record still has a faction.
pub fn mortality_chance(age_years: i64, tech: Option<TechLevel>, settings: &PoolSettings) -> f32 {
    if age_years < MORTALITY_AGE_THRESHOLD {
        return 0.0;
    }
    let mut chance = BASE_MORTALITY_CHANCE;
    if let Some(tech) = tech {
        chance *= tech.mortality_multiplier();
        chance *= settings.death_chance_multiplier;
    }
    chance
}

/// One weighted-random skill level-up; heavier passion weighs heavier.
/// Returns false when no skill is eligible.
fn try_skill_level_up(record: &mut Record, rng: &mut impl Rng) -> bool {
    let eligible: Vec<usize> = record
        .skills
        .iter()
        .enumerate()
        .filter(|(_, s)| s.can_level_up())
        .map(|(i, _)| i)
        .collect();
    if eligible.is_empty() {
        return false;
    }
    let Ok(&chosen) = eligible.choose_weighted(rng, |&i| record.skills[i].passion.weight()) else {
        return false;
    };
    record.skills[chosen].level_up();
    true
}

fn purge(
    id: ActorId,
    all_ids: &mut HashSet<ActorId>,
    add_ticks: &mut HashMap<ActorId, u64>,
    on_mission: &mut HashSet<ActorId>,
    bio_age_snapshots: &mut HashMap<ActorId, i64>,
) {
    all_ids.remove(&id);
    add_ticks.remove(&id);
    on_mission.remove(&id);
    bio_age_snapshots.remove(&id);
}

/// Run the yearly cycle over every group.
pub fn run_yearly_cycle(
    pool: &mut VeteranPool,
    settings: &PoolSettings,
    factions: &FactionDirectory,
    catalog: &Catalog,
    rng: &mut impl Rng,
) -> CycleReport {
    let mut report = CycleReport::default();

    let VeteranPool {
        groups,
        all_ids,
        add_ticks,
        on_mission,
        bio_age_snapshots,
        ..
    } = pool;

    for group in groups.values_mut() {
        for i in (0..group.records.len()).rev() {
            if group.records[i].health.dead || group.records[i].destroyed {
                let record = group.records.remove(i);
                purge(record.id, all_ids, add_ticks, on_mission, bio_age_snapshots);
                report.purged += 1;
                continue;
            }

            let id = group.records[i].id;
            // Alive but out in the world: no aging, no mutation
            if on_mission.contains(&id) || group.records[i].spawned {
                continue;
            }

            let dies = {
                let record = &mut group.records[i];

                clean_health(record, true);

                // Mortality is judged on the age the record entered the
                // cycle with; crossing the threshold mid-cycle defers the
                // first roll to next year
                let age_at_entry = record.age.biological_years();

                // Force-advance ages when external aging stalled this year
                if let Some(&last_known) = bio_age_snapshots.get(&id) {
                    if record.age.biological_ticks <= last_known + AGE_DRIFT_TOLERANCE {
                        let rate = settings.aging_rate.max(0.01);
                        record.age.chronological_ticks += TICKS_PER_YEAR as i64;
                        record.age.biological_ticks += (TICKS_PER_YEAR as f32 * rate) as i64;
                        report.forced_agings += 1;
                        debug!(id = id.0, name = %record.name, "aged manually; external aging stalled");
                    }
                }
                bio_age_snapshots.insert(id, record.age.biological_ticks);

                if try_skill_level_up(record, rng) {
                    report.level_ups += 1;
                }

                // Independent passes; one failing never blocks the rest
                match mutation::implant_pass(record, all_ids, factions, catalog, settings, rng) {
                    Ok(true) => report.mutations += 1,
                    Ok(false) => {}
                    Err(err) => warn!(id = id.0, %err, "implant pass failed"),
                }
                match mutation::gene_pass(record, all_ids, factions, catalog, settings, rng) {
                    Ok(true) => report.mutations += 1,
                    Ok(false) => {}
                    Err(err) => warn!(id = id.0, %err, "gene pass failed"),
                }
                match mutation::anomaly_pass(record, all_ids, factions, catalog, settings, rng) {
                    Ok(true) => report.mutations += 1,
                    Ok(false) => {}
                    Err(err) => warn!(id = id.0, %err, "anomaly pass failed"),
                }
                match mutation::age_disease_pass(record, all_ids, factions, catalog, settings, rng)
                {
                    Ok(true) => report.mutations += 1,
                    Ok(false) => {}
                    Err(err) => warn!(id = id.0, %err, "age disease pass failed"),
                }

                let tech = record
                    .faction
                    .and_then(|f| factions.get(f))
                    .map(|info| info.tech_level);
                let chance = mortality_chance(age_at_entry, tech, settings);
                chance > 0.0 && rng.gen::<f32>() < chance
            };

            if dies {
                let mut record = group.records.remove(i);
                record.health.kill();
                purge(id, all_ids, add_ticks, on_mission, bio_age_snapshots);
                report.deaths += 1;
                debug!(id = id.0, name = %record.name, "veteran died of old age");
            }
        }
    }

    if report.level_ups > 0 || report.deaths > 0 {
        info!(
            level_ups = report.level_ups,
            deaths = report.deaths,
            "yearly veteran report"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{AgeTracker, FactionId, FactionInfo, Passion, Skill};
    use crate::hooks::NoopBridge;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn factions(tech: TechLevel) -> FactionDirectory {
        let mut dir = FactionDirectory::new();
        dir.insert(FactionId(1), FactionInfo::new("Outlanders", tech));
        dir
    }

    fn pool_with(record: Record, dir: &FactionDirectory) -> VeteranPool {
        let mut pool = VeteranPool::new();
        let settings = PoolSettings::default();
        pool.add_veteran(record, 0, &settings, dir, &mut NoopBridge);
        pool
    }

    #[test]
    fn test_mortality_chance_below_threshold_is_zero() {
        let settings = PoolSettings::default();
        for tech in [TechLevel::Animal, TechLevel::Industrial, TechLevel::Archotech] {
            assert_eq!(mortality_chance(59, Some(tech), &settings), 0.0);
        }
    }

    #[test]
    fn test_mortality_chance_scales_with_tech() {
        let settings = PoolSettings::default();
        let industrial = mortality_chance(70, Some(TechLevel::Industrial), &settings);
        assert!((industrial - 0.025).abs() < 1e-6);
        let factionless = mortality_chance(70, None, &settings);
        assert!((factionless - BASE_MORTALITY_CHANCE).abs() < 1e-6);
    }

    #[test]
    fn test_mortality_statistical_frequency() {
        // Industrial tech halves the base 5%; expect ~2.5% over many draws
        let settings = PoolSettings::default();
        let chance = mortality_chance(70, Some(TechLevel::Industrial), &settings);
        let mut rng = StdRng::seed_from_u64(99);
        let trials = 100_000;
        let deaths = (0..trials).filter(|_| rng.gen::<f32>() < chance).count();
        let observed = deaths as f32 / trials as f32;
        assert!((observed - 0.025).abs() < 0.005, "observed {observed}");
    }

    #[test]
    fn test_cycle_ages_record_below_threshold_without_death() {
        let dir = factions(TechLevel::Industrial);
        let mut record = Record::new(ActorId(1), "Elder", FactionId(1));
        record.age = AgeTracker::from_years(59);
        let mut pool = pool_with(record, &dir);

        let mut rng = StdRng::seed_from_u64(2);
        let report = run_yearly_cycle(
            &mut pool,
            &PoolSettings::default(),
            &dir,
            Catalog::builtin(),
            &mut rng,
        );

        assert_eq!(report.deaths, 0);
        assert_eq!(report.forced_agings, 1);
        let stored = &pool.group(FactionId(1)).unwrap().records[0];
        assert_eq!(stored.age.biological_years(), 60);
        assert_eq!(
            stored.age.chronological_ticks,
            AgeTracker::from_years(59).chronological_ticks + TICKS_PER_YEAR as i64
        );
    }

    #[test]
    fn test_cycle_skips_records_on_mission() {
        let dir = factions(TechLevel::Industrial);
        let mut record = Record::new(ActorId(1), "Scout", FactionId(1));
        record.age = AgeTracker::from_years(40);
        let mut pool = pool_with(record, &dir);
        pool.on_mission.insert(ActorId(1));

        let mut rng = StdRng::seed_from_u64(2);
        run_yearly_cycle(&mut pool, &PoolSettings::default(), &dir, Catalog::builtin(), &mut rng);

        let stored = &pool.group(FactionId(1)).unwrap().records[0];
        assert_eq!(stored.age.biological_years(), 40);
    }

    #[test]
    fn test_cycle_purges_dead_records() {
        let dir = factions(TechLevel::Industrial);
        let record = Record::new(ActorId(1), "Corpse", FactionId(1));
        let mut pool = pool_with(record, &dir);
        pool.groups.get_mut(&FactionId(1)).unwrap().records[0].health.kill();
        pool.on_mission.insert(ActorId(1));

        let mut rng = StdRng::seed_from_u64(2);
        let report =
            run_yearly_cycle(&mut pool, &PoolSettings::default(), &dir, Catalog::builtin(), &mut rng);

        assert_eq!(report.purged, 1);
        assert_eq!(pool.total_retained(), 0);
        assert!(!pool.is_known(ActorId(1)));
        assert!(!pool.is_on_mission(ActorId(1)));
        assert!(pool.captured_at(ActorId(1)).is_none());
    }

    #[test]
    fn test_certain_mortality_retires_record() {
        let dir = factions(TechLevel::Medieval);
        let mut record = Record::new(ActorId(1), "Ancient", FactionId(1));
        record.age = AgeTracker::from_years(90);
        let mut pool = pool_with(record, &dir);

        // 0.05 * 1.0 (medieval) * 20.0 = certain death
        let mut settings = PoolSettings::default();
        settings.death_chance_multiplier = 20.0;

        let mut rng = StdRng::seed_from_u64(2);
        let report = run_yearly_cycle(&mut pool, &settings, &dir, Catalog::builtin(), &mut rng);

        assert_eq!(report.deaths, 1);
        assert_eq!(pool.total_retained(), 0);
        assert!(!pool.is_known(ActorId(1)));
    }

    #[test]
    fn test_skill_level_up_prefers_eligible_skills() {
        let mut record = Record::new(ActorId(1), "Learner", FactionId(1));
        record.skills.push(Skill::new("shooting", 20, Passion::Major)); // capped
        record.skills.push(Skill::new("cooking", 4, Passion::None));
        let mut rng = StdRng::seed_from_u64(8);

        assert!(try_skill_level_up(&mut record, &mut rng));
        assert_eq!(record.skills[0].level, 20);
        assert_eq!(record.skills[1].level, 5);
        assert_eq!(
            record.skills[1].xp_since_last_level,
            record.skills[1].xp_required_for_level_up() / 2.0
        );
    }

    #[test]
    fn test_no_eligible_skill_is_noop() {
        let mut record = Record::new(ActorId(1), "Static", FactionId(1));
        let mut disabled = Skill::new("artistic", 3, Passion::Minor);
        disabled.disabled = true;
        record.skills.push(disabled);
        let mut rng = StdRng::seed_from_u64(8);
        assert!(!try_skill_level_up(&mut record, &mut rng));
    }

    #[test]
    fn test_snapshot_prevents_double_aging() {
        // External aging already advanced the record this year; the cycle
        // must not add its own year on top.
        let dir = factions(TechLevel::Industrial);
        let mut record = Record::new(ActorId(1), "Aged", FactionId(1));
        record.age = AgeTracker::from_years(30);
        let mut pool = pool_with(record, &dir);

        let externally_aged = AgeTracker::from_years(31).biological_ticks;
        pool.groups.get_mut(&FactionId(1)).unwrap().records[0]
            .age
            .biological_ticks = externally_aged;

        let mut rng = StdRng::seed_from_u64(2);
        let report = run_yearly_cycle(
            &mut pool,
            &PoolSettings::default(),
            &dir,
            Catalog::builtin(),
            &mut rng,
        );

        assert_eq!(report.forced_agings, 0);
        let stored = &pool.group(FactionId(1)).unwrap().records[0];
        assert_eq!(stored.age.biological_ticks, externally_aged);
        // Snapshot caught up regardless of who aged the record
        assert_eq!(pool.bio_age_snapshots[&ActorId(1)], externally_aged);
    }

    #[test]
    fn test_empty_pool_cycle_is_noop() {
        let dir = factions(TechLevel::Industrial);
        let mut pool = VeteranPool::new();
        let mut rng = StdRng::seed_from_u64(2);
        let report = run_yearly_cycle(
            &mut pool,
            &PoolSettings::default(),
            &dir,
            Catalog::builtin(),
            &mut rng,
        );
        assert_eq!(report, CycleReport::default());
    }
}
