//! Yearly mutation passes
//!
//! Four independent probabilistic passes run over each resting record once
//! per cycle: prosthetic surgery, gene acquisition, anomaly mutation and
//! age-related disease. Every pass gates on the identity still being
//! pool-known and its faction present and non-hidden, then on its own tech
//! tier, content availability and chance roll. Candidates come from the
//! catalog; nothing is retried on failure.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::actor::{
    ActorId, Condition, ConditionId, ConditionKind, FactionDirectory, FactionInfo, PartId, Record,
    TechLevel,
};
use crate::catalog::{Catalog, ProstheticDef};
use crate::error::PoolError;
use crate::settings::PoolSettings;

const IMPLANT_UPGRADE_CHANCE: f32 = 0.10;
const GENE_CHANCE: f32 = 0.10;
const ARCHITE_GENE_CHANCE: f32 = 0.05;
const ANOMALY_CHANCE: f32 = 0.05;
const AGE_DISEASE_CHANCE: f32 = 0.05;

/// Minimum biological age for age-related disease.
pub const DISEASE_AGE_THRESHOLD: i64 = 60;

fn faction_info<'a>(
    record: &Record,
    all_ids: &HashSet<ActorId>,
    factions: &'a FactionDirectory,
) -> Option<&'a FactionInfo> {
    if !all_ids.contains(&record.id) {
        return None;
    }
    let info = factions.get(record.faction?)?;
    if info.hidden {
        return None;
    }
    Some(info)
}

fn installed(condition: &ConditionId, part: PartId) -> Condition {
    Condition {
        id: condition.clone(),
        kind: ConditionKind::Implant,
        part: Some(part),
        permanent: true,
        allows_dormancy: true,
    }
}

/// Random catalog prosthetic for `part` the faction can produce.
fn prosthetic_for<'a>(
    catalog: &'a Catalog,
    part: &PartId,
    tech: TechLevel,
    rng: &mut impl Rng,
) -> Option<&'a ProstheticDef> {
    let applicable: Vec<&ProstheticDef> = catalog
        .prosthetics
        .iter()
        .filter(|d| !d.anomaly && d.tech <= tech && d.parts.contains(part))
        .collect();
    applicable.choose(rng).copied()
}

/// Replace lost body parts and, at industrial tech and above, maybe install
/// one upgrade on a healthy part. At most one upgrade a year.
pub fn implant_pass(
    record: &mut Record,
    all_ids: &HashSet<ActorId>,
    factions: &FactionDirectory,
    catalog: &Catalog,
    settings: &PoolSettings,
    rng: &mut impl Rng,
) -> Result<bool, PoolError> {
    let Some(info) = faction_info(record, all_ids, factions) else {
        return Ok(false);
    };
    let tech = info.tech_level;
    let mut changed = false;

    let missing: Vec<PartId> = record.health.missing_parts.clone();
    for part in missing {
        if let Some(def) = prosthetic_for(catalog, &part, tech, rng) {
            let condition = def.condition.clone();
            record.health.restore_part(&part);
            record.health.add_condition(installed(&condition, part))?;
            changed = true;
        }
    }

    if tech >= TechLevel::Industrial
        && rng.gen::<f32>() < IMPLANT_UPGRADE_CHANCE * settings.implant_chance_multiplier
    {
        let mut candidates: Vec<PartId> = record
            .body_parts
            .iter()
            .filter(|p| !record.health.part_is_missing(p) && !record.health.has_installed_part(p))
            .cloned()
            .collect();
        candidates.shuffle(rng);

        for part in candidates {
            if let Some(def) = prosthetic_for(catalog, &part, tech, rng) {
                let condition = def.condition.clone();
                record.health.add_condition(installed(&condition, part))?;
                changed = true;
                // One upgrade a year keeps them from turning cyborg overnight
                break;
            }
        }
    }

    if changed {
        debug!(id = record.id.0, name = %record.name, "veteran received implants");
    }
    Ok(changed)
}

/// Gene acquisition for spacer-tech factions and above. Ultra tech may roll
/// an archite-grade gene; otherwise a normal one.
pub fn gene_pass(
    record: &mut Record,
    all_ids: &HashSet<ActorId>,
    factions: &FactionDirectory,
    catalog: &Catalog,
    settings: &PoolSettings,
    rng: &mut impl Rng,
) -> Result<bool, PoolError> {
    if !catalog.biotech_active || record.genes.is_none() {
        return Ok(false);
    }
    let Some(info) = faction_info(record, all_ids, factions) else {
        return Ok(false);
    };
    let tech = info.tech_level;
    if tech < TechLevel::Spacer {
        return Ok(false);
    }

    let gets_archite = tech >= TechLevel::Ultra
        && rng.gen::<f32>() < ARCHITE_GENE_CHANCE * settings.gene_chance_multiplier;
    let gets_normal =
        !gets_archite && rng.gen::<f32>() < GENE_CHANCE * settings.gene_chance_multiplier;
    if !gets_archite && !gets_normal {
        return Ok(false);
    }

    let Some(gene_set) = record.genes.as_mut() else {
        return Ok(false);
    };
    let available: Vec<_> = catalog
        .genes
        .iter()
        .filter(|g| g.archite == gets_archite && !gene_set.genes.contains(&g.id))
        .collect();
    let Some(new_gene) = available.choose(rng) else {
        return Ok(false);
    };

    gene_set.genes.insert(new_gene.id.clone());
    debug!(
        id = record.id.0,
        name = %record.name,
        gene = %new_gene.id.0,
        archite = gets_archite,
        "veteran gained a gene"
    );
    Ok(true)
}

/// Anomaly contact for pre-industrial factions: a ritual mutation or a
/// surgical artifact, fifty-fifty.
pub fn anomaly_pass(
    record: &mut Record,
    all_ids: &HashSet<ActorId>,
    factions: &FactionDirectory,
    catalog: &Catalog,
    settings: &PoolSettings,
    rng: &mut impl Rng,
) -> Result<bool, PoolError> {
    if !catalog.anomaly_active {
        return Ok(false);
    }
    let Some(info) = faction_info(record, all_ids, factions) else {
        return Ok(false);
    };
    // Tribes and medieval societies only
    if info.tech_level >= TechLevel::Industrial {
        return Ok(false);
    }
    if rng.gen::<f32>() >= ANOMALY_CHANCE * settings.anomaly_chance_multiplier {
        return Ok(false);
    }

    let artifacts: Vec<&ProstheticDef> =
        catalog.prosthetics.iter().filter(|d| d.anomaly).collect();
    let use_ritual = rng.gen::<bool>() || artifacts.is_empty();

    if use_ritual {
        let Some(def) = catalog.ritual_mutations.choose(rng) else {
            return Ok(false);
        };
        match &def.attach_to {
            None => {
                if def.once && record.health.has_condition(&def.condition) {
                    return Ok(false);
                }
                record.health.add_condition(Condition {
                    id: def.condition.clone(),
                    kind: ConditionKind::Ailment { tendable: false, sickness: false },
                    part: None,
                    permanent: true,
                    allows_dormancy: true,
                })?;
            }
            Some(attach) => {
                let Some(part) = attach.iter().find(|p| {
                    record.body_parts.contains(p)
                        && !record.health.part_is_missing(p)
                        && !record.health.has_installed_part(p)
                }) else {
                    return Ok(false);
                };
                let part = part.clone();
                record.health.add_condition(installed(&def.condition, part))?;
            }
        }
        debug!(id = record.id.0, name = %record.name, ritual = %def.condition.0, "anomaly ritual mutation");
        Ok(true)
    } else {
        let Some(recipe) = artifacts.choose(rng) else {
            return Ok(false);
        };
        let Some(part) = recipe.parts.iter().find(|p| {
            record.body_parts.contains(p)
                && !record.health.part_is_missing(p)
                && !record.health.has_installed_part(p)
        }) else {
            return Ok(false);
        };
        let part = part.clone();
        record.health.add_condition(installed(&recipe.condition, part))?;
        debug!(id = record.id.0, name = %record.name, artifact = %recipe.condition.0, "anomaly artifact installed");
        Ok(true)
    }
}

/// Age-related disease for records past the age threshold, scaled by the
/// faction's tech tier.
pub fn age_disease_pass(
    record: &mut Record,
    all_ids: &HashSet<ActorId>,
    factions: &FactionDirectory,
    catalog: &Catalog,
    settings: &PoolSettings,
    rng: &mut impl Rng,
) -> Result<bool, PoolError> {
    if record.age.biological_years() < DISEASE_AGE_THRESHOLD {
        return Ok(false);
    }
    let Some(info) = faction_info(record, all_ids, factions) else {
        return Ok(false);
    };
    let chance =
        AGE_DISEASE_CHANCE * info.tech_level.disease_multiplier() * settings.disease_chance_multiplier;
    if rng.gen::<f32>() >= chance {
        return Ok(false);
    }

    let candidates: Vec<_> = catalog
        .age_diseases
        .iter()
        .filter(|d| {
            !record.health.has_condition(&d.condition)
                && d.part.as_ref().map_or(true, |p| {
                    record.body_parts.contains(p) && !record.health.part_is_missing(p)
                })
        })
        .collect();
    let Some(def) = candidates.choose(rng) else {
        return Ok(false);
    };

    record.health.add_condition(Condition {
        id: def.condition.clone(),
        kind: ConditionKind::Ailment { tendable: false, sickness: false },
        part: def.part.clone(),
        permanent: false,
        allows_dormancy: false,
    })?;
    debug!(id = record.id.0, name = %record.name, disease = %def.condition.0, "age disease acquired");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{AgeTracker, FactionId, GeneSet, XenotypeId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup(tech: TechLevel) -> (Record, HashSet<ActorId>, FactionDirectory) {
        let record = Record::new(ActorId(1), "Subject", FactionId(1));
        let mut all_ids = HashSet::new();
        all_ids.insert(ActorId(1));
        let mut factions = FactionDirectory::new();
        factions.insert(FactionId(1), FactionInfo::new("Faction", tech));
        (record, all_ids, factions)
    }

    #[test]
    fn test_implant_pass_heals_missing_parts() {
        let (mut record, all_ids, factions) = setup(TechLevel::Spacer);
        record.health.missing_parts.push(PartId("left leg".to_string()));
        let mut settings = PoolSettings::default();
        settings.implant_chance_multiplier = 0.0; // isolate the healing step
        let mut rng = StdRng::seed_from_u64(7);

        let changed = implant_pass(
            &mut record,
            &all_ids,
            &factions,
            Catalog::builtin(),
            &settings,
            &mut rng,
        )
        .unwrap();

        assert!(changed);
        assert!(record.health.missing_parts.is_empty());
        assert!(record.health.has_installed_part(&PartId("left leg".to_string())));
    }

    #[test]
    fn test_implant_pass_skips_unknown_identity() {
        let (mut record, _, factions) = setup(TechLevel::Spacer);
        record.health.missing_parts.push(PartId("left leg".to_string()));
        let empty = HashSet::new();
        let mut rng = StdRng::seed_from_u64(7);

        let changed = implant_pass(
            &mut record,
            &empty,
            &factions,
            Catalog::builtin(),
            &PoolSettings::default(),
            &mut rng,
        )
        .unwrap();
        assert!(!changed);
        assert_eq!(record.health.missing_parts.len(), 1);
    }

    #[test]
    fn test_gene_pass_needs_spacer_tech() {
        let (mut record, all_ids, factions) = setup(TechLevel::Medieval);
        record.genes = Some(GeneSet {
            xenotype: XenotypeId("baseliner".to_string()),
            genes: Default::default(),
        });
        let mut settings = PoolSettings::default();
        settings.gene_chance_multiplier = 100.0; // force the roll
        let mut rng = StdRng::seed_from_u64(1);

        let changed = gene_pass(
            &mut record,
            &all_ids,
            &factions,
            Catalog::builtin(),
            &settings,
            &mut rng,
        )
        .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_gene_pass_adds_new_gene() {
        let (mut record, all_ids, factions) = setup(TechLevel::Spacer);
        record.genes = Some(GeneSet {
            xenotype: XenotypeId("baseliner".to_string()),
            genes: Default::default(),
        });
        let mut settings = PoolSettings::default();
        settings.gene_chance_multiplier = 100.0;
        let mut rng = StdRng::seed_from_u64(1);

        let changed = gene_pass(
            &mut record,
            &all_ids,
            &factions,
            Catalog::builtin(),
            &settings,
            &mut rng,
        )
        .unwrap();
        assert!(changed);
        let genes = &record.genes.as_ref().unwrap().genes;
        assert_eq!(genes.len(), 1);
        // Spacer tech never rolls archite genes
        let catalog = Catalog::builtin();
        let gained = genes.iter().next().unwrap();
        assert!(catalog.genes.iter().any(|g| &g.id == gained && !g.archite));
    }

    #[test]
    fn test_anomaly_pass_industrial_and_up_exempt() {
        let (mut record, all_ids, factions) = setup(TechLevel::Industrial);
        let mut settings = PoolSettings::default();
        settings.anomaly_chance_multiplier = 100.0;
        let mut rng = StdRng::seed_from_u64(3);

        let changed = anomaly_pass(
            &mut record,
            &all_ids,
            &factions,
            Catalog::builtin(),
            &settings,
            &mut rng,
        )
        .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_anomaly_pass_mutates_tribals() {
        let (mut record, all_ids, factions) = setup(TechLevel::Neolithic);
        let mut settings = PoolSettings::default();
        settings.anomaly_chance_multiplier = 100.0;
        let mut rng = StdRng::seed_from_u64(3);

        let changed = anomaly_pass(
            &mut record,
            &all_ids,
            &factions,
            Catalog::builtin(),
            &settings,
            &mut rng,
        )
        .unwrap();
        assert!(changed);
        assert_eq!(record.health.conditions.len(), 1);
    }

    #[test]
    fn test_age_disease_pass_respects_threshold() {
        let (mut record, all_ids, factions) = setup(TechLevel::Medieval);
        record.age = AgeTracker::from_years(59);
        let mut settings = PoolSettings::default();
        settings.disease_chance_multiplier = 100.0;
        let mut rng = StdRng::seed_from_u64(5);

        let changed = age_disease_pass(
            &mut record,
            &all_ids,
            &factions,
            Catalog::builtin(),
            &settings,
            &mut rng,
        )
        .unwrap();
        assert!(!changed);

        record.age = AgeTracker::from_years(70);
        let changed = age_disease_pass(
            &mut record,
            &all_ids,
            &factions,
            Catalog::builtin(),
            &settings,
            &mut rng,
        )
        .unwrap();
        assert!(changed);
        assert_eq!(record.health.conditions.len(), 1);
    }

    #[test]
    fn test_age_disease_not_duplicated() {
        let (mut record, all_ids, factions) = setup(TechLevel::Medieval);
        record.age = AgeTracker::from_years(80);
        let mut settings = PoolSettings::default();
        settings.disease_chance_multiplier = 100.0;
        let mut rng = StdRng::seed_from_u64(5);
        let catalog = Catalog::builtin();

        // Exhaust the candidate list; every acquired disease stays unique
        for _ in 0..50 {
            let _ = age_disease_pass(&mut record, &all_ids, &factions, catalog, &settings, &mut rng);
        }
        let mut ids: Vec<_> = record.health.conditions.iter().map(|c| c.id.0.clone()).collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(before, ids.len());
        assert!(before <= catalog.age_diseases.len());
    }
}
