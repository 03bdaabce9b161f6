//! Data-driven mutation content
//!
//! The yearly mutation passes never hardcode what they install: prosthetics,
//! genes, ritual mutations and age diseases are all looked up here, so
//! host-side content packs can extend the pool's behavior by extending the
//! catalog. `Catalog::builtin()` carries a default set.

use once_cell::sync::Lazy;

use crate::actor::{ConditionId, GeneId, PartId, TechLevel};

/// A surgically installable part replacement or implant.
#[derive(Debug, Clone)]
pub struct ProstheticDef {
    pub condition: ConditionId,
    /// Body parts this can be installed on.
    pub parts: Vec<PartId>,
    /// Minimum faction tech tier able to produce it.
    pub tech: TechLevel,
    /// Sourced from anomaly content; only the anomaly pass installs these.
    pub anomaly: bool,
}

#[derive(Debug, Clone)]
pub struct GeneDef {
    pub id: GeneId,
    /// Archite-grade genes only appear for the highest tech tiers.
    pub archite: bool,
}

/// A ritual-granted anomaly mutation with no surgical recipe.
#[derive(Debug, Clone)]
pub struct RitualMutationDef {
    pub condition: ConditionId,
    /// Parts the mutation can attach to; `None` affects the whole body.
    pub attach_to: Option<Vec<PartId>>,
    /// Never granted twice to the same actor.
    pub once: bool,
}

/// An affliction the old may acquire, applied to a fixed body part.
#[derive(Debug, Clone)]
pub struct AgeDiseaseDef {
    pub condition: ConditionId,
    pub part: Option<PartId>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub prosthetics: Vec<ProstheticDef>,
    pub genes: Vec<GeneDef>,
    pub ritual_mutations: Vec<RitualMutationDef>,
    pub age_diseases: Vec<AgeDiseaseDef>,
    /// Biotech-style gene content is loaded on the host.
    pub biotech_active: bool,
    /// Anomaly-style mutation content is loaded on the host.
    pub anomaly_active: bool,
}

impl Catalog {
    /// The built-in content set.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }
}

fn part(name: &str) -> PartId {
    PartId(name.to_string())
}

fn parts(names: &[&str]) -> Vec<PartId> {
    names.iter().map(|n| part(n)).collect()
}

fn prosthetic(condition: &str, on: &[&str], tech: TechLevel) -> ProstheticDef {
    ProstheticDef {
        condition: ConditionId(condition.to_string()),
        parts: parts(on),
        tech,
        anomaly: false,
    }
}

static BUILTIN: Lazy<Catalog> = Lazy::new(|| Catalog {
    prosthetics: vec![
        // Tribal and medieval replacements
        prosthetic("peg leg", &["left leg", "right leg"], TechLevel::Neolithic),
        prosthetic("wooden hand", &["left hand", "right hand"], TechLevel::Neolithic),
        prosthetic("denture", &["jaw"], TechLevel::Medieval),
        // Industrial prosthetics
        prosthetic("simple prosthetic leg", &["left leg", "right leg"], TechLevel::Industrial),
        prosthetic("simple prosthetic arm", &["left arm", "right arm"], TechLevel::Industrial),
        prosthetic("cochlear implant", &["head"], TechLevel::Industrial),
        // Spacer bionics
        prosthetic("bionic leg", &["left leg", "right leg"], TechLevel::Spacer),
        prosthetic("bionic arm", &["left arm", "right arm"], TechLevel::Spacer),
        prosthetic("bionic eye", &["left eye", "right eye"], TechLevel::Spacer),
        prosthetic("bionic heart", &["heart"], TechLevel::Spacer),
        prosthetic("bionic spine", &["spine"], TechLevel::Spacer),
        // Anomaly surgical artifacts
        ProstheticDef {
            condition: ConditionId("revenant vertebrae".to_string()),
            parts: parts(&["spine"]),
            tech: TechLevel::Neolithic,
            anomaly: true,
        },
        ProstheticDef {
            condition: ConditionId("ghoul plating".to_string()),
            parts: parts(&["torso"]),
            tech: TechLevel::Neolithic,
            anomaly: true,
        },
    ],
    genes: vec![
        GeneDef { id: GeneId("robust".to_string()), archite: false },
        GeneDef { id: GeneId("fast healer".to_string()), archite: false },
        GeneDef { id: GeneId("night vision".to_string()), archite: false },
        GeneDef { id: GeneId("strong melee".to_string()), archite: false },
        GeneDef { id: GeneId("cold tolerant".to_string()), archite: false },
        GeneDef { id: GeneId("deathless".to_string()), archite: true },
        GeneDef { id: GeneId("archite metabolism".to_string()), archite: true },
    ],
    ritual_mutations: vec![
        RitualMutationDef {
            condition: ConditionId("flesh tentacle".to_string()),
            attach_to: Some(parts(&["left shoulder", "right shoulder"])),
            once: false,
        },
        RitualMutationDef {
            condition: ConditionId("flesh whip".to_string()),
            attach_to: Some(parts(&["left shoulder", "right shoulder"])),
            once: false,
        },
        RitualMutationDef {
            condition: ConditionId("death refusal".to_string()),
            attach_to: None,
            once: true,
        },
    ],
    age_diseases: vec![
        AgeDiseaseDef {
            condition: ConditionId("cataract".to_string()),
            part: Some(part("left eye")),
        },
        AgeDiseaseDef {
            condition: ConditionId("hearing loss".to_string()),
            part: Some(part("head")),
        },
        AgeDiseaseDef {
            condition: ConditionId("bad back".to_string()),
            part: Some(part("spine")),
        },
        AgeDiseaseDef {
            condition: ConditionId("frail".to_string()),
            part: None,
        },
        AgeDiseaseDef {
            condition: ConditionId("dementia".to_string()),
            part: Some(part("head")),
        },
    ],
    biotech_active: true,
    anomaly_active: true,
});
