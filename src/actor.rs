//! Actor records and the faction directory
//!
//! A `Record` is the pool's own deep copy of an actor: identity, ages,
//! skills, health, genes and the live-simulation flags the dispatcher
//! filters on. The host owns the real actor while it is spawned; the pool
//! owns the record while it is retained.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Simulation ticks per in-game day.
pub const TICKS_PER_DAY: u64 = 60_000;

/// Simulation ticks per in-game year.
pub const TICKS_PER_YEAR: u64 = 3_600_000;

// ============================================================================
// Identity Components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactionId(pub u64);

/// Race / body-type identifier, as data-driven content names it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KindId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XenotypeId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitId(pub String);

// ============================================================================
// Age
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AgeTracker {
    pub biological_ticks: i64,
    pub chronological_ticks: i64,
}

impl AgeTracker {
    pub fn from_years(years: i64) -> Self {
        let ticks = years * TICKS_PER_YEAR as i64;
        Self {
            biological_ticks: ticks,
            chronological_ticks: ticks,
        }
    }

    pub fn biological_years(&self) -> i64 {
        self.biological_ticks / TICKS_PER_YEAR as i64
    }

    pub fn stage(&self) -> DevelopmentalStage {
        match self.biological_years() {
            y if y < 1 => DevelopmentalStage::Newborn,
            y if y < 13 => DevelopmentalStage::Child,
            _ => DevelopmentalStage::Adult,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevelopmentalStage {
    Newborn,
    Child,
    Adult,
}

/// Set of developmental stages a generation request will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMask(u8);

impl StageMask {
    pub const NEWBORN: StageMask = StageMask(1);
    pub const CHILD: StageMask = StageMask(2);
    pub const ADULT: StageMask = StageMask(4);
    pub const ALL: StageMask = StageMask(7);

    pub fn with(self, other: StageMask) -> StageMask {
        StageMask(self.0 | other.0)
    }

    pub fn allows(self, stage: DevelopmentalStage) -> bool {
        let bit = match stage {
            DevelopmentalStage::Newborn => 1,
            DevelopmentalStage::Child => 2,
            DevelopmentalStage::Adult => 4,
        };
        self.0 & bit != 0
    }
}

impl Default for StageMask {
    fn default() -> Self {
        StageMask::ALL
    }
}

// ============================================================================
// Skills
// ============================================================================

pub const SKILL_LEVEL_CAP: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Passion {
    None,
    Minor,
    Major,
}

impl Passion {
    /// Level-up selection weight used by the yearly cycle.
    pub fn weight(self) -> f32 {
        match self {
            Passion::Major => 3.0,
            Passion::Minor => 2.0,
            Passion::None => 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub level: u8,
    pub passion: Passion,
    pub xp_since_last_level: f32,
    pub disabled: bool,
}

impl Skill {
    pub fn new(name: impl Into<String>, level: u8, passion: Passion) -> Self {
        Self {
            name: name.into(),
            level,
            passion,
            xp_since_last_level: 0.0,
            disabled: false,
        }
    }

    pub fn xp_required_for_level_up(&self) -> f32 {
        1000.0 * (self.level as f32 + 1.0)
    }

    pub fn can_level_up(&self) -> bool {
        !self.disabled && self.level < SKILL_LEVEL_CAP
    }

    /// Raise the level by one and leave the skill halfway to the next.
    pub fn level_up(&mut self) {
        self.level += 1;
        self.xp_since_last_level = self.xp_required_for_level_up() / 2.0;
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionKind {
    /// Wound; the `permanent` flag on the instance marks scars.
    Injury,
    /// Disease or affliction.
    Ailment { tendable: bool, sickness: bool },
    /// Active drug high.
    Intoxication,
    /// Chemical dependency.
    Addiction,
    Hangover,
    /// Installed prosthetic, implant or graft.
    Implant,
    BloodLoss,
}

impl ConditionKind {
    /// Dependency-class conditions are allowed to sleep through dormancy.
    pub fn is_dependency(self) -> bool {
        matches!(
            self,
            ConditionKind::Addiction | ConditionKind::Intoxication | ConditionKind::Hangover
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub kind: ConditionKind,
    pub part: Option<PartId>,
    pub permanent: bool,
    /// Condition never blocks dormancy even when active.
    #[serde(default)]
    pub allows_dormancy: bool,
}

impl Condition {
    pub fn new(id: impl Into<String>, kind: ConditionKind) -> Self {
        Self {
            id: ConditionId(id.into()),
            kind,
            part: None,
            permanent: false,
            allows_dormancy: false,
        }
    }

    pub fn on_part(mut self, part: PartId) -> Self {
        self.part = Some(part);
        self
    }

    pub fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthState {
    pub conditions: Vec<Condition>,
    pub missing_parts: Vec<PartId>,
    pub dead: bool,
}

impl HealthState {
    pub fn has_condition(&self, id: &ConditionId) -> bool {
        self.conditions.iter().any(|c| &c.id == id)
    }

    pub fn part_is_missing(&self, part: &PartId) -> bool {
        self.missing_parts.contains(part)
    }

    /// Whether a prosthetic or implant is already installed on `part`.
    pub fn has_installed_part(&self, part: &PartId) -> bool {
        self.conditions
            .iter()
            .any(|c| c.kind == ConditionKind::Implant && c.part.as_ref() == Some(part))
    }

    /// Add a condition, validating any part it attaches to.
    pub fn add_condition(&mut self, condition: Condition) -> Result<(), crate::error::PoolError> {
        if let Some(part) = &condition.part {
            if self.part_is_missing(part) {
                return Err(crate::error::PoolError::MissingPart(part.0.clone()));
            }
        }
        self.conditions.push(condition);
        Ok(())
    }

    /// Regrow a lost body part.
    pub fn restore_part(&mut self, part: &PartId) {
        self.missing_parts.retain(|p| p != part);
    }

    pub fn kill(&mut self) {
        self.dead = true;
    }
}

// ============================================================================
// Needs / mind state / live-simulation flags
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Needs {
    pub food: f32,
    pub rest: f32,
}

impl Default for Needs {
    fn default() -> Self {
        Self { food: 1.0, rest: 1.0 }
    }
}

impl Needs {
    pub fn restore(&mut self) {
        self.food = 1.0;
        self.rest = 1.0;
    }
}

/// Scheduling state the actor may still carry from the live simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MindState {
    pub duty: Option<String>,
    pub current_job: Option<String>,
    pub queued_jobs: Vec<String>,
}

impl MindState {
    /// Drop every tie to the live map's scheduler.
    pub fn detach(&mut self) {
        self.duty = None;
        self.current_job = None;
        self.queued_jobs.clear();
    }
}

/// What is physically holding the actor right now, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Holding {
    Building,
    Container,
    Caravan,
    TransportPod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneSet {
    pub xenotype: XenotypeId,
    pub genes: HashSet<GeneId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutantKind(pub String);

// ============================================================================
// Record
// ============================================================================

/// A pooled actor: full state, deep-copied out of the live simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: ActorId,
    pub name: String,
    pub faction: Option<FactionId>,
    pub kind: KindId,
    pub humanlike: bool,
    pub gender: Gender,
    pub age: AgeTracker,
    pub skills: Vec<Skill>,
    pub health: HealthState,
    pub body_parts: Vec<PartId>,
    pub traits: Vec<TraitId>,
    pub genes: Option<GeneSet>,
    pub mutant: Option<MutantKind>,
    pub needs: Needs,
    pub mind: MindState,
    /// Currently placed on a live map.
    pub spawned: bool,
    /// Erased by the host; never usable again.
    pub destroyed: bool,
    pub holding: Option<Holding>,
    pub quest_reserved: bool,
    pub kidnapped: bool,
}

impl Record {
    /// A healthy adult humanlike with the default body plan.
    pub fn new(id: ActorId, name: impl Into<String>, faction: FactionId) -> Self {
        Self {
            id,
            name: name.into(),
            faction: Some(faction),
            kind: KindId("human".to_string()),
            humanlike: true,
            gender: Gender::Male,
            age: AgeTracker::from_years(30),
            skills: Vec::new(),
            health: HealthState::default(),
            body_parts: default_humanlike_body(),
            traits: Vec::new(),
            genes: None,
            mutant: None,
            needs: Needs::default(),
            mind: MindState::default(),
            spawned: false,
            destroyed: false,
            holding: None,
            quest_reserved: false,
            kidnapped: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.health.dead
    }

    pub fn has_trait(&self, t: &TraitId) -> bool {
        self.traits.contains(t)
    }
}

/// Body plan shared by default humanlike actors.
pub fn default_humanlike_body() -> Vec<PartId> {
    [
        "head",
        "left eye",
        "right eye",
        "jaw",
        "torso",
        "heart",
        "spine",
        "left shoulder",
        "right shoulder",
        "left arm",
        "right arm",
        "left hand",
        "right hand",
        "left leg",
        "right leg",
    ]
    .iter()
    .map(|p| PartId(p.to_string()))
    .collect()
}

// ============================================================================
// Factions
// ============================================================================

/// Technology tiers, ordered from least to most advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TechLevel {
    Undefined,
    Animal,
    Neolithic,
    Medieval,
    Industrial,
    Spacer,
    Ultra,
    Archotech,
}

/// Old-age mortality multiplier per tech tier. Higher tech, better medicine.
const MORTALITY_TECH_MULTIPLIERS: &[(TechLevel, f32)] = &[
    (TechLevel::Animal, 2.0),
    (TechLevel::Neolithic, 1.5),
    (TechLevel::Medieval, 1.0),
    (TechLevel::Industrial, 0.5),
    (TechLevel::Spacer, 0.3),
    (TechLevel::Ultra, 0.1),
    (TechLevel::Archotech, 0.01),
];

/// Age-disease multiplier per tech tier.
const DISEASE_TECH_MULTIPLIERS: &[(TechLevel, f32)] = &[
    (TechLevel::Animal, 3.0),
    (TechLevel::Neolithic, 2.0),
    (TechLevel::Medieval, 1.5),
    (TechLevel::Industrial, 1.0),
    (TechLevel::Spacer, 0.5),
    (TechLevel::Ultra, 0.1),
    (TechLevel::Archotech, 0.05),
];

fn table_lookup(table: &[(TechLevel, f32)], tech: TechLevel) -> f32 {
    table
        .iter()
        .find(|(t, _)| *t == tech)
        .map(|(_, m)| *m)
        .unwrap_or(1.0)
}

impl TechLevel {
    pub fn mortality_multiplier(self) -> f32 {
        table_lookup(MORTALITY_TECH_MULTIPLIERS, self)
    }

    pub fn disease_multiplier(self) -> f32 {
        table_lookup(DISEASE_TECH_MULTIPLIERS, self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionInfo {
    pub name: String,
    pub tech_level: TechLevel,
    pub hidden: bool,
    pub player: bool,
    pub humanlike: bool,
    /// Temporary quest faction (refugees, beggars, ancients); its actors
    /// are never captured unless pinned.
    pub transient: bool,
}

impl FactionInfo {
    pub fn new(name: impl Into<String>, tech_level: TechLevel) -> Self {
        Self {
            name: name.into(),
            tech_level,
            hidden: false,
            player: false,
            humanlike: true,
            transient: false,
        }
    }
}

/// Lookup of every faction the host knows about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactionDirectory {
    factions: HashMap<FactionId, FactionInfo>,
}

impl FactionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: FactionId, info: FactionInfo) {
        self.factions.insert(id, info);
    }

    pub fn get(&self, id: FactionId) -> Option<&FactionInfo> {
        self.factions.get(&id)
    }

    pub fn is_hidden(&self, id: FactionId) -> bool {
        self.get(id).map(|f| f.hidden).unwrap_or(true)
    }

    pub fn tech_level(&self, id: FactionId) -> TechLevel {
        self.get(id)
            .map(|f| f.tech_level)
            .unwrap_or(TechLevel::Undefined)
    }
}
