//! Pool settings
//!
//! Mirrors the host-facing mod options. Defaults match the shipped ones.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Cap each faction group's size for brand-new captures.
    pub enable_faction_limit: bool,
    pub faction_veteran_limit: usize,
    /// Days a freshly captured record rests before it can be dispatched.
    pub recall_cooldown_days: u64,
    /// Days after capture until dormancy is forced regardless of blockers.
    pub forced_freeze_days: u64,
    /// Chance a generation request consults the pool at all.
    pub recall_chance: f32,
    /// Externally-configured aging rate; scales the yearly cycle interval
    /// and the forced biological aging step.
    pub aging_rate: f32,
    pub death_chance_multiplier: f32,
    pub disease_chance_multiplier: f32,
    pub implant_chance_multiplier: f32,
    pub gene_chance_multiplier: f32,
    pub anomaly_chance_multiplier: f32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            enable_faction_limit: true,
            faction_veteran_limit: 100,
            recall_cooldown_days: 10,
            forced_freeze_days: 0,
            recall_chance: 0.5,
            aging_rate: 1.0,
            death_chance_multiplier: 1.0,
            disease_chance_multiplier: 1.0,
            implant_chance_multiplier: 1.0,
            gene_chance_multiplier: 1.0,
            anomaly_chance_multiplier: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = PoolSettings::default();
        assert!(s.enable_faction_limit);
        assert_eq!(s.faction_veteran_limit, 100);
        assert_eq!(s.recall_cooldown_days, 10);
        assert_eq!(s.recall_chance, 0.5);
    }
}
