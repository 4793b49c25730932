//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a battle session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleId(pub Uuid);

impl BattleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BattleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable identifier for a combatant (from static roster data)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub String);

impl CombatantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CombatantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CombatantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Stable identifier for a skill
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkillId(pub String);

impl SkillId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SkillId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SkillId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier for a composition bond
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BondId(pub String);

impl BondId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for BondId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the battle a combatant fights on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Party,
    Enemy,
}

/// Faction tags for party composition bonds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    DawnLegacy,
    CrimsonHeavy,
    WastelandDrifters,
    DeepDive,
    AiAwakened,
    Unaligned,
}

impl Faction {
    pub fn display_name(&self) -> &'static str {
        match self {
            Faction::DawnLegacy => "Dawn Legacy",
            Faction::CrimsonHeavy => "Crimson Heavy Industries",
            Faction::WastelandDrifters => "Wasteland Drifters",
            Faction::DeepDive => "Deep Dive Society",
            Faction::AiAwakened => "Awakened Machina",
            Faction::Unaligned => "Unaligned",
        }
    }
}

/// Battle turn counter (increments once per full scheduler rotation)
pub type Turn = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combatant_id_equality() {
        let a = CombatantId::from("linque");
        let b = CombatantId::from("linque");
        let c = CombatantId::from("helga");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_combatant_id_hash() {
        use std::collections::HashMap;
        let mut map: HashMap<CombatantId, &str> = HashMap::new();
        map.insert(CombatantId::from("linque"), "party");
        assert_eq!(map.get(&CombatantId::from("linque")), Some(&"party"));
    }

    #[test]
    fn test_faction_snake_case_serde() {
        let json = serde_json::to_string(&Faction::DawnLegacy).unwrap();
        assert_eq!(json, "\"dawn_legacy\"");
        let back: Faction = serde_json::from_str("\"wasteland_drifters\"").unwrap();
        assert_eq!(back, Faction::WastelandDrifters);
    }

    #[test]
    fn test_battle_ids_are_unique() {
        assert_ne!(BattleId::new(), BattleId::new());
    }
}
