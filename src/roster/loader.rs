//! Load combatant definitions from TOML files
//!
//! Static roster data is consumed once at battle start and never
//! mutated by the engine. A definition file holds one combatant.

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{CombatantId, Faction, Side};
use crate::roster::combatant::{BattleLines, Combatant, Stats};
use crate::roster::skill::Skill;
use serde::Deserialize;
use std::path::Path;

/// On-disk combatant definition
#[derive(Debug, Clone, Deserialize)]
pub struct CombatantDef {
    pub id: String,
    pub name: String,
    #[serde(default = "default_faction")]
    pub faction: Faction,
    pub max_hp: i32,
    pub stats: Stats,
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub speaking_style: String,
    #[serde(default)]
    pub battle_lines: BattleLines,
}

fn default_faction() -> Faction {
    Faction::Unaligned
}

impl CombatantDef {
    /// Instantiate a live combatant on the given side
    pub fn into_combatant(self, side: Side, config: &EngineConfig) -> Combatant {
        let action_value = if self.stats.speed > 0.0 {
            config.base_action_value / self.stats.speed
        } else {
            0.0
        };
        Combatant {
            id: CombatantId::new(self.id),
            name: self.name,
            side,
            faction: self.faction,
            max_hp: self.max_hp,
            current_hp: self.max_hp,
            stats: self.stats,
            skills: self.skills,
            action_value,
            personality: self.personality,
            speaking_style: self.speaking_style,
            battle_lines: self.battle_lines,
        }
    }
}

/// Parse a single combatant definition from TOML
pub fn parse_combatant_toml(content: &str) -> Result<CombatantDef> {
    toml::from_str(content)
        .map_err(|e| EngineError::ConfigError(format!("invalid combatant TOML: {}", e)))
}

/// Load every `*.toml` definition in a directory, sorted by file name
/// so roster order (and with it the scheduler tie-break) is stable.
pub fn load_roster_dir(dir: &Path) -> Result<Vec<CombatantDef>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut defs = Vec::new();
    for path in paths {
        let content = std::fs::read_to_string(&path)?;
        let def = parse_combatant_toml(&content).map_err(|e| {
            EngineError::ConfigError(format!("{}: {}", path.display(), e))
        })?;
        defs.push(def);
    }
    Ok(defs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
id = "linque"
name = "Linque"
faction = "dawn_legacy"
max_hp = 1150
personality = "Cold on the surface, fiercely loyal underneath."
speaking_style = "Curt, a little prickly."

[stats]
level = 50
attack = 310.0
defense = 180.0
crit_rate = 0.2
crit_damage = 0.6
speed = 120.0

[[skills]]
id = "prism_slash"
name = "Prism Slash"
description = "A precise light strike."
risk = "low"

[[skills.effects]]
type = "damage"
multiplier = 1.1
target = "enemy"

[[skills]]
id = "glimmer_mend"
name = "Glimmer Mend"
description = "Accelerated nano-repair."
risk = "low"

[[skills.effects]]
type = "heal"
fraction = 0.35
target = "user"
"#;

    #[test]
    fn test_parse_combatant_toml() {
        let def = parse_combatant_toml(SAMPLE).unwrap();
        assert_eq!(def.id, "linque");
        assert_eq!(def.faction, Faction::DawnLegacy);
        assert_eq!(def.max_hp, 1150);
        assert_eq!(def.skills.len(), 2);
        assert_eq!(def.stats.speed, 120.0);
    }

    #[test]
    fn test_into_combatant_seeds_action_value() {
        let config = EngineConfig::default();
        let def = parse_combatant_toml(SAMPLE).unwrap();
        let combatant = def.into_combatant(Side::Party, &config);
        assert_eq!(combatant.current_hp, combatant.max_hp);
        let expected = config.base_action_value / 120.0;
        assert!((combatant.action_value - expected).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let result = parse_combatant_toml("id = 3");
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }
}
