//! Combatant records and roster validation
//!
//! Combatants are created once at battle start from static definitions
//! and mutated only through resolved actions or scheduler resets. A
//! defeated combatant stays in the roster at 0 HP: it no longer acts or
//! gets targeted, but it still counts for bond evaluation.

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{CombatantId, Faction, Side, SkillId};
use crate::roster::skill::{Effect, EffectTarget, Skill};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// Combat stats, fixed for the duration of a battle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub level: u32,
    pub attack: f32,
    pub defense: f32,
    /// Critical hit chance, within [0, 1]
    pub crit_rate: f32,
    /// Bonus damage fraction on a critical hit (0.5 = +50%)
    pub crit_damage: f32,
    /// Turn frequency driver; must be positive
    pub speed: f32,
}

/// Scripted one-liners for automated speech, keyed by battle moment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleLines {
    #[serde(default)]
    pub start: Vec<String>,
    #[serde(default)]
    pub skill: Vec<String>,
    #[serde(default)]
    pub hit: Vec<String>,
    #[serde(default)]
    pub defeat: Vec<String>,
}

/// A single fighter: party member or hostile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub side: Side,
    pub faction: Faction,
    pub max_hp: i32,
    pub current_hp: i32,
    pub stats: Stats,
    pub skills: Vec<Skill>,
    /// Remaining distance to this combatant's next turn on the shared
    /// timeline. Reset to `base_action_value / speed` after acting.
    pub action_value: f32,
    /// Persona text fed to the decision provider prompt
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub speaking_style: String,
    #[serde(default)]
    pub battle_lines: BattleLines,
}

impl Combatant {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        side: Side,
        faction: Faction,
        max_hp: i32,
        stats: Stats,
        skills: Vec<Skill>,
    ) -> Self {
        let action_value = if stats.speed > 0.0 {
            // Placeholder until the first scheduler normalization; the
            // real interval depends on the engine config.
            EngineConfig::default().base_action_value / stats.speed
        } else {
            0.0
        };
        Self {
            id: CombatantId::new(id),
            name: name.into(),
            side,
            faction,
            max_hp,
            current_hp: max_hp,
            stats,
            skills,
            action_value,
            personality: String::new(),
            speaking_style: String::new(),
            battle_lines: BattleLines::default(),
        }
    }

    pub fn with_persona(
        mut self,
        personality: impl Into<String>,
        speaking_style: impl Into<String>,
    ) -> Self {
        self.personality = personality.into();
        self.speaking_style = speaking_style.into();
        self
    }

    pub fn with_battle_lines(mut self, lines: BattleLines) -> Self {
        self.battle_lines = lines;
        self
    }

    /// Inter-turn interval on the shared timeline
    pub fn interval(&self, config: &EngineConfig) -> f32 {
        config.base_action_value / self.stats.speed
    }

    pub fn is_defeated(&self) -> bool {
        self.current_hp <= 0
    }

    /// Apply damage, clamping HP to the valid range. Returns the HP
    /// actually lost.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let before = self.current_hp;
        self.current_hp = (self.current_hp - amount.max(0)).clamp(0, self.max_hp);
        before - self.current_hp
    }

    /// Apply a signed heal (negative values model recoil), clamping HP
    /// to [0, max_hp]. Returns the HP actually gained (or lost).
    pub fn apply_heal(&mut self, amount: i32) -> i32 {
        let before = self.current_hp;
        self.current_hp = (self.current_hp + amount).clamp(0, self.max_hp);
        self.current_hp - before
    }

    pub fn skill(&self, id: &SkillId) -> Option<&Skill> {
        self.skills.iter().find(|s| &s.id == id)
    }

    /// Fallback skill used when a decision cannot be honored
    pub fn first_skill(&self) -> &Skill {
        &self.skills[0]
    }

    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            0.0
        } else {
            self.current_hp as f32 / self.max_hp as f32
        }
    }
}

/// Validate a roster before battle start.
///
/// Invalid configuration is fatal here so it can never surface as a
/// runtime scheduling fault.
pub fn validate_roster(roster: &[Combatant]) -> Result<()> {
    if !roster.iter().any(|c| c.side == Side::Party) {
        return Err(EngineError::InvalidRoster("party side is empty".into()));
    }
    if !roster.iter().any(|c| c.side == Side::Enemy) {
        return Err(EngineError::InvalidRoster("enemy side is empty".into()));
    }

    let mut seen: AHashSet<&CombatantId> = AHashSet::new();
    for combatant in roster {
        if !seen.insert(&combatant.id) {
            return Err(EngineError::InvalidRoster(format!(
                "duplicate combatant id '{}'",
                combatant.id
            )));
        }
        if combatant.stats.speed <= 0.0 {
            return Err(EngineError::InvalidRoster(format!(
                "{}: speed must be positive, got {}",
                combatant.id, combatant.stats.speed
            )));
        }
        if combatant.max_hp <= 0 {
            return Err(EngineError::InvalidRoster(format!(
                "{}: max_hp must be positive, got {}",
                combatant.id, combatant.max_hp
            )));
        }
        if !(0.0..=1.0).contains(&combatant.stats.crit_rate) {
            return Err(EngineError::InvalidRoster(format!(
                "{}: crit_rate must be within [0, 1], got {}",
                combatant.id, combatant.stats.crit_rate
            )));
        }
        if combatant.stats.crit_damage < 0.0 {
            return Err(EngineError::InvalidRoster(format!(
                "{}: crit_damage must be non-negative, got {}",
                combatant.id, combatant.stats.crit_damage
            )));
        }
        if combatant.skills.is_empty() {
            return Err(EngineError::InvalidRoster(format!(
                "{}: skill list is empty",
                combatant.id
            )));
        }
        for skill in &combatant.skills {
            for effect in &skill.effects {
                match effect {
                    Effect::Damage {
                        target: EffectTarget::User,
                        ..
                    } => {
                        return Err(EngineError::InvalidRoster(format!(
                            "{}: skill '{}' has a damage effect targeting the user; \
                             use self_damage instead",
                            combatant.id, skill.id
                        )));
                    }
                    Effect::Heal {
                        target: EffectTarget::Enemy,
                        ..
                    } => {
                        return Err(EngineError::InvalidRoster(format!(
                            "{}: skill '{}' has a heal effect targeting the enemy",
                            combatant.id, skill.id
                        )));
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}
