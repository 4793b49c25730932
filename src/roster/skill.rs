//! Skill and effect definitions
//!
//! A skill is an ordered list of effect terms. Order is significant:
//! the resolver walks the list front to back, so a damage term followed
//! by a self-damage term logs and accumulates in exactly that order.

use crate::core::types::SkillId;
use serde::{Deserialize, Serialize};

/// Advisory risk tag. Consumed by the decision provider when weighing
/// a free-text command, never by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Who an effect term applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    /// The opposing combatant chosen for this action
    Enemy,
    /// The acting combatant
    User,
}

/// One atomic numeric consequence of a skill
///
/// A closed set dispatched through a single exhaustive match in the
/// resolver; adding a variant is a compile-time exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Attack-scaled damage against the target
    Damage { multiplier: f32, target: EffectTarget },
    /// Max-HP-scaled recovery for the user
    Heal { fraction: f32, target: EffectTarget },
    /// Defensive posture, narrative-only in the baseline model
    DefenseStance,
    /// Attack-up posture, narrative-only in the baseline model
    BuffAttack { fraction: f32 },
    /// Defense-up posture, narrative-only in the baseline model
    BuffDefense { fraction: f32 },
    /// Max-HP-scaled recoil against the user
    SelfDamage { fraction: f32 },
}

/// A combat skill: ordered effects plus presentation data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub description: String,
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub risk: Option<RiskLevel>,
    /// Fixed line spoken when the skill fires
    #[serde(default)]
    pub battle_line: Option<String>,
}

impl Skill {
    pub fn new(id: impl Into<String>, name: impl Into<String>, effects: Vec<Effect>) -> Self {
        Self {
            id: SkillId::new(id),
            name: name.into(),
            description: String::new(),
            effects,
            risk: None,
            battle_line: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn with_battle_line(mut self, line: impl Into<String>) -> Self {
        self.battle_line = Some(line.into());
        self
    }

    /// Plain single-hit attack
    pub fn strike(id: impl Into<String>, name: impl Into<String>, multiplier: f32) -> Self {
        Self::new(
            id,
            name,
            vec![Effect::Damage {
                multiplier,
                target: EffectTarget::Enemy,
            }],
        )
    }

    /// Self-heal by a fraction of max HP
    pub fn mend(id: impl Into<String>, name: impl Into<String>, fraction: f32) -> Self {
        Self::new(
            id,
            name,
            vec![Effect::Heal {
                fraction,
                target: EffectTarget::User,
            }],
        )
    }

    /// Does any effect in this skill deal damage to the enemy?
    pub fn is_offensive(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, Effect::Damage { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_order_is_preserved() {
        let skill = Skill::new(
            "burst",
            "Shattered Echo",
            vec![
                Effect::Damage {
                    multiplier: 2.8,
                    target: EffectTarget::Enemy,
                },
                Effect::SelfDamage { fraction: 0.05 },
            ],
        );
        assert!(matches!(skill.effects[0], Effect::Damage { .. }));
        assert!(matches!(skill.effects[1], Effect::SelfDamage { .. }));
    }

    #[test]
    fn test_effect_toml_round_trip() {
        let toml_str = r#"
id = "prism_slash"
name = "Prism Slash"
description = "A precise light strike."
risk = "low"

[[effects]]
type = "damage"
multiplier = 1.1
target = "enemy"
"#;
        let skill: Skill = toml::from_str(toml_str).unwrap();
        assert_eq!(skill.id.as_str(), "prism_slash");
        assert_eq!(skill.risk, Some(RiskLevel::Low));
        assert_eq!(
            skill.effects,
            vec![Effect::Damage {
                multiplier: 1.1,
                target: EffectTarget::Enemy,
            }]
        );
    }

    #[test]
    fn test_is_offensive() {
        assert!(Skill::strike("a", "A", 1.0).is_offensive());
        assert!(!Skill::mend("b", "B", 0.3).is_offensive());
    }
}
