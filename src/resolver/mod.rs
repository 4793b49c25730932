//! Damage and effect resolution
//!
//! Given an attacker, a defender, a skill and the active bonds, compute
//! every numeric outcome of one action. The resolver never touches
//! combatant records: it returns a `SkillOutcome` the caller applies,
//! clamping HP to [0, max_hp].
//!
//! Effects evaluate strictly in list order. Each damage effect logs one
//! formula diagnostic line alongside its narrative line.

use crate::bonds::{attacker_totals, defender_totals, Bond};
use crate::core::config::EngineConfig;
use crate::roster::combatant::Combatant;
use crate::roster::skill::{Effect, Skill};
use rand::Rng;

/// One human-readable line produced during resolution
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub text: String,
    pub crit: bool,
    /// Formula breakdowns, distinguishable from narrative lines
    pub diagnostic: bool,
}

impl LogLine {
    fn narrative(text: String) -> Self {
        Self {
            text,
            crit: false,
            diagnostic: false,
        }
    }

    fn diagnostic(text: String) -> Self {
        Self {
            text,
            crit: false,
            diagnostic: true,
        }
    }
}

/// Net numeric result of one resolved skill
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillOutcome {
    /// Total damage to apply to the defender
    pub damage: i32,
    /// Signed HP delta for the user (self-damage nets this down)
    pub heal: i32,
    /// True if any damage effect landed a critical hit
    pub crit: bool,
    /// True if any damage effect was dodged
    pub dodged: bool,
    pub lines: Vec<LogLine>,
}

/// Resolve a skill's full effect list against a defender.
///
/// Randomness (evasion, crit, variance) comes from the caller's RNG so
/// battles replay deterministically under a fixed seed.
pub fn resolve_skill(
    attacker: &Combatant,
    defender: &Combatant,
    skill: &Skill,
    bonds: &[Bond],
    config: &EngineConfig,
    rng: &mut impl Rng,
) -> SkillOutcome {
    let atk = attacker_totals(bonds, attacker);
    let def = defender_totals(bonds, defender);
    let mut outcome = SkillOutcome::default();

    for effect in &skill.effects {
        match effect {
            Effect::Damage { multiplier, .. } => {
                let effective_attack = attacker.stats.attack * atk.attack_mul;
                let base = effective_attack * multiplier;

                // Evasion gate: only rolled while the defender's side
                // carries an evasion bond. A dodge skips mitigation,
                // crit and variance entirely.
                if def.evasion_chance > 0.0 && rng.gen::<f32>() < def.evasion_chance {
                    outcome.dodged = true;
                    outcome.lines.push(LogLine::narrative(format!(
                        "{} dodged {}!",
                        defender.name, skill.name
                    )));
                    continue;
                }

                let defense = defender.stats.defense * def.defense_mul;
                let denominator = defense
                    + config.mitigation_flat
                    + config.mitigation_per_level * attacker.stats.level as f32;
                let mitigation = if denominator > 0.0 {
                    (defense / denominator).clamp(0.0, 1.0)
                } else {
                    0.0
                };

                let crit_chance = (attacker.stats.crit_rate + atk.crit_rate_add).clamp(0.0, 1.0);
                let crit = rng.gen::<f32>() < crit_chance;
                let crit_mult = if crit {
                    1.0 + attacker.stats.crit_damage + atk.crit_damage_add
                } else {
                    1.0
                };

                let variance = if config.variance_max > config.variance_min {
                    rng.gen_range(config.variance_min..config.variance_max)
                } else {
                    config.variance_min
                };

                let raw = base
                    * atk.outgoing_mul
                    * def.incoming_mul
                    * (1.0 - mitigation)
                    * crit_mult
                    * variance;
                let damage = (raw.floor() as i32).max(0);

                outcome.damage += damage;
                outcome.crit |= crit;

                let text = if crit {
                    format!(
                        "{} used {} - CRITICAL HIT, {} damage to {}!",
                        attacker.name, skill.name, damage, defender.name
                    )
                } else {
                    format!(
                        "{} used {}, dealing {} damage to {}!",
                        attacker.name, skill.name, damage, defender.name
                    )
                };
                outcome.lines.push(LogLine {
                    text,
                    crit,
                    diagnostic: false,
                });
                outcome.lines.push(LogLine::diagnostic(format!(
                    "formula: {:.1} atk x {:.2} mult x {:.2} dmg-mods x (1 - {:.3} mit) \
                     x {:.2} crit x {:.3} var = {}",
                    effective_attack,
                    multiplier,
                    atk.outgoing_mul * def.incoming_mul,
                    mitigation,
                    crit_mult,
                    variance,
                    damage
                )));
            }
            Effect::Heal { fraction, .. } => {
                let amount = (attacker.max_hp as f32 * fraction).floor() as i32;
                outcome.heal += amount;
                outcome.lines.push(LogLine::narrative(format!(
                    "{} used {}, recovering {} HP!",
                    attacker.name, skill.name, amount
                )));
            }
            Effect::SelfDamage { fraction } => {
                let amount = (attacker.max_hp as f32 * fraction).floor() as i32;
                outcome.heal -= amount;
                outcome.lines.push(LogLine::narrative(format!(
                    "{} takes {} recoil damage.",
                    attacker.name, amount
                )));
            }
            Effect::DefenseStance => {
                outcome.lines.push(LogLine::narrative(format!(
                    "{} takes a defensive stance, watching for the next attack.",
                    attacker.name
                )));
            }
            Effect::BuffAttack { .. } => {
                outcome.lines.push(LogLine::narrative(format!(
                    "{} gathers power - attack surging.",
                    attacker.name
                )));
            }
            Effect::BuffDefense { .. } => {
                outcome.lines.push(LogLine::narrative(format!(
                    "{} hardens their guard.",
                    attacker.name
                )));
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Faction, Side};
    use crate::roster::combatant::Stats;
    use crate::roster::skill::EffectTarget;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fighter(id: &str, side: Side, attack: f32, defense: f32, crit_rate: f32) -> Combatant {
        Combatant::new(
            id,
            id,
            side,
            Faction::Unaligned,
            1200,
            Stats {
                level: 50,
                attack,
                defense,
                crit_rate,
                crit_damage: 0.5,
                speed: 100.0,
            },
            vec![Skill::strike("basic", "Basic", 1.0)],
        )
    }

    fn pinned_config() -> EngineConfig {
        EngineConfig::deterministic()
    }

    #[test]
    fn test_worked_example_233() {
        // attack=300, defense=200, level=50, multiplier=1.0, no crit,
        // variance pinned: mitigation = 200/(200+200+500) = 0.2222,
        // damage = floor(300 * 0.7778) = 233
        let attacker = fighter("a", Side::Party, 300.0, 0.0, 0.0);
        let defender = fighter("d", Side::Enemy, 0.0, 200.0, 0.0);
        let skill = Skill::strike("s", "Strike", 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let outcome = resolve_skill(&attacker, &defender, &skill, &[], &pinned_config(), &mut rng);
        assert_eq!(outcome.damage, 233);
        assert!(!outcome.crit);
        assert!(!outcome.dodged);
    }

    #[test]
    fn test_zero_defense_passes_full_damage() {
        let attacker = fighter("a", Side::Party, 300.0, 0.0, 0.0);
        let defender = fighter("d", Side::Enemy, 0.0, 0.0, 0.0);
        let skill = Skill::strike("s", "Strike", 1.5);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let outcome = resolve_skill(&attacker, &defender, &skill, &[], &pinned_config(), &mut rng);
        assert_eq!(outcome.damage, 450);
    }

    #[test]
    fn test_damage_monotone_in_defense() {
        let attacker = fighter("a", Side::Party, 300.0, 0.0, 0.0);
        let skill = Skill::strike("s", "Strike", 1.0);
        let config = pinned_config();

        let mut last = i32::MAX;
        for defense in [0.0_f32, 50.0, 100.0, 200.0, 400.0, 800.0, 10_000.0] {
            let defender = fighter("d", Side::Enemy, 0.0, defense, 0.0);
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let outcome = resolve_skill(&attacker, &defender, &skill, &[], &config, &mut rng);
            assert!(
                outcome.damage <= last,
                "damage rose from {} to {} at defense {}",
                last,
                outcome.damage,
                defense
            );
            assert!(outcome.damage >= 0);
            last = outcome.damage;
        }
    }

    #[test]
    fn test_guaranteed_crit_applies_crit_damage() {
        let attacker = fighter("a", Side::Party, 300.0, 0.0, 1.0);
        let defender = fighter("d", Side::Enemy, 0.0, 0.0, 0.0);
        let skill = Skill::strike("s", "Strike", 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let outcome = resolve_skill(&attacker, &defender, &skill, &[], &pinned_config(), &mut rng);
        // crit_damage 0.5 => x1.5
        assert_eq!(outcome.damage, 450);
        assert!(outcome.crit);
        assert!(outcome.lines.iter().any(|l| l.crit));
    }

    #[test]
    fn test_effects_resolve_in_list_order() {
        let attacker = fighter("a", Side::Party, 300.0, 0.0, 0.0);
        let defender = fighter("d", Side::Enemy, 0.0, 0.0, 0.0);
        let skill = Skill::new(
            "burst",
            "Burst",
            vec![
                Effect::Damage {
                    multiplier: 1.0,
                    target: EffectTarget::Enemy,
                },
                Effect::SelfDamage { fraction: 0.05 },
            ],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let outcome = resolve_skill(&attacker, &defender, &skill, &[], &pinned_config(), &mut rng);
        assert_eq!(outcome.damage, 300);
        // floor(1200 * 0.05) = 60 recoil
        assert_eq!(outcome.heal, -60);

        let narrative: Vec<&LogLine> = outcome.lines.iter().filter(|l| !l.diagnostic).collect();
        assert!(narrative[0].text.contains("dealing"));
        assert!(narrative[1].text.contains("recoil"));
    }

    #[test]
    fn test_heal_amount_scales_with_max_hp() {
        let attacker = fighter("a", Side::Party, 300.0, 0.0, 0.0);
        let defender = fighter("d", Side::Enemy, 0.0, 0.0, 0.0);
        let skill = Skill::mend("h", "Mend", 0.35);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let outcome = resolve_skill(&attacker, &defender, &skill, &[], &pinned_config(), &mut rng);
        assert_eq!(outcome.heal, (1200.0_f32 * 0.35).floor() as i32);
        assert_eq!(outcome.damage, 0);
    }

    #[test]
    fn test_one_formula_line_per_damage_effect() {
        let attacker = fighter("a", Side::Party, 300.0, 0.0, 0.0);
        let defender = fighter("d", Side::Enemy, 0.0, 100.0, 0.0);
        let skill = Skill::new(
            "double",
            "Double Strike",
            vec![
                Effect::Damage {
                    multiplier: 0.6,
                    target: EffectTarget::Enemy,
                },
                Effect::Damage {
                    multiplier: 0.6,
                    target: EffectTarget::Enemy,
                },
            ],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let outcome = resolve_skill(&attacker, &defender, &skill, &[], &pinned_config(), &mut rng);
        let diagnostics = outcome.lines.iter().filter(|l| l.diagnostic).count();
        assert_eq!(diagnostics, 2);
    }

    #[test]
    fn test_evasion_bond_can_zero_out_damage() {
        use crate::bonds::{Bond, BondEffect, BondModifier, BondScope};
        use crate::core::types::BondId;

        let attacker = fighter("a", Side::Enemy, 300.0, 0.0, 0.0);
        let defender = fighter("d", Side::Party, 0.0, 0.0, 0.0);
        let skill = Skill::strike("s", "Strike", 1.0);
        // Guaranteed dodge makes the path deterministic
        let bonds = vec![Bond {
            id: BondId::new("bond_test_evasion"),
            name: "Test Evasion".into(),
            description: String::new(),
            active: true,
            members: vec![],
            modifiers: vec![BondModifier {
                scope: BondScope::Party,
                effect: BondEffect::EvasionChanceAdd(1.0),
            }],
        }];
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let outcome =
            resolve_skill(&attacker, &defender, &skill, &bonds, &pinned_config(), &mut rng);
        assert_eq!(outcome.damage, 0);
        assert!(outcome.dodged);
        assert!(outcome.lines.iter().any(|l| l.text.contains("dodged")));
        // A dodge produces no formula line
        assert_eq!(outcome.lines.iter().filter(|l| l.diagnostic).count(), 0);
    }

    #[test]
    fn test_attack_bond_raises_damage() {
        use crate::bonds::{Bond, BondEffect, BondModifier, BondScope};
        use crate::core::types::BondId;

        let attacker = fighter("a", Side::Party, 300.0, 0.0, 0.0);
        let defender = fighter("d", Side::Enemy, 0.0, 0.0, 0.0);
        let skill = Skill::strike("s", "Strike", 1.0);
        let bonds = vec![Bond {
            id: BondId::new("bond_test_attack"),
            name: "Test Attack".into(),
            description: String::new(),
            active: true,
            members: vec![],
            modifiers: vec![BondModifier {
                scope: BondScope::Member(attacker.id.clone()),
                effect: BondEffect::AttackMul(1.2),
            }],
        }];
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let outcome =
            resolve_skill(&attacker, &defender, &skill, &bonds, &pinned_config(), &mut rng);
        assert_eq!(outcome.damage, 360);
    }

    #[test]
    fn test_stance_and_buffs_are_narrative_only() {
        let attacker = fighter("a", Side::Party, 300.0, 0.0, 0.0);
        let defender = fighter("d", Side::Enemy, 0.0, 0.0, 0.0);
        let skill = Skill::new(
            "stance",
            "Guard",
            vec![
                Effect::DefenseStance,
                Effect::BuffAttack { fraction: 0.5 },
                Effect::BuffDefense { fraction: 0.6 },
            ],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let outcome = resolve_skill(&attacker, &defender, &skill, &[], &pinned_config(), &mut rng);
        assert_eq!(outcome.damage, 0);
        assert_eq!(outcome.heal, 0);
        assert_eq!(outcome.lines.len(), 3);
        assert!(outcome.lines.iter().all(|l| !l.diagnostic));
    }
}
