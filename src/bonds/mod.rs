//! Party composition bonds
//!
//! Bonds are passive modifiers unlocked by who is standing together at
//! battle start: either two or more members of the same faction, or a
//! specific named pair. The roster is static per battle, so the rule
//! table runs exactly once and the result feeds the resolver as
//! multiplicative or additive totals.

use crate::core::types::{BondId, CombatantId, Faction, Side};
use crate::roster::combatant::Combatant;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Who a bond modifier applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BondScope {
    /// Every party-side combatant
    Party,
    /// One specific combatant
    Member(CombatantId),
    /// Every enemy-side combatant (used for debuffs the party projects)
    EnemySide,
}

/// One numeric consequence of an active bond
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BondEffect {
    /// Multiplies effective attack
    AttackMul(f32),
    /// Multiplies effective defense (values below 1.0 are debuffs)
    DefenseMul(f32),
    /// Added to critical hit chance
    CritRateAdd(f32),
    /// Added to the critical damage bonus
    CritDamageAdd(f32),
    /// Multiplies damage dealt
    OutgoingDamageMul(f32),
    /// Multiplies damage received (above 1.0 is a vulnerability)
    IncomingDamageMul(f32),
    /// Added to dodge chance while this side defends
    EvasionChanceAdd(f32),
    /// Fraction of max HP restored at each completed scheduler rotation
    RoundHeal(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondModifier {
    pub scope: BondScope,
    pub effect: BondEffect,
}

/// An unlocked composition bond
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub id: BondId,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub members: Vec<CombatantId>,
    pub modifiers: Vec<BondModifier>,
}

/// Aggregated bond totals for an attacking combatant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackerTotals {
    pub attack_mul: f32,
    pub crit_rate_add: f32,
    pub crit_damage_add: f32,
    pub outgoing_mul: f32,
}

impl Default for AttackerTotals {
    fn default() -> Self {
        Self {
            attack_mul: 1.0,
            crit_rate_add: 0.0,
            crit_damage_add: 0.0,
            outgoing_mul: 1.0,
        }
    }
}

/// Aggregated bond totals for a defending combatant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefenderTotals {
    pub defense_mul: f32,
    pub incoming_mul: f32,
    pub evasion_chance: f32,
}

impl Default for DefenderTotals {
    fn default() -> Self {
        Self {
            defense_mul: 1.0,
            incoming_mul: 1.0,
            evasion_chance: 0.0,
        }
    }
}

fn scope_applies(scope: &BondScope, combatant: &Combatant) -> bool {
    match scope {
        BondScope::Party => combatant.side == Side::Party,
        BondScope::Member(id) => id == &combatant.id,
        BondScope::EnemySide => combatant.side == Side::Enemy,
    }
}

/// Collect the attack-side totals for one combatant
pub fn attacker_totals(bonds: &[Bond], combatant: &Combatant) -> AttackerTotals {
    let mut totals = AttackerTotals::default();
    for bond in bonds.iter().filter(|b| b.active) {
        for modifier in &bond.modifiers {
            if !scope_applies(&modifier.scope, combatant) {
                continue;
            }
            match modifier.effect {
                BondEffect::AttackMul(m) => totals.attack_mul *= m,
                BondEffect::CritRateAdd(a) => totals.crit_rate_add += a,
                BondEffect::CritDamageAdd(a) => totals.crit_damage_add += a,
                BondEffect::OutgoingDamageMul(m) => totals.outgoing_mul *= m,
                _ => {}
            }
        }
    }
    totals
}

/// Collect the defense-side totals for one combatant
pub fn defender_totals(bonds: &[Bond], combatant: &Combatant) -> DefenderTotals {
    let mut totals = DefenderTotals::default();
    for bond in bonds.iter().filter(|b| b.active) {
        for modifier in &bond.modifiers {
            if !scope_applies(&modifier.scope, combatant) {
                continue;
            }
            match modifier.effect {
                BondEffect::DefenseMul(m) => totals.defense_mul *= m,
                BondEffect::IncomingDamageMul(m) => totals.incoming_mul *= m,
                BondEffect::EvasionChanceAdd(a) => totals.evasion_chance += a,
                _ => {}
            }
        }
    }
    totals
}

/// Per-member heal fractions applied once per completed rotation
pub fn round_heals(bonds: &[Bond]) -> Vec<(CombatantId, f32)> {
    let mut heals = Vec::new();
    for bond in bonds.iter().filter(|b| b.active) {
        for modifier in &bond.modifiers {
            if let (BondScope::Member(id), BondEffect::RoundHeal(fraction)) =
                (&modifier.scope, &modifier.effect)
            {
                heals.push((id.clone(), *fraction));
            }
        }
    }
    heals
}

/// Evaluate the full rule table against the current roster.
///
/// Runs once at battle start. Defeated combatants still count: bonds
/// depend on composition, not on who is currently standing.
pub fn evaluate_bonds(roster: &[Combatant]) -> Vec<Bond> {
    let party: Vec<&Combatant> = roster.iter().filter(|c| c.side == Side::Party).collect();

    let mut bonds = Vec::new();
    bonds.extend(faction_bonds(&party));
    bonds.extend(pair_bonds(&party));
    bonds
}

fn faction_bonds(party: &[&Combatant]) -> Vec<Bond> {
    let mut by_faction: AHashMap<Faction, Vec<CombatantId>> = AHashMap::new();
    for member in party {
        if member.faction != Faction::Unaligned {
            by_faction
                .entry(member.faction)
                .or_default()
                .push(member.id.clone());
        }
    }

    let mut bonds = Vec::new();
    for (faction, members) in by_faction {
        if members.len() < 2 {
            continue;
        }
        let bond = match faction {
            Faction::DawnLegacy => Bond {
                id: BondId::new("bond_dawn_legacy"),
                name: "Legacy Accord".into(),
                description: "Dawn Legacy frames interlock their barriers: party defense +15%."
                    .into(),
                active: true,
                members,
                modifiers: vec![BondModifier {
                    scope: BondScope::Party,
                    effect: BondEffect::DefenseMul(1.15),
                }],
            },
            Faction::CrimsonHeavy => Bond {
                id: BondId::new("bond_crimson_heavy"),
                name: "Ironworks Doctrine".into(),
                description: "Crimson Heavy fire discipline: party crit rate +10%.".into(),
                active: true,
                members,
                modifiers: vec![BondModifier {
                    scope: BondScope::Party,
                    effect: BondEffect::CritRateAdd(0.10),
                }],
            },
            Faction::WastelandDrifters => Bond {
                id: BondId::new("bond_wasteland_drifters"),
                name: "Dust Instinct".into(),
                description: "Drifters read the wind: party gains a 15% dodge chance.".into(),
                active: true,
                members,
                modifiers: vec![BondModifier {
                    scope: BondScope::Party,
                    effect: BondEffect::EvasionChanceAdd(0.15),
                }],
            },
            Faction::DeepDive => Bond {
                id: BondId::new("bond_deep_dive"),
                name: "Pressure Differential".into(),
                description: "Deep Dive telemetry exposes seams: enemy defense -10%.".into(),
                active: true,
                members,
                modifiers: vec![BondModifier {
                    scope: BondScope::EnemySide,
                    effect: BondEffect::DefenseMul(0.90),
                }],
            },
            Faction::AiAwakened => Bond {
                id: BondId::new("bond_ai_awakened"),
                name: "Overclocked Network".into(),
                description: "Awakened Machina share targeting solutions: party damage +10%."
                    .into(),
                active: true,
                members,
                modifiers: vec![BondModifier {
                    scope: BondScope::Party,
                    effect: BondEffect::OutgoingDamageMul(1.10),
                }],
            },
            Faction::Unaligned => continue,
        };
        bonds.push(bond);
    }

    // Stable output order regardless of hash iteration
    bonds.sort_by(|a, b| a.id.0.cmp(&b.id.0));
    bonds
}

fn pair_bonds(party: &[&Combatant]) -> Vec<Bond> {
    let present = |id: &str| party.iter().any(|c| c.id.as_str() == id);
    let mut bonds = Vec::new();

    if present("linque") && present("luoshu") {
        bonds.push(Bond {
            id: BondId::new("bond_archive_of_dawn"),
            name: "Archive of Dawn".into(),
            description: "Luoshu's records sharpen Linque's edge, and vice versa: \
                          attack +20% for both."
                .into(),
            active: true,
            members: vec![CombatantId::from("linque"), CombatantId::from("luoshu")],
            modifiers: vec![
                BondModifier {
                    scope: BondScope::Member(CombatantId::from("linque")),
                    effect: BondEffect::AttackMul(1.20),
                },
                BondModifier {
                    scope: BondScope::Member(CombatantId::from("luoshu")),
                    effect: BondEffect::AttackMul(1.20),
                },
            ],
        });
    }

    if present("helga") && present("zizhi") {
        bonds.push(Bond {
            id: BondId::new("bond_scrap_and_steel"),
            name: "Scrap and Steel".into(),
            description: "Zizhi spots weak points for Helga and hides behind her plating: \
                          Helga crit damage +30%, Zizhi takes 30% less damage."
                .into(),
            active: true,
            members: vec![CombatantId::from("helga"), CombatantId::from("zizhi")],
            modifiers: vec![
                BondModifier {
                    scope: BondScope::Member(CombatantId::from("helga")),
                    effect: BondEffect::CritDamageAdd(0.30),
                },
                BondModifier {
                    scope: BondScope::Member(CombatantId::from("zizhi")),
                    effect: BondEffect::IncomingDamageMul(0.70),
                },
            ],
        });
    }

    if present("linque") && present("kiana") {
        bonds.push(Bond {
            id: BondId::new("bond_twin_resonance"),
            name: "Twin Resonance".into(),
            description: "Kiana draws strength from Linque's link at Linque's expense: \
                          Kiana deals +30% damage, Linque takes +20% damage."
                .into(),
            active: true,
            members: vec![CombatantId::from("linque"), CombatantId::from("kiana")],
            modifiers: vec![
                BondModifier {
                    scope: BondScope::Member(CombatantId::from("kiana")),
                    effect: BondEffect::OutgoingDamageMul(1.30),
                },
                BondModifier {
                    scope: BondScope::Member(CombatantId::from("linque")),
                    effect: BondEffect::IncomingDamageMul(1.20),
                },
            ],
        });
    }

    if present("luoshu") && present("uni") {
        bonds.push(Bond {
            id: BondId::new("bond_quiet_maintenance"),
            name: "Quiet Maintenance".into(),
            description: "Routine diagnostics between rounds: both recover 5% max HP \
                          each full rotation."
                .into(),
            active: true,
            members: vec![CombatantId::from("luoshu"), CombatantId::from("uni")],
            modifiers: vec![
                BondModifier {
                    scope: BondScope::Member(CombatantId::from("luoshu")),
                    effect: BondEffect::RoundHeal(0.05),
                },
                BondModifier {
                    scope: BondScope::Member(CombatantId::from("uni")),
                    effect: BondEffect::RoundHeal(0.05),
                },
            ],
        });
    }

    bonds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::definitions;

    fn roster_with_enemy(mut party: Vec<Combatant>) -> Vec<Combatant> {
        party.push(definitions::shadow_knight());
        party
    }

    #[test]
    fn test_faction_bond_requires_two_members() {
        // Linque alone: Dawn Legacy count is 1, no faction bond
        let roster = roster_with_enemy(vec![definitions::linque()]);
        let bonds = evaluate_bonds(&roster);
        assert!(!bonds.iter().any(|b| b.id.0 == "bond_dawn_legacy"));

        // Linque + Luoshu: exactly 2, bond unlocks
        let roster = roster_with_enemy(vec![definitions::linque(), definitions::luoshu()]);
        let bonds = evaluate_bonds(&roster);
        let bond = bonds
            .iter()
            .find(|b| b.id.0 == "bond_dawn_legacy")
            .expect("faction bond should unlock at 2 members");
        assert!(bond.active);
        assert_eq!(bond.members.len(), 2);
    }

    #[test]
    fn test_default_party_unlocks_expected_bonds() {
        let roster = roster_with_enemy(definitions::default_party());
        let bonds = evaluate_bonds(&roster);
        let ids: Vec<&str> = bonds.iter().map(|b| b.id.0.as_str()).collect();
        assert!(ids.contains(&"bond_dawn_legacy"));
        assert!(ids.contains(&"bond_archive_of_dawn"));
        assert!(ids.contains(&"bond_scrap_and_steel"));
        // Single Crimson Heavy member is not enough
        assert!(!ids.contains(&"bond_crimson_heavy"));
    }

    #[test]
    fn test_attacker_totals_stack_multiplicatively() {
        let roster = roster_with_enemy(definitions::default_party());
        let bonds = evaluate_bonds(&roster);
        let linque = &roster[0];
        let totals = attacker_totals(&bonds, linque);
        // Archive of Dawn: attack x1.2 for Linque
        assert!((totals.attack_mul - 1.20).abs() < 1e-6);
        assert_eq!(totals.crit_rate_add, 0.0);
    }

    #[test]
    fn test_defender_totals_for_party_member() {
        let roster = roster_with_enemy(definitions::default_party());
        let bonds = evaluate_bonds(&roster);
        let zizhi = roster.iter().find(|c| c.id.as_str() == "zizhi").unwrap();
        let totals = defender_totals(&bonds, zizhi);
        // Legacy Accord: defense x1.15; Scrap and Steel: incoming x0.7
        assert!((totals.defense_mul - 1.15).abs() < 1e-6);
        assert!((totals.incoming_mul - 0.70).abs() < 1e-6);
    }

    #[test]
    fn test_enemy_side_debuff_reaches_enemy_defender_only() {
        // Two Deep Dive members to unlock the enemy-defense debuff
        let mut simon = definitions::linque();
        simon.id = CombatantId::from("simon");
        simon.faction = Faction::DeepDive;
        let mut second = definitions::luoshu();
        second.id = CombatantId::from("pressure_twin");
        second.faction = Faction::DeepDive;

        let roster = roster_with_enemy(vec![simon, second]);
        let bonds = evaluate_bonds(&roster);
        assert!(bonds.iter().any(|b| b.id.0 == "bond_deep_dive"));

        let enemy = roster.iter().find(|c| c.side == Side::Enemy).unwrap();
        let enemy_totals = defender_totals(&bonds, enemy);
        assert!((enemy_totals.defense_mul - 0.90).abs() < 1e-6);

        let member = &roster[0];
        let member_totals = defender_totals(&bonds, member);
        assert!((member_totals.defense_mul - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_round_heals_collects_pair_fractions() {
        let roster = roster_with_enemy(vec![definitions::luoshu(), definitions::uni()]);
        let bonds = evaluate_bonds(&roster);

        let heals = round_heals(&bonds);
        assert_eq!(heals.len(), 2);
        assert!(heals
            .iter()
            .any(|(id, f)| id.as_str() == "luoshu" && (*f - 0.05).abs() < 1e-6));
    }

    #[test]
    fn test_twin_resonance_trades_power_for_exposure() {
        let roster = roster_with_enemy(vec![definitions::linque(), definitions::kiana()]);
        let bonds = evaluate_bonds(&roster);
        assert!(bonds.iter().any(|b| b.id.0 == "bond_twin_resonance"));

        let kiana = roster.iter().find(|c| c.id.as_str() == "kiana").unwrap();
        let linque = &roster[0];
        assert!((attacker_totals(&bonds, kiana).outgoing_mul - 1.30).abs() < 1e-6);
        assert!((defender_totals(&bonds, linque).incoming_mul - 1.20).abs() < 1e-6);
    }

    #[test]
    fn test_evasion_chance_comes_from_drifter_pair() {
        let mut second = definitions::linque();
        second.id = CombatantId::from("drifter_two");
        second.faction = Faction::WastelandDrifters;
        let roster = roster_with_enemy(vec![definitions::zizhi(), second]);
        let bonds = evaluate_bonds(&roster);

        let defender = &roster[0];
        let totals = defender_totals(&bonds, defender);
        assert!((totals.evasion_chance - 0.15).abs() < 1e-6);
    }
}
