//! Built-in cast
//!
//! Default combatants used by the binary and by integration tests when
//! no roster directory is supplied. Stat lines mirror the reference
//! balance pass: party attack 250-350, defense 150-250, boss HP in the
//! thousands.

use crate::core::types::{Faction, Side};
use crate::roster::combatant::{BattleLines, Combatant, Stats};
use crate::roster::skill::{Effect, EffectTarget, RiskLevel, Skill};

pub fn linque() -> Combatant {
    let skills = vec![
        Skill::strike("prism_slash", "Prism Slash", 1.1)
            .with_description("Switches the resonance prism to twin-blade mode for a precise cut.")
            .with_risk(RiskLevel::Low),
        Skill::new(
            "shattered_echo",
            "Shattered Echo",
            vec![
                Effect::Damage {
                    multiplier: 2.8,
                    target: EffectTarget::Enemy,
                },
                Effect::SelfDamage { fraction: 0.05 },
            ],
        )
        .with_description("Overclocks the mind-link for a burst of force. Mild recoil.")
        .with_risk(RiskLevel::High),
        Skill::new("prism_barrier", "Prism Barrier", vec![Effect::DefenseStance])
            .with_description("Unfolds the prism into a hexagonal shield array.")
            .with_risk(RiskLevel::Low),
        Skill::mend("glimmer_mend", "Glimmer Mend", 0.35)
            .with_description("Resonance pulse that accelerates nano-repair.")
            .with_risk(RiskLevel::Low),
    ];
    Combatant::new(
        "linque",
        "Linque",
        Side::Party,
        Faction::DawnLegacy,
        1150,
        Stats {
            level: 50,
            attack: 310.0,
            defense: 180.0,
            crit_rate: 0.2,
            crit_damage: 0.6,
            speed: 120.0,
        },
        skills,
    )
    .with_persona(
        "Cold and sharp-tongued on the surface, fiercely loyal underneath. \
         Masks doubts about her own origin with studied nonchalance.",
        "Curt and dry, with a hidden soft spot. Calls the player 'partner'.",
    )
}

pub fn luoshu() -> Combatant {
    let skills = vec![
        Skill::strike("luoshu_record", "Data Inscription", 0.8)
            .with_description("Tags the target with tracking glyphs while striking.")
            .with_risk(RiskLevel::Low),
        Skill::new(
            "luoshu_threshold",
            "Absolute Threshold",
            vec![Effect::BuffDefense { fraction: 0.6 }],
        )
        .with_description("Projects a hard limit no attack is supposed to cross.")
        .with_risk(RiskLevel::Low),
        Skill::mend("luoshu_rollback", "Rollback Protocol", 0.2)
            .with_description("Reverts recent damage from an archived snapshot.")
            .with_risk(RiskLevel::Low),
        Skill::strike("luoshu_stasis", "Stasis Field", 1.2)
            .with_description("Crushes the target under a localized time-drag field.")
            .with_risk(RiskLevel::Medium),
    ];
    Combatant::new(
        "luoshu",
        "Luoshu",
        Side::Party,
        Faction::DawnLegacy,
        1400,
        Stats {
            level: 50,
            attack: 250.0,
            defense: 250.0,
            crit_rate: 0.1,
            crit_damage: 0.5,
            speed: 95.0,
        },
        skills,
    )
    .with_persona(
        "An archivist intelligence wearing a calm, bookish face. Treats \
         every battle as data to be curated.",
        "Measured and precise, fond of library metaphors.",
    )
}

pub fn helga() -> Combatant {
    let skills = vec![
        Skill::strike("helga_heavy_slash", "Burst Cleave", 1.5)
            .with_description("A full-weight swing of the thermal greatblade.")
            .with_risk(RiskLevel::Low),
        Skill::strike("helga_full_burst", "Full Barrage", 2.0)
            .with_description("Empties every shoulder rack at once.")
            .with_risk(RiskLevel::Medium),
        Skill::new(
            "helga_overload",
            "Overload Mode",
            vec![Effect::BuffAttack { fraction: 0.5 }],
        )
        .with_description("Redlines the reactor for the next engagement window.")
        .with_risk(RiskLevel::Medium),
        Skill::strike("helga_execute", "Execution Order", 2.8)
            .with_description("Point-blank finisher reserved for staggered targets.")
            .with_risk(RiskLevel::High),
    ];
    Combatant::new(
        "helga",
        "Helga",
        Side::Party,
        Faction::CrimsonHeavy,
        1300,
        Stats {
            level: 50,
            attack: 350.0,
            defense: 150.0,
            crit_rate: 0.25,
            crit_damage: 0.6,
            speed: 105.0,
        },
        skills,
    )
    .with_persona(
        "A decommissioned siege-frame pilot who never filed the paperwork. \
         Loud, direct, allergic to retreat.",
        "Blunt and booming, punctuates sentences with weapon noises.",
    )
}

pub fn zizhi() -> Combatant {
    let skills = vec![
        Skill::strike("zizhi_jam", "Static Jam", 0.5)
            .with_description("Floods the target's sensors with junk signal.")
            .with_risk(RiskLevel::Low),
        Skill::new(
            "zizhi_steal",
            "Energy Siphon",
            vec![
                Effect::Damage {
                    multiplier: 0.8,
                    target: EffectTarget::Enemy,
                },
                Effect::Heal {
                    fraction: 0.1,
                    target: EffectTarget::User,
                },
            ],
        )
        .with_description("Taps the target's power bus and drinks from it.")
        .with_risk(RiskLevel::Medium),
        Skill::strike("zizhi_backdoor", "System Backdoor", 1.2)
            .with_description("Exploits a maintenance port nobody patched.")
            .with_risk(RiskLevel::Medium),
        Skill::mend("zizhi_blindbox", "Lucky Blindbox", 0.3)
            .with_description("Rummages scavenged parts for something useful.")
            .with_risk(RiskLevel::Low),
    ];
    Combatant::new(
        "zizhi",
        "Zizhi",
        Side::Party,
        Faction::WastelandDrifters,
        1000,
        Stats {
            level: 50,
            attack: 280.0,
            defense: 160.0,
            crit_rate: 0.15,
            crit_damage: 0.5,
            speed: 135.0,
        },
        skills,
    )
    .with_persona(
        "A scavenger rat-genius from the dust belt, equal parts greed and \
         glee. Collects enemy tech mid-fight.",
        "Fast, chirpy, bargains with everyone including enemies.",
    )
}

pub fn kiana() -> Combatant {
    let skills = vec![
        Skill::strike("skill_basic", "Twin Shot", 1.0)
            .with_description("Quick paired pistol fire.")
            .with_risk(RiskLevel::Low),
        Skill::strike("skill_strong", "Spin Kick", 2.2)
            .with_description("A close-quarters roundhouse with real weight behind it.")
            .with_risk(RiskLevel::Medium),
        Skill::strike("skill_ult", "Gungnir Burst", 3.5)
            .with_description("An all-or-nothing cannon shot.")
            .with_risk(RiskLevel::High),
        Skill::new(
            "skill_def",
            "Imaginary Barrier",
            vec![
                Effect::DefenseStance,
                Effect::Heal {
                    fraction: 0.05,
                    target: EffectTarget::User,
                },
            ],
        )
        .with_description("Raises a shield and catches a breath behind it.")
        .with_risk(RiskLevel::Low),
        Skill::mend("skill_heal", "Emergency Rations", 0.3)
            .with_description("Eats the snacks stashed for exactly this moment.")
            .with_risk(RiskLevel::Low),
    ];
    Combatant::new(
        "kiana",
        "Kiana",
        Side::Party,
        Faction::Unaligned,
        1200,
        Stats {
            level: 50,
            attack: 300.0,
            defense: 200.0,
            crit_rate: 0.15,
            crit_damage: 0.5,
            speed: 115.0,
        },
        skills,
    )
    .with_persona(
        "Hot-blooded, impulsive, fiercely protective of her squad.",
        "Bursting with energy, loves exclamation marks. Calls the player 'captain'.",
    )
}

pub fn uni() -> Combatant {
    let skills = vec![
        Skill::mend("uni_heal", "Healing Wavelength", 0.3)
            .with_description("A restorative chord tuned to friendly frequencies.")
            .with_risk(RiskLevel::Low),
        Skill::new(
            "uni_beat",
            "Rising Beat",
            vec![Effect::BuffAttack { fraction: 0.2 }],
        )
        .with_description("Drops a tempo the whole party fights faster to.")
        .with_risk(RiskLevel::Low),
        Skill::strike("uni_glitch", "Glitch Static", 0.8)
            .with_description("A screech of corrupted audio aimed at enemy sensors.")
            .with_risk(RiskLevel::Low),
        Skill::new(
            "uni_encore",
            "Curtain Call",
            vec![
                Effect::Heal {
                    fraction: 0.8,
                    target: EffectTarget::User,
                },
                Effect::SelfDamage { fraction: 0.2 },
            ],
        )
        .with_description("Burns through reserve cells for a dramatic recovery.")
        .with_risk(RiskLevel::Medium),
    ];
    Combatant::new(
        "uni",
        "Uni",
        Side::Party,
        Faction::AiAwakened,
        1100,
        Stats {
            level: 50,
            attack: 260.0,
            defense: 160.0,
            crit_rate: 0.1,
            crit_damage: 0.5,
            speed: 100.0,
        },
        skills,
    )
    .with_persona(
        "An idol-unit intelligence that treats every battle as a live show.",
        "Sings half her sentences, addresses the party as her audience.",
    )
}

pub fn shadow_knight() -> Combatant {
    let skills = vec![
        Skill::strike("enemy_atk", "Shadow Slash", 1.0)
            .with_description("A sweeping cut trailing black haze."),
        Skill::strike("enemy_strong", "Abyssal Thrust", 1.8)
            .with_description("A piercing lunge from the void."),
    ];
    Combatant::new(
        "shadow_knight",
        "Shadow Knight",
        Side::Enemy,
        Faction::Unaligned,
        5000,
        Stats {
            level: 55,
            attack: 280.0,
            defense: 400.0,
            crit_rate: 0.1,
            crit_damage: 0.5,
            speed: 110.0,
        },
        skills,
    )
    .with_battle_lines(BattleLines {
        start: vec!["Another challenger. The dark does not forget.".into()],
        skill: vec![
            "Kneel.".into(),
            "The abyss reaches for you.".into(),
        ],
        hit: vec!["...a scratch.".into()],
        defeat: vec!["Impossible... the dark... recedes...".into()],
    })
}

pub fn void_stalker() -> Combatant {
    let skills = vec![
        Skill::strike("stalker_claw", "Phase Claw", 1.2)
            .with_description("Claws that arrive before the silhouette does."),
        Skill::strike("stalker_ambush", "Blink Ambush", 2.2)
            .with_description("Re-enters realspace behind the target."),
    ];
    Combatant::new(
        "void_stalker",
        "Void Stalker",
        Side::Enemy,
        Faction::Unaligned,
        1800,
        Stats {
            level: 50,
            attack: 220.0,
            defense: 80.0,
            crit_rate: 0.35,
            crit_damage: 0.6,
            speed: 135.0,
        },
        skills,
    )
    .with_battle_lines(BattleLines {
        start: vec!["A skittering laugh echoes from nowhere.".into()],
        skill: vec!["It flickers out of sight.".into()],
        hit: vec![],
        defeat: vec!["The stalker dissolves into static.".into()],
    })
}

pub fn abyssal_monarch() -> Combatant {
    let skills = vec![
        Skill::strike("monarch_decree", "Sunken Decree", 1.0)
            .with_description("Pressure of the deep given the weight of law."),
        Skill::new(
            "monarch_tide",
            "Devouring Tide",
            vec![
                Effect::Damage {
                    multiplier: 1.6,
                    target: EffectTarget::Enemy,
                },
                Effect::Heal {
                    fraction: 0.05,
                    target: EffectTarget::User,
                },
            ],
        )
        .with_description("The tide takes, and the monarch keeps."),
    ];
    Combatant::new(
        "abyssal_monarch",
        "Abyssal Monarch",
        Side::Enemy,
        Faction::Unaligned,
        2500,
        Stats {
            level: 70,
            attack: 200.0,
            defense: 150.0,
            crit_rate: 0.05,
            crit_damage: 0.5,
            speed: 85.0,
        },
        skills,
    )
}

/// Default four-member party
pub fn default_party() -> Vec<Combatant> {
    vec![linque(), luoshu(), helga(), zizhi()]
}

/// Every selectable party member
pub fn available_party() -> Vec<Combatant> {
    vec![linque(), luoshu(), helga(), zizhi(), kiana(), uni()]
}

/// Look up a built-in enemy by id
pub fn enemy_by_id(id: &str) -> Option<Combatant> {
    match id {
        "shadow_knight" => Some(shadow_knight()),
        "void_stalker" => Some(void_stalker()),
        "abyssal_monarch" => Some(abyssal_monarch()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::combatant::validate_roster;

    #[test]
    fn test_default_cast_is_valid() {
        let mut roster = default_party();
        roster.push(shadow_knight());
        validate_roster(&roster).unwrap();
    }

    #[test]
    fn test_all_enemies_are_valid() {
        for id in ["shadow_knight", "void_stalker", "abyssal_monarch"] {
            let enemy = enemy_by_id(id).unwrap();
            assert_eq!(enemy.side, Side::Enemy);
            assert!(!enemy.skills.is_empty());
        }
        assert!(enemy_by_id("nonexistent").is_none());
    }

    #[test]
    fn test_full_selectable_cast_is_valid() {
        let mut roster = available_party();
        roster.push(void_stalker());
        validate_roster(&roster).unwrap();
    }

    #[test]
    fn test_party_covers_two_dawn_legacy_members() {
        let party = default_party();
        let dawn = party
            .iter()
            .filter(|c| c.faction == Faction::DawnLegacy)
            .count();
        assert_eq!(dawn, 2);
    }
}
