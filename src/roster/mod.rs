//! Roster model: combatants, skills, static definitions
//!
//! In-memory records for every combatant in a battle. Created once at
//! battle start from static data, mutated only by resolved actions and
//! scheduler resets.

pub mod combatant;
pub mod definitions;
pub mod loader;
pub mod skill;

pub use combatant::{validate_roster, BattleLines, Combatant, Stats};
pub use loader::{load_roster_dir, parse_combatant_toml, CombatantDef};
pub use skill::{Effect, EffectTarget, RiskLevel, Skill};
