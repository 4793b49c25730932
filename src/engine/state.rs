//! Battle state snapshot
//!
//! The snapshot is the only shared mutable resource in the engine.
//! Transitions never mutate in place: each one clones the previous
//! snapshot and returns a new value, so the log, the scheduler and the
//! outcome check always observe a consistent world and a battle can be
//! replayed event by event.

use crate::bonds::{evaluate_bonds, Bond};
use crate::core::error::{EngineError, Result};
use crate::core::types::{BattleId, CombatantId, Side, Turn};
use crate::roster::combatant::{validate_roster, Combatant};
use serde::{Deserialize, Serialize};

/// Phases of the turn state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    Start,
    /// Picking the next actor and refreshing the look-ahead queue
    Scheduling,
    /// Waiting for a skill id or a free-text command
    PlayerDecision,
    /// A decision request is in flight; further input is rejected
    AiProcessing,
    /// The acting hostile is choosing its move
    EnemyDecision,
    /// Applying a resolved action to the roster
    Resolving,
    Victory,
    Defeat,
}

impl BattlePhase {
    /// Terminal phases accept no further scheduling or input
    pub fn is_terminal(&self) -> bool {
        matches!(self, BattlePhase::Victory | BattlePhase::Defeat)
    }
}

/// Attribution for a combat log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    System,
    Player,
    Enemy,
}

/// One line of the ordered battle log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleLogEntry {
    /// Monotonic, unique within a battle
    pub id: u64,
    pub turn: Turn,
    pub speaker: Speaker,
    pub message: String,
    pub crit: bool,
    /// True while a decision's narrative text is still arriving
    pub streaming: bool,
}

/// Full battle snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleState {
    pub battle_id: BattleId,
    pub turn: Turn,
    pub phase: BattlePhase,
    pub roster: Vec<Combatant>,
    pub logs: Vec<BattleLogEntry>,
    pub bonds: Vec<Bond>,
    /// Look-ahead queue: current actor plus upcoming turns, display only
    pub action_queue: Vec<CombatantId>,
    /// The combatant whose turn is being decided or resolved
    pub active: Option<CombatantId>,
    /// True while a decision request is outstanding
    pub processing: bool,
    pub(crate) next_log_id: u64,
    /// Who has acted since the turn counter last advanced
    pub(crate) acted_this_round: Vec<CombatantId>,
}

impl BattleState {
    /// Build the opening snapshot: validate the roster, evaluate the
    /// bond rule table once, and wait in `Start`.
    pub fn new(roster: Vec<Combatant>) -> Result<Self> {
        validate_roster(&roster)?;
        let bonds = evaluate_bonds(&roster);
        Ok(Self {
            battle_id: BattleId::new(),
            turn: 1,
            phase: BattlePhase::Start,
            roster,
            logs: Vec::new(),
            bonds,
            action_queue: Vec::new(),
            active: None,
            processing: false,
            next_log_id: 0,
            acted_this_round: Vec::new(),
        })
    }

    pub fn combatant(&self, id: &CombatantId) -> Result<&Combatant> {
        self.roster
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| EngineError::UnknownCombatant(id.clone()))
    }

    pub fn combatant_mut(&mut self, id: &CombatantId) -> Result<&mut Combatant> {
        self.roster
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| EngineError::UnknownCombatant(id.clone()))
    }

    pub fn living(&self, side: Side) -> impl Iterator<Item = &Combatant> {
        self.roster
            .iter()
            .filter(move |c| c.side == side && !c.is_defeated())
    }

    pub fn party(&self) -> impl Iterator<Item = &Combatant> {
        self.roster.iter().filter(|c| c.side == Side::Party)
    }

    pub fn enemies(&self) -> impl Iterator<Item = &Combatant> {
        self.roster.iter().filter(|c| c.side == Side::Enemy)
    }

    /// Append a log entry, assigning the next monotonic id
    pub(crate) fn push_log(&mut self, speaker: Speaker, message: String, crit: bool) -> u64 {
        let id = self.next_log_id;
        self.next_log_id += 1;
        self.logs.push(BattleLogEntry {
            id,
            turn: self.turn,
            speaker,
            message,
            crit,
            streaming: false,
        });
        id
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::definitions;

    fn default_state() -> BattleState {
        let mut roster = definitions::default_party();
        roster.push(definitions::shadow_knight());
        BattleState::new(roster).unwrap()
    }

    #[test]
    fn test_new_state_starts_clean() {
        let state = default_state();
        assert_eq!(state.phase, BattlePhase::Start);
        assert_eq!(state.turn, 1);
        assert!(state.logs.is_empty());
        assert!(!state.processing);
        assert!(state.active.is_none());
    }

    #[test]
    fn test_new_state_computes_bonds_once() {
        let state = default_state();
        assert!(state.bonds.iter().any(|b| b.id.0 == "bond_dawn_legacy"));
    }

    #[test]
    fn test_new_state_rejects_invalid_roster() {
        let mut roster = definitions::default_party();
        roster.push(definitions::shadow_knight());
        roster[0].stats.speed = -1.0;
        assert!(BattleState::new(roster).is_err());
    }

    #[test]
    fn test_log_ids_are_monotonic() {
        let mut state = default_state();
        let a = state.push_log(Speaker::System, "one".into(), false);
        let b = state.push_log(Speaker::Player, "two".into(), false);
        let c = state.push_log(Speaker::Enemy, "three".into(), false);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(BattlePhase::Victory.is_terminal());
        assert!(BattlePhase::Defeat.is_terminal());
        assert!(!BattlePhase::Scheduling.is_terminal());
        assert!(!BattlePhase::PlayerDecision.is_terminal());
    }

    #[test]
    fn test_living_filters_defeated() {
        let mut state = default_state();
        let id = state.roster[0].id.clone();
        state.combatant_mut(&id).unwrap().current_hp = 0;
        let living: Vec<_> = state.living(Side::Party).collect();
        assert_eq!(living.len(), 3);
    }
}
