//! Pure state transitions
//!
//! Every function here is `(old snapshot, inputs) -> new snapshot`.
//! Randomness stays outside: enemy choices and resolver rolls happen in
//! the runner, which feeds their results in as plain values. That keeps
//! each transition replayable and unit-testable on its own.

use crate::bonds::round_heals;
use crate::core::config::EngineConfig;
use crate::core::types::{CombatantId, Side};
use crate::engine::state::{BattlePhase, BattleState, Speaker};
use crate::resolver::SkillOutcome;
use crate::scheduler;

/// Leave `Start`: log the opener and any enemy entrance lines, then
/// hand control to the scheduler.
pub fn begin(state: &BattleState) -> BattleState {
    let mut next = state.clone();
    let enemy_names: Vec<String> = next.enemies().map(|c| c.name.clone()).collect();
    next.push_log(
        Speaker::System,
        format!("Battle begins! {} stands in the way!", enemy_names.join(", ")),
        false,
    );

    let entrance_lines: Vec<String> = next
        .enemies()
        .filter_map(|c| c.battle_lines.start.first().cloned())
        .collect();
    for line in entrance_lines {
        next.push_log(Speaker::Enemy, line, false);
    }

    let bond_lines: Vec<String> = next
        .bonds
        .iter()
        .filter(|b| b.active)
        .map(|b| format!("Bond unlocked: {} - {}", b.name, b.description))
        .collect();
    for line in bond_lines {
        next.push_log(Speaker::System, line, false);
    }

    next.phase = BattlePhase::Scheduling;
    next
}

/// Run one scheduler tick: normalize the timeline, pick the active
/// actor, refresh the look-ahead queue, and move to the matching
/// decision phase. A terminal snapshot passes through untouched.
pub fn schedule(state: &BattleState, config: &EngineConfig) -> BattleState {
    if state.is_terminal() {
        return state.clone();
    }

    let mut next = state.clone();
    next.phase = BattlePhase::Scheduling;
    next.processing = false;

    let Some(active) = scheduler::advance(&mut next.roster, config) else {
        // Nobody left alive; the outcome check should have fired first.
        next.active = None;
        next.action_queue.clear();
        return next;
    };

    next.action_queue = scheduler::preview(&next.roster, &active, config, config.queue_preview);
    let side = next
        .roster
        .iter()
        .find(|c| c.id == active)
        .map(|c| c.side)
        .unwrap_or(Side::Party);
    next.phase = match side {
        Side::Party => BattlePhase::PlayerDecision,
        Side::Enemy => BattlePhase::EnemyDecision,
    };
    next.active = Some(active);
    next
}

/// Record the player's raw command and enter the processing sub-state.
/// While `processing` is set, exactly one decision request is
/// outstanding and further input is rejected upstream.
pub fn log_player_command(state: &BattleState, text: &str) -> BattleState {
    let mut next = state.clone();
    next.push_log(Speaker::Player, format!("\"{}\"", text), false);
    next.processing = true;
    next.phase = BattlePhase::AiProcessing;
    next
}

/// Upsert the streaming narrative entry with a grown partial string.
/// Partials only ever affect display; the chosen skill comes from the
/// final decision value.
pub fn stream_narrative(state: &BattleState, partial: &str) -> BattleState {
    let mut next = state.clone();
    if let Some(entry) = next.logs.iter_mut().rev().find(|e| e.streaming) {
        entry.message = partial.to_string();
    } else {
        let id = next.push_log(Speaker::System, partial.to_string(), false);
        if let Some(entry) = next.logs.iter_mut().find(|e| e.id == id) {
            entry.streaming = true;
        }
    }
    next
}

/// Replace the streaming entry with the final flushed narrative
pub fn finish_narrative(state: &BattleState, final_text: &str) -> BattleState {
    let mut next = state.clone();
    if let Some(entry) = next.logs.iter_mut().rev().find(|e| e.streaming) {
        entry.message = final_text.to_string();
        entry.streaming = false;
    } else if !final_text.is_empty() {
        next.push_log(Speaker::System, final_text.to_string(), false);
    }
    next
}

/// Log the generic disruption line used whenever a decision fails or
/// names a skill nobody has. The battle continues on the fallback
/// skill; no raw error ever reaches the player.
pub fn decision_disrupted(state: &BattleState) -> BattleState {
    let mut next = finish_narrative(state, "");
    next.push_log(
        Speaker::System,
        "Communication disrupted... falling back on instinct.".into(),
        false,
    );
    next
}

/// Append an attributed one-liner (enemy battle lines, skill shouts)
pub fn log_line(state: &BattleState, speaker: Speaker, text: &str) -> BattleState {
    let mut next = state.clone();
    next.push_log(speaker, text.to_string(), false);
    next
}

/// Apply a resolved action: clamped HP changes, log lines, scheduler
/// reset, round bookkeeping, and the outcome check. HP changes are
/// fully applied before this function returns, so the outcome check
/// and the next scheduling tick always see them.
pub fn apply_resolution(
    state: &BattleState,
    actor_id: &CombatantId,
    target_id: &CombatantId,
    outcome: &SkillOutcome,
    config: &EngineConfig,
) -> BattleState {
    let mut next = state.clone();
    next.phase = BattlePhase::Resolving;
    next.processing = false;

    let actor_side = next
        .roster
        .iter()
        .find(|c| &c.id == actor_id)
        .map(|c| c.side)
        .unwrap_or(Side::Party);
    let speaker = match actor_side {
        Side::Party => Speaker::System,
        Side::Enemy => Speaker::Enemy,
    };

    for line in &outcome.lines {
        next.push_log(speaker, line.text.clone(), line.crit);
    }

    if let Ok(target) = next.combatant_mut(target_id) {
        target.apply_damage(outcome.damage);
    }
    if let Ok(actor) = next.combatant_mut(actor_id) {
        actor.apply_heal(outcome.heal);
    }

    let defeated = next
        .combatant(target_id)
        .ok()
        .filter(|t| t.is_defeated())
        .map(|t| (t.name.clone(), t.battle_lines.defeat.first().cloned()));
    if let Some((name, farewell)) = defeated {
        if let Some(line) = farewell {
            next.push_log(Speaker::Enemy, line, false);
        }
        next.push_log(Speaker::System, format!("{} falls!", name), false);
    }

    scheduler::reset_actor(&mut next.roster, actor_id, config);

    // Turn counter advances once per full rotation: when every living
    // combatant has acted since the last bump.
    if !next.acted_this_round.contains(actor_id) {
        next.acted_this_round.push(actor_id.clone());
    }
    let all_acted = next
        .roster
        .iter()
        .filter(|c| !c.is_defeated())
        .all(|c| next.acted_this_round.contains(&c.id));
    if all_acted {
        next.turn += 1;
        next.acted_this_round.clear();
        apply_round_heals(&mut next);
    }

    check_outcome(&mut next);
    if !next.is_terminal() {
        next.phase = BattlePhase::Scheduling;
    }
    next
}

fn apply_round_heals(state: &mut BattleState) {
    let heals = round_heals(&state.bonds);
    for (id, fraction) in heals {
        let Ok(member) = state.combatant_mut(&id) else {
            continue;
        };
        if member.is_defeated() {
            continue;
        }
        let amount = (member.max_hp as f32 * fraction).floor() as i32;
        let gained = member.apply_heal(amount);
        if gained > 0 {
            let name = member.name.clone();
            state.push_log(
                Speaker::System,
                format!("{} recovers {} HP from their bond.", name, gained),
                false,
            );
        }
    }
}

fn check_outcome(state: &mut BattleState) {
    let enemies_standing = state.living(Side::Enemy).count();
    let party_standing = state.living(Side::Party).count();

    if enemies_standing == 0 {
        state.push_log(
            Speaker::System,
            "All hostiles are down. Victory!".into(),
            false,
        );
        state.phase = BattlePhase::Victory;
    } else if party_standing == 0 {
        state.push_log(
            Speaker::System,
            "The party has fallen... Defeat.".into(),
            false,
        );
        state.phase = BattlePhase::Defeat;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::LogLine;
    use crate::roster::definitions;

    fn opening_state() -> BattleState {
        let mut roster = definitions::default_party();
        roster.push(definitions::shadow_knight());
        BattleState::new(roster).unwrap()
    }

    fn damage_outcome(damage: i32) -> SkillOutcome {
        SkillOutcome {
            damage,
            heal: 0,
            crit: false,
            dodged: false,
            lines: vec![LogLine {
                text: format!("hit for {}", damage),
                crit: false,
                diagnostic: false,
            }],
        }
    }

    #[test]
    fn test_begin_logs_opener_and_bonds() {
        let state = opening_state();
        let next = begin(&state);
        assert_eq!(next.phase, BattlePhase::Scheduling);
        assert!(next.logs[0].message.contains("Battle begins"));
        assert!(next
            .logs
            .iter()
            .any(|l| l.message.contains("Bond unlocked")));
        // The input snapshot is untouched
        assert!(state.logs.is_empty());
    }

    #[test]
    fn test_schedule_picks_fastest_and_sets_phase() {
        let config = EngineConfig::default();
        let state = begin(&opening_state());
        let next = schedule(&state, &config);
        // Zizhi at speed 135 outruns everyone, including the enemy
        assert_eq!(next.active.as_ref().unwrap().as_str(), "zizhi");
        assert_eq!(next.phase, BattlePhase::PlayerDecision);
        assert_eq!(next.action_queue.len(), config.queue_preview);
        assert_eq!(next.action_queue[0].as_str(), "zizhi");
    }

    #[test]
    fn test_schedule_on_terminal_state_is_a_no_op() {
        let config = EngineConfig::default();
        let mut state = opening_state();
        state.phase = BattlePhase::Victory;
        let next = schedule(&state, &config);
        assert_eq!(next.phase, BattlePhase::Victory);
        assert!(next.active.is_none());
    }

    #[test]
    fn test_player_command_enters_processing() {
        let state = opening_state();
        let next = log_player_command(&state, "hit him hard");
        assert!(next.processing);
        assert_eq!(next.phase, BattlePhase::AiProcessing);
        let last = next.logs.last().unwrap();
        assert_eq!(last.speaker, Speaker::Player);
        assert!(last.message.contains("hit him hard"));
    }

    #[test]
    fn test_stream_narrative_grows_one_entry() {
        let state = opening_state();
        let a = stream_narrative(&state, "Under");
        let b = stream_narrative(&a, "Understood, partner");
        let streaming: Vec<_> = b.logs.iter().filter(|l| l.streaming).collect();
        assert_eq!(streaming.len(), 1);
        assert_eq!(streaming[0].message, "Understood, partner");

        let done = finish_narrative(&b, "Understood, partner. Prism out.");
        assert!(done.logs.iter().all(|l| !l.streaming));
        assert!(done
            .logs
            .iter()
            .any(|l| l.message.ends_with("Prism out.")));
    }

    #[test]
    fn test_apply_resolution_clamps_and_resets() {
        let config = EngineConfig::default();
        let state = schedule(&begin(&opening_state()), &config);
        let actor = state.active.clone().unwrap();
        let target = CombatantId::from("shadow_knight");

        let next = apply_resolution(&state, &actor, &target, &damage_outcome(99_999), &config);
        let knight = next.combatant(&target).unwrap();
        assert_eq!(knight.current_hp, 0);

        let acting = next.combatant(&actor).unwrap();
        let expected_av = config.base_action_value / acting.stats.speed;
        assert!((acting.action_value - expected_av).abs() < 1e-3);
    }

    #[test]
    fn test_victory_fires_exactly_once_and_blocks_scheduling() {
        let config = EngineConfig::default();
        let state = schedule(&begin(&opening_state()), &config);
        let actor = state.active.clone().unwrap();
        let target = CombatantId::from("shadow_knight");

        let ended = apply_resolution(&state, &actor, &target, &damage_outcome(99_999), &config);
        assert_eq!(ended.phase, BattlePhase::Victory);
        let victory_lines = ended
            .logs
            .iter()
            .filter(|l| l.message.contains("Victory"))
            .count();
        assert_eq!(victory_lines, 1);

        // No further scheduling once terminal
        let after = schedule(&ended, &config);
        assert_eq!(after.phase, BattlePhase::Victory);
        assert!(after.active.is_none() || after.active == ended.active);
    }

    #[test]
    fn test_defeat_when_party_wiped() {
        let config = EngineConfig::default();
        let mut state = schedule(&begin(&opening_state()), &config);
        for member in state.roster.iter_mut().filter(|c| c.side == Side::Party) {
            member.current_hp = 1;
        }
        // Enemy action wipes the last pockets of HP one by one
        let mut current = state.clone();
        for id in ["linque", "luoshu", "helga", "zizhi"] {
            let target = CombatantId::from(id);
            current = apply_resolution(
                &current,
                &CombatantId::from("shadow_knight"),
                &target,
                &damage_outcome(10),
                &config,
            );
        }
        assert_eq!(current.phase, BattlePhase::Defeat);
    }

    #[test]
    fn test_turn_increments_after_full_rotation() {
        let config = EngineConfig::default();
        let state = schedule(&begin(&opening_state()), &config);
        assert_eq!(state.turn, 1);

        // March every living combatant through one resolution
        let ids: Vec<CombatantId> = state.roster.iter().map(|c| c.id.clone()).collect();
        let mut current = state;
        for id in &ids {
            let target = if id.as_str() == "shadow_knight" {
                CombatantId::from("luoshu")
            } else {
                CombatantId::from("shadow_knight")
            };
            current = apply_resolution(&current, id, &target, &damage_outcome(1), &config);
        }
        assert_eq!(current.turn, 2);
        // A single further action does not bump the counter again
        current = apply_resolution(
            &current,
            &ids[0],
            &CombatantId::from("shadow_knight"),
            &damage_outcome(1),
            &config,
        );
        assert_eq!(current.turn, 2);
    }

    #[test]
    fn test_disruption_line_is_generic() {
        let state = opening_state();
        let next = decision_disrupted(&state);
        let last = next.logs.last().unwrap();
        assert!(last.message.contains("Communication disrupted"));
        assert_eq!(last.speaker, Speaker::System);
    }
}
