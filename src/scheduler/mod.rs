//! Action-value turn scheduler
//!
//! Each combatant carries an `action_value`: remaining distance to its
//! next turn on a shared timeline. A combatant at speed S gets a turn
//! every `base_action_value / S` units, so turn frequency is
//! proportional to speed rather than alternating by side.
//!
//! Tie-break when several combatants reach zero together: party before
//! enemy, then original roster index.

use crate::core::config::EngineConfig;
use crate::core::types::{CombatantId, Side};
use crate::roster::combatant::Combatant;
use ordered_float::OrderedFloat;

/// Inter-turn interval for a given speed
pub fn interval(speed: f32, config: &EngineConfig) -> f32 {
    config.base_action_value / speed
}

/// Normalize the timeline and pick the next actor.
///
/// Subtracts the minimum action value from every living combatant so
/// the soonest actor lands on ~0, then selects the ready combatant.
/// Defeated combatants neither shift the timeline nor take turns.
/// Returns `None` only if nobody is alive.
pub fn advance(roster: &mut [Combatant], config: &EngineConfig) -> Option<CombatantId> {
    let min_av = roster
        .iter()
        .filter(|c| !c.is_defeated())
        .map(|c| OrderedFloat(c.action_value))
        .min()?
        .0;

    for combatant in roster.iter_mut().filter(|c| !c.is_defeated()) {
        combatant.action_value -= min_av;
    }

    select_ready(roster, config)
}

fn select_ready(roster: &[Combatant], config: &EngineConfig) -> Option<CombatantId> {
    let ready: Vec<&Combatant> = roster
        .iter()
        .filter(|c| !c.is_defeated() && c.action_value <= config.av_epsilon)
        .collect();

    ready
        .iter()
        .find(|c| c.side == Side::Party)
        .or_else(|| ready.first())
        .map(|c| c.id.clone())
}

/// Reset an actor's timer after its action resolves
pub fn reset_actor(roster: &mut [Combatant], id: &CombatantId, config: &EngineConfig) {
    if let Some(actor) = roster.iter_mut().find(|c| &c.id == id) {
        actor.action_value = interval(actor.stats.speed, config);
    }
}

/// Non-mutating look-ahead over the next `slots` turns, for display.
///
/// The active actor occupies slot 0 at simulated value zero; its own
/// interval is added only for subsequent occurrences.
pub fn preview(
    roster: &[Combatant],
    active: &CombatantId,
    config: &EngineConfig,
    slots: usize,
) -> Vec<CombatantId> {
    // (roster index, simulated cumulative value)
    let mut sim: Vec<(usize, f32)> = roster
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_defeated())
        .map(|(i, c)| {
            let value = if &c.id == active { 0.0 } else { c.action_value };
            (i, value)
        })
        .collect();

    if sim.is_empty() {
        return Vec::new();
    }

    let mut queue = Vec::with_capacity(slots);
    for _ in 0..slots {
        let min_value = sim
            .iter()
            .map(|(_, v)| OrderedFloat(*v))
            .min()
            .map(|v| v.0)
            .unwrap_or(0.0);

        // Same tie-break as the live scheduler
        let pos = sim
            .iter()
            .position(|(i, v)| {
                *v - min_value <= config.av_epsilon && roster[*i].side == Side::Party
            })
            .or_else(|| {
                sim.iter()
                    .position(|(_, v)| *v - min_value <= config.av_epsilon)
            });

        let Some(pos) = pos else { break };
        let (roster_index, _) = sim[pos];
        queue.push(roster[roster_index].id.clone());
        sim[pos].1 += interval(roster[roster_index].stats.speed, config);
    }

    queue
}
