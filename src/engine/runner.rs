//! Async battle driver
//!
//! Owns the current snapshot and sequences the loop: schedule, decide,
//! resolve, check outcome. All roster mutation funnels through the pure
//! transitions in `machine`; the runner contributes the things pure
//! code cannot do - awaiting the decision provider, pacing delays, and
//! random enemy choices - and feeds their results back in as values.
//!
//! Single-threaded and cooperative: one event at a time, no concurrent
//! writers, at most one outstanding decision request per actor turn.

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{BattleId, CombatantId, Side, SkillId};
use crate::decision::{
    ActorView, DecisionProvider, DecisionRequest, HistoryLine, OpponentView, PersonaView,
    SkillView,
};
use crate::engine::machine;
use crate::engine::state::{BattlePhase, BattleState, Speaker};
use crate::resolver::resolve_skill;
use crate::roster::combatant::Combatant;
use crate::roster::skill::Skill;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tokio::sync::mpsc;

/// Final result of a battle, reported exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Victory,
    Defeat,
}

type NarrativeSink = Box<dyn FnMut(&str) + Send>;
type OutcomeHandler = Box<dyn FnMut(BattleId, BattleOutcome) + Send>;

/// Drives one battle from `Start` to a terminal phase
pub struct BattleRunner<P> {
    state: BattleState,
    config: EngineConfig,
    provider: P,
    rng: ChaCha8Rng,
    persona: Option<PersonaView>,
    on_narrative: Option<NarrativeSink>,
    on_outcome: Option<OutcomeHandler>,
    outcome_reported: bool,
}

impl<P: DecisionProvider> BattleRunner<P> {
    /// Validate the roster and set up the opening snapshot. The seed
    /// fixes every roll in the battle, so replays are exact.
    pub fn new(
        roster: Vec<Combatant>,
        config: EngineConfig,
        provider: P,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        let state = BattleState::new(roster)?;
        Ok(Self {
            state,
            config,
            provider,
            rng: ChaCha8Rng::seed_from_u64(seed),
            persona: None,
            on_narrative: None,
            on_outcome: None,
            outcome_reported: false,
        })
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    /// Describe the commanding player to the decision provider
    pub fn set_persona(&mut self, persona: PersonaView) {
        self.persona = Some(persona);
    }

    /// Receive finalized narrative text (for the speech queue)
    pub fn set_narrative_sink(&mut self, sink: impl FnMut(&str) + Send + 'static) {
        self.on_narrative = Some(Box::new(sink));
    }

    /// Receive the single victory/defeat report
    pub fn set_outcome_handler(
        &mut self,
        handler: impl FnMut(BattleId, BattleOutcome) + Send + 'static,
    ) {
        self.on_outcome = Some(Box::new(handler));
    }

    /// Open the battle and run until the first player decision (or a
    /// terminal phase, if the enemy somehow ends it first).
    pub async fn start(&mut self) -> Result<()> {
        if self.state.phase != BattlePhase::Start {
            return Err(EngineError::InputRejected("battle already started".into()));
        }
        tracing::info!(battle = %self.state.battle_id.0, "battle starting");
        self.state = machine::begin(&self.state);
        self.advance_until_player_or_end().await
    }

    /// Direct skill selection for the active party member
    pub async fn submit_skill(&mut self, skill_id: &SkillId) -> Result<()> {
        self.guard_player_input()?;
        let actor_id = self.active_actor()?;
        let actor = self.state.combatant(&actor_id)?.clone();
        let skill = actor
            .skill(skill_id)
            .ok_or_else(|| EngineError::UnknownSkill(skill_id.clone()))?
            .clone();

        if let Some(line) = &skill.battle_line {
            self.state = machine::log_line(&self.state, Speaker::Player, line);
            self.emit_narrative(line);
        }

        let target_id = self.first_living_enemy()?;
        self.resolve_and_apply(&actor_id, &target_id, &skill).await?;
        self.advance_until_player_or_end().await
    }

    /// Free-text command routed through the decision provider.
    ///
    /// While the request is in flight the snapshot carries the
    /// processing flag, so a second command lands on `InputRejected`
    /// instead of being queued. Partial narrative streams into the log
    /// as it arrives; only the final decision picks the skill.
    pub async fn submit_command(&mut self, text: &str) -> Result<()> {
        self.guard_player_input()?;
        let actor_id = self.active_actor()?;
        self.state = machine::log_player_command(&self.state, text);

        let request = self.build_request(Some(text), &actor_id)?;
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let result = {
            let fut = self.provider.decide(request, Some(tx));
            tokio::pin!(fut);
            let mut partials_open = true;
            loop {
                tokio::select! {
                    maybe = rx.recv(), if partials_open => {
                        match maybe {
                            Some(partial) => {
                                self.state = machine::stream_narrative(&self.state, &partial);
                            }
                            None => partials_open = false,
                        }
                    }
                    result = &mut fut => break result,
                }
            }
        };
        // Drain partials that raced with completion
        while let Ok(partial) = rx.try_recv() {
            self.state = machine::stream_narrative(&self.state, &partial);
        }

        let skill = match result {
            Ok(decision) => {
                self.state = machine::finish_narrative(&self.state, &decision.narrative);
                if !decision.narrative.is_empty() {
                    self.emit_narrative(&decision.narrative);
                }
                let actor = self.state.combatant(&actor_id)?.clone();
                match actor.skill(&decision.skill_id) {
                    Some(skill) => skill.clone(),
                    None => {
                        tracing::warn!(
                            "decision named unknown skill '{}', substituting default",
                            decision.skill_id
                        );
                        let fallback = actor.first_skill().clone();
                        self.state = machine::decision_disrupted(&self.state);
                        fallback
                    }
                }
            }
            Err(e) => {
                tracing::warn!("decision provider failed: {}", e);
                self.state = machine::decision_disrupted(&self.state);
                self.state.combatant(&actor_id)?.first_skill().clone()
            }
        };

        let target_id = self.first_living_enemy()?;
        self.resolve_and_apply(&actor_id, &target_id, &skill).await?;
        self.advance_until_player_or_end().await
    }

    /// Run scheduler ticks and enemy turns until player input is
    /// needed or the battle ends.
    async fn advance_until_player_or_end(&mut self) -> Result<()> {
        loop {
            if self.state.is_terminal() {
                self.report_outcome();
                return Ok(());
            }
            self.state = machine::schedule(&self.state, &self.config);
            match self.state.phase {
                BattlePhase::PlayerDecision => return Ok(()),
                BattlePhase::EnemyDecision => self.enemy_turn().await?,
                // advance() found nobody alive: the outcome check should
                // have caught this on the previous resolution
                _ => return Err(EngineError::BattleOver),
            }
        }
    }

    /// One hostile action: uniform random skill, uniform random living
    /// target, pacing delay before resolution.
    async fn enemy_turn(&mut self) -> Result<()> {
        if self.config.enemy_think_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.enemy_think_delay_ms)).await;
        }

        let actor_id = self.active_actor()?;
        let actor = self.state.combatant(&actor_id)?.clone();
        let skill = actor
            .skills
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| EngineError::InvalidRoster(format!("{} has no skills", actor_id)))?;

        let targets: Vec<CombatantId> = self
            .state
            .living(Side::Party)
            .map(|c| c.id.clone())
            .collect();
        let target_id = targets
            .choose(&mut self.rng)
            .cloned()
            .ok_or(EngineError::BattleOver)?;

        if let Some(line) = actor.battle_lines.skill.choose(&mut self.rng) {
            self.state = machine::log_line(&self.state, Speaker::Enemy, line);
        }

        self.resolve_and_apply(&actor_id, &target_id, &skill).await
    }

    async fn resolve_and_apply(
        &mut self,
        actor_id: &CombatantId,
        target_id: &CombatantId,
        skill: &Skill,
    ) -> Result<()> {
        let actor = self.state.combatant(actor_id)?.clone();
        let target = self.state.combatant(target_id)?.clone();
        let outcome = resolve_skill(
            &actor,
            &target,
            skill,
            &self.state.bonds,
            &self.config,
            &mut self.rng,
        );

        if self.config.post_resolution_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.post_resolution_delay_ms)).await;
        }

        self.state =
            machine::apply_resolution(&self.state, actor_id, target_id, &outcome, &self.config);
        if self.state.is_terminal() {
            self.report_outcome();
        }
        Ok(())
    }

    fn guard_player_input(&self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(EngineError::BattleOver);
        }
        if self.state.processing {
            return Err(EngineError::InputRejected(
                "a decision request is already in flight".into(),
            ));
        }
        if self.state.phase != BattlePhase::PlayerDecision {
            return Err(EngineError::InputRejected(
                "not waiting for player input".into(),
            ));
        }
        Ok(())
    }

    fn active_actor(&self) -> Result<CombatantId> {
        self.state
            .active
            .clone()
            .ok_or_else(|| EngineError::InputRejected("no active combatant".into()))
    }

    fn first_living_enemy(&self) -> Result<CombatantId> {
        self.state
            .living(Side::Enemy)
            .next()
            .map(|c| c.id.clone())
            .ok_or(EngineError::BattleOver)
    }

    fn build_request(
        &self,
        free_text: Option<&str>,
        actor_id: &CombatantId,
    ) -> Result<DecisionRequest> {
        let actor = self.state.combatant(actor_id)?;
        let opponent = self
            .state
            .living(Side::Enemy)
            .next()
            .ok_or(EngineError::BattleOver)?;

        // Recent dialogue only: skill-use notifications and formula
        // diagnostics would drown the conversation.
        let mut history: Vec<HistoryLine> = self
            .state
            .logs
            .iter()
            .rev()
            .filter(|e| {
                !e.streaming && !e.message.contains("formula:") && !e.message.contains(" used ")
            })
            .take(self.config.history_window)
            .map(|e| HistoryLine {
                from_player: e.speaker == Speaker::Player,
                text: e.message.clone(),
            })
            .collect();
        history.reverse();

        Ok(DecisionRequest {
            free_text: free_text.map(String::from),
            turn: self.state.turn,
            actor: ActorView {
                name: actor.name.clone(),
                current_hp: actor.current_hp,
                max_hp: actor.max_hp,
                personality: actor.personality.clone(),
                speaking_style: actor.speaking_style.clone(),
                skills: actor
                    .skills
                    .iter()
                    .map(|s| SkillView {
                        id: s.id.clone(),
                        name: s.name.clone(),
                        description: s.description.clone(),
                        risk: s.risk,
                    })
                    .collect(),
            },
            opponent: OpponentView {
                name: opponent.name.clone(),
                current_hp: opponent.current_hp,
                max_hp: opponent.max_hp,
            },
            history,
            persona: self.persona.clone(),
        })
    }

    fn emit_narrative(&mut self, text: &str) {
        if let Some(sink) = &mut self.on_narrative {
            sink(text);
        }
    }

    fn report_outcome(&mut self) {
        if self.outcome_reported {
            return;
        }
        let outcome = match self.state.phase {
            BattlePhase::Victory => BattleOutcome::Victory,
            BattlePhase::Defeat => BattleOutcome::Defeat,
            _ => return,
        };
        self.outcome_reported = true;
        tracing::info!(battle = %self.state.battle_id.0, ?outcome, "battle over");
        if let Some(handler) = &mut self.on_outcome {
            handler(self.state.battle_id, outcome);
        }
    }
}
