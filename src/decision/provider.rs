//! Decision provider contract
//!
//! A decision provider turns a free-text command (or a silent "pick
//! for me") into one concrete skill choice plus narrative text. The
//! narrative may arrive incrementally as a sequence of growing partial
//! strings; only the final returned value participates in state
//! transitions. Partials are display and speech material, nothing else.

use crate::core::error::{EngineError, Result};
use crate::core::types::{SkillId, Turn};
use crate::roster::skill::RiskLevel;
use tokio::sync::mpsc::UnboundedSender;

/// Stat snapshot of the acting combatant, as the provider sees it
#[derive(Debug, Clone)]
pub struct ActorView {
    pub name: String,
    pub current_hp: i32,
    pub max_hp: i32,
    pub personality: String,
    pub speaking_style: String,
    pub skills: Vec<SkillView>,
}

/// One selectable skill, with its advisory risk tag
#[derive(Debug, Clone)]
pub struct SkillView {
    pub id: SkillId,
    pub name: String,
    pub description: String,
    pub risk: Option<RiskLevel>,
}

/// Stat snapshot of the opposing combatant
#[derive(Debug, Clone)]
pub struct OpponentView {
    pub name: String,
    pub current_hp: i32,
    pub max_hp: i32,
}

/// One line of recent battle history handed over for continuity
#[derive(Debug, Clone)]
pub struct HistoryLine {
    pub from_player: bool,
    pub text: String,
}

/// Optional descriptor of the commanding player's own persona
#[derive(Debug, Clone)]
pub struct PersonaView {
    pub name: String,
    pub personality: String,
}

/// Everything a provider gets to reason about one decision
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    /// Absent when the provider should pick on its own
    pub free_text: Option<String>,
    pub turn: Turn,
    pub actor: ActorView,
    pub opponent: OpponentView,
    pub history: Vec<HistoryLine>,
    pub persona: Option<PersonaView>,
}

/// Confidence the provider assigns its own interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// A concrete decision: which skill, and what the character says
#[derive(Debug, Clone)]
pub struct Decision {
    pub skill_id: SkillId,
    pub narrative: String,
    pub confidence: Confidence,
}

/// Converts a command into a decision, possibly streaming narrative
/// partials along the way. Implementations must not assume the partial
/// channel is consumed promptly, or at all.
#[allow(async_fn_in_trait)]
pub trait DecisionProvider {
    async fn decide(
        &mut self,
        request: DecisionRequest,
        partials: Option<UnboundedSender<String>>,
    ) -> Result<Decision>;
}

/// Deterministic test double: fixed skill, canned narrative, optional
/// scripted partials and forced failure. Keeps engine tests independent
/// of any remote service.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    pub skill_id: SkillId,
    pub narrative: String,
    pub partials: Vec<String>,
    pub fail: bool,
}

impl ScriptedProvider {
    pub fn new(skill_id: impl Into<String>, narrative: impl Into<String>) -> Self {
        Self {
            skill_id: SkillId::new(skill_id),
            narrative: narrative.into(),
            partials: Vec::new(),
            fail: false,
        }
    }

    pub fn with_partials(mut self, partials: Vec<String>) -> Self {
        self.partials = partials;
        self
    }

    pub fn failing() -> Self {
        Self {
            skill_id: SkillId::new("unused"),
            narrative: String::new(),
            partials: Vec::new(),
            fail: true,
        }
    }
}

impl DecisionProvider for ScriptedProvider {
    async fn decide(
        &mut self,
        _request: DecisionRequest,
        partials: Option<UnboundedSender<String>>,
    ) -> Result<Decision> {
        if self.fail {
            return Err(EngineError::DecisionError("scripted failure".into()));
        }
        if let Some(sink) = partials {
            for partial in &self.partials {
                // A dropped receiver is not an error for the provider
                let _ = sink.send(partial.clone());
            }
        }
        Ok(Decision {
            skill_id: self.skill_id.clone(),
            narrative: self.narrative.clone(),
            confidence: Confidence::High,
        })
    }
}
