//! Decision layer: free text in, one concrete skill choice out
//!
//! The engine never interprets natural language itself. It hands the
//! command, the acting character's persona, and a slice of recent
//! history to a `DecisionProvider`, and gets back a skill id plus
//! narrative text. Providers are pluggable: an HTTP LLM client for
//! play, a scripted double for tests.

pub mod client;
pub mod context;
pub mod parser;
pub mod provider;

pub use client::{ApiFormat, LlmProvider};
pub use parser::{extract_skill_tag, strip_skill_tags};
pub use provider::{
    ActorView, Confidence, Decision, DecisionProvider, DecisionRequest, HistoryLine, OpponentView,
    PersonaView, ScriptedProvider, SkillView,
};
