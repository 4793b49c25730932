use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    #[error("Unknown combatant: {0}")]
    UnknownCombatant(crate::core::types::CombatantId),

    #[error("Unknown skill: {0}")]
    UnknownSkill(crate::core::types::SkillId),

    #[error("Decision provider error: {0}")]
    DecisionError(String),

    #[error("Input rejected: {0}")]
    InputRejected(String),

    #[error("Battle is over")]
    BattleOver,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
