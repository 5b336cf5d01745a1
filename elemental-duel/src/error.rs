use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, DuelError>;

#[derive(Error, Debug)]
pub enum DuelError {
    #[error("Core error: {0}")]
    Core(#[from] elemental_core::CoreError),

    #[error("Invalid commitment")]
    InvalidCommitment,

    #[error("Commitment already used by another duel")]
    CommitmentInUse,

    #[error("Insufficient resources: {0}")]
    InsufficientResources(String),

    #[error("Duel not found: {0}")]
    DuelNotFound(Uuid),

    #[error("Duel {0} is not accepting opponents")]
    DuelNotJoinable(Uuid),

    #[error("A player cannot duel themselves")]
    SamePlayer,

    #[error("Join window expired for duel {0}")]
    JoinWindowExpired(Uuid),

    #[error("Duel {0} is not awaiting reveals")]
    WrongState(Uuid),

    #[error("Reveal window expired for duel {0}")]
    RevealWindowExpired(Uuid),

    #[error("Reveal does not match commitment")]
    CommitmentMismatch,

    #[error("Move already revealed")]
    AlreadyRevealed,

    #[error("Player {0} is not part of this duel")]
    NotParticipant(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Settlement failed: {0}")]
    Settlement(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
