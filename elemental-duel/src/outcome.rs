use crate::DuelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Move a player commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Byte fed into the commitment hash.
    pub fn as_byte(self) -> u8 {
        match self {
            Move::Rock => 0,
            Move::Paper => 1,
            Move::Scissors => 2,
        }
    }

    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors) | (Move::Scissors, Move::Paper) | (Move::Paper, Move::Rock)
        )
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissors => "scissors",
        };
        f.write_str(name)
    }
}

impl FromStr for Move {
    type Err = DuelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" => Ok(Move::Rock),
            "paper" => Ok(Move::Paper),
            "scissors" => Ok(Move::Scissors),
            other => Err(DuelError::InvalidMove(other.to_string())),
        }
    }
}

/// Which seat of the duel a player occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Starter,
    Opponent,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Starter => Side::Opponent,
            Side::Opponent => Side::Starter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Side(Side),
    Draw,
}

/// Result of a resolved duel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub winner: Winner,
    pub starter_move: Option<Move>,
    pub opponent_move: Option<Move>,
    /// The loser never revealed before the window closed.
    pub by_forfeit: bool,
}

/// Winner of a starter move against an opponent move.
pub fn resolve(starter: Move, opponent: Move) -> Winner {
    if starter.beats(opponent) {
        Winner::Side(Side::Starter)
    } else if opponent.beats(starter) {
        Winner::Side(Side::Opponent)
    } else {
        Winner::Draw
    }
}
