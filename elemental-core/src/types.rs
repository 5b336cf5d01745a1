use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mana amounts are whole units.
pub type Mana = u64;

/// Lookup key for a player account held by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Collectible token that can gate entry to a duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetId {
    Element(u32),
    Ticket(u32),
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Element(id) => write!(f, "element#{}", id),
            AssetId::Ticket(id) => write!(f, "ticket#{}", id),
        }
    }
}

/// Ticket classes issued by the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketClass {
    Economy = 1,
    Business = 2,
    First = 3,
}

impl TicketClass {
    pub const ALL: [TicketClass; 3] = [
        TicketClass::Economy,
        TicketClass::Business,
        TicketClass::First,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn asset(self) -> AssetId {
        AssetId::Ticket(self.id())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub player: PlayerId,
    pub kind: LedgerEventKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEventKind {
    Minted(Mana),
    Debited(Mana),
    Credited(Mana),
    PointsAwarded(u64),
    RewardMinted(String),
}
