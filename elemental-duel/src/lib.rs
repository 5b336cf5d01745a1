//! Elemental Duel - commit-reveal duels for 2 players
//!
//! A starter stakes mana and commits to a hidden move, an opponent joins with
//! their own commitment, and both reveal before the window closes. Deadlines
//! are checked lazily on every call or by an explicit sweep, so the engine
//! never needs a background timer.

pub mod commitment;
pub mod config;
pub mod duel;
pub mod error;
pub mod outcome;
pub mod registry;
pub mod settlement;

pub use commitment::{Commitment, CommitmentScheme, Opening, Salt, Sha256Scheme};
pub use config::{DuelConfig, EntryPolicy};
pub use duel::{Duel, DuelInfo, DuelState};
pub use error::{DuelError, Result};
pub use outcome::{Move, Outcome, Side, Winner};
pub use registry::DuelRegistry;
pub use settlement::{Purpose, Settlement, SettlementLog};

use elemental_core::{Gateway, SystemClock};
use std::sync::Arc;

/// Create a duel registry running on the system clock
pub fn create_registry(config: DuelConfig, gateway: Arc<dyn Gateway>) -> Result<DuelRegistry> {
    DuelRegistry::new(config, gateway, Arc::new(SystemClock))
}
