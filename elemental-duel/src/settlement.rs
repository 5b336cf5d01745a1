use crate::outcome::Side;
use elemental_core::Mana;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Why a ledger call is issued for a duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Purpose {
    Stake,
    Refund,
    Payout,
    Points,
    Reward,
}

/// One outbound call a transition asks the gateway to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    Refund { side: Side, amount: Mana },
    Payout { side: Side, amount: Mana },
    Points { side: Side, amount: u64 },
    Reward { side: Side },
}

impl Settlement {
    pub fn side(&self) -> Side {
        match *self {
            Settlement::Refund { side, .. }
            | Settlement::Payout { side, .. }
            | Settlement::Points { side, .. }
            | Settlement::Reward { side } => side,
        }
    }

    pub fn purpose(&self) -> Purpose {
        match self {
            Settlement::Refund { .. } => Purpose::Refund,
            Settlement::Payout { .. } => Purpose::Payout,
            Settlement::Points { .. } => Purpose::Points,
            Settlement::Reward { .. } => Purpose::Reward,
        }
    }

    /// Mana returned to the ledger by this call.
    pub fn mana(&self) -> Mana {
        match *self {
            Settlement::Refund { amount, .. } | Settlement::Payout { amount, .. } => amount,
            _ => 0,
        }
    }
}

/// Markers for every (side, purpose) already issued for a duel.
///
/// A marker is recorded before the matching gateway call is made, so a call
/// is never issued twice even when it fails halfway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementLog {
    issued: BTreeSet<(Side, Purpose)>,
}

impl SettlementLog {
    /// Returns false if the marker was already present.
    pub fn claim(&mut self, side: Side, purpose: Purpose) -> bool {
        self.issued.insert((side, purpose))
    }

    pub fn contains(&self, side: Side, purpose: Purpose) -> bool {
        self.issued.contains(&(side, purpose))
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Side, Purpose)> {
        self.issued.iter()
    }
}
