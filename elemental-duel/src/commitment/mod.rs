pub mod scheme;

pub use scheme::{CommitmentScheme, Sha256Scheme};

use crate::outcome::Move;
use crate::DuelError;
use elemental_core::PlayerId;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 32-byte hash published before the reveal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment([u8; 32]);

impl Commitment {
    pub const ZERO: Commitment = Commitment([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Commitment for `player` playing `mv` with `salt`.
    pub fn compute(player: &PlayerId, mv: Move, salt: &Salt) -> Self {
        Sha256Scheme::commit(&Opening {
            player: player.clone(),
            mv,
            salt: *salt,
        })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn verify(&self, opening: &Opening) -> bool {
        Sha256Scheme::verify(self, opening)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(&self.0[..8]))
    }
}

impl FromStr for Commitment {
    type Err = DuelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_32(s).map(Self)
    }
}

/// Secret salt that hides a committed move.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt([u8; 32]);

impl Salt {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Rnd salt from the thread rng
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(..)")
    }
}

impl FromStr for Salt {
    type Err = DuelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_32(s).map(Self)
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Disclosed preimage of a commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    pub player: PlayerId,
    pub mv: Move,
    pub salt: Salt,
}

fn decode_32(s: &str) -> crate::Result<[u8; 32]> {
    let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|_| DuelError::InvalidCommitment)?;
    bytes.try_into().map_err(|_| DuelError::InvalidCommitment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_scheme() {
        let alice = PlayerId::from("alice");
        let salt = Salt::generate();
        let commitment = Commitment::compute(&alice, Move::Rock, &salt);

        assert!(!commitment.is_zero());
        assert!(commitment.verify(&Opening {
            player: alice.clone(),
            mv: Move::Rock,
            salt,
        }));
    }

    #[test]
    fn test_any_mutation_breaks_binding() {
        let alice = PlayerId::from("alice");
        let salt = Salt::from_bytes([7u8; 32]);
        let commitment = Commitment::compute(&alice, Move::Paper, &salt);

        for mv in [Move::Rock, Move::Scissors] {
            assert!(!commitment.verify(&Opening {
                player: alice.clone(),
                mv,
                salt,
            }));
        }

        let mut flipped = *salt.as_bytes();
        flipped[31] ^= 1;
        assert!(!commitment.verify(&Opening {
            player: alice.clone(),
            mv: Move::Paper,
            salt: Salt::from_bytes(flipped),
        }));

        // bound to the committing player
        assert!(!commitment.verify(&Opening {
            player: PlayerId::from("mallory"),
            mv: Move::Paper,
            salt,
        }));
    }

    #[test]
    fn test_hex_parsing() {
        let commitment = Commitment::compute(&"bob".into(), Move::Scissors, &Salt::generate());
        let parsed: Commitment = commitment.to_string().parse().unwrap();
        assert_eq!(parsed, commitment);

        let prefixed: Commitment = format!("0x{}", commitment).parse().unwrap();
        assert_eq!(prefixed, commitment);

        assert!("abcd".parse::<Commitment>().is_err());
        assert!("zz".parse::<Salt>().is_err());
        assert!(Commitment::ZERO.is_zero());
    }
}
