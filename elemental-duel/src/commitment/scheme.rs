use crate::commitment::{Commitment, Opening};
use sha2::{Digest, Sha256};

/// Trait for commitment schemes
pub trait CommitmentScheme {
    type Opening;
    type Commitment;

    fn commit(opening: &Self::Opening) -> Self::Commitment;
    fn verify(commitment: &Self::Commitment, opening: &Self::Opening) -> bool;
}

const DOMAIN_TAG: &[u8] = b"elemental-duel/commit/v1";

/// SHA-256 over the domain tag, length-prefixed player id, move byte and salt.
pub struct Sha256Scheme;

impl CommitmentScheme for Sha256Scheme {
    type Opening = Opening;
    type Commitment = Commitment;

    fn commit(opening: &Opening) -> Commitment {
        let player = opening.player.as_bytes();

        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_TAG);
        hasher.update((player.len() as u32).to_be_bytes());
        hasher.update(player);
        hasher.update([opening.mv.as_byte()]);
        hasher.update(opening.salt.as_bytes());

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Commitment::from_bytes(bytes)
    }

    fn verify(commitment: &Commitment, opening: &Opening) -> bool {
        Self::commit(opening) == *commitment
    }
}
