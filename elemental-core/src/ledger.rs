use crate::error::Result;
use crate::types::{AssetId, Mana, PlayerId};
use async_trait::async_trait;
use uuid::Uuid;

/// External ledger and payout capabilities a duel engine settles against.
///
/// `debit` must fail with [`CoreError::InsufficientBalance`](crate::CoreError::InsufficientBalance)
/// when the player cannot pay. `credit`, `award_points` and `mint_reward` are
/// expected to succeed for well-formed input; callers issue each of them at
/// most once per duel, side and purpose.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn debit(&self, player: &PlayerId, amount: Mana) -> Result<()>;

    async fn credit(&self, player: &PlayerId, amount: Mana) -> Result<()>;

    async fn owns_asset(&self, player: &PlayerId, asset: AssetId) -> Result<bool>;

    async fn award_points(&self, player: &PlayerId, amount: u64) -> Result<()>;

    async fn mint_reward(&self, _player: &PlayerId, _duel_id: Uuid) -> Result<()> {
        Ok(())
    }
}
