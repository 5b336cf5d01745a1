use crate::error::{CoreError, Result};
use crate::ledger::Gateway;
use crate::types::{AssetId, LedgerEvent, LedgerEventKind, Mana, PlayerId};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Accounts {
    balances: HashMap<PlayerId, Mana>,
    assets: HashMap<PlayerId, HashSet<AssetId>>,
    points: HashMap<PlayerId, u64>,
    rewards: HashMap<PlayerId, Vec<Uuid>>,
    history: Vec<LedgerEvent>,
}

impl Accounts {
    fn record(&mut self, player: &PlayerId, kind: LedgerEventKind) {
        self.history.push(LedgerEvent {
            player: player.clone(),
            kind,
            timestamp: Utc::now(),
        });
    }
}

/// In-process ledger holding mana balances, token ownership, ranking points
/// and minted rewards.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: RwLock<Accounts>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint_mana(&self, player: &PlayerId, amount: Mana) {
        let mut accounts = self.accounts.write();
        *accounts.balances.entry(player.clone()).or_default() += amount;
        accounts.record(player, LedgerEventKind::Minted(amount));

        tracing::debug!("Minted {} mana to {}", amount, player);
    }

    pub fn grant_asset(&self, player: &PlayerId, asset: AssetId) {
        self.accounts
            .write()
            .assets
            .entry(player.clone())
            .or_default()
            .insert(asset);
    }

    pub fn revoke_asset(&self, player: &PlayerId, asset: AssetId) {
        if let Some(owned) = self.accounts.write().assets.get_mut(player) {
            owned.remove(&asset);
        }
    }

    pub fn balance(&self, player: &PlayerId) -> Mana {
        self.accounts
            .read()
            .balances
            .get(player)
            .copied()
            .unwrap_or(0)
    }

    pub fn points(&self, player: &PlayerId) -> u64 {
        self.accounts.read().points.get(player).copied().unwrap_or(0)
    }

    pub fn rewards(&self, player: &PlayerId) -> Vec<Uuid> {
        self.accounts
            .read()
            .rewards
            .get(player)
            .cloned()
            .unwrap_or_default()
    }

    pub fn history(&self) -> Vec<LedgerEvent> {
        self.accounts.read().history.clone()
    }

    /// Sum of every debit recorded so far.
    pub fn total_debited(&self) -> Mana {
        self.accounts
            .read()
            .history
            .iter()
            .filter_map(|e| match e.kind {
                LedgerEventKind::Debited(amount) => Some(amount),
                _ => None,
            })
            .sum()
    }

    /// Sum of every credit recorded so far.
    pub fn total_credited(&self) -> Mana {
        self.accounts
            .read()
            .history
            .iter()
            .filter_map(|e| match e.kind {
                LedgerEventKind::Credited(amount) => Some(amount),
                _ => None,
            })
            .sum()
    }
}

#[async_trait]
impl Gateway for MemoryLedger {
    async fn debit(&self, player: &PlayerId, amount: Mana) -> Result<()> {
        let mut accounts = self.accounts.write();
        let available = accounts.balances.get(player).copied().unwrap_or(0);
        if available < amount {
            return Err(CoreError::InsufficientBalance {
                need: amount,
                available,
            });
        }

        accounts.balances.insert(player.clone(), available - amount);
        accounts.record(player, LedgerEventKind::Debited(amount));
        Ok(())
    }

    async fn credit(&self, player: &PlayerId, amount: Mana) -> Result<()> {
        let mut accounts = self.accounts.write();
        let balance = accounts.balances.entry(player.clone()).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::ledger(format!("Balance overflow for {}", player)))?;
        accounts.record(player, LedgerEventKind::Credited(amount));
        Ok(())
    }

    async fn owns_asset(&self, player: &PlayerId, asset: AssetId) -> Result<bool> {
        Ok(self
            .accounts
            .read()
            .assets
            .get(player)
            .map_or(false, |owned| owned.contains(&asset)))
    }

    async fn award_points(&self, player: &PlayerId, amount: u64) -> Result<()> {
        let mut accounts = self.accounts.write();
        *accounts.points.entry(player.clone()).or_default() += amount;
        accounts.record(player, LedgerEventKind::PointsAwarded(amount));
        Ok(())
    }

    async fn mint_reward(&self, player: &PlayerId, duel_id: Uuid) -> Result<()> {
        let mut accounts = self.accounts.write();
        accounts
            .rewards
            .entry(player.clone())
            .or_default()
            .push(duel_id);
        accounts.record(player, LedgerEventKind::RewardMinted(duel_id.to_string()));
        Ok(())
    }
}
