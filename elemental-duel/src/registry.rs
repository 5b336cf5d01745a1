use crate::commitment::{Commitment, Salt};
use crate::config::DuelConfig;
use crate::duel::{Duel, DuelInfo};
use crate::outcome::Move;
use crate::settlement::Settlement;
use crate::{DuelError, Result};
use chrono::{DateTime, Utc};
use elemental_core::{
    AssetId, CoreError, DuelStore, Gateway, Mana, PlayerId, Storage, StoredDuel, TimeSource,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

type DuelHandle = Arc<tokio::sync::Mutex<Duel>>;

/// Entry point for every player-facing duel operation.
///
/// Each duel sits behind its own async mutex, so transitions on one duel are
/// serialized while different duels proceed independently. The map lock is
/// only held for insert, lookup and removal.
pub struct DuelRegistry {
    config: DuelConfig,
    gateway: Arc<dyn Gateway>,
    clock: Arc<dyn TimeSource>,
    duels: RwLock<HashMap<Uuid, DuelHandle>>,
    commitments: Mutex<HashSet<Commitment>>,
    storage: Option<Arc<Storage>>,
}

impl DuelRegistry {
    pub fn new(
        config: DuelConfig,
        gateway: Arc<dyn Gateway>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            gateway,
            clock,
            duels: RwLock::new(HashMap::new()),
            commitments: Mutex::new(HashSet::new()),
            storage: None,
        })
    }

    /// Persist every duel mutation to `storage`.
    pub fn with_storage(mut self, storage: Arc<Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Rebuild a registry from the duels saved in `storage`.
    pub async fn restore(
        config: DuelConfig,
        gateway: Arc<dyn Gateway>,
        clock: Arc<dyn TimeSource>,
        storage: Arc<Storage>,
    ) -> Result<Self> {
        let rows = DuelStore::new(&storage).load_duels().await?;
        let registry = Self::new(config, gateway, clock)?.with_storage(storage);

        {
            let mut duels = registry.duels.write();
            let mut commitments = registry.commitments.lock();
            for row in &rows {
                let duel: Duel = serde_json::from_str(&row.record)?;
                commitments.extend(duel.commitments().copied());
                duels.insert(duel.id(), Arc::new(tokio::sync::Mutex::new(duel)));
            }
        }

        tracing::info!("Restored {} duels from storage", rows.len());
        Ok(registry)
    }

    pub fn config(&self) -> &DuelConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.duels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.duels.read().is_empty()
    }

    /// Open a duel and debit the starter's stake.
    pub async fn start(&self, player: PlayerId, commitment: Commitment) -> Result<Uuid> {
        if commitment.is_zero() {
            return Err(DuelError::InvalidCommitment);
        }

        self.reserve_commitment(commitment)?;
        let result = self.open_duel(player, commitment).await;
        if result.is_err() {
            self.release_commitments([commitment]);
        }
        result
    }

    async fn open_duel(&self, player: PlayerId, commitment: Commitment) -> Result<Uuid> {
        let duel = Duel::new(
            Uuid::new_v4(),
            player.clone(),
            commitment,
            &self.config,
            self.clock.now(),
        )?;
        let duel_id = duel.id();

        self.check_eligibility(&player).await?;
        self.debit_stake(&player, duel.stake()).await?;

        if let Err(e) = self.persist(&duel).await {
            // the duel never existed, give the stake back
            self.gateway.credit(&player, duel.stake()).await?;
            return Err(e);
        }

        self.duels
            .write()
            .insert(duel_id, Arc::new(tokio::sync::Mutex::new(duel)));

        tracing::info!("Player {} started duel {}", player, duel_id);
        Ok(duel_id)
    }

    /// Take the open seat of a duel and debit the opponent's stake.
    pub async fn join(
        &self,
        duel_id: Uuid,
        player: PlayerId,
        commitment: Commitment,
    ) -> Result<()> {
        let handle = self.handle(duel_id)?;
        let mut duel = handle.lock().await;
        let now = self.clock.now();

        self.apply_expiry(&mut duel, now).await?;
        duel.check_join(&player, &commitment)?;

        self.reserve_commitment(commitment)?;
        let result = self.seat_opponent(&mut duel, &player, commitment, now).await;
        if result.is_err() {
            self.release_commitments([commitment]);
        } else {
            tracing::info!("Player {} joined duel {}", player, duel_id);
        }
        result
    }

    /// Debit the opponent at the duel's own stake and commit the seat only
    /// once it is persisted.
    async fn seat_opponent(
        &self,
        duel: &mut Duel,
        player: &PlayerId,
        commitment: Commitment,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.check_eligibility(player).await?;
        self.debit_stake(player, duel.stake()).await?;

        let mut joined = duel.clone();
        let seated = match joined.accept_opponent(player.clone(), commitment, now) {
            Ok(()) => self.persist(&joined).await,
            Err(e) => Err(e),
        };
        if let Err(e) = seated {
            // the seat was never taken, give the stake back
            self.gateway.credit(player, duel.stake()).await?;
            return Err(e);
        }

        *duel = joined;
        Ok(())
    }

    /// Disclose a committed move; resolves the duel once both sides revealed.
    pub async fn reveal(
        &self,
        duel_id: Uuid,
        player: PlayerId,
        mv: Move,
        salt: Salt,
    ) -> Result<()> {
        let handle = self.handle(duel_id)?;
        let mut duel = handle.lock().await;
        let now = self.clock.now();

        self.apply_expiry(&mut duel, now).await?;
        let settlements = duel.reveal(&player, mv, salt, now)?;

        if settlements.is_empty() {
            self.persist(&duel).await
        } else {
            self.settle(&mut duel, settlements).await
        }
    }

    /// Apply timeout transitions to every overdue duel.
    ///
    /// Returns the ids of duels that changed state. Settlement failures are
    /// logged and do not stop the sweep.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut transitioned = Vec::new();

        for (duel_id, handle) in self.snapshot() {
            let mut duel = handle.lock().await;
            let Some(settlements) = duel.expire(now) else {
                continue;
            };

            transitioned.push(duel_id);
            if let Err(e) = self.settle(&mut duel, settlements).await {
                tracing::error!("Sweep could not settle duel {}: {}", duel_id, e);
            }
        }

        if !transitioned.is_empty() {
            tracing::info!("Sweep expired {} duels", transitioned.len());
        }
        Ok(transitioned)
    }

    /// Drop terminal duels whose retention period has elapsed.
    pub async fn prune_finished(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let retention = self.config.retention();
        let mut pruned = Vec::new();

        for (duel_id, handle) in self.snapshot() {
            let duel = handle.lock().await;
            if !duel.is_prunable(now, retention) {
                continue;
            }

            if let Some(storage) = &self.storage {
                DuelStore::new(storage).delete_duel(duel_id).await?;
            }
            self.duels.write().remove(&duel_id);
            self.release_commitments(duel.commitments().copied());
            pruned.push(duel_id);
        }

        if !pruned.is_empty() {
            tracing::debug!("Pruned {} finished duels", pruned.len());
        }
        Ok(pruned)
    }

    pub async fn status(&self, duel_id: Uuid) -> Result<DuelInfo> {
        let handle = self.handle(duel_id)?;
        let duel = handle.lock().await;
        Ok(duel.info())
    }

    pub async fn list(&self) -> Vec<DuelInfo> {
        let mut infos = Vec::new();
        for (_, handle) in self.snapshot() {
            infos.push(handle.lock().await.info());
        }
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    fn handle(&self, duel_id: Uuid) -> Result<DuelHandle> {
        self.duels
            .read()
            .get(&duel_id)
            .cloned()
            .ok_or(DuelError::DuelNotFound(duel_id))
    }

    fn snapshot(&self) -> Vec<(Uuid, DuelHandle)> {
        self.duels
            .read()
            .iter()
            .map(|(id, handle)| (*id, handle.clone()))
            .collect()
    }

    fn reserve_commitment(&self, commitment: Commitment) -> Result<()> {
        if !self.commitments.lock().insert(commitment) {
            return Err(DuelError::CommitmentInUse);
        }
        Ok(())
    }

    fn release_commitments(&self, commitments: impl IntoIterator<Item = Commitment>) {
        let mut reserved = self.commitments.lock();
        for commitment in commitments {
            reserved.remove(&commitment);
        }
    }

    async fn check_eligibility(&self, player: &PlayerId) -> Result<()> {
        let entry = &self.config.entry;

        if !entry.element_ids.is_empty() && !self.owns_any(player, entry.element_assets()).await? {
            return Err(DuelError::InsufficientResources(format!(
                "{} owns no eligible element",
                player
            )));
        }

        if !entry.ticket_ids.is_empty() && !self.owns_any(player, entry.ticket_assets()).await? {
            return Err(DuelError::InsufficientResources(format!(
                "{} owns no eligible ticket",
                player
            )));
        }

        Ok(())
    }

    async fn owns_any(
        &self,
        player: &PlayerId,
        assets: impl Iterator<Item = AssetId>,
    ) -> Result<bool> {
        for asset in assets {
            if self.gateway.owns_asset(player, asset).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn debit_stake(&self, player: &PlayerId, stake: Mana) -> Result<()> {
        match self.gateway.debit(player, stake).await {
            Ok(()) => Ok(()),
            Err(CoreError::InsufficientBalance { need, available }) => {
                Err(DuelError::InsufficientResources(format!(
                    "{} needs {} mana, has {}",
                    player, need, available
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lazy forfeit ahead of a player action. A failed payout is logged so
    /// the caller still sees why the action came too late.
    async fn apply_expiry(&self, duel: &mut Duel, now: DateTime<Utc>) -> Result<()> {
        let Some(settlements) = duel.expire(now) else {
            return Ok(());
        };

        match self.settle(duel, settlements).await {
            Err(DuelError::Settlement(failures)) => {
                tracing::warn!(
                    "Duel {} expired with unsettled credits: {}",
                    duel.id(),
                    failures
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Claim markers, persist them, then issue the gateway calls.
    async fn settle(&self, duel: &mut Duel, settlements: Vec<Settlement>) -> Result<()> {
        let claimed = duel.claim(settlements);
        self.persist(duel).await?;

        let mut failures = Vec::new();
        for settlement in claimed {
            if let Err(e) = self.issue(duel, settlement).await {
                tracing::error!(
                    "Duel {} settlement {:?} failed: {}",
                    duel.id(),
                    settlement,
                    e
                );
                failures.push(format!("{:?}: {}", settlement, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DuelError::Settlement(failures.join("; ")))
        }
    }

    async fn issue(&self, duel: &Duel, settlement: Settlement) -> Result<()> {
        let player = duel.player(settlement.side()).ok_or_else(|| {
            DuelError::Internal(format!("Duel {} has no {:?} seat", duel.id(), settlement.side()))
        })?;

        match settlement {
            Settlement::Refund { amount, .. } | Settlement::Payout { amount, .. } => {
                self.gateway.credit(player, amount).await?
            }
            Settlement::Points { amount, .. } => self.gateway.award_points(player, amount).await?,
            Settlement::Reward { .. } => self.gateway.mint_reward(player, duel.id()).await?,
        }

        Ok(())
    }

    async fn persist(&self, duel: &Duel) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        let stored = StoredDuel {
            id: duel.id(),
            state: duel.state().as_str().to_string(),
            starter: duel.starter().player.to_string(),
            opponent: duel.opponent().map(|seat| seat.player.to_string()),
            record: serde_json::to_string(duel)?,
            updated_at: self.clock.now(),
        };

        DuelStore::new(storage).save_duel(&stored).await?;
        Ok(())
    }
}
