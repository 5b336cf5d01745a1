use crate::{DuelError, Result};
use chrono::Duration;
use elemental_core::{AssetId, Mana, TicketClass};
use serde::{Deserialize, Serialize};

/// Upper bound for any configured window: 100 years.
pub const MAX_WINDOW_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// What a player must hold to start or join a duel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPolicy {
    /// Mana debited from each player, captured as the duel's stake.
    pub mana_cost: Mana,
    /// Player must own at least one of these element tokens (empty = none required).
    pub element_ids: Vec<u32>,
    /// Player must own at least one of these tickets (empty = none required).
    pub ticket_ids: Vec<u32>,
}

impl Default for EntryPolicy {
    fn default() -> Self {
        Self {
            mana_cost: 1,
            element_ids: Vec::new(),
            ticket_ids: Vec::new(),
        }
    }
}

impl EntryPolicy {
    /// Requires one of the 25 element tokens and an economy, business or
    /// first class ticket.
    pub fn elemental() -> Self {
        Self {
            mana_cost: 1,
            element_ids: (1..=25).collect(),
            ticket_ids: TicketClass::ALL.iter().map(|class| class.id()).collect(),
        }
    }

    pub fn element_assets(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.element_ids.iter().map(|id| AssetId::Element(*id))
    }

    pub fn ticket_assets(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.ticket_ids.iter().map(|id| AssetId::Ticket(*id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelConfig {
    pub reveal_window_secs: u64,
    pub join_timeout_secs: u64,
    pub entry: EntryPolicy,
    pub win_points: u64,
    pub draw_points: u64,
    /// How long terminal duels stay queryable before pruning.
    pub retention_secs: u64,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            reveal_window_secs: 600,
            join_timeout_secs: 900,
            entry: EntryPolicy::default(),
            win_points: 10,
            draw_points: 1,
            retention_secs: 3600,
        }
    }
}

impl DuelConfig {
    pub fn new(reveal_window_secs: u64, join_timeout_secs: u64) -> Self {
        Self {
            reveal_window_secs,
            join_timeout_secs,
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, entry: EntryPolicy) -> Self {
        self.entry = entry;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn reveal_window(&self) -> Duration {
        Duration::seconds(self.reveal_window_secs as i64)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::seconds(self.join_timeout_secs as i64)
    }

    pub fn retention(&self) -> Duration {
        Duration::seconds(self.retention_secs as i64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reveal_window_secs == 0 {
            return Err(DuelError::Config(
                "Reveal window must be greater than 0".to_string(),
            ));
        }

        if self.join_timeout_secs == 0 {
            return Err(DuelError::Config(
                "Join timeout must be greater than 0".to_string(),
            ));
        }

        if self.reveal_window_secs > MAX_WINDOW_SECS
            || self.join_timeout_secs > MAX_WINDOW_SECS
            || self.retention_secs > MAX_WINDOW_SECS
        {
            return Err(DuelError::Config("Duration out of range".to_string()));
        }

        if self.entry.mana_cost.checked_mul(2).is_none() {
            return Err(DuelError::Config("Mana cost too large".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = DuelConfig::default();
        assert_eq!(config.reveal_window_secs, 600);
        assert_eq!(config.join_timeout_secs, 900);
        assert_eq!(config.entry.mana_cost, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_windows_rejected() {
        assert!(matches!(
            DuelConfig::new(0, 900).validate(),
            Err(DuelError::Config(_))
        ));
        assert!(matches!(
            DuelConfig::new(600, 0).validate(),
            Err(DuelError::Config(_))
        ));
    }

    #[test]
    fn test_oversized_windows_rejected() {
        assert!(DuelConfig::new(600, MAX_WINDOW_SECS).validate().is_ok());
        assert!(matches!(
            DuelConfig::new(600, 10_000_000_000_000).validate(),
            Err(DuelError::Config(_))
        ));
        assert!(matches!(
            DuelConfig::new(MAX_WINDOW_SECS + 1, 900).validate(),
            Err(DuelError::Config(_))
        ));

        let mut config = DuelConfig::default();
        config.retention_secs = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::to_string(&DuelConfig::new(30, 60).with_entry(EntryPolicy::elemental()))
            .unwrap();
        let config = DuelConfig::from_json(&json).unwrap();

        assert_eq!(config.reveal_window(), Duration::seconds(30));
        assert_eq!(config.join_timeout(), Duration::seconds(60));
        assert_eq!(config.entry.element_ids.len(), 25);
        assert_eq!(
            config.entry.ticket_assets().collect::<Vec<_>>(),
            TicketClass::ALL.map(TicketClass::asset).to_vec()
        );

        let bad = r#"{"reveal_window_secs":0,"join_timeout_secs":1,"entry":{"mana_cost":1,"element_ids":[],"ticket_ids":[]},"win_points":1,"draw_points":0,"retention_secs":0}"#;
        assert!(DuelConfig::from_json(bad).is_err());
    }
}
