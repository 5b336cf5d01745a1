use crate::commitment::{Commitment, Opening, Salt};
use crate::config::DuelConfig;
use crate::outcome::{resolve, Move, Outcome, Side, Winner};
use crate::settlement::{Purpose, Settlement, SettlementLog};
use crate::{DuelError, Result};
use chrono::{DateTime, Duration, Utc};
use elemental_core::{Mana, PlayerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a duel. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuelState {
    AwaitingOpponent,
    AwaitingReveals,
    Resolved,
    ForfeitedJoin,
    ForfeitedReveal,
}

impl DuelState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DuelState::Resolved | DuelState::ForfeitedJoin | DuelState::ForfeitedReveal
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DuelState::AwaitingOpponent => "AwaitingOpponent",
            DuelState::AwaitingReveals => "AwaitingReveals",
            DuelState::Resolved => "Resolved",
            DuelState::ForfeitedJoin => "ForfeitedJoin",
            DuelState::ForfeitedReveal => "ForfeitedReveal",
        }
    }
}

/// Economic and timing terms frozen when the duel is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelTerms {
    pub stake: Mana,
    pub reveal_window_secs: u64,
    pub win_points: u64,
    pub draw_points: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    pub mv: Move,
    pub salt: Salt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub player: PlayerId,
    pub commitment: Commitment,
    pub reveal: Option<Reveal>,
}

impl Seat {
    fn new(player: PlayerId, commitment: Commitment) -> Self {
        Self {
            player,
            commitment,
            reveal: None,
        }
    }

    pub fn has_revealed(&self) -> bool {
        self.reveal.is_some()
    }

    fn revealed_move(&self) -> Option<Move> {
        self.reveal.as_ref().map(|r| r.mv)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Duel {
    id: Uuid,
    terms: DuelTerms,
    state: DuelState,
    starter: Seat,
    opponent: Option<Seat>,
    created_at: DateTime<Utc>,
    join_deadline: DateTime<Utc>,
    joined_at: Option<DateTime<Utc>>,
    reveal_deadline: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    outcome: Option<Outcome>,
    settlements: SettlementLog,
}

impl Duel {
    /// New duel, built before the starter's stake is debited.
    pub fn new(
        id: Uuid,
        starter: PlayerId,
        commitment: Commitment,
        config: &DuelConfig,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let join_deadline = deadline(now, config.join_timeout())?;
        let mut settlements = SettlementLog::default();
        settlements.claim(Side::Starter, Purpose::Stake);

        Ok(Self {
            id,
            terms: DuelTerms {
                stake: config.entry.mana_cost,
                reveal_window_secs: config.reveal_window_secs,
                win_points: config.win_points,
                draw_points: config.draw_points,
            },
            state: DuelState::AwaitingOpponent,
            starter: Seat::new(starter, commitment),
            opponent: None,
            created_at: now,
            join_deadline,
            joined_at: None,
            reveal_deadline: None,
            finished_at: None,
            outcome: None,
            settlements,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> DuelState {
        self.state
    }

    pub fn terms(&self) -> &DuelTerms {
        &self.terms
    }

    pub fn stake(&self) -> Mana {
        self.terms.stake
    }

    pub fn starter(&self) -> &Seat {
        &self.starter
    }

    pub fn opponent(&self) -> Option<&Seat> {
        self.opponent.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn joined_at(&self) -> Option<DateTime<Utc>> {
        self.joined_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn join_deadline(&self) -> DateTime<Utc> {
        self.join_deadline
    }

    pub fn reveal_deadline(&self) -> Option<DateTime<Utc>> {
        self.reveal_deadline
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn settlements(&self) -> &SettlementLog {
        &self.settlements
    }

    pub fn commitments(&self) -> impl Iterator<Item = &Commitment> {
        std::iter::once(&self.starter.commitment)
            .chain(self.opponent.as_ref().map(|seat| &seat.commitment))
    }

    pub fn seat(&self, side: Side) -> Option<&Seat> {
        match side {
            Side::Starter => Some(&self.starter),
            Side::Opponent => self.opponent.as_ref(),
        }
    }

    pub fn player(&self, side: Side) -> Option<&PlayerId> {
        self.seat(side).map(|seat| &seat.player)
    }

    pub fn side_of(&self, player: &PlayerId) -> Option<Side> {
        if self.starter.player == *player {
            Some(Side::Starter)
        } else if self.opponent.as_ref().map_or(false, |s| s.player == *player) {
            Some(Side::Opponent)
        } else {
            None
        }
    }

    /// Past its deadline and still waiting on players.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            DuelState::AwaitingOpponent => now > self.join_deadline,
            DuelState::AwaitingReveals => self.reveal_deadline.map_or(false, |d| now > d),
            _ => false,
        }
    }

    /// Terminal and past the retention period.
    pub fn is_prunable(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        self.state.is_terminal()
            && self
                .finished_at
                .and_then(|at| at.checked_add_signed(retention))
                .map_or(false, |until| now > until)
    }

    /// Apply the timeout transition if a deadline has passed.
    ///
    /// Returns the settlements the forfeit requires, or `None` when the duel
    /// is not overdue. Calling it again after the transition is a no-op.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Option<Vec<Settlement>> {
        if !self.is_overdue(now) {
            return None;
        }

        let stake = self.terms.stake;

        match self.state {
            DuelState::AwaitingOpponent => {
                self.finish(DuelState::ForfeitedJoin, now);
                tracing::warn!("Duel {} forfeited: nobody joined in time", self.id);

                Some(vec![Settlement::Refund {
                    side: Side::Starter,
                    amount: stake,
                }])
            }
            DuelState::AwaitingReveals => {
                let starter_revealed = self.starter.has_revealed();
                let opponent_revealed = self.opponent.as_ref().map_or(false, Seat::has_revealed);

                match (starter_revealed, opponent_revealed) {
                    (true, false) | (false, true) => {
                        let side = if starter_revealed {
                            Side::Starter
                        } else {
                            Side::Opponent
                        };
                        self.outcome = Some(Outcome {
                            winner: Winner::Side(side),
                            starter_move: self.starter.revealed_move(),
                            opponent_move: self.opponent.as_ref().and_then(Seat::revealed_move),
                            by_forfeit: true,
                        });
                        self.finish(DuelState::Resolved, now);
                        tracing::warn!(
                            "Duel {} resolved by forfeit: {:?} failed to reveal",
                            self.id,
                            side.other()
                        );

                        Some(self.winner_settlements(side))
                    }
                    _ => {
                        self.finish(DuelState::ForfeitedReveal, now);
                        tracing::warn!("Duel {} forfeited: no reveals before deadline", self.id);

                        Some(vec![
                            Settlement::Refund {
                                side: Side::Starter,
                                amount: stake,
                            },
                            Settlement::Refund {
                                side: Side::Opponent,
                                amount: stake,
                            },
                        ])
                    }
                }
            }
            _ => None,
        }
    }

    /// Guards for a join attempt. Expiry must already have been applied.
    pub fn check_join(&self, player: &PlayerId, commitment: &Commitment) -> Result<()> {
        match self.state {
            DuelState::AwaitingOpponent => {}
            DuelState::ForfeitedJoin => return Err(DuelError::JoinWindowExpired(self.id)),
            _ => return Err(DuelError::DuelNotJoinable(self.id)),
        }

        if self.starter.player == *player {
            return Err(DuelError::SamePlayer);
        }

        if commitment.is_zero() {
            return Err(DuelError::InvalidCommitment);
        }

        if self.starter.commitment == *commitment {
            return Err(DuelError::CommitmentInUse);
        }

        Ok(())
    }

    /// Seat the opponent whose stake has already been debited.
    pub fn accept_opponent(
        &mut self,
        player: PlayerId,
        commitment: Commitment,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.check_join(&player, &commitment)?;
        let reveal_deadline = deadline(
            now,
            Duration::seconds(self.terms.reveal_window_secs as i64),
        )?;

        self.opponent = Some(Seat::new(player, commitment));
        self.joined_at = Some(now);
        self.reveal_deadline = Some(reveal_deadline);
        self.state = DuelState::AwaitingReveals;
        self.settlements.claim(Side::Opponent, Purpose::Stake);

        Ok(())
    }

    /// Verify and record a reveal. Expiry must already have been applied.
    ///
    /// Returns the settlements when this reveal completes the duel.
    pub fn reveal(
        &mut self,
        player: &PlayerId,
        mv: Move,
        salt: Salt,
        now: DateTime<Utc>,
    ) -> Result<Vec<Settlement>> {
        match self.state {
            DuelState::AwaitingReveals => {}
            DuelState::ForfeitedReveal => return Err(DuelError::RevealWindowExpired(self.id)),
            DuelState::Resolved if self.outcome.as_ref().map_or(false, |o| o.by_forfeit) => {
                return Err(DuelError::RevealWindowExpired(self.id))
            }
            _ => return Err(DuelError::WrongState(self.id)),
        }

        let side = self
            .side_of(player)
            .ok_or_else(|| DuelError::NotParticipant(player.to_string()))?;

        let seat = match side {
            Side::Starter => &mut self.starter,
            Side::Opponent => self
                .opponent
                .as_mut()
                .ok_or_else(|| DuelError::Internal("Opponent seat missing".to_string()))?,
        };

        if seat.has_revealed() {
            return Err(DuelError::AlreadyRevealed);
        }

        let opening = Opening {
            player: player.clone(),
            mv,
            salt,
        };
        if !seat.commitment.verify(&opening) {
            return Err(DuelError::CommitmentMismatch);
        }

        seat.reveal = Some(Reveal { mv, salt });
        tracing::debug!("Player {} revealed in duel {}", player, self.id);

        match (
            self.starter.revealed_move(),
            self.opponent.as_ref().and_then(Seat::revealed_move),
        ) {
            (Some(starter_move), Some(opponent_move)) => {
                Ok(self.resolve(starter_move, opponent_move, now))
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Claim markers for `settlements`, keeping only the ones not yet issued.
    pub fn claim(&mut self, settlements: Vec<Settlement>) -> Vec<Settlement> {
        settlements
            .into_iter()
            .filter(|s| self.settlements.claim(s.side(), s.purpose()))
            .collect()
    }

    /// Mana debited for this duel so far.
    pub fn mana_in(&self) -> Mana {
        let stakes = [Side::Starter, Side::Opponent]
            .into_iter()
            .filter(|side| self.settlements.contains(*side, Purpose::Stake))
            .count() as Mana;
        stakes * self.terms.stake
    }

    pub fn info(&self) -> DuelInfo {
        DuelInfo {
            id: self.id,
            state: self.state,
            stake: self.terms.stake,
            starter: self.starter.player.clone(),
            opponent: self.opponent.as_ref().map(|s| s.player.clone()),
            starter_revealed: self.starter.has_revealed(),
            opponent_revealed: self.opponent.as_ref().map_or(false, Seat::has_revealed),
            created_at: self.created_at,
            join_deadline: self.join_deadline,
            joined_at: self.joined_at,
            reveal_deadline: self.reveal_deadline,
            finished_at: self.finished_at,
            outcome: self.outcome.clone(),
        }
    }

    fn resolve(
        &mut self,
        starter_move: Move,
        opponent_move: Move,
        now: DateTime<Utc>,
    ) -> Vec<Settlement> {
        let winner = resolve(starter_move, opponent_move);
        self.outcome = Some(Outcome {
            winner,
            starter_move: Some(starter_move),
            opponent_move: Some(opponent_move),
            by_forfeit: false,
        });
        self.finish(DuelState::Resolved, now);

        tracing::info!(
            "Duel {} resolved: {} vs {} -> {:?}",
            self.id,
            starter_move,
            opponent_move,
            winner
        );

        match winner {
            Winner::Side(side) => self.winner_settlements(side),
            Winner::Draw => self.draw_settlements(),
        }
    }

    fn winner_settlements(&self, side: Side) -> Vec<Settlement> {
        let mut settlements = vec![Settlement::Payout {
            side,
            amount: self.terms.stake * 2,
        }];
        if self.terms.win_points > 0 {
            settlements.push(Settlement::Points {
                side,
                amount: self.terms.win_points,
            });
        }
        settlements.push(Settlement::Reward { side });
        settlements
    }

    fn draw_settlements(&self) -> Vec<Settlement> {
        let mut settlements = Vec::new();
        for side in [Side::Starter, Side::Opponent] {
            settlements.push(Settlement::Refund {
                side,
                amount: self.terms.stake,
            });
            if self.terms.draw_points > 0 {
                settlements.push(Settlement::Points {
                    side,
                    amount: self.terms.draw_points,
                });
            }
        }
        settlements
    }

    fn finish(&mut self, state: DuelState, now: DateTime<Utc>) {
        self.state = state;
        self.finished_at = Some(now);
    }
}

fn deadline(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(window).ok_or_else(|| {
        DuelError::Config(format!("Deadline {} after {} is out of range", window, now))
    })
}

/// Duel info for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelInfo {
    pub id: Uuid,
    pub state: DuelState,
    pub stake: Mana,
    pub starter: PlayerId,
    pub opponent: Option<PlayerId>,
    pub starter_revealed: bool,
    pub opponent_revealed: bool,
    pub created_at: DateTime<Utc>,
    pub join_deadline: DateTime<Utc>,
    pub joined_at: Option<DateTime<Utc>>,
    pub reveal_deadline: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<Outcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn commit(player: &str, mv: Move, salt_byte: u8) -> (PlayerId, Commitment, Salt) {
        let player = PlayerId::from(player);
        let salt = Salt::from_bytes([salt_byte; 32]);
        let commitment = Commitment::compute(&player, mv, &salt);
        (player, commitment, salt)
    }

    fn joined_duel() -> (Duel, (PlayerId, Salt), (PlayerId, Salt)) {
        let config = DuelConfig::default();
        let (alice, ca, sa) = commit("alice", Move::Rock, 1);
        let (bob, cb, sb) = commit("bob", Move::Scissors, 2);

        let mut duel = Duel::new(Uuid::new_v4(), alice.clone(), ca, &config, t0()).unwrap();
        duel.accept_opponent(bob.clone(), cb, t0() + Duration::seconds(10))
            .unwrap();
        (duel, (alice, sa), (bob, sb))
    }

    #[test]
    fn test_join_deadline_is_inclusive() {
        let config = DuelConfig::default();
        let (alice, ca, _) = commit("alice", Move::Rock, 1);
        let mut duel = Duel::new(Uuid::new_v4(), alice, ca, &config, t0()).unwrap();

        let deadline = t0() + Duration::seconds(900);
        assert_eq!(duel.join_deadline(), deadline);
        assert!(duel.expire(deadline).is_none());
        assert_eq!(duel.state(), DuelState::AwaitingOpponent);

        let settlements = duel.expire(deadline + Duration::seconds(1)).unwrap();
        assert_eq!(duel.state(), DuelState::ForfeitedJoin);
        assert_eq!(
            settlements,
            vec![Settlement::Refund {
                side: Side::Starter,
                amount: 1
            }]
        );

        // second expiry is a no-op
        assert!(duel.expire(deadline + Duration::seconds(5)).is_none());
    }

    #[test]
    fn test_deadlines_past_calendar_end_are_errors() {
        let config = DuelConfig::default();
        let (alice, ca, _) = commit("alice", Move::Rock, 1);
        let end = DateTime::<Utc>::MAX_UTC - Duration::seconds(60);

        assert!(matches!(
            Duel::new(Uuid::new_v4(), alice.clone(), ca, &config, end),
            Err(DuelError::Config(_))
        ));

        // opening fits, the reveal window does not
        let opened = end - Duration::seconds(900);
        let mut duel = Duel::new(Uuid::new_v4(), alice, ca, &config, opened).unwrap();
        let (bob, cb, _) = commit("bob", Move::Paper, 2);
        assert!(matches!(
            duel.accept_opponent(bob, cb, end),
            Err(DuelError::Config(_))
        ));
        assert_eq!(duel.state(), DuelState::AwaitingOpponent);
        assert!(duel.opponent().is_none());
        assert!(!duel.is_prunable(DateTime::<Utc>::MAX_UTC, config.retention()));
    }

    #[test]
    fn test_join_guards() {
        let config = DuelConfig::default();
        let (alice, ca, _) = commit("alice", Move::Rock, 1);
        let mut duel = Duel::new(Uuid::new_v4(), alice.clone(), ca, &config, t0()).unwrap();

        assert!(matches!(
            duel.check_join(&alice, &ca),
            Err(DuelError::SamePlayer)
        ));
        assert!(matches!(
            duel.check_join(&"bob".into(), &Commitment::ZERO),
            Err(DuelError::InvalidCommitment)
        ));
        assert!(matches!(
            duel.check_join(&"bob".into(), &ca),
            Err(DuelError::CommitmentInUse)
        ));

        let (bob, cb, _) = commit("bob", Move::Paper, 2);
        duel.accept_opponent(bob, cb, t0()).unwrap();

        let (carol, cc, _) = commit("carol", Move::Paper, 3);
        assert!(matches!(
            duel.check_join(&carol, &cc),
            Err(DuelError::DuelNotJoinable(_))
        ));
    }

    #[test]
    fn test_reveals_resolve_with_payout() {
        let (mut duel, (alice, sa), (bob, sb)) = joined_duel();
        let now = t0() + Duration::seconds(20);

        assert!(duel.reveal(&alice, Move::Rock, sa, now).unwrap().is_empty());
        assert!(matches!(
            duel.reveal(&alice, Move::Rock, sa, now),
            Err(DuelError::AlreadyRevealed)
        ));

        let settlements = duel.reveal(&bob, Move::Scissors, sb, now).unwrap();
        assert_eq!(duel.state(), DuelState::Resolved);
        assert_eq!(
            duel.outcome().unwrap().winner,
            Winner::Side(Side::Starter)
        );
        assert_eq!(
            settlements,
            vec![
                Settlement::Payout {
                    side: Side::Starter,
                    amount: 2
                },
                Settlement::Points {
                    side: Side::Starter,
                    amount: 10
                },
                Settlement::Reward {
                    side: Side::Starter
                },
            ]
        );
    }

    #[test]
    fn test_reveal_rejects_wrong_opening() {
        let (mut duel, (alice, sa), (bob, _)) = joined_duel();
        let now = t0() + Duration::seconds(20);

        assert!(matches!(
            duel.reveal(&alice, Move::Paper, sa, now),
            Err(DuelError::CommitmentMismatch)
        ));
        assert!(matches!(
            duel.reveal(&alice, Move::Rock, Salt::from_bytes([9; 32]), now),
            Err(DuelError::CommitmentMismatch)
        ));
        // bob cannot open alice's commitment
        assert!(matches!(
            duel.reveal(&bob, Move::Rock, sa, now),
            Err(DuelError::CommitmentMismatch)
        ));
        assert!(matches!(
            duel.reveal(&"mallory".into(), Move::Rock, sa, now),
            Err(DuelError::NotParticipant(_))
        ));
        assert_eq!(duel.state(), DuelState::AwaitingReveals);
    }

    #[test]
    fn test_draw_refunds_both() {
        let config = DuelConfig::default();
        let (alice, ca, sa) = commit("alice", Move::Paper, 1);
        let (bob, cb, sb) = commit("bob", Move::Paper, 2);
        let mut duel = Duel::new(Uuid::new_v4(), alice.clone(), ca, &config, t0()).unwrap();
        duel.accept_opponent(bob.clone(), cb, t0()).unwrap();

        duel.reveal(&alice, Move::Paper, sa, t0()).unwrap();
        let settlements = duel.reveal(&bob, Move::Paper, sb, t0()).unwrap();

        assert_eq!(duel.outcome().unwrap().winner, Winner::Draw);
        let refunded: Mana = settlements.iter().map(Settlement::mana).sum();
        assert_eq!(refunded, duel.mana_in());
    }

    #[test]
    fn test_one_sided_reveal_wins_on_expiry() {
        let (mut duel, _, (bob, sb)) = joined_duel();
        let deadline = duel.reveal_deadline().unwrap();

        duel.reveal(&bob, Move::Scissors, sb, deadline).unwrap();
        let settlements = duel.expire(deadline + Duration::seconds(1)).unwrap();

        assert_eq!(duel.state(), DuelState::Resolved);
        let outcome = duel.outcome().unwrap();
        assert!(outcome.by_forfeit);
        assert_eq!(outcome.winner, Winner::Side(Side::Opponent));
        assert_eq!(outcome.starter_move, None);
        assert!(!settlements
            .iter()
            .any(|s| matches!(s, Settlement::Refund { .. })));

        // a late reveal by the loser reports the expired window
        let (alice, sa) = (PlayerId::from("alice"), Salt::from_bytes([1; 32]));
        assert!(matches!(
            duel.reveal(&alice, Move::Rock, sa, deadline + Duration::seconds(2)),
            Err(DuelError::RevealWindowExpired(_))
        ));
    }

    #[test]
    fn test_silent_players_forfeit_reveal() {
        let (mut duel, (alice, sa), _) = joined_duel();
        let late = duel.reveal_deadline().unwrap() + Duration::seconds(1);

        let settlements = duel.expire(late).unwrap();
        assert_eq!(duel.state(), DuelState::ForfeitedReveal);
        assert_eq!(settlements.len(), 2);

        let first = duel.claim(settlements.clone());
        assert_eq!(first.len(), 2);
        assert!(duel.claim(settlements).is_empty());

        assert!(matches!(
            duel.reveal(&alice, Move::Rock, sa, late),
            Err(DuelError::RevealWindowExpired(_))
        ));
    }

    #[test]
    fn test_prunable_after_retention() {
        let (mut duel, _, _) = joined_duel();
        let late = duel.reveal_deadline().unwrap() + Duration::seconds(1);
        let retention = Duration::seconds(60);

        assert!(!duel.is_prunable(late, retention));
        duel.expire(late);
        assert!(!duel.is_prunable(late + retention, retention));
        assert!(duel.is_prunable(late + retention + Duration::seconds(1), retention));
    }
}
