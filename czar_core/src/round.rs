use std::collections::BTreeMap;

use itertools::Itertools;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::{card::Card, error::GameError, player::PeerId, utils::VecExtensions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Selecting,
    Judging,
    ShowingWinner,
    GameOver,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        self == &Phase::GameOver
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub player_id: PeerId,
    pub player_name: String,
    pub card: Card,
}

/// Points per player. Only ever incremented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreBoard(BTreeMap<PeerId, u32>);

impl ScoreBoard {
    pub fn reset<'a, I>(players: I) -> Self
    where
        I: IntoIterator<Item = &'a PeerId>,
    {
        ScoreBoard(players.into_iter().map(|id| (id.clone(), 0)).collect())
    }

    /// Adds a zero entry for a player who joined after the reset.
    pub fn ensure(&mut self, player: &PeerId) {
        self.0.entry(player.clone()).or_insert(0);
    }

    pub fn award(&mut self, player: &PeerId) -> u32 {
        let points = self.0.entry(player.clone()).or_insert(0);
        *points += 1;
        *points
    }

    pub fn get(&self, player: &PeerId) -> u32 {
        self.0.get(player).copied().unwrap_or(0)
    }

    /// Top of the ranking; ties go to the lowest id.
    pub fn leader(&self) -> Option<(&PeerId, u32)> {
        self.ranking().into_iter().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, u32)> {
        self.0.iter().map(|(id, &points)| (id, points))
    }

    /// Players by descending points, ties in id order.
    pub fn ranking(&self) -> Vec<(&PeerId, u32)> {
        self.iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundState {
    pub round_number: u32,
    pub black_card: Card,
    pub czar_id: PeerId,
    pub phase: Phase,
    pub submissions: Vec<Submission>,
    pub judging_order: Option<Vec<Submission>>,
    pub winner: Option<Submission>,
}

impl RoundState {
    pub fn new(round_number: u32, black_card: Card, czar_id: PeerId) -> Self {
        RoundState {
            round_number,
            black_card,
            czar_id,
            phase: Phase::Selecting,
            submissions: vec![],
            judging_order: None,
            winner: None,
        }
    }

    pub fn expect_phase(&self, expected: Phase) -> Result<(), GameError> {
        if self.phase != expected {
            return Err(GameError::WrongPhase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    pub fn has_submitted(&self, player: &PeerId) -> bool {
        self.submissions.iter().any(|s| &s.player_id == player)
    }

    /// Inserts the submission, replacing an earlier one from the same player.
    /// Returns the replaced submission.
    pub fn submit(&mut self, submission: Submission) -> Result<Option<Submission>, GameError> {
        self.expect_phase(Phase::Selecting)?;
        if submission.player_id == self.czar_id {
            return Err(GameError::IsCzar);
        }
        let previous = self
            .submissions
            .remove_first_where(|s| s.player_id == submission.player_id);
        self.submissions.push(submission);
        Ok(previous)
    }

    /// Drops a departed player's submission while cards are still being collected.
    pub fn withdraw(&mut self, player: &PeerId) -> Option<Submission> {
        if self.phase != Phase::Selecting {
            return None;
        }
        self.submissions.remove_first_where(|s| &s.player_id == player)
    }

    /// Fixes the judging order as a shuffle of an independent copy of the
    /// submissions. The order stays put until the round advances.
    pub fn begin_judging<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&[Submission], GameError> {
        self.expect_phase(Phase::Selecting)?;
        let mut order = self.submissions.clone();
        order.shuffle(rng);
        self.submissions = order.clone();
        self.phase = Phase::Judging;
        let order: &[Submission] = self.judging_order.insert(order);
        Ok(order)
    }

    pub fn resolve(&mut self, czar: &PeerId, winner_id: &PeerId) -> Result<Submission, GameError> {
        self.expect_phase(Phase::Judging)?;
        if czar != &self.czar_id {
            return Err(GameError::NotCzar(czar.clone()));
        }
        let winner = self
            .judging_order
            .as_ref()
            .and_then(|order| order.iter().find(|s| &s.player_id == winner_id))
            .cloned()
            .ok_or_else(|| GameError::UnknownWinner(winner_id.clone()))?;
        self.winner = Some(winner.clone());
        Ok(winner)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::{
        card::Card,
        error::GameError,
        player::PeerId,
        round::{Phase, RoundState, ScoreBoard, Submission},
    };

    #[test]
    fn submit_should_replace_an_earlier_submission_from_the_same_player() {
        let mut round = round_with_czar("a");

        assert_eq!(round.submit(submission("b", "X")), Ok(None));
        round.submit(submission("c", "Z")).unwrap();
        let replaced = round.submit(submission("b", "Y")).unwrap();

        assert_eq!(replaced.map(|s| s.card), Some(Card::new("X")));
        assert_eq!(round.submissions.len(), 2);
        assert!(round
            .submissions
            .iter()
            .any(|s| s.player_id == PeerId::from("b") && s.card == Card::new("Y")));
    }

    #[test]
    fn submit_should_reject_the_czar() {
        let mut round = round_with_czar("a");

        assert_eq!(round.submit(submission("a", "X")), Err(GameError::IsCzar));
        assert!(round.submissions.is_empty());
    }

    #[test]
    fn submit_should_reject_outside_selecting() {
        let mut round = round_with_czar("a");
        round.phase = Phase::Judging;

        assert_eq!(
            round.submit(submission("b", "X")),
            Err(GameError::WrongPhase {
                expected: Phase::Selecting,
                actual: Phase::Judging
            })
        );
    }

    #[test]
    fn begin_judging_should_fix_a_permutation_of_the_submissions() {
        let mut round = round_with_czar("a");
        for (player, text) in [("b", "1"), ("c", "2"), ("d", "3"), ("e", "4")] {
            round.submit(submission(player, text)).unwrap();
        }
        let before = round.submissions.clone();

        let order = round
            .begin_judging(&mut StdRng::seed_from_u64(7))
            .unwrap()
            .to_vec();

        assert_eq!(round.phase, Phase::Judging);
        assert_eq!(order.len(), before.len());
        assert!(before.iter().all(|s| order.contains(s)));
        assert_eq!(round.judging_order, Some(order));
        assert!(round.begin_judging(&mut StdRng::seed_from_u64(8)).is_err());
    }

    #[test]
    fn resolve_should_only_accept_the_czar_and_known_winners() {
        let mut round = round_with_czar("a");
        round.submit(submission("b", "1")).unwrap();
        round.submit(submission("c", "2")).unwrap();
        round.begin_judging(&mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(
            round.resolve(&PeerId::from("b"), &PeerId::from("c")),
            Err(GameError::NotCzar(PeerId::from("b")))
        );
        assert_eq!(
            round.resolve(&PeerId::from("a"), &PeerId::from("z")),
            Err(GameError::UnknownWinner(PeerId::from("z")))
        );
        let winner = round
            .resolve(&PeerId::from("a"), &PeerId::from("c"))
            .unwrap();
        assert_eq!(winner.card, Card::new("2"));
        assert_eq!(round.winner, Some(winner));
    }

    #[test]
    fn withdraw_should_only_apply_while_selecting() {
        let mut round = round_with_czar("a");
        round.submit(submission("b", "1")).unwrap();
        round.submit(submission("c", "2")).unwrap();

        assert!(round.withdraw(&PeerId::from("b")).is_some());
        round.begin_judging(&mut StdRng::seed_from_u64(1)).unwrap();
        assert!(round.withdraw(&PeerId::from("c")).is_none());
        assert_eq!(round.judging_order.map(|o| o.len()), Some(1));
    }

    #[test]
    fn score_board_should_count_wins_and_report_the_leader() {
        let ids = [PeerId::from("a"), PeerId::from("b")];
        let mut scores = ScoreBoard::reset(&ids);

        assert_eq!(scores.award(&ids[1]), 1);
        assert_eq!(scores.award(&ids[1]), 2);
        scores.ensure(&PeerId::from("late"));

        assert_eq!(scores.get(&ids[0]), 0);
        assert_eq!(scores.get(&PeerId::from("late")), 0);
        assert_eq!(scores.leader(), Some((&ids[1], 2)));
        assert_eq!(
            scores.ranking(),
            vec![(&ids[1], 2), (&ids[0], 0), (&PeerId::from("late"), 0)]
        );
    }

    // Infra ----------------------------------------------------------------

    fn round_with_czar(czar: &str) -> RoundState {
        RoundState::new(1, Card::prompt("_ is why I can't sleep.", 1), PeerId::from(czar))
    }

    fn submission(player: &str, text: &str) -> Submission {
        Submission {
            player_id: PeerId::from(player),
            player_name: player.to_uppercase(),
            card: Card::new(text),
        }
    }
}
