use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    bot::AutonomousPlayer,
    card::{Card, CardSet},
    config::GameConfig,
    deck::Deck,
    error::GameError,
    player::{PeerId, Player},
    protocol::{
        CardsUpdate, GameOver, GameStateSync, JoinConfirmed, JudgingStart, Message, NewRound,
        Outgoing, PlayedCardView, PlayerNotice, PreviousRound, ScoreUpdate, StartGame,
    },
    roster::Roster,
    round::{Phase, RoundState, ScoreBoard, Submission},
    schedule::{Schedule, Task},
};

/// The authoritative game. Every mutation of shared state goes through one of
/// the command methods below, which push the resulting broadcasts onto `out`.
#[derive(Debug)]
pub struct HostGame {
    config: GameConfig,
    host_id: PeerId,
    roster: Roster,
    deck: Deck,
    hands: BTreeMap<PeerId, Vec<Card>>,
    round: Option<RoundState>,
    scores: ScoreBoard,
    schedule: Schedule,
    rng: StdRng,
    bot: Option<AutonomousPlayer>,
}

/// Serializable export of the host state. Pending scheduled tasks keep the
/// time they had left, so a restored host resumes a transition that was
/// waiting on a timer. The shuffle stream continues from `rng_seed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub config: GameConfig,
    pub host_id: PeerId,
    pub roster: Roster,
    pub deck: Deck,
    pub hands: BTreeMap<PeerId, Vec<Card>>,
    pub round: Option<RoundState>,
    pub scores: ScoreBoard,
    pub pending: Vec<(Task, Duration)>,
    pub rng_seed: u64,
    pub bot: Option<AutonomousPlayer>,
}

impl HostGame {
    pub fn new(
        config: GameConfig,
        host_id: PeerId,
        host_name: impl Into<String>,
        card_set: CardSet,
    ) -> Self {
        let mut rng = seeded_rng(&config);
        let deck = Deck::shuffled(card_set, &mut rng);
        let mut roster = Roster::new();
        roster.add_player(Player::host(host_id.clone(), host_name));
        let bot = if config.with_bot {
            let bot = AutonomousPlayer::new(&host_id);
            roster.add_player(bot.player());
            Some(bot)
        } else {
            None
        };
        HostGame {
            config,
            host_id,
            roster,
            deck,
            hands: BTreeMap::new(),
            round: None,
            scores: ScoreBoard::default(),
            schedule: Schedule::default(),
            rng,
            bot,
        }
    }

    pub fn restore(snapshot: HostSnapshot, now: Instant) -> Self {
        let mut schedule = Schedule::default();
        for (task, left) in snapshot.pending {
            schedule.set(task, now, left);
        }
        info!("host state restored, {} task(s) re-armed", schedule.pending().len());
        HostGame {
            rng: StdRng::seed_from_u64(snapshot.rng_seed),
            config: snapshot.config,
            host_id: snapshot.host_id,
            roster: snapshot.roster,
            deck: snapshot.deck,
            hands: snapshot.hands,
            round: snapshot.round,
            scores: snapshot.scores,
            schedule,
            bot: snapshot.bot,
        }
    }

    /// Exports the state as of `now`. The live shuffle stream is left untouched.
    pub fn snapshot(&self, now: Instant) -> HostSnapshot {
        HostSnapshot {
            config: self.config.clone(),
            host_id: self.host_id.clone(),
            roster: self.roster.clone(),
            deck: self.deck.clone(),
            hands: self.hands.clone(),
            round: self.round.clone(),
            scores: self.scores.clone(),
            pending: self.schedule.remaining(now),
            rng_seed: self.rng.clone().gen(),
            bot: self.bot.clone(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn host_id(&self) -> &PeerId {
        &self.host_id
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn round(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.round.as_ref().map(|r| r.phase)
    }

    pub fn scores(&self) -> &ScoreBoard {
        &self.scores
    }

    pub fn hand(&self, player: &PeerId) -> Option<&[Card]> {
        self.hands.get(player).map(|h| h.as_slice())
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn bot(&self) -> Option<&AutonomousPlayer> {
        self.bot.as_ref()
    }

    pub fn pending_tasks(&self) -> Vec<Task> {
        self.schedule.pending()
    }

    fn game_active(&self) -> bool {
        self.round.as_ref().map_or(false, |r| !r.phase.is_terminal())
    }

    pub fn add_player(
        &mut self,
        id: PeerId,
        name: String,
        out: &mut Vec<Outgoing>,
    ) -> Result<(), GameError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(GameError::InvalidName);
        }
        info!("{} ({}) joined", name, id);
        self.roster.add_player(Player::new(id.clone(), name));
        if self.game_active() {
            let hand = self
                .deck
                .draw_responses(self.config.cards_per_hand, &mut self.rng);
            debug!("dealt {} cards to late joiner {}", hand.len(), id);
            self.hands.insert(id.clone(), hand);
            self.scores.ensure(&id);
        }
        out.push(Outgoing::all(Message::PlayerList(self.roster.snapshot())));
        out.push(Outgoing::peer(
            id.clone(),
            Message::JoinConfirmed(JoinConfirmed {
                players: self.roster.snapshot(),
                host_id: self.host_id.clone(),
                game_state: self.sync_for(&id),
            }),
        ));
        Ok(())
    }

    pub fn remove_player(
        &mut self,
        id: &PeerId,
        now: Instant,
        out: &mut Vec<Outgoing>,
    ) -> Result<(), GameError> {
        let removed = self
            .roster
            .get(id)
            .cloned()
            .ok_or_else(|| GameError::UnknownPlayer(id.clone()))?;
        let was_czar = self.game_active()
            && self.round.as_ref().map_or(false, |r| &r.czar_id == id);
        let successor = self.roster.next_czar(id).filter(|next| next != id);

        self.roster.remove_player(id);
        self.hands.remove(id);
        info!("{} ({}) left", removed.name, id);
        out.push(Outgoing::all(Message::PlayerList(self.roster.snapshot())));
        out.push(Outgoing::all(Message::PlayerDisconnected(PlayerNotice {
            player_id: id.clone(),
            player_name: removed.name,
        })));

        if !self.game_active() {
            return Ok(());
        }
        if self.roster.len() < self.config.min_players {
            info!("too few players left, ending the game");
            self.finish(None, out);
            return Ok(());
        }
        if was_czar {
            let next = successor.ok_or(GameError::NotEnoughPlayers {
                needed: self.config.min_players,
                actual: self.roster.len(),
            })?;
            info!("czar left, forcing a new round");
            return self.advance_round_with(next, now, out);
        }
        let withdrawn = self
            .round
            .as_mut()
            .and_then(|round| round.withdraw(id))
            .is_some();
        if self.phase() == Some(Phase::Selecting) {
            if withdrawn {
                self.broadcast_cards_update(out);
            }
            if self.submissions_complete() {
                self.begin_judging(out)?;
            }
        }
        Ok(())
    }

    pub fn start_game(&mut self, now: Instant, out: &mut Vec<Outgoing>) -> Result<(), GameError> {
        if self.game_active() {
            return Err(GameError::GameInProgress);
        }
        if self.roster.len() < self.config.min_players {
            return Err(GameError::NotEnoughPlayers {
                needed: self.config.min_players,
                actual: self.roster.len(),
            });
        }
        let czar = self
            .roster
            .random_czar(&mut self.rng)
            .ok_or(GameError::NotEnoughPlayers {
                needed: self.config.min_players,
                actual: 0,
            })?;

        self.deck.restart(&mut self.rng);
        let black_card = self.deck.draw_prompt(&mut self.rng)?;
        self.hands.clear();
        for player in self.roster.iter() {
            let hand = self
                .deck
                .draw_responses(self.config.cards_per_hand, &mut self.rng);
            self.hands.insert(player.id.clone(), hand);
        }
        self.scores = ScoreBoard::reset(self.roster.iter().map(|p| &p.id));
        self.schedule.clear();
        self.round = Some(RoundState::new(1, black_card.clone(), czar.clone()));
        info!("game started, {} is czar", czar);

        for player in self.roster.humans() {
            let mut player_hands = BTreeMap::new();
            if let Some(hand) = self.hands.get(&player.id) {
                player_hands.insert(player.id.clone(), hand.clone());
            }
            out.push(Outgoing::peer(
                player.id.clone(),
                Message::StartGame(StartGame {
                    black_card: black_card.clone(),
                    player_hands,
                    first_czar: czar.clone(),
                    round_number: 1,
                    scores: self.scores.clone(),
                }),
            ));
        }
        self.schedule_bot(now);
        Ok(())
    }

    /// Accepts a card from a non-czar player's hand. A re-submission replaces
    /// the earlier card, which goes back into the hand.
    pub fn submit_card(
        &mut self,
        submission: Submission,
        now: Instant,
        out: &mut Vec<Outgoing>,
    ) -> Result<(), GameError> {
        let player_id = submission.player_id;
        let round = self.round.as_mut().ok_or(GameError::GameNotStarted)?;
        round.expect_phase(Phase::Selecting)?;
        if round.czar_id == player_id {
            return Err(GameError::IsCzar);
        }
        let player_name = self
            .roster
            .get(&player_id)
            .map(|p| p.name.clone())
            .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;
        let hand = self
            .hands
            .get_mut(&player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;
        let position = hand
            .iter()
            .position(|c| c == &submission.card)
            .ok_or_else(|| GameError::CardNotInHand(player_id.clone()))?;

        let replaced = round.submit(Submission {
            player_id: player_id.clone(),
            player_name,
            card: submission.card,
        })?;
        hand.remove(position);
        if let Some(previous) = replaced {
            debug!("{} changed their card", player_id);
            hand.push(previous.card);
        }
        info!(
            "{} submitted ({}/{})",
            player_id,
            round.submissions.len(),
            self.roster.len().saturating_sub(1)
        );

        self.broadcast_cards_update(out);
        if self.submissions_complete() {
            self.begin_judging(out)
        } else {
            self.schedule_bot(now);
            Ok(())
        }
    }

    pub fn choose_winner(
        &mut self,
        czar: &PeerId,
        winner_id: &PeerId,
        now: Instant,
        out: &mut Vec<Outgoing>,
    ) -> Result<(), GameError> {
        let round = self.round.as_mut().ok_or(GameError::GameNotStarted)?;
        let winner = round.resolve(czar, winner_id)?;
        let points = self.scores.award(&winner.player_id);
        info!(
            "{} wins round {} ({} points)",
            winner.player_name, round.round_number, points
        );

        if points >= self.config.points_to_win {
            self.finish(Some(winner), out);
            return Ok(());
        }
        round.phase = Phase::ShowingWinner;
        let round_number = round.round_number;
        out.push(Outgoing::all(Message::ScoreUpdate(ScoreUpdate {
            scores: self.scores.clone(),
            round_winner: winner,
        })));
        self.schedule.set(
            Task::AdvanceRound { round_number },
            now,
            self.config.advance_delay,
        );
        Ok(())
    }

    /// Moves from the winner screen to the next round, rotating the czar.
    pub fn advance_round(&mut self, now: Instant, out: &mut Vec<Outgoing>) -> Result<(), GameError> {
        let round = self.round.as_ref().ok_or(GameError::GameNotStarted)?;
        round.expect_phase(Phase::ShowingWinner)?;
        let next = self
            .roster
            .next_czar(&round.czar_id)
            .ok_or(GameError::NotEnoughPlayers {
                needed: self.config.min_players,
                actual: self.roster.len(),
            })?;
        self.advance_round_with(next, now, out)
    }

    fn advance_round_with(
        &mut self,
        next_czar: PeerId,
        now: Instant,
        out: &mut Vec<Outgoing>,
    ) -> Result<(), GameError> {
        let round = self.round.as_ref().ok_or(GameError::GameNotStarted)?;
        if round.phase.is_terminal() {
            return Err(GameError::WrongPhase {
                expected: Phase::ShowingWinner,
                actual: round.phase,
            });
        }
        let previous = PreviousRound {
            czar: round.czar_id.clone(),
            round_number: round.round_number,
            winner: round.winner.as_ref().map(|w| w.player_id.clone()),
        };
        let black_card = self.deck.draw_prompt(&mut self.rng)?;
        debug!(
            "{} prompt(s) left in pass {}",
            self.deck.remaining_prompts(),
            self.deck.prompt_epoch()
        );

        // Hands are capped, so a player whose card was never used up gets nothing.
        let mut new_cards = BTreeMap::new();
        for player in self.roster.iter() {
            if player.id == previous.czar {
                continue;
            }
            let hand = self.hands.entry(player.id.clone()).or_default();
            if hand.len() >= self.config.cards_per_hand {
                continue;
            }
            if let Some(card) = self.deck.draw_responses(1, &mut self.rng).pop() {
                hand.push(card.clone());
                new_cards.insert(player.id.clone(), card);
            }
        }

        let round_number = previous.round_number + 1;
        self.round = Some(RoundState::new(
            round_number,
            black_card.clone(),
            next_czar.clone(),
        ));
        self.schedule.clear();
        info!("round {} begins, {} is czar", round_number, next_czar);

        for player in self.roster.humans() {
            let mut own = BTreeMap::new();
            if let Some(card) = new_cards.get(&player.id) {
                own.insert(player.id.clone(), card.clone());
            }
            out.push(Outgoing::peer(
                player.id.clone(),
                Message::NewRound(NewRound {
                    black_card: black_card.clone(),
                    czar: next_czar.clone(),
                    round_number,
                    new_cards: own,
                    previous_state: Some(previous.clone()),
                }),
            ));
        }
        self.schedule_bot(now);
        Ok(())
    }

    /// Runs every scheduled task that is due. Tasks left over from an earlier
    /// round are dropped.
    pub fn poll(&mut self, now: Instant, out: &mut Vec<Outgoing>) {
        for task in self.schedule.take_due(now) {
            let current = self.round.as_ref().map(|r| r.round_number);
            let result = match task {
                Task::AdvanceRound { round_number } if current == Some(round_number) => {
                    self.advance_round(now, out)
                }
                Task::BotSubmit { round_number } if current == Some(round_number) => {
                    self.bot_submit(now, out)
                }
                stale => {
                    debug!("dropping stale task {:?}", stale);
                    Ok(())
                }
            };
            if let Err(e) = result {
                warn!("scheduled {:?} failed: {}", task, e);
            }
        }
    }

    fn bot_submit(&mut self, now: Instant, out: &mut Vec<Outgoing>) -> Result<(), GameError> {
        let bot = match (&self.bot, &self.round) {
            (Some(bot), Some(round)) if bot.wants_to_play(round) => bot.clone(),
            _ => return Ok(()),
        };
        let hand = self.hands.entry(bot.id.clone()).or_default();
        if hand.is_empty() {
            hand.extend(self.deck.draw_responses(1, &mut self.rng));
        }
        let index = bot
            .choose_card(hand, &mut self.rng)
            .ok_or(GameError::DeckExhausted)?;
        let card = hand[index].clone();
        debug!("{} plays a card", bot.name);
        self.submit_card(
            Submission {
                player_id: bot.id.clone(),
                player_name: bot.name,
                card,
            },
            now,
            out,
        )
    }

    fn schedule_bot(&mut self, now: Instant) {
        if let (Some(bot), Some(round)) = (&self.bot, &self.round) {
            if bot.wants_to_play(round) {
                let task = Task::BotSubmit {
                    round_number: round.round_number,
                };
                if !self.schedule.is_pending(&task) {
                    self.schedule.set(task, now, self.config.bot_delay);
                }
            }
        }
    }

    fn submissions_complete(&self) -> bool {
        self.round.as_ref().map_or(false, |r| {
            !r.submissions.is_empty() && r.submissions.len() + 1 == self.roster.len()
        })
    }

    fn begin_judging(&mut self, out: &mut Vec<Outgoing>) -> Result<(), GameError> {
        let round = self.round.as_mut().ok_or(GameError::GameNotStarted)?;
        let cards = round.begin_judging(&mut self.rng)?.to_vec();
        info!("all cards are in, judging {} submissions", cards.len());
        out.push(Outgoing::all(Message::JudgingStart(JudgingStart {
            cards,
            black_card: round.black_card.clone(),
        })));
        self.schedule
            .cancel_where(|t| matches!(t, Task::BotSubmit { .. }));
        Ok(())
    }

    fn finish(&mut self, winner: Option<Submission>, out: &mut Vec<Outgoing>) {
        if let Some(round) = self.round.as_mut() {
            round.phase = Phase::GameOver;
        }
        self.schedule.clear();
        match &winner {
            Some(w) => info!("game over, {} wins", w.player_name),
            None => info!("game over without a winner"),
        }
        out.push(Outgoing::all(Message::GameOver(GameOver {
            winner,
            final_scores: self.scores.clone(),
        })));
    }

    fn broadcast_cards_update(&self, out: &mut Vec<Outgoing>) {
        let phase = match self.phase() {
            Some(phase) => phase,
            None => return,
        };
        for player in self.roster.humans() {
            out.push(Outgoing::peer(
                player.id.clone(),
                Message::CardsUpdate(CardsUpdate {
                    played_cards: self.played_cards_for(&player.id),
                    phase,
                }),
            ));
        }
    }

    /// Submissions as `viewer` may see them: face down while cards are being
    /// collected, except for the viewer's own.
    fn played_cards_for(&self, viewer: &PeerId) -> Vec<PlayedCardView> {
        let round = match &self.round {
            Some(round) => round,
            None => return vec![],
        };
        round
            .submissions
            .iter()
            .map(|s| {
                let mut view = PlayedCardView::from(s);
                if round.phase == Phase::Selecting && &s.player_id != viewer {
                    view.card = None;
                }
                view
            })
            .collect()
    }

    fn sync_for(&self, viewer: &PeerId) -> Option<GameStateSync> {
        let round = self.round.as_ref()?;
        Some(GameStateSync {
            phase: round.phase,
            black_card: round.black_card.clone(),
            czar: round.czar_id.clone(),
            round_number: round.round_number,
            played_cards: self.played_cards_for(viewer),
            judging_order: round.judging_order.clone(),
            scores: self.scores.clone(),
            hand: self.hands.get(viewer).cloned().unwrap_or_default(),
            round_winner: round.winner.clone(),
        })
    }
}

fn seeded_rng(config: &GameConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
