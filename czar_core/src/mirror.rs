use log::{debug, info, warn};

use crate::{
    card::Card,
    player::{PeerId, Player},
    protocol::{
        CardsUpdate, CzarChoice, GameOver, GameStateSync, JoinConfirmed, JoinRequest,
        JudgingStart, Message, NewRound, PlayedCardView, ScoreUpdate, StartGame,
    },
    round::{Phase, ScoreBoard, Submission},
};

/// A card played locally that the host has not yet reflected back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlay {
    pub card: Card,
    pub acknowledged: bool,
}

/// What changed after applying a host message. Consumed by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorEvent {
    RosterChanged,
    Joined,
    GameStarted,
    CardsUpdated,
    JudgingStarted,
    ScoresUpdated(Submission),
    RoundStarted(u32),
    GameOver(Option<Submission>),
    Notice(String),
    Rejected(String),
    HostLost,
    PlayRolledBack(Card),
}

/// Read-only projection of the host's game, held by every peer (the host
/// included). Only inbound host messages change it, apart from the local
/// player's own hand when playing a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMirror {
    pub local_id: PeerId,
    pub name: String,
    pub host_id: PeerId,
    pub players: Vec<Player>,
    pub phase: Option<Phase>,
    pub round_number: u32,
    pub black_card: Option<Card>,
    pub czar: Option<PeerId>,
    pub played_cards: Vec<PlayedCardView>,
    pub judging_order: Option<Vec<Submission>>,
    pub scores: ScoreBoard,
    pub round_winner: Option<Submission>,
    pub game_winner: Option<Submission>,
    pub hand: Vec<Card>,
    pub my_play: Option<LocalPlay>,
    pub host_lost: bool,
    pub rejected: Option<String>,
}

impl ClientMirror {
    pub fn new(local_id: PeerId, name: impl Into<String>, host_id: PeerId) -> Self {
        ClientMirror {
            local_id,
            name: name.into(),
            host_id,
            players: vec![],
            phase: None,
            round_number: 0,
            black_card: None,
            czar: None,
            played_cards: vec![],
            judging_order: None,
            scores: ScoreBoard::default(),
            round_winner: None,
            game_winner: None,
            hand: vec![],
            my_play: None,
            host_lost: false,
            rejected: None,
        }
    }

    pub fn join_request(&self) -> Message {
        Message::JoinRequest(JoinRequest {
            id: self.local_id.clone(),
            name: self.name.clone(),
        })
    }

    pub fn is_host(&self) -> bool {
        self.local_id == self.host_id
    }

    pub fn is_czar(&self) -> bool {
        self.czar.as_ref() == Some(&self.local_id)
    }

    pub fn player_name(&self, id: &PeerId) -> Option<&str> {
        self.players
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.name.as_str())
    }

    /// Optimistically plays the card at `index`: it leaves the hand at once and
    /// the returned message is to be sent to the host. A card played earlier
    /// in the same round goes back into the hand, as the host does.
    pub fn play_card(&mut self, index: usize) -> Option<Message> {
        if self.phase != Some(Phase::Selecting) || self.is_czar() || index >= self.hand.len() {
            return None;
        }
        let card = self.hand.remove(index);
        if let Some(previous) = self.my_play.take() {
            self.hand.push(previous.card);
        }
        self.my_play = Some(LocalPlay {
            card: card.clone(),
            acknowledged: false,
        });
        let submission = Submission {
            player_id: self.local_id.clone(),
            player_name: self.name.clone(),
            card,
        };
        self.played_cards.retain(|p| p.player_id != self.local_id);
        self.played_cards.push(PlayedCardView::from(&submission));
        Some(Message::PlayedCard(submission))
    }

    pub fn select_winner(&self, player_id: &PeerId) -> Option<Message> {
        if self.phase != Some(Phase::Judging) || !self.is_czar() {
            return None;
        }
        let winner = self
            .judging_order
            .as_ref()?
            .iter()
            .find(|s| &s.player_id == player_id)?;
        Some(Message::CzarChoice(CzarChoice {
            winner_id: winner.player_id.clone(),
            card: winner.card.clone(),
            player_name: winner.player_name.clone(),
        }))
    }

    /// Applies a message from `from`. Anything not sent by the host is
    /// dropped. Applying the same message twice leaves the same state.
    pub fn apply(&mut self, from: &PeerId, message: Message) -> Vec<MirrorEvent> {
        if from != &self.host_id {
            warn!("ignored {} from non-host {}", message.label(), from);
            return vec![];
        }
        if !message.is_host_only() {
            warn!("ignored {}: peers only accept host messages", message.label());
            return vec![];
        }
        debug!("applying {}", message.label());
        match message {
            Message::PlayerList(players) => {
                self.players = players;
                vec![MirrorEvent::RosterChanged]
            }
            Message::JoinConfirmed(confirmed) => self.on_join_confirmed(confirmed),
            Message::StartGame(start) => self.on_start_game(start),
            Message::CardsUpdate(update) => self.on_cards_update(update),
            Message::JudgingStart(judging) => self.on_judging_start(judging),
            Message::ScoreUpdate(update) => self.on_score_update(update),
            Message::NewRound(round) => self.on_new_round(round),
            Message::GameOver(over) => self.on_game_over(over),
            Message::PlayerDisconnected(notice) => vec![MirrorEvent::Notice(format!(
                "{} left the game",
                notice.player_name
            ))],
            Message::Error(error) => {
                self.rejected = Some(error.message.clone());
                vec![MirrorEvent::Rejected(error.message)]
            }
            Message::JoinRequest(_) | Message::PlayedCard(_) | Message::CzarChoice(_) => vec![],
        }
    }

    /// The link to the host dropped. There is no host migration, so the game
    /// is over for this peer.
    pub fn on_host_disconnect(&mut self) -> Vec<MirrorEvent> {
        if self.host_lost {
            return vec![];
        }
        info!("lost connection to host {}", self.host_id);
        self.host_lost = true;
        if self.phase.is_some() {
            self.phase = Some(Phase::GameOver);
        }
        vec![MirrorEvent::HostLost]
    }

    fn on_join_confirmed(&mut self, confirmed: JoinConfirmed) -> Vec<MirrorEvent> {
        self.players = confirmed.players;
        if confirmed.host_id != self.host_id {
            // Messages are attributed by the link, so the id we dialled stays in charge.
            info!(
                "host calls itself {}, reached as {}",
                confirmed.host_id, self.host_id
            );
        }
        if let Some(sync) = confirmed.game_state {
            self.resync(sync);
        }
        vec![MirrorEvent::Joined]
    }

    fn resync(&mut self, sync: GameStateSync) {
        info!("catching up on round {} ({})", sync.round_number, sync.phase);
        self.phase = Some(sync.phase);
        self.black_card = Some(sync.black_card);
        self.czar = Some(sync.czar);
        self.round_number = sync.round_number;
        self.played_cards = sync.played_cards;
        self.judging_order = sync.judging_order;
        self.scores = sync.scores;
        self.hand = sync.hand;
        self.round_winner = sync.round_winner;
        self.my_play = None;
    }

    fn on_start_game(&mut self, start: StartGame) -> Vec<MirrorEvent> {
        self.phase = Some(Phase::Selecting);
        self.black_card = Some(start.black_card);
        self.czar = Some(start.first_czar);
        self.round_number = start.round_number;
        self.scores = start.scores;
        self.hand = start
            .player_hands
            .get(&self.local_id)
            .cloned()
            .unwrap_or_default();
        self.played_cards.clear();
        self.judging_order = None;
        self.round_winner = None;
        self.game_winner = None;
        self.my_play = None;
        vec![MirrorEvent::GameStarted]
    }

    fn on_cards_update(&mut self, update: CardsUpdate) -> Vec<MirrorEvent> {
        if self.phase != Some(update.phase) {
            debug!("cards update for {} while in {:?}", update.phase, self.phase);
            return vec![];
        }
        self.played_cards = update.played_cards;
        if let Some(play) = self.my_play.as_mut() {
            play.acknowledged = self
                .played_cards
                .iter()
                .any(|p| p.player_id == self.local_id && p.card.as_ref() == Some(&play.card));
        }
        vec![MirrorEvent::CardsUpdated]
    }

    fn on_judging_start(&mut self, judging: JudgingStart) -> Vec<MirrorEvent> {
        let mut events = vec![];
        if let Some(play) = self.my_play.take() {
            let taken = judging
                .cards
                .iter()
                .find(|s| s.player_id == self.local_id)
                .map(|s| &s.card);
            if taken != Some(&play.card) {
                info!("play of \"{}\" was not accepted, taking it back", play.card.text);
                // The host kept an earlier card of ours, which went back into the hand locally.
                if let Some(card) = taken {
                    if let Some(index) = self.hand.iter().position(|c| c == card) {
                        self.hand.remove(index);
                    }
                }
                self.hand.push(play.card.clone());
                events.push(MirrorEvent::PlayRolledBack(play.card));
            }
        }
        self.phase = Some(Phase::Judging);
        self.black_card = Some(judging.black_card);
        self.played_cards = judging.cards.iter().map(PlayedCardView::from).collect();
        self.judging_order = Some(judging.cards);
        events.push(MirrorEvent::JudgingStarted);
        events
    }

    fn on_score_update(&mut self, update: ScoreUpdate) -> Vec<MirrorEvent> {
        self.scores = update.scores;
        self.phase = Some(Phase::ShowingWinner);
        self.round_winner = Some(update.round_winner.clone());
        vec![MirrorEvent::ScoresUpdated(update.round_winner)]
    }

    fn on_new_round(&mut self, round: NewRound) -> Vec<MirrorEvent> {
        if self.phase.is_some() && round.round_number <= self.round_number {
            debug!("round {} already applied", round.round_number);
            return vec![];
        }
        self.phase = Some(Phase::Selecting);
        self.black_card = Some(round.black_card);
        self.czar = Some(round.czar);
        self.round_number = round.round_number;
        self.played_cards.clear();
        self.judging_order = None;
        self.round_winner = None;
        self.my_play = None;
        if let Some(card) = round.new_cards.get(&self.local_id) {
            self.hand.push(card.clone());
        }
        vec![MirrorEvent::RoundStarted(round.round_number)]
    }

    fn on_game_over(&mut self, over: GameOver) -> Vec<MirrorEvent> {
        self.phase = Some(Phase::GameOver);
        self.scores = over.final_scores;
        self.game_winner = over.winner.clone();
        self.my_play = None;
        vec![MirrorEvent::GameOver(over.winner)]
    }
}
