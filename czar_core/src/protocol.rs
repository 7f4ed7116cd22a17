use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::{
    card::Card,
    player::{PeerId, Player},
    round::{Phase, ScoreBoard, Submission},
};

/// Wire envelope: `{"type": "<snake_case>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Message {
    JoinRequest(JoinRequest),
    PlayerList(Vec<Player>),
    JoinConfirmed(JoinConfirmed),
    StartGame(StartGame),
    PlayedCard(Submission),
    CardsUpdate(CardsUpdate),
    JudgingStart(JudgingStart),
    CzarChoice(CzarChoice),
    ScoreUpdate(ScoreUpdate),
    NewRound(NewRound),
    GameOver(GameOver),
    PlayerDisconnected(PlayerNotice),
    Error(ErrorNotice),
}

impl Message {
    pub fn label(&self) -> &'static str {
        self.into()
    }

    /// Messages only the host may originate. Everything else comes from
    /// ordinary peers and is addressed to the host.
    pub fn is_host_only(&self) -> bool {
        !matches!(
            self,
            Message::JoinRequest(_) | Message::PlayedCard(_) | Message::CzarChoice(_)
        )
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: PeerId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinConfirmed {
    pub players: Vec<Player>,
    pub host_id: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_state: Option<GameStateSync>,
}

/// Everything a peer joining mid-game needs to rebuild its mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSync {
    pub phase: Phase,
    pub black_card: Card,
    pub czar: PeerId,
    pub round_number: u32,
    pub played_cards: Vec<PlayedCardView>,
    pub judging_order: Option<Vec<Submission>>,
    pub scores: ScoreBoard,
    pub hand: Vec<Card>,
    pub round_winner: Option<Submission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGame {
    pub black_card: Card,
    pub player_hands: BTreeMap<PeerId, Vec<Card>>,
    pub first_czar: PeerId,
    pub round_number: u32,
    pub scores: ScoreBoard,
}

/// A submission as seen by one recipient. `card` is `None` while the
/// submission is still face down for that recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayedCardView {
    pub player_id: PeerId,
    pub player_name: String,
    pub card: Option<Card>,
}

impl From<&Submission> for PlayedCardView {
    fn from(submission: &Submission) -> Self {
        PlayedCardView {
            player_id: submission.player_id.clone(),
            player_name: submission.player_name.clone(),
            card: Some(submission.card.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsUpdate {
    pub played_cards: Vec<PlayedCardView>,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgingStart {
    pub cards: Vec<Submission>,
    pub black_card: Card,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CzarChoice {
    pub winner_id: PeerId,
    pub card: Card,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub scores: ScoreBoard,
    pub round_winner: Submission,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRound {
    pub black_card: Card,
    pub czar: PeerId,
    pub round_number: u32,
    pub new_cards: BTreeMap<PeerId, Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<PreviousRound>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousRound {
    pub czar: PeerId,
    pub round_number: u32,
    pub winner: Option<PeerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOver {
    /// The winning submission, absent when the game ended for lack of players.
    pub winner: Option<Submission>,
    pub final_scores: ScoreBoard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerNotice {
    pub player_id: PeerId,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    Peer(PeerId),
}

impl Recipient {
    pub fn includes(&self, peer: &PeerId) -> bool {
        match self {
            Recipient::All => true,
            Recipient::Peer(id) => id == peer,
        }
    }
}

/// A message the host wants delivered. The host loops messages addressed to
/// itself back into its own mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub to: Recipient,
    pub message: Message,
}

impl Outgoing {
    pub fn all(message: Message) -> Self {
        Outgoing {
            to: Recipient::All,
            message,
        }
    }

    pub fn peer(peer: PeerId, message: Message) -> Self {
        Outgoing {
            to: Recipient::Peer(peer),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use crate::{
        card::Card,
        player::PeerId,
        protocol::{CzarChoice, JoinRequest, Message, NewRound, PlayedCardView, Recipient},
        round::Submission,
    };

    #[test]
    fn message_should_use_the_type_data_envelope() {
        let message = Message::JoinRequest(JoinRequest {
            id: PeerId::from("p1"),
            name: "Ada".to_string(),
        });

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "join_request", "data": {"id": "p1", "name": "Ada"}})
        );
        assert_eq!(message.label(), "join_request");
    }

    #[test]
    fn payload_fields_should_be_camel_case() {
        let message = Message::CzarChoice(CzarChoice {
            winner_id: PeerId::from("c"),
            card: Card::new("A tiny horse."),
            player_name: "Cy".to_string(),
        });

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "czar_choice", "data": {
                "winnerId": "c",
                "card": {"text": "A tiny horse."},
                "playerName": "Cy"
            }})
        );
    }

    #[test]
    fn from_bytes_should_accept_a_new_round_without_previous_state() {
        let raw = br#"{"type": "new_round", "data": {
            "blackCard": {"text": "What ended my last relationship? _", "pick": 1},
            "czar": "b",
            "roundNumber": 2,
            "newCards": {"c": {"text": "Socks."}}
        }}"#;

        let message = Message::from_bytes(raw).unwrap();

        let mut new_cards = BTreeMap::new();
        new_cards.insert(PeerId::from("c"), Card::new("Socks."));
        assert_eq!(
            message,
            Message::NewRound(NewRound {
                black_card: Card::prompt("What ended my last relationship? _", 1),
                czar: PeerId::from("b"),
                round_number: 2,
                new_cards,
                previous_state: None,
            })
        );
    }

    #[test]
    fn from_bytes_should_reject_unknown_types() {
        assert!(Message::from_bytes(br#"{"type": "launch_missiles", "data": {}}"#).is_err());
        assert!(Message::from_bytes(b"not json").is_err());
    }

    #[test]
    fn is_host_only_should_separate_peer_messages() {
        let played = Message::PlayedCard(Submission {
            player_id: PeerId::from("b"),
            player_name: "B".to_string(),
            card: Card::new("X"),
        });

        assert!(!played.is_host_only());
        assert!(Message::PlayerList(vec![]).is_host_only());
    }

    #[test]
    fn face_down_view_should_serialize_a_null_card() {
        let view = PlayedCardView {
            player_id: PeerId::from("b"),
            player_name: "B".to_string(),
            card: None,
        };

        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            json!({"playerId": "b", "playerName": "B", "card": null})
        );
        assert!(Recipient::All.includes(&PeerId::from("b")));
        assert!(!Recipient::Peer(PeerId::from("a")).includes(&PeerId::from("b")));
    }
}
