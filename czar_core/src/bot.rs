use rand::{seq::IteratorRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    card::Card,
    player::{PeerId, Player},
    round::{Phase, RoundState},
};

pub const BOT_NAME: &str = "Rando Cardrissian";

/// Host-local simulated participant. Plays a random card from its hand and
/// is never czar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutonomousPlayer {
    pub id: PeerId,
    pub name: String,
}

impl AutonomousPlayer {
    pub fn new(host_id: &PeerId) -> Self {
        AutonomousPlayer {
            id: PeerId::new(format!("{}#bot", host_id)),
            name: BOT_NAME.to_string(),
        }
    }

    pub fn player(&self) -> Player {
        Player::bot(self.id.clone(), self.name.clone())
    }

    pub fn wants_to_play(&self, round: &RoundState) -> bool {
        round.phase == Phase::Selecting && round.czar_id != self.id && !round.has_submitted(&self.id)
    }

    pub fn choose_card<R: Rng + ?Sized>(&self, hand: &[Card], rng: &mut R) -> Option<usize> {
        (0..hand.len()).choose(rng)
    }
}
