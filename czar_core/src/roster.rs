use rand::{seq::IteratorRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::player::{PeerId, Player};

/// Join-ordered list of players. Only the host mutates it; everyone else
/// receives snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    pub fn new() -> Self {
        Roster { players: vec![] }
    }

    /// Appends the player. Ids come from the transport and are unique by
    /// construction, so no deduplication happens here.
    pub fn add_player(&mut self, player: Player) -> &Player {
        self.players.push(player);
        &self.players[self.players.len() - 1]
    }

    pub fn remove_player(&mut self, id: &PeerId) -> Option<Player> {
        self.players
            .iter()
            .position(|p| &p.id == id)
            .map(|index| self.players.remove(index))
    }

    pub fn snapshot(&self) -> Vec<Player> {
        self.players.clone()
    }

    pub fn get(&self, id: &PeerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    /// Players that receive messages over the wire, i.e. everyone but bots.
    pub fn humans(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.is_bot)
    }

    pub fn random_czar<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<PeerId> {
        self.humans().choose(rng).map(|p| p.id.clone())
    }

    /// Next czar after `current` in join order, wrapping around and skipping
    /// bots. Falls back to the first eligible player when `current` is gone.
    pub fn next_czar(&self, current: &PeerId) -> Option<PeerId> {
        let start = match self.players.iter().position(|p| &p.id == current) {
            Some(index) => index + 1,
            None => 0,
        };
        (0..self.players.len())
            .map(|offset| &self.players[(start + offset) % self.players.len()])
            .find(|p| !p.is_bot)
            .map(|p| p.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::{
        player::{PeerId, Player},
        roster::Roster,
    };

    #[test]
    fn add_player_should_append_in_join_order() {
        let roster = roster_of(&["a", "b", "c"]);

        let ids: Vec<_> = roster.snapshot().into_iter().map(|p| p.id).collect();

        assert_eq!(ids, vec![id("a"), id("b"), id("c")]);
    }

    #[test]
    fn remove_player_should_return_the_removed_entry() {
        let mut roster = roster_of(&["a", "b"]);

        assert_eq!(roster.remove_player(&id("b")).map(|p| p.name), Some("B".to_string()));
        assert_eq!(roster.remove_player(&id("b")), None);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn next_czar_should_skip_bots_and_wrap() {
        let mut roster = roster_of(&["a", "b"]);
        roster.add_player(Player::bot(id("bot"), "Rando"));
        roster.add_player(Player::new(id("c"), "C"));

        assert_eq!(roster.next_czar(&id("a")), Some(id("b")));
        assert_eq!(roster.next_czar(&id("b")), Some(id("c")));
        assert_eq!(roster.next_czar(&id("c")), Some(id("a")));
        assert_eq!(roster.next_czar(&id("gone")), Some(id("a")));
    }

    #[test]
    fn next_czar_rotation_should_cycle_back_to_the_start() {
        let mut roster = roster_of(&["a", "b", "c", "d"]);
        roster.add_player(Player::bot(id("bot"), "Rando"));
        let eligible = roster.humans().count();

        let mut czar = id("c");
        let mut seen = vec![];
        for _ in 0..eligible {
            czar = roster.next_czar(&czar).unwrap();
            seen.push(czar.clone());
        }

        assert_eq!(czar, id("c"));
        assert!(!seen.contains(&id("bot")));
        assert_eq!(seen, vec![id("d"), id("a"), id("b"), id("c")]);
    }

    #[test]
    fn random_czar_should_never_pick_a_bot() {
        let mut roster = Roster::new();
        roster.add_player(Player::bot(id("bot"), "Rando"));
        roster.add_player(Player::host(id("h"), "Host"));
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            assert_eq!(roster.random_czar(&mut rng), Some(id("h")));
        }
        assert_eq!(Roster::new().random_czar(&mut rng), None);
    }

    // Infra ----------------------------------------------------------------

    fn id(raw: &str) -> PeerId {
        PeerId::from(raw)
    }

    fn roster_of(ids: &[&str]) -> Roster {
        let mut roster = Roster::new();
        for raw in ids {
            roster.add_player(Player::new(id(raw), raw.to_uppercase()));
        }
        roster
    }
}
