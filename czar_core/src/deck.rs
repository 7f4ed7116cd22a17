use std::collections::VecDeque;

use log::{debug, warn};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    card::{Card, CardSet},
    error::GameError,
};

/// Host-owned draw piles. Piles hold indices into the full card set, so a
/// card leaves its pile at most once per shuffle epoch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deck {
    source: CardSet,
    prompts: VecDeque<usize>,
    responses: VecDeque<usize>,
    prompt_epoch: u32,
    response_epoch: u32,
}

impl Deck {
    pub fn shuffled<R: Rng + ?Sized>(card_set: CardSet, rng: &mut R) -> Self {
        let mut deck = Deck::default();
        deck.reset(card_set, rng);
        deck
    }

    pub fn reset<R: Rng + ?Sized>(&mut self, card_set: CardSet, rng: &mut R) {
        self.source = card_set;
        self.prompt_epoch = 0;
        self.response_epoch = 0;
        self.refill_prompts(rng);
        self.refill_responses(rng);
    }

    /// Reshuffles both piles from the full card set, for a new game.
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let card_set = std::mem::take(&mut self.source);
        self.reset(card_set, rng);
    }

    /// Draws up to `n` response cards from the front of the pile. When the
    /// pile runs dry the full response set is reshuffled once and drawing
    /// continues, so a shortfall only happens when one reshuffle cannot cover `n`.
    pub fn draw_responses<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> Vec<Card> {
        let mut drawn = Vec::with_capacity(n);
        let mut reshuffled = false;
        while drawn.len() < n {
            match self.responses.pop_front() {
                Some(index) => drawn.push(self.source.white[index].clone()),
                None if !reshuffled => {
                    reshuffled = true;
                    self.refill_responses(rng);
                }
                None => break,
            }
        }
        if drawn.len() < n {
            warn!(
                "response deck short: wanted {} cards, drew {}",
                n,
                drawn.len()
            );
        }
        drawn
    }

    pub fn draw_prompt<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Card, GameError> {
        if self.prompts.is_empty() {
            self.refill_prompts(rng);
        }
        self.prompts
            .pop_front()
            .map(|index| self.source.black[index].clone())
            .ok_or(GameError::DeckExhausted)
    }

    pub fn remaining_prompts(&self) -> usize {
        self.prompts.len()
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.len()
    }

    /// Shuffle epoch of the response pile: 1 after a reset, bumped on every reshuffle.
    pub fn response_epoch(&self) -> u32 {
        self.response_epoch
    }

    pub fn prompt_epoch(&self) -> u32 {
        self.prompt_epoch
    }

    fn refill_prompts<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.prompts = shuffled_indices(self.source.black.len(), rng);
        if self.prompt_epoch > 0 {
            debug!("prompt deck reshuffled ({} cards)", self.prompts.len());
        }
        self.prompt_epoch += 1;
    }

    fn refill_responses<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.responses = shuffled_indices(self.source.white.len(), rng);
        if self.response_epoch > 0 {
            debug!("response deck reshuffled ({} cards)", self.responses.len());
        }
        self.response_epoch += 1;
    }
}

fn shuffled_indices<R: Rng + ?Sized>(len: usize, rng: &mut R) -> VecDeque<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    indices.into()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};

    use crate::{
        card::{Card, CardSet},
        deck::Deck,
        error::GameError,
    };

    #[test]
    fn draw_responses_should_not_repeat_cards_within_an_epoch() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut deck = Deck::shuffled(card_set(5, 30), &mut rng);

        let drawn = deck.draw_responses(30, &mut rng);

        let unique: HashSet<_> = drawn.iter().collect();
        assert_eq!(unique.len(), 30);
        assert_eq!(deck.remaining_responses(), 0);
        assert_eq!(deck.response_epoch(), 1);
    }

    #[test]
    fn draw_responses_should_reshuffle_the_full_set_when_exhausted() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut deck = Deck::shuffled(card_set(5, 30), &mut rng);
        for _ in 0..3 {
            assert_eq!(deck.draw_responses(10, &mut rng).len(), 10);
        }
        assert_eq!(deck.remaining_responses(), 0);

        let next = deck.draw_responses(1, &mut rng);

        assert_eq!(next.len(), 1);
        assert_eq!(deck.response_epoch(), 2);
        assert_eq!(deck.remaining_responses(), 29);
    }

    #[test]
    fn draw_responses_should_come_up_short_only_for_tiny_sets() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut deck = Deck::shuffled(card_set(1, 3), &mut rng);

        assert_eq!(deck.draw_responses(8, &mut rng).len(), 6);
        assert_eq!(deck.response_epoch(), 2);
        assert!(Deck::shuffled(card_set(1, 0), &mut rng)
            .draw_responses(2, &mut rng)
            .is_empty());
    }

    #[test]
    fn draw_prompt_should_reshuffle_once_then_signal_exhaustion() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut deck = Deck::shuffled(card_set(2, 0), &mut rng);

        let first = deck.draw_prompt(&mut rng).unwrap();
        let second = deck.draw_prompt(&mut rng).unwrap();
        assert_ne!(first, second);
        assert!(deck.draw_prompt(&mut rng).is_ok());
        assert_eq!(deck.prompt_epoch(), 2);

        let mut empty = Deck::shuffled(card_set(0, 4), &mut rng);
        assert_eq!(empty.draw_prompt(&mut rng), Err(GameError::DeckExhausted));
    }

    #[test]
    fn restart_should_refill_both_piles() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut deck = Deck::shuffled(card_set(4, 12), &mut rng);
        deck.draw_responses(7, &mut rng);
        deck.draw_prompt(&mut rng).unwrap();

        deck.restart(&mut rng);

        assert_eq!(deck.remaining_prompts(), 4);
        assert_eq!(deck.remaining_responses(), 12);
    }

    // Infra ----------------------------------------------------------------

    fn card_set(black: usize, white: usize) -> CardSet {
        CardSet {
            black: (0..black)
                .map(|i| Card::prompt(format!("Prompt {} _.", i), 1))
                .collect(),
            white: (0..white).map(|i| Card::new(format!("Answer {}", i))).collect(),
        }
    }
}
