use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub min_players: usize,
    pub cards_per_hand: usize,
    pub points_to_win: u32,
    /// Pause on the winner screen before the host deals the next round.
    pub advance_delay: Duration,
    /// Pause before the autonomous player submits.
    pub bot_delay: Duration,
    pub with_bot: bool,
    /// Fixed shuffle seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            min_players: 2,
            cards_per_hand: 10,
            points_to_win: 5,
            advance_delay: Duration::from_millis(3000),
            bot_delay: Duration::from_millis(750),
            with_bot: false,
            seed: None,
        }
    }
}
