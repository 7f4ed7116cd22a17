use crate::{player::PeerId, round::Phase};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("{0} may not originate this message")]
    UnauthorizedOrigin(PeerId),
    #[error("no game in progress")]
    GameNotStarted,
    #[error("a game is already in progress")]
    GameInProgress,
    #[error("expected phase {expected}, but the round is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },
    #[error("the czar cannot submit a card")]
    IsCzar,
    #[error("{0} is not the czar")]
    NotCzar(PeerId),
    #[error("unknown player {0}")]
    UnknownPlayer(PeerId),
    #[error("no submission from {0} is up for judging")]
    UnknownWinner(PeerId),
    #[error("card is not in the hand of {0}")]
    CardNotInHand(PeerId),
    #[error("a player name is required")]
    InvalidName,
    #[error("need at least {needed} players, have {actual}")]
    NotEnoughPlayers { needed: usize, actual: usize },
    #[error("deck is exhausted")]
    DeckExhausted,
    #[error("malformed deck: {0}")]
    MalformedDeck(String),
}
