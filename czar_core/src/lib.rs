pub mod bot;
pub mod card;
pub mod config;
pub mod deck;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod mirror;
pub mod player;
pub mod protocol;
pub mod roster;
pub mod round;
pub mod schedule;
pub mod session;
pub mod utils;
