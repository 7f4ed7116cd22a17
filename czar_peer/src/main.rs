use std::{fs, net::Ipv4Addr, path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use czar_core::{card::CardSet, config::GameConfig};
use env_logger::Env;

mod console;
mod host;
mod join;
mod transport;

static DEFAULT_DECK: &str = include_str!("../assets/default_deck.json");

#[derive(Parser)]
#[command(name = "czar")]
#[command(about = "Play a party card game with friends, one peer hosting the table")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Open a room and host the game")]
    Host {
        #[arg(short, long)]
        name: String,

        #[arg(long, default_value_t = Ipv4Addr::LOCALHOST)]
        #[arg(help = "Address to listen on; together with the port it forms the room code")]
        ip: Ipv4Addr,

        #[arg(short, long, default_value_t = 5000)]
        port: u16,

        #[arg(long)]
        #[arg(help = "Seat an autonomous player at the table")]
        bot: bool,

        #[arg(long)]
        #[arg(help = "RNG seed for reproducible games")]
        seed: Option<u64>,

        #[arg(short, long)]
        #[arg(help = "Card deck document (JSON array of decks); the first deck is used")]
        deck: Option<PathBuf>,

        #[arg(long, default_value_t = 5)]
        #[arg(help = "Points needed to win the game")]
        points: u32,

        #[arg(long, default_value_t = 10)]
        #[arg(help = "Response cards per hand")]
        cards: usize,

        #[arg(long, default_value_t = 3000)]
        #[arg(help = "Milliseconds the round winner is shown before the next round")]
        advance_delay: u64,
    },
    #[command(about = "Join a room by its code")]
    Join {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        #[arg(help = "Room code shown by the host, e.g. 127.0.0.1:5000")]
        room: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Host {
            name,
            ip,
            port,
            bot,
            seed,
            deck,
            points,
            cards,
            advance_delay,
        } => {
            let card_set = load_card_set(deck.as_ref())?;
            let config = GameConfig {
                cards_per_hand: cards,
                points_to_win: points,
                advance_delay: Duration::from_millis(advance_delay),
                with_bot: bot,
                seed,
                ..GameConfig::default()
            };
            host::run(name, ip, port, config, card_set).await
        }
        Commands::Join { name, room } => join::run(name, room).await,
    }
}

fn load_card_set(path: Option<&PathBuf>) -> anyhow::Result<CardSet> {
    let document = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("could not read deck {}", path.display()))?,
        None => DEFAULT_DECK.to_string(),
    };
    let card_set = CardSet::from_json(&document)?;
    if card_set.black.is_empty() || card_set.white.is_empty() {
        anyhow::bail!("the deck needs both prompt and response cards");
    }
    Ok(card_set)
}
