use std::{
    io::{self, BufRead},
    str::FromStr,
    thread,
};

use czar_core::{
    error::GameError,
    mirror::{ClientMirror, MirrorEvent},
    player::PeerId,
    protocol::Message,
    round::Phase,
};
use itertools::Itertools;
use tokio::sync::mpsc::{channel, Receiver};

static HELP: &str = "
*** Czar ***
Every round one player is the czar and reveals a prompt card. Everyone else plays the
response card from their hand that completes it best. Once all cards are in, the czar
picks a favourite and its owner scores a point. The czar role rotates every round.

  start      start a new game (host only)
  play <n>   play card n from your hand
  pick <n>   as czar, pick submission n
  hand       show your hand
  scores     show the scoreboard
  players    show who is at the table
  help       show this text
  quit       leave";

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CliCommand {
    Start,
    Play(usize),
    Pick(usize),
    Hand,
    Scores,
    Players,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseCommandError;

impl FromStr for CliCommand {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().ok_or(ParseCommandError)?;
        let index = words.next().map(usize::from_str);
        match (command, index) {
            ("start" | "s", None) => Ok(CliCommand::Start),
            ("play" | "p", Some(Ok(n))) => Ok(CliCommand::Play(n)),
            ("pick" | "k", Some(Ok(n))) => Ok(CliCommand::Pick(n)),
            ("hand" | "h", None) => Ok(CliCommand::Hand),
            ("scores", None) => Ok(CliCommand::Scores),
            ("players", None) => Ok(CliCommand::Players),
            ("help" | "?", None) => Ok(CliCommand::Help),
            ("quit" | "q", None) => Ok(CliCommand::Quit),
            _ => Err(ParseCommandError),
        }
    }
}

/// Reads commands from stdin on a dedicated thread. The receiver closes when
/// stdin does.
pub fn spawn_reader() -> Receiver<CliCommand> {
    let (sender, receiver) = channel(16);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            match CliCommand::from_str(line.trim()) {
                Ok(command) => {
                    if sender.blocking_send(command).is_err() {
                        break;
                    }
                }
                Err(_) => println!("Unknown command, type help."),
            }
        }
    });
    receiver
}

pub fn print_help() {
    println!("{}", HELP);
}

fn name_of(mirror: &ClientMirror, id: &PeerId) -> String {
    mirror
        .player_name(id)
        .map(|n| n.to_string())
        .unwrap_or_else(|| id.to_string())
}

pub fn render_hand(mirror: &ClientMirror) {
    if mirror.hand.is_empty() {
        println!("Your hand is empty.");
        return;
    }
    println!(
        "Your hand:\n{}",
        mirror
            .hand
            .iter()
            .enumerate()
            .map(|(i, card)| format!("  [{}] {}", i, card.text))
            .join("\n")
    );
}

pub fn render_scores(mirror: &ClientMirror) {
    println!(
        "Scores:\n{}",
        mirror
            .scores
            .ranking()
            .into_iter()
            .map(|(id, points)| format!("  {:>2}  {}", points, name_of(mirror, id)))
            .join("\n")
    );
}

pub fn render_players(mirror: &ClientMirror) {
    println!(
        "At the table: {}",
        mirror
            .players
            .iter()
            .map(|p| {
                let mut label = p.name.clone();
                if p.is_host {
                    label.push_str(" (host)");
                }
                if p.is_bot {
                    label.push_str(" (bot)");
                }
                label
            })
            .join(", ")
    );
}

fn render_prompt(mirror: &ClientMirror) {
    if let Some(card) = &mirror.black_card {
        println!("\nRound {}: {}", mirror.round_number, card.text);
        if card.blanks() > 1 {
            println!("(pick {}: play your best single answer)", card.blanks());
        }
    }
    match &mirror.czar {
        Some(_) if mirror.is_czar() => println!("You are the czar this round. Sit back."),
        Some(czar) => {
            println!("{} is the czar. Play a card with `play <n>`.", name_of(mirror, czar));
            render_hand(mirror);
        }
        None => {}
    }
}

fn render_submissions(mirror: &ClientMirror) {
    let cards = match &mirror.judging_order {
        Some(cards) => cards,
        None => return,
    };
    println!(
        "Submissions:\n{}",
        cards
            .iter()
            .enumerate()
            .map(|(i, s)| format!("  [{}] {}", i, s.card.text))
            .join("\n")
    );
    if mirror.is_czar() {
        println!("Pick the winner with `pick <n>`.");
    }
}

pub fn render_event(mirror: &ClientMirror, event: &MirrorEvent) {
    match event {
        MirrorEvent::RosterChanged => render_players(mirror),
        MirrorEvent::Joined => {
            println!("Joined the room.");
            if mirror.phase.is_some() {
                render_prompt(mirror);
            }
        }
        MirrorEvent::GameStarted | MirrorEvent::RoundStarted(_) => render_prompt(mirror),
        MirrorEvent::CardsUpdated => {
            if mirror.my_play.as_ref().map_or(false, |p| p.acknowledged) {
                println!("The host has your card.");
            }
            let waiting = mirror.players.len().saturating_sub(1 + mirror.played_cards.len());
            println!(
                "{} card(s) in, waiting for {}.",
                mirror.played_cards.len(),
                waiting
            );
        }
        MirrorEvent::JudgingStarted => render_submissions(mirror),
        MirrorEvent::ScoresUpdated(winner) => {
            println!("{} wins the round with \"{}\"", winner.player_name, winner.card.text);
            render_scores(mirror);
        }
        MirrorEvent::GameOver(winner) => {
            match winner {
                Some(w) => println!(
                    "\nGame over! {} wins with {} points.",
                    w.player_name,
                    mirror.scores.get(&w.player_id)
                ),
                None => match mirror.scores.leader() {
                    Some((id, points)) => println!(
                        "\nGame over, not enough players left. {} leads with {} points.",
                        name_of(mirror, id),
                        points
                    ),
                    None => println!("\nGame over, not enough players left."),
                },
            }
            render_scores(mirror);
            if mirror.is_host() {
                println!("Type `start` to play again.");
            }
        }
        MirrorEvent::Notice(text) => println!("* {}", text),
        MirrorEvent::Rejected(reason) => println!("The host turned you away: {}", reason),
        MirrorEvent::HostLost => println!("Lost the connection to the host. The game is over."),
        MirrorEvent::PlayRolledBack(card) => {
            println!("\"{}\" did not make it in time and is back in your hand.", card.text)
        }
    }
}

/// The czar's choice of the submission shown as `[index]`.
pub fn pick(mirror: &ClientMirror, index: usize) -> Option<Message> {
    let winner = mirror.judging_order.as_ref()?.get(index)?;
    mirror.select_winner(&winner.player_id)
}

/// One-line status used after a rejected local command.
pub fn explain_refusal(mirror: &ClientMirror) -> &'static str {
    match mirror.phase {
        None => "The game has not started yet.",
        Some(Phase::Selecting) if mirror.is_czar() => "The czar does not play a card.",
        Some(Phase::Selecting) => "There is no such card in your hand.",
        Some(Phase::Judging) if mirror.is_czar() => "There is no such submission.",
        Some(Phase::Judging) => "Waiting for the czar to pick.",
        Some(Phase::ShowingWinner) => "The next round starts shortly.",
        Some(Phase::GameOver) => "The game is over.",
    }
}

/// Feedback for a locally issued command the game turned down.
pub fn not_accepted(what: &str, error: &GameError) -> String {
    format!("{} not accepted: {}.", what, error)
}
