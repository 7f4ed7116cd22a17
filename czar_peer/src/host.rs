use std::{net::Ipv4Addr, time::Instant};

use czar_core::{
    card::CardSet,
    config::GameConfig,
    dispatch::dispatch,
    host::HostGame,
    mirror::ClientMirror,
    protocol::Outgoing,
};
use log::{info, warn};
use tokio::time;

use crate::{
    console::{self, CliCommand},
    transport::{HostTransport, TransportEvent, TICK},
};

/// Runs the hosting peer: the authoritative game, its transport and the local
/// player's own mirror, all on one task.
pub async fn run(
    name: String,
    ip: Ipv4Addr,
    port: u16,
    config: GameConfig,
    card_set: CardSet,
) -> anyhow::Result<()> {
    let mut transport = HostTransport::bind(ip, port)?;
    let host_id = transport.peer_id().clone();
    let mut game = HostGame::new(config, host_id.clone(), name.clone(), card_set);
    let mut mirror = ClientMirror::new(host_id.clone(), name, host_id.clone());
    mirror.players = game.roster().snapshot();

    println!("Room code: {}", host_id);
    println!(
        "Share it with the other players, then type `start`. First to {} points wins.",
        game.config().points_to_win
    );
    console::render_players(&mirror);

    let mut commands = console::spawn_reader();
    let mut interval = time::interval(TICK);
    loop {
        let command = tokio::select! {
            _ = interval.tick() => None,
            command = commands.recv() => match command {
                Some(command) => Some(command),
                None => break,
            },
        };

        let now = Instant::now();
        let mut out = vec![];
        if let Some(command) = command {
            if command == CliCommand::Quit {
                break;
            }
            handle_command(command, &mut game, &mut mirror, now, &mut out);
        }

        for event in transport.poll()? {
            match event {
                TransportEvent::Connected(peer) => info!("{} is connecting", peer),
                TransportEvent::Disconnected(peer) => {
                    if game.roster().contains(&peer) {
                        if let Err(e) = game.remove_player(&peer, now, &mut out) {
                            warn!("could not remove {}: {}", peer, e);
                        }
                    }
                }
                TransportEvent::Message(peer, message) => {
                    let _ = dispatch(&mut game, &peer, message, now, &mut out);
                }
            }
        }
        game.poll(now, &mut out);

        deliver(out, &mut transport, &mut mirror);
        transport.flush();
    }

    info!("closing the room");
    transport.shutdown();
    Ok(())
}

fn handle_command(
    command: CliCommand,
    game: &mut HostGame,
    mirror: &mut ClientMirror,
    now: Instant,
    out: &mut Vec<Outgoing>,
) {
    let host_id = game.host_id().clone();
    match command {
        CliCommand::Start => {
            if let Err(e) = game.start_game(now, out) {
                println!("Cannot start: {}", e);
            }
        }
        CliCommand::Play(index) => match mirror.play_card(index) {
            Some(message) => {
                if let Err(e) = dispatch(game, &host_id, message, now, out) {
                    println!("{}", console::not_accepted("Card", &e));
                }
            }
            None => println!("{}", console::explain_refusal(mirror)),
        },
        CliCommand::Pick(index) => match console::pick(mirror, index) {
            Some(message) => {
                if let Err(e) = dispatch(game, &host_id, message, now, out) {
                    println!("{}", console::not_accepted("Pick", &e));
                }
            }
            None => println!("{}", console::explain_refusal(mirror)),
        },
        CliCommand::Hand => console::render_hand(mirror),
        CliCommand::Scores => console::render_scores(mirror),
        CliCommand::Players => console::render_players(mirror),
        CliCommand::Help => console::print_help(),
        CliCommand::Quit => {}
    }
}

/// Sends each message to its remote recipients and loops the ones addressed
/// to the host back into the local mirror.
fn deliver(out: Vec<Outgoing>, transport: &mut HostTransport, mirror: &mut ClientMirror) {
    let host_id = transport.peer_id().clone();
    for outgoing in out {
        transport.send(&outgoing.to, &outgoing.message);
        if outgoing.to.includes(&host_id) {
            for event in mirror.apply(&host_id, outgoing.message) {
                console::render_event(mirror, &event);
            }
        }
    }
}
