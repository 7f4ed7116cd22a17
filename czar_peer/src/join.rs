use anyhow::{anyhow, bail};
use czar_core::mirror::{ClientMirror, MirrorEvent};
use log::info;
use tokio::time;

use crate::{
    console::{self, CliCommand},
    transport::{JoinTransport, TransportEvent, CONNECT_TIMEOUT, REGISTRATION_TIMEOUT, TICK},
};

/// Runs a joining peer: connects to the room, asks for a seat and then mirrors
/// whatever the host broadcasts.
pub async fn run(name: String, room: String) -> anyhow::Result<()> {
    let mut transport = JoinTransport::connect(&room)?;
    let mut mirror = ClientMirror::new(
        transport.peer_id().clone(),
        name,
        transport.host_id().clone(),
    );

    println!("Connecting to {} ...", room);
    time::timeout(CONNECT_TIMEOUT, wait_for_link(&mut transport))
        .await
        .map_err(|_| anyhow!("timed out connecting to {}", room))??;

    transport.send(&mirror.join_request());
    transport.flush();
    time::timeout(REGISTRATION_TIMEOUT, wait_for_seat(&mut transport, &mut mirror))
        .await
        .map_err(|_| anyhow!("the host at {} did not seat us", room))??;

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
        if let Some(command) = command {
            if command == CliCommand::Quit {
                break;
            }
            handle_command(command, &mut transport, &mut mirror);
        }

        let mut host_lost = false;
        for event in transport.poll()? {
            let events = match event {
                TransportEvent::Message(from, message) => mirror.apply(&from, message),
                TransportEvent::Disconnected(_) => {
                    host_lost = true;
                    mirror.on_host_disconnect()
                }
                TransportEvent::Connected(_) => vec![],
            };
            for event in &events {
                console::render_event(&mirror, event);
            }
        }
        if host_lost || mirror.rejected.is_some() {
            break;
        }
        transport.flush();
    }

    info!("leaving the room");
    transport.shutdown();
    Ok(())
}

fn handle_command(
    command: CliCommand,
    transport: &mut JoinTransport,
    mirror: &mut ClientMirror,
) {
    match command {
        CliCommand::Start => println!("Only the host can start the game."),
        CliCommand::Play(index) => match mirror.play_card(index) {
            Some(message) => transport.send(&message),
            None => println!("{}", console::explain_refusal(mirror)),
        },
        CliCommand::Pick(index) => match console::pick(mirror, index) {
            Some(message) => transport.send(&message),
            None => println!("{}", console::explain_refusal(mirror)),
        },
        CliCommand::Hand => console::render_hand(mirror),
        CliCommand::Scores => console::render_scores(mirror),
        CliCommand::Players => console::render_players(mirror),
        CliCommand::Help => console::print_help(),
        CliCommand::Quit => {}
    }
}

async fn wait_for_link(transport: &mut JoinTransport) -> anyhow::Result<()> {
    let mut interval = time::interval(TICK);
    loop {
        interval.tick().await;
        transport.poll()?;
        transport.flush();
        if transport.is_connected() {
            return Ok(());
        }
    }
}

async fn wait_for_seat(
    transport: &mut JoinTransport,
    mirror: &mut ClientMirror,
) -> anyhow::Result<()> {
    let mut interval = time::interval(TICK);
    loop {
        interval.tick().await;
        let mut seated = false;
        for event in transport.poll()? {
            let events = match event {
                TransportEvent::Message(from, message) => mirror.apply(&from, message),
                TransportEvent::Disconnected(_) => bail!("the host closed the connection"),
                TransportEvent::Connected(_) => vec![],
            };
            for event in &events {
                console::render_event(mirror, event);
            }
            if let Some(reason) = &mirror.rejected {
                bail!("the host turned us away: {}", reason);
            }
            seated |= events.contains(&MirrorEvent::Joined);
        }
        if seated {
            return Ok(());
        }
        transport.flush();
    }
}
