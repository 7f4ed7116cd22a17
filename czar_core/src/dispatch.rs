use std::time::Instant;

use log::{debug, trace, warn};

use crate::{
    error::GameError,
    host::HostGame,
    player::PeerId,
    protocol::{ErrorNotice, JoinRequest, Message, Outgoing},
};

/// Routes a message received by the host to the matching command. `from` is
/// the transport-level sender, which every peer-originated payload must agree
/// with. Rejected messages are logged and leave the game untouched.
pub fn dispatch(
    game: &mut HostGame,
    from: &PeerId,
    message: Message,
    now: Instant,
    out: &mut Vec<Outgoing>,
) -> Result<(), GameError> {
    let label = message.label();
    trace!("{} from {}", label, from);
    let result = match message {
        Message::JoinRequest(JoinRequest { id, name }) => {
            let joined = if &id != from {
                Err(GameError::UnauthorizedOrigin(from.clone()))
            } else if game.roster().contains(&id) {
                debug!("{} is already seated", id);
                Ok(())
            } else {
                game.add_player(id, name, out)
            };
            if let Err(e) = &joined {
                out.push(Outgoing::peer(
                    from.clone(),
                    Message::Error(ErrorNotice {
                        message: e.to_string(),
                    }),
                ));
            }
            joined
        }
        Message::PlayedCard(submission) => {
            if &submission.player_id != from {
                Err(GameError::UnauthorizedOrigin(from.clone()))
            } else {
                game.submit_card(submission, now, out)
            }
        }
        Message::CzarChoice(choice) => game.choose_winner(from, &choice.winner_id, now, out),
        _ => Err(GameError::UnauthorizedOrigin(from.clone())),
    };
    if let Err(e) = &result {
        warn!("ignored {} from {}: {}", label, from, e);
    }
    result
}
