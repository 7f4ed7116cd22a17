use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport-level peer identifier. The host's id doubles as the room code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        PeerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        PeerId::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PeerId,
    pub name: String,
    pub is_host: bool,
    #[serde(default)]
    pub is_bot: bool,
}

impl Player {
    pub fn new(id: PeerId, name: impl Into<String>) -> Self {
        Player {
            id,
            name: name.into(),
            is_host: false,
            is_bot: false,
        }
    }

    pub fn host(id: PeerId, name: impl Into<String>) -> Self {
        Player {
            is_host: true,
            ..Player::new(id, name)
        }
    }

    pub fn bot(id: PeerId, name: impl Into<String>) -> Self {
        Player {
            is_bot: true,
            ..Player::new(id, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::player::{PeerId, Player};

    #[test]
    fn player_should_serialize_with_camel_case_flags() {
        let player = Player::host(PeerId::new("abc"), "Ada");

        let json = serde_json::to_value(&player).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"id": "abc", "name": "Ada", "isHost": true, "isBot": false})
        );
    }

    #[test]
    fn player_should_default_is_bot_when_missing() {
        let player: Player =
            serde_json::from_str(r#"{"id": "x", "name": "Bob", "isHost": false}"#).unwrap();

        assert!(!player.is_bot);
        assert_eq!(player.id, PeerId::from("x"));
    }
}
