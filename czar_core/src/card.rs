use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// A prompt ("black") or response ("white") card. Prompt cards may carry the
/// number of blanks to fill.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick: Option<u8>,
}

impl Card {
    pub fn new(text: impl Into<String>) -> Self {
        Card {
            text: text.into(),
            pick: None,
        }
    }

    pub fn prompt(text: impl Into<String>, pick: u8) -> Self {
        Card {
            text: text.into(),
            pick: Some(pick),
        }
    }

    pub fn blanks(&self) -> u8 {
        self.pick.unwrap_or(1)
    }
}

/// One deck of the card-deck document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSet {
    #[serde(default)]
    pub black: Vec<Card>,
    #[serde(default)]
    pub white: Vec<Card>,
}

impl CardSet {
    /// Parses a deck document (an array of decks) and selects the first deck.
    pub fn from_json(document: &str) -> Result<Self, GameError> {
        let decks: Vec<CardSet> =
            serde_json::from_str(document).map_err(|e| GameError::MalformedDeck(e.to_string()))?;
        decks
            .into_iter()
            .next()
            .ok_or_else(|| GameError::MalformedDeck("document contains no deck".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        card::{Card, CardSet},
        error::GameError,
    };

    #[test]
    fn from_json_should_select_the_first_deck() {
        let document = r#"[
            {"black": [{"text": "Why am I sticky?", "pick": 1}], "white": [{"text": "Glitter."}]},
            {"black": [], "white": [{"text": "Never used."}]}
        ]"#;

        let set = CardSet::from_json(document).unwrap();

        assert_eq!(set.black, vec![Card::prompt("Why am I sticky?", 1)]);
        assert_eq!(set.white, vec![Card::new("Glitter.")]);
    }

    #[test]
    fn from_json_should_reject_an_empty_document() {
        assert!(matches!(
            CardSet::from_json("[]"),
            Err(GameError::MalformedDeck(_))
        ));
        assert!(matches!(
            CardSet::from_json("{not json"),
            Err(GameError::MalformedDeck(_))
        ));
    }

    #[test]
    fn blanks_should_default_to_one() {
        assert_eq!(Card::new("plain").blanks(), 1);
        assert_eq!(Card::prompt("two _ and _", 2).blanks(), 2);
    }
}
