//! Socket message envelopes.
//!
//! Every frame is a JSON object tagged by `type`:
//!
//! ```text
//! server → client   {"type":"dice","value":4}
//!                   {"type":"move","playerIndex":2,"pieceIndex":1,"steps":4}
//!                   {"type":"chat","sender":"ana","content":"gg"}
//!                   {"type":"system","content":"Player 3 joined"}
//!
//! client → server   {"type":"roll"}
//!                   {"type":"move","pieceIndex":0}
//!                   {"type":"chat","content":"hi"}
//! ```
//!
//! Frames with an unknown `type` or a payload that doesn't fit are dropped.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Message pushed by the backend over a room or game socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    /// Authoritative dice roll.
    Dice { value: u8 },

    /// Authoritative move broadcast.
    #[serde(rename_all = "camelCase")]
    Move {
        player_index: usize,
        piece_index: usize,
        steps: u32,
    },

    Chat {
        #[serde(default, alias = "from")]
        sender: Option<String>,
        content: String,
    },

    System { content: String },
}

impl InboundMessage {
    /// Decode a text frame, dropping anything unrecognized.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(msg) => Some(msg),
            Err(e) => {
                debug!(error = %e, "dropping inbound frame");
                None
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dice { .. } => "dice",
            Self::Move { .. } => "move",
            Self::Chat { .. } => "chat",
            Self::System { .. } => "system",
        }
    }
}

/// Message sent by this client for a user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Roll,

    #[serde(rename_all = "camelCase")]
    Move { piece_index: usize },

    Chat { content: String },
}

impl OutboundMessage {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_move() {
        let msg = InboundMessage::parse(r#"{"type":"move","playerIndex":2,"pieceIndex":1,"steps":4}"#);
        assert_eq!(
            msg,
            Some(InboundMessage::Move {
                player_index: 2,
                piece_index: 1,
                steps: 4
            })
        );
    }

    #[test]
    fn test_parse_dice_and_system() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"dice","value":6}"#),
            Some(InboundMessage::Dice { value: 6 })
        );
        assert_eq!(
            InboundMessage::parse(r#"{"type":"system","content":"Game started"}"#),
            Some(InboundMessage::System {
                content: "Game started".to_string()
            })
        );
    }

    #[test]
    fn test_parse_chat_accepts_from_alias() {
        let msg = InboundMessage::parse(r#"{"type":"chat","from":"ana","content":"gg"}"#);
        assert_eq!(
            msg,
            Some(InboundMessage::Chat {
                sender: Some("ana".to_string()),
                content: "gg".to_string()
            })
        );

        let anon = InboundMessage::parse(r#"{"type":"chat","content":"hello"}"#).unwrap();
        assert!(matches!(anon, InboundMessage::Chat { sender: None, .. }));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let msg = InboundMessage::parse(r#"{"type":"dice","value":3,"roomId":"r1"}"#);
        assert_eq!(msg, Some(InboundMessage::Dice { value: 3 }));
    }

    #[test]
    fn test_drops_unknown_and_malformed() {
        assert_eq!(InboundMessage::parse(r#"{"type":"teleport","to":57}"#), None);
        assert_eq!(InboundMessage::parse(r#"{"type":"move","playerIndex":2}"#), None);
        assert_eq!(InboundMessage::parse(r#"{"type":"dice","value":-1}"#), None);
        assert_eq!(InboundMessage::parse("not json"), None);
        assert_eq!(InboundMessage::parse(r#"{"value":3}"#), None);
    }

    #[test]
    fn test_outbound_wire_format() {
        assert_eq!(OutboundMessage::Roll.to_text().unwrap(), r#"{"type":"roll"}"#);
        assert_eq!(
            OutboundMessage::Move { piece_index: 3 }.to_text().unwrap(),
            r#"{"type":"move","pieceIndex":3}"#
        );
        assert_eq!(
            OutboundMessage::Chat {
                content: "hi".to_string()
            }
            .to_text()
            .unwrap(),
            r#"{"type":"chat","content":"hi"}"#
        );
    }
}
