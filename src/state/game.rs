//! Game session state.
//!
//! Holds the client's snapshot of all four seats, the turn cursor, the last
//! dice value and the event log. Every operation is infallible: inputs are
//! clamped or ignored, never rejected.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::player::{Player, PIECES_PER_PLAYER};
use crate::protocol::InboundMessage;

/// Seats at the table.
pub const PLAYER_COUNT: usize = 4;

/// Log entries surfaced to the display.
pub const VISIBLE_LOG_ENTRIES: usize = 10;

/// Room id used for single-player sessions.
pub const SOLO_ROOM_ID: &str = "solo";

/// Session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Local play against the scripted opponent
    #[default]
    Solo,
    /// Networked play; the backend broadcasts every mutation
    Multiplayer,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::Multiplayer => "multiplayer",
        }
    }

    pub fn is_networked(&self) -> bool {
        matches!(self, Self::Multiplayer)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub at: chrono::DateTime<chrono::Utc>,
}

/// One line of the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    pub sender: Option<String>,
    pub content: String,
    /// Server notice rather than a player message
    pub system: bool,
}

impl ChatLine {
    /// Label shown next to the line.
    pub fn label(&self) -> &str {
        if self.system {
            "System"
        } else {
            self.sender.as_deref().unwrap_or("Player")
        }
    }
}

/// Turn/progress state for one session.
#[derive(Debug, Clone)]
pub struct GameStore {
    /// Session room, `None` until `set_room`
    pub room_id: Option<String>,

    pub mode: GameMode,

    /// Index of the acting seat (0..4)
    turn: usize,

    dice: Option<u8>,

    players: [Player; PLAYER_COUNT],

    log: Vec<LogEntry>,

    chat: Vec<ChatLine>,
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new(GameMode::Solo)
    }
}

impl GameStore {
    pub fn new(mode: GameMode) -> Self {
        Self {
            room_id: None,
            mode,
            turn: 0,
            dice: None,
            players: Player::full_table(),
            log: Vec::new(),
            chat: Vec::new(),
        }
    }

    /// Reinitialize everything and tag the session with `mode`.
    pub fn reset(&mut self, mode: GameMode) {
        *self = Self::new(mode);
    }

    /// Record session identity.
    pub fn set_room(&mut self, room_id: impl Into<String>, mode: GameMode) {
        self.room_id = Some(room_id.into());
        self.mode = mode;
    }

    /// Overwrite the last dice value. Not range checked.
    pub fn set_dice(&mut self, value: u8) {
        self.dice = Some(value);
    }

    pub fn append_log(&mut self, message: impl Into<String>) {
        self.log.push(LogEntry {
            message: message.into(),
            at: chrono::Utc::now(),
        });
    }

    /// Pass the turn to the next seat.
    pub fn advance_turn(&mut self) -> usize {
        self.turn = (self.turn + 1) % PLAYER_COUNT;
        self.turn
    }

    /// Move a piece forward by `steps`, clamped at home.
    ///
    /// Nothing ties `steps` to the dice, and opponents' pieces are never
    /// consulted. Out-of-range indices leave the state untouched.
    pub fn move_piece(&mut self, player_index: usize, piece_index: usize, steps: u32) {
        let Some(player) = self.players.get_mut(player_index) else {
            debug!(player_index, "move for unknown seat ignored");
            return;
        };
        if player.advance(piece_index, steps).is_none() {
            debug!(player_index, piece_index, "move for unknown piece ignored");
        }
    }

    /// Apply a message pushed by the backend.
    pub fn apply(&mut self, msg: &InboundMessage) {
        match msg {
            InboundMessage::Dice { value } => {
                self.set_dice(*value);
                self.append_log(format!("Dice: {}", value));
            }
            InboundMessage::Move {
                player_index,
                piece_index,
                steps,
            } => {
                // Unknown seat: the frame is dropped whole
                if *player_index >= PLAYER_COUNT {
                    debug!(player_index, "move for unknown seat dropped");
                    return;
                }
                self.move_piece(*player_index, *piece_index, *steps);
                self.append_log(format!(
                    "Player {} moved piece {} by {}",
                    player_index.saturating_add(1),
                    piece_index.saturating_add(1),
                    steps
                ));
                self.advance_turn();
            }
            InboundMessage::System { content } => {
                self.append_log(content.clone());
                self.chat.push(ChatLine {
                    sender: None,
                    content: content.clone(),
                    system: true,
                });
            }
            InboundMessage::Chat { sender, content } => {
                self.chat.push(ChatLine {
                    sender: sender.clone(),
                    content: content.clone(),
                    system: false,
                });
            }
        }
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn dice(&self) -> Option<u8> {
        self.dice
    }

    pub fn players(&self) -> &[Player; PLAYER_COUNT] {
        &self.players
    }

    pub fn player(&self, index: usize) -> Option<&Player> {
        self.players.get(index)
    }

    pub fn progress(&self, player_index: usize, piece_index: usize) -> Option<u32> {
        self.players.get(player_index)?.progress(piece_index)
    }

    /// Full log, oldest first.
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// The entries the display shows.
    pub fn recent_log(&self) -> &[LogEntry] {
        let start = self.log.len().saturating_sub(VISIBLE_LOG_ENTRIES);
        &self.log[start..]
    }

    pub fn chat(&self) -> &[ChatLine] {
        &self.chat
    }

    pub fn to_json(&self) -> serde_json::Value {
        let players: Vec<serde_json::Value> = self.players.iter().map(|p| p.to_json()).collect();
        let log: Vec<&str> = self.recent_log().iter().map(|e| e.message.as_str()).collect();

        serde_json::json!({
            "room_id": self.room_id,
            "mode": self.mode.as_str(),
            "turn": self.turn,
            "dice": self.dice,
            "players": players,
            "pieces_per_player": PIECES_PER_PLAYER,
            "log": log
        })
    }
}
