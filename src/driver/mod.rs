//! Turn driver.
//!
//! Decides who acts next and turns user actions into state changes (solo)
//! or outbound messages (multiplayer).
//!
//! ```text
//! Solo:
//!   cursor 0 ── AwaitingLocalAction ──(move)──▶ cursor 1
//!   cursor 1 ── AwaitingScriptedOpponent ──(800 ms)──▶ cursor 2
//!   cursor 2, 3 ── Idle (nothing drives these seats)
//!
//! Multiplayer:
//!   any cursor ── AwaitingRemoteUpdate ──(broadcast move)──▶ next cursor
//! ```
//!
//! Movement is client-trusted: a solo move uses its own 1-6 draw, not the
//! displayed dice value.

mod opponent;
mod session;

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::protocol::{InboundMessage, OutboundMessage};
use crate::state::game::{GameMode, GameStore};

pub use opponent::OpponentTimer;
pub use session::{GameSession, Intent, SessionEvent, Update};

/// Seat controlled by the local user.
pub const LOCAL_SEAT: usize = 0;

/// Seat played by the scripted opponent in solo mode.
pub const SCRIPTED_OPPONENT_SEAT: usize = 1;

/// Who the session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingLocalAction,
    AwaitingScriptedOpponent,
    AwaitingRemoteUpdate,
    Idle,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingLocalAction => "awaiting_local_action",
            Self::AwaitingScriptedOpponent => "awaiting_scripted_opponent",
            Self::AwaitingRemoteUpdate => "awaiting_remote_update",
            Self::Idle => "idle",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn roll_die<R: Rng>(rng: &mut R) -> u8 {
    rng.random_range(1..=6)
}

/// Owns one session's [`GameStore`] and the randomness it draws from.
#[derive(Debug, Clone)]
pub struct TurnDriver<R = StdRng> {
    store: GameStore,
    rng: R,
}

impl TurnDriver<StdRng> {
    pub fn new(room_id: impl Into<String>, mode: GameMode) -> Self {
        Self::with_rng(room_id, mode, StdRng::from_os_rng())
    }
}

impl<R: Rng> TurnDriver<R> {
    /// Fresh session for `room_id`.
    pub fn with_rng(room_id: impl Into<String>, mode: GameMode, rng: R) -> Self {
        let mut store = GameStore::new(mode);
        store.set_room(room_id, mode);
        Self { store, rng }
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn into_store(self) -> GameStore {
        self.store
    }

    pub fn mode(&self) -> GameMode {
        self.store.mode
    }

    pub fn phase(&self) -> TurnPhase {
        if self.store.mode.is_networked() {
            return TurnPhase::AwaitingRemoteUpdate;
        }
        match self.store.turn() {
            LOCAL_SEAT => TurnPhase::AwaitingLocalAction,
            SCRIPTED_OPPONENT_SEAT => TurnPhase::AwaitingScriptedOpponent,
            _ => TurnPhase::Idle,
        }
    }

    /// Whether roll/move are currently enabled for the user. Multiplayer
    /// never gates locally; the backend decides.
    pub fn can_act(&self) -> bool {
        match self.store.mode {
            GameMode::Solo => self.phase() == TurnPhase::AwaitingLocalAction,
            GameMode::Multiplayer => true,
        }
    }

    fn ensure_can_act(&self) -> Result<()> {
        if self.can_act() {
            Ok(())
        } else {
            debug!(phase = %self.phase(), "local action rejected");
            Err(ClientError::NotYourTurn)
        }
    }

    /// Roll the die.
    ///
    /// Solo: draws 1-6 locally and returns `None`. Multiplayer: returns the
    /// `roll` message to send; state changes when `dice` comes back.
    pub fn roll(&mut self) -> Result<Option<OutboundMessage>> {
        self.ensure_can_act()?;
        match self.store.mode {
            GameMode::Multiplayer => Ok(Some(OutboundMessage::Roll)),
            GameMode::Solo => {
                let value = roll_die(&mut self.rng);
                self.store.set_dice(value);
                self.store.append_log(format!("You rolled {}", value));
                Ok(None)
            }
        }
    }

    /// Move one of the user's pieces.
    ///
    /// Solo: moves by a fresh 1-6 draw and passes the turn. Multiplayer:
    /// returns the `move` message to send.
    pub fn move_piece(&mut self, piece_index: usize) -> Result<Option<OutboundMessage>> {
        self.ensure_can_act()?;
        match self.store.mode {
            GameMode::Multiplayer => Ok(Some(OutboundMessage::Move { piece_index })),
            GameMode::Solo => {
                let steps = u32::from(roll_die(&mut self.rng));
                self.store.move_piece(LOCAL_SEAT, piece_index, steps);
                self.store.append_log(format!(
                    "You moved piece {} by {}",
                    piece_index.saturating_add(1),
                    steps
                ));
                self.store.advance_turn();
                Ok(None)
            }
        }
    }

    /// Chat message to send; `None` for blank text or solo sessions.
    pub fn chat(&self, content: &str) -> Option<OutboundMessage> {
        let content = content.trim();
        if content.is_empty() || !self.store.mode.is_networked() {
            return None;
        }
        Some(OutboundMessage::Chat {
            content: content.to_string(),
        })
    }

    pub fn apply_inbound(&mut self, msg: &InboundMessage) {
        debug!(kind = msg.kind(), "applying inbound message");
        self.store.apply(msg);
    }

    /// Play the scripted opponent's turn if it is due. Returns the value
    /// rolled.
    pub fn play_opponent(&mut self) -> Option<u8> {
        if self.phase() != TurnPhase::AwaitingScriptedOpponent {
            return None;
        }
        let value = roll_die(&mut self.rng);
        self.store.set_dice(value);
        self.store
            .move_piece(SCRIPTED_OPPONENT_SEAT, 0, u32::from(value));
        self.store
            .append_log(format!("AI rolled {} and moved.", value));
        self.store.advance_turn();
        Some(value)
    }
}
