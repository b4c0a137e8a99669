//! Client state for LudoMaster.
//!
//! - `game` - turn/progress state for one game session
//! - `player` - seats and piece progress
//! - `connection` - socket lifecycle and reconnect schedule
//! - `auth` - credential and current user
//! - `rooms` - room list cache
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 AppState                 │
//! │                                          │
//! │  ┌─────────────┐     ┌─────────────┐     │
//! │  │  AuthStore  │     │ RoomsStore  │     │
//! │  │             │     │             │     │
//! │  │ token ──────┼─────┼─▶ ApiClient │     │
//! │  │ user        │     │ rooms       │     │
//! │  └─────────────┘     └─────────────┘     │
//! └──────────────────────────────────────────┘
//!
//!  GameSession ──▶ TurnDriver ──▶ GameStore   (one per game view)
//! ```
//!
//! A `GameStore` belongs to the session driving it; a new session starts
//! from a fresh store and dropping the session discards it.
//!
//! Nothing here is global: callers own an `AppState` and hand out
//! references to the views that need them.

pub mod auth;
pub mod connection;
pub mod game;
pub mod player;
pub mod rooms;

pub use auth::{
    decode_token, AuthStore, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    StoredCredentials, CREDENTIALS_KEY,
};
pub use connection::{Connection, ConnectionStatus, ReconnectPolicy};
pub use game::{ChatLine, GameMode, GameStore, LogEntry, PLAYER_COUNT, SOLO_ROOM_ID};
pub use player::{Player, PlayerColor, HOME_PROGRESS, PIECES_PER_PLAYER};
pub use rooms::{display_error, RoomsStore};

use crate::api::SharedToken;

/// Combined client state.
#[derive(Debug, Default)]
pub struct AppState {
    pub auth: AuthStore,
    pub rooms: RoomsStore,
}

impl AppState {
    pub fn new(token: SharedToken) -> Self {
        Self {
            auth: AuthStore::new(token),
            rooms: RoomsStore::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_app_state_basic() {
        let state = AppState::new(SharedToken::new());
        assert!(!state.auth.is_signed_in());
        assert_eq!(state.rooms.count(), 0);
    }

    #[test]
    fn test_app_state_shares_token_with_auth() {
        let token = SharedToken::new();
        let state = AppState::new(token.clone());
        token.set(Some("abc".to_string()));
        assert_eq!(state.auth.token().as_deref(), Some("abc"));
    }
}
