//! LudoMaster client library
//!
//! Client-side state, transport and turn driving for LudoMaster Ludo.
//!
//! # Overview
//!
//! - **Game State** - Four seats of four pieces each, the turn cursor, the
//!   last dice value and an append-only event log. Progress is clamped to
//!   0..=57; nothing else is validated.
//!
//! - **Turn Driver** - Solo play against a scripted opponent that moves
//!   800 ms after its turn starts; multiplayer play where every mutation
//!   comes back from the backend over the socket.
//!
//! - **Transport** - A reconnecting WebSocket with an outbound queue, and a
//!   JSON REST client for auth, profile, rooms, game and stats endpoints.
//!
//! - **Auth** - Bearer credential shared between the REST client and socket
//!   URLs, with optional persistence.
//!
//! # Design Principles
//!
//! 1. **Client-trusted state** - Moves are applied as sent; there is no
//!    rules engine.
//!
//! 2. **Explicit ownership** - No global store. Sessions are created and
//!    discarded by their owner.
//!
//! 3. **One event at a time** - A session handles intents, socket messages
//!    and timer firings sequentially.
//!
//! # Example
//!
//! ```rust
//! use ludomaster_state::protocol::InboundMessage;
//! use ludomaster_state::state::{GameMode, GameStore};
//!
//! let mut game = GameStore::new(GameMode::Solo);
//! game.move_piece(0, 0, 6);
//! assert_eq!(game.progress(0, 0), Some(6));
//! assert_eq!(game.advance_turn(), 1);
//!
//! // Broadcast from the backend
//! let msg = InboundMessage::parse(r#"{"type":"move","playerIndex":2,"pieceIndex":1,"steps":4}"#)
//!     .unwrap();
//! game.apply(&msg);
//! assert_eq!(game.progress(2, 1), Some(4));
//! assert_eq!(game.turn(), 2);
//! ```

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod state;
pub mod transport;

pub use config::ClientConfig;
pub use driver::{GameSession, Intent, TurnDriver, TurnPhase};
pub use error::{ClientError, Result};
pub use state::*;
