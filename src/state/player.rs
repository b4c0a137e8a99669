//! Seats and piece progress.
//!
//! Each of the four seats owns four pieces. A piece's position is a single
//! linear counter:
//!
//! ```text
//!  0 ──────────────────────────────────────────────▶ 57
//!  start                                            home
//! ```
//!
//! There is no outer track / home column split and no capture, so a counter
//! only ever grows until the session is reset.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pieces per seat.
pub const PIECES_PER_PLAYER: usize = 4;

/// Progress value of a piece that reached home.
pub const HOME_PROGRESS: u32 = 57;

/// Fixed seat colors, in turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    Green,
    Yellow,
    Blue,
}

impl PlayerColor {
    pub const ALL: [PlayerColor; 4] = [Self::Red, Self::Green, Self::Yellow, Self::Blue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
        }
    }

    /// Display color used by the board.
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Red => "#ff4d4f",
            Self::Green => "#34d399",
            Self::Yellow => "#fbbf24",
            Self::Blue => "#60a5fa",
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One seat on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerColor,
    pub color: String,
    pub pieces: [u32; PIECES_PER_PLAYER],
    /// Never advanced by moves; kept for the display layer.
    pub home: u32,
}

impl Player {
    pub fn new(id: PlayerColor) -> Self {
        Self {
            id,
            color: id.hex().to_string(),
            pieces: [0; PIECES_PER_PLAYER],
            home: 0,
        }
    }

    /// The four seats at zero progress.
    pub fn full_table() -> [Player; 4] {
        PlayerColor::ALL.map(Player::new)
    }

    /// Advance a piece, clamping at home. Returns the new progress, or `None`
    /// for an out-of-range piece index.
    pub fn advance(&mut self, piece_index: usize, steps: u32) -> Option<u32> {
        let piece = self.pieces.get_mut(piece_index)?;
        *piece = piece.saturating_add(steps).min(HOME_PROGRESS);
        Some(*piece)
    }

    pub fn progress(&self, piece_index: usize) -> Option<u32> {
        self.pieces.get(piece_index).copied()
    }

    /// Pieces whose counter reached home.
    pub fn pieces_home(&self) -> usize {
        self.pieces.iter().filter(|&&p| p == HOME_PROGRESS).count()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.as_str(),
            "color": self.color,
            "pieces": self.pieces,
            "home": self.home
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_table_order() {
        let table = Player::full_table();
        let ids: Vec<_> = table.iter().map(|p| p.id).collect();
        assert_eq!(ids, PlayerColor::ALL.to_vec());
        assert_eq!(table[0].color, "#ff4d4f");
        assert_eq!(table[3].color, "#60a5fa");
        assert!(table.iter().all(|p| p.pieces == [0; 4] && p.home == 0));
    }

    #[test]
    fn test_advance_clamps() {
        let mut player = Player::new(PlayerColor::Green);
        assert_eq!(player.advance(2, 50), Some(50));
        assert_eq!(player.advance(2, 6), Some(56));
        assert_eq!(player.advance(2, 6), Some(57));
        assert_eq!(player.advance(2, u32::MAX), Some(57));
        assert_eq!(player.pieces, [0, 0, 57, 0]);
        assert_eq!(player.pieces_home(), 1);
        // home-count isn't touched by moves
        assert_eq!(player.home, 0);
    }

    #[test]
    fn test_advance_out_of_range() {
        let mut player = Player::new(PlayerColor::Blue);
        assert_eq!(player.advance(4, 3), None);
        assert_eq!(player.pieces, [0; 4]);
        assert_eq!(player.progress(9), None);
    }

    #[test]
    fn test_to_json() {
        let mut player = Player::new(PlayerColor::Yellow);
        player.advance(0, 5);
        assert_eq!(
            player.to_json(),
            serde_json::json!({"id": "yellow", "color": "#fbbf24", "pieces": [5, 0, 0, 0], "home": 0})
        );
    }
}
