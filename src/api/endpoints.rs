//! Endpoint wrappers, grouped by resource.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::models::*;
use super::ApiClient;
use crate::error::Result;

// Auth

impl ApiClient {
    pub async fn login(&self, payload: &LoginRequest) -> Result<AuthResponse> {
        self.post("/auth/login", Some(payload)).await
    }

    pub async fn register(&self, payload: &RegisterRequest) -> Result<AuthResponse> {
        self.post("/auth/register", Some(payload)).await
    }

    /// Current user for the held credential.
    pub async fn me(&self) -> Result<User> {
        self.get("/auth/me").await
    }
}

// Profile

impl ApiClient {
    pub async fn profile(&self) -> Result<Profile> {
        self.get("/profile").await
    }

    pub async fn update_profile(&self, payload: &ProfileUpdate) -> Result<Value> {
        self.put("/profile", payload).await
    }

    pub async fn set_avatar(&self, image_base64: impl Into<String>) -> Result<Value> {
        let body = AvatarUpload {
            image: image_base64.into(),
        };
        self.put("/profile/avatar", &body).await
    }
}

// Rooms

impl ApiClient {
    /// Room list. A body that isn't an array yields no rooms; entries that
    /// don't decode are skipped.
    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        let data: Value = self.get("/rooms").await?;
        Ok(rooms_from_value(data))
    }

    pub async fn create_room(&self, payload: &NewRoom) -> Result<Room> {
        self.post("/rooms", Some(payload)).await
    }

    pub async fn join_room(&self, room_id: &str, payload: &JoinRoom) -> Result<Value> {
        self.post(&format!("/rooms/{}/join", room_id), Some(payload))
            .await
    }

    pub async fn leave_room(&self, room_id: &str) -> Result<Value> {
        self.post(&format!("/rooms/{}/leave", room_id), None::<&()>)
            .await
    }

    pub async fn room(&self, room_id: &str) -> Result<Room> {
        self.get(&format!("/rooms/{}", room_id)).await
    }
}

// Game

impl ApiClient {
    pub async fn roll(&self, room_id: &str) -> Result<Value> {
        self.post(&format!("/game/{}/roll", room_id), None::<&()>)
            .await
    }

    pub async fn move_piece(&self, room_id: &str, piece_index: usize) -> Result<Value> {
        let body = MoveRequest { piece_index };
        self.post(&format!("/game/{}/move", room_id), Some(&body))
            .await
    }

    /// Register a solo session with the backend.
    pub async fn start_solo(&self) -> Result<Value> {
        self.post("/game/solo", None::<&()>).await
    }
}

// Stats

impl ApiClient {
    /// Same leniency as [`list_rooms`](Self::list_rooms).
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let data: Value = self.get("/stats/leaderboard").await?;
        Ok(list_from_value(data))
    }

    /// Same leniency as [`list_rooms`](Self::list_rooms).
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let data: Value = self.get("/stats/history").await?;
        Ok(list_from_value(data))
    }
}

pub fn rooms_from_value(data: Value) -> Vec<Room> {
    list_from_value(data)
}

/// Decode a list body: anything but an array is empty, and entries that
/// don't decode are skipped.
pub fn list_from_value<T: DeserializeOwned>(data: Value) -> Vec<T> {
    match data {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(error = %e, "skipping undecodable list entry");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}
