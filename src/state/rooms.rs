//! Room list cache.
//!
//! Mirrors what the lobby pages show: the fetched rooms, a loading flag and
//! the last fetch error as display text.

use tracing::warn;

use crate::api::{ApiClient, NewRoom, Room};
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Default)]
pub struct RoomsStore {
    rooms: Vec<Room>,
    pub loading: bool,
    pub error: Option<String>,
}

impl RoomsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from the backend. Failures land in `error`, not in the result.
    pub async fn fetch(&mut self, api: &ApiClient) {
        self.begin_fetch();
        let result = api.list_rooms().await;
        self.finish_fetch(result);
    }

    pub fn begin_fetch(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn finish_fetch(&mut self, result: Result<Vec<Room>>) {
        self.loading = false;
        match result {
            Ok(rooms) => self.rooms = rooms,
            Err(e) => {
                warn!(error = %e, "failed to load rooms");
                self.error = Some(display_error(&e, "Failed to load rooms"));
            }
        }
    }

    /// Create a room and put it at the front of the list.
    pub async fn create(&mut self, api: &ApiClient, payload: &NewRoom) -> Result<Room> {
        let room = api.create_room(payload).await?;
        self.insert_created(room.clone());
        Ok(room)
    }

    pub fn insert_created(&mut self, room: Room) {
        self.rooms.insert(0, room);
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms
            .iter()
            .find(|r| r.id.as_deref() == Some(room_id))
    }

    /// Rooms that still have a free seat.
    pub fn open_rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter().filter(|r| !r.is_full())
    }

    pub fn count(&self) -> usize {
        self.rooms.len()
    }
}

/// Page-level error text: the backend's message, or a fallback.
pub fn display_error(err: &ClientError, fallback: &str) -> String {
    match err {
        ClientError::Http { message, .. } if !message.is_empty() => message.clone(),
        ClientError::Http { .. } => fallback.to_string(),
        other => {
            let text = other.to_string();
            if text.is_empty() {
                fallback.to_string()
            } else {
                text
            }
        }
    }
}
