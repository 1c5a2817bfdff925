use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Published,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub available: i32,
    pub price_minor: i64,
    pub status: EventStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAvailability {
    pub event_id: Uuid,
    pub available: i32,
    pub capacity: i32,
}

impl Event {
    pub fn availability(&self) -> EventAvailability {
        EventAvailability {
            event_id: self.id,
            available: self.available,
            capacity: self.capacity,
        }
    }
}
