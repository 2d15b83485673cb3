use crate::calendar::Phase;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The canonical season row. Exactly one season is current at any moment;
/// `current_day` only ever moves forward and is advanced exclusively by the
/// timing automation through the store's CAS operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: u32,
    pub number: u32,
    pub current_day: u8,
    pub phase: Phase,
    pub started_at: NaiveDateTime,
    pub archived: bool,
}

impl Season {
    pub fn new(id: u32, number: u32, started_at: NaiveDateTime) -> Self {
        Season {
            id,
            number,
            current_day: 1,
            phase: Phase::Regular,
            started_at,
            archived: false,
        }
    }
}
