use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::RoomId;

/// A room. Shared across departments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomId,
    pub seating_capacity: u32,
    pub features: HashSet<String>,
    pub building_id: String,
}

impl Room {
    pub fn fits(&self, enrollment: u32, required_features: &HashSet<String>) -> bool {
        self.seating_capacity >= enrollment && required_features.is_subset(&self.features)
    }
}
