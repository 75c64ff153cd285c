use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tasting {
    pub id: Uuid,
    pub author_id: String,
    pub dish: String,
    pub venue: Option<String>,
    pub rating: u8,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTasting {
    #[validate(length(min = 1, max = 120, message = "dish must be between 1 and 120 characters"))]
    pub dish: String,
    #[validate(length(max = 120))]
    pub venue: Option<String>,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: u8,
    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TastingStats {
    pub total: usize,
    pub authors: usize,
    pub average_rating: Option<f64>,
}
