use serde::{Deserialize, Serialize};

/// A purchasable course. Owned by the catalog side of the platform -
/// this subsystem only reads it for pricing at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Price in the platform's fixed currency, minor-unit-free.
    /// Rounded to the nearest whole unit when sent to the processor.
    pub price: f64,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub price: f64,
}
