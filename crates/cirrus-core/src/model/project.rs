use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub name: String,

    /// Provider region the whole topology lives in.
    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectMeta {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            region: region.into(),
            owner: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
