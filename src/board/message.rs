use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message record — one file, file name = `{id}.json`. Addressed by
/// role string, so any instance of a role may consume it; `read` is a
/// one-way `false -> true` transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub read: bool,
}

impl Message {
    pub fn new(id: String, from: String, to: String, text: String) -> Self {
        Self {
            id,
            from,
            to,
            timestamp: Utc::now(),
            text,
            read: false,
        }
    }
}
