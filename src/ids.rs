//! ID generation and identifier validation shared across the board, lock,
//! runtime, and fleet modules.

use once_cell::sync::Lazy;
use regex::Regex;

/// `^[a-z0-9][a-z0-9-]{0,31}$` — role name grammar: lowercase alphanumeric,
/// hyphens allowed but not leading, capped at 32 characters.
static ROLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,31}$").expect("static regex"));

/// `^[a-z0-9-]+$` — agent id grammar.
static AGENT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("static regex"));

pub fn validate_role_name(name: &str) -> Result<(), String> {
    if ROLE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(format!(
            "invalid role name '{name}': must match ^[a-z0-9][a-z0-9-]{{0,31}}$"
        ))
    }
}

pub fn validate_agent_id(id: &str) -> Result<(), String> {
    if AGENT_ID_RE.is_match(id) {
        Ok(())
    } else {
        Err(format!("invalid agent id '{id}': must match ^[a-z0-9-]+$"))
    }
}

/// New short opaque id: the first 8 hex characters of a v4 UUID.
pub fn new_short_id() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    raw[..8].to_string()
}
