//! Small shared utilities: runtime ids, timestamps, history-id hashing.

use chrono::{DateTime, SecondsFormat, Utc};
use md5::{Digest, Md5};
use uuid::Uuid;

/// A UTC timestamp.
pub type Timestamp = DateTime<Utc>;

/// Generates a new runtime id.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Returns the current UTC time as an ISO 8601 formatted string.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Derives a stable history id for a node.
///
/// The digest covers role, adapter tag and full name, so the same logical
/// node keeps its id across runs while renamed nodes get a fresh one.
#[must_use]
pub fn history_id(role: &str, adapter: Option<&str>, name: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(role.as_bytes());
    hasher.update(b":");
    hasher.update(adapter.unwrap_or("").as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_is_unique() {
        assert_ne!(generate_uuid(), generate_uuid());
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_history_id_is_stable() {
        let a = history_id("step", Some("cucumber"), "given a logged-in user");
        let b = history_id("step", Some("cucumber"), "given a logged-in user");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_history_id_differs_by_name_and_adapter() {
        let a = history_id("step", Some("cucumber"), "given a user");
        let b = history_id("step", Some("classic"), "given a user");
        let c = history_id("step", Some("cucumber"), "given another user");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
