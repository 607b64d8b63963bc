//! Prefixed identifiers.
//!
//! All IDs are UUID v7 (time-ordered) rendered without hyphens behind a short
//! prefix, so logs and wire payloads make the ID kind obvious at a glance.

use uuid::Uuid;

/// Prefix for permission request IDs.
pub const PERMISSION_PREFIX: &str = "perm_";
/// Prefix for locally minted session IDs.
pub const SESSION_PREFIX: &str = "sess_";
/// Prefix for observer subscriber IDs.
pub const SUBSCRIBER_PREFIX: &str = "sub_";

fn prefixed(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::now_v7().simple())
}

/// Mint a new permission request ID. Never reused within a process.
pub fn new_permission_id() -> String {
    prefixed(PERMISSION_PREFIX)
}

/// Mint a new session ID.
pub fn new_session_id() -> String {
    prefixed(SESSION_PREFIX)
}

/// Mint a new observer subscriber ID.
pub fn new_subscriber_id() -> String {
    prefixed(SUBSCRIBER_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_carry_their_prefix() {
        assert!(new_permission_id().starts_with("perm_"));
        assert!(new_session_id().starts_with("sess_"));
        assert!(new_subscriber_id().starts_with("sub_"));
    }

    #[test]
    fn permission_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_permission_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn ids_have_no_hyphens() {
        assert!(!new_session_id().contains('-'));
    }
}
