//! Server-held (stateful) session handles.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::model::credentials::random_hex;

/// Length of a session handle in hex characters.
const HANDLE_LENGTH: usize = 64;

struct SessionEntry {
    identity_id: String,
    expires_at: DateTime<Utc>,
}

/// Maps opaque random handles to identities. Entries die on expiry or
/// explicit revocation (logout).
#[derive(Default)]
pub struct SessionTable {
    entries: HashMap<String, SessionEntry>,
}

impl SessionTable {
    /// Issue a fresh random handle for the identity. Collisions are
    /// overwhelmingly improbable at 256 bits of entropy.
    pub fn create(&mut self, identity_id: &str, ttl: Duration) -> String {
        let token = random_hex(HANDLE_LENGTH);
        self.entries.insert(
            token.clone(),
            SessionEntry {
                identity_id: identity_id.to_string(),
                expires_at: Utc::now() + ttl,
            },
        );
        token
    }

    /// Resolve a live handle to its identity id. An expired entry is
    /// deleted on sight and resolves to nothing.
    pub fn resolve(&mut self, token: &str) -> Option<String> {
        match self.entries.get(token) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.identity_id.clone()),
            Some(_) => {
                self.entries.remove(token);
                None
            }
            None => None,
        }
    }

    pub fn revoke(&mut self, token: &str) {
        self.entries.remove(token);
    }
}
