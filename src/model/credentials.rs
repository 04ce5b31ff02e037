//! Identity records and one-time passwords.

use data_encoding::HEXLOWER;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether an identity may administer the election or only vote in it.
/// There is no hierarchy: admin does not implicitly satisfy a voter-only
/// check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Voter,
    Admin,
}

/// A voter or admin identity record. Created at boot (seed identities) or
/// lazily on first wallet login; never destroyed.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub otp: String,
}

/// Client-visible identity projection; never exposes the OTP.
#[derive(Debug, Serialize)]
pub struct IdentitySummary {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl From<&Identity> for IdentitySummary {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            name: identity.name.clone(),
            role: identity.role,
        }
    }
}

/// Random lowercase hex string drawn from the thread-local CSPRNG.
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; (len + 1) / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut hex = HEXLOWER.encode(&bytes);
    hex.truncate(len);
    hex
}

/// Owns every identity record and their OTPs. All mutation happens through
/// the methods here; side effects are confined to identity records.
pub struct CredentialStore {
    identities: HashMap<String, Identity>,
    otp_length: usize,
}

impl CredentialStore {
    /// A store holding the prototype's seed accounts with fresh random OTPs.
    /// The OTPs are logged so a developer can actually log in.
    pub fn with_seed_identities(otp_length: usize) -> Self {
        let mut store = Self {
            identities: HashMap::new(),
            otp_length,
        };
        store.seed("voter01", "Juan Dela Cruz", Role::Voter);
        store.seed("voter02", "Maria Santos", Role::Voter);
        store.seed("admin01", "Election Admin", Role::Admin);
        store
    }

    fn seed(&mut self, id: &str, name: &str, role: Role) {
        let identity = Identity {
            id: id.to_string(),
            name: name.to_string(),
            role,
            otp: random_hex(self.otp_length),
        };
        info!("Seeded identity {id} with OTP {otp}", otp = identity.otp);
        self.identities.insert(id.to_string(), identity);
    }

    pub fn find(&self, id: &str) -> Option<&Identity> {
        self.identities.get(id)
    }

    /// Look up or create the identity for a wallet address, normalized to
    /// lowercase. When `is_admin_match` is set the identity is (or becomes)
    /// an admin; promotion is idempotent and never demotes.
    pub fn issue_or_promote(&mut self, wallet_address: &str, is_admin_match: bool) -> Identity {
        let id = wallet_address.trim().to_lowercase();
        let otp_length = self.otp_length;
        let identity = self.identities.entry(id.clone()).or_insert_with(|| {
            info!("Creating identity for wallet {id}");
            Identity {
                id: id.clone(),
                name: wallet_display_name(&id),
                role: Role::Voter,
                otp: random_hex(otp_length),
            }
        });
        if is_admin_match && identity.role != Role::Admin {
            info!("Promoting wallet {id} to admin");
            identity.role = Role::Admin;
        }
        identity.clone()
    }

    /// Compare the trimmed candidate against the stored OTP. A match
    /// consumes the OTP: a fresh one replaces it immediately, so replaying
    /// the old value fails. A mismatch mutates nothing.
    pub fn consume_otp(&mut self, id: &str, candidate: &str) -> bool {
        match self.identities.get_mut(id) {
            Some(identity) if identity.otp == candidate.trim() => {
                identity.otp = random_hex(self.otp_length);
                true
            }
            _ => false,
        }
    }
}

/// Short display name for a lazily created wallet identity.
fn wallet_display_name(address: &str) -> String {
    let prefix: String = address.chars().take(10).collect();
    format!("Wallet {prefix}")
}
