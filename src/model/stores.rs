//! Process-wide shared state, lock-guarded and owned by managed state.

use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::sync::{Mutex, RwLock},
    Build, Rocket,
};

use crate::config::Config;
use crate::model::auth::{token, SessionTable};
use crate::model::ballot::BallotBox;
use crate::model::candidate::CandidateRoster;
use crate::model::credentials::{CredentialStore, Identity};

/// Every mutable store in the system. Nothing outside this struct holds
/// shared mutable data; every mutation goes through one of these locks.
pub struct Stores {
    pub credentials: RwLock<CredentialStore>,
    pub sessions: RwLock<SessionTable>,
    pub roster: RwLock<CandidateRoster>,
    /// Async mutex because it is held across ledger awaits during ballot
    /// submission, making the already-voted check and the record appends
    /// one atomic unit (see [`crate::model::ballot::submit_ballot`]).
    pub ballots: Mutex<BallotBox>,
}

impl Stores {
    pub fn new(otp_length: usize) -> Self {
        Self {
            credentials: RwLock::new(CredentialStore::with_seed_identities(otp_length)),
            sessions: RwLock::new(SessionTable::default()),
            roster: RwLock::new(CandidateRoster::with_sample_candidates()),
            ballots: Mutex::new(BallotBox::new()),
        }
    }

    /// Resolve a presented token to an identity, in strict priority order:
    ///
    /// 1. a live stateful handle in the session table;
    /// 2. a signed token with a valid signature and unexpired claims;
    /// 3. (debug builds with `dev_raw_token` only) the raw value as an
    ///    identity id.
    ///
    /// Anything else fails closed.
    pub async fn resolve_token(&self, token: &str, config: &Config) -> Option<Identity> {
        if let Some(id) = self.sessions.write().await.resolve(token) {
            return self.credentials.read().await.find(&id).cloned();
        }
        if let Some(claims) = token::verify(token, config.session_secret()) {
            return self.credentials.read().await.find(&claims.sub).cloned();
        }
        if config.dev_raw_token() {
            return self.credentials.read().await.find(token).cloned();
        }
        None
    }
}

/// A fairing that builds the stores and places them into managed state.
/// Must be attached after [`ConfigFairing`](crate::config::ConfigFairing).
pub struct StoresFairing;

#[rocket::async_trait]
impl Fairing for StoresFairing {
    fn info(&self) -> Info {
        Info {
            name: "Stores",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let otp_length = match rocket.state::<Config>() {
            Some(config) => config.otp_length(),
            None => {
                error!("Stores fairing requires the config fairing");
                return Err(rocket);
            }
        };
        Ok(rocket.manage(Stores::new(otp_length)))
    }
}
