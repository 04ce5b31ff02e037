//! The external ledger collaborator that seals accepted votes.
//!
//! The ledger is a black box: it takes a vote payload and hands back a
//! transaction reference, or fails. Failures surface as
//! [`LedgerError`] and are never papered over with a fabricated reference;
//! a failed vote must not look recorded.

use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::model::candidate::Position;
use crate::model::credentials::random_hex;

/// Failure to seal a vote with the external ledger. Not retried inline.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ledger returned a malformed response: {0}")]
    Malformed(String),
    #[error("no ledger backend is configured")]
    NotConfigured,
}

/// External system of record for accepted votes. The submission engine
/// calls `submit` at most once per accepted ballot item; the ledger makes
/// no idempotency promises of its own.
#[rocket::async_trait]
pub trait Ledger: Send + Sync {
    async fn submit(
        &self,
        voter_id: &str,
        position: Position,
        candidate_ids: &[String],
    ) -> Result<String, LedgerError>;
}

/// Ledger reached over HTTP: POSTs the vote as JSON and expects a
/// `{"txRef": "..."}` reply.
pub struct RpcLedger {
    client: reqwest::Client,
    url: String,
}

impl RpcLedger {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest<'a> {
    voter_id: &'a str,
    position: Position,
    candidate_ids: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    tx_ref: String,
}

#[rocket::async_trait]
impl Ledger for RpcLedger {
    async fn submit(
        &self,
        voter_id: &str,
        position: Position,
        candidate_ids: &[String],
    ) -> Result<String, LedgerError> {
        let response = self
            .client
            .post(&self.url)
            .json(&SubmitRequest {
                voter_id,
                position,
                candidate_ids,
            })
            .send()
            .await?
            .error_for_status()?;
        let response: SubmitResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;
        Ok(response.tx_ref)
    }
}

/// Development stand-in that fabricates a reference after a short delay.
/// Requires explicit opt-in via `ledger_simulate`; it is never used as a
/// silent fallback for a failing real ledger.
pub struct SimulatedLedger;

#[rocket::async_trait]
impl Ledger for SimulatedLedger {
    async fn submit(
        &self,
        _voter_id: &str,
        _position: Position,
        _candidate_ids: &[String],
    ) -> Result<String, LedgerError> {
        rocket::tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Ok(format!("0x{}", random_hex(16)))
    }
}

/// Used when neither `ledger_url` nor `ledger_simulate` is set: every
/// submission reports the ledger as unavailable.
pub struct UnavailableLedger;

#[rocket::async_trait]
impl Ledger for UnavailableLedger {
    async fn submit(
        &self,
        _voter_id: &str,
        _position: Position,
        _candidate_ids: &[String],
    ) -> Result<String, LedgerError> {
        Err(LedgerError::NotConfigured)
    }
}

/// A fairing that selects the ledger backend from config and places it into
/// managed state. Must be attached after [`ConfigFairing`](crate::config::ConfigFairing).
pub struct LedgerFairing;

#[rocket::async_trait]
impl Fairing for LedgerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Ledger",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.state::<Config>() {
            Some(config) => config,
            None => {
                error!("Ledger fairing requires the config fairing");
                return Err(rocket);
            }
        };

        let ledger: Box<dyn Ledger> = if let Some(url) = config.ledger_url() {
            info!("Sealing votes via ledger at {url}");
            Box::new(RpcLedger::new(url))
        } else if config.ledger_simulate() {
            warn!("Using SIMULATED ledger; votes are not sealed on any chain");
            Box::new(SimulatedLedger)
        } else {
            warn!("No ledger configured; all ballot submissions will fail");
            Box::new(UnavailableLedger)
        };

        Ok(rocket.manage(ledger))
    }
}
