//! The voting window, the ballot ledger, and the submission engine.
//!
//! The one real concurrency hazard in this system is the check-then-act
//! race on "has this voter already voted". [`submit_ballot`] closes it by
//! performing the check, every ledger call, and every record append while
//! holding the single async mutex around [`BallotBox`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::model::candidate::{CandidateRoster, Position};
use crate::model::stores::Stores;

/// One accepted per-position selection, sealed by the external ledger.
/// Immutable once appended; nothing updates or deletes these.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotRecord {
    pub voter_id: String,
    pub position: Position,
    pub candidate_ids: Vec<String>,
    pub tx_ref: String,
    pub epoch: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub submitted_at: DateTime<Utc>,
}

/// A single per-position selection as submitted by a voter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotItem {
    pub position: Position,
    pub candidate_ids: Vec<String>,
}

/// Why an individual ballot item was turned away.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Rejection {
    InvalidSelection,
    LedgerUnavailable,
}

/// Per-item submission outcome: the ledger reference on success, or the
/// specific rejection kind. References are never fabricated on failure.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub position: Position,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemResult {
    fn accepted(position: Position, tx_ref: String) -> Self {
        Self {
            position,
            ok: true,
            tx_ref: Some(tx_ref),
            rejection: None,
            error: None,
        }
    }

    fn rejected(position: Position, rejection: Rejection, detail: String) -> Self {
        Self {
            position,
            ok: false,
            tx_ref: None,
            rejection: Some(rejection),
            error: Some(detail),
        }
    }
}

/// Voting window status as reported to clients.
#[derive(Debug, Serialize)]
pub struct WindowStatus {
    pub active: bool,
    pub epoch: u64,
}

/// The voting window flag plus the append-only ballot ledger. Lives behind
/// `Stores::ballots`; see the module docs for the locking contract.
pub struct BallotBox {
    active: bool,
    epoch: u64,
    records: Vec<BallotRecord>,
    /// Last epoch each voter cast a ballot in.
    voted: HashMap<String, u64>,
}

impl BallotBox {
    /// Starts `Closed` at epoch zero.
    pub fn new() -> Self {
        Self {
            active: false,
            epoch: 0,
            records: Vec::new(),
            voted: HashMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn status(&self) -> WindowStatus {
        WindowStatus {
            active: self.active,
            epoch: self.epoch,
        }
    }

    /// Set the window state. Every Closed→Open transition starts a new
    /// epoch, so reopening a genuinely new voting window lets every voter
    /// cast a fresh ballot.
    pub fn set_active(&mut self, active: bool) {
        if active && !self.active {
            self.epoch += 1;
        }
        self.active = active;
    }

    /// Flip the window state, returning the new value.
    pub fn toggle(&mut self) -> bool {
        self.set_active(!self.active);
        self.active
    }

    /// Has this voter a ballot in the current epoch?
    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.voted.get(voter_id) == Some(&self.epoch)
    }

    pub fn records(&self) -> &[BallotRecord] {
        &self.records
    }

    fn record(&mut self, record: BallotRecord) {
        self.voted.insert(record.voter_id.clone(), record.epoch);
        self.records.push(record);
    }
}

impl Default for BallotBox {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate and submit a full ballot for one voter.
///
/// With `all_or_nothing` set (the single-vote entry point) any invalid item
/// rejects the entire submission before anything is recorded; otherwise
/// (the batch entry point) each item reports its own outcome and valid
/// items proceed regardless of their neighbours.
///
/// Each record append happens in the same poll as its ledger call
/// completing, so a caller that aborts the request cannot leave a sealed
/// vote without a record.
pub async fn submit_ballot(
    stores: &Stores,
    ledger: &dyn Ledger,
    voter_id: &str,
    items: &[BallotItem],
    all_or_nothing: bool,
) -> Result<Vec<ItemResult>> {
    // Snapshot the roster up front. It is append-only, so validating
    // against a copy is safe, and it keeps the roster lock out of the
    // submission critical section below.
    let roster = stores.roster.read().await.clone();

    // The gate checks, validation, and every record append happen under
    // this one lock; concurrent submissions from the same voter serialize
    // here.
    let mut ballots = stores.ballots.lock().await;
    if !ballots.is_active() {
        return Err(Error::SessionClosed);
    }
    if ballots.has_voted(voter_id) {
        return Err(Error::AlreadyVoted);
    }

    let mut validation: Vec<Option<Error>> = Vec::with_capacity(items.len());
    for item in items {
        let outcome = validate_item(item, &roster).err();
        if all_or_nothing {
            if let Some(err) = outcome {
                return Err(err);
            }
            validation.push(None);
        } else {
            validation.push(outcome);
        }
    }

    let epoch = ballots.epoch();
    let submitted_at = Utc::now();
    let mut cast_positions: HashSet<Position> = HashSet::new();
    let mut results = Vec::with_capacity(items.len());

    for (item, invalid) in items.iter().zip(validation) {
        if let Some(err) = invalid {
            results.push(ItemResult::rejected(
                item.position,
                Rejection::InvalidSelection,
                err.to_string(),
            ));
            continue;
        }
        if cast_positions.contains(&item.position) {
            results.push(ItemResult::rejected(
                item.position,
                Rejection::InvalidSelection,
                format!("ballot already contains a selection for {}", item.position),
            ));
            continue;
        }

        // One ledger call per accepted item, never retried inline.
        match ledger
            .submit(voter_id, item.position, &item.candidate_ids)
            .await
        {
            Ok(tx_ref) => {
                ballots.record(BallotRecord {
                    voter_id: voter_id.to_string(),
                    position: item.position,
                    candidate_ids: item.candidate_ids.clone(),
                    tx_ref: tx_ref.clone(),
                    epoch,
                    submitted_at,
                });
                cast_positions.insert(item.position);
                results.push(ItemResult::accepted(item.position, tx_ref));
            }
            Err(err) => {
                warn!("Ledger submission failed for {voter_id}/{}: {err}", item.position);
                results.push(ItemResult::rejected(
                    item.position,
                    Rejection::LedgerUnavailable,
                    err.to_string(),
                ));
            }
        }
    }

    Ok(results)
}

fn validate_item(item: &BallotItem, roster: &CandidateRoster) -> Result<()> {
    let (min, max) = item.position.cardinality();
    let count = item.candidate_ids.len();
    if count < min || count > max {
        return Err(Error::InvalidSelection(format!(
            "{} takes between {min} and {max} selections, got {count}",
            item.position
        )));
    }

    let mut seen = HashSet::new();
    for id in &item.candidate_ids {
        if !seen.insert(id) {
            return Err(Error::InvalidSelection(format!(
                "duplicate candidate '{id}'"
            )));
        }
        if !roster.contains(item.position, id) {
            return Err(Error::InvalidSelection(format!(
                "unknown candidate '{id}' for {}",
                item.position
            )));
        }
    }
    Ok(())
}
