use rocket::{serde::json::Json, Route, State};
use std::collections::BTreeMap;

use crate::model::{
    ballot::WindowStatus,
    candidate::{Candidate, Position},
    stores::Stores,
    tally::{self, CandidateTally},
};

pub fn routes() -> Vec<Route> {
    routes![list_candidates, window_status, compute_tally]
}

#[get("/candidates")]
async fn list_candidates(stores: &State<Stores>) -> Json<Vec<Candidate>> {
    Json(stores.roster.read().await.all().to_vec())
}

#[get("/session")]
async fn window_status(stores: &State<Stores>) -> Json<WindowStatus> {
    Json(stores.ballots.lock().await.status())
}

/// Current per-candidate totals. Reads the ledger under the ballot lock, so
/// a concurrently accepted submission is either fully counted or not yet
/// visible, never half-counted.
#[get("/tally")]
async fn compute_tally(stores: &State<Stores>) -> Json<BTreeMap<Position, Vec<CandidateTally>>> {
    let roster = stores.roster.read().await;
    let ballots = stores.ballots.lock().await;
    Json(tally::compute(ballots.records(), &roster))
}
