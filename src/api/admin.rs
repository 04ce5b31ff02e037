use rocket::{serde::json::Json, Route, State};
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    model::{
        auth::{AdminOnly, Auth},
        ballot::WindowStatus,
        candidate::{Candidate, Position},
        stores::Stores,
    },
};

pub fn routes() -> Vec<Route> {
    routes![set_window, create_candidate]
}

/// Request to set or toggle the voting window. An explicit `active` sets
/// the flag; an empty object toggles it.
#[derive(Debug, Deserialize)]
struct WindowRequest {
    active: Option<bool>,
}

#[post("/session", data = "<request>", format = "json")]
async fn set_window(
    auth: Auth<AdminOnly>,
    request: Json<WindowRequest>,
    stores: &State<Stores>,
) -> Json<WindowStatus> {
    let mut ballots = stores.ballots.lock().await;
    match request.active {
        Some(active) => ballots.set_active(active),
        None => {
            ballots.toggle();
        }
    }
    info!(
        "Voting window {} by {} (epoch {})",
        if ballots.is_active() { "opened" } else { "closed" },
        auth.id(),
        ballots.epoch()
    );
    Json(ballots.status())
}

#[derive(Debug, Deserialize)]
struct NewCandidate {
    name: String,
    position: Position,
}

#[post("/candidates", data = "<new_candidate>", format = "json")]
async fn create_candidate(
    auth: Auth<AdminOnly>,
    new_candidate: Json<NewCandidate>,
    stores: &State<Stores>,
) -> Result<Json<Candidate>> {
    let new_candidate = new_candidate.into_inner();
    let name = new_candidate.name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest("candidate name must not be empty".to_string()));
    }

    let candidate = stores
        .roster
        .write()
        .await
        .add(name.to_string(), new_candidate.position);
    info!("Candidate {} ({}) added by {}", candidate.id, candidate.position, auth.id());
    Ok(Json(candidate))
}
