use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    ledger::Ledger,
    model::{
        auth::{Auth, Authenticated},
        ballot::{self, BallotItem, ItemResult, Rejection},
        stores::Stores,
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, cast_batch]
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CastResponse {
    tx_ref: String,
}

/// Cast a single-position vote. The whole submission is rejected on any
/// validation failure; the voter's one ballot for this session is spent
/// only if the vote is actually sealed and recorded.
#[post("/vote", data = "<item>", format = "json")]
async fn cast_vote(
    auth: Auth<Authenticated>,
    item: Json<BallotItem>,
    stores: &State<Stores>,
    ledger: &State<Box<dyn Ledger>>,
) -> Result<Json<CastResponse>> {
    let items = [item.into_inner()];
    let mut results =
        ballot::submit_ballot(stores, ledger.inner().as_ref(), auth.id(), &items, true).await?;

    let result = results
        .pop()
        .ok_or_else(|| Error::BadRequest("empty submission".to_string()))?;
    match (result.tx_ref, result.rejection) {
        (Some(tx_ref), _) => Ok(Json(CastResponse { tx_ref })),
        (None, Some(Rejection::LedgerUnavailable)) => {
            Err(Error::LedgerUnavailable(result.error.unwrap_or_default()))
        }
        (None, _) => Err(Error::InvalidSelection(result.error.unwrap_or_default())),
    }
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    votes: Vec<BallotItem>,
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    results: Vec<ItemResult>,
}

/// Cast a full ballot in one request, one item per position. Gate checks
/// (window open, not already voted) cover the whole submission; validation
/// and ledger outcomes are reported per item.
#[post("/vote/batch", data = "<request>", format = "json")]
async fn cast_batch(
    auth: Auth<Authenticated>,
    request: Json<BatchRequest>,
    stores: &State<Stores>,
    ledger: &State<Box<dyn Ledger>>,
) -> Result<Json<BatchResponse>> {
    let results = ballot::submit_ballot(
        stores,
        ledger.inner().as_ref(),
        auth.id(),
        &request.votes,
        false,
    )
    .await?;
    Ok(Json(BatchResponse { results }))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        serde::json::{serde_json::json, Value},
    };

    use crate::testing;

    #[rocket::async_test]
    async fn anonymous_vote_is_unauthenticated() {
        let client = testing::client().await;
        testing::open_window(&client).await;
        let response = client
            .post("/vote")
            .header(ContentType::JSON)
            .body(json!({ "position": "President", "candidateIds": ["c_pres_1"] }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[rocket::async_test]
    async fn closed_window_rejects_votes() {
        let client = testing::client().await;
        testing::login(&client, "voter01").await;
        let response = client
            .post("/vote")
            .header(ContentType::JSON)
            .body(json!({ "position": "President", "candidateIds": ["c_pres_1"] }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[rocket::async_test]
    async fn single_vote_returns_ledger_reference_then_conflicts() {
        let client = testing::client().await;
        testing::open_window(&client).await;
        testing::login(&client, "voter01").await;

        let response = client
            .post("/vote")
            .header(ContentType::JSON)
            .body(json!({ "position": "President", "candidateIds": ["c_pres_1"] }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert!(body["txRef"].as_str().unwrap().starts_with("0x"));

        // The second attempt in the same epoch conflicts and records nothing.
        let response = client
            .post("/vote")
            .header(ContentType::JSON)
            .body(json!({ "position": "Vice President", "candidateIds": ["c_vp_1"] }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
        assert_eq!(
            1,
            testing::stores(&client).ballots.lock().await.records().len()
        );
    }

    #[rocket::async_test]
    async fn invalid_cardinality_is_unprocessable() {
        let client = testing::client().await;
        testing::open_window(&client).await;
        testing::login(&client, "voter01").await;

        let thirteen: Vec<String> = (1..=13).map(|i| format!("c_sen_{}", (i % 12) + 1)).collect();
        let response = client
            .post("/vote")
            .header(ContentType::JSON)
            .body(json!({ "position": "Senator", "candidateIds": thirteen }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
    }

    #[rocket::async_test]
    async fn batch_submits_a_full_ballot() {
        let client = testing::client().await;
        testing::open_window(&client).await;
        testing::login(&client, "voter02").await;

        let response = client
            .post("/vote/batch")
            .header(ContentType::JSON)
            .body(
                json!({ "votes": [
                    { "position": "President", "candidateIds": ["c_pres_2"] },
                    { "position": "Vice President", "candidateIds": ["c_vp_1"] },
                    { "position": "Senator", "candidateIds": ["c_sen_1", "c_sen_2", "c_sen_3"] },
                ]})
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let body: Value = response.into_json().await.unwrap();
        let results = body["results"].as_array().unwrap();
        assert_eq!(3, results.len());
        assert!(results.iter().all(|r| r["ok"] == true));

        // The ballot is spent; a follow-up batch conflicts.
        let response = client
            .post("/vote/batch")
            .header(ContentType::JSON)
            .body(
                json!({ "votes": [
                    { "position": "Senator", "candidateIds": ["c_sen_4"] },
                ]})
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
    }

    #[rocket::async_test]
    async fn batch_reports_invalid_items_without_sinking_the_rest() {
        let client = testing::client().await;
        testing::open_window(&client).await;
        testing::login(&client, "voter01").await;

        let response = client
            .post("/vote/batch")
            .header(ContentType::JSON)
            .body(
                json!({ "votes": [
                    { "position": "President", "candidateIds": ["c_pres_1", "c_pres_2"] },
                    { "position": "Senator", "candidateIds": ["c_sen_5"] },
                ]})
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let body: Value = response.into_json().await.unwrap();
        let results = body["results"].as_array().unwrap();
        assert_eq!(false, results[0]["ok"]);
        assert_eq!("invalidSelection", results[0]["rejection"]);
        assert_eq!(true, results[1]["ok"]);
    }
}
