use rocket::{
    http::{Cookie, CookieJar, SameSite, Status},
    serde::json::Json,
    Route, State,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        auth::{token, SESSION_COOKIE},
        credentials::{Identity, IdentitySummary},
        stores::Stores,
    },
};

pub fn routes() -> Vec<Route> {
    routes![login, logout, whoami]
}

/// Which token form the login should issue. Stateful handles are the
/// default; signed tokens survive a server restart but cannot be revoked.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenMode {
    Stateful,
    Signed,
}

/// Login request: either a seeded id plus OTP, or a client-asserted wallet
/// address. The wallet address is trusted as presented; real signature
/// verification is out of scope for the prototype.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    id: Option<String>,
    otp: Option<String>,
    wallet_address: Option<String>,
    mode: Option<TokenMode>,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    user: IdentitySummary,
}

#[post("/auth", data = "<request>", format = "json")]
async fn login(
    request: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    stores: &State<Stores>,
    config: &State<Config>,
) -> Result<Json<LoginResponse>> {
    let request = request.into_inner();

    let identity = if let Some(address) = &request.wallet_address {
        login_wallet(address, stores, config).await?
    } else if let (Some(id), Some(otp)) = (&request.id, &request.otp) {
        login_otp(id, otp, stores).await?
    } else {
        return Err(Error::BadRequest(
            "expected `walletAddress` or `id` and `otp`".to_string(),
        ));
    };

    let token = match request.mode {
        Some(TokenMode::Signed) => token::sign(
            &token::Claims::for_identity(&identity, config.auth_ttl()),
            config.session_secret(),
        ),
        _ => stores
            .sessions
            .write()
            .await
            .create(&identity.id, config.auth_ttl()),
    };
    cookies.add(session_cookie(token, config));

    info!("Logged in {} ({:?})", identity.id, identity.role);
    Ok(Json(LoginResponse {
        user: IdentitySummary::from(&identity),
    }))
}

async fn login_otp(id: &str, otp: &str, stores: &Stores) -> Result<Identity> {
    let mut credentials = stores.credentials.write().await;
    if !credentials.consume_otp(id, otp) {
        return Err(match credentials.find(id) {
            Some(_) => Error::Unauthenticated("incorrect one-time password".to_string()),
            None => Error::NotFound(format!("no identity with id '{id}'")),
        });
    }
    credentials
        .find(id)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("no identity with id '{id}'")))
}

async fn login_wallet(address: &str, stores: &Stores, config: &Config) -> Result<Identity> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(Error::BadRequest("empty wallet address".to_string()));
    }
    let is_admin_match = config
        .admin_address()
        .map_or(false, |admin| admin == trimmed.to_lowercase());
    Ok(stores
        .credentials
        .write()
        .await
        .issue_or_promote(trimmed, is_admin_match))
}

#[delete("/auth")]
async fn logout(cookies: &CookieJar<'_>, stores: &State<Stores>) -> Status {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        // Stateful handles die here; signed tokens only die by expiry.
        stores.sessions.write().await.revoke(cookie.value());
    }
    cookies.remove(Cookie::named(SESSION_COOKIE));
    Status::Ok
}

#[derive(Debug, Serialize)]
struct WhoamiResponse {
    user: Option<IdentitySummary>,
}

/// Resolve the caller's session, if any. Never errors; an anonymous caller
/// simply gets `user: null`.
#[get("/me")]
async fn whoami(
    cookies: &CookieJar<'_>,
    stores: &State<Stores>,
    config: &State<Config>,
) -> Json<WhoamiResponse> {
    let user = match cookies.get(SESSION_COOKIE) {
        Some(cookie) => stores
            .resolve_token(cookie.value(), config)
            .await
            .map(|identity| IdentitySummary::from(&identity)),
        None => None,
    };
    Json(WhoamiResponse { user })
}

fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .max_age(time::Duration::seconds(config.auth_ttl().num_seconds()))
        .same_site(SameSite::Strict)
        .http_only(true)
        .path("/")
        .finish()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::{
        http::ContentType,
        serde::json::{serde_json::json, Value},
    };

    use crate::model::credentials::Role;
    use crate::testing;

    use super::*;

    #[rocket::async_test]
    async fn otp_login_sets_cookie_and_consumes_otp() {
        let client = testing::client().await;
        let otp = testing::current_otp(&client, "voter01").await;

        let response = client
            .post("/auth")
            .header(ContentType::JSON)
            .body(json!({ "id": "voter01", "otp": otp }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(SESSION_COOKIE).is_some());

        let body: Value = response.into_json().await.unwrap();
        assert_eq!("voter01", body["user"]["id"]);
        assert_eq!("voter", body["user"]["role"]);

        // Replaying the consumed OTP fails with 401 (identity exists).
        let response = client
            .post("/auth")
            .header(ContentType::JSON)
            .body(json!({ "id": "voter01", "otp": otp }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[rocket::async_test]
    async fn unknown_identity_is_not_found() {
        let client = testing::client().await;
        let response = client
            .post("/auth")
            .header(ContentType::JSON)
            .body(json!({ "id": "voter99", "otp": "whatever" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[rocket::async_test]
    async fn wallet_login_creates_identity_lazily() {
        let client = testing::client().await;
        let response = client
            .post("/auth")
            .header(ContentType::JSON)
            .body(json!({ "walletAddress": "0xDEADBEEF01" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let body: Value = response.into_json().await.unwrap();
        assert_eq!("0xdeadbeef01", body["user"]["id"]);
        assert_eq!("voter", body["user"]["role"]);
    }

    #[rocket::async_test]
    async fn configured_admin_wallet_is_promoted() {
        let client = testing::client().await;
        // Mixed case on purpose; the configured address must match after
        // normalization.
        let response = client
            .post("/auth")
            .header(ContentType::JSON)
            .body(
                json!({ "walletAddress": "0xA11CE0000000000000000000000000000000BEEF" })
                    .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let body: Value = response.into_json().await.unwrap();
        assert_eq!("admin", body["user"]["role"]);
    }

    #[rocket::async_test]
    async fn signed_login_mode_issues_a_self_contained_token() {
        let client = testing::client().await;
        let otp = testing::current_otp(&client, "voter02").await;
        let response = client
            .post("/auth")
            .header(ContentType::JSON)
            .body(json!({ "id": "voter02", "otp": otp, "mode": "signed" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // The cookie verifies as a signed token, no table entry needed.
        let cookies = client.cookies();
        let cookie = cookies.get(SESSION_COOKIE).unwrap();
        let config = client.rocket().state::<Config>().unwrap();
        let claims = token::verify(cookie.value(), config.session_secret()).unwrap();
        assert_eq!("voter02", claims.sub);

        let response = client.get("/me").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!("voter02", body["user"]["id"]);
    }

    #[rocket::async_test]
    async fn expired_signed_token_resolves_to_no_identity() {
        let client = testing::client().await;
        let config = client.rocket().state::<Config>().unwrap();
        let identity = Identity {
            id: "voter01".to_string(),
            name: "Juan Dela Cruz".to_string(),
            role: Role::Voter,
            otp: String::new(),
        };
        let stale = token::Claims {
            expires_at: chrono::Utc::now() - Duration::hours(1),
            ..token::Claims::for_identity(&identity, Duration::hours(8))
        };
        let expired = token::sign(&stale, config.session_secret());

        let response = client
            .get("/me")
            .cookie(Cookie::new(SESSION_COOKIE, expired))
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(Value::Null, body["user"]);
    }

    #[rocket::async_test]
    async fn whoami_round_trip_and_logout() {
        let client = testing::client().await;
        testing::login(&client, "voter01").await;

        let response = client.get("/me").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!("voter01", body["user"]["id"]);

        let response = client.delete("/auth").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(SESSION_COOKIE));

        let response = client.get("/me").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(Value::Null, body["user"]);
    }

    #[rocket::async_test]
    async fn logout_not_logged_in() {
        let client = testing::client().await;
        let response = client.delete("/auth").dispatch().await;
        assert_eq!(Status::Ok, response.status());
    }
}
