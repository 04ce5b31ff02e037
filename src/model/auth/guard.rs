//! Request guard mapping the session cookie to an authenticated identity
//! with a role requirement.

use rocket::{
    http::Status,
    request::{self, FromRequest, Outcome},
    Request, State,
};
use std::marker::PhantomData;

use crate::config::Config;
use crate::error::Error;
use crate::model::credentials::{Identity, Role};
use crate::model::stores::Stores;

pub const SESSION_COOKIE: &str = "session";

/// Role requirement attached to an [`Auth`] guard.
pub trait Requirement: Send + Sync + 'static {
    fn permits(role: Role) -> bool;
    /// Human-readable name for forbidden responses.
    fn describe() -> &'static str;
}

/// Any logged-in identity.
pub struct Authenticated;

impl Requirement for Authenticated {
    fn permits(_: Role) -> bool {
        true
    }

    fn describe() -> &'static str {
        "an authenticated user"
    }
}

/// Admin identities only.
pub struct AdminOnly;

impl Requirement for AdminOnly {
    fn permits(role: Role) -> bool {
        role == Role::Admin
    }

    fn describe() -> &'static str {
        "an admin"
    }
}

/// An authenticated caller meeting the role requirement `R`.
///
/// Guard failure distinguishes the two outcomes callers must be able to
/// tell apart: 401 when no valid identity resolved at all, 403 when a valid
/// identity has the wrong role.
pub struct Auth<R> {
    identity: Identity,
    phantom: PhantomData<R>,
}

impl<R> Auth<R> {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }
}

#[rocket::async_trait]
impl<'r, R: Requirement> FromRequest<'r> for Auth<R> {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        // Valid as `Config` and `Stores` are always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();
        let stores = req.guard::<&State<Stores>>().await.unwrap();

        let token = match req.cookies().get(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthenticated("no session cookie".to_string()),
                ))
            }
        };

        let identity = match stores.resolve_token(&token, config).await {
            Some(identity) => identity,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthenticated("session token did not resolve".to_string()),
                ))
            }
        };

        if R::permits(identity.role) {
            Outcome::Success(Auth {
                identity,
                phantom: PhantomData,
            })
        } else {
            Outcome::Failure((
                Status::Forbidden,
                Error::Forbidden(format!("requires {}", R::describe())),
            ))
        }
    }
}
