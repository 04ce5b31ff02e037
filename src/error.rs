use rocket::{http::Status, response::Responder};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable request-level failures, reported to the caller as structured
/// HTTP outcomes rather than uncaught faults.
#[derive(Debug, Error)]
pub enum Error {
    /// No valid identity resolved from the presented token.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    /// A valid identity with the wrong role. Deliberately distinct from
    /// [`Error::Unauthenticated`] so callers can tell the two apart.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Voting session is not active")]
    SessionClosed,
    #[error("Voter has already submitted a ballot this session")]
    AlreadyVoted,
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        Err(match self {
            Self::Unauthenticated(_) => Status::Unauthorized,
            Self::Forbidden(_) | Self::SessionClosed => Status::Forbidden,
            Self::AlreadyVoted => Status::Conflict,
            Self::InvalidSelection(_) => Status::UnprocessableEntity,
            Self::LedgerUnavailable(_) => Status::BadGateway,
            Self::BadRequest(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
        })
    }
}
