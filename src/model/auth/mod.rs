//! The session authority: token issuance and verification, plus the role
//! guard protecting endpoints.
//!
//! Two interchangeable token forms exist. A *stateful* token is an opaque
//! random handle looked up in [`SessionTable`]; a *signed* token is a
//! self-contained HMAC-signed payload verified without server-held state.
//! [`crate::model::stores::Stores::resolve_token`] documents the strict
//! resolution order between them.

mod guard;
mod session;
pub mod token;

pub use guard::{AdminOnly, Auth, Authenticated, Requirement, SESSION_COOKIE};
pub use session::SessionTable;
