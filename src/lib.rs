//! Backend server for a prototype election platform: voters authenticate
//! with a one-time password or a wallet address, cast a ballot for
//! President, Vice President, and up to 12 Senators, and an admin controls
//! the voting window. Accepted votes are sealed by an external ledger.

#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod model;

use config::ConfigFairing;
use ledger::LedgerFairing;
use logging::LoggerFairing;
use model::stores::StoresFairing;

/// Assemble the server: all routes plus the config, store, ledger, and
/// logging fairings. Ignition fails on bad config (e.g. a missing session
/// secret), which aborts the process rather than serving requests.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(StoresFairing)
        .attach(LedgerFairing)
        .attach(LoggerFairing)
}
