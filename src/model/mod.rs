pub mod auth;
pub mod ballot;
pub mod candidate;
pub mod credentials;
pub mod stores;
pub mod tally;
