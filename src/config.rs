use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    otp_length: usize,
    #[serde(default)]
    admin_address: String,
    #[serde(default)]
    dev_raw_token: bool,
    #[serde(default)]
    ledger_simulate: bool,
    // secrets
    session_secret: String,
    #[serde(default)]
    ledger_url: Option<String>,
}

impl Config {
    /// Valid lifetime of session tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Length in hex characters of generated one-time passwords.
    pub fn otp_length(&self) -> usize {
        self.otp_length
    }

    /// Wallet address promoted to admin on login, case-normalized.
    /// `None` when unset.
    pub fn admin_address(&self) -> Option<String> {
        let trimmed = self.admin_address.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
    }

    /// Whether a raw identity id presented as a token resolves to that
    /// identity. Only ever honoured in debug builds; release builds fail
    /// closed regardless of configuration.
    pub fn dev_raw_token(&self) -> bool {
        self.dev_raw_token && cfg!(debug_assertions)
    }

    /// Endpoint of the external ledger, if one is configured.
    pub fn ledger_url(&self) -> Option<&str> {
        self.ledger_url.as_deref()
    }

    /// Whether to stand in a simulated ledger when no real one is configured.
    pub fn ledger_simulate(&self) -> bool {
        self.ledger_simulate
    }

    /// Secret key used to sign session tokens.
    pub fn session_secret(&self) -> &[u8] {
        self.session_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// A missing or empty `session_secret` fails ignition: signing misconfig is
/// a startup-fatal condition, not a per-request error.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        if config.session_secret.trim().is_empty() {
            error!("`session_secret` must not be empty");
            return Err(rocket);
        }
        if config.dev_raw_token() {
            warn!("Raw-token identity fallback is ENABLED; never deploy this build");
        }

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}
