use crate::domain::resource::ResourceUri;
use log::{error, warn};
use std::env;

pub const DEFAULT_API_URL: &str = "https://api.balancedpayments.com";
pub const DEFAULT_DASHBOARD_URL: &str = "https://dashboard.balancedpayments.com";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";

/// Used only when `SESSION_SECRET` is unset; tide needs at least 32 bytes.
const DEVELOPMENT_SESSION_SECRET: &str = "development-only-session-secret-do-not-deploy";

/// Settings for the payments API client and the admin surface.
///
/// Built once at startup and handed to whichever component needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: String,
    pub dashboard_url: String,
    /// Provision a remote account whenever a user is created.
    pub auto_create_account: bool,
    /// When set, the admin surface requires HTTP Basic `admin:<password>`.
    pub admin_password: Option<String>,
    pub session_secret: String,
    pub bind_address: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            auto_create_account: false,
            admin_password: None,
            session_secret: DEVELOPMENT_SESSION_SECRET.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_key: non_empty("BALANCED_API_KEY"),
            api_url: non_empty("BALANCED_API_URL").unwrap_or(defaults.api_url),
            dashboard_url: non_empty("BALANCED_DASHBOARD_URL").unwrap_or(defaults.dashboard_url),
            auto_create_account: non_empty("AUTO_CREATE_BALANCED_ACCOUNT")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.auto_create_account),
            admin_password: non_empty("ADMIN_PASSWORD"),
            session_secret: non_empty("SESSION_SECRET").unwrap_or(defaults.session_secret),
            bind_address: non_empty("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            log_level: non_empty("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Logs misconfiguration. Never fails: a missing API key only means
    /// remote calls will be rejected.
    pub fn report(&self) {
        if self.api_key.is_none() {
            error!("You must set the BALANCED_API_KEY environment variable.");
        }
        if self.session_secret == DEVELOPMENT_SESSION_SECRET {
            warn!("SESSION_SECRET is not set, using the development session secret");
        }
    }

    /// Link to the resource on the payments dashboard.
    pub fn dashboard_link(&self, uri: &ResourceUri) -> String {
        format!(
            "{}{}",
            self.dashboard_url.trim_end_matches('/'),
            uri.unversioned()
        )
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
