// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the `AppConfig` loaded from the
//! environment at startup. Missing third-party credentials never abort
//! startup; the affected feature degrades to its documented fallback.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the record database and file content | unset (in-memory stores) |
//! | `JWT_SECRET` | HS256 signing secret for access tokens | dev secret (logged warning) |
//! | `TOKEN_TTL_DAYS` | Access token lifetime in days | `30` |
//! | `SHARE_BASE_URL` | Base URL for share links and upload portals | `https://paperlink.app` |
//! | `CORS_ORIGINS` | Comma-separated allowed origins, or `*` | `*` |
//! | `DEV_MODE` | Enables the plaintext OTP fallback (`true`/`1`) | off |
//! | `SWEEP_INTERVAL_SECS` | Background sweeper interval | unset (no background sweep) |
//! | `TWILIO_ACCOUNT_SID` / `TWILIO_AUTH_TOKEN` / `TWILIO_PHONE_NUMBER` | SMS delivery | unset (console transport) |
//! | `RAZORPAY_KEY_ID` / `RAZORPAY_KEY_SECRET` | Payment orders | unset (test-mode orders) |
//! | `FIREBASE_PROJECT_ID` | Firebase ID-token verification | unset (firebase routes 500) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use tracing::warn;

/// Environment variable name for the data directory path.
///
/// When set, records live in a redb database and uploaded file content on
/// the filesystem beneath this directory. When unset, both stores are
/// process-local memory and all data is lost on restart.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the access-token signing secret.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Fallback signing secret for local development only.
const DEV_JWT_SECRET: &str = "paperlink_dev_secret";

/// Default base URL for share links and customer upload portals.
const DEFAULT_SHARE_BASE_URL: &str = "https://paperlink.app";

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub share_base_url: String,
    pub cors_origins: Vec<String>,
    pub dev_mode: bool,
    pub sweep_interval_secs: Option<u64>,
}

impl AppConfig {
    /// Load configuration from the environment, logging each degraded
    /// fallback instead of failing startup.
    pub fn from_env() -> Self {
        let host = env_or_default("HOST", "0.0.0.0");
        let port = env_or_default("PORT", "8080").parse().unwrap_or(8080);
        let data_dir = env_optional(DATA_DIR_ENV);

        let jwt_secret = match env_optional(JWT_SECRET_ENV) {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET is not set; using the built-in development secret. Tokens signed with it are forgeable.");
                DEV_JWT_SECRET.to_string()
            }
        };

        let token_ttl_days = env_or_default("TOKEN_TTL_DAYS", "30")
            .parse()
            .unwrap_or(30);

        let share_base_url = env_or_default("SHARE_BASE_URL", DEFAULT_SHARE_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let cors_origins = env_or_default("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let dev_mode = env_flag("DEV_MODE");
        if dev_mode {
            warn!("DEV_MODE is enabled: OTP codes are stored in plaintext and echoed to the log. Never enable this in production.");
        }

        let sweep_interval_secs = env_optional("SWEEP_INTERVAL_SECS").and_then(|v| v.parse().ok());

        Self {
            host,
            port,
            data_dir,
            jwt_secret,
            token_ttl_days,
            share_base_url,
            cors_origins,
            dev_mode,
            sweep_interval_secs,
        }
    }

    /// Configuration for handler tests: in-memory stores, dev mode off.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: None,
            jwt_secret: "test_secret".to_string(),
            token_ttl_days: 30,
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
            cors_origins: vec!["*".to_string()],
            dev_mode: false,
            sweep_interval_secs: None,
        }
    }

    /// Public view URL for a share-link token.
    pub fn share_url(&self, share_link: &str) -> String {
        format!("{}/view/{}", self.share_base_url, share_link)
    }

    /// Public customer-upload portal URL for a merchant code.
    pub fn portal_url(&self, merchant_code: &str) -> String {
        format!("{}/upload/{}", self.share_base_url, merchant_code)
    }
}

/// Read an environment variable, treating empty/whitespace values as unset.
pub fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

/// Read an environment variable with a default for unset/empty values.
pub fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

/// Interpret an environment variable as a boolean flag.
fn env_flag(name: &str) -> bool {
    matches!(
        env_optional(name).as_deref(),
        Some("1") | Some("true") | Some("TRUE") | Some("yes")
    )
}
