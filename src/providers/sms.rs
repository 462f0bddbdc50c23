// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Twilio SMS integration with a console fallback.
//!
//! OTP codes and trial-expiry notices go out through Twilio when
//! credentials are present. Without credentials every message is logged
//! instead, which keeps signup working on development machines and is the
//! diagnostic channel for the OTP flow.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::config::env_optional;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("Twilio configuration missing: {0}")]
    MissingConfig(String),

    #[error("invalid Twilio API URL: {0}")]
    InvalidEndpoint(String),

    #[error("Twilio request failed: {0}")]
    Request(String),

    #[error("Twilio rejected the message: {0}")]
    Rejected(String),
}

/// Direct client for the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base: Url,
    http: Client,
}

impl TwilioClient {
    pub fn is_configured() -> bool {
        env_optional("TWILIO_ACCOUNT_SID").is_some()
            && env_optional("TWILIO_AUTH_TOKEN").is_some()
            && env_optional("TWILIO_PHONE_NUMBER").is_some()
    }

    pub fn from_env() -> Result<Self, SmsError> {
        let account_sid = env_required("TWILIO_ACCOUNT_SID")?;
        let auth_token = env_required("TWILIO_AUTH_TOKEN")?;
        let from_number = env_required("TWILIO_PHONE_NUMBER")?;

        // Regional endpoints and test servers override the default base.
        let api_base: Url = env_optional("TWILIO_API_URL")
            .unwrap_or_else(|| TWILIO_API_BASE.to_string())
            .parse()
            .map_err(|e: url::ParseError| SmsError::InvalidEndpoint(e.to_string()))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SmsError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            account_sid,
            auth_token,
            from_number,
            api_base,
            http,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base.as_str().trim_end_matches('/'),
            self.account_sid
        )
    }

    /// Send one message, returning the Twilio message SID.
    pub async fn send(&self, to: &str, body: &str) -> Result<String, SmsError> {
        let url = self.messages_url();
        let params = [("To", to), ("From", self.from_number.as_str()), ("Body", body)];

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| SmsError::Request(e.to_string()))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| SmsError::Request(format!("invalid Twilio response: {e}")))?;

        if !status.is_success() {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(SmsError::Rejected(format!("{status}: {message}")));
        }

        let sid = payload
            .get("sid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(sid)
    }
}

/// SMS delivery channel selected at startup.
pub enum SmsClient {
    Twilio(TwilioClient),
    /// No credentials configured: log messages instead of sending them.
    Console,
}

impl SmsClient {
    /// Twilio when fully configured, console fallback otherwise.
    pub fn from_env() -> Self {
        if TwilioClient::is_configured() {
            match TwilioClient::from_env() {
                Ok(client) => return SmsClient::Twilio(client),
                Err(err) => {
                    warn!(error = %err, "Twilio misconfigured, falling back to console SMS");
                }
            }
        } else {
            warn!("TWILIO_* not set, SMS messages will be logged to the console");
        }
        SmsClient::Console
    }

    pub fn console() -> Self {
        SmsClient::Console
    }

    pub async fn send(&self, to: &str, body: &str) -> Result<(), SmsError> {
        match self {
            SmsClient::Twilio(client) => {
                let sid = client.send(to, body).await?;
                info!(to, sid, "sms sent");
                Ok(())
            }
            SmsClient::Console => {
                warn!(to, body, "console sms (no provider configured)");
                Ok(())
            }
        }
    }
}

fn env_required(name: &str) -> Result<String, SmsError> {
    env_optional(name).ok_or_else(|| SmsError::MissingConfig(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn console_channel_always_succeeds() {
        let client = SmsClient::console();
        client
            .send("+919876543210", "Your Paperlink verification code is 123456.")
            .await
            .unwrap();
    }

    #[test]
    fn messages_url_tolerates_trailing_slash() {
        let client = TwilioClient {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+15550001111".to_string(),
            api_base: "https://sms.example.test/2010-04-01/".parse().unwrap(),
            http: Client::new(),
        };
        assert_eq!(
            client.messages_url(),
            "https://sms.example.test/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
