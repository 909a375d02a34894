//! Daraja (Safaricom) implementation of the gateway boundary: OAuth token
//! provider and the B2C payment-request transport.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::gateway::{
    AccessToken, AccessTokenProvider, B2cRequest, GatewayReply, InitiationTransport,
    TransportError, ACCEPTED_REPLY,
};

const AUTH_PATH: &str = "/oauth/v1/generate?grant_type=client_credentials";
const B2C_PAYMENT_PATH: &str = "/mpesa/b2c/v1/paymentrequest";

fn build_client(timeout_secs: u64) -> Result<Client, TransportError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TransportError::Network {
            message: format!("failed to initialize HTTP client: {e}"),
        })
}

fn map_send_error(err: reqwest::Error, timeout_secs: u64) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            seconds: timeout_secs,
        }
    } else {
        TransportError::Network {
            message: err.to_string(),
        }
    }
}

/// Normalises the gateway's synchronous acknowledgment body into the single
/// reply message this core interprets.
fn reply_from_body(body: &JsonValue) -> GatewayReply {
    let response_code = body
        .get("ResponseCode")
        .map(|code| match code {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    if response_code == "0" {
        return GatewayReply::new(ACCEPTED_REPLY);
    }

    let message = body
        .get("ResponseDescription")
        .or_else(|| body.get("errorMessage"))
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());
    GatewayReply::new(message)
}

fn token_from_body(body: &JsonValue) -> Result<AccessToken, TransportError> {
    let token = body
        .get("access_token")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| TransportError::Credentials {
            message: "authentication response carried no access token".to_string(),
        })?;

    // Daraja returns expires_in as a string of seconds.
    let expires_in = body
        .get("expires_in")
        .map(|v| match v {
            JsonValue::String(s) => s.parse::<i64>().unwrap_or(0),
            other => other.as_i64().unwrap_or(0),
        })
        .unwrap_or(0);

    let fetched_at = Utc::now();
    let access_token = AccessToken {
        token: token.to_string(),
        fetched_at,
        expires_at: fetched_at + ChronoDuration::seconds(expires_in),
    };
    access_token.validate()?;
    Ok(access_token)
}

/// Fetches and caches OAuth bearer tokens from the Daraja authorization
/// endpoint.
pub struct DarajaTokenProvider {
    http: Client,
    config: GatewayConfig,
    cached: RwLock<Option<AccessToken>>,
}

impl DarajaTokenProvider {
    pub fn new(config: GatewayConfig) -> Result<Self, TransportError> {
        let http = build_client(config.timeout_secs)?;
        Ok(Self {
            http,
            config,
            cached: RwLock::new(None),
        })
    }

    async fn authenticate(&self) -> Result<AccessToken, TransportError> {
        let url = format!("{}{}", self.config.base_url, AUTH_PATH);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .send()
            .await
            .map_err(|e| map_send_error(e, self.config.timeout_secs))?;

        let status = response.status();
        let body: JsonValue = response.json().await.map_err(|e| TransportError::Network {
            message: format!("invalid authentication response: {e}"),
        })?;

        if !status.is_success() {
            return Err(TransportError::Credentials {
                message: format!("authentication rejected with HTTP {status}: {body}"),
            });
        }

        let token = token_from_body(&body)?;
        info!(expires_at = %token.expires_at, "fetched gateway access token");
        Ok(token)
    }
}

#[async_trait]
impl AccessTokenProvider for DarajaTokenProvider {
    async fn bearer_token(&self) -> Result<AccessToken, TransportError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired(Utc::now()) {
                    return Ok(token.clone());
                }
            }
        }

        let token = self.authenticate().await?;
        *self.cached.write().await = Some(token.clone());
        Ok(token)
    }
}

/// HTTP transport submitting B2C payment requests to Daraja. Attaches the
/// authentication material the core request deliberately omits.
pub struct DarajaTransport {
    http: Client,
    config: GatewayConfig,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl DarajaTransport {
    pub fn new(
        config: GatewayConfig,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, TransportError> {
        let http = build_client(config.timeout_secs)?;
        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    fn payload(&self, request: &B2cRequest) -> JsonValue {
        json!({
            "OriginatorConversationID": request.originator_conversation_id,
            "InitiatorName": self.config.initiator_name,
            "SecurityCredential": self.config.security_credential,
            "CommandID": request.command_id,
            "Amount": request.amount,
            "PartyA": self.config.business_shortcode,
            "PartyB": request.party_b,
            "Remarks": request.remarks,
            "QueueTimeOutURL": self.config.queue_timeout_url,
            "ResultURL": self.config.result_url,
            "Occassion": request.occasion,
        })
    }
}

#[async_trait]
impl InitiationTransport for DarajaTransport {
    async fn submit(&self, request: &B2cRequest) -> Result<GatewayReply, TransportError> {
        // Without the certificate-derived credential the gateway cannot be
        // called; surface the same reply the hosted connector produces.
        if self.config.security_credential.trim().is_empty() {
            return Ok(GatewayReply::new("No certificate file found in server"));
        }

        let token = self.tokens.bearer_token().await?;
        let url = format!("{}{}", self.config.base_url, B2C_PAYMENT_PATH);
        let payload = self.payload(request);

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&token.token)
                .json(&payload)
                .send()
                .await
                .map_err(|e| map_send_error(e, self.config.timeout_secs));

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();

                    if status.is_server_error() && attempt < self.config.max_retries {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "gateway server error, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }

                    let body: JsonValue =
                        serde_json::from_str(&text).unwrap_or(JsonValue::String(text));
                    return Ok(reply_from_body(&body));
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(TransportError::Network {
            message: "gateway request failed".to_string(),
        }))
    }
}
