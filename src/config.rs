//! Environment-driven configuration, loaded once at startup by the host.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVariable(String),

    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^((https?|ftp|file)://)?(([a-zA-Z\d]([a-zA-Z\d-]*[a-zA-Z\d])*\.)+[a-zA-Z]{2,}|(\d{1,3}\.){3}\d{1,3})(:\d+)?(/[-a-zA-Z\d%_.~+]*)*(\?[;&a-z\d%_.~+=-]*)?(#[-a-z\d_]*)?$",
    )
    .unwrap()
});

/// Lenient structural URL check used for the gateway endpoints registered in
/// configuration.
pub fn validate_url(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub payment: PaymentConfig,
    pub logging: LoggingConfig,
}

/// Connection details for the disbursement gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub initiator_name: String,
    /// Pre-encrypted security credential; when empty, submissions surface an
    /// authentication error instead of being sent.
    pub security_credential: String,
    /// Path of the authentication certificate, when managed locally.
    pub certificate_path: Option<String>,
    pub business_shortcode: String,
    pub queue_timeout_url: String,
    pub result_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Smallest amount the gateway will disburse, in currency units.
    pub minimum_amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

impl AppConfig {
    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            gateway: GatewayConfig::from_env()?,
            payment: PaymentConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        self.payment.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(GatewayConfig {
            base_url: env::var("MPESA_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string()),
            consumer_key: env::var("MPESA_CONSUMER_KEY")
                .map_err(|_| ConfigError::MissingVariable("MPESA_CONSUMER_KEY".to_string()))?,
            consumer_secret: env::var("MPESA_CONSUMER_SECRET")
                .map_err(|_| ConfigError::MissingVariable("MPESA_CONSUMER_SECRET".to_string()))?,
            initiator_name: env::var("MPESA_INITIATOR_NAME")
                .map_err(|_| ConfigError::MissingVariable("MPESA_INITIATOR_NAME".to_string()))?,
            security_credential: env::var("MPESA_SECURITY_CREDENTIAL").unwrap_or_default(),
            certificate_path: env::var("MPESA_CERTIFICATE_FILE").ok(),
            business_shortcode: env::var("MPESA_BUSINESS_SHORTCODE")
                .map_err(|_| ConfigError::MissingVariable("MPESA_BUSINESS_SHORTCODE".to_string()))?,
            queue_timeout_url: env::var("MPESA_QUEUE_TIMEOUT_URL")
                .map_err(|_| ConfigError::MissingVariable("MPESA_QUEUE_TIMEOUT_URL".to_string()))?,
            result_url: env::var("MPESA_RESULT_URL")
                .map_err(|_| ConfigError::MissingVariable("MPESA_RESULT_URL".to_string()))?,
            timeout_secs: env::var("MPESA_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MPESA_TIMEOUT_SECS".to_string()))?,
            max_retries: env::var("MPESA_MAX_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MPESA_MAX_RETRIES".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("MPESA_BASE_URL", &self.base_url),
            ("MPESA_QUEUE_TIMEOUT_URL", &self.queue_timeout_url),
            ("MPESA_RESULT_URL", &self.result_url),
        ] {
            if !validate_url(url) {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} is not a valid URL: {url}"
                )));
            }
        }

        if let Some(path) = &self.certificate_path {
            if !(path.ends_with(".cer") || path.ends_with(".pem")) {
                return Err(ConfigError::InvalidValue(
                    "MPESA_CERTIFICATE_FILE must be a .cer or .pem file".to_string(),
                ));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "MPESA_TIMEOUT_SECS cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl PaymentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(PaymentConfig {
            minimum_amount: Decimal::from_str(
                &env::var("PAYMENT_MINIMUM_AMOUNT").unwrap_or_else(|_| "10".to_string()),
            )
            .map_err(|_| ConfigError::InvalidValue("PAYMENT_MINIMUM_AMOUNT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_amount <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_MINIMUM_AMOUNT must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            minimum_amount: Decimal::TEN,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation_accepts_gateway_endpoints() {
        assert!(validate_url("https://sandbox.safaricom.co.ke"));
        assert!(validate_url("https://api.safaricom.co.ke/mpesa/b2c/v1/paymentrequest"));
        assert!(validate_url("https://example.com:8443/callbacks/b2c?src=core"));
    }

    #[test]
    fn url_validation_rejects_malformed_values() {
        assert!(!validate_url("not a url"));
        assert!(!validate_url("http://"));
        assert!(!validate_url(""));
    }

    fn gateway_config() -> GatewayConfig {
        GatewayConfig {
            base_url: "https://sandbox.safaricom.co.ke".to_string(),
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
            initiator_name: "initiator".to_string(),
            security_credential: "credential".to_string(),
            certificate_path: Some("/etc/mpesa/production.cer".to_string()),
            business_shortcode: "600999".to_string(),
            queue_timeout_url: "https://example.com/timeout".to_string(),
            result_url: "https://example.com/result".to_string(),
            timeout_secs: 120,
            max_retries: 2,
        }
    }

    #[test]
    fn certificate_extension_is_checked() {
        let mut config = gateway_config();
        assert!(config.validate().is_ok());

        config.certificate_path = Some("/etc/mpesa/production.pem".to_string());
        assert!(config.validate().is_ok());

        config.certificate_path = Some("/etc/mpesa/production.txt".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_callback_url_is_rejected() {
        let mut config = gateway_config();
        config.result_url = "definitely not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_minimum_amount_is_ten() {
        assert_eq!(PaymentConfig::default().minimum_amount, Decimal::TEN);
    }
}
