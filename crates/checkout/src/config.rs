//! Checkout configuration, loaded once at startup.

use std::time::Duration;

use domain::{FeeSchedule, Money, ServiceableRegions};
use payment_code::{InitiationMethod, Merchant};
use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 15;
/// Per-request limit for the HTTP collaborators.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration errors. Startup fails instead of falling back silently.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid value for environment variable.
    #[error("Invalid value for {key}: {message}")]
    InvalidEnvVar { key: String, message: String },
}

fn invalid(key: &str, message: impl ToString) -> ConfigError {
    ConfigError::InvalidEnvVar {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Payment, fee and delivery-area settings for every checkout.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub merchant: Merchant,
    pub initiation: InitiationMethod,
    pub fees: FeeSchedule,
    pub regions: ServiceableRegions,
    /// `None` waits on the ledger indefinitely.
    pub ledger_timeout: Option<Duration>,
}

impl CheckoutConfig {
    /// Creates a configuration with dynamic codes and the default ledger
    /// timeout.
    pub fn new(merchant: Merchant, fees: FeeSchedule, regions: ServiceableRegions) -> Self {
        Self {
            merchant,
            initiation: InitiationMethod::default(),
            fees,
            regions,
            ledger_timeout: Some(Duration::from_secs(DEFAULT_LEDGER_TIMEOUT_SECS)),
        }
    }

    pub fn with_initiation(mut self, initiation: InitiationMethod) -> Self {
        self.initiation = initiation;
        self
    }

    pub fn with_ledger_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ledger_timeout = timeout;
        self
    }

    /// Loads configuration from the process environment (and `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from any key/value source.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.into()));

        let mut merchant = Merchant::new(
            required("PIX_MERCHANT_NAME")?,
            required("PIX_MERCHANT_CITY")?,
        );
        match get("PIX_KEY") {
            Some(key) => {
                merchant = merchant.with_payee_key(key);
                merchant
                    .check_payee_key()
                    .map_err(|e| invalid("PIX_KEY", e))?;
            }
            None => tracing::warn!("PIX_KEY is not set; payment codes cannot be issued"),
        }
        if let Some(value) = get("PIX_UPPERCASE_NAME") {
            let uppercase = value
                .trim()
                .parse::<bool>()
                .map_err(|e| invalid("PIX_UPPERCASE_NAME", e))?;
            merchant = merchant.with_uppercase_name(uppercase);
        }
        if let Some(code) = get("PIX_CURRENCY_CODE") {
            let code = code.trim();
            if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("PIX_CURRENCY_CODE", "expected 3 digits"));
            }
            merchant = merchant.with_currency_code(code);
        }

        let initiation = match get("PIX_INITIATION") {
            Some(value) => value
                .parse::<InitiationMethod>()
                .map_err(|e| invalid("PIX_INITIATION", e))?,
            None => InitiationMethod::default(),
        };

        let fees = FeeSchedule::new(
            parse_money("DELIVERY_FEE_PER_STORE", &required("DELIVERY_FEE_PER_STORE")?)?,
            parse_money("SERVICE_FEE", &required("SERVICE_FEE")?)?,
        );

        let regions: ServiceableRegions = required("SERVICEABLE_REGIONS")?
            .parse()
            .map_err(|e| invalid("SERVICEABLE_REGIONS", e))?;
        if regions.is_empty() {
            return Err(invalid("SERVICEABLE_REGIONS", "no localities listed"));
        }

        let ledger_timeout = match get("LEDGER_TIMEOUT_SECS") {
            Some(value) => {
                let secs: u64 = value
                    .trim()
                    .parse()
                    .map_err(|e| invalid("LEDGER_TIMEOUT_SECS", e))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => Some(Duration::from_secs(DEFAULT_LEDGER_TIMEOUT_SECS)),
        };

        Ok(Self {
            merchant,
            initiation,
            fees,
            regions,
            ledger_timeout,
        })
    }
}

fn parse_money(key: &str, value: &str) -> Result<Money, ConfigError> {
    Money::parse_decimal(value).map_err(|e| invalid(key, e))
}

/// Settings for the HTTP order ledger.
#[derive(Clone)]
pub struct HttpLedgerConfig {
    /// Endpoint orders are POSTed to.
    pub url: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpLedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLedgerConfig")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpLedgerConfig {
    /// Reads `LEDGER_URL` and `LEDGER_API_KEY`. Returns `Ok(None)` when
    /// no ledger URL is configured.
    pub fn from_lookup<F>(get: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(url) = get("LEDGER_URL").filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };
        let api_key = get("LEDGER_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("LEDGER_API_KEY".into()))?;

        Ok(Some(Self {
            url: url.trim().to_string(),
            api_key: SecretString::from(api_key),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }))
    }
}

/// Settings for the HTTP postal lookup.
#[derive(Debug, Clone)]
pub struct PostalLookupConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl PostalLookupConfig {
    /// Reads `POSTAL_LOOKUP_URL`, if set.
    pub fn from_lookup<F>(get: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        get("POSTAL_LOOKUP_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .map(|base_url| Self {
                base_url,
                timeout: DEFAULT_HTTP_TIMEOUT,
            })
    }
}
