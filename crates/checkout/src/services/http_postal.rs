//! Postal lookup backed by a public postal-code web service.
//!
//! `GET <base>/<8 digits>/json` answers with the address parts, or with an
//! `erro` flag when the code does not exist.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::PostalLookupConfig;
use crate::error::CheckoutError;
use crate::services::postal::{PostalAddress, PostalLookup};

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    /// `true` or `"true"` when the code is unknown.
    #[serde(default)]
    erro: Option<Value>,
}

impl LookupResponse {
    fn not_found(&self) -> bool {
        match &self.erro {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// HTTP client for postal-code prefill.
#[derive(Debug, Clone)]
pub struct HttpPostalLookup {
    client: Client,
    base_url: String,
}

impl HttpPostalLookup {
    pub fn new(config: &PostalLookupConfig) -> Result<Self, CheckoutError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CheckoutError::PostalLookup(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl PostalLookup for HttpPostalLookup {
    #[instrument(skip(self))]
    async fn lookup(&self, postal_code: &str) -> Result<Option<PostalAddress>, CheckoutError> {
        let response = self
            .client
            .get(format!("{}/{postal_code}/json", self.base_url))
            .send()
            .await
            .map_err(|e| CheckoutError::PostalLookup(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => return Ok(None),
            status if !status.is_success() => {
                return Err(CheckoutError::PostalLookup(format!("HTTP {status}")));
            }
            _ => {}
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::PostalLookup(format!("Malformed response: {e}")))?;

        if body.not_found() {
            debug!("Postal code not found");
            return Ok(None);
        }

        Ok(Some(PostalAddress {
            street: body.logradouro,
            neighborhood: body.bairro,
            city: body.localidade,
            region: body.uf,
        }))
    }
}
