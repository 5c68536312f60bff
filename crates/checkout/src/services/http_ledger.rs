//! Order ledger backed by a record-oriented REST API.
//!
//! Orders are created with a single `POST` carrying
//! `{"records": [{"fields": {...}}], "typecast": true}`; the ledger
//! answers with the created records and the first record id becomes the
//! order id.

use async_trait::async_trait;
use domain::{OrderDraft, OrderId};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::config::HttpLedgerConfig;
use crate::error::CheckoutError;
use crate::services::ledger::{OrderLedger, OrderReceipt};

#[derive(Debug, Deserialize)]
struct CreateRecordsResponse {
    #[serde(default)]
    records: Vec<CreatedRecord>,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: String,
}

/// HTTP client for the order ledger.
#[derive(Clone)]
pub struct HttpOrderLedger {
    client: Client,
    url: String,
    api_key: SecretString,
}

impl std::fmt::Debug for HttpOrderLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOrderLedger")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpOrderLedger {
    pub fn new(config: &HttpLedgerConfig) -> Result<Self, CheckoutError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CheckoutError::Ledger(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

/// Flattens a draft into the ledger's record fields.
fn record_fields(draft: &OrderDraft) -> Value {
    let items: Vec<Value> = draft
        .lines
        .iter()
        .map(|line| {
            json!({
                "item_id": line.item_id,
                "merchant_id": line.merchant_id,
                "unit_price": line.unit_price.to_decimal_string(),
                "quantity": line.quantity,
                "size": line.size_label,
            })
        })
        .collect();

    json!({
        "Customer ID": draft.customer_id,
        "Customer Email": draft.customer_email,
        "Customer Name": draft.customer_name,
        "Tax ID": draft.tax_id,
        "Postal Code": draft.address.postal_code,
        "Address": draft.address.one_line(),
        "City": draft.address.city,
        "Region": draft.address.region,
        "Items": Value::Array(items).to_string(),
        "Subtotal": draft.totals.subtotal.to_decimal_string(),
        "Delivery Fee": draft.totals.delivery_fee.to_decimal_string(),
        "Service Fee": draft.totals.service_fee.to_decimal_string(),
        "Total": draft.totals.grand_total.to_decimal_string(),
        "Store Count": draft.totals.store_count,
        "Payment Method": draft.payment_method.as_str(),
        "Status": draft.status.as_str(),
    })
}

#[async_trait]
impl OrderLedger for HttpOrderLedger {
    #[instrument(skip(self, draft), fields(customer_id = %draft.customer_id))]
    async fn submit_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, CheckoutError> {
        let body = json!({
            "records": [{ "fields": record_fields(draft) }],
            "typecast": true,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| CheckoutError::Ledger(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Ledger rejected order");
            return Err(CheckoutError::Ledger(format!("HTTP {status}: {text}")));
        }

        let created: CreateRecordsResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::Ledger(format!("Malformed ledger response: {e}")))?;

        let id = created
            .records
            .into_iter()
            .next()
            .map(|record| record.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CheckoutError::Ledger("Ledger response has no record id".to_string()))?;

        debug!(order_id = %id, "Order recorded");
        Ok(OrderReceipt {
            order_id: OrderId::new(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{
        CartLine, CustomerId, DeliveryAddress, Money, OrderStatus, PaymentMethod, compute_totals,
    };

    #[test]
    fn test_record_fields_carry_totals_and_address() {
        let lines = vec![
            CartLine::new("shirt", "store-a", Money::from_cents(5000), 1)
                .unwrap()
                .with_size("M"),
            CartLine::new("cap", "store-b", Money::from_cents(3000), 1).unwrap(),
        ];
        let totals = compute_totals(&lines, Money::from_cents(2000), Money::from_cents(340));
        let draft = OrderDraft {
            customer_id: CustomerId::new("cust-1"),
            customer_email: Some("ana@example.com".to_string()),
            customer_name: None,
            tax_id: Some("52998224725".to_string()),
            lines,
            totals,
            address: DeliveryAddress {
                postal_code: "01310100".to_string(),
                city: "São Paulo".to_string(),
                region: "SP".to_string(),
                ..DeliveryAddress::default()
            },
            payment_method: PaymentMethod::Pix,
            status: OrderStatus::AwaitingPayment,
        };

        let fields = record_fields(&draft);

        assert_eq!(fields["Customer ID"], "cust-1");
        assert_eq!(fields["Subtotal"], "80.00");
        assert_eq!(fields["Delivery Fee"], "40.00");
        assert_eq!(fields["Total"], "123.40");
        assert_eq!(fields["Store Count"], 2);
        assert_eq!(fields["Postal Code"], "01310100");
        assert_eq!(fields["Payment Method"], "pix");
        assert_eq!(fields["Status"], "AwaitingPayment");
        assert_eq!(fields["Customer Name"], Value::Null);

        let items: Vec<Value> =
            serde_json::from_str(fields["Items"].as_str().unwrap()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["size"], "M");
    }
}
