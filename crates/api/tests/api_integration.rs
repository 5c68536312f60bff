//! Integration tests for the checkout API.

use std::sync::{Arc, OnceLock};

use api::routes::checkouts::{AppState, Coordinator};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use checkout::{
    CheckoutConfig, InMemoryCartStore, InMemoryOrderLedger, InMemoryPostalLookup,
    InMemoryProfileStore, PostalAddress,
};
use domain::{FeeSchedule, Money, ServiceableRegions};
use metrics_exporter_prometheus::PrometheusHandle;
use payment_code::{DecodedPaymentCode, Merchant};
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    state: Arc<AppState>,
    ledger: InMemoryOrderLedger,
    postal: InMemoryPostalLookup,
}

fn checkout_config(merchant: Merchant) -> CheckoutConfig {
    CheckoutConfig::new(
        merchant,
        FeeSchedule::new(Money::from_cents(2000), Money::from_cents(340)),
        ServiceableRegions::new().with("São Paulo", "SP"),
    )
}

fn setup_with(merchant: Merchant) -> TestApp {
    let ledger = InMemoryOrderLedger::new();
    let postal = InMemoryPostalLookup::new();

    let coordinator = Coordinator::new(
        checkout_config(merchant),
        Arc::new(ledger.clone()),
        Arc::new(InMemoryProfileStore::new()),
        Arc::new(InMemoryCartStore::new()),
        Arc::new(postal.clone()),
    );
    let state = Arc::new(AppState::new(coordinator));
    let app = api::create_app(state.clone(), get_metrics_handle());

    TestApp {
        app,
        state,
        ledger,
        postal,
    }
}

fn setup() -> TestApp {
    setup_with(Merchant::new("Look Pagamentos", "São Paulo").with_payee_key("pix@lojalook.com.br"))
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        customer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(customer) = customer {
            builder = builder
                .header("x-customer-id", customer)
                .header("x-customer-email", "ana@example.com");
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Creates a session with two lines from two stores.
    async fn begin(&self) -> String {
        let (status, json) = self
            .send(
                "POST",
                "/checkout",
                Some(json!({
                    "lines": [
                        { "item_id": "shirt-01", "merchant_id": "store-a",
                          "unit_price_cents": 5000, "quantity": 1, "size": "M" },
                        { "item_id": "cap-07", "merchant_id": "store-b",
                          "unit_price_cents": 3000, "quantity": 1 }
                    ]
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        json["id"].as_str().unwrap().to_string()
    }

    /// Creates a session already on the address step.
    async fn at_address_step(&self) -> String {
        let id = self.begin().await;
        let (status, json) = self
            .send("POST", &format!("/checkout/{id}/proceed"), None, Some("cust-001"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["outcome"], "address_required");
        id
    }
}

fn address(city: &str, region: &str) -> Value {
    json!({
        "postal_code": "01310-100",
        "street": "Avenida Paulista",
        "number": "1000",
        "complement": null,
        "neighborhood": "Bela Vista",
        "city": city,
        "region": region
    })
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();

    let (status, json) = t.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["active_sessions"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup();
    t.begin().await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_begin_computes_totals() {
    let t = setup();
    let id = t.begin().await;

    let (status, json) = t.send("GET", &format!("/checkout/{id}"), None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "Reviewing");
    assert_eq!(json["totals"]["subtotal"]["cents"], 8000);
    assert_eq!(json["totals"]["delivery_fee"]["cents"], 4000);
    assert_eq!(json["totals"]["grand_total"]["cents"], 12340);
    assert_eq!(json["lines"][0]["size_label"], "M");
}

#[tokio::test]
async fn test_invalid_cart_line_is_rejected() {
    let t = setup();

    let (status, json) = t
        .send(
            "POST",
            "/checkout",
            Some(json!({
                "lines": [{ "item_id": "x", "merchant_id": "s",
                            "unit_price_cents": 100, "quantity": 0 }]
            })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid-cart");
    assert!(t.state.sessions.is_empty());
}

#[tokio::test]
async fn test_oversized_price_is_rejected() {
    let t = setup();

    let (status, json) = t
        .send(
            "POST",
            "/checkout",
            Some(json!({
                "lines": [{ "item_id": "x", "merchant_id": "s",
                            "unit_price_cents": 4_000_000_000_000_000_000_i64, "quantity": 3 }]
            })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid-cart");
    assert!(t.state.sessions.is_empty());
}

#[tokio::test]
async fn test_full_checkout_flow() {
    let t = setup();
    let id = t.at_address_step().await;

    let (status, json) = t
        .send(
            "POST",
            &format!("/checkout/{id}/confirm"),
            Some(json!({ "address": address("São Paulo", "SP"), "tax_id": "529.982.247-25" })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "Ready");
    let order_id = json["order_id"].as_str().unwrap();
    let payload = json["payment_code"]["payload"].as_str().unwrap();

    let decoded = DecodedPaymentCode::parse(payload).unwrap();
    assert_eq!(decoded.amount(), Some(Money::from_cents(12340)));
    assert_eq!(decoded.reference().as_deref(), Some(order_id));
    assert_eq!(t.ledger.order_count(), 1);

    // Completed sessions leave the registry.
    let (status, _) = t.send("GET", &format!("/checkout/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_proceed_without_identity_redirects_to_sign_in() {
    let t = setup();
    let id = t.begin().await;

    let (status, json) = t
        .send("POST", &format!("/checkout/{id}/proceed"), None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "sign_in_required");
    assert!(json["session"].is_null());
    assert!(t.state.sessions.is_empty());
}

#[tokio::test]
async fn test_unserviceable_address() {
    let t = setup();
    let id = t.at_address_step().await;

    let (status, json) = t
        .send(
            "POST",
            &format!("/checkout/{id}/confirm"),
            Some(json!({ "address": address("Rio de Janeiro", "RJ") })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "serviceability-error");
    assert!(json["error"].as_str().unwrap().contains("São Paulo/SP"));
    assert_eq!(t.ledger.submit_calls(), 0);

    let (_, json) = t.send("GET", &format!("/checkout/{id}"), None, None).await;
    assert_eq!(json["state"], "ConfirmingAddress");
    assert!(json["serviceability_error"].is_string());
}

#[tokio::test]
async fn test_validation_errors_are_field_scoped() {
    let t = setup();
    let id = t.at_address_step().await;

    let mut bad = address("São Paulo", "SP");
    bad["postal_code"] = json!("123");
    let (status, json) = t
        .send(
            "POST",
            &format!("/checkout/{id}/confirm"),
            Some(json!({ "address": bad })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "validation-error");
    assert_eq!(json["fields"][0]["field"], "postal_code");
    assert_eq!(t.ledger.submit_calls(), 0);
}

#[tokio::test]
async fn test_ledger_failure_then_retry() {
    let t = setup();
    t.ledger.set_fail_on_submit(true);
    let id = t.at_address_step().await;
    let confirm = json!({ "address": address("São Paulo", "SP") });

    let (status, json) = t
        .send("POST", &format!("/checkout/{id}/confirm"), Some(confirm.clone()), None)
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "ledger-error");

    let (_, json) = t.send("GET", &format!("/checkout/{id}"), None, None).await;
    assert_eq!(json["state"], "Failed");
    assert_eq!(json["failure"]["code"], "ledger-error");

    t.ledger.set_fail_on_submit(false);
    let (status, json) = t
        .send("POST", &format!("/checkout/{id}/retry"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "ConfirmingAddress");

    let (status, _) = t
        .send("POST", &format!("/checkout/{id}/confirm"), Some(confirm), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.ledger.order_count(), 1);
}

#[tokio::test]
async fn test_configuration_error_reports_order() {
    let t = setup_with(Merchant::new("Look Pagamentos", "São Paulo"));
    let id = t.at_address_step().await;

    let (status, json) = t
        .send(
            "POST",
            &format!("/checkout/{id}/confirm"),
            Some(json!({ "address": address("São Paulo", "SP") })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "configuration-error");
    assert!(json["order_id"].is_string());
    assert_eq!(t.ledger.order_count(), 1);

    // The session is kept so the payment code can be reissued.
    let (status, json) = t
        .send("POST", &format!("/checkout/{id}/reissue"), None, None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "configuration-error");
    assert_eq!(t.state.sessions.len(), 1);
}

#[tokio::test]
async fn test_postal_lookup_prefills() {
    let t = setup();
    t.postal.insert(
        "01310100",
        PostalAddress {
            street: "Avenida Paulista".to_string(),
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            region: "SP".to_string(),
        },
    );
    let id = t.at_address_step().await;

    let (status, json) = t
        .send(
            "POST",
            &format!("/checkout/{id}/postal-lookup"),
            Some(json!({ "postal_code": "01310-100" })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["found"], true);
    assert_eq!(json["session"]["address"]["city"], "São Paulo");
    assert_eq!(json["session"]["address"]["postal_code"], "01310100");
}

#[tokio::test]
async fn test_update_address_draft() {
    let t = setup();
    let id = t.at_address_step().await;

    let (status, json) = t
        .send(
            "PUT",
            &format!("/checkout/{id}/address"),
            Some(address("Campinas", "SP")),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["address"]["city"], "Campinas");
    assert_eq!(json["state"], "ConfirmingAddress");
}

#[tokio::test]
async fn test_cancel_removes_session() {
    let t = setup();
    let id = t.at_address_step().await;

    let (status, json) = t
        .send("DELETE", &format!("/checkout/{id}"), None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "cancelled");
    let (status, _) = t.send("GET", &format!("/checkout/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(t.ledger.submit_calls(), 0);
}

#[tokio::test]
async fn test_confirm_before_proceed_conflicts() {
    let t = setup();
    let id = t.begin().await;

    let (status, json) = t
        .send(
            "POST",
            &format!("/checkout/{id}/confirm"),
            Some(json!({ "address": address("São Paulo", "SP") })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "invalid-state");
}

#[tokio::test]
async fn test_invalid_and_unknown_session_ids() {
    let t = setup();

    let (status, json) = t.send("GET", "/checkout/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "bad-request");

    let (status, json) = t
        .send(
            "GET",
            "/checkout/00000000-0000-0000-0000-000000000000",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not-found");
}
