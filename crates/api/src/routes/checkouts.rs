//! Checkout session endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use checkout::{
    AddressConfirmation, CancelOutcome, CartStore, CheckoutCoordinator, CheckoutError,
    CheckoutSession, ConfirmOutcome, Customer, OrderLedger, PostalLookup, ProceedOutcome,
    ProfileStore, SessionView,
};
use common::SessionId;
use domain::{CartLine, DeliveryAddress, Money};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::sessions::SessionRegistry;

/// Coordinator over boxed collaborators, so the binary and the tests can
/// plug in HTTP or in-memory adapters.
pub type Coordinator = CheckoutCoordinator<
    Arc<dyn OrderLedger>,
    Arc<dyn ProfileStore>,
    Arc<dyn CartStore>,
    Arc<dyn PostalLookup>,
>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub coordinator: Coordinator,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator,
            sessions: SessionRegistry::new(),
        }
    }

    fn session(&self, id: &str) -> Result<(SessionId, Arc<CheckoutSession>), ApiError> {
        let id = SessionId::parse(id)
            .map_err(|e| ApiError::BadRequest(format!("Invalid session id: {e}")))?;
        let session = self
            .sessions
            .get(&id)
            .ok_or_else(|| ApiError::NotFound(format!("Checkout session {id} not found")))?;
        Ok((id, session))
    }
}

/// Identity headers set by the authentication gateway.
pub const CUSTOMER_ID_HEADER: &str = "x-customer-id";
pub const CUSTOMER_EMAIL_HEADER: &str = "x-customer-email";
pub const CUSTOMER_NAME_HEADER: &str = "x-customer-name";

// -- Request types --

#[derive(Deserialize)]
pub struct BeginCheckoutRequest {
    pub lines: Vec<CartLineRequest>,
}

#[derive(Deserialize)]
pub struct CartLineRequest {
    pub item_id: String,
    pub merchant_id: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Deserialize)]
pub struct PostalLookupRequest {
    pub postal_code: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProceedResponse {
    pub outcome: ProceedOutcome,
    pub session: Option<SessionView>,
}

#[derive(Serialize)]
pub struct PostalLookupResponse {
    pub found: bool,
    pub session: SessionView,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub outcome: CancelOutcome,
}

// -- Handlers --

/// POST /checkout — start a session from a cart snapshot.
#[tracing::instrument(skip(state, req), fields(lines = req.lines.len()))]
pub async fn begin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BeginCheckoutRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let lines = req
        .lines
        .into_iter()
        .map(|line| -> Result<CartLine, domain::DomainError> {
            let cart_line = CartLine::new(
                line.item_id,
                line.merchant_id,
                Money::from_cents(line.unit_price_cents),
                line.quantity,
            )?;
            Ok(match line.size {
                Some(size) => cart_line.with_size(size),
                None => cart_line,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let session = state.sessions.insert(state.coordinator.begin(lines));
    Ok((StatusCode::CREATED, Json(session.view().await)))
}

/// GET /checkout/{id} — current session view.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let (_, session) = state.session(&id)?;
    Ok(Json(session.view().await))
}

/// POST /checkout/{id}/proceed — move to the address step.
#[tracing::instrument(skip(state, headers))]
pub async fn proceed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ProceedResponse>, ApiError> {
    let (id, session) = state.session(&id)?;

    let outcome = state
        .coordinator
        .proceed(&session, customer_from_headers(&headers))
        .await?;

    let session = match outcome {
        ProceedOutcome::AddressRequired => Some(session.view().await),
        ProceedOutcome::SignInRequired => {
            state.sessions.remove(&id);
            None
        }
    };
    Ok(Json(ProceedResponse { outcome, session }))
}

/// PUT /checkout/{id}/address — save the address draft without validating.
pub async fn update_address(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(address): Json<DeliveryAddress>,
) -> Result<Json<SessionView>, ApiError> {
    let (_, session) = state.session(&id)?;
    state.coordinator.update_address(&session, address).await?;
    Ok(Json(session.view().await))
}

/// POST /checkout/{id}/postal-lookup — prefill the address draft.
pub async fn postal_lookup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PostalLookupRequest>,
) -> Result<Json<PostalLookupResponse>, ApiError> {
    let (_, session) = state.session(&id)?;
    let found = state
        .coordinator
        .lookup_postal_code(&session, &req.postal_code)
        .await?;
    Ok(Json(PostalLookupResponse {
        found,
        session: session.view().await,
    }))
}

/// POST /checkout/{id}/confirm — confirm the address, record the order and
/// issue its payment code.
#[tracing::instrument(skip(state, confirmation))]
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(confirmation): Json<AddressConfirmation>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let (id, session) = state.session(&id)?;

    match state.coordinator.confirm(&session, confirmation).await {
        Ok(ConfirmOutcome::Ready(_)) => {
            let view = session.view().await;
            state.sessions.remove(&id);
            Ok((StatusCode::OK, Json(view)))
        }
        Ok(ConfirmOutcome::AlreadyInFlight) => {
            Ok((StatusCode::ACCEPTED, Json(session.view().await)))
        }
        Err(CheckoutError::Cancelled) => {
            state.sessions.remove(&id);
            Err(CheckoutError::Cancelled.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// POST /checkout/{id}/retry — back to the address step after a failed
/// submission.
pub async fn retry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let (_, session) = state.session(&id)?;
    state.coordinator.retry(&session).await?;
    Ok(Json(session.view().await))
}

/// POST /checkout/{id}/reissue — derive the payment code again for a
/// recorded order.
pub async fn reissue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let (id, session) = state.session(&id)?;
    state.coordinator.reissue_payment(&session).await?;
    let view = session.view().await;
    state.sessions.remove(&id);
    Ok(Json(view))
}

/// DELETE /checkout/{id} — cancel.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<CancelResponse>), ApiError> {
    let (id, session) = state.session(&id)?;

    let outcome = state.coordinator.cancel(&session).await?;
    let status = match outcome {
        CancelOutcome::Cancelled => {
            state.sessions.remove(&id);
            StatusCode::OK
        }
        CancelOutcome::Deferred => StatusCode::ACCEPTED,
    };
    Ok((status, Json(CancelResponse { outcome })))
}

fn customer_from_headers(headers: &HeaderMap) -> Option<Customer> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut customer = Customer::new(header(CUSTOMER_ID_HEADER)?);
    customer.email = header(CUSTOMER_EMAIL_HEADER);
    customer.name = header(CUSTOMER_NAME_HEADER);
    Some(customer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_customer_requires_id_header() {
        let mut headers = HeaderMap::new();
        headers.insert(CUSTOMER_EMAIL_HEADER, HeaderValue::from_static("a@b.com"));
        assert!(customer_from_headers(&headers).is_none());

        headers.insert(CUSTOMER_ID_HEADER, HeaderValue::from_static("  "));
        assert!(customer_from_headers(&headers).is_none());

        headers.insert(CUSTOMER_ID_HEADER, HeaderValue::from_static("cust-9"));
        let customer = customer_from_headers(&headers).unwrap();
        assert_eq!(customer.id.as_str(), "cust-9");
        assert_eq!(customer.email.as_deref(), Some("a@b.com"));
        assert_eq!(customer.name, None);
    }
}
