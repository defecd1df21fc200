//! HTTP Handlers

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use checkout_core::{
    AgeGate, CheckoutEntry, CheckoutError, CheckoutSession, CheckoutSnapshot, CustomerForm,
    NavigationDecision, PaymentInitiator, PaymentRecord, PaymentRequest, SelectedPlan,
    UpsellDecision, UpsellOffer, ValidationErrors, plan::format_brl, provider::TransactionStatus,
};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub payments_configured: bool,
    pub open_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
            fields: None,
        }),
    )
}

/// Map a checkout failure onto a status and the buyer-facing message
fn checkout_error(err: CheckoutError) -> ApiError {
    let (status, code) = match &err {
        CheckoutError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
        CheckoutError::RequestOutstanding => (StatusCode::CONFLICT, "REQUEST_OUTSTANDING"),
        CheckoutError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        CheckoutError::SessionClosed => (StatusCode::GONE, "SESSION_CLOSED"),
        CheckoutError::Provider(_) | CheckoutError::MalformedResponse(_) => {
            (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR")
        }
        CheckoutError::ProviderUnavailable(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_UNAVAILABLE"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    if status.is_server_error() {
        tracing::error!(code, error = %err, "Checkout request failed");
    } else {
        tracing::debug!(code, error = %err, "Checkout request rejected");
    }

    let fields = match &err {
        CheckoutError::Validation(errors) => Some(errors.clone()),
        _ => None,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
            fields,
        }),
    )
}

fn payments_disabled() -> ApiError {
    api_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "PAYMENTS_DISABLED",
        "Configuração de API ausente",
    )
}

fn initiator(state: &AppState) -> Result<&PaymentInitiator, ApiError> {
    state.initiator.as_ref().ok_or_else(payments_disabled)
}

fn session(state: &AppState, id: &Uuid) -> Result<Arc<CheckoutSession>, ApiError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", "Sessão não encontrada"))
}

/// Accepts an empty body as "no payload"
fn optional_json<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<Option<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_BODY", e.to_string()))
}

// ============================================================================
// Health
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payments_configured: state.initiator.is_some(),
        open_sessions: state.sessions.len(),
    })
}

// ============================================================================
// Plans & Upsell
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PlanView {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub display_price: String,
    pub default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upsell: Option<UpsellOffer>,
}

#[derive(Debug, Serialize)]
pub struct UpsellResponse {
    #[serde(flatten)]
    pub offer: UpsellOffer,
    pub display_price: String,
    pub display_original_price: String,
    pub savings_cents: i64,
    pub pitch: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectPlanRequest {
    #[serde(default)]
    pub accept_upsell: bool,
}

#[derive(Debug, Serialize)]
pub struct SelectPlanResponse {
    pub plan: SelectedPlan,
    pub checkout_url: String,
}

/// Plan catalog with formatted prices
pub async fn list_plans(State(state): State<AppState>) -> Json<Vec<PlanView>> {
    let default_id = &state.catalog.default_plan().id;
    Json(
        state
            .catalog
            .plans()
            .iter()
            .map(|plan| PlanView {
                id: plan.id.clone(),
                name: plan.name.clone(),
                price_cents: plan.effective_price_cents(),
                display_price: plan.display_price(),
                default: &plan.id == default_id,
                upsell: state.upsells.offer_for(&plan.id).cloned(),
            })
            .collect(),
    )
}

/// Upsell offer shown before checking out `id`
pub async fn get_upsell(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UpsellResponse>, ApiError> {
    let plan = state.catalog.lookup(&id);
    let offer = state
        .upsells
        .offer_for(&plan.id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "NO_OFFER", "Nenhuma oferta para este plano"))?;

    Ok(Json(UpsellResponse {
        display_price: format_brl(offer.price_cents),
        display_original_price: format_brl(offer.original_price_cents),
        savings_cents: offer.savings_cents(),
        pitch: offer.pitch(plan),
        offer: offer.clone(),
    }))
}

/// Resolve the upsell decision into the checkout URL
pub async fn select_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<SelectPlanResponse>, ApiError> {
    let request: SelectPlanRequest = optional_json(&body)?.unwrap_or_default();
    let plan = state
        .upsells
        .resolve(&state.catalog, &id, UpsellDecision::from(request.accept_upsell));

    Ok(Json(SelectPlanResponse {
        checkout_url: format!("/checkout?{}", plan.checkout_query()),
        plan,
    }))
}

// ============================================================================
// Checkout Sessions
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OpenCheckoutRequest {
    /// Checkout page query string
    #[serde(default)]
    pub query: String,
}

/// Open a checkout session
pub async fn open_checkout(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CheckoutSnapshot>), ApiError> {
    let initiator = initiator(&state)?.clone();
    let request: OpenCheckoutRequest = optional_json(&body)?.unwrap_or_default();

    let entry = CheckoutEntry::from_query(&request.query, &state.catalog);
    let session = CheckoutSession::open(
        entry,
        initiator,
        state.clock.clone(),
        state.session_config.clone(),
    )
    .await;

    let snapshot = session.snapshot();
    state.sessions.insert(Arc::new(session));

    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Current session snapshot
pub async fn get_checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutSnapshot>, ApiError> {
    Ok(Json(session(&state, &id)?.snapshot()))
}

/// Submit the customer form and request the PIX code
pub async fn submit_checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<CheckoutSnapshot>, ApiError> {
    let session = session(&state, &id)?;
    let form: Option<CustomerForm> = optional_json(&body)?;

    session
        .submit(form)
        .await
        .map(Json)
        .map_err(checkout_error)
}

/// Dismiss the error notice
pub async fn dismiss_notice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutSnapshot>, ApiError> {
    Ok(Json(session(&state, &id)?.dismiss_notice()))
}

/// Tear the session down
pub async fn close_checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.close(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", "Sessão não encontrada"))
    }
}

// ============================================================================
// PIX pass-through
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePixRequest {
    pub plan_id: String,
    pub amount: i64,
    pub customer: CustomerForm,
    #[serde(default)]
    pub tracking: Option<checkout_core::TrackingParams>,
}

#[derive(Debug, Serialize)]
pub struct CreatePixResponse {
    pub success: bool,
    pub transaction_id: String,
    pub reference: String,
    pub qr_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code_image: Option<String>,
    pub amount: i64,
    /// RFC 3339
    pub expires_at: Option<String>,
}

impl From<PaymentRecord> for CreatePixResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            success: true,
            transaction_id: record.transaction_id,
            reference: record.reference,
            qr_code: record.qr_code,
            qr_code_image: record.qr_code_image,
            amount: record.amount_cents,
            expires_at: record.expires_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PixStatusRequest {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Create a PIX charge without a session.
///
/// Only e-mail and phone are required; a missing or placeholder document is
/// replaced by a generated CPF.
pub async fn create_pix(
    State(state): State<AppState>,
    Json(payload): Json<CreatePixRequest>,
) -> Result<Json<CreatePixResponse>, ApiError> {
    let initiator = initiator(&state)?;

    let contact = payload.customer.validate_contact().map_err(checkout_error)?;
    let plan = state.catalog.lookup(&payload.plan_id);
    let selected = SelectedPlan {
        amount_cents: payload.amount,
        ..SelectedPlan::from_plan(plan)
    };

    let mut request = PaymentRequest::new(&selected, contact);
    if let Some(tracking) = payload.tracking {
        request = request.with_tracking(tracking);
    }

    let record = initiator.initiate(&request).await.map_err(checkout_error)?;
    Ok(Json(record.into()))
}

/// Single status read
pub async fn pix_status(
    State(state): State<AppState>,
    Json(payload): Json<PixStatusRequest>,
) -> Result<Json<TransactionStatus>, ApiError> {
    let initiator = initiator(&state)?;

    let transaction_id = payload
        .transaction_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            api_error(StatusCode::BAD_REQUEST, "MISSING_TRANSACTION_ID", "ID da transação não fornecido")
        })?;

    initiator
        .check_status(&transaction_id)
        .await
        .map(Json)
        .map_err(checkout_error)
}

// ============================================================================
// Age gate, profile, navigation
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub brand: String,
    pub plans: Vec<PlanView>,
}

#[derive(Debug, Serialize)]
pub struct BackNavigationResponse {
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub guard_depth: u8,
}

/// Record the age confirmation and send the buyer to the content page
pub async fn confirm_age(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let location = state.age_gate.confirm_location(query.as_deref().unwrap_or_default());
    (
        [(header::SET_COOKIE, AgeGate::verified_cookie())],
        Json(LocationResponse { location }),
    )
}

pub async fn deny_age(State(state): State<AppState>) -> Json<LocationResponse> {
    Json(LocationResponse {
        location: state.age_gate.deny_location().to_string(),
    })
}

/// Content page data, behind the age gate
pub async fn profile(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    if let Some(gate) = state.age_gate.guard(cookie) {
        return Redirect::temporary(gate).into_response();
    }

    let Json(plans) = list_plans(State(state.clone())).await;
    Json(ProfileResponse {
        brand: state.brand.clone(),
        plans,
    })
    .into_response()
}

/// Where the browser's back button should lead
pub async fn back_navigation(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Json<BackNavigationResponse> {
    let decision = state.navigation.on_back(query.as_deref().unwrap_or_default());
    let (action, location) = match decision {
        NavigationDecision::Redirect(location) => ("redirect", Some(location)),
        NavigationDecision::Allow => ("allow", None),
    };

    Json(BackNavigationResponse {
        action,
        location,
        guard_depth: state.navigation.guard_depth,
    })
}
