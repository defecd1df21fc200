//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{
    back_navigation, close_checkout, confirm_age, create_pix, deny_age, dismiss_notice,
    get_checkout, get_upsell, health_check, list_plans, open_checkout, pix_status, profile,
    select_plan, submit_checkout,
};
use crate::state::AppState;

/// API routes, without the static front end
pub fn api(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(health_check))

        // Plans & upsell
        .route("/api/plans", get(list_plans))
        .route("/api/plans/{id}/upsell", get(get_upsell))
        .route("/api/plans/{id}/select", post(select_plan))

        // Checkout sessions
        .route("/api/checkout", post(open_checkout))
        .route("/api/checkout/{id}", get(get_checkout).delete(close_checkout))
        .route("/api/checkout/{id}/submit", post(submit_checkout))
        .route("/api/checkout/{id}/dismiss", post(dismiss_notice))

        // PIX pass-through
        .route("/api/pix", post(create_pix))
        .route("/api/pix/status", post(pix_status))

        // Age gate & funnel navigation
        .route("/api/age/confirm", post(confirm_age))
        .route("/api/age/deny", post(deny_age))
        .route("/api/profile", get(profile))
        .route("/api/navigation/back", get(back_navigation))

        .with_state(state)
}

/// Full application: API, static front end, CORS and request tracing
pub fn app(state: AppState, static_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use checkout_core::{
        AgeGate, Clock, InitiatorConfig, ManualClock, MockProvider, NavigationPolicy,
        PaymentInitiator, PaymentStatus, PlanCatalog, SessionConfig, UpsellNegotiator,
    };

    use super::*;
    use crate::state::{SessionExpiry, SessionRegistry};

    fn state_with(provider: Option<Arc<MockProvider>>) -> AppState {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        AppState {
            catalog: Arc::new(PlanCatalog::standard()),
            upsells: Arc::new(UpsellNegotiator::standard()),
            initiator: provider.map(|p| {
                PaymentInitiator::new(p, clock.clone(), InitiatorConfig::default())
            }),
            session_config: SessionConfig::default(),
            sessions: Arc::new(SessionRegistry::new(clock.clone(), SessionExpiry::default())),
            clock,
            navigation: Arc::new(NavigationPolicy::default()),
            age_gate: Arc::new(AgeGate::default()),
            brand: "Anitta Privacy".into(),
        }
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn form() -> Value {
        json!({
            "name": "Maria Souza",
            "email": "maria@example.com",
            "phone": "(11) 98765-4321",
            "document": "529.982.247-25"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(api(state_with(None)), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["payments_configured"], false);
    }

    #[tokio::test]
    async fn test_plans_listing() {
        let (status, body) = send(api(state_with(None)), "GET", "/api/plans", None).await;
        assert_eq!(status, StatusCode::OK);

        let plans = body.as_array().unwrap();
        assert_eq!(plans.len(), 4);
        assert_eq!(plans[0]["id"], "30dias");
        assert_eq!(plans[0]["default"], true);
        assert_eq!(plans[1]["display_price"], "R$ 24,90");
        assert!(plans[3].get("upsell").is_none());
    }

    #[tokio::test]
    async fn test_upsell_lookup() {
        let state = state_with(None);

        let (status, body) = send(api(state.clone()), "GET", "/api/plans/30dias/upsell", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["target_plan_id"], "3meses");
        assert_eq!(body["price_cents"], 1990);
        assert_eq!(body["savings_cents"], 500);

        let (status, body) = send(api(state), "GET", "/api/plans/vitalicio/upsell", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NO_OFFER");
    }

    #[tokio::test]
    async fn test_select_with_and_without_upsell() {
        let state = state_with(None);

        let (_, body) = send(
            api(state.clone()),
            "POST",
            "/api/plans/30dias/select",
            Some(json!({ "accept_upsell": true })),
        )
        .await;
        assert_eq!(body["plan"]["plan_id"], "3meses");
        assert_eq!(body["plan"]["amount_cents"], 1990);
        assert_eq!(body["checkout_url"], "/checkout?plan=3meses&promo=1990");

        let (_, body) = send(api(state), "POST", "/api/plans/3meses/select", None).await;
        assert_eq!(body["plan"]["plan_name"], "3 meses");
        assert_eq!(body["plan"]["amount_cents"], 2490);
    }

    #[tokio::test]
    async fn test_checkout_flow() {
        let provider = Arc::new(MockProvider::with_statuses([PaymentStatus::Pending]));
        let state = state_with(Some(provider.clone()));

        let (status, opened) = send(
            api(state.clone()),
            "POST",
            "/api/checkout",
            Some(json!({ "query": "plan=3meses&utm_source=ig" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(opened["view"]["step"], "collecting-info");
        assert_eq!(opened["countdown"]["remaining_secs"], 480);

        let id = opened["session_id"].as_str().unwrap().to_string();

        let (status, submitted) = send(
            api(state.clone()),
            "POST",
            &format!("/api/checkout/{id}/submit"),
            Some(form()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(submitted["view"]["step"], "awaiting-payment");
        assert_eq!(submitted["view"]["record"]["amount_cents"], 2490);
        assert_eq!(provider.created()[0].tracking.as_ref().unwrap().utm_source.as_deref(), Some("ig"));

        let (status, again) = send(
            api(state.clone()),
            "POST",
            &format!("/api/checkout/{id}/submit"),
            Some(form()),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(again["code"], "INVALID_TRANSITION");

        let (status, _) = send(api(state.clone()), "DELETE", &format!("/api/checkout/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(api(state), "GET", &format!("/api/checkout/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_accepted_upsell_charges_offer_price() {
        let provider = Arc::new(MockProvider::new());
        let state = state_with(Some(provider.clone()));

        let (_, selected) = send(
            api(state.clone()),
            "POST",
            "/api/plans/30dias/select",
            Some(json!({ "accept_upsell": true })),
        )
        .await;
        let checkout_url = selected["checkout_url"].as_str().unwrap();
        let (path, query) = checkout_url.split_once('?').unwrap();
        assert_eq!(path, "/checkout");

        let (status, opened) = send(
            api(state.clone()),
            "POST",
            "/api/checkout",
            Some(json!({ "query": query })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(opened["plan"]["plan_id"], "3meses");
        assert_eq!(opened["plan"]["amount_cents"], 1990);

        let id = opened["session_id"].as_str().unwrap().to_string();
        let (status, submitted) = send(
            api(state),
            "POST",
            &format!("/api/checkout/{id}/submit"),
            Some(form()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(submitted["view"]["record"]["amount_cents"], 1990);

        let sent = provider.created();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].amount_cents, 1990);
        assert_eq!(sent[0].description, "Assinatura Anitta Privacy - 3 meses");
    }

    #[tokio::test]
    async fn test_submit_validation_errors() {
        let state = state_with(Some(Arc::new(MockProvider::new())));
        let (_, opened) = send(api(state.clone()), "POST", "/api/checkout", None).await;
        let id = opened["session_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            api(state),
            "POST",
            &format!("/api/checkout/{id}/submit"),
            Some(json!({ "email": "nope", "phone": "123", "document": "111.111.111-11" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["fields"]["name"], "Informe seu nome completo");
        assert_eq!(body["fields"]["email"], "E-mail inválido");
        assert_eq!(body["fields"]["document"], "CPF inválido");
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_notice() {
        let provider = Arc::new(MockProvider::new());
        provider.fail_next_create("HTTP 500");
        let state = state_with(Some(provider));

        let (_, opened) = send(api(state.clone()), "POST", "/api/checkout", None).await;
        let id = opened["session_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            api(state.clone()),
            "POST",
            &format!("/api/checkout/{id}/submit"),
            Some(form()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "PROVIDER_ERROR");

        let (_, snapshot) = send(api(state.clone()), "GET", &format!("/api/checkout/{id}"), None).await;
        assert_eq!(snapshot["view"]["notice"]["title"], "Erro ao gerar PIX");
        assert_eq!(snapshot["view"]["submitting"], false);

        let (_, snapshot) = send(api(state), "POST", &format!("/api/checkout/{id}/dismiss"), None).await;
        assert!(snapshot["view"]["notice"].is_null());
    }

    #[tokio::test]
    async fn test_payments_disabled() {
        let state = state_with(None);

        let (status, body) = send(api(state.clone()), "POST", "/api/checkout", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "PAYMENTS_DISABLED");

        let (status, _) = send(
            api(state),
            "POST",
            "/api/pix/status",
            Some(json!({ "transaction_id": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_pix_pass_through() {
        let provider = Arc::new(MockProvider::with_statuses([PaymentStatus::Approved]));
        let state = state_with(Some(provider.clone()));

        let (status, created) = send(
            api(state.clone()),
            "POST",
            "/api/pix",
            Some(json!({
                "planId": "1ano",
                "amount": 4790,
                "customer": { "email": "ana@example.com", "phone": "11912345678", "document": "52998224725" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["success"], true);
        assert_eq!(created["amount"], 4790);
        assert_eq!(provider.created()[0].description, "Assinatura Anitta Privacy - 1 ano");

        let (status, body) = send(
            api(state.clone()),
            "POST",
            "/api/pix/status",
            Some(json!({ "transaction_id": created["transaction_id"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "approved");

        let (status, body) = send(api(state), "POST", "/api/pix/status", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MISSING_TRANSACTION_ID");
    }

    #[tokio::test]
    async fn test_pix_accepts_contact_without_cpf() {
        let provider = Arc::new(MockProvider::new());
        let state = state_with(Some(provider.clone()));

        for customer in [
            json!({ "email": "ana@example.com", "phone": "(11) 91234-5678", "document": "00000000000" }),
            json!({ "email": "ana@example.com", "phone": "11912345678" }),
        ] {
            let (status, created) = send(
                api(state.clone()),
                "POST",
                "/api/pix",
                Some(json!({
                    "planId": "3meses",
                    "planName": "3 meses",
                    "amount": 2490,
                    "customer": customer
                })),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{created}");
            assert_eq!(created["success"], true);
        }

        let sent = provider.created();
        assert_eq!(sent.len(), 2);
        for request in &sent {
            assert_eq!(request.customer.name, "ana");
            assert_eq!(request.customer.phone, "11912345678");
            assert!(checkout_core::customer::is_valid_cpf(&request.customer.document));
        }

        let (status, body) = send(
            api(state),
            "POST",
            "/api/pix",
            Some(json!({ "planId": "3meses", "amount": 2490, "customer": { "email": "ana@example.com" } })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"]["phone"], "Informe seu telefone");
        assert_eq!(provider.created().len(), 2);
    }

    #[tokio::test]
    async fn test_age_gate_and_profile() {
        let state = state_with(None);

        let response = api(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/age/confirm?utm_source=tt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(cookie.starts_with("age_verified=true"));
        let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["location"], "/privacy?utm_source=tt");

        let blocked = api(state.clone())
            .oneshot(Request::builder().uri("/api/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(blocked.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(blocked.headers()[header::LOCATION], "/");

        let allowed = api(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/profile")
                    .header(header::COOKIE, "age_verified=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);

        let (_, denied) = send(api(state), "POST", "/api/age/deny", None).await;
        assert_eq!(denied["location"], "https://www.google.com");
    }

    #[tokio::test]
    async fn test_back_navigation() {
        let (status, body) = send(
            api(state_with(None)),
            "GET",
            "/api/navigation/back?plan=1ano",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "redirect");
        assert_eq!(body["location"], "/oferta-especial?plan=1ano");
        assert_eq!(body["guard_depth"], 3);
    }
}
