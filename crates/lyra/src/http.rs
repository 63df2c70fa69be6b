//! Axum HTTP handlers for the lyra server.
//!
//! - browser return (GET/POST): always redirects to the status page
//! - IPN (POST): always `200 text/plain` with a short acknowledgment
//! - checkout (POST JSON): signed payment form
//! - health

use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, Form, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use lyra_checkout::{CheckoutError, CheckoutOrder};
use lyra_core::FieldSet;
use lyra_notify::Acknowledgment;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{start_checkout, AppState, RootError};

/// Build the Axum router with all endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;
    Router::new()
        .route(
            &server.return_path,
            get(handle_return).post(handle_return),
        )
        .route(&server.notify_path, post(handle_ipn))
        .route(&server.checkout_path, post(handle_checkout))
        .route("/health", get(handle_health))
        .with_state(state.clone())
}

/// GET|POST return -- process what the browser brought back, then redirect.
async fn handle_return(
    State(state): State<Arc<AppState>>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Redirect {
    match form {
        Ok(Form(raw)) => {
            let raw = FieldSet::from(raw);
            let processed = state.notifications.handle_return(&raw);
            debug!(processed = ?processed, "return handled");
        }
        Err(e) => warn!(error = %e, "unreadable return payload"),
    }
    Redirect::to(&state.config.server.status_path)
}

/// POST IPN -- plain-text acknowledgment, never an HTTP error.
async fn handle_ipn(
    State(state): State<Arc<AppState>>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> &'static str {
    let ack = match form {
        Ok(Form(raw)) => state.notifications.handle_ipn(&FieldSet::from(raw)),
        Err(e) => {
            warn!(error = %e, "unreadable IPN payload");
            Acknowledgment::BadRequest
        }
    };
    ack.as_str()
}

/// POST checkout -- signed form for the gateway payment page.
async fn handle_checkout(
    State(state): State<Arc<AppState>>,
    order: Result<Json<CheckoutOrder>, JsonRejection>,
) -> Response {
    let Json(order) = match order {
        Ok(order) => order,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };

    match start_checkout(&state, &order) {
        Ok(form) => (StatusCode::OK, Json(form)).into_response(),
        Err(e) => {
            warn!(reference = %order.reference, error = %e, "checkout refused");
            error_response(checkout_status(&e), e.to_string())
        }
    }
}

fn checkout_status(err: &RootError) -> StatusCode {
    match err {
        RootError::Checkout(CheckoutError::UnsupportedCurrency(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RootError::Checkout(
            CheckoutError::InvalidAmount(_)
            | CheckoutError::InvalidReference
            | CheckoutError::InstallmentsNotConfigured,
        ) => StatusCode::BAD_REQUEST,
        RootError::AlreadyPaid(_) | RootError::ReferenceCollision { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// GET /health -- server info
async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "mode": state.provider.mode.to_string(),
        "site_id": state.provider.site_id.clone(),
        "notify_url": state.config.server.notify_url(),
    }))
}
