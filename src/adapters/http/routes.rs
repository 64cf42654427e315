//! Axum router configuration.

use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    confirm_payment, course_access, create_intent, enroll, list_enrollments, list_payments,
    record_lesson_progress, refund_payment, stripe_webhook, update_progress,
};
use super::state::AppState;

/// Payment routes, mounted at `/api/payments`.
///
/// - `POST /intents` - Create a payment intent for a course
/// - `POST /confirm` - Confirm an intent with a payment method
/// - `POST /:id/refund` - Refund part or all of a payment
/// - `GET /` - Payments of the caller
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments))
        .route("/intents", post(create_intent))
        .route("/confirm", post(confirm_payment))
        .route("/:id/refund", post(refund_payment))
}

/// Enrollment routes, mounted at `/api/enrollments`.
pub fn enrollment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_enrollments).post(enroll))
        .route("/:id/progress", put(update_progress))
        .route("/:id/lessons/:lesson_id", put(record_lesson_progress))
}

/// Webhook routes. No caller identity; the signature authenticates.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// Complete `/api` router with state applied.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .nest("/payments", payment_routes())
                .nest("/enrollments", enrollment_routes())
                .nest("/webhooks", webhook_routes())
                .route("/courses/:id/access", get(course_access)),
        )
        .with_state(state)
}

/// Wraps the router with request ids, tracing and a request timeout.
pub fn with_middleware(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
