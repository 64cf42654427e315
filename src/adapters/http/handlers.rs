//! HTTP handlers connecting axum routes to the application services.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::application::{
    ConfirmPaymentCommand, CreateIntentCommand, EnrollCommand, RecordLessonProgressCommand,
    RefundPaymentCommand, UpdateProgressCommand,
};
use crate::domain::enrollment::{Enrollment, EnrollmentError};
use crate::domain::foundation::{CourseId, EnrollmentId, ErrorCode, IntentId, LessonId, PaymentId, UserId};

use super::caller::Caller;
use super::dto::{
    AccessResponse, ConfirmPaymentRequest, CreateIntentRequest, EnrollRequest,
    EnrollmentListResponse, EnrollmentResponse, IntentResponse, LessonProgressRequest,
    PaymentListResponse, PaymentResponse, RefundPaymentRequest, UpdateProgressRequest, WebhookAck,
};
use super::error::{ApiError, ErrorResponse};
use super::state::AppState;

const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Payments
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments/intents
pub async fn create_intent(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Json(request): Json<CreateIntentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state
        .payments
        .create_intent(CreateIntentCommand {
            user_id,
            course_id: request.course_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(IntentResponse::from(handle))))
}

/// POST /api/payments/confirm
pub async fn confirm_payment(
    State(state): State<AppState>,
    Caller(_user_id): Caller,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let intent_id = IntentId::new(request.intent_id)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let record = state
        .payments
        .confirm(ConfirmPaymentCommand {
            intent_id,
            payment_method: request.payment_method,
        })
        .await?;

    Ok(Json(PaymentResponse::from(record)))
}

/// POST /api/payments/{id}/refund
pub async fn refund_payment(
    State(state): State<AppState>,
    Caller(_user_id): Caller,
    Path(payment_id): Path<PaymentId>,
    Json(request): Json<RefundPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .payments
        .refund(RefundPaymentCommand {
            payment_id,
            amount: request.amount,
            reason: request.reason,
        })
        .await?;

    Ok(Json(PaymentResponse::from(record)))
}

/// GET /api/payments
pub async fn list_payments(
    State(state): State<AppState>,
    Caller(user_id): Caller,
) -> Result<impl IntoResponse, ApiError> {
    let payments = state.payments.payments_for_user(&user_id).await?;

    Ok(Json(PaymentListResponse {
        payments: payments.into_iter().map(PaymentResponse::from).collect(),
    }))
}

/// POST /api/webhooks/stripe
///
/// Answers 400 only when the signature does not verify. Once it does, the
/// event is reconciled and acknowledged with 200 whatever the outcome, so
/// the gateway stops redelivering; failures land in the dead-letter log.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                ErrorCode::ValidationFailed.to_string(),
                "Missing Stripe-Signature header",
            )),
        )
            .into_response();
    };

    let event = match state.webhook_verifier.verify(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected webhook delivery");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("INVALID_WEBHOOK_SIGNATURE", e.to_string())),
            )
                .into_response();
        }
    };

    let outcome = state.reconciler.handle(event).await;

    (
        StatusCode::OK,
        Json(WebhookAck {
            received: true,
            outcome: outcome.as_str().to_string(),
        }),
    )
        .into_response()
}

// ════════════════════════════════════════════════════════════════════════════════
// Enrollments
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/enrollments
pub async fn enroll(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Json(request): Json<EnrollRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .enrollments
        .enroll(EnrollCommand {
            user_id,
            course_id: request.course_id,
        })
        .await?;

    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(EnrollmentResponse::from(result.enrollment))))
}

/// GET /api/enrollments
pub async fn list_enrollments(
    State(state): State<AppState>,
    Caller(user_id): Caller,
) -> Result<impl IntoResponse, ApiError> {
    let enrollments = state.enrollments.enrollments_for_user(&user_id).await?;

    Ok(Json(EnrollmentListResponse {
        enrollments: enrollments.into_iter().map(EnrollmentResponse::from).collect(),
    }))
}

/// PUT /api/enrollments/{id}/progress
pub async fn update_progress(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(enrollment_id): Path<EnrollmentId>,
    Json(request): Json<UpdateProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    owned_enrollment(&state, &user_id, &enrollment_id).await?;

    let enrollment = state
        .enrollments
        .update_progress(UpdateProgressCommand {
            enrollment_id,
            percentage: request.percentage,
        })
        .await?;

    Ok(Json(EnrollmentResponse::from(enrollment)))
}

/// PUT /api/enrollments/{id}/lessons/{lesson_id}
pub async fn record_lesson_progress(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path((enrollment_id, lesson_id)): Path<(EnrollmentId, LessonId)>,
    Json(request): Json<LessonProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    owned_enrollment(&state, &user_id, &enrollment_id).await?;

    let enrollment = state
        .enrollments
        .record_lesson_progress(RecordLessonProgressCommand {
            enrollment_id,
            lesson_id,
            watch_seconds: request.watch_seconds,
            completed: request.completed,
        })
        .await?;

    Ok(Json(EnrollmentResponse::from(enrollment)))
}

/// GET /api/courses/{id}/access
pub async fn course_access(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(course_id): Path<CourseId>,
) -> Result<impl IntoResponse, ApiError> {
    let can_access = state.enrollments.can_access(&user_id, &course_id).await?;
    Ok(Json(AccessResponse { can_access }))
}

/// Someone else's enrollment reads as not found.
async fn owned_enrollment(
    state: &AppState,
    user_id: &UserId,
    enrollment_id: &EnrollmentId,
) -> Result<Enrollment, ApiError> {
    let enrollment = state.enrollments.find(enrollment_id).await?;
    if &enrollment.user_id != user_id {
        return Err(EnrollmentError::NotFound(*enrollment_id).into());
    }
    Ok(enrollment)
}
