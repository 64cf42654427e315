//! HTTP adapter - REST API over the purchase-to-access services.
//!
//! - `POST /api/payments/intents` - Create a payment intent
//! - `POST /api/payments/confirm` - Confirm an intent
//! - `POST /api/payments/:id/refund` - Refund a payment
//! - `GET /api/payments` - Caller's payments
//! - `POST /api/webhooks/stripe` - Gateway webhook deliveries
//! - `POST /api/enrollments` - Enroll in a course
//! - `GET /api/enrollments` - Caller's enrollments
//! - `PUT /api/enrollments/:id/progress` - Set progress percentage
//! - `PUT /api/enrollments/:id/lessons/:lesson_id` - Record lesson progress
//! - `GET /api/courses/:id/access` - Access check

mod caller;
pub mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use caller::{Caller, USER_ID_HEADER};
pub use error::{status_for, ApiError, ErrorResponse};
pub use routes::{api_router, enrollment_routes, payment_routes, webhook_routes, with_middleware};
pub use state::AppState;
