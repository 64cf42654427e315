//! Payment domain - one record per attempt to buy a course.

mod errors;
mod gateway_event;
mod record;
mod status;

pub use errors::PaymentError;
pub use gateway_event::{GatewayEvent, GatewayEventKind, GatewayRefund};
pub use record::{PaymentRecord, PaymentTransition, RefundEntry, TransitionOutcome};
pub use status::PaymentStatus;
