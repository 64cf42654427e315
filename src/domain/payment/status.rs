//! Payment status state machine.
//!
//! ```text
//! PENDING ──► SUCCEEDED ──► REFUNDED
//!    │
//!    ├──────► FAILED
//!    └──────► CANCELED
//! ```

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a single payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Intent created at the gateway, not yet settled.
    Pending,

    /// Charge captured. Partial refunds keep this status.
    Succeeded,

    /// Declined or otherwise failed at the gateway.
    Failed,

    /// Abandoned before settlement.
    Canceled,

    /// Fully refunded.
    Refunded,
}

impl PaymentStatus {
    /// Database / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// True when money was captured for this attempt (even if later refunded).
    pub fn was_captured(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::Refunded)
    }
}

impl StateMachine for PaymentStatus {
    fn successors(&self) -> &'static [Self] {
        use PaymentStatus::*;
        match self {
            Pending => &[Succeeded, Failed, Canceled],
            Succeeded => &[Refunded],
            Failed | Canceled | Refunded => &[],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "failed" => Ok(PaymentStatus::Failed),
            "canceled" => Ok(PaymentStatus::Canceled),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status '{}'", other)),
        }
    }
}
