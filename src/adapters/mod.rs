//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application core to external systems:
//! - `memory` - In-process stores for tests and local runs
//! - `postgres` - sqlx-backed repositories
//! - `stripe` - Payment gateway client and webhook verification
//! - `notification` - Notification sink
//! - `http` - axum REST API

pub mod http;
pub mod memory;
pub mod notification;
pub mod postgres;
pub mod stripe;
