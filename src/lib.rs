//! EduMaster Access - purchase-to-access pipeline
//!
//! Takes a learner from buying a course to having access to it: payment
//! intents against the gateway, idempotent reconciliation of gateway
//! webhooks, enrollment, and learning progress.

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod ports;
