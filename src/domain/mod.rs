//! Domain layer - pure business logic, no I/O.

pub mod course;
pub mod enrollment;
pub mod foundation;
pub mod payment;
