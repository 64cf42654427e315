//! Enrollment configuration

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentConfig {
    /// Reload-and-retry bound for compare-and-set conflicts on progress
    /// and payment record updates.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

impl EnrollmentConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_conflict_retries == 0 {
            return Err(ValidationError::InvalidRetry("max_conflict_retries must be at least 1"));
        }
        Ok(())
    }
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

fn default_max_conflict_retries() -> u32 {
    5
}
