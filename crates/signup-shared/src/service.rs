//! Backend for the signup form.
//!
//! There is no real storage behind it: [`InMemoryUserDetailsService`] fails
//! the first submission of every handle so the form's retry path gets
//! exercised.

use std::sync::Mutex;

use crate::models::UserDetails;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Transient(String),
    #[error("Backend state is unavailable")]
    Unavailable,
}

pub trait UserDetailsService: Send + Sync {
    /// Stores the record.
    fn store(&self, details: &UserDetails) -> Result<(), ServiceError>;

    /// Returns `None` if the handle is acceptable, otherwise a message.
    fn validate_handle(&self, handle: &str) -> Option<String>;
}

pub const SIMULATED_FAILURE_MESSAGE: &str = "This exception simulates an error in the backend, and is intentional. Please try to submit the form again.";

#[derive(Debug, Default)]
pub struct InMemoryUserDetailsService {
    previous_handle: Mutex<Option<String>>,
}

impl InMemoryUserDetailsService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserDetailsService for InMemoryUserDetailsService {
    fn store(&self, details: &UserDetails) -> Result<(), ServiceError> {
        let mut previous = self
            .previous_handle
            .lock()
            .map_err(|_| ServiceError::Unavailable)?;

        if previous.as_deref() != Some(details.handle.as_str()) {
            *previous = Some(details.handle.clone());
            tracing::warn!(handle = %details.handle, "Simulating backend failure");
            return Err(ServiceError::Transient(
                SIMULATED_FAILURE_MESSAGE.to_string(),
            ));
        }

        tracing::info!(handle = %details.handle, "Stored user details");
        Ok(())
    }

    fn validate_handle(&self, handle: &str) -> Option<String> {
        validation::validate_handle(handle)
    }
}
