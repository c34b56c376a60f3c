pub mod models;
pub mod service;
pub mod validation;

pub use models::*;
pub use service::{InMemoryUserDetailsService, ServiceError, UserDetailsService};
