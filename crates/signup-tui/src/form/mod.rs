mod avatar;
mod binder;
mod field;

pub use avatar::*;
pub use binder::{Binder, ValidationSummary};
pub use field::{Checkbox, HasValue, TextField};
