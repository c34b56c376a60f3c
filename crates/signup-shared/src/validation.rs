//! Validation rules for signup data.
//!
//! Every rule is a plain function (or a small stateful struct) returning
//! `Ok(())` or the message to show next to the field.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::UserDetails;

pub type ValidationResult = Result<(), String>;

pub const FIRSTNAME_LENGTH: (usize, usize) = (1, 32);
pub const LASTNAME_LENGTH: (usize, usize) = (1, 32);
pub const HANDLE_LENGTH: (usize, usize) = (4, 64);
pub const PASSWORD_LENGTH: (usize, usize) = (8, 64);

/// Handles nobody may sign up with. Matched case-sensitively.
pub const RESERVED_HANDLES: [&str; 4] = ["admin", "test", "null", "void"];

pub const INVALID_EMAIL_MESSAGE: &str = "Value is not a valid email address";
pub const PASSWORD_TOO_SHORT_MESSAGE: &str = "Password should be at least 8 characters long";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Passwords do not match";

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9_.+\-]+@[a-zA-Z0-9\-.]+\.[a-zA-Z0-9\-]{2,}$";

/// `None` only if [`EMAIL_PATTERN`] fails to compile, in which case every
/// address is rejected and the error is logged once.
fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(EMAIL_PATTERN)
                .map_err(|e| tracing::error!(error = %e, "Email pattern does not compile"))
                .ok()
        })
        .as_ref()
}

/// Inclusive character-length range check.
pub fn length(value: &str, (min, max): (usize, usize)) -> ValidationResult {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(format!("Length must be between {} and {}", min, max));
    }
    Ok(())
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(value))
}

pub fn email(value: &str) -> ValidationResult {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(INVALID_EMAIL_MESSAGE.to_string())
    }
}

/// Email check that only applies while the user accepts marketing mail.
pub fn email_when_marketing(value: &str, allows_marketing: bool) -> ValidationResult {
    if !allows_marketing {
        return Ok(());
    }
    email(value)
}

/// Returns `None` when the handle can be used, otherwise the reason why not.
pub fn validate_handle(handle: &str) -> Option<String> {
    if handle.is_empty() {
        return Some("Handle can't be empty".to_string());
    }
    if handle.chars().count() < HANDLE_LENGTH.0 {
        return Some("Handle can't be shorter than 4 characters".to_string());
    }
    if RESERVED_HANDLES.contains(&handle) {
        return Some(format!("'{}' is not available as a handle", handle));
    }
    None
}

/// Password length and confirmation check.
///
/// The first evaluation of a long enough password passes without looking at
/// the confirmation, so the user isn't told about a mismatch before typing
/// it. After that (or once [`PasswordRule::arm`] is called) the two values
/// must match.
#[derive(Debug, Clone, Default)]
pub struct PasswordRule {
    armed: bool,
}

impl PasswordRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn check(&mut self, password: &str, confirmation: &str) -> ValidationResult {
        if password.chars().count() < PASSWORD_LENGTH.0 {
            return Err(PASSWORD_TOO_SHORT_MESSAGE.to_string());
        }

        if !self.armed {
            self.armed = true;
            return Ok(());
        }

        if password == confirmation {
            Ok(())
        } else {
            Err(PASSWORD_MISMATCH_MESSAGE.to_string())
        }
    }
}

/// A violated record-level constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub property: &'static str,
    pub message: String,
}

impl ConstraintViolation {
    fn new(property: &'static str, message: String) -> Self {
        Self { property, message }
    }
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.property, self.message)
    }
}

impl UserDetails {
    /// Checks the declarative constraints of the whole record.
    pub fn violations(&self) -> Vec<ConstraintViolation> {
        let checks = [
            ("firstname", length(&self.firstname, FIRSTNAME_LENGTH)),
            ("lastname", length(&self.lastname, LASTNAME_LENGTH)),
            ("handle", length(&self.handle, HANDLE_LENGTH)),
            ("password", length(&self.password, PASSWORD_LENGTH)),
            (
                "email",
                email_when_marketing(&self.email, self.allows_marketing),
            ),
        ];

        let mut violations: Vec<ConstraintViolation> = checks
            .into_iter()
            .filter_map(|(property, result)| {
                result.err().map(|msg| ConstraintViolation::new(property, msg))
            })
            .collect();

        if let Some(msg) = validate_handle(&self.handle) {
            if !violations.iter().any(|v| v.property == "handle") {
                violations.push(ConstraintViolation::new("handle", msg));
            }
        }

        violations
    }

    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }
}
