//! Binds form fields to the properties of a record.
//!
//! A [`Binder`] never owns the form: every call receives the current form
//! state `F`, so validators always see the values and visibility flags of
//! the moment they run. The record type `B` is only touched by
//! [`Binder::write_bean`] and read by [`Binder::read_bean`].

use std::fmt;

use signup_shared::validation::ValidationResult;

use super::field::HasValue;

type FieldValidator<V, F> = Box<dyn FnMut(&V, &F) -> ValidationResult>;
type RecordValidator<B> = Box<dyn Fn(&B) -> ValidationResult>;

/// A field whose validation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub property: &'static str,
    pub message: String,
}

/// Outcome of running every validator of a binder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub field_errors: Vec<FieldError>,
    pub record_errors: Vec<String>,
}

impl ValidationSummary {
    pub fn is_ok(&self) -> bool {
        self.field_errors.is_empty() && self.record_errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.is_ok()
    }

    pub fn error_count(&self) -> usize {
        self.field_errors.len() + self.record_errors.len()
    }

    pub fn field_error(&self, property: &str) -> Option<&str> {
        self.field_errors
            .iter()
            .find(|e| e.property == property)
            .map(|e| e.message.as_str())
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.error_count())?;
        for e in &self.field_errors {
            write!(f, "; {}: {}", e.property, e.message)?;
        }
        for e in &self.record_errors {
            write!(f, "; {}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationSummary {}

struct Required<F> {
    message: String,
    when: Option<fn(&F) -> bool>,
}

trait Binding<F, B> {
    fn property(&self) -> &'static str;

    /// Runs the validators and flags the field. Returns the error, if any.
    fn validate(&mut self, form: &mut F) -> Option<String>;

    fn write(&self, form: &mut F, bean: &mut B);

    fn read(&self, bean: &B, form: &mut F);
}

struct FieldBinding<F, B, H: HasValue> {
    property: &'static str,
    field: fn(&mut F) -> &mut H,
    required: Option<Required<F>>,
    validators: Vec<FieldValidator<H::Value, F>>,
    read: fn(&B) -> H::Value,
    write: fn(&mut B, H::Value),
}

impl<F, B, H: HasValue> FieldBinding<F, B, H> {
    fn check(&mut self, value: &H::Value, is_empty: bool, form: &F) -> ValidationResult {
        if let Some(required) = &self.required {
            let applies = required.when.map_or(true, |when| when(form));
            if applies && is_empty {
                return Err(required.message.clone());
            }
        }

        for validator in &mut self.validators {
            validator(value, form)?;
        }

        Ok(())
    }
}

impl<F, B, H: HasValue> Binding<F, B> for FieldBinding<F, B, H> {
    fn property(&self) -> &'static str {
        self.property
    }

    fn validate(&mut self, form: &mut F) -> Option<String> {
        let field = (self.field)(form);
        let value = field.value();
        let is_empty = field.is_empty();

        let error = self.check(&value, is_empty, form).err();
        (self.field)(form).set_error(error.clone());
        error
    }

    fn write(&self, form: &mut F, bean: &mut B) {
        let value = (self.field)(form).value();
        (self.write)(bean, value);
    }

    fn read(&self, bean: &B, form: &mut F) {
        let field = (self.field)(form);
        field.set_value((self.read)(bean));
        field.set_error(None);
    }
}

/// Configures one binding; finish with [`BindingBuilder::bind`].
pub struct BindingBuilder<'a, F, B, H: HasValue> {
    binder: &'a mut Binder<F, B>,
    field: fn(&mut F) -> &mut H,
    required: Option<Required<F>>,
    validators: Vec<FieldValidator<H::Value, F>>,
}

impl<'a, F: 'static, B: 'static, H: HasValue + 'static> BindingBuilder<'a, F, B, H> {
    /// Fails with `message` whenever the field holds its empty value.
    /// Checked before any other validator.
    pub fn as_required(mut self, message: impl Into<String>) -> Self {
        self.required = Some(Required {
            message: message.into(),
            when: None,
        });
        self
    }

    /// Like [`as_required`](Self::as_required), but only while `when`
    /// holds for the form at validation time.
    pub fn as_required_when(mut self, message: impl Into<String>, when: fn(&F) -> bool) -> Self {
        self.required = Some(Required {
            message: message.into(),
            when: Some(when),
        });
        self
    }

    pub fn with_validator(
        mut self,
        validator: impl FnMut(&H::Value, &F) -> ValidationResult + 'static,
    ) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn bind(
        self,
        property: &'static str,
        read: fn(&B) -> H::Value,
        write: fn(&mut B, H::Value),
    ) {
        self.binder.bindings.push(Box::new(FieldBinding {
            property,
            field: self.field,
            required: self.required,
            validators: self.validators,
            read,
            write,
        }));
    }
}

pub struct Binder<F, B> {
    bindings: Vec<Box<dyn Binding<F, B>>>,
    record_validators: Vec<RecordValidator<B>>,
    status: Option<String>,
}

impl<F: 'static, B: Clone + Default + 'static> Binder<F, B> {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            record_validators: Vec::new(),
            status: None,
        }
    }

    pub fn for_field<H: HasValue + 'static>(
        &mut self,
        field: fn(&mut F) -> &mut H,
    ) -> BindingBuilder<'_, F, B, H> {
        BindingBuilder {
            binder: self,
            field,
            required: None,
            validators: Vec::new(),
        }
    }

    /// Adds a validator over the whole record. Record validators only run
    /// once every field is valid, and report into the status label.
    pub fn with_record_validator(&mut self, validator: impl Fn(&B) -> ValidationResult + 'static) {
        self.record_validators.push(Box::new(validator));
    }

    pub fn properties(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(|b| b.property())
    }

    /// Text of the shared status label.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: Option<String>) {
        self.status = status;
    }

    /// Re-runs a single binding, as a value change would.
    pub fn validate_field(&mut self, form: &mut F, property: &str) -> Option<String> {
        self.bindings
            .iter_mut()
            .find(|b| b.property() == property)
            .and_then(|b| b.validate(form))
    }

    pub fn validate(&mut self, form: &mut F) -> ValidationSummary {
        self.run(form, B::default()).0
    }

    /// Validates and, only if everything passes, copies every bound value
    /// into `target`.
    pub fn write_bean(&mut self, form: &mut F, target: &mut B) -> Result<(), ValidationSummary> {
        let (summary, candidate) = self.run(form, target.clone());
        if summary.has_errors() {
            tracing::debug!(errors = summary.error_count(), "Form has validation errors");
            return Err(summary);
        }
        *target = candidate;
        Ok(())
    }

    /// Loads every bound field from `source` without validating.
    pub fn read_bean(&mut self, form: &mut F, source: &B) {
        for binding in &self.bindings {
            binding.read(source, form);
        }
        self.status = None;
    }

    fn run(&mut self, form: &mut F, mut candidate: B) -> (ValidationSummary, B) {
        let mut summary = ValidationSummary::default();

        for binding in &mut self.bindings {
            if let Some(message) = binding.validate(form) {
                summary.field_errors.push(FieldError {
                    property: binding.property(),
                    message,
                });
            }
        }

        if summary.field_errors.is_empty() {
            for binding in &self.bindings {
                binding.write(form, &mut candidate);
            }
            summary.record_errors = self
                .record_validators
                .iter()
                .filter_map(|validator| validator(&candidate).err())
                .collect();
        }

        self.status = summary.record_errors.first().cloned();
        (summary, candidate)
    }
}

impl<F: 'static, B: Clone + Default + 'static> Default for Binder<F, B> {
    fn default() -> Self {
        Self::new()
    }
}
