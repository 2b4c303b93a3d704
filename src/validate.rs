//! Pluggable struct validation.
//!
//! The router holds one [`Validator`]; handlers reach it through
//! [`Request::validate`](crate::Request::validate). Field rules themselves
//! are declared with the `validator` crate's derive attributes, so the
//! default [`StructValidator`] only has to run them and describe failures.

use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Why a value failed validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// One or more field rules failed. The text lists each failing field.
    #[error("{0}")]
    Invalid(String),

    #[error("validator not registered")]
    NotRegistered,
}

/// Single-method validation capability injected into the router.
pub trait Validator: Send + Sync + 'static {
    fn validate(&self, value: &dyn Validate) -> Result<(), ValidationError>;
}

/// Runs the derive-declared rules of the value itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructValidator;

impl Validator for StructValidator {
    fn validate(&self, value: &dyn Validate) -> Result<(), ValidationError> {
        value.validate().map_err(|e| ValidationError::Invalid(describe(&e)))
    }
}

/// One line per failing rule, ordered by field name:
/// `field 'email' failed on the 'email' rule`.
fn describe(errors: &ValidationErrors) -> String {
    let mut lines: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter()
                .map(move |e| format!("field '{field}' failed on the '{}' rule", e.code))
        })
        .collect();
    lines.sort();
    lines.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Signup {
        #[validate(length(min = 1))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn valid_struct_passes() {
        let s = Signup { name: "ann".into(), email: "ann@example.com".into() };
        assert!(StructValidator.validate(&s).is_ok());
    }

    #[test]
    fn failures_name_every_field_and_rule() {
        let s = Signup { name: String::new(), email: "not-an-email".into() };
        let err = StructValidator.validate(&s).unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'email' failed on the 'email' rule; field 'name' failed on the 'length' rule"
        );
    }
}
