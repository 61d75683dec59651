use std::fmt;

/// The input field a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Identifier,
    Password,
    Date,
    Amount,
    Kind,
    Category,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Identifier => "identifier",
            Field::Password => "password",
            Field::Date => "date",
            Field::Amount => "amount",
            Field::Kind => "kind",
            Field::Category => "category",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: Field,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: Field, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// Check an account identifier as typed at signup/login.
/// Returns the trimmed identifier; case is preserved.
pub fn validate_identifier(identifier: &str) -> Result<&str, ValidationError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(ValidationError::new(Field::Identifier, "must not be empty"));
    }
    if identifier.chars().any(char::is_control) {
        return Err(ValidationError::new(
            Field::Identifier,
            "must not contain control characters",
        ));
    }
    Ok(identifier)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::new(Field::Password, "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_is_trimmed_and_case_preserved() {
        assert_eq!(validate_identifier("  Kim@Example.com "), Ok("Kim@Example.com"));
    }

    #[test]
    fn test_identifier_rejects_blank_and_control() {
        let err = validate_identifier("   ").unwrap_err();
        assert_eq!(err.field, Field::Identifier);
        assert!(validate_identifier("a\nb").is_err());
    }

    #[test]
    fn test_password_must_not_be_empty() {
        assert_eq!(validate_password("").unwrap_err().field, Field::Password);
        assert!(validate_password(" ").is_ok());
    }
}
