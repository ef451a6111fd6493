//! Account validation.

use super::model::AccountConfig;

/// Validation error for account configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// IMAP host is empty.
    EmptyHost,
    /// IMAP port is zero.
    InvalidPort,
    /// Username is empty.
    EmptyUsername,
    /// Mailbox name is empty.
    EmptyMailbox,
    /// A timeout is zero.
    ZeroTimeout,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyHost => "IMAP server is required",
            Self::InvalidPort => "IMAP port must be 1-65535",
            Self::EmptyUsername => "IMAP username is required",
            Self::EmptyMailbox => "Mailbox name is required",
            Self::ZeroTimeout => "Timeouts must be at least one second",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyHost => "host",
            Self::InvalidPort => "port",
            Self::EmptyUsername => "username",
            Self::EmptyMailbox => "mailbox",
            Self::ZeroTimeout => "timeouts",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating an account.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate an account configuration.
///
/// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all errors.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_account(account: &AccountConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if account.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if account.port == Some(0) {
        errors.push(ValidationError::InvalidPort);
    }
    if account.username.trim().is_empty() {
        errors.push(ValidationError::EmptyUsername);
    }
    if account.mailbox.is_empty() {
        errors.push(ValidationError::EmptyMailbox);
    }
    if account.connect_timeout_secs == 0 || account.command_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
