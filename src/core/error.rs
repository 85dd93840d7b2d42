use thiserror::Error;

/// Errors raised by invoice computation, lifecycle transitions and the
/// ledger service.
///
/// Every rejected operation leaves the target document unchanged; the message
/// names the invariant that would have been violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FacturationError {
    /// Non-positive or malformed monetary input.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Tax rate outside [0, 100].
    #[error("invalid tax rate: {0}")]
    InvalidTaxRate(String),

    /// Percentage and absolute discount supplied together.
    #[error("conflicting discount: {0}")]
    ConflictingDiscount(String),

    /// Payment or credit exceeds what is left to settle.
    #[error("overpayment rejected: {0}")]
    OverpaymentRejected(String),

    /// Status change not permitted from the current state.
    #[error("illegal state transition: {0}")]
    IllegalStateTransition(String),

    /// Concurrent modification detected; re-fetch and retry.
    #[error("stale version for {entity} {id}: expected {expected}, found {found}")]
    StaleInvoiceVersion {
        entity: &'static str,
        id: String,
        expected: u64,
        found: u64,
    },

    /// Referenced document does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Builder encountered invalid or missing configuration.
    #[error("builder error: {0}")]
    Builder(String),

    /// One or more validation rules failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Document number sequencing error.
    #[error("numbering error: {0}")]
    Numbering(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FacturationError {
    /// Only optimistic-lock conflicts are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleInvoiceVersion { .. })
    }

    /// Errors caused by the request rather than the system (4xx-equivalent).
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Numbering(_))
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "lines[0].quantity").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
    /// Short rule identifier if applicable (e.g. "LINE-QTY").
    pub rule: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "[{}] {}: {}", rule, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ValidationError {
    /// Create a validation error without a rule ID.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Create a validation error with a rule ID.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}
