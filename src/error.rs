//! Error taxonomy for the CV pipeline
//!
//! Every failure surfaced to a caller is exactly one of these kinds, with
//! enough detail (offending field path, underlying cause) to act on.

use thiserror::Error;

/// What went wrong with a single field during schema validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// A required field is absent or empty
    MissingRequired,
    /// A value does not match its expected pattern (phone, date, year)
    PatternMismatch,
    /// A value should be a well-formed http(s) URL but is not
    MalformedUrl,
    /// A value is structurally present but unacceptable (e.g. a username
    /// containing a full URL, or a field absent from the source material)
    InvalidValue,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ViolationKind::MissingRequired => "missing required field",
            ViolationKind::PatternMismatch => "pattern mismatch",
            ViolationKind::MalformedUrl => "malformed URL",
            ViolationKind::InvalidValue => "invalid value",
        };
        f.write_str(s)
    }
}

/// A single validation failure, addressed by field path (e.g.
/// `sections.experience[2].end_date`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub path: String,
    pub kind: ViolationKind,
    pub detail: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self { path: path.into(), kind, detail: detail.into() }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.path, self.kind, self.detail)
    }
}

/// Transport-level failure classes for the completion provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Auth,
    RateLimit,
    Timeout,
    Transport,
    MalformedResponse,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorKind::Auth => "auth",
            ProviderErrorKind::RateLimit => "rate limit",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Transport => "transport",
            ProviderErrorKind::MalformedResponse => "malformed response",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input bytes were not valid UTF-8
    #[error("failed to decode input as UTF-8: {0}")]
    Decode(String),

    /// Source document could not be read (corrupt, encrypted, image-only)
    #[error("failed to extract text from document: {0}")]
    Extraction(String),

    /// Completion provider failed at the transport level; not retried here
    #[error("completion provider error ({kind}): {message}")]
    Provider { kind: ProviderErrorKind, message: String },

    /// Generated record failed schema validation; lists every offending field
    #[error("generated record failed validation: {}", format_violations(.0))]
    SchemaViolation(Vec<FieldViolation>),

    /// External renderer failed or produced no usable artifact
    #[error("render failed: {0}")]
    Render(String),

    /// Operation requested in an invalid session state
    #[error("invalid session state: {0}")]
    State(String),
}

impl PipelineError {
    pub fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        PipelineError::Provider { kind, message: message.into() }
    }
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_lists_all_fields() {
        let err = PipelineError::SchemaViolation(vec![
            FieldViolation::new("phone", ViolationKind::MissingRequired, "field is required"),
            FieldViolation::new("website", ViolationKind::MalformedUrl, "not-a-url"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("phone"));
        assert!(msg.contains("website"));
        assert!(msg.contains("malformed URL"));
    }

    #[test]
    fn test_provider_error_display() {
        let err = PipelineError::provider(ProviderErrorKind::RateLimit, "HTTP 429");
        assert_eq!(err.to_string(), "completion provider error (rate limit): HTTP 429");
    }
}
