//! Structured CV generation from a résumé corpus and a job description
//!
//! Builds the instruction payload, invokes the completion provider, and
//! gates the response: schema validation plus a grounding spot-check on
//! contact fields. The provider's claim of schema conformance is never
//! trusted; every response is validated here.

use crate::error::{FieldViolation, PipelineError, ProviderErrorKind, ViolationKind};
use crate::provider::{CompletionProvider, CompletionRequest, Message};
use crate::schema::{self, StructuredCV};
use crate::utils::safe_truncate;

/// Largest corpus slice embedded in the payload. Anything beyond a few
/// pages of résumé text is noise anyway.
const MAX_CORPUS_BYTES: usize = 24_000;
const MAX_JOB_BYTES: usize = 12_000;
const MAX_OUTPUT_TOKENS: u32 = 8192;

const SYSTEM_PROMPT: &str = "You are a career-coach AI that rewrites r\u{e9}sum\u{e9}s \
into structured CV records tailored to a specific job advertisement. You respond \
with a single JSON object and nothing else.";

/// Generate a validated `StructuredCV` from a corpus and a job description.
///
/// Repeated calls with identical input may yield different valid records;
/// the only guaranteed invariant of a success is schema conformance. No
/// automatic retry happens here.
pub fn generate(
    provider: &dyn CompletionProvider,
    corpus: &str,
    job_description: &str,
    model: &str,
) -> Result<StructuredCV, PipelineError> {
    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(build_instruction_payload(corpus, job_description)),
        ],
        output_schema: Some(schema::json_schema()),
        max_tokens: MAX_OUTPUT_TOKENS,
    };

    let reply = provider.complete(&request)?;
    let json_text = strip_code_fences(&reply);

    let cv: StructuredCV = serde_json::from_str(&json_text).map_err(|e| {
        PipelineError::provider(
            ProviderErrorKind::MalformedResponse,
            format!("reply was not a JSON object: {}", e),
        )
    })?;

    let mut violations = cv.validate();
    violations.extend(grounding_violations(&cv, corpus, job_description));
    if !violations.is_empty() {
        return Err(PipelineError::SchemaViolation(violations));
    }

    println!(
        "[GENERATE] record accepted: {} experience, {} education, {} publication entries",
        cv.sections.experience.len(),
        cv.sections.education.len(),
        cv.sections.publications.len()
    );
    Ok(cv)
}

/// The single user-role payload: schema, rules, then the source material
fn build_instruction_payload(corpus: &str, job_description: &str) -> String {
    let schema_text = serde_json::to_string_pretty(&schema::json_schema())
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"Rewrite the résumé below into a CV record tailored to the job description. Return a single JSON object conforming to this schema:

{schema}

Rules:
1. Never invent information. Every populated field must come from the résumé or the job description. Omit optional fields you have no source for; do not leave them empty.
2. Drop résumé content that does not support this job description.
3. Keep highlight bullets short; split any long bullet into several. At most 4 highlights for the two most recent roles, at most 3 for older ones.
4. Where a summary, highlight or skill detail contains a keyword that appears verbatim in the job description, wrap that keyword in **double asterisks**. Never add bold markers to names, dates or URLs.
5. Dates are YYYY, YYYY-MM or YYYY-MM-DD. Use "present" as end_date for a current role. Publication dates are the year only.
6. Social network usernames are bare handles, never URLs.
7. Target 500-600 words in total so the rendered CV fits a single page.

RESUME:
{corpus}

JOB DESCRIPTION:
{job}

JSON only:"#,
        schema = schema_text,
        corpus = safe_truncate(corpus, MAX_CORPUS_BYTES),
        job = safe_truncate(job_description, MAX_JOB_BYTES),
    )
}

/// Strip a markdown code fence if the model wrapped its JSON in one
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        trimmed
            .lines()
            .skip(1)
            .take_while(|l| !l.starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        trimmed.to_string()
    }
}

fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Spot-check that contact fields trace to the source material. Free-text
/// fields are rewritten by design and cannot be checked this way, but a
/// website, email, handle or phone number the source never mentions is a
/// fabrication.
fn grounding_violations(cv: &StructuredCV, corpus: &str, job_description: &str) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    let source = format!("{}\n{}", corpus, job_description);

    if let Some(website) = &cv.website {
        let host = url::Url::parse(website)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()));
        let found = source.contains(website.as_str())
            || host.map(|h| source.contains(&h)).unwrap_or(false);
        if !found {
            violations.push(FieldViolation::new(
                "website",
                ViolationKind::InvalidValue,
                "not present in the source material",
            ));
        }
    }

    if let Some(email) = &cv.email {
        if !source.contains(email.as_str()) {
            violations.push(FieldViolation::new(
                "email",
                ViolationKind::InvalidValue,
                "not present in the source material",
            ));
        }
    }

    let phone_digits = digits_only(&cv.phone);
    if !phone_digits.is_empty() && !digits_only(&source).contains(&phone_digits) {
        violations.push(FieldViolation::new(
            "phone",
            ViolationKind::InvalidValue,
            "not present in the source material",
        ));
    }

    for (i, social) in cv.social_networks.iter().enumerate() {
        if !social.username.is_empty() && !source.contains(social.username.as_str()) {
            violations.push(FieldViolation::new(
                format!("social_networks[{}].username", i),
                ViolationKind::InvalidValue,
                "not present in the source material",
            ));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DEFAULT_MODEL;

    struct MockProvider {
        reply: String,
    }

    impl CompletionProvider for MockProvider {
        fn complete(&self, _request: &CompletionRequest) -> Result<String, PipelineError> {
            Ok(self.reply.clone())
        }
    }

    const CORPUS: &str = "Alice Example\nBerlin, Germany\n+49 170 1234567\n\
        alice@example.com\nhttps://github.com/alice\nSenior Engineer at Acme GmbH since 2019.";
    const JOB: &str = "We need a Rust engineer in Berlin.";

    fn valid_reply() -> String {
        r#"{
            "name": "Alice Example",
            "location": "Berlin, Germany",
            "email": "alice@example.com",
            "phone": "+491701234567",
            "social_networks": [{"network": "GitHub", "username": "alice"}],
            "sections": {
                "summary": ["Senior engineer focused on **Rust** services."],
                "experience": [{
                    "company": "Acme GmbH",
                    "position": "Senior Engineer",
                    "start_date": "2019",
                    "end_date": "present",
                    "highlights": ["Shipped **Rust** backends."]
                }]
            }
        }"#
        .to_string()
    }

    #[test]
    fn test_valid_reply_accepted() {
        let provider = MockProvider { reply: valid_reply() };
        let cv = generate(&provider, CORPUS, JOB, DEFAULT_MODEL).unwrap();
        assert_eq!(cv.name, "Alice Example");
        assert_eq!(cv.sections.experience.len(), 1);
    }

    #[test]
    fn test_fenced_reply_accepted() {
        let provider = MockProvider {
            reply: format!("```json\n{}\n```", valid_reply()),
        };
        let cv = generate(&provider, CORPUS, JOB, DEFAULT_MODEL).unwrap();
        assert_eq!(cv.location, "Berlin, Germany");
    }

    #[test]
    fn test_invalid_fields_all_enumerated() {
        let provider = MockProvider {
            reply: r#"{"name": "Alice Example", "location": "Berlin, Germany",
                       "phone": "5551234", "website": "not-a-url"}"#
                .to_string(),
        };
        let err = generate(&provider, CORPUS, JOB, DEFAULT_MODEL).unwrap_err();
        match err {
            PipelineError::SchemaViolation(violations) => {
                let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
                assert!(paths.contains(&"phone"));
                assert!(paths.contains(&"website"));
            }
            other => panic!("expected SchemaViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_hallucinated_website_flagged() {
        // Corpus has no website; the provider invents one anyway.
        let corpus = "Alice Example\nBerlin, Germany\n+49 170 1234567";
        let reply = r#"{
            "name": "Alice Example",
            "location": "Berlin, Germany",
            "phone": "+491701234567",
            "website": "https://alice-portfolio.example.net"
        }"#;
        let provider = MockProvider { reply: reply.to_string() };
        let err = generate(&provider, corpus, JOB, DEFAULT_MODEL).unwrap_err();
        match err {
            PipelineError::SchemaViolation(violations) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].path, "website");
                assert_eq!(violations[0].kind, ViolationKind::InvalidValue);
            }
            other => panic!("expected SchemaViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_phone_grounding_ignores_formatting() {
        // Corpus has the number with spaces, record has it compacted.
        let provider = MockProvider { reply: valid_reply() };
        assert!(generate(&provider, CORPUS, JOB, DEFAULT_MODEL).is_ok());
    }

    #[test]
    fn test_non_json_reply_is_malformed_response() {
        let provider = MockProvider {
            reply: "I'm sorry, I can't help with that.".to_string(),
        };
        let err = generate(&provider, CORPUS, JOB, DEFAULT_MODEL).unwrap_err();
        match err {
            PipelineError::Provider { kind, .. } => {
                assert_eq!(kind, ProviderErrorKind::MalformedResponse);
            }
            other => panic!("expected Provider, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_embeds_sources_and_rules() {
        let payload = build_instruction_payload(CORPUS, JOB);
        assert!(payload.contains("Alice Example"));
        assert!(payload.contains("Rust engineer in Berlin"));
        assert!(payload.contains("Never invent information"));
        assert!(payload.contains("double asterisks"));
        assert!(payload.contains("500-600 words"));
        assert!(payload.contains("\"phone\""));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }
}
