//! Canonical structured-CV shape with field-level validation
//!
//! The same type constrains generation output (via `json_schema`) and
//! validates it post-hoc (via `validate`). All fields deserialize with
//! defaults so a structurally incomplete provider response still parses,
//! letting validation enumerate every violation instead of failing on the
//! first missing field. Optional fields are omitted from serialization when
//! unpopulated.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{FieldViolation, ViolationKind};

/// Root CV record. Field declaration order is the serialization order:
/// identity fields first, then sections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructuredCV {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub social_networks: Vec<SocialNetwork>,
    #[serde(default)]
    pub sections: Sections,
}

/// A (network, username) pair; the username is never a full URL
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SocialNetwork {
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub username: String,
}

/// Fixed section set. Struct, not a map, so serialized sub-key order is
/// always Summary, Skills, Education, Experience, Publications.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sections {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub summary: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<SkillEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub education: Vec<EducationEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publications: Vec<PublicationsEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkillEntry {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PublicationsEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default)]
    pub journal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub url: String,
}

/// `end_date` value meaning "still ongoing"
pub const PRESENT: &str = "present";

fn phone_re() -> Regex {
    Regex::new(r"^\+[0-9]{2,15}$").unwrap()
}

fn email_re() -> Regex {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap()
}

fn year_re() -> Regex {
    Regex::new(r"^[0-9]{4}$").unwrap()
}

/// Validate a URL for use in a rendered CV: http(s) scheme, dotted hostname
pub fn is_valid_http_url(url_str: &str) -> bool {
    let parsed = match url::Url::parse(url_str) {
        Ok(u) => u,
        Err(_) => return false,
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    match parsed.host_str() {
        Some(host) => host.contains('.'),
        None => false,
    }
}

/// Parse a partial ISO date (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`) into an
/// orderable (year, month, day) triple. Absent components sort earliest.
pub fn parse_partial_date(s: &str) -> Option<(u16, u8, u8)> {
    let mut parts = s.splitn(3, '-');
    let year: u16 = parts.next()?.parse().ok()?;
    if !(1000..=9999).contains(&year) {
        return None;
    }
    let month = match parts.next() {
        Some(m) => {
            let m: u8 = m.parse().ok()?;
            if !(1..=12).contains(&m) {
                return None;
            }
            m
        }
        None => 0,
    };
    let day = match parts.next() {
        Some(d) => {
            let d: u8 = d.parse().ok()?;
            if !(1..=31).contains(&d) {
                return None;
            }
            d
        }
        None => 0,
    };
    Some((year, month, day))
}

impl StructuredCV {
    /// Check every field-level constraint and return the complete list of
    /// violations. An empty list means the record is valid.
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        let phone_re = phone_re();
        let email_re = email_re();

        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new(
                "name",
                ViolationKind::MissingRequired,
                "field is required",
            ));
        }
        if self.location.trim().is_empty() {
            violations.push(FieldViolation::new(
                "location",
                ViolationKind::MissingRequired,
                "field is required",
            ));
        }

        if self.phone.trim().is_empty() {
            violations.push(FieldViolation::new(
                "phone",
                ViolationKind::MissingRequired,
                "field is required",
            ));
        } else if !phone_re.is_match(&self.phone) {
            violations.push(FieldViolation::new(
                "phone",
                ViolationKind::PatternMismatch,
                format!("expected '+' followed by 2-15 digits, got {:?}", self.phone),
            ));
        }

        if let Some(email) = &self.email {
            if !email_re.is_match(email) {
                violations.push(FieldViolation::new(
                    "email",
                    ViolationKind::PatternMismatch,
                    format!("not a valid email address: {:?}", email),
                ));
            }
        }

        if let Some(website) = &self.website {
            if !is_valid_http_url(website) {
                violations.push(FieldViolation::new(
                    "website",
                    ViolationKind::MalformedUrl,
                    format!("not a valid http(s) URL: {:?}", website),
                ));
            }
        }

        for (i, social) in self.social_networks.iter().enumerate() {
            let path = format!("social_networks[{}]", i);
            if social.network.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("{}.network", path),
                    ViolationKind::MissingRequired,
                    "field is required",
                ));
            }
            if social.username.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("{}.username", path),
                    ViolationKind::MissingRequired,
                    "field is required",
                ));
            } else if social.username.contains("://") || social.username.contains('/') {
                violations.push(FieldViolation::new(
                    format!("{}.username", path),
                    ViolationKind::InvalidValue,
                    "username must be a bare handle, not a URL",
                ));
            }
        }

        self.validate_sections(&mut violations);
        violations
    }

    fn validate_sections(&self, violations: &mut Vec<FieldViolation>) {
        for (i, entry) in self.sections.skills.iter().enumerate() {
            if entry.label.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("sections.skills[{}].label", i),
                    ViolationKind::MissingRequired,
                    "field is required",
                ));
            }
        }

        for (i, entry) in self.sections.education.iter().enumerate() {
            let path = format!("sections.education[{}]", i);
            if entry.institution.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("{}.institution", path),
                    ViolationKind::MissingRequired,
                    "field is required",
                ));
            }
            if entry.area.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("{}.area", path),
                    ViolationKind::MissingRequired,
                    "field is required",
                ));
            }
            validate_date_range(
                &path,
                entry.start_date.as_deref(),
                entry.end_date.as_deref(),
                violations,
            );
        }

        for (i, entry) in self.sections.experience.iter().enumerate() {
            let path = format!("sections.experience[{}]", i);
            if entry.company.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("{}.company", path),
                    ViolationKind::MissingRequired,
                    "field is required",
                ));
            }
            if entry.position.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("{}.position", path),
                    ViolationKind::MissingRequired,
                    "field is required",
                ));
            }
            validate_date_range(
                &path,
                entry.start_date.as_deref(),
                entry.end_date.as_deref(),
                violations,
            );
        }

        let year_re = year_re();
        for (i, entry) in self.sections.publications.iter().enumerate() {
            let path = format!("sections.publications[{}]", i);
            if entry.title.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("{}.title", path),
                    ViolationKind::MissingRequired,
                    "field is required",
                ));
            }
            if entry.journal.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("{}.journal", path),
                    ViolationKind::MissingRequired,
                    "field is required",
                ));
            }
            if let Some(date) = &entry.date {
                if !year_re.is_match(date) {
                    violations.push(FieldViolation::new(
                        format!("{}.date", path),
                        ViolationKind::PatternMismatch,
                        format!("expected a four-digit year, got {:?}", date),
                    ));
                }
            }
            if entry.url.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("{}.url", path),
                    ViolationKind::MissingRequired,
                    "field is required",
                ));
            } else if !is_valid_http_url(&entry.url) {
                violations.push(FieldViolation::new(
                    format!("{}.url", path),
                    ViolationKind::MalformedUrl,
                    format!("not a valid http(s) URL: {:?}", entry.url),
                ));
            }
        }
    }
}

/// Check that a start/end date pair is well-formed and orderable.
/// `end = "present"` is always acceptable.
fn validate_date_range(
    path: &str,
    start: Option<&str>,
    end: Option<&str>,
    violations: &mut Vec<FieldViolation>,
) {
    let start_parsed = match start {
        Some(s) => match parse_partial_date(s) {
            Some(d) => Some(d),
            None => {
                violations.push(FieldViolation::new(
                    format!("{}.start_date", path),
                    ViolationKind::PatternMismatch,
                    format!("expected YYYY, YYYY-MM or YYYY-MM-DD, got {:?}", s),
                ));
                None
            }
        },
        None => None,
    };

    let end_parsed = match end {
        Some(PRESENT) => return,
        Some(s) => match parse_partial_date(s) {
            Some(d) => Some(d),
            None => {
                violations.push(FieldViolation::new(
                    format!("{}.end_date", path),
                    ViolationKind::PatternMismatch,
                    format!("expected YYYY, YYYY-MM, YYYY-MM-DD or \"present\", got {:?}", s),
                ));
                None
            }
        },
        None => None,
    };

    if let (Some(s), Some(e)) = (start_parsed, end_parsed) {
        if s > e {
            violations.push(FieldViolation::new(
                format!("{}.end_date", path),
                ViolationKind::InvalidValue,
                format!("end date {:?} precedes start date {:?}", end.unwrap_or(""), start.unwrap_or("")),
            ));
        }
    }
}

/// JSON-Schema shape of `StructuredCV`, passed to the provider as the
/// output constraint and embedded in the instruction payload.
pub fn json_schema() -> serde_json::Value {
    let date = json!({ "type": "string", "pattern": "^[0-9]{4}(-[0-9]{2}){0,2}$" });
    let end_date = json!({ "type": "string", "pattern": "^([0-9]{4}(-[0-9]{2}){0,2}|present)$" });
    json!({
        "type": "object",
        "required": ["name", "location", "phone", "sections"],
        "additionalProperties": false,
        "properties": {
            "name": { "type": "string" },
            "location": { "type": "string" },
            "email": { "type": "string", "format": "email" },
            "phone": { "type": "string", "pattern": "^\\+[0-9]{2,15}$" },
            "website": { "type": "string", "format": "uri" },
            "social_networks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["network", "username"],
                    "properties": {
                        "network": { "type": "string" },
                        "username": { "type": "string", "description": "bare handle, never a URL" }
                    }
                }
            },
            "sections": {
                "type": "object",
                "properties": {
                    "summary": { "type": "array", "items": { "type": "string" } },
                    "skills": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["label", "details"],
                            "properties": {
                                "label": { "type": "string" },
                                "details": { "type": "string" }
                            }
                        }
                    },
                    "education": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["institution", "area"],
                            "properties": {
                                "institution": { "type": "string" },
                                "area": { "type": "string" },
                                "degree": { "type": "string" },
                                "location": { "type": "string" },
                                "start_date": date,
                                "end_date": end_date,
                                "highlights": { "type": "array", "items": { "type": "string" } }
                            }
                        }
                    },
                    "experience": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["company", "position"],
                            "properties": {
                                "company": { "type": "string" },
                                "position": { "type": "string" },
                                "location": { "type": "string" },
                                "start_date": date,
                                "end_date": end_date,
                                "highlights": { "type": "array", "items": { "type": "string" } }
                            }
                        }
                    },
                    "publications": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["title", "journal", "url"],
                            "properties": {
                                "title": { "type": "string" },
                                "authors": { "type": "array", "items": { "type": "string" } },
                                "doi": { "type": "string" },
                                "journal": { "type": "string" },
                                "date": { "type": "string", "pattern": "^[0-9]{4}$" },
                                "url": { "type": "string", "format": "uri" }
                            }
                        }
                    }
                }
            }
        }
    })
}
