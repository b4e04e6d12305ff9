//! Render document assembly and serialization
//!
//! A `RenderDocument` is the only representation handed to the renderer and
//! the only one the user edits. Serialization is stable: field order is
//! struct declaration order, so re-serializing an unmodified document is
//! byte-identical. That property backs the "has the user changed anything"
//! check in the revision loop.
//!
//! After first assembly the serialized text is the source of truth;
//! `from_yaml`/`disassemble` exist for first construction only, never for
//! re-deriving a record from user edits.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::schema::StructuredCV;

/// Layout settings for the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub theme: String,
    pub font_size: String,
    pub page_margin: String,
}

impl Default for Design {
    fn default() -> Self {
        Self {
            theme: "classic".to_string(),
            font_size: "10pt".to_string(),
            page_margin: "2cm".to_string(),
        }
    }
}

/// Language settings for the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleConfig {
    pub language: String,
    /// Label rendered for an ongoing date range
    pub present_label: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            present_label: "present".to_string(),
        }
    }
}

/// Non-content presentation settings: layout plus locale
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PresentationConfig {
    pub design: Design,
    pub locale: LocaleConfig,
}

/// The full serializable document: CV record, then design, then locale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderDocument {
    pub cv: StructuredCV,
    pub design: Design,
    pub locale: LocaleConfig,
}

/// Merge a structured record and presentation settings into one document
pub fn assemble(cv: StructuredCV, presentation: PresentationConfig) -> RenderDocument {
    RenderDocument {
        cv,
        design: presentation.design,
        locale: presentation.locale,
    }
}

/// Inverse of `assemble`. Only meaningful at first construction; edited
/// document text is never parsed back into a record.
pub fn disassemble(doc: RenderDocument) -> (StructuredCV, PresentationConfig) {
    (
        doc.cv,
        PresentationConfig {
            design: doc.design,
            locale: doc.locale,
        },
    )
}

impl RenderDocument {
    /// Serialize to the human-editable YAML form.
    ///
    /// Serialization of these types cannot fail in practice; an error here
    /// is an internal fault, not a renderer failure, so it surfaces as
    /// `State` rather than `Render`.
    pub fn to_yaml(&self) -> Result<String, PipelineError> {
        serde_yaml::to_string(self)
            .map_err(|e| PipelineError::State(format!("document serialization failed: {}", e)))
    }

    /// Parse a serialized document. First-construction use only.
    pub fn from_yaml(text: &str) -> Result<Self, PipelineError> {
        serde_yaml::from_str(text)
            .map_err(|e| PipelineError::Decode(format!("not a valid document: {}", e)))
    }
}
