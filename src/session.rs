//! Revision loop controller
//!
//! One `Session` per user, owned by the caller and passed into every call;
//! no process-wide state. The session tracks the canonical serialized text
//! (last generated or last successfully rendered), the text currently
//! displayed to the user, and the rendered artifact.
//!
//! The edit boundary is one-way: once a document is installed, user edits
//! only ever flow forward to the renderer as text. Nothing here parses
//! edited text back into a structured record. Regeneration is an explicit
//! `install_generated` call and discards the current text.

use crate::document::RenderDocument;
use crate::error::PipelineError;
use crate::render::Renderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No document yet
    Empty,
    /// Canonical text installed from a fresh generation, no artifact
    Generated,
    /// Displayed text differs from canonical; any prior artifact is stale
    Edited,
    /// Artifact present and matching the canonical text
    Rendered,
    /// Last render failed; displayed text preserved for retry
    RenderFailed,
}

pub struct Session {
    state: SessionState,
    canonical_text: Option<String>,
    displayed_text: String,
    artifact: Option<Vec<u8>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Empty,
            canonical_text: None,
            displayed_text: String::new(),
            artifact: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The serialized text currently shown to (and editable by) the user
    pub fn displayed_text(&self) -> &str {
        &self.displayed_text
    }

    pub fn canonical_text(&self) -> Option<&str> {
        self.canonical_text.as_deref()
    }

    /// The last successfully rendered artifact, if still valid
    pub fn artifact(&self) -> Option<&[u8]> {
        self.artifact.as_deref()
    }

    /// Install a freshly generated document as the new canonical text.
    /// Explicit top-level regeneration entry point; discards whatever text
    /// and artifact the session held.
    pub fn install_generated(&mut self, doc: &RenderDocument) -> Result<(), PipelineError> {
        let text = doc.to_yaml()?;
        self.displayed_text = text.clone();
        self.canonical_text = Some(text);
        self.artifact = None;
        self.state = SessionState::Generated;
        Ok(())
    }

    /// Record the text the user currently sees. A textual difference from
    /// the canonical text (not a semantic diff) moves to `Edited` and
    /// invalidates any artifact.
    pub fn update_text(&mut self, text: &str) -> Result<(), PipelineError> {
        if self.state == SessionState::Empty {
            return Err(PipelineError::State("no document to edit".to_string()));
        }

        self.displayed_text = text.to_string();
        if self.canonical_text.as_deref() != Some(text) {
            self.artifact = None;
            self.state = SessionState::Edited;
        } else if self.state == SessionState::Edited || self.state == SessionState::RenderFailed {
            // Reverted to canonical. The artifact was already invalidated,
            // so the session is back to an unrendered canonical document.
            self.state = if self.artifact.is_some() {
                SessionState::Rendered
            } else {
                SessionState::Generated
            };
        }
        Ok(())
    }

    /// Render the current text. On success the artifact is stored and the
    /// canonical text updated; on failure the user's text is untouched,
    /// any stale artifact is cleared, and the session allows retry.
    pub fn render(&mut self, renderer: &dyn Renderer) -> Result<(), PipelineError> {
        if self.state == SessionState::Empty {
            return Err(PipelineError::State("no document to render".to_string()));
        }

        match renderer.render(&self.displayed_text) {
            Ok(bytes) => {
                self.artifact = Some(bytes);
                self.canonical_text = Some(self.displayed_text.clone());
                self.state = SessionState::Rendered;
                Ok(())
            }
            Err(e) => {
                self.artifact = None;
                self.state = SessionState::RenderFailed;
                Err(e)
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{assemble, PresentationConfig};
    use crate::schema::StructuredCV;

    struct OkRenderer;

    impl Renderer for OkRenderer {
        fn render(&self, serialized: &str) -> Result<Vec<u8>, PipelineError> {
            Ok(format!("PDF({})", serialized.len()).into_bytes())
        }
    }

    struct FailRenderer;

    impl Renderer for FailRenderer {
        fn render(&self, _serialized: &str) -> Result<Vec<u8>, PipelineError> {
            Err(PipelineError::Render("typesetter crashed".to_string()))
        }
    }

    fn sample_doc() -> RenderDocument {
        let cv = StructuredCV {
            name: "Alice Example".to_string(),
            location: "Berlin".to_string(),
            phone: "+491701234567".to_string(),
            ..Default::default()
        };
        assemble(cv, PresentationConfig::default())
    }

    #[test]
    fn test_empty_session_rejects_edit_and_render() {
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::Empty);
        assert!(matches!(
            session.update_text("cv: {}"),
            Err(PipelineError::State(_))
        ));
        assert!(matches!(
            session.render(&OkRenderer),
            Err(PipelineError::State(_))
        ));
    }

    #[test]
    fn test_generate_edit_render_trace() {
        let mut session = Session::new();

        session.install_generated(&sample_doc()).unwrap();
        assert_eq!(session.state(), SessionState::Generated);
        let t0 = session.canonical_text().unwrap().to_string();
        assert_eq!(session.displayed_text(), t0);
        assert!(session.artifact().is_none());

        let t1 = format!("{}\n# tweaked by user\n", t0);
        session.update_text(&t1).unwrap();
        assert_eq!(session.state(), SessionState::Edited);

        session.render(&OkRenderer).unwrap();
        assert_eq!(session.state(), SessionState::Rendered);
        assert_eq!(session.canonical_text(), Some(t1.as_str()));
        assert!(session.artifact().is_some());
    }

    #[test]
    fn test_edit_invalidates_artifact() {
        let mut session = Session::new();
        session.install_generated(&sample_doc()).unwrap();
        session.render(&OkRenderer).unwrap();
        assert!(session.artifact().is_some());

        session.update_text("something else entirely").unwrap();
        assert_eq!(session.state(), SessionState::Edited);
        assert!(session.artifact().is_none());
    }

    #[test]
    fn test_failed_render_preserves_user_text() {
        let mut session = Session::new();
        session.install_generated(&sample_doc()).unwrap();
        let t1 = "cv: broken but mine";
        session.update_text(t1).unwrap();

        let err = session.render(&FailRenderer).unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
        assert_eq!(session.state(), SessionState::RenderFailed);
        assert_eq!(session.displayed_text(), t1);
        assert!(session.artifact().is_none());
    }

    #[test]
    fn test_failed_render_clears_previous_artifact() {
        let mut session = Session::new();
        session.install_generated(&sample_doc()).unwrap();
        session.render(&OkRenderer).unwrap();
        assert!(session.artifact().is_some());

        session.update_text("edited").unwrap();
        let _ = session.render(&FailRenderer);
        assert!(session.artifact().is_none());
    }

    #[test]
    fn test_retry_after_failure() {
        let mut session = Session::new();
        session.install_generated(&sample_doc()).unwrap();
        session.update_text("first attempt").unwrap();
        let _ = session.render(&FailRenderer);
        assert_eq!(session.state(), SessionState::RenderFailed);

        session.update_text("second attempt").unwrap();
        assert_eq!(session.state(), SessionState::Edited);

        session.render(&OkRenderer).unwrap();
        assert_eq!(session.state(), SessionState::Rendered);
        assert_eq!(session.canonical_text(), Some("second attempt"));
    }

    #[test]
    fn test_unchanged_text_does_not_leave_rendered() {
        let mut session = Session::new();
        session.install_generated(&sample_doc()).unwrap();
        session.render(&OkRenderer).unwrap();

        let canonical = session.canonical_text().unwrap().to_string();
        session.update_text(&canonical).unwrap();
        assert_eq!(session.state(), SessionState::Rendered);
        assert!(session.artifact().is_some());
    }

    #[test]
    fn test_regeneration_discards_current_text() {
        let mut session = Session::new();
        session.install_generated(&sample_doc()).unwrap();
        session.update_text("user edits to be discarded").unwrap();
        session.render(&OkRenderer).unwrap();

        session.install_generated(&sample_doc()).unwrap();
        assert_eq!(session.state(), SessionState::Generated);
        assert!(session.artifact().is_none());
        assert_eq!(
            session.displayed_text(),
            session.canonical_text().unwrap()
        );
    }
}
