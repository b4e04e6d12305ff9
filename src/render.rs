//! Hand-off to the external renderer
//!
//! The gateway is stateless: it stages the serialized document in a
//! temporary directory, runs the renderer, and returns the artifact bytes.
//! The staging directory is removed on every exit path. A zero-length or
//! missing artifact is a failure, never a success.

use std::fs;
use std::process::Command;

use crate::error::PipelineError;

/// Converts a serialized document into a binary artifact
pub trait Renderer {
    fn render(&self, serialized: &str) -> Result<Vec<u8>, PipelineError>;
}

/// Renderer that shells out to an external command. `{input}` and
/// `{output}` in the argument list are replaced with staged file paths.
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    /// Renderer invocation for the default external CV typesetter, PDF
    /// only, auxiliary output formats suppressed
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: [
                "render",
                "{input}",
                "--pdf-path",
                "{output}",
                "--dont-generate-markdown",
                "--dont-generate-html",
                "--dont-generate-png",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    /// Renderer invocation with a custom argument template
    pub fn with_args(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, serialized: &str) -> Result<Vec<u8>, PipelineError> {
        // TempDir cleanup happens on drop, so staging never leaks across
        // calls regardless of which path exits first.
        let staging = tempfile::tempdir()
            .map_err(|e| PipelineError::Render(format!("failed to create staging dir: {}", e)))?;
        let input_path = staging.path().join("cv.yaml");
        let output_path = staging.path().join("cv.pdf");

        fs::write(&input_path, serialized)
            .map_err(|e| PipelineError::Render(format!("failed to stage document: {}", e)))?;

        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                a.replace("{input}", &input_path.to_string_lossy())
                    .replace("{output}", &output_path.to_string_lossy())
            })
            .collect();

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| {
                PipelineError::Render(format!("failed to launch {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Render(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let bytes = fs::read(&output_path).map_err(|_| {
            PipelineError::Render(format!("{} produced no output artifact", self.program))
        })?;
        if bytes.is_empty() {
            return Err(PipelineError::Render(format!(
                "{} produced an empty artifact",
                self.program
            )));
        }

        println!("[RENDER] artifact ready ({} bytes)", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_render_returns_artifact() {
        // "Renderer" that copies the input document to the output slot.
        let renderer = CommandRenderer::with_args(
            "cp",
            vec!["{input}".to_string(), "{output}".to_string()],
        );
        let bytes = renderer.render("cv: {}\n").unwrap();
        assert_eq!(bytes, b"cv: {}\n");
    }

    #[test]
    fn test_zero_byte_artifact_is_render_error() {
        let renderer =
            CommandRenderer::with_args("touch", vec!["{output}".to_string()]);
        let err = renderer.render("cv: {}\n").unwrap_err();
        match err {
            PipelineError::Render(msg) => assert!(msg.contains("empty artifact")),
            other => panic!("expected Render, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_artifact_is_render_error() {
        let renderer = CommandRenderer::with_args("true", vec![]);
        let err = renderer.render("cv: {}\n").unwrap_err();
        match err {
            PipelineError::Render(msg) => assert!(msg.contains("no output artifact")),
            other => panic!("expected Render, got {:?}", other),
        }
    }

    #[test]
    fn test_failing_command_is_render_error() {
        let renderer = CommandRenderer::with_args("false", vec![]);
        let err = renderer.render("cv: {}\n").unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
    }

    #[test]
    fn test_missing_program_is_render_error() {
        let renderer = CommandRenderer::new("definitely-not-a-real-renderer");
        let err = renderer.render("cv: {}\n").unwrap_err();
        match err {
            PipelineError::Render(msg) => assert!(msg.contains("failed to launch")),
            other => panic!("expected Render, got {:?}", other),
        }
    }
}
