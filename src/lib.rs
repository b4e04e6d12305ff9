//! tailorcv: résumé + job description → validated, rendered CV
//!
//! Pipeline: source document → corpus text ([`extract`]) → structured
//! record ([`generate`]) → serializable document ([`document`]) → binary
//! artifact ([`render`]), with user edits looping through [`session`].

pub mod document;
pub mod error;
pub mod extract;
pub mod generate;
pub mod provider;
pub mod render;
pub mod schema;
pub mod session;
pub mod settings;
pub mod utils;

pub use document::{assemble, disassemble, Design, LocaleConfig, PresentationConfig, RenderDocument};
pub use error::{FieldViolation, PipelineError, ProviderErrorKind, ViolationKind};
pub use extract::{detect_kind, extract_corpus, SourceKind};
pub use generate::generate;
pub use provider::{AnthropicClient, CompletionProvider, CompletionRequest, Message, DEFAULT_MODEL};
pub use render::{CommandRenderer, Renderer};
pub use schema::StructuredCV;
pub use session::{Session, SessionState};
pub use settings::Settings;
