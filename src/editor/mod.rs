//! Editor state: the document buffer, the fixed language registry, and the
//! shell that composes generation and execution around them.

pub mod document;
pub mod languages;
pub mod shell;

pub use document::{Document, Position};
pub use languages::LanguageSpec;
pub use shell::{EditorShell, ShellState, Tab};
