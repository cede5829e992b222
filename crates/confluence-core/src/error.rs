use thiserror::Error;

/// Errors that abort a run before any file is dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The prompt contained no indexable term once stop words and
    /// single-character tokens were removed.
    #[error("prompt has an empty vocabulary after stop-word removal")]
    EmptyVocabulary,
}
