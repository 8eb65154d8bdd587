use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("{0}")]
    Validation(String),

    #[error("No record at index {index} (collection has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Backup not found: {0}")]
    BackupNotFound(String),
}

impl NotesError {
    /// True for the errors a collaborator is expected to show to the user:
    /// bad input and stale indexes.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            NotesError::Validation(_) | NotesError::IndexOutOfRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, NotesError>;
