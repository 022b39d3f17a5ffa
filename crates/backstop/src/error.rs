use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackstopError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to initialize metadata store at {path}: {message}")]
    StoreInit { path: PathBuf, message: String },

    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Destination directory not found: {0}")]
    DestinationNotFound(PathBuf),

    #[error("Directory not found: {0}")]
    RootNotFound(PathBuf),

    #[error("File name is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    #[error("Corrupt record in {table}: {message}")]
    Corrupt { table: &'static str, message: String },

    #[error("User input error: {0}")]
    UserInput(String),
}

impl BackstopError {
    pub fn corrupt(table: &'static str, message: impl Into<String>) -> Self {
        BackstopError::Corrupt {
            table,
            message: message.into(),
        }
    }

    /// Process exit code surfaced to the shell.
    pub fn exit_code(&self) -> i32 {
        match self {
            BackstopError::StoreInit { .. } => 2,
            BackstopError::SourceNotFound(_)
            | BackstopError::DestinationNotFound(_)
            | BackstopError::RootNotFound(_) => 3,
            _ => 1,
        }
    }
}

impl From<dialoguer::Error> for BackstopError {
    fn from(err: dialoguer::Error) -> Self {
        BackstopError::UserInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BackstopError>;
