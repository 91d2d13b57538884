// src/utils/error.rs
use thiserror::Error;

// One error type per layer; AppError aggregates them for main.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("Empty response body from {0}")]
    EmptyBody(String),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid selector for '{field}': {reason}")]
    InvalidSelector { field: &'static str, reason: String },

    #[error("Invalid selector profile: {0}")]
    InvalidProfile(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum NicheError {
    #[error("Chat request failed: {0}")]
    Network(String),

    #[error("Chat API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Chat response had no choices")]
    EmptyResponse,

    #[error("Unusable classifier response: {0}")]
    Shape(String),

    #[error("Classifier configuration error: {0}")]
    Config(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Portal interaction failed: {0}")]
    Portal(#[from] PortalError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Niche classification failed: {0}")]
    Niche(#[from] NicheError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_errors_convert_into_app_error() {
        let err: AppError = NicheError::Config("OPENAI_API_KEY is not set".into()).into();
        assert!(matches!(err, AppError::Niche(NicheError::Config(_))));
        assert_eq!(
            err.to_string(),
            "Niche classification failed: Classifier configuration error: OPENAI_API_KEY is not set"
        );

        let err: AppError = ExtractError::InvalidProfile("missing field `container`".into()).into();
        assert!(matches!(err, AppError::Extraction(_)));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = StorageError::from(io).into();
        assert!(matches!(err, AppError::Storage(StorageError::IoError(_))));
    }
}
