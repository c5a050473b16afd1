use academy_core::ServiceError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("no record at {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(path) => ServiceError::NotFound(format!("no record at {path}")),
            StoreError::InvalidPath(_) | StoreError::Serialization(_) => {
                ServiceError::Internal(e.to_string())
            }
            StoreError::Unavailable(_) | StoreError::Storage(_) => {
                ServiceError::Storage(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_service_error() {
        let e: ServiceError = StoreError::NotFound("rules/x".into()).into();
        assert_eq!(e.error_code(), "NOT_FOUND");

        let e: ServiceError = StoreError::Unavailable("offline".into()).into();
        assert_eq!(e.error_code(), "STORAGE_ERROR");
        assert_eq!(e.to_string(), "store unavailable: offline");

        let e: ServiceError = StoreError::InvalidPath("a//b".into()).into();
        assert_eq!(e.error_code(), "INTERNAL");
    }
}
