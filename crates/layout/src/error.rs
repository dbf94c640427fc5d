use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("widget definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("layout validation failed: {0}")]
    Validation(String),

    #[error("layout persistence failed: {0}")]
    Persistence(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
