use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("widget definition already registered: {0}")]
    DuplicateDefinition(String),

    #[error("invalid widget definition: {0}")]
    Validation(String),

    #[error("widget definition not found: {0}")]
    DefinitionNotFound(String),
}
