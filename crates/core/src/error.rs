#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid tiling mode '{0}': expected 'sequential' or 'grid'")]
    InvalidMode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
