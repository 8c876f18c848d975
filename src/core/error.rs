use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// A scenario parameter is outside its documented domain.
    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// The asset name does not resolve in the catalog.
    #[error("asset not found: {name}")]
    NotFound { name: String },
}

impl SimError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}
