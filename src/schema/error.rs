use thiserror::Error;

/// Conversion failures, all reported to clients as `validation`
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A required field was missing or empty
    #[error("Field '{0}' is required")]
    Required(String),

    /// A value could not be coerced to the field's type
    #[error("Invalid value for field '{field}': {reason}")]
    Invalid { field: String, reason: String },

    /// A select field received a value outside its choices
    #[error("'{value}' is not a choice for field '{field}'")]
    UnknownChoice { field: String, value: String },
}

/// Type alias for cleaner function signatures
pub type Result<T> = std::result::Result<T, SchemaError>;
