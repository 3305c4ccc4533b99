//! Error types for meta-document interpretation.

/// A meta document that cannot be interpreted.
///
/// Always scoped to one file: the scanner turns each of these into an
/// `invalid_meta` gap and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidMetaError {
    /// The file is not a YAML mapping.
    #[error("{path}: failed to parse meta document: {message}")]
    Parse { path: String, message: String },

    /// No `type` discriminator is present.
    #[error("{path}: missing `type` discriminator")]
    MissingType { path: String },

    /// The `type` value is not registered (strict mode only).
    #[error("{path}: unknown contract type `{type_name}`")]
    UnknownType { path: String, type_name: String },

    /// A field the contract schema requires is absent or null.
    #[error("{path}: missing required field `{field}`")]
    MissingField { path: String, field: String },

    /// A field is present with the wrong shape.
    #[error("{path}: invalid field `{field}`: {message}")]
    InvalidField {
        path: String,
        field: String,
        message: String,
    },

    /// A declared artifact path resolves outside the repository.
    #[error("{path}: declared path `{declared}` escapes the repository root")]
    PathEscapesRoot { path: String, declared: String },
}

impl InvalidMetaError {
    /// Repository-relative path of the offending meta document.
    pub fn path(&self) -> &str {
        match self {
            Self::Parse { path, .. }
            | Self::MissingType { path }
            | Self::UnknownType { path, .. }
            | Self::MissingField { path, .. }
            | Self::InvalidField { path, .. }
            | Self::PathEscapesRoot { path, .. } => path,
        }
    }
}
