use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authorization back-ends must have a name.")]
    MissingBackendName,

    #[error("No such back-end defined: {0}")]
    UnknownBackend(String),

    /// Raised by a gate whose back-end is not registered at invocation time.
    /// This is an infrastructure failure, never a denial.
    #[error("Unknown authorization backend \"{0}\"")]
    UnresolvedBackend(String),

    #[error("Policy must have an action.")]
    MissingAction,

    #[error("An error occurred deserializing definition {0}.")]
    Deserializing(#[source] serde_json::Error),

    #[error("Invalid denied status code {0}.")]
    InvalidStatusCode(u16),

    #[error("Back-end \"{backend}\" failed to serialize policies: {message}")]
    Serialization { backend: String, message: String },
}
