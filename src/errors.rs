use thiserror::Error;

/// Error taxonomy for the face-identity search layer
///
/// `NoFaceDetected` is only an error at the embedding-client boundary; the
/// search handler converts it into a normal no-face `SearchResult` before it
/// can reach a caller.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("Invalid request: {message}")]
    InputError { message: String },

    #[error("No face detected in the supplied image")]
    NoFaceDetected,

    #[error("Upstream {service} unavailable: {message}")]
    UpstreamUnavailable { service: String, message: String },

    #[error("Shared resource unavailable: {message}")]
    ResourceUnavailable { message: String },
}

impl SearchError {
    /// Create an `UpstreamUnavailable` tagged with the failing service name
    pub fn upstream(service: &str, message: impl Into<String>) -> Self {
        SearchError::UpstreamUnavailable {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Create a `ResourceUnavailable` for the shared document store
    pub fn resource(message: impl Into<String>) -> Self {
        SearchError::ResourceUnavailable {
            message: message.into(),
        }
    }

    /// Create an `InputError` for a malformed request payload
    pub fn input(message: impl Into<String>) -> Self {
        SearchError::InputError {
            message: message.into(),
        }
    }

    /// Whether the caller is at fault (maps to a 4xx at the HTTP layer)
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::InputError { .. })
    }

    /// Create a user-friendly error message for display to API consumers
    pub fn user_message(&self) -> String {
        match self {
            SearchError::InputError { message } => {
                format!("The request could not be processed: {}.", message)
            }
            SearchError::NoFaceDetected => {
                "No face could be detected in the supplied image.".to_string()
            }
            SearchError::UpstreamUnavailable { service, message } => {
                format!(
                    "The {} service is currently unavailable: {}. Please try again later.",
                    service, message
                )
            }
            SearchError::ResourceUnavailable { message } => {
                format!(
                    "The shared database connection could not be established: {}.",
                    message
                )
            }
        }
    }
}

/// Convert `SearchError` to String for boundary layers that only carry text
impl From<SearchError> for String {
    fn from(error: SearchError) -> Self {
        error.user_message()
    }
}

/// Result type alias for all search-layer operations
pub type FaceSearchResult<T> = Result<T, SearchError>;
