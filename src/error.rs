use thiserror::Error;

/// Type alias for Result with StatementError
pub type Result<T> = std::result::Result<T, StatementError>;

/// Error types for the statement extraction pipeline
#[derive(Error, Debug)]
pub enum StatementError {
    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded - should retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Message payload missing an expected attachment or part
    #[error("Attachment error: {0}")]
    AttachmentError(String),

    /// PDF could not be loaded or its text extracted
    #[error("PDF extraction failed: {0}")]
    PdfExtract(String),

    /// PDF is encrypted and password authentication failed
    #[error("PDF is encrypted and password authentication failed: {0}")]
    PdfDecrypt(String),

    /// No persisted dataset file exists for the classifier to consume
    #[error("No extracted CSVs found")]
    DatasetNotFound,

    /// Remote classifier returned a non-success status
    #[error("Model API failed (HTTP {status}): {details}")]
    ClassifierError { status: u16, details: String },

    /// Outbound HTTP error (classifier request transport failure)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl StatementError {
    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StatementError::RateLimitExceeded { .. }
                | StatementError::ServerError { .. }
                | StatementError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// The Retry-After header can be specified in two formats:
/// 1. Delay-seconds: An integer indicating seconds to wait (e.g., "120")
/// 2. HTTP-date: An HTTP date format (e.g., "Wed, 21 Oct 2015 07:28:00 GMT")
///
/// Returns the number of seconds to wait. If the header is missing or invalid,
/// returns a default of 5 seconds.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> u64 {
    const DEFAULT_RETRY_AFTER: u64 = 5;

    if let Some(retry_after_value) = response.headers().get("retry-after") {
        if let Ok(retry_after_str) = retry_after_value.to_str() {
            // Try to parse as integer (delay-seconds format)
            if let Ok(seconds) = retry_after_str.parse::<u64>() {
                return seconds;
            }

            // Try to parse as HTTP date format
            if let Ok(http_date) = httpdate::parse_http_date(retry_after_str) {
                let now = std::time::SystemTime::now();
                if let Ok(duration) = http_date.duration_since(now) {
                    return duration.as_secs();
                }
            }
        }
    }

    DEFAULT_RETRY_AFTER
}

impl From<google_gmail1::Error> for StatementError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            // HTTP response with status code (non-success responses)
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    // Rate limiting - transient
                    429 => {
                        let retry_after = parse_retry_after_header(response);
                        StatementError::RateLimitExceeded { retry_after }
                    }
                    404 => StatementError::MessageNotFound("Resource not found".to_string()),
                    400 => StatementError::BadRequest(message),
                    403 => StatementError::Forbidden(message),
                    // Server errors - transient
                    500..=599 => StatementError::ServerError {
                        status: status_code,
                        message,
                    },
                    _ => StatementError::ApiError(message),
                }
            }
            // BadRequest variant (request not understood by server)
            google_gmail1::Error::BadRequest(ref err) => {
                StatementError::BadRequest(format!("{}", err))
            }
            // Network/connection errors - transient
            google_gmail1::Error::HttpError(ref err) => {
                StatementError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => StatementError::NetworkError(err.to_string()),
            _ => StatementError::ApiError(error.to_string()),
        }
    }
}
