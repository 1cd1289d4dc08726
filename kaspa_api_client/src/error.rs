use thiserror::Error;

#[derive(Debug, Error)]
pub enum KaspaApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request to indexer failed: {0}")]
    RequestError(String),
    #[error("Indexer query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not deserialize indexer response: {0}")]
    JsonError(String),
}

// Field is named source_name rather than source: thiserror reserves `source` for the error cause.
#[derive(Debug, Error)]
pub enum RateSourceError {
    #[error("Could not initialize rate client: {0}")]
    Initialization(String),
    #[error("Rate source {source_name} request failed: {message}")]
    RequestError { source_name: String, message: String },
    #[error("Rate source {source_name} returned HTTP {status}")]
    StatusError { source_name: String, status: u16 },
    #[error("Rate source {source_name} response could not be parsed: {message}")]
    ParseError { source_name: String, message: String },
}
