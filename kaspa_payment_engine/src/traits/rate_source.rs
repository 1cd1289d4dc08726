use thiserror::Error;

// Field is named source_name rather than source: thiserror reserves `source` for the error cause.
#[derive(Debug, Clone, Error)]
pub enum RateSourceFailure {
    #[error("Rate source {source_name} failed: {message}")]
    FetchError { source_name: String, message: String },
    #[error("Rate source {source_name} returned an unusable rate: {message}")]
    InvalidRate { source_name: String, message: String },
}

/// One upstream price API. The oracle holds an ordered list of these and tries them in priority
/// order until one succeeds.
#[allow(async_fn_in_trait)]
pub trait RateSource {
    fn name(&self) -> &str;

    /// The current fiat-per-KAS rate. Implementations must reject non-positive values themselves.
    async fn fetch_rate(&self) -> Result<f64, RateSourceFailure>;
}
