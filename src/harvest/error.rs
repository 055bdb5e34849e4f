//! Errors raised while talking to the Harvest API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Non-success status, e.g. 401 for a bad token or 404 for an unknown account.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = HarvestError::ApiError {
            status: 401,
            message: "invalid_token".into(),
        };
        assert_eq!(err.to_string(), "API error (status 401): invalid_token");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HarvestError>();
    }
}
