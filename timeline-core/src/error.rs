use serde_json::Value;
use thiserror::Error;

/// Errors raised by the API clients and the grid controller.
///
/// `Clone` because one in-flight fetch can be awaited by several callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("catalog has more than {0} pages")]
    PageLimit(usize),
}

impl ApiError {
    /// Builds a `Remote` error, preferring the message carried in the response body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| {
                ["error", "detail", "message"]
                    .iter()
                    .find_map(|field| value.get(*field).and_then(Value::as_str))
                    .map(str::to_string)
            })
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP error! status: {}", status));

        ApiError::Remote { status, message }
    }

    /// Text shown in the error banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Remote { message, .. } => message.clone(),
            ApiError::Network(_) => "The reservation service is unreachable.".to_string(),
            ApiError::Decode(_) => "The reservation service sent an unexpected response.".to_string(),
            ApiError::InvalidArgument(reason) => reason.clone(),
            ApiError::PageLimit(limit) => {
                format!("Too many objects to display (more than {} pages).", limit)
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::from_status(status.as_u16(), "")
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::InvalidArgument(format!("invalid url: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_message_comes_from_body() {
        let err = ApiError::from_status(400, r#"{"error": "start is after end"}"#);
        assert_eq!(
            err,
            ApiError::Remote {
                status: 400,
                message: "start is after end".to_string()
            }
        );

        let err = ApiError::from_status(404, r#"{"detail": "Not found."}"#);
        assert_eq!(err.user_message(), "Not found.");
    }

    #[test]
    fn remote_message_falls_back_to_status() {
        for body in ["", "<html>oops</html>", r#"{"error": ""}"#, r#"{"other": 1}"#] {
            let err = ApiError::from_status(502, body);
            assert_eq!(err.to_string(), "HTTP error! status: 502");
        }
    }
}
