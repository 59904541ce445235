use thiserror::Error;

use crate::response::ResponseType;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unreachable: {0}")]
    Unreachable(String),

    #[error("Response for {url} is {response_type} and cannot be read")]
    Unreadable {
        url: String,
        response_type: ResponseType,
    },

    #[error("Status {status} for {url}: {body}")]
    BadStatus {
        url: String,
        status: u16,
        body: String,
    },
}

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl FetchError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(url: &str, status: u16, body: &[u8]) -> Self {
        let body = String::from_utf8_lossy(body);
        FetchError::BadStatus {
            url: url.to_string(),
            status,
            body: Self::truncate_body(&body),
        }
    }
}
