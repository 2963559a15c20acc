use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum RelayError {
    /// The upstream could not be reached (DNS, TCP, TLS, timeout).
    #[error("upstream transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    /// The upstream answered with a body that is not the expected shape.
    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("missing session cookie: {0}")]
    MissingSession(&'static str),
    #[error("no two-factor challenge is pending")]
    NoPendingChallenge,
    #[error("challenge method {submitted:?} does not match pending method {pending:?}")]
    ChallengeMismatch { pending: String, submitted: String },
    /// The upstream asked for a challenge method the relay cannot carry.
    #[error("invalid challenge method: {0:?}")]
    InvalidChallenge(String),
    /// The upstream returned a user id that cannot be stored in a cookie.
    #[error("invalid user id: {0:?}")]
    InvalidUser(String),
    #[error("failed to render page: {0}")]
    Render(#[from] crate::relay::views::TemplateError),
    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid header value: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderValue),
}

impl RelayError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::MissingSession(_) => StatusCode::UNAUTHORIZED,
            Self::NoPendingChallenge | Self::ChallengeMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidChallenge(_) | Self::InvalidUser(_) => StatusCode::BAD_GATEWAY,
            Self::Decode(_) | Self::Render(_) | Self::Url(_) | Self::Header(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::Transport(_) => "Upstream unavailable, try again",
            Self::Decode(_) => "Error parsing upstream response",
            Self::MissingSession(_) => "Not signed in",
            Self::NoPendingChallenge => "No 2FA type specified",
            Self::ChallengeMismatch { .. } => "2FA type does not match the pending challenge",
            Self::InvalidChallenge(_) => "Unsupported 2FA method",
            Self::InvalidUser(_) => "Unsupported user id",
            Self::Render(_) => "Error rendering page",
            Self::Url(_) | Self::Header(_) => "Internal error",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        (status, self.public_message()).into_response()
    }
}
