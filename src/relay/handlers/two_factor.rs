use axum::{
    extract::Extension,
    response::{Html, IntoResponse},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::relay::{error::RelayError, session::Session, RelayState};

#[derive(ToSchema, Deserialize)]
pub struct VerifyForm {
    /// Challenge method, e.g. `emailOtp` or `totp`.
    #[serde(rename = "type", default)]
    method: String,
    #[serde(default)]
    code: String,
}

impl std::fmt::Debug for VerifyForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyForm")
            .field("method", &self.method)
            .field("code", &"***")
            .finish()
    }
}

#[utoipa::path(
    get,
    path = "/2fa",
    responses(
        (status = 200, description = "Code form for the pending challenge", body = String, content_type = "text/html"),
        (status = 400, description = "No challenge is pending")
    ),
    tag = "auth"
)]
pub async fn challenge_form(
    session: Session,
    state: Extension<Arc<RelayState>>,
) -> Result<impl IntoResponse, RelayError> {
    let challenge = session
        .pending_challenge()
        .ok_or(RelayError::NoPendingChallenge)?;
    Ok(Html(state.views().challenge(&challenge.method)?))
}

#[utoipa::path(
    post,
    path = "/verify2fa",
    request_body(content = VerifyForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to / when verified, back to /2fa when rejected"),
        (status = 400, description = "No pending challenge, or the method does not match it"),
        (status = 503, description = "Upstream unreachable")
    ),
    tag = "auth"
)]
pub async fn verify(
    session: Session,
    state: Extension<Arc<RelayState>>,
    Form(form): Form<VerifyForm>,
) -> impl IntoResponse {
    state
        .authenticator()
        .verify(&form.method, &form.code, &session)
        .await
}
