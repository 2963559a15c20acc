use axum::{
    extract::Extension,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::relay::{auth::LOGIN_PATH, error::RelayError, session::Session, RelayState};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Dashboard", body = String, content_type = "text/html"),
        (status = 303, description = "No upstream session, redirect to /login")
    ),
    tag = "views"
)]
pub async fn dashboard(
    session: Session,
    state: Extension<Arc<RelayState>>,
) -> Result<Response, RelayError> {
    if !session.has_upstream_session() {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    }
    Ok(Html(state.views().dashboard()?).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::relay::handlers::test_support::{app, body_text, call};
    use anyhow::Result;
    use axum::{
        body::Body,
        http::{header::COOKIE, header::LOCATION, Request, StatusCode},
    };

    #[tokio::test]
    async fn anonymous_browser_is_sent_to_login() -> Result<()> {
        let response = call(
            app("http://127.0.0.1:9")?,
            Request::builder().uri("/").body(Body::empty())?,
        )
        .await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
        Ok(())
    }

    #[tokio::test]
    async fn signed_in_browser_sees_dashboard() -> Result<()> {
        let response = call(
            app("http://127.0.0.1:9")?,
            Request::builder()
                .uri("/")
                .header(COOKIE, "auth=authcookie_1")
                .body(Body::empty())?,
        )
        .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await?.contains("VRChat Dashboard"));
        Ok(())
    }
}
