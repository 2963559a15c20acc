use axum::{
    extract::Extension,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::relay::{
    error::RelayError,
    models::GroupInstances,
    session::{Session, SetCookies, USER_ID_COOKIE},
    upstream::UpstreamRequest,
    RelayState,
};

#[utoipa::path(
    get,
    path = "/groups",
    responses(
        (status = 200, description = "Group instances the user can join", body = String, content_type = "text/html"),
        (status = 401, description = "No user_id cookie"),
        (status = 503, description = "Upstream unreachable")
    ),
    tag = "views"
)]
pub async fn groups(session: Session, state: Extension<Arc<RelayState>>) -> Response {
    let Some(user_id) = session.user_id() else {
        return RelayError::MissingSession(USER_ID_COOKIE).into_response();
    };

    // Trailing empty segment keeps the upstream's trailing slash.
    let request = UpstreamRequest::get(&["users", user_id, "instances", "groups", ""])
        .with_cookies(session.cookies());
    let response = match state.client().send(request).await {
        Ok(response) => response,
        Err(err) => return err.into_response(),
    };

    let mut cookies = SetCookies::new();
    cookies.relay(response.set_cookies());

    let page = serde_json::from_slice::<GroupInstances>(&response.body)
        .map_err(RelayError::from)
        .and_then(|groups| {
            debug!(
                "rendering {} instances fetched at {}",
                groups.instances.len(),
                groups.fetched_at
            );
            state.views().groups(&groups).map_err(RelayError::from)
        });

    match page {
        Ok(html) => (cookies, Html(html)).into_response(),
        Err(err) => (cookies, err).into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::relay::handlers::test_support::{app, body_text, call, can_bind_localhost};
    use anyhow::Result;
    use axum::{
        body::Body,
        http::{header::COOKIE, Request, StatusCode},
    };
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn missing_user_id_is_401() -> Result<()> {
        let response = call(
            app("http://127.0.0.1:9")?,
            Request::builder()
                .uri("/groups")
                .header(COOKIE, "auth=a")
                .body(Body::empty())?,
        )
        .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn instances_are_rendered_for_user() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1/users/usr_42/instances/groups/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fetchedAt": "2024-05-01T12:00:00.000Z",
                "instances": [{
                    "id": "wrld_1:12345~group(grp_1)",
                    "groupAccessType": "public",
                    "userCount": 7,
                    "capacity": 40,
                    "photonRegion": "jp",
                    "world": {
                        "name": "Tea House",
                        "authorName": "Ann",
                        "description": "Quiet <chat>",
                        "thumbnailImageUrl": "https://img/tea.png"
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = call(
            app(&server.uri())?,
            Request::builder()
                .uri("/groups")
                .header(COOKIE, "auth=a; user_id=usr_42")
                .body(Body::empty())?,
        )
        .await?;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await?;
        assert!(body.contains("Tea House @ jp"));
        assert!(body.contains("7 / 40"));
        assert!(body.contains("Quiet &lt;chat&gt;"));
        Ok(())
    }

    #[tokio::test]
    async fn not_implemented_body_is_500_not_a_crash() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1/users/usr_42/instances/groups/"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"error":"The endpoint you're looking for is not implemented by our system.","status_code":404}"#,
            ))
            .mount(&server)
            .await;

        let response = call(
            app(&server.uri())?,
            Request::builder()
                .uri("/groups")
                .header(COOKIE, "user_id=usr_42")
                .body(Body::empty())?,
        )
        .await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }
}
