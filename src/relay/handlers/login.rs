use axum::{
    extract::Extension,
    response::{Html, IntoResponse},
    Form,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::relay::{
    credentials::Credentials, error::RelayError, session::Session, RelayState,
};

/// Missing fields are read as empty strings and still sent upstream.
#[derive(ToSchema, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Credential form", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn login_form(
    state: Extension<Arc<RelayState>>,
) -> Result<impl IntoResponse, RelayError> {
    Ok(Html(state.views().login()?))
}

#[utoipa::path(
    post,
    path = "/auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to /2fa when a challenge is required, else to /"),
        (status = 500, description = "Upstream response was neither a challenge nor a user"),
        (status = 502, description = "Upstream returned an unusable challenge method or user id"),
        (status = 503, description = "Upstream unreachable")
    ),
    tag = "auth"
)]
pub async fn authenticate(
    session: Session,
    state: Extension<Arc<RelayState>>,
    Form(form): Form<LoginForm>,
) -> impl IntoResponse {
    let credentials = Credentials::new(form.username, SecretString::from(form.password));
    state
        .authenticator()
        .login(&credentials, &session)
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::relay::credentials::encode;
    use crate::relay::handlers::test_support::{app, body_text, call, can_bind_localhost, set_cookies};
    use anyhow::Result;
    use axum::{
        body::Body,
        http::{
            header::{CONTENT_TYPE, COOKIE, LOCATION},
            Request, StatusCode,
        },
    };
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn login_request(cookie: Option<&str>) -> Result<Request<Body>> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/auth")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        Ok(builder.body(Body::from("username=alice&password=p%3Ass+word"))?)
    }

    #[tokio::test]
    async fn login_form_posts_to_auth() -> Result<()> {
        let response = call(
            app("http://127.0.0.1:9")?,
            Request::builder().uri("/login").body(Body::empty())?,
        )
        .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await?.contains(r#"action="/auth""#));
        Ok(())
    }

    #[tokio::test]
    async fn challenge_response_sets_2fa_cookie_and_redirects() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let token = format!("Basic {}", encode("alice", "p:ss word"));
        Mock::given(method("GET"))
            .and(path("/api/1/auth/user"))
            .and(header("authorization", token.as_str()))
            .and(header("cookie", "apiKey=xyz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "auth=authcookie_1; Path=/; HttpOnly")
                    .set_body_json(json!({ "requiresTwoFactorAuth": ["emailOtp"] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = call(app(&server.uri())?, login_request(Some("apiKey=xyz"))?).await?;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/2fa");
        let cookies = set_cookies(&response);
        assert_eq!(cookies[0], "auth=authcookie_1; Path=/; HttpOnly");
        assert!(cookies.iter().any(|c| c.starts_with("2fa_type=emailOtp;")));
        assert!(!cookies.iter().any(|c| c.starts_with("user_id=")));
        Ok(())
    }

    #[tokio::test]
    async fn user_response_sets_user_id_cookie_and_redirects_home() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1/auth/user"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "auth=authcookie_2; Path=/")
                    .set_body_json(json!({
                        "id": "123",
                        "bio": "hello",
                        "activeFriends": ["usr_2"]
                    })),
            )
            .mount(&server)
            .await;

        let response = call(app(&server.uri())?, login_request(None)?).await?;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
        let cookies = set_cookies(&response);
        assert_eq!(cookies[0], "auth=authcookie_2; Path=/");
        let user_cookie = cookies
            .iter()
            .find(|c| c.starts_with("user_id=123;"))
            .unwrap();
        assert!(user_cookie.contains("Max-Age=2592000"));
        assert!(!cookies.iter().any(|c| c.starts_with("2fa_type=")));
        Ok(())
    }

    #[tokio::test]
    async fn unrecognised_response_is_500_without_user_id() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1/auth/user"))
            .respond_with(
                ResponseTemplate::new(401)
                    .append_header("set-cookie", "auth=partial; Path=/")
                    .set_body_json(json!({
                        "error": { "message": "Invalid Username/Email or Password", "status_code": 401 }
                    })),
            )
            .mount(&server)
            .await;

        let response = call(app(&server.uri())?, login_request(None)?).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let cookies = set_cookies(&response);
        assert_eq!(cookies, vec!["auth=partial; Path=/".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn unusable_user_id_is_rejected_without_user_cookie() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        for id in ["", "usr_1; Domain=evil.example; Max-Age=99999999"] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/1/auth/user"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .append_header("set-cookie", "auth=authcookie_3; Path=/")
                        .set_body_json(json!({ "id": id })),
                )
                .mount(&server)
                .await;

            let response = call(app(&server.uri())?, login_request(None)?).await?;

            assert_eq!(response.status(), StatusCode::BAD_GATEWAY, "id {id:?}");
            assert!(response.headers().get(LOCATION).is_none());
            let cookies = set_cookies(&response);
            assert_eq!(cookies, vec!["auth=authcookie_3; Path=/".to_string()]);
        }
        Ok(())
    }

    #[tokio::test]
    async fn missing_password_is_sent_as_empty() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let token = format!("Basic {}", encode("alice", ""));
        Mock::given(method("GET"))
            .and(path("/api/1/auth/user"))
            .and(header("authorization", token.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "usr_1" })))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::builder()
            .method("POST")
            .uri("/auth")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=alice"))?;
        let response = call(app(&server.uri())?, request).await?;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_upstream_is_503() -> Result<()> {
        let port = {
            let Ok(listener) = std::net::TcpListener::bind("127.0.0.1:0") else {
                eprintln!("Skipping test: cannot bind localhost");
                return Ok(());
            };
            listener.local_addr()?.port()
        };
        let response = call(
            app(&format!("http://127.0.0.1:{port}"))?,
            login_request(None)?,
        )
        .await?;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(set_cookies(&response).is_empty());
        Ok(())
    }
}
