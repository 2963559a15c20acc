use axum::{
    extract::Extension,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::relay::{
    error::RelayError,
    models::{sort_by_status, Friend},
    session::{Session, SetCookies, UPSTREAM_SESSION_COOKIE},
    upstream::UpstreamRequest,
    RelayState,
};

const FRIENDS_PAGE_SIZE: &str = "100";

#[utoipa::path(
    get,
    path = "/friends",
    responses(
        (status = 200, description = "Friends sorted by presence", body = String, content_type = "text/html"),
        (status = 401, description = "No upstream session cookie"),
        (status = 503, description = "Upstream unreachable")
    ),
    tag = "views"
)]
pub async fn friends(session: Session, state: Extension<Arc<RelayState>>) -> Response {
    if !session.has_upstream_session() {
        return RelayError::MissingSession(UPSTREAM_SESSION_COOKIE).into_response();
    }

    let request = UpstreamRequest::get(&["auth", "user", "friends"])
        .with_query("n", FRIENDS_PAGE_SIZE)
        .with_cookies(session.cookies());
    let response = match state.client().send(request).await {
        Ok(response) => response,
        Err(err) => return err.into_response(),
    };

    let mut cookies = SetCookies::new();
    cookies.relay(response.set_cookies());

    let page = serde_json::from_slice::<Vec<Friend>>(&response.body)
        .map_err(RelayError::from)
        .and_then(|mut friends| {
            debug!("rendering {} friends", friends.len());
            sort_by_status(&mut friends);
            state.views().friends(&friends).map_err(RelayError::from)
        });

    match page {
        Ok(html) => (cookies, Html(html)).into_response(),
        Err(err) => (cookies, err).into_response(),
    }
}
