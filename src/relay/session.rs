//! Cookie relay between the browser and the upstream.
//!
//! The relay does not own a session. Whatever the browser holds is forwarded
//! to the upstream, and whatever the upstream sets is passed back. The two
//! relay-owned cookies (`2fa_type`, `user_id`) are the only ones read here.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    response::{IntoResponseParts, ResponseParts},
};
use std::convert::Infallible;
use std::time::Duration;

use super::auth::{is_valid_user_id, AuthChallenge};

/// Session cookie issued by the upstream platform.
pub const UPSTREAM_SESSION_COOKIE: &str = "auth";
/// Relay-owned cookie holding the pending challenge method.
pub const CHALLENGE_COOKIE: &str = "2fa_type";
/// Relay-owned cookie holding the authenticated user's id.
pub const USER_ID_COOKIE: &str = "user_id";

/// The browser's view of the session, rebuilt from the `Cookie` header on every request.
#[derive(Debug, Clone, Default)]
pub struct Session {
    cookies: Option<HeaderValue>,
    pending_challenge: Option<AuthChallenge>,
    user_id: Option<String>,
    upstream_session: bool,
}

impl Session {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let cookies = forward_cookies(headers);
        let pending_challenge = cookie_value(headers, CHALLENGE_COOKIE)
            .and_then(|method| AuthChallenge::parse(&method));
        let user_id = cookie_value(headers, USER_ID_COOKIE).filter(|id| is_valid_user_id(id));
        let upstream_session = cookie_value(headers, UPSTREAM_SESSION_COOKIE).is_some();

        Self {
            cookies,
            pending_challenge,
            user_id,
            upstream_session,
        }
    }

    /// The `Cookie` header to attach to upstream calls.
    #[must_use]
    pub fn cookies(&self) -> Option<HeaderValue> {
        self.cookies.clone()
    }

    #[must_use]
    pub fn pending_challenge(&self) -> Option<&AuthChallenge> {
        self.pending_challenge.as_ref()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    #[must_use]
    pub const fn has_upstream_session(&self) -> bool {
        self.upstream_session
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Join every inbound `Cookie` header into one value for the upstream call.
///
/// HTTP/2 clients may split cookies across several headers; the pairs are
/// kept in order and otherwise untouched.
#[must_use]
pub fn forward_cookies(headers: &HeaderMap) -> Option<HeaderValue> {
    let mut values = headers.get_all(COOKIE).iter();
    let first = values.next()?;
    let rest: Vec<&HeaderValue> = values.collect();
    if rest.is_empty() {
        return Some(first.clone());
    }

    let mut joined = first.as_bytes().to_vec();
    for value in rest {
        joined.extend_from_slice(b"; ");
        joined.extend_from_slice(value.as_bytes());
    }
    HeaderValue::from_bytes(&joined).ok()
}

/// Value of the named cookie in the inbound request, if present.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
}

/// `Set-Cookie` values bound for the browser: upstream ones first, verbatim,
/// then any the relay minted itself.
#[derive(Debug, Clone, Default)]
pub struct SetCookies(Vec<HeaderValue>);

impl SetCookies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every `Set-Cookie` from an upstream response.
    pub fn relay<'a>(&mut self, upstream: impl IntoIterator<Item = &'a HeaderValue>) {
        self.0.extend(upstream.into_iter().cloned());
    }

    pub fn push(&mut self, cookie: HeaderValue) {
        self.0.push(cookie);
    }

    #[must_use]
    pub fn as_slice(&self) -> &[HeaderValue] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoResponseParts for SetCookies {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for cookie in self.0 {
            res.headers_mut().append(SET_COOKIE, cookie);
        }
        Ok(res)
    }
}

/// Mints the relay-owned cookies.
#[derive(Debug, Clone, Copy)]
pub struct CookieMinter {
    secure: bool,
    user_id_ttl: Duration,
}

impl CookieMinter {
    #[must_use]
    pub const fn new(secure: bool, user_id_ttl: Duration) -> Self {
        Self {
            secure,
            user_id_ttl,
        }
    }

    /// Session-scoped cookie recording the pending challenge method.
    ///
    /// # Errors
    /// Returns an error if the method is not a valid cookie value.
    pub fn challenge(&self, challenge: &AuthChallenge) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(CHALLENGE_COOKIE, &challenge.method, None)
    }

    /// Expire the challenge cookie once the challenge is satisfied.
    ///
    /// # Errors
    /// Returns an error if the header value cannot be built.
    pub fn clear_challenge(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(CHALLENGE_COOKIE, "", Some(0))
    }

    /// Long-lived cookie carrying the authenticated user's id.
    ///
    /// # Errors
    /// Returns an error if the id is not a valid cookie value.
    pub fn user_id(&self, user_id: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(USER_ID_COOKIE, user_id, Some(self.user_id_ttl.as_secs()))
    }

    fn build(
        &self,
        name: &str,
        value: &str,
        max_age: Option<u64>,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}
