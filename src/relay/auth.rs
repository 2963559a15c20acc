//! Login state machine: `Anonymous -> Challenged -> Authenticated`.
//!
//! State lives only in the cookies the browser holds. Each transition makes a
//! single upstream call, relays its `Set-Cookie` headers, mints the relay-owned
//! cookies and tells the browser where to go next.

use axum::{
    http::header::AUTHORIZATION,
    response::{IntoResponse, Redirect, Response},
};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, instrument, warn};

use super::{
    credentials::Credentials,
    error::RelayError,
    models::{TwoFactorRequired, User, VerifyCode},
    session::{CookieMinter, Session, SetCookies},
    upstream::{UpstreamClient, UpstreamRequest},
};

pub const DASHBOARD_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const CHALLENGE_PATH: &str = "/2fa";

static METHOD_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").ok());

static USER_ID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").ok());

/// A user id is carried in the `user_id` cookie and in upstream paths, so it
/// must be non-empty and free of cookie separators.
#[must_use]
pub fn is_valid_user_id(id: &str) -> bool {
    USER_ID.as_ref().is_some_and(|re| re.is_match(id))
}

/// A secondary verification the upstream requires, e.g. `emailOtp` or `totp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub method: String,
}

impl AuthChallenge {
    /// Accept a method name only if it is safe to carry in a cookie and a path segment.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        let valid = METHOD_NAME
            .as_ref()
            .is_some_and(|re| re.is_match(method));
        valid.then(|| Self {
            method: method.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Challenged(AuthChallenge),
    Authenticated,
}

impl AuthState {
    /// Where the browser is sent after reaching this state.
    #[must_use]
    pub const fn landing_path(&self) -> &'static str {
        match self {
            Self::Anonymous => LOGIN_PATH,
            Self::Challenged(_) => CHALLENGE_PATH,
            Self::Authenticated => DASHBOARD_PATH,
        }
    }
}

/// Result of a speculative decode: the body either has the shape or it does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    NotMatched,
    Matched(T),
}

/// Check whether a login response asks for a second factor.
///
/// Any decode failure or an empty method list is `NotMatched`, never an error.
/// An unusable method name is an error: the browser cannot be sent to a challenge
/// the relay cannot carry.
///
/// # Errors
/// Returns `RelayError::InvalidChallenge` if the first method name is unsafe.
pub fn probe_challenge(body: &[u8]) -> Result<Probe<AuthChallenge>, RelayError> {
    let Ok(shape) = serde_json::from_slice::<TwoFactorRequired>(body) else {
        return Ok(Probe::NotMatched);
    };
    let Some(method) = shape.requires_two_factor_auth.into_iter().next() else {
        return Ok(Probe::NotMatched);
    };
    AuthChallenge::parse(&method)
        .map(Probe::Matched)
        .ok_or(RelayError::InvalidChallenge(method))
}

/// Decide the outcome of a login probe from its body alone.
///
/// # Errors
/// Returns `RelayError::Decode` if the body is neither a challenge nor a user record,
/// and `RelayError::InvalidUser` if the user id cannot be stored in a cookie.
pub fn login_outcome(body: &[u8]) -> Result<LoginOutcome, RelayError> {
    if let Probe::Matched(challenge) = probe_challenge(body)? {
        return Ok(LoginOutcome::Challenged(challenge));
    }
    let user: User = serde_json::from_slice(body)?;
    if !is_valid_user_id(&user.id) {
        return Err(RelayError::InvalidUser(user.id));
    }
    Ok(LoginOutcome::Authenticated(user))
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Challenged(AuthChallenge),
    Authenticated(User),
}

/// One step of the state machine: the cookies bound for the browser and
/// either the state reached or the failure that stopped the request.
///
/// Cookies relayed before a failure are still sent, so the browser keeps
/// whatever the upstream already issued.
#[derive(Debug)]
pub struct Transition {
    cookies: SetCookies,
    result: Result<AuthState, RelayError>,
}

impl Transition {
    fn failed(cookies: SetCookies, error: RelayError) -> Self {
        Self {
            cookies,
            result: Err(error),
        }
    }

    fn reached(cookies: SetCookies, state: AuthState) -> Self {
        Self {
            cookies,
            result: Ok(state),
        }
    }

    #[must_use]
    pub fn cookies(&self) -> &SetCookies {
        &self.cookies
    }

    #[must_use]
    pub fn state(&self) -> Option<&AuthState> {
        self.result.as_ref().ok()
    }

    #[must_use]
    pub fn error(&self) -> Option<&RelayError> {
        self.result.as_ref().err()
    }
}

impl IntoResponse for Transition {
    fn into_response(self) -> Response {
        match self.result {
            Ok(state) => (self.cookies, Redirect::to(state.landing_path())).into_response(),
            Err(error) => (self.cookies, error).into_response(),
        }
    }
}

/// The login and challenge transitions, bound to one upstream client.
#[derive(Debug, Clone)]
pub struct Authenticator<'a> {
    client: &'a UpstreamClient,
    minter: CookieMinter,
}

impl<'a> Authenticator<'a> {
    #[must_use]
    pub const fn new(client: &'a UpstreamClient, minter: CookieMinter) -> Self {
        Self { client, minter }
    }

    /// `Anonymous -> {Challenged | Authenticated}`.
    #[instrument(skip_all, fields(username = credentials.username()))]
    pub async fn login(&self, credentials: &Credentials, session: &Session) -> Transition {
        let mut cookies = SetCookies::new();

        let authorization = match credentials.authorization() {
            Ok(value) => value,
            Err(err) => return Transition::failed(cookies, err.into()),
        };
        let request = UpstreamRequest::get(&["auth", "user"])
            .with_header(AUTHORIZATION, authorization)
            .with_cookies(session.cookies());

        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(err) => return Transition::failed(cookies, err),
        };
        cookies.relay(response.set_cookies());
        debug!("login probe returned {}", response.status);

        match login_outcome(&response.body) {
            Ok(LoginOutcome::Challenged(challenge)) => match self.minter.challenge(&challenge) {
                Ok(cookie) => {
                    info!("login requires two-factor method {}", challenge.method);
                    cookies.push(cookie);
                    Transition::reached(cookies, AuthState::Challenged(challenge))
                }
                Err(err) => Transition::failed(cookies, err.into()),
            },
            Ok(LoginOutcome::Authenticated(user)) => match self.minter.user_id(&user.id) {
                Ok(cookie) => {
                    info!("login authenticated user {}", user.id);
                    cookies.push(cookie);
                    Transition::reached(cookies, AuthState::Authenticated)
                }
                Err(err) => Transition::failed(cookies, err.into()),
            },
            Err(err) => Transition::failed(cookies, err),
        }
    }

    /// `Challenged -> Authenticated`.
    ///
    /// The submitted method must match the pending challenge recorded in the
    /// browser's `2fa_type` cookie, which `Session` has already validated.
    /// Upstream cookies are always relayed; a non-success verification leaves
    /// the browser on the challenge page.
    #[instrument(skip_all, fields(method = submitted_method))]
    pub async fn verify(&self, submitted_method: &str, code: &str, session: &Session) -> Transition {
        let mut cookies = SetCookies::new();

        let Some(pending) = session.pending_challenge() else {
            return Transition::failed(cookies, RelayError::NoPendingChallenge);
        };
        if pending.method != submitted_method {
            return Transition::failed(
                cookies,
                RelayError::ChallengeMismatch {
                    pending: pending.method.clone(),
                    submitted: submitted_method.to_string(),
                },
            );
        }
        let challenge = pending.clone();

        let request = match UpstreamRequest::post(&[
            "auth",
            "twofactorauth",
            challenge.method.as_str(),
            "verify",
        ])
        .with_cookies(session.cookies())
        .with_json(&VerifyCode { code })
        {
            Ok(request) => request,
            Err(err) => return Transition::failed(cookies, err),
        };

        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(err) => return Transition::failed(cookies, err),
        };
        cookies.relay(response.set_cookies());

        if !response.status.is_success() {
            warn!(
                "two-factor verification for {} rejected with {}",
                challenge.method, response.status
            );
            return Transition::reached(cookies, AuthState::Challenged(challenge));
        }

        match self.minter.clear_challenge() {
            Ok(cookie) => {
                cookies.push(cookie);
                info!("two-factor verification for {} accepted", challenge.method);
                Transition::reached(cookies, AuthState::Authenticated)
            }
            Err(err) => Transition::failed(cookies, err.into()),
        }
    }
}
