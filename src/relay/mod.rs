use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub mod auth;
pub mod credentials;
pub mod error;
pub(crate) mod handlers;
pub mod models;
mod openapi;
pub mod session;
pub mod upstream;
pub mod views;

pub use openapi::openapi;

use self::{session::CookieMinter, upstream::UpstreamClient, views::Views};

pub const DEFAULT_UPSTREAM_URL: &str = "https://vrchat.com/api/1/";
const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_USER_COOKIE_TTL_DAYS: u64 = 30;

#[derive(Clone, Debug)]
pub struct RelayConfig {
    upstream_url: Url,
    upstream_timeout: Duration,
    user_agent: String,
    user_cookie_ttl: Duration,
    secure_cookies: bool,
}

impl RelayConfig {
    #[must_use]
    pub fn new(upstream_url: Url) -> Self {
        Self {
            upstream_url,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECONDS),
            user_agent: crate::APP_USER_AGENT.to_string(),
            user_cookie_ttl: Duration::from_secs(DEFAULT_USER_COOKIE_TTL_DAYS * 24 * 60 * 60),
            secure_cookies: false,
        }
    }

    #[must_use]
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    #[must_use]
    pub fn with_user_cookie_ttl_days(mut self, days: u64) -> Self {
        self.user_cookie_ttl = Duration::from_secs(days.saturating_mul(24 * 60 * 60));
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn upstream_url(&self) -> &Url {
        &self.upstream_url
    }

    #[must_use]
    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn user_cookie_ttl(&self) -> Duration {
        self.user_cookie_ttl
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

/// Read-only state shared by every request handler.
#[derive(Debug)]
pub struct RelayState {
    client: UpstreamClient,
    views: Views,
    minter: CookieMinter,
}

impl RelayState {
    /// Build the upstream client and compile the page templates.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built or a template is malformed.
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = UpstreamClient::new(config).context("Failed to build upstream client")?;
        let views = Views::new().context("Failed to compile page templates")?;
        let minter = CookieMinter::new(config.secure_cookies(), config.user_cookie_ttl());
        Ok(Self {
            client,
            views,
            minter,
        })
    }

    #[must_use]
    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    #[must_use]
    pub fn views(&self) -> &Views {
        &self.views
    }

    #[must_use]
    pub fn authenticator(&self) -> auth::Authenticator<'_> {
        auth::Authenticator::new(&self.client, self.minter)
    }
}

/// All browser-facing routes, with the shared state attached.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/", get(handlers::root::dashboard))
        .route("/login", get(handlers::login::login_form))
        .route("/auth", post(handlers::login::authenticate))
        .route("/2fa", get(handlers::two_factor::challenge_form))
        .route("/verify2fa", post(handlers::two_factor::verify))
        .route("/friends", get(handlers::friends::friends))
        .route("/groups", get(handlers::groups::groups))
        .route("/health", get(handlers::health::health))
        .route("/openapi.json", get(handlers::openapi_json))
        .layer(Extension(state))
}

/// Start the relay
/// # Errors
/// Return error if the state cannot be built or the listener fails
pub async fn new(port: u16, config: RelayConfig) -> Result<()> {
    let state = Arc::new(RelayState::new(&config)?);

    info!(
        "Relaying to {} (timeout {}s)",
        config.upstream_url(),
        config.upstream_timeout().as_secs()
    );

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}
