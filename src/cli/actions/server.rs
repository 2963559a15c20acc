use crate::relay::{self, RelayConfig};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub upstream_url: String,
    pub upstream_timeout_seconds: u64,
    pub user_agent: String,
    pub user_cookie_ttl_days: u64,
    pub secure_cookies: bool,
}

impl Args {
    /// Turn the parsed arguments into the relay configuration.
    ///
    /// # Errors
    /// Returns an error if the upstream URL is invalid.
    pub fn config(&self) -> Result<RelayConfig> {
        let upstream_url = Url::parse(&self.upstream_url)
            .with_context(|| format!("Invalid upstream URL: {}", self.upstream_url))?;
        if upstream_url.cannot_be_a_base() {
            anyhow::bail!("Upstream URL must be hierarchical: {}", self.upstream_url);
        }

        Ok(RelayConfig::new(upstream_url)
            .with_upstream_timeout(Duration::from_secs(self.upstream_timeout_seconds))
            .with_user_agent(self.user_agent.clone())
            .with_user_cookie_ttl_days(self.user_cookie_ttl_days)
            .with_secure_cookies(self.secure_cookies))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.config()?;

    debug!("Relay config: {:?}", config);

    relay::new(args.port, config).await
}
