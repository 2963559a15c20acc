use crate::cli::{
    actions::{server::Args, Action},
    commands::upstream,
};
use anyhow::Result;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let upstream = upstream::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        upstream_url: upstream.url,
        upstream_timeout_seconds: upstream.timeout_seconds,
        user_agent: upstream.user_agent,
        user_cookie_ttl_days: upstream.user_cookie_ttl_days,
        secure_cookies: upstream.secure_cookies,
    }))
}
