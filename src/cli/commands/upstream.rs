use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::relay::DEFAULT_UPSTREAM_URL;

pub const ARG_UPSTREAM_URL: &str = "upstream-url";
pub const ARG_UPSTREAM_TIMEOUT_SECONDS: &str = "upstream-timeout-seconds";
pub const ARG_USER_AGENT: &str = "user-agent";
pub const ARG_USER_COOKIE_TTL_DAYS: &str = "user-cookie-ttl-days";
pub const ARG_SECURE_COOKIES: &str = "secure-cookies";

#[derive(Debug, Clone)]
pub struct Options {
    pub url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub user_cookie_ttl_days: u64,
    pub secure_cookies: bool,
}

impl Options {
    /// Parse upstream and cookie arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            url: read_required(ARG_UPSTREAM_URL)?,
            timeout_seconds: matches
                .get_one::<u64>(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(30),
            user_agent: read_required(ARG_USER_AGENT)?,
            user_cookie_ttl_days: matches
                .get_one::<u64>(ARG_USER_COOKIE_TTL_DAYS)
                .copied()
                .unwrap_or(30),
            secure_cookies: matches.get_flag(ARG_SECURE_COOKIES),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_UPSTREAM_URL)
                .long(ARG_UPSTREAM_URL)
                .help("Base URL of the upstream API")
                .env("VRCRELAY_UPSTREAM_URL")
                .default_value(DEFAULT_UPSTREAM_URL),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .long(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .help("Timeout for each upstream request in seconds")
                .env("VRCRELAY_UPSTREAM_TIMEOUT_SECONDS")
                .default_value("30")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_USER_AGENT)
                .long(ARG_USER_AGENT)
                .help("User-Agent sent to the upstream to identify the relay")
                .env("VRCRELAY_USER_AGENT")
                .default_value(crate::APP_USER_AGENT),
        )
        .arg(
            Arg::new(ARG_USER_COOKIE_TTL_DAYS)
                .long(ARG_USER_COOKIE_TTL_DAYS)
                .help("Lifetime of the user_id cookie in days")
                .env("VRCRELAY_USER_COOKIE_TTL_DAYS")
                .default_value("30")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SECURE_COOKIES)
                .long(ARG_SECURE_COOKIES)
                .help("Mark relay cookies Secure (serve the relay over HTTPS)")
                .env("VRCRELAY_SECURE_COOKIES")
                .action(ArgAction::SetTrue),
        )
}
