//! # vrcrelay (VRChat session relay)
//!
//! `vrcrelay` is a small browser-facing relay in front of the VRChat REST API.
//! It turns a username/password form into an upstream session, walks the
//! browser through the two-factor challenge when the platform asks for one,
//! and then renders a friends list and the group instances the user can join.
//!
//! ## Sessions
//!
//! The relay keeps no session table. Every cookie the browser sends is
//! forwarded to the upstream on each call, and every `Set-Cookie` the upstream
//! returns is re-emitted to the browser verbatim. The only cookies minted by the
//! relay itself are:
//!
//! - `2fa_type`: the pending challenge method (session-scoped).
//! - `user_id`: the authenticated user's identifier (30 days by default).
//!
//! ## Failure model
//!
//! Upstream calls are never retried. A transport failure (DNS, TLS, timeout)
//! surfaces as `503 Service Unavailable`; an upstream body that does not decode
//! surfaces as `500 Internal Server Error`.

pub mod cli;
pub mod relay;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
