//! HTML pages served to the browser.
//!
//! Every template is compiled once when the relay starts and shared read-only
//! between requests; handlers only pass in values.

mod template;

pub use template::{Template, TemplateError, Value};

use url::Url;

use super::models::{Friend, GroupInstances};

const DASHBOARD: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/dashboard.html"));
const LOGIN: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/login.html"));
const CHALLENGE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/challenge.html"));
const FRIENDS: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/friends.html"));
const FRIEND_CARD: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/friend_card.html"));
const GROUPS: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/groups.html"));
const INSTANCE_ROW: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/instance_row.html"));

/// Upstream image URLs are rendered only when they are absolute `http(s)` URLs;
/// anything else becomes an empty `src`.
fn image_url(raw: &str) -> &str {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => raw,
        _ => "",
    }
}

#[derive(Debug, Clone)]
pub struct Views {
    dashboard: Template,
    login: Template,
    challenge: Template,
    friends: Template,
    friend_card: Template,
    groups: Template,
    instance_row: Template,
}

impl Views {
    /// Compile all page templates.
    ///
    /// # Errors
    /// Returns an error if any bundled template is malformed.
    pub fn new() -> Result<Self, TemplateError> {
        Ok(Self {
            dashboard: Template::compile(DASHBOARD)?,
            login: Template::compile(LOGIN)?,
            challenge: Template::compile(CHALLENGE)?,
            friends: Template::compile(FRIENDS)?,
            friend_card: Template::compile(FRIEND_CARD)?,
            groups: Template::compile(GROUPS)?,
            instance_row: Template::compile(INSTANCE_ROW)?,
        })
    }

    /// # Errors
    /// Returns an error if the template has unfilled slots.
    pub fn dashboard(&self) -> Result<String, TemplateError> {
        self.dashboard.render(&[])
    }

    /// # Errors
    /// Returns an error if the template has unfilled slots.
    pub fn login(&self) -> Result<String, TemplateError> {
        self.login.render(&[])
    }

    /// # Errors
    /// Returns an error if the template has unfilled slots.
    pub fn challenge(&self, method: &str) -> Result<String, TemplateError> {
        self.challenge.render(&[("method", Value::Text(method))])
    }

    /// Render the friends page. Friends are shown in the order given; offline
    /// friends are left out.
    ///
    /// # Errors
    /// Returns an error if a template has unfilled slots.
    pub fn friends(&self, friends: &[Friend]) -> Result<String, TemplateError> {
        let mut cards = String::new();
        for friend in friends.iter().filter(|friend| friend.is_online()) {
            cards.push_str(&self.friend_card.render(&[
                ("thumbnail", Value::Text(image_url(friend.thumbnail()))),
                ("display_name", Value::Text(&friend.display_name)),
                ("status", Value::Text(&friend.status)),
                ("indicator", Value::Text(friend.status_indicator())),
                ("status_description", Value::Text(&friend.status_description)),
            ])?);
        }
        self.friends.render(&[("cards", Value::Html(&cards))])
    }

    /// # Errors
    /// Returns an error if a template has unfilled slots.
    pub fn groups(&self, groups: &GroupInstances) -> Result<String, TemplateError> {
        let mut rows = String::new();
        for instance in &groups.instances {
            let user_count = instance.user_count.to_string();
            let capacity = instance.capacity.to_string();
            rows.push_str(&self.instance_row.render(&[
                (
                    "thumbnail",
                    Value::Text(image_url(&instance.world.thumbnail_image_url)),
                ),
                ("world_name", Value::Text(&instance.world.name)),
                ("region", Value::Text(&instance.region)),
                ("author", Value::Text(&instance.world.author_name)),
                ("access", Value::Text(&instance.group_access_type)),
                ("user_count", Value::Text(&user_count)),
                ("capacity", Value::Text(&capacity)),
                ("description", Value::Text(&instance.world.description)),
            ])?);
        }
        self.groups.render(&[("rows", Value::Html(&rows))])
    }
}
