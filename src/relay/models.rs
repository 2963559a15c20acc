//! Upstream record shapes. Only the fields the relay reads are modelled;
//! everything else in the upstream JSON is ignored.

use serde::{Deserialize, Serialize};

/// Returned by the login probe when a second factor is still required.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorRequired {
    pub requires_two_factor_auth: Vec<String>,
}

/// Partial projection of the authenticated user record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub current_avatar_image_url: String,
    #[serde(default)]
    pub current_avatar_thumbnail_image_url: String,
    #[serde(default)]
    pub active_friends: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyCode<'a> {
    pub code: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Friend {
    pub id: String,
    pub display_name: String,
    pub status: String,
    pub status_description: String,
    pub location: String,
    pub bio: String,
    pub bio_links: Vec<String>,
    pub current_avatar_image_url: String,
    pub current_avatar_thumbnail_image_url: String,
    pub profile_pic_override: String,
    pub profile_pic_override_thumbnail: String,
    pub user_icon: String,
}

impl Friend {
    /// Sort rank of the presence status; unknown statuses sort last.
    #[must_use]
    pub fn status_rank(&self) -> u8 {
        match self.status.to_lowercase().as_str() {
            "join me" => 0,
            "active" => 1,
            "ask me" => 2,
            "busy" => 3,
            _ => 99,
        }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.location != "offline"
    }

    /// Thumbnail to show: the profile picture override when set, else the avatar.
    #[must_use]
    pub fn thumbnail(&self) -> &str {
        if self.profile_pic_override_thumbnail.is_empty() {
            &self.current_avatar_thumbnail_image_url
        } else {
            &self.profile_pic_override_thumbnail
        }
    }

    #[must_use]
    pub fn status_indicator(&self) -> &'static str {
        match self.status.as_str() {
            "busy" => "🔴",
            "ask me" => "🟠",
            "join me" => "🔵",
            "active" => "🟢",
            _ => "⚪",
        }
    }
}

/// Stable sort by presence: join me, active, ask me, busy, then everything else.
pub fn sort_by_status(friends: &mut [Friend]) {
    friends.sort_by_key(Friend::status_rank);
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInstances {
    #[serde(default)]
    pub fetched_at: String,
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instance {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub world_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub group_access_type: String,
    pub user_count: u32,
    pub capacity: u32,
    pub tags: Vec<String>,
    pub world: World,
    #[serde(rename = "photonRegion")]
    pub region: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct World {
    pub name: String,
    pub author_name: String,
    pub description: String,
    pub thumbnail_image_url: String,
}
