use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property key the host stores the redaction marker under.
pub const REDACTED_PROP_KEY: &str = "redacted_root";

/// Milliseconds since the Unix epoch, the host's timestamp unit.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Whether a post's content has been redacted.
///
/// A sealed post is never edited, reacted to, or un-redacted again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactionState {
    #[default]
    Live,
    Sealed,
}

impl RedactionState {
    /// Pull the marker out of a host property map. Only a boolean `true`
    /// counts as sealed; the key is removed either way.
    pub fn take_from_props(props: &mut Map<String, Value>) -> Self {
        match props.remove(REDACTED_PROP_KEY) {
            Some(Value::Bool(true)) => Self::Sealed,
            _ => Self::Live,
        }
    }

    /// Host property map for a post in this state.
    pub fn encode_into(self, props: &Map<String, Value>) -> Map<String, Value> {
        let mut encoded = props.clone();
        encoded.remove(REDACTED_PROP_KEY);
        if self == Self::Sealed {
            encoded.insert(REDACTED_PROP_KEY.to_string(), Value::Bool(true));
        }
        encoded
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    /// Empty when the post starts a thread.
    pub root_id: String,
    /// Archived revision this post was edited from, empty if never edited.
    pub original_id: String,
    pub reply_count: i64,
    pub message: String,
    pub message_source: String,
    pub file_ids: Vec<String>,
    pub props: Map<String, Value>,
    pub redaction: RedactionState,
    pub create_at: i64,
    /// Revision token; updates are compare-and-set on this value.
    pub update_at: i64,
    pub edit_at: i64,
    pub delete_at: i64,
}

impl Post {
    /// A root is the first post of a thread that actually has replies.
    pub fn is_root(&self) -> bool {
        self.root_id.is_empty() && self.reply_count > 0
    }

    pub fn is_sealed(&self) -> bool {
        self.redaction == RedactionState::Sealed
    }

    pub fn is_deleted(&self) -> bool {
        self.delete_at != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user_id: String,
    pub post_id: String,
    pub emoji_name: String,
    pub create_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub is_system_admin: bool,
    pub create_at: i64,
}

/// File attachment metadata. An empty `channel_id` means the file has been
/// detached from its live channel context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    pub post_id: String,
    pub channel_id: String,
    pub creator_id: String,
    pub name: String,
    pub create_at: i64,
}

/// Channel-scoped permissions consulted before a post may be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    EditPost,
    EditOthersPosts,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EditPost => "edit_post",
            Self::EditOthersPosts => "edit_others_posts",
        }
    }
}
