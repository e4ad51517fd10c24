/// Database row types. Posts keep their file list and properties as JSON
/// text; conversion into the domain [`Post`] happens here so the typed
/// redaction state never leaks into the property map.
use anyhow::Result;
use serde_json::{Map, Value};

use tombstone_types::models::{Post, RedactionState};

pub struct PostRow {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub root_id: String,
    pub original_id: String,
    pub message: String,
    pub message_source: String,
    pub file_ids: String,
    pub props: String,
    pub create_at: i64,
    pub update_at: i64,
    pub edit_at: i64,
    pub delete_at: i64,
    pub reply_count: i64,
}

impl PostRow {
    pub fn into_post(self) -> Result<Post> {
        let file_ids: Vec<String> = serde_json::from_str(&self.file_ids)?;
        let mut props: Map<String, Value> = serde_json::from_str(&self.props)?;
        let redaction = RedactionState::take_from_props(&mut props);

        Ok(Post {
            id: self.id,
            channel_id: self.channel_id,
            user_id: self.user_id,
            root_id: self.root_id,
            original_id: self.original_id,
            reply_count: self.reply_count,
            message: self.message,
            message_source: self.message_source,
            file_ids,
            props,
            redaction,
            create_at: self.create_at,
            update_at: self.update_at,
            edit_at: self.edit_at,
            delete_at: self.delete_at,
        })
    }
}

/// Encode the JSON columns of a post: (file_ids, props).
pub fn encode_post_columns(post: &Post) -> Result<(String, String)> {
    let file_ids = serde_json::to_string(&post.file_ids)?;
    let props = serde_json::to_string(&post.redaction.encode_into(&post.props))?;
    Ok((file_ids, props))
}

pub struct ChannelMemberRow {
    pub channel_id: String,
    pub user_id: String,
    pub is_admin: bool,
}

pub struct LedgerRow {
    pub file_id: String,
    pub audit_post_id: Option<String>,
    pub detached_at: Option<i64>,
}
