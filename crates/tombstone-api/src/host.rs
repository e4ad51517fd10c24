use std::time::Duration;

use tombstone_types::api::OpenDialogRequest;
use tombstone_types::models::{Permission, Post, Reaction, User};

use crate::error::HostError;

/// Operations the host messaging platform provides.
///
/// Every read is a fresh snapshot; nothing here is cached. Calls block, so
/// async callers run them on the blocking pool.
pub trait Host: Send + Sync {
    fn get_post(&self, post_id: &str) -> Result<Post, HostError>;

    /// Commit `post` as a new revision of the stored post.
    ///
    /// Compare-and-set on `update_at`: fails with [`HostError::Conflict`] if
    /// the stored revision moved on. The returned post's `original_id`
    /// names the archived prior revision. A sealed stored revision fails
    /// with [`HostError::Rejected`].
    fn update_post(&self, post: &Post) -> Result<Post, HostError>;

    fn get_user(&self, user_id: &str) -> Result<User, HostError>;

    fn has_permission_to_channel(&self, user_id: &str, channel_id: &str, permission: Permission) -> bool;

    fn get_reactions(&self, post_id: &str) -> Result<Vec<Reaction>, HostError>;

    fn remove_reaction(&self, reaction: &Reaction) -> Result<(), HostError>;

    /// Global post edit time limit; `None` when the policy is disabled.
    fn edit_time_limit(&self) -> Option<Duration>;

    fn open_dialog(&self, user_id: &str, request: OpenDialogRequest) -> Result<(), HostError>;
}
