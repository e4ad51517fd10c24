use std::sync::Arc;

use tracing::error;

use tombstone_types::models::{Permission, Post, now_millis};

use crate::error::Denial;
use crate::host::Host;

/// Decides whether a user may redact a post.
///
/// Redaction is a constrained edit, so this applies the same rules the host
/// applies to an ordinary edit. Root-only and not-yet-sealed are checked by
/// the caller.
#[derive(Clone)]
pub struct PermissionGate {
    host: Arc<dyn Host>,
}

impl PermissionGate {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }

    /// Checks, in order: not deleted, edit permission (own or others'),
    /// within the edit time limit. Stops at the first failure.
    pub fn can_redact(&self, actor_id: &str, channel_id: &str, post: &Post) -> Result<(), Denial> {
        if post.is_deleted() {
            return Err(Denial::AlreadyDeleted);
        }

        let user = self.host.get_user(actor_id).map_err(|e| {
            error!(user_id = actor_id, err = %e, "error fetching user");
            Denial::UserUnavailable
        })?;

        let permission = if post.user_id == user.id {
            Permission::EditPost
        } else {
            Permission::EditOthersPosts
        };
        if !self.host.has_permission_to_channel(&user.id, channel_id, permission) {
            return Err(Denial::NotAuthorized);
        }

        if let Some(limit) = self.host.edit_time_limit() {
            let limit_ms = i64::try_from(limit.as_millis()).unwrap_or(i64::MAX);
            if now_millis() > post.create_at.saturating_add(limit_ms) {
                return Err(Denial::TooOld);
            }
        }

        Ok(())
    }
}
