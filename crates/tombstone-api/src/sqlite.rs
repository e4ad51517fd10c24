//! Host platform backed by the local SQLite database.
//!
//! Lets the server run on its own: posts, reactions, users and files live in
//! `tombstone-db`, and every change is announced on the gateway.

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use tombstone_db::{Database, UpdateOutcome};
use tombstone_gateway::dispatcher::Dispatcher;
use tombstone_types::api::OpenDialogRequest;
use tombstone_types::events::HostEvent;
use tombstone_types::models::{FileInfo, Permission, Post, Reaction, User, now_millis};

use crate::error::{HostError, LedgerError};
use crate::hooks::check_edit;
use crate::host::Host;
use crate::ledger::AttachmentLedger;

pub struct SqliteHost {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    edit_time_limit: Option<Duration>,
}

impl SqliteHost {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher, edit_time_limit: Option<Duration>) -> Self {
        Self {
            db,
            dispatcher,
            edit_time_limit,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Store a post and its files, then announce it.
    pub fn create_post(&self, post: &Post, files: &[FileInfo]) -> Result<Post, HostError> {
        self.db.insert_post(post)?;
        for file in files {
            self.db.insert_file(file)?;
        }
        let created = self.get_post(&post.id)?;
        self.dispatcher.broadcast(HostEvent::PostCreated { post: created.clone() });
        Ok(created)
    }

    /// Store a reaction. Returns false (and announces nothing) if it already
    /// existed.
    pub fn add_reaction(&self, reaction: &Reaction) -> Result<bool, HostError> {
        let added = self.db.save_reaction(reaction)?;
        if added {
            self.dispatcher.broadcast(HostEvent::ReactionAdded {
                reaction: reaction.clone(),
            });
        }
        Ok(added)
    }

    fn delete_reaction(&self, reaction: &Reaction) -> Result<bool, HostError> {
        let removed = self
            .db
            .delete_reaction(&reaction.user_id, &reaction.post_id, &reaction.emoji_name)?;
        if removed {
            self.dispatcher.broadcast(HostEvent::ReactionRemoved {
                reaction: reaction.clone(),
            });
        }
        Ok(removed)
    }
}

impl Host for SqliteHost {
    fn get_post(&self, post_id: &str) -> Result<Post, HostError> {
        self.db
            .get_post(post_id)?
            .ok_or_else(|| HostError::NotFound(format!("post {}", post_id)))
    }

    /// Every edit passes the edit guard against the stored revision before
    /// the compare-and-set commit.
    fn update_post(&self, post: &Post) -> Result<Post, HostError> {
        let current = self.get_post(&post.id)?;
        check_edit(&current).map_err(|rejected| HostError::Rejected(rejected.to_string()))?;

        match self.db.update_post(post)? {
            UpdateOutcome::Updated(updated) => {
                self.dispatcher.broadcast(HostEvent::PostEdited { post: updated.clone() });
                Ok(updated)
            }
            UpdateOutcome::Conflict => Err(HostError::Conflict(format!("post {}", post.id))),
            UpdateOutcome::NotFound => Err(HostError::NotFound(format!("post {}", post.id))),
        }
    }

    fn get_user(&self, user_id: &str) -> Result<User, HostError> {
        self.db
            .get_user(user_id)?
            .ok_or_else(|| HostError::NotFound(format!("user {}", user_id)))
    }

    /// System admins hold every permission; channel members may edit their
    /// own posts; channel admins may also edit others' posts.
    fn has_permission_to_channel(&self, user_id: &str, channel_id: &str, permission: Permission) -> bool {
        let lookup = || -> anyhow::Result<bool> {
            if self.db.get_user(user_id)?.is_some_and(|u| u.is_system_admin) {
                return Ok(true);
            }
            let member = self.db.get_channel_member(channel_id, user_id)?;
            Ok(match (member, permission) {
                (None, _) => false,
                (Some(_), Permission::EditPost) => true,
                (Some(m), Permission::EditOthersPosts) => m.is_admin,
            })
        };

        lookup().unwrap_or_else(|e| {
            error!(user_id, channel_id, permission = permission.as_str(), "permission lookup failed: {:#}", e);
            false
        })
    }

    fn get_reactions(&self, post_id: &str) -> Result<Vec<Reaction>, HostError> {
        Ok(self.db.get_reactions(post_id)?)
    }

    fn remove_reaction(&self, reaction: &Reaction) -> Result<(), HostError> {
        self.delete_reaction(reaction).map(|_| ())
    }

    fn edit_time_limit(&self) -> Option<Duration> {
        self.edit_time_limit
    }

    fn open_dialog(&self, user_id: &str, request: OpenDialogRequest) -> Result<(), HostError> {
        self.dispatcher.broadcast(HostEvent::DialogOpened {
            user_id: user_id.to_string(),
            request,
        });
        Ok(())
    }
}

impl AttachmentLedger for SqliteHost {
    fn detach(&self, file_id: &str) -> Result<(), LedgerError> {
        Ok(self.db.detach_file(file_id, now_millis())?)
    }

    fn reattach(&self, target_post_id: &str, file_ids: &[String]) -> Result<(), LedgerError> {
        Ok(self.db.attach_files_to_post(target_post_id, file_ids)?)
    }
}
