//! In-memory host and ledger with fault injection.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tombstone_types::api::OpenDialogRequest;
use tombstone_types::ids::new_id;
use tombstone_types::models::{Permission, Post, Reaction, User, now_millis};

use crate::error::{HostError, LedgerError};
use crate::hooks::check_edit;
use crate::host::Host;
use crate::ledger::AttachmentLedger;

type Interleave = Box<dyn FnOnce(&mut FakeState) + Send>;

#[derive(Default)]
pub struct FakeState {
    pub posts: HashMap<String, Post>,
    pub users: HashMap<String, User>,
    pub grants: HashSet<(String, String, Permission)>,
    pub reactions: Vec<Reaction>,
    pub edit_time_limit: Option<Duration>,
    pub dialogs: Vec<(String, OpenDialogRequest)>,
    pub detached: Vec<String>,
    pub reattached: Vec<(String, Vec<String>)>,
    pub update_calls: usize,

    pub fail_get_user: bool,
    pub fail_update: bool,
    pub fail_get_reactions: bool,
    pub fail_remove_emoji: HashSet<String>,
    pub fail_detach: HashSet<String>,
    pub fail_reattach: bool,
    pub fail_dialog: bool,
    /// Runs inside the next `update_post`, before the revision check.
    pub before_update: Option<Interleave>,
}

#[derive(Default, Clone)]
pub struct FakeHost {
    state: Arc<Mutex<FakeState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_user(&self, username: &str) -> User {
        let user = User {
            id: new_id(),
            username: username.into(),
            is_system_admin: false,
            create_at: now_millis(),
        };
        self.state().users.insert(user.id.clone(), user.clone());
        user
    }

    pub fn grant(&self, user: &User, channel_id: &str, permission: Permission) {
        self.state()
            .grants
            .insert((user.id.clone(), channel_id.to_string(), permission));
    }

    /// Root post by `author` with `replies` replies in channel "town".
    pub fn add_thread(&self, author: &User, replies: i64) -> Post {
        let now = now_millis();
        let post = Post {
            id: new_id(),
            channel_id: "town".into(),
            user_id: author.id.clone(),
            reply_count: replies,
            message: "secret plans".into(),
            message_source: "secret *plans*".into(),
            create_at: now,
            update_at: now,
            ..Default::default()
        };
        self.state().posts.insert(post.id.clone(), post.clone());
        post
    }

    pub fn add_reaction(&self, post: &Post, user_id: &str, emoji: &str) -> Reaction {
        let reaction = Reaction {
            user_id: user_id.into(),
            post_id: post.id.clone(),
            emoji_name: emoji.into(),
            create_at: now_millis(),
        };
        self.state().reactions.push(reaction.clone());
        reaction
    }

    pub fn post(&self, id: &str) -> Post {
        self.state().posts[id].clone()
    }

    pub fn reactions_on(&self, post_id: &str) -> Vec<Reaction> {
        self.state()
            .reactions
            .iter()
            .filter(|r| r.post_id == post_id)
            .cloned()
            .collect()
    }
}

impl Host for FakeHost {
    fn get_post(&self, post_id: &str) -> Result<Post, HostError> {
        self.state()
            .posts
            .get(post_id)
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("post {}", post_id)))
    }

    fn update_post(&self, post: &Post) -> Result<Post, HostError> {
        let mut state = self.state();
        state.update_calls += 1;
        if let Some(interleave) = state.before_update.take() {
            interleave(&mut *state);
        }
        if state.fail_update {
            return Err(HostError::Internal("update refused".into()));
        }

        let current = state
            .posts
            .get(&post.id)
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("post {}", post.id)))?;
        if current.update_at != post.update_at {
            return Err(HostError::Conflict(format!("post {}", post.id)));
        }
        check_edit(&current).map_err(|rejected| HostError::Rejected(rejected.to_string()))?;

        let now = now_millis();
        let mut archived = current.clone();
        archived.id = new_id();
        archived.delete_at = now;
        state.posts.insert(archived.id.clone(), archived.clone());

        let mut updated = post.clone();
        updated.original_id = archived.id;
        updated.edit_at = now;
        updated.update_at = now.max(current.update_at + 1);
        state.posts.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    fn get_user(&self, user_id: &str) -> Result<User, HostError> {
        let state = self.state();
        if state.fail_get_user {
            return Err(HostError::Internal("user store offline".into()));
        }
        state
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("user {}", user_id)))
    }

    fn has_permission_to_channel(&self, user_id: &str, channel_id: &str, permission: Permission) -> bool {
        let state = self.state();
        if state.users.get(user_id).is_some_and(|u| u.is_system_admin) {
            return true;
        }
        state
            .grants
            .contains(&(user_id.to_string(), channel_id.to_string(), permission))
    }

    fn get_reactions(&self, post_id: &str) -> Result<Vec<Reaction>, HostError> {
        if self.state().fail_get_reactions {
            return Err(HostError::Internal("reaction store offline".into()));
        }
        Ok(self.reactions_on(post_id))
    }

    fn remove_reaction(&self, reaction: &Reaction) -> Result<(), HostError> {
        let mut state = self.state();
        if state.fail_remove_emoji.contains(&reaction.emoji_name) {
            return Err(HostError::Internal(format!("cannot remove {}", reaction.emoji_name)));
        }
        state.reactions.retain(|r| {
            !(r.post_id == reaction.post_id
                && r.user_id == reaction.user_id
                && r.emoji_name == reaction.emoji_name)
        });
        Ok(())
    }

    fn edit_time_limit(&self) -> Option<Duration> {
        self.state().edit_time_limit
    }

    fn open_dialog(&self, user_id: &str, request: OpenDialogRequest) -> Result<(), HostError> {
        let mut state = self.state();
        if state.fail_dialog {
            return Err(HostError::Internal("dialog service unavailable".into()));
        }
        state.dialogs.push((user_id.to_string(), request));
        Ok(())
    }
}

impl AttachmentLedger for FakeHost {
    fn detach(&self, file_id: &str) -> Result<(), LedgerError> {
        let mut state = self.state();
        if state.fail_detach.contains(file_id) {
            return Err(LedgerError(format!("cannot detach {}", file_id)));
        }
        state.detached.push(file_id.to_string());
        Ok(())
    }

    fn reattach(&self, target_post_id: &str, file_ids: &[String]) -> Result<(), LedgerError> {
        let mut state = self.state();
        if state.fail_reattach {
            return Err(LedgerError("reattach refused".into()));
        }
        state
            .reattached
            .push((target_post_id.to_string(), file_ids.to_vec()));
        Ok(())
    }
}
