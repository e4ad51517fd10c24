use std::sync::Arc;

use tracing::{debug, error, info};

use tombstone_types::ids::is_valid_id;
use tombstone_types::models::{Post, RedactionState};

use crate::error::{CleanupStage, HostError, PartialFailure, Precondition, RedactError};
use crate::host::Host;
use crate::ledger::AttachmentLedger;
use crate::permissions::PermissionGate;

/// Wipes a thread's root post and seals it against further changes.
///
/// Runs synchronously: every step waits on the one before. Once the content
/// wipe commits it is never undone; later cleanup failures come back as
/// [`PartialFailure`] and need manual follow-up.
pub struct RedactionWorkflow {
    host: Arc<dyn Host>,
    ledger: Arc<dyn AttachmentLedger>,
    gate: PermissionGate,
    placeholder: String,
}

impl RedactionWorkflow {
    pub fn new(host: Arc<dyn Host>, ledger: Arc<dyn AttachmentLedger>, placeholder: impl Into<String>) -> Self {
        Self {
            gate: PermissionGate::new(host.clone()),
            host,
            ledger,
            placeholder: placeholder.into(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Side-effect free check used before asking the user to confirm:
    /// deleted, already sealed, permission, root.
    pub fn check_can_redact(&self, actor_id: &str, post: &Post) -> Result<(), RedactError> {
        if post.is_deleted() {
            return Err(Precondition::AlreadyDeleted.into());
        }
        if post.is_sealed() {
            return Err(Precondition::AlreadyRedacted.into());
        }
        self.gate.can_redact(actor_id, &post.channel_id, post)?;
        if !post.is_root() {
            return Err(Precondition::NotRoot.into());
        }
        Ok(())
    }

    /// Redact `post_id` on behalf of `actor_id`. Returns the sealed revision.
    pub fn redact(&self, actor_id: &str, post_id: &str) -> Result<Post, RedactError> {
        let result = self.run(actor_id, post_id);
        match &result {
            Ok(_) => info!(post_id, actor_id, "root post redacted"),
            Err(e) if e.is_internal() => error!(post_id, actor_id, err = %e, "root post redaction failed"),
            Err(e) => debug!(post_id, actor_id, reason = %e, "root post redaction rejected"),
        }
        result
    }

    fn run(&self, actor_id: &str, post_id: &str) -> Result<Post, RedactError> {
        if !is_valid_id(post_id) {
            return Err(RedactError::InvalidPostId);
        }
        let post = self.host.get_post(post_id).map_err(RedactError::Fetch)?;

        if !post.is_root() {
            return Err(Precondition::NotRoot.into());
        }
        if post.is_sealed() {
            return Err(Precondition::AlreadyRedacted.into());
        }
        self.gate.can_redact(actor_id, &post.channel_id, &post)?;

        let original_file_ids = post.file_ids.clone();
        let sealed = self.seal(post)?;

        self.purge_reactions(&sealed)?;
        self.rehome_attachments(&sealed, &original_file_ids)?;

        Ok(sealed)
    }

    /// Replace the content with the placeholder and set the sealed state in
    /// one compare-and-set update.
    fn seal(&self, mut post: Post) -> Result<Post, RedactError> {
        post.message = self.placeholder.clone();
        post.message_source.clear();
        post.file_ids.clear();
        post.redaction = RedactionState::Sealed;

        match self.host.update_post(&post) {
            Ok(updated) => Ok(updated),
            Err(HostError::Conflict(_) | HostError::Rejected(_)) => {
                // Another writer got in between our read and our update
                let current = self.host.get_post(&post.id).map_err(RedactError::Fetch)?;
                if current.is_sealed() {
                    Err(Precondition::AlreadyRedacted.into())
                } else {
                    Err(Precondition::ConcurrentUpdate.into())
                }
            }
            Err(e) => Err(RedactError::Update(e)),
        }
    }

    /// Remove every reaction one at a time, collecting failures.
    fn purge_reactions(&self, post: &Post) -> Result<(), PartialFailure> {
        let reactions = self.host.get_reactions(&post.id).map_err(|e| PartialFailure {
            stage: CleanupStage::Reactions,
            post_id: post.id.clone(),
            failures: vec![format!("fetching reactions: {}", e)],
        })?;

        let failures: Vec<String> = reactions
            .iter()
            .filter_map(|reaction| {
                self.host
                    .remove_reaction(reaction)
                    .err()
                    .map(|e| format!("{} by {}: {}", reaction.emoji_name, reaction.user_id, e))
            })
            .collect();

        check_stage(CleanupStage::Reactions, post, failures)
    }

    /// Detach the original files from the channel, then file them under the
    /// archived revision so the audit trail keeps them.
    fn rehome_attachments(&self, post: &Post, file_ids: &[String]) -> Result<(), PartialFailure> {
        if file_ids.is_empty() {
            return Ok(());
        }

        let failures: Vec<String> = file_ids
            .iter()
            .filter_map(|file_id| self.ledger.detach(file_id).err().map(|e| format!("{}: {}", file_id, e)))
            .collect();
        check_stage(CleanupStage::Detach, post, failures)?;

        if post.original_id.is_empty() {
            return check_stage(
                CleanupStage::Reattach,
                post,
                vec!["host returned no original revision".to_string()],
            );
        }
        let failures = match self.ledger.reattach(&post.original_id, file_ids) {
            Ok(()) => vec![],
            Err(e) => vec![format!("{}: {}", post.original_id, e)],
        };
        check_stage(CleanupStage::Reattach, post, failures)
    }
}

fn check_stage(stage: CleanupStage, post: &Post, failures: Vec<String>) -> Result<(), PartialFailure> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(PartialFailure {
            stage,
            post_id: post.id.clone(),
            failures,
        })
    }
}
