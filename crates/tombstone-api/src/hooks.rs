//! Guards that keep sealed posts sealed.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use tombstone_types::models::{Post, Reaction};

use crate::host::Host;

/// Delay before a reaction on a sealed post is retracted.
///
/// Gives clients time to receive the "added" event before the "removed"
/// one. This only approximates ordering; the host offers no primitive to
/// sequence the two.
pub const REACTION_RETRACT_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Redacted root post cannot be edited")]
pub struct EditRejected;

/// Called before the host commits any edit, with the revision being
/// replaced. Sealed posts are rejected no matter who is editing.
pub fn check_edit(old_revision: &Post) -> Result<(), EditRejected> {
    if old_revision.is_sealed() {
        return Err(EditRejected);
    }
    Ok(())
}

/// Retracts reactions that land on sealed posts.
///
/// The host has no veto before a reaction is stored, so the reaction is
/// removed after the fact. Failures are logged and swallowed: from the
/// reacting user's side the add already succeeded.
#[derive(Clone)]
pub struct ReactionGuard {
    host: Arc<dyn Host>,
    delay: Duration,
}

impl ReactionGuard {
    pub fn new(host: Arc<dyn Host>, delay: Duration) -> Self {
        Self { host, delay }
    }

    /// Inspect a freshly stored reaction. If its post is sealed, schedule the
    /// removal on the runtime and return the handle of that task.
    ///
    /// Must be called from within a Tokio runtime (the blocking pool counts).
    pub fn on_reaction_added(&self, reaction: Reaction) -> Option<JoinHandle<()>> {
        let post = match self.host.get_post(&reaction.post_id) {
            Ok(post) => post,
            Err(e) => {
                // leave the reaction alone
                debug!(post_id = %reaction.post_id, err = %e, "cannot fetch post to check for reaction blocking");
                return None;
            }
        };

        if !post.is_sealed() {
            return None;
        }

        let host = self.host.clone();
        let delay = self.delay;
        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let post_id = reaction.post_id.clone();
            let emoji = reaction.emoji_name.clone();
            match tokio::task::spawn_blocking(move || host.remove_reaction(&reaction)).await {
                Ok(Ok(())) => debug!(post_id = %post_id, emoji = %emoji, "retracted reaction on redacted post"),
                Ok(Err(e)) => error!(post_id = %post_id, emoji = %emoji, err = %e, "cannot remove reaction"),
                Err(e) => error!(post_id = %post_id, emoji = %emoji, "spawn_blocking join error: {}", e),
            }
        }))
    }
}
