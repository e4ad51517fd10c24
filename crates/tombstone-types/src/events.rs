use serde::{Deserialize, Serialize};

use crate::api::OpenDialogRequest;
use crate::models::{Post, Reaction};

/// Events the host pushes to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HostEvent {
    /// A post was created
    PostCreated { post: Post },

    /// A post was replaced by a new revision
    PostEdited { post: Post },

    /// A reaction was added to a post
    ReactionAdded { reaction: Reaction },

    /// A reaction was removed from a post
    ReactionRemoved { reaction: Reaction },

    /// A dialog should be shown to one user
    DialogOpened {
        user_id: String,
        request: OpenDialogRequest,
    },
}

impl HostEvent {
    /// Returns the user this event is addressed to. Events that return
    /// `None` are global and should be delivered to all clients.
    pub fn target_user(&self) -> Option<&str> {
        match self {
            Self::DialogOpened { user_id, .. } => Some(user_id),
            // Post and reaction events are global
            _ => None,
        }
    }
}
