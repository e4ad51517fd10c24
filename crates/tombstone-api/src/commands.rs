use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use tombstone_types::api::{CommandResponse, Dialog, OpenDialogRequest};
use tombstone_types::ids::is_valid_id;

use crate::host::Host;
use crate::redaction::RedactionWorkflow;

pub const COMMAND_TRIGGER: &str = "redactroot";

/// Path the confirmation dialog submits to.
pub const REDACT_ROUTE: &str = "/api/v1/redact_root_post";

const ERROR_PREFIX: &str = "Can't redact root post: ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command, use `/redactroot [postID]`.")]
    UnknownTrigger,

    #[error("invalid number of arguments, use `/redactroot [postID]`.")]
    Arity,

    #[error("invalid post ID")]
    InvalidPostId,
}

/// Extract the post id from `/redactroot <postID>`.
pub fn parse_post_id(command: &str) -> Result<&str, CommandError> {
    let parts: Vec<&str> = command.split(' ').collect();
    if parts.first().map(|t| t.trim_start_matches('/')) != Some(COMMAND_TRIGGER) {
        return Err(CommandError::UnknownTrigger);
    }
    if parts.len() != 2 {
        return Err(CommandError::Arity);
    }
    let post_id = parts[1];
    if !is_valid_id(post_id) {
        return Err(CommandError::InvalidPostId);
    }
    Ok(post_id)
}

/// Entry point for the slash command. Validates the request and, if the
/// post can be redacted, asks the client to confirm through a dialog whose
/// submission reaches [`REDACT_ROUTE`].
pub struct CommandHandler {
    host: Arc<dyn Host>,
    workflow: Arc<RedactionWorkflow>,
}

impl CommandHandler {
    pub fn new(host: Arc<dyn Host>, workflow: Arc<RedactionWorkflow>) -> Self {
        Self { host, workflow }
    }

    pub fn execute(&self, actor_id: &str, command: &str, trigger_id: &str) -> CommandResponse {
        let post_id = match parse_post_id(command) {
            Ok(id) => id,
            Err(e) => return error_response(e),
        };

        let post = match self.host.get_post(post_id) {
            Ok(post) => post,
            Err(e) => return error_response(format!("cannot fetch post - {}", e)),
        };

        if let Err(e) = self.workflow.check_can_redact(actor_id, &post) {
            return error_response(e.public_message());
        }

        let request = OpenDialogRequest {
            trigger_id: trigger_id.to_string(),
            url: format!("{}?post_id={}", REDACT_ROUTE, post_id),
            dialog: Dialog {
                title: "Redact Root Post".into(),
                introduction_text: "Are you sure you want to redact this post? The thread will remain.".into(),
                submit_label: "Redact".into(),
            },
        };
        if let Err(e) = self.host.open_dialog(actor_id, request) {
            error!(post_id, err = %e, "cannot open redaction dialog");
            return CommandResponse { text: e.to_string() };
        }

        // The dialog drives the rest
        CommandResponse::default()
    }
}

fn error_response(reason: impl ToString) -> CommandResponse {
    CommandResponse {
        text: format!("{}{}", ERROR_PREFIX, reason.to_string()),
    }
}
