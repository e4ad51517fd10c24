use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body returned for every internal failure; the cause only goes to the logs.
pub const INTERNAL_ERROR_BODY: &str = "Internal server error, check logs";

/// Failure reported by a host platform collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} was modified concurrently")]
    Conflict(String),

    /// The host's edit guard refused the update.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Internal(String),
}

impl HostError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Rejected(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for HostError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(format!("{:#}", e))
    }
}

/// Failure reported by the attachment ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("attachment ledger: {0}")]
pub struct LedgerError(pub String);

impl From<anyhow::Error> for LedgerError {
    fn from(e: anyhow::Error) -> Self {
        Self(format!("{:#}", e))
    }
}

/// Why the permission gate refused a redaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("post already deleted")]
    AlreadyDeleted,

    #[error("not authorized")]
    NotAuthorized,

    #[error("post is too old to edit")]
    TooOld,

    #[error("internal error, check with your system administrator for assistance")]
    UserUnavailable,
}

/// A state of the post that rules out redaction before anything is changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("post already deleted")]
    AlreadyDeleted,

    #[error("post is not a root post of a thread")]
    NotRoot,

    #[error("root post already redacted")]
    AlreadyRedacted,

    #[error("post was modified concurrently, try again")]
    ConcurrentUpdate,
}

/// Cleanup step that runs after the content wipe has committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStage {
    Reactions,
    Detach,
    Reattach,
}

impl fmt::Display for CleanupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reactions => "reaction removal",
            Self::Detach => "attachment detach",
            Self::Reattach => "attachment reattach",
        })
    }
}

/// Every individual failure of one cleanup stage, reported together.
///
/// The post content is already wiped when this is returned; nothing is
/// rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} incomplete for post {post_id}: {}", .failures.join("; "))]
pub struct PartialFailure {
    pub stage: CleanupStage,
    pub post_id: String,
    pub failures: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RedactError {
    #[error("invalid post ID")]
    InvalidPostId,

    #[error("cannot fetch post: {0}")]
    Fetch(#[source] HostError),

    #[error(transparent)]
    Precondition(#[from] Precondition),

    #[error(transparent)]
    Denied(Denial),

    #[error("failed to update post: {0}")]
    Update(#[source] HostError),

    #[error(transparent)]
    PartialFailure(#[from] PartialFailure),
}

impl From<Denial> for RedactError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::AlreadyDeleted => Self::Precondition(Precondition::AlreadyDeleted),
            other => Self::Denied(other),
        }
    }
}

impl RedactError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPostId => StatusCode::BAD_REQUEST,
            Self::Fetch(e) => e.status(),
            Self::Precondition(Precondition::ConcurrentUpdate) => StatusCode::CONFLICT,
            Self::Precondition(_) => StatusCode::BAD_REQUEST,
            Self::Denied(Denial::UserUnavailable) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Denied(_) => StatusCode::FORBIDDEN,
            Self::Update(_) | Self::PartialFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for faults of the system itself, as opposed to expected
    /// rejections of the request.
    pub fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Text safe to show the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Denied(denial) => denial.to_string(),
            Self::Fetch(HostError::NotFound(_)) => "post not found".to_string(),
            e if e.is_internal() => INTERNAL_ERROR_BODY.to_string(),
            e => e.to_string(),
        }
    }
}

impl IntoResponse for RedactError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
