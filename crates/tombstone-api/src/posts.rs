use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use tombstone_types::api::{CreatePostRequest, EditPostRequest};
use tombstone_types::ids::{is_valid_id, new_id};
use tombstone_types::models::{FileInfo, Permission, Post, now_millis};

use crate::error::HostError;
use crate::hooks::check_edit;
use crate::host::Host;
use crate::middleware::Actor;
use crate::state::AppState;

/// Run blocking host work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, Response>
where
    F: FnOnce() -> Result<T, Response> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })?
}

pub(crate) fn host_failure(op: &str, e: HostError) -> Response {
    match &e {
        HostError::Internal(_) => error!("{} failed: {}", op, e),
        HostError::Rejected(reason) => return (StatusCode::FORBIDDEN, reason.clone()).into_response(),
        _ => {}
    }
    e.status().into_response()
}

/// POST /api/v4/posts: Create a post, or a reply when `root_id` is set.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(Actor(actor_id)): Extension<Actor>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, Response> {
    let root_id = req.root_id.unwrap_or_default();
    if !is_valid_id(&req.channel_id) || (!root_id.is_empty() && !is_valid_id(&root_id)) {
        return Err(StatusCode::BAD_REQUEST.into_response());
    }

    let created = blocking(move || {
        let host = &state.host;
        if !host.has_permission_to_channel(&actor_id, &req.channel_id, Permission::EditPost) {
            return Err(StatusCode::FORBIDDEN.into_response());
        }

        if !root_id.is_empty() {
            // Replies attach to a live thread root in the same channel
            let root = host.get_post(&root_id).map_err(|e| host_failure("get_post", e))?;
            if !root.root_id.is_empty() || root.is_deleted() || root.channel_id != req.channel_id {
                return Err(StatusCode::BAD_REQUEST.into_response());
            }
        }

        let now = now_millis();
        let post_id = new_id();
        let files: Vec<FileInfo> = req
            .file_names
            .into_iter()
            .map(|name| FileInfo {
                id: new_id(),
                post_id: post_id.clone(),
                channel_id: req.channel_id.clone(),
                creator_id: actor_id.clone(),
                name,
                create_at: now,
            })
            .collect();

        let post = Post {
            id: post_id,
            channel_id: req.channel_id,
            user_id: actor_id,
            root_id,
            message_source: req.message.clone(),
            message: req.message,
            file_ids: files.iter().map(|f| f.id.clone()).collect(),
            create_at: now,
            update_at: now,
            ..Default::default()
        };

        host.create_post(&post, &files).map_err(|e| host_failure("create_post", e))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v4/posts/{post_id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Post>, Response> {
    if !is_valid_id(&post_id) {
        return Err(StatusCode::BAD_REQUEST.into_response());
    }

    let post = blocking(move || state.host.get_post(&post_id).map_err(|e| host_failure("get_post", e))).await?;
    Ok(Json(post))
}

/// PUT /api/v4/posts/{post_id}: Replace the message of a post.
///
/// The edit guard sees the current revision first; sealed posts cannot be
/// edited by anyone.
pub async fn edit_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(Actor(actor_id)): Extension<Actor>,
    Json(req): Json<EditPostRequest>,
) -> Result<Json<Post>, Response> {
    if !is_valid_id(&post_id) {
        return Err(StatusCode::BAD_REQUEST.into_response());
    }

    let updated = blocking(move || {
        let host = &state.host;
        let old = host.get_post(&post_id).map_err(|e| host_failure("get_post", e))?;
        if old.is_deleted() {
            return Err(StatusCode::NOT_FOUND.into_response());
        }

        if let Err(rejected) = check_edit(&old) {
            debug!(post_id = %post_id, actor_id = %actor_id, "edit of redacted post rejected");
            return Err((StatusCode::FORBIDDEN, rejected.to_string()).into_response());
        }

        let permission = if old.user_id == actor_id {
            Permission::EditPost
        } else {
            Permission::EditOthersPosts
        };
        if !host.has_permission_to_channel(&actor_id, &old.channel_id, permission) {
            return Err(StatusCode::FORBIDDEN.into_response());
        }

        let mut edited = old;
        edited.message_source = req.message.clone();
        edited.message = req.message;
        edited.edit_at = now_millis();
        host.update_post(&edited).map_err(|e| host_failure("update_post", e))
    })
    .await?;

    Ok(Json(updated))
}
