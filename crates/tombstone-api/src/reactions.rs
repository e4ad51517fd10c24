use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use tombstone_types::api::AddReactionRequest;
use tombstone_types::ids::is_valid_id;
use tombstone_types::models::{Permission, Reaction, now_millis};

use crate::host::Host;
use crate::middleware::Actor;
use crate::posts::{blocking, host_failure};
use crate::state::AppState;

const MAX_EMOJI_NAME_LEN: usize = 64;

fn valid_emoji_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_EMOJI_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'))
}

/// POST /api/v4/posts/{post_id}/reactions
///
/// The reaction is stored and announced before the guard looks at the post,
/// so a reaction on a redacted post is briefly visible and then retracted.
pub async fn add_reaction(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(Actor(actor_id)): Extension<Actor>,
    Json(req): Json<AddReactionRequest>,
) -> Result<Response, Response> {
    if !is_valid_id(&post_id) || !valid_emoji_name(&req.emoji_name) {
        return Err(StatusCode::BAD_REQUEST.into_response());
    }

    blocking(move || {
        let post = state.host.get_post(&post_id).map_err(|e| host_failure("get_post", e))?;
        if post.is_deleted() {
            return Err(StatusCode::NOT_FOUND.into_response());
        }
        if !state
            .host
            .has_permission_to_channel(&actor_id, &post.channel_id, Permission::EditPost)
        {
            return Err(StatusCode::FORBIDDEN.into_response());
        }

        let reaction = Reaction {
            user_id: actor_id,
            post_id,
            emoji_name: req.emoji_name,
            create_at: now_millis(),
        };
        let added = state
            .host
            .add_reaction(&reaction)
            .map_err(|e| host_failure("add_reaction", e))?;
        if !added {
            return Ok((StatusCode::OK, Json(reaction)).into_response());
        }

        if state.reaction_guard.on_reaction_added(reaction.clone()).is_some() {
            debug!(post_id = %reaction.post_id, emoji = %reaction.emoji_name, "reaction on redacted post scheduled for removal");
        }
        Ok((StatusCode::CREATED, Json(reaction)).into_response())
    })
    .await
}

/// DELETE /api/v4/posts/{post_id}/reactions/{emoji_name}: Remove the actor's
/// own reaction.
pub async fn remove_reaction(
    State(state): State<AppState>,
    Path((post_id, emoji_name)): Path<(String, String)>,
    Extension(Actor(actor_id)): Extension<Actor>,
) -> Result<StatusCode, Response> {
    if !is_valid_id(&post_id) || !valid_emoji_name(&emoji_name) {
        return Err(StatusCode::BAD_REQUEST.into_response());
    }

    blocking(move || {
        let reaction = Reaction {
            user_id: actor_id,
            post_id,
            emoji_name,
            create_at: 0,
        };
        state
            .host
            .remove_reaction(&reaction)
            .map_err(|e| host_failure("remove_reaction", e))
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
