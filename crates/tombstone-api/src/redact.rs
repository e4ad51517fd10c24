use axum::{
    Extension, Form, Json,
    extract::{Query, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use tombstone_types::api::{CommandRequest, CommandResponse, RedactForm};
use tombstone_types::ids::is_valid_id;

use crate::middleware::Actor;
use crate::state::AppState;

/// POST /api/v1/commands: Run a slash command for the actor.
pub async fn execute_command(
    State(state): State<AppState>,
    Extension(Actor(actor_id)): Extension<Actor>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, StatusCode> {
    let response = tokio::task::spawn_blocking(move || {
        state.commands.execute(&actor_id, &req.command, &req.trigger_id)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(response))
}

/// POST /api/v1/redact_root_post: Confirmation submitted from the dialog.
///
/// The post id comes from the callback URL's query string or from the
/// form body; the query wins when both are present.
pub async fn redact_root_post(
    State(state): State<AppState>,
    Extension(Actor(actor_id)): Extension<Actor>,
    Query(query): Query<RedactForm>,
    form: Result<Form<RedactForm>, FormRejection>,
) -> Response {
    if !is_valid_id(&actor_id) {
        return (StatusCode::BAD_REQUEST, "Invalid user ID").into_response();
    }

    let post_id = query
        .post_id
        .or_else(|| form.ok().and_then(|Form(f)| f.post_id))
        .unwrap_or_default();
    if !is_valid_id(&post_id) {
        return (StatusCode::BAD_REQUEST, "Invalid post ID").into_response();
    }

    let result = tokio::task::spawn_blocking(move || state.workflow.redact(&actor_id, &post_id)).await;
    match result {
        Ok(Ok(_)) => StatusCode::OK.into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
