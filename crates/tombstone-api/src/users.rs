use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, info};

use tombstone_db::migrations::DEFAULT_CHANNEL_ID;
use tombstone_types::api::RegisterRequest;
use tombstone_types::ids::new_id;
use tombstone_types::models::{User, now_millis};

use crate::state::AppState;

/// POST /api/v4/users: Create a user and join them to the default channel.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = User {
        id: new_id(),
        is_system_admin: state.system_admins.contains(&req.username),
        username: req.username,
        create_at: now_millis(),
    };

    let db_state = state.clone();
    let new_user = user.clone();
    let created = tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        let db = db_state.db();
        if db.get_user_by_username(&new_user.username)?.is_some() {
            return Ok(false);
        }
        db.create_user(&new_user)?;
        db.add_channel_member(DEFAULT_CHANNEL_ID, &new_user.id, false)?;
        Ok(true)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("DB create_user error: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !created {
        return Err(StatusCode::CONFLICT);
    }

    info!("Registered {} ({})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}
