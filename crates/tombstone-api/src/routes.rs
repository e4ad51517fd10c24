use axum::{
    Extension, Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};

use tombstone_gateway::connection;

use crate::commands::REDACT_ROUTE;
use crate::middleware::{Actor, require_actor};
use crate::state::AppState;
use crate::{posts, reactions, redact, users};

/// Every route of the service. Only registration skips the actor gate.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/v4/users", post(users::register))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/v4/posts", post(posts::create_post))
        .route("/api/v4/posts/{post_id}", get(posts::get_post).put(posts::edit_post))
        .route("/api/v4/posts/{post_id}/reactions", post(reactions::add_reaction))
        .route(
            "/api/v4/posts/{post_id}/reactions/{emoji_name}",
            delete(reactions::remove_reaction),
        )
        .route("/api/v1/commands", post(redact::execute_command))
        .route(REDACT_ROUTE, post(redact::redact_root_post))
        .route("/gateway", get(ws_upgrade))
        .layer(middleware::from_fn(require_actor))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn ws_upgrade(
    State(state): State<AppState>,
    Extension(Actor(user_id)): Extension<Actor>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let dispatcher = state.dispatcher().clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, user_id))
}
