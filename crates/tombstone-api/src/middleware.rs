use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header the authentication boundary in front of this service sets to the
/// verified user id.
pub const ACTOR_HEADER: &str = "X-User-ID";

/// Authenticated user id of the current request.
#[derive(Debug, Clone)]
pub struct Actor(pub String);

/// Reject requests that did not pass the authentication boundary.
pub async fn require_actor(mut req: Request, next: Next) -> Response {
    let actor = req
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    match actor {
        Some(user_id) => {
            req.extensions_mut().insert(Actor(user_id));
            next.run(req).await
        }
        None => (StatusCode::UNAUTHORIZED, "Not authorized").into_response(),
    }
}
