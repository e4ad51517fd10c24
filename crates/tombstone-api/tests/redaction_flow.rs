use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use tombstone_api::config::Config;
use tombstone_api::middleware::ACTOR_HEADER;
use tombstone_api::routes;
use tombstone_api::state::{AppState, AppStateInner};
use tombstone_db::Database;
use tombstone_db::migrations::DEFAULT_CHANNEL_ID;
use tombstone_gateway::dispatcher::Dispatcher;
use tombstone_types::models::{Post, RedactionState, User};

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "TOMBSTONE_REACTION_RETRACT_DELAY_MS" => Some("5".to_string()),
            _ => None,
        })
        .unwrap();
        let db = Database::open_in_memory().unwrap();
        let state = AppStateInner::new(db, Dispatcher::new(), &config);
        Self {
            router: routes::router(state.clone()),
            state,
        }
    }

    async fn send(&self, method: &str, uri: &str, actor: Option<&str>, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header(ACTOR_HEADER, actor);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn register(&self, username: &str) -> User {
        let (status, body) = self
            .send("POST", "/api/v4/users", None, Some(json!({ "username": username })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_slice(&body).unwrap()
    }

    async fn create_post(&self, author: &User, message: &str, root_id: Option<&str>, files: &[&str]) -> Post {
        let body = json!({
            "channel_id": DEFAULT_CHANNEL_ID,
            "message": message,
            "root_id": root_id,
            "file_names": files,
        });
        let (status, body) = self.send("POST", "/api/v4/posts", Some(&author.id), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_slice(&body).unwrap()
    }

    async fn react(&self, user: &User, post_id: &str, emoji: &str) -> StatusCode {
        let uri = format!("/api/v4/posts/{}/reactions", post_id);
        self.send("POST", &uri, Some(&user.id), Some(json!({ "emoji_name": emoji })))
            .await
            .0
    }

    async fn redact(&self, actor: &User, post_id: &str) -> (StatusCode, String) {
        let uri = format!("/api/v1/redact_root_post?post_id={}", post_id);
        let (status, body) = self.send("POST", &uri, Some(&actor.id), None).await;
        (status, String::from_utf8(body).unwrap())
    }

    async fn fetch(&self, actor: &User, post_id: &str) -> Post {
        let (status, body) = self
            .send("GET", &format!("/api/v4/posts/{}", post_id), Some(&actor.id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    /// Root post with three replies, two reactions and one file.
    async fn thread(&self, author: &User, others: &[&User]) -> Post {
        let root = self.create_post(author, "secret plans", None, &["plans.pdf"]).await;
        for (i, user) in others.iter().cycle().take(3).enumerate() {
            self.create_post(user, &format!("reply {}", i), Some(&root.id), &[]).await;
        }
        assert_eq!(self.react(others[0], &root.id, "thumbsup").await, StatusCode::CREATED);
        assert_eq!(self.react(author, &root.id, "eyes").await, StatusCode::CREATED);
        self.fetch(author, &root.id).await
    }
}

#[tokio::test]
async fn author_redacts_thread_root() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let root = app.thread(&alice, &[&bob]).await;
    assert_eq!(root.reply_count, 3);
    let file_id = root.file_ids[0].clone();

    let (status, _) = app.redact(&alice, &root.id).await;
    assert_eq!(status, StatusCode::OK);

    let sealed = app.fetch(&alice, &root.id).await;
    assert_eq!(sealed.message, app.state.workflow.placeholder());
    assert_eq!(sealed.redaction, RedactionState::Sealed);
    assert!(sealed.file_ids.is_empty());
    assert_eq!(sealed.reply_count, 3);
    assert!(!sealed.original_id.is_empty());
    assert!(app.state.db().get_reactions(&root.id).unwrap().is_empty());

    let file = app.state.db().get_file(&file_id).unwrap().unwrap();
    assert_eq!(file.post_id, sealed.original_id);
    let entry = app.state.db().get_ledger_entry(&file_id).unwrap().unwrap();
    assert_eq!(entry.audit_post_id.as_deref(), Some(sealed.original_id.as_str()));

    // The archived revision keeps the original content for audit
    let archived = app.state.db().get_post(&sealed.original_id).unwrap().unwrap();
    assert_eq!(archived.message, "secret plans");
    assert!(archived.is_deleted());
}

#[tokio::test]
async fn redaction_is_permission_checked_and_not_repeatable() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let mod_user = app.register("moderator").await;
    app.state
        .db()
        .add_channel_member(DEFAULT_CHANNEL_ID, &mod_user.id, true)
        .unwrap();
    let root = app.thread(&alice, &[&bob]).await;

    let (status, _) = app.redact(&bob, &root.id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.fetch(&bob, &root.id).await, root);

    let (status, _) = app.redact(&mod_user, &root.id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.redact(&alice, &root.id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("already redacted"), "{}", body);
}

#[tokio::test]
async fn only_thread_roots_can_be_redacted() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let lonely = app.create_post(&alice, "no replies", None, &[]).await;

    let (status, _) = app.redact(&alice, &lonely.id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.fetch(&alice, &lonely.id).await.message, "no replies");
}

#[tokio::test]
async fn malformed_confirmation_is_rejected() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let (status, body) = app.send("POST", "/api/v1/redact_root_post", Some(&alice.id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Invalid post ID");

    let (status, body) = app
        .send("POST", "/api/v1/redact_root_post?post_id=abc", Some("not-a-user"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Invalid user ID");

    let (status, _) = app.send("POST", "/api/v1/redact_root_post?post_id=abc", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sealed_post_rejects_edits() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let root = app.thread(&alice, &[&bob]).await;

    let uri = format!("/api/v4/posts/{}", root.id);
    let (status, _) = app
        .send("PUT", &uri, Some(&alice.id), Some(json!({ "message": "typo fix" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    app.redact(&alice, &root.id).await;
    let channel_admin = app.register("moderator").await;
    app.state
        .db()
        .add_channel_member(DEFAULT_CHANNEL_ID, &channel_admin.id, true)
        .unwrap();

    for editor in [&alice, &channel_admin] {
        let (status, body) = app
            .send("PUT", &uri, Some(&editor.id), Some(json!({ "message": "back again" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, b"Redacted root post cannot be edited");
    }
    assert_eq!(app.fetch(&alice, &root.id).await.message, app.state.workflow.placeholder());
}

#[tokio::test]
async fn reactions_on_sealed_post_are_retracted() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let root = app.thread(&alice, &[&bob]).await;
    app.redact(&alice, &root.id).await;

    assert_eq!(app.react(&bob, &root.id, "tada").await, StatusCode::CREATED);

    let mut remaining = app.state.db().get_reactions(&root.id).unwrap();
    for _ in 0..200 {
        if remaining.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        remaining = app.state.db().get_reactions(&root.id).unwrap();
    }
    assert!(remaining.is_empty(), "reaction survived: {:?}", remaining);
}

#[tokio::test]
async fn slash_command_validates_before_opening_dialog() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let root = app.thread(&alice, &[&bob]).await;

    let command = |text: String| json!({ "command": text, "trigger_id": "trigger" });

    let (status, body) = app
        .send("POST", "/api/v1/commands", Some(&alice.id), Some(command("/redactroot".into())))
        .await;
    assert_eq!(status, StatusCode::OK);
    let text = serde_json::from_slice::<Value>(&body).unwrap()["text"].as_str().unwrap().to_string();
    assert!(text.starts_with("Can't redact root post: invalid number of arguments"), "{}", text);

    let (status, body) = app
        .send("POST", "/api/v1/commands", Some(&bob.id), Some(command(format!("/redactroot {}", root.id))))
        .await;
    assert_eq!(status, StatusCode::OK);
    let reply: Value = serde_json::from_slice(&body).unwrap();
    assert!(reply["text"].as_str().unwrap().starts_with("Can't redact root post: "));

    let mut events = app.state.dispatcher().subscribe();
    let (status, body) = app
        .send("POST", "/api/v1/commands", Some(&alice.id), Some(command(format!("/redactroot {}", root.id))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({}));
    let opened = events.recv().await.unwrap();
    assert_eq!(opened.event.target_user(), Some(alice.id.as_str()));
}
