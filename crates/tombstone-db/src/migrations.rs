use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Channel every registered user joins.
pub const DEFAULT_CHANNEL_ID: &str = "general0000000000000000000";

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (host schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                is_system_admin INTEGER NOT NULL DEFAULT 0,
                create_at       INTEGER NOT NULL
            );

            CREATE TABLE channels (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE
            );

            CREATE TABLE channel_members (
                channel_id  TEXT NOT NULL REFERENCES channels(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                is_admin    INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (channel_id, user_id)
            );

            CREATE TABLE posts (
                id              TEXT PRIMARY KEY,
                channel_id      TEXT NOT NULL REFERENCES channels(id),
                user_id         TEXT NOT NULL,
                root_id         TEXT NOT NULL DEFAULT '',
                original_id     TEXT NOT NULL DEFAULT '',
                message         TEXT NOT NULL,
                message_source  TEXT NOT NULL DEFAULT '',
                file_ids        TEXT NOT NULL DEFAULT '[]',
                props           TEXT NOT NULL DEFAULT '{}',
                create_at       INTEGER NOT NULL,
                update_at       INTEGER NOT NULL,
                edit_at         INTEGER NOT NULL DEFAULT 0,
                delete_at       INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_posts_root ON posts(root_id, delete_at);

            CREATE TABLE reactions (
                user_id     TEXT NOT NULL,
                post_id     TEXT NOT NULL REFERENCES posts(id),
                emoji_name  TEXT NOT NULL,
                create_at   INTEGER NOT NULL,
                PRIMARY KEY (post_id, user_id, emoji_name)
            );

            CREATE TABLE file_infos (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL,
                channel_id  TEXT NOT NULL DEFAULT '',
                creator_id  TEXT NOT NULL,
                name        TEXT NOT NULL,
                create_at   INTEGER NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (attachment ledger)");
        conn.execute_batch(
            "
            CREATE TABLE attachment_ledger (
                file_id         TEXT PRIMARY KEY,
                audit_post_id   TEXT,
                detached_at     INTEGER
            );

            INSERT INTO schema_version (version) VALUES (2);
            "
        )?;
    }

    // Seed the default general channel
    conn.execute(
        "INSERT OR IGNORE INTO channels (id, name) VALUES (?1, 'general')",
        [DEFAULT_CHANNEL_ID],
    )?;

    Ok(())
}
