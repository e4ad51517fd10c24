use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};

use tombstone_types::ids::new_id;
use tombstone_types::models::{FileInfo, Post, Reaction, User, now_millis};

use crate::Database;
use crate::models::{ChannelMemberRow, PostRow, encode_post_columns};

/// Result of a compare-and-set post update.
#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(Post),
    /// The stored revision no longer matches the submitted `update_at`.
    Conflict,
    NotFound,
}

const POST_COLUMNS: &str = "p.id, p.channel_id, p.user_id, p.root_id, p.original_id, p.message,
     p.message_source, p.file_ids, p.props, p.create_at, p.update_at, p.edit_at, p.delete_at,
     (SELECT COUNT(*) FROM posts r WHERE r.root_id = p.id AND r.delete_at = 0)";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &User) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, is_system_admin, create_at) VALUES (?1, ?2, ?3, ?4)",
                params![user.id, user.username, user.is_system_admin, user.create_at],
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    // -- Channels --

    pub fn add_channel_member(&self, channel_id: &str, user_id: &str, is_admin: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO channel_members (channel_id, user_id, is_admin) VALUES (?1, ?2, ?3)
                 ON CONFLICT(channel_id, user_id) DO UPDATE SET is_admin = excluded.is_admin",
                params![channel_id, user_id, is_admin],
            )?;
            Ok(())
        })
    }

    pub fn get_channel_member(&self, channel_id: &str, user_id: &str) -> Result<Option<ChannelMemberRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT channel_id, user_id, is_admin FROM channel_members
                     WHERE channel_id = ?1 AND user_id = ?2",
                    [channel_id, user_id],
                    |row| {
                        Ok(ChannelMemberRow {
                            channel_id: row.get(0)?,
                            user_id: row.get(1)?,
                            is_admin: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Posts --

    pub fn insert_post(&self, post: &Post) -> Result<()> {
        let (file_ids, props) = encode_post_columns(post)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, channel_id, user_id, root_id, original_id, message, message_source,
                                    file_ids, props, create_at, update_at, edit_at, delete_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    post.id,
                    post.channel_id,
                    post.user_id,
                    post.root_id,
                    post.original_id,
                    post.message,
                    post.message_source,
                    file_ids,
                    props,
                    post.create_at,
                    post.update_at,
                    post.edit_at,
                    post.delete_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<Post>> {
        self.with_conn(|conn| query_post(conn, id)?.map(PostRow::into_post).transpose())
    }

    /// Replace a live post with a new revision.
    ///
    /// The prior revision is archived under a fresh id with `delete_at` set,
    /// and the live post's `original_id` points at it. Commits only if the
    /// stored `update_at` still equals `post.update_at`.
    pub fn update_post(&self, post: &Post) -> Result<UpdateOutcome> {
        let (file_ids, props) = encode_post_columns(post)?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let current = match query_post(&tx, &post.id)? {
                Some(row) if row.delete_at == 0 => row,
                _ => return Ok(UpdateOutcome::NotFound),
            };
            if current.update_at != post.update_at {
                return Ok(UpdateOutcome::Conflict);
            }

            let now = now_millis();
            let archive_id = new_id();
            tx.execute(
                "INSERT INTO posts (id, channel_id, user_id, root_id, original_id, message, message_source,
                                    file_ids, props, create_at, update_at, edit_at, delete_at)
                 SELECT ?2, channel_id, user_id, root_id, original_id, message, message_source,
                        file_ids, props, create_at, update_at, edit_at, ?3
                 FROM posts WHERE id = ?1",
                params![post.id, archive_id, now],
            )?;

            // update_at must move even when two revisions land in the same millisecond
            let update_at = now.max(current.update_at + 1);
            tx.execute(
                "UPDATE posts
                 SET message = ?2, message_source = ?3, file_ids = ?4, props = ?5,
                     original_id = ?6, edit_at = ?7, update_at = ?8
                 WHERE id = ?1",
                params![post.id, post.message, post.message_source, file_ids, props, archive_id, now, update_at],
            )?;

            let updated = query_post(&tx, &post.id)?
                .ok_or_else(|| anyhow!("Post vanished during update: {}", post.id))?
                .into_post()?;
            tx.commit()?;

            Ok(UpdateOutcome::Updated(updated))
        })
    }

    // -- Reactions --

    /// Store a reaction. Returns false if the same user already reacted to
    /// the post with the same emoji.
    pub fn save_reaction(&self, reaction: &Reaction) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO reactions (user_id, post_id, emoji_name, create_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![reaction.user_id, reaction.post_id, reaction.emoji_name, reaction.create_at],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Delete a reaction. Returns false if it did not exist.
    pub fn delete_reaction(&self, user_id: &str, post_id: &str, emoji_name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM reactions WHERE user_id = ?1 AND post_id = ?2 AND emoji_name = ?3",
                [user_id, post_id, emoji_name],
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn get_reactions(&self, post_id: &str) -> Result<Vec<Reaction>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, post_id, emoji_name, create_at FROM reactions
                 WHERE post_id = ?1 ORDER BY create_at",
            )?;
            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(Reaction {
                        user_id: row.get(0)?,
                        post_id: row.get(1)?,
                        emoji_name: row.get(2)?,
                        create_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Files --

    pub fn insert_file(&self, file: &FileInfo) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO file_infos (id, post_id, channel_id, creator_id, name, create_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![file.id, file.post_id, file.channel_id, file.creator_id, file.name, file.create_at],
            )?;
            Ok(())
        })
    }

    pub fn get_file(&self, id: &str) -> Result<Option<FileInfo>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, post_id, channel_id, creator_id, name, create_at FROM file_infos WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(FileInfo {
                            id: row.get(0)?,
                            post_id: row.get(1)?,
                            channel_id: row.get(2)?,
                            creator_id: row.get(3)?,
                            name: row.get(4)?,
                            create_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<User>> {
    let sql = format!(
        "SELECT id, username, is_system_admin, create_at FROM users WHERE {} = ?1",
        column
    );
    let row = conn
        .query_row(&sql, [value], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                is_system_admin: row.get(2)?,
                create_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_post(conn: &Connection, id: &str) -> Result<Option<PostRow>> {
    let sql = format!("SELECT {} FROM posts p WHERE p.id = ?1", POST_COLUMNS);
    let row = conn
        .query_row(&sql, [id], |row| {
            Ok(PostRow {
                id: row.get(0)?,
                channel_id: row.get(1)?,
                user_id: row.get(2)?,
                root_id: row.get(3)?,
                original_id: row.get(4)?,
                message: row.get(5)?,
                message_source: row.get(6)?,
                file_ids: row.get(7)?,
                props: row.get(8)?,
                create_at: row.get(9)?,
                update_at: row.get(10)?,
                edit_at: row.get(11)?,
                delete_at: row.get(12)?,
                reply_count: row.get(13)?,
            })
        })
        .optional()?;

    Ok(row)
}
