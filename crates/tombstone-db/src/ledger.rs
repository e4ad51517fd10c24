//! Attachment reassignment ledger.
//!
//! Records which files were pulled off a live post and which archived post
//! revision they now belong to. Both operations are upserts, so repeating
//! them with the same arguments leaves the ledger unchanged.

use anyhow::{Result, bail};
use rusqlite::{OptionalExtension, params};

use crate::Database;
use crate::models::LedgerRow;

impl Database {
    /// Clear a file's live channel association and note when it happened.
    /// The first detachment time is kept on repeat calls.
    pub fn detach_file(&self, file_id: &str, now: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let changed = tx.execute("UPDATE file_infos SET channel_id = '' WHERE id = ?1", [file_id])?;
            if changed == 0 {
                bail!("Unknown attachment: {}", file_id);
            }

            tx.execute(
                "INSERT INTO attachment_ledger (file_id, detached_at) VALUES (?1, ?2)
                 ON CONFLICT(file_id) DO UPDATE
                 SET detached_at = COALESCE(attachment_ledger.detached_at, excluded.detached_at)",
                params![file_id, now],
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    /// Point every file at `post_id` and record it as their audit post.
    /// All or nothing: an unknown file rolls the whole batch back.
    pub fn attach_files_to_post(&self, post_id: &str, file_ids: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            for file_id in file_ids {
                let changed = tx.execute(
                    "UPDATE file_infos SET post_id = ?1 WHERE id = ?2",
                    [post_id, file_id.as_str()],
                )?;
                if changed == 0 {
                    bail!("Unknown attachment: {}", file_id);
                }

                tx.execute(
                    "INSERT INTO attachment_ledger (file_id, audit_post_id) VALUES (?1, ?2)
                     ON CONFLICT(file_id) DO UPDATE SET audit_post_id = excluded.audit_post_id",
                    [file_id.as_str(), post_id],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_ledger_entry(&self, file_id: &str) -> Result<Option<LedgerRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT file_id, audit_post_id, detached_at FROM attachment_ledger WHERE file_id = ?1",
                    [file_id],
                    |row| {
                        Ok(LedgerRow {
                            file_id: row.get(0)?,
                            audit_post_id: row.get(1)?,
                            detached_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }
}
