//! Root post redaction for threaded channels.
//!
//! An authorized user can wipe the content of a thread's first post while
//! the replies stay attached. Once redacted, a post is sealed: edits are
//! rejected and new reactions are retracted.

pub mod commands;
pub mod config;
pub mod error;
pub mod hooks;
pub mod host;
pub mod ledger;
pub mod middleware;
pub mod permissions;
pub mod posts;
pub mod reactions;
pub mod redact;
pub mod redaction;
pub mod routes;
pub mod sqlite;
pub mod state;
pub mod users;

#[cfg(test)]
mod testing;
