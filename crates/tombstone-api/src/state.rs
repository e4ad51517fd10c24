use std::sync::Arc;

use tombstone_db::Database;
use tombstone_gateway::dispatcher::Dispatcher;

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::hooks::ReactionGuard;
use crate::redaction::RedactionWorkflow;
use crate::sqlite::SqliteHost;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub host: Arc<SqliteHost>,
    pub workflow: Arc<RedactionWorkflow>,
    pub commands: CommandHandler,
    pub reaction_guard: ReactionGuard,
    pub system_admins: Vec<String>,
}

impl AppStateInner {
    /// Wire the redaction core to the SQLite host.
    pub fn new(db: Database, dispatcher: Dispatcher, config: &Config) -> AppState {
        let host = Arc::new(SqliteHost::new(
            Arc::new(db),
            dispatcher,
            config.post_edit_time_limit,
        ));
        let workflow = Arc::new(RedactionWorkflow::new(
            host.clone(),
            host.clone(),
            config.redacted_message.clone(),
        ));

        Arc::new(Self {
            commands: CommandHandler::new(host.clone(), workflow.clone()),
            reaction_guard: ReactionGuard::new(host.clone(), config.reaction_retract_delay),
            workflow,
            host,
            system_admins: config.system_admins.clone(),
        })
    }

    pub fn db(&self) -> &Database {
        self.host.db()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.host.dispatcher()
    }
}
