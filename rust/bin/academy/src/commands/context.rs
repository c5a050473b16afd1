//! Shared state for one CLI invocation: config, session and open store.

use std::sync::Arc;

use academy::{ensure_can_manage, ActionContext, Collection};
use academy_core::{AcademyConfig, Role, Session};
use academy_store::{DocumentStore, RedbStore};
use anyhow::Result;
use tracing::debug;

pub struct App {
    pub config: AcademyConfig,
    pub session: Session,
    pub store: Arc<dyn DocumentStore>,
}

impl App {
    /// Open the configured database, creating its directory if needed.
    pub fn open(config: AcademyConfig, role: Role) -> Result<Self> {
        let path = config.resolve_db_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = RedbStore::open(&path)
            .map_err(|e| anyhow::anyhow!("open {}: {e}", path.display()))?;
        debug!("opened {}", path.display());

        let session = Session::new("cli", config.operator.clone(), role);
        Ok(Self {
            config,
            session,
            store: Arc::new(store),
        })
    }

    /// Resolve a collection name the current role may read.
    pub fn collection(&self, name: &str) -> Result<Collection> {
        let collection = Collection::parse(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown collection: {name}"))?;
        if !collection.visible_to(self.session.role) {
            anyhow::bail!(
                "{collection} is not available to role '{}'",
                self.session.role
            );
        }
        Ok(collection)
    }

    /// Resolve a collection name the current role may write to.
    pub fn manage(&self, name: &str) -> Result<Collection> {
        let collection = Collection::parse(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown collection: {name}"))?;
        ensure_can_manage(&self.session, collection)?;
        Ok(collection)
    }

    pub fn action_context(&self, response: Option<String>) -> ActionContext {
        let ctx = ActionContext::new(self.session.display_name.clone());
        match response {
            Some(text) => ctx.with_response(text),
            None => ctx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(role: Role) -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let config = AcademyConfig {
            data_dir: Some(dir.path().join("data")),
            ..Default::default()
        };
        let app = App::open(config, role).unwrap();
        (dir, app)
    }

    #[test]
    fn opens_database_under_data_dir() {
        let (dir, _app) = app(Role::Admin);
        assert!(dir.path().join("data").join("academy.redb").exists());
    }

    #[test]
    fn teacher_reads_students_but_cannot_edit_them() {
        let (_dir, app) = app(Role::Teacher);
        assert_eq!(app.collection("students").unwrap(), Collection::Students);
        assert!(app.collection("invoices").is_err());
        assert!(app.manage("students").is_err());
        assert_eq!(app.manage("testReports").unwrap(), Collection::TestReports);
    }

    #[test]
    fn unknown_collection() {
        let (_dir, app) = app(Role::Admin);
        let err = app.collection("widgets").unwrap_err();
        assert!(err.to_string().contains("widgets"));
    }
}
