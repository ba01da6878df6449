//! Resource panels.
//!
//! Each panel owns its query cache, dispatcher, notifications and view state.
//! Fetch and mutation failures stop here: they become notifications and a
//! local load state, and never propagate to sibling panels.

pub mod audit;
pub mod backups;
pub mod dashboard;
pub mod database;
pub mod migrations;
pub mod tenants;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::Transport;
use crate::confirm::Confirmed;
use crate::mutation::{Action, ActionKind, MutationDispatcher};
use crate::notify::Notifications;
use crate::query::{QueryCache, QueryKey};

pub use audit::{AuditFilters, AuditLogsPanel};
pub use backups::BackupsPanel;
pub use dashboard::DashboardPanel;
pub use database::{DatabasePanel, DatabaseView, DrillDownTicket};
pub use migrations::MigrationsPanel;
pub use tenants::TenantsPanel;

/// Loading status of a panel's list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

impl LoadState {
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed(_))
    }
}

/// Settings every panel is built with
#[derive(Clone)]
pub struct PanelOptions {
    pub page_size: usize,
    pub stale_time: Duration,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            page_size: crate::table::DEFAULT_PAGE_SIZE,
            stale_time: crate::query::DEFAULT_STALE_TIME,
        }
    }
}

/// Cache, dispatcher and notification plumbing shared by all panels
pub struct PanelCore {
    cache: Arc<QueryCache>,
    dispatcher: MutationDispatcher,
    pub notifications: Notifications,
    pub load_state: LoadState,
}

impl PanelCore {
    pub fn new(transport: Arc<dyn Transport>, options: &PanelOptions) -> Self {
        let cache = Arc::new(QueryCache::with_stale_time(transport, options.stale_time));
        Self {
            dispatcher: MutationDispatcher::new(Arc::clone(&cache)),
            cache,
            notifications: Notifications::new(),
            load_state: LoadState::Idle,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn is_pending(&self, kind: ActionKind) -> bool {
        self.dispatcher.is_pending(kind)
    }

    /// Fetch the panel's main list. On failure the state becomes `Failed`
    /// and `None` is returned; previously shown rows stay untouched.
    pub async fn load<T: DeserializeOwned>(&mut self, key: &QueryKey, what: &str) -> Option<T> {
        self.load_state = LoadState::Loading;
        match self.cache.fetch::<T>(key).await {
            Ok(data) => {
                self.load_state = LoadState::Loaded;
                Some(data)
            }
            Err(e) => {
                self.notifications
                    .error(format!("Failed to load {}: {}", what, e.user_message()));
                self.load_state = LoadState::Failed(e.to_string());
                None
            }
        }
    }

    /// Secondary fetch that does not drive the panel's load state
    pub async fn load_extra<T: DeserializeOwned>(&mut self, key: &QueryKey, what: &str) -> Option<T> {
        match self.cache.fetch::<T>(key).await {
            Ok(data) => Some(data),
            Err(e) => {
                self.notifications
                    .warning(format!("Failed to load {}: {}", what, e.user_message()));
                None
            }
        }
    }

    /// Dispatch a non-destructive action, reporting the outcome
    pub async fn mutate(&mut self, action: Action, success: &str) -> Option<Value> {
        let result = self.dispatcher.dispatch(action.clone()).await;
        self.report(&action, result, success)
    }

    /// Dispatch a confirmed action, reporting the outcome
    pub async fn mutate_confirmed(&mut self, action: Confirmed<Action>, success: &str) -> Option<Value> {
        let label = action.get().clone();
        let result = self.dispatcher.dispatch_confirmed(action).await;
        self.report(&label, result, success)
    }

    fn report(
        &mut self,
        action: &Action,
        result: Result<Value, dbadmin_common::ApiError>,
        success: &str,
    ) -> Option<Value> {
        match result {
            Ok(value) => {
                self.notifications.success(success);
                Some(value)
            }
            Err(e) => {
                self.notifications
                    .error(format!("{} failed: {}", action, e.user_message()));
                None
            }
        }
    }
}
