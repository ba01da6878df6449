//! State-changing requests and the cache keys they invalidate.
//!
//! Invalidation happens only after the success response is observed. A
//! failed mutation leaves the cache untouched; nothing is applied
//! optimistically, so there is nothing to roll back.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dbadmin_common::{ApiError, BackupType, CreateBackupRequest};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{segment, Method};
use crate::confirm::Confirmed;
use crate::query::{QueryCache, Resource};

/// A mutation with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateBackup { kind: BackupType, compressed: bool },
    DeleteBackup { id: String },
    ApplyMigrations,
    RollbackMigration,
    SuspendTenant { id: String },
    ActivateTenant { id: String },
}

/// Parameter-free identity of an [`Action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CreateBackup,
    DeleteBackup,
    ApplyMigrations,
    RollbackMigration,
    SuspendTenant,
    ActivateTenant,
}

/// Which cached resources each action makes stale
pub const INVALIDATIONS: &[(ActionKind, &[Resource])] = &[
    (ActionKind::CreateBackup, &[Resource::Backups]),
    (ActionKind::DeleteBackup, &[Resource::Backups]),
    (ActionKind::ApplyMigrations, &[Resource::Migrations]),
    (ActionKind::RollbackMigration, &[Resource::Migrations]),
    (ActionKind::SuspendTenant, &[Resource::Tenants]),
    (ActionKind::ActivateTenant, &[Resource::Tenants]),
];

impl ActionKind {
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            ActionKind::DeleteBackup | ActionKind::RollbackMigration | ActionKind::SuspendTenant
        )
    }

    pub fn invalidates(&self) -> &'static [Resource] {
        INVALIDATIONS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, resources)| *resources)
            .unwrap_or(&[])
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::CreateBackup => "Create backup",
            ActionKind::DeleteBackup => "Delete backup",
            ActionKind::ApplyMigrations => "Apply migrations",
            ActionKind::RollbackMigration => "Rollback migration",
            ActionKind::SuspendTenant => "Suspend tenant",
            ActionKind::ActivateTenant => "Activate tenant",
        }
    }
}

/// Wire form of an action
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CreateBackup { .. } => ActionKind::CreateBackup,
            Action::DeleteBackup { .. } => ActionKind::DeleteBackup,
            Action::ApplyMigrations => ActionKind::ApplyMigrations,
            Action::RollbackMigration => ActionKind::RollbackMigration,
            Action::SuspendTenant { .. } => ActionKind::SuspendTenant,
            Action::ActivateTenant { .. } => ActionKind::ActivateTenant,
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.kind().is_destructive()
    }

    pub fn request(&self) -> MutationRequest {
        let (method, path, body) = match self {
            Action::CreateBackup { kind, compressed } => (
                Method::Post,
                "/backups".to_string(),
                serde_json::to_value(CreateBackupRequest {
                    kind: *kind,
                    compressed: *compressed,
                })
                .ok(),
            ),
            Action::DeleteBackup { id } => {
                (Method::Delete, format!("/backups/{}", segment(id)), None)
            }
            Action::ApplyMigrations => (Method::Post, "/migrations/apply".to_string(), None),
            Action::RollbackMigration => (Method::Post, "/migrations/rollback".to_string(), None),
            Action::SuspendTenant { id } => (
                Method::Post,
                format!("/tenants/{}/suspend", segment(id)),
                None,
            ),
            Action::ActivateTenant { id } => (
                Method::Post,
                format!("/tenants/{}/activate", segment(id)),
                None,
            ),
        };

        MutationRequest { method, path, body }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateBackup { kind, compressed } => {
                write!(f, "Create {} backup", kind)?;
                if *compressed {
                    write!(f, " (compressed)")?;
                }
                Ok(())
            }
            Action::DeleteBackup { id } => write!(f, "Delete backup {}", id),
            Action::SuspendTenant { id } => write!(f, "Suspend tenant {}", id),
            Action::ActivateTenant { id } => write!(f, "Activate tenant {}", id),
            other => f.write_str(other.kind().label()),
        }
    }
}

/// Sends mutations and invalidates the owning panel's cache on success
pub struct MutationDispatcher {
    cache: Arc<QueryCache>,
    pending: Mutex<HashSet<ActionKind>>,
}

/// Clears the pending flag for a kind when the request settles
struct PendingGuard<'a> {
    pending: &'a Mutex<HashSet<ActionKind>>,
    kind: ActionKind,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.kind);
    }
}

impl MutationDispatcher {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self {
            cache,
            pending: Mutex::new(HashSet::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashSet<ActionKind>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a mutation of this kind is in flight (used to disable actions)
    pub fn is_pending(&self, kind: ActionKind) -> bool {
        self.pending().contains(&kind)
    }

    /// Dispatch a non-destructive action.
    ///
    /// Destructive actions are refused here; they must come through
    /// [`MutationDispatcher::dispatch_confirmed`].
    pub async fn dispatch(&self, action: Action) -> Result<Value, ApiError> {
        if action.is_destructive() {
            return Err(ApiError::ConfirmationRequired(action.to_string()));
        }
        self.send(action).await
    }

    /// Dispatch an action the operator explicitly confirmed
    pub async fn dispatch_confirmed(&self, action: Confirmed<Action>) -> Result<Value, ApiError> {
        self.send(action.into_inner()).await
    }

    async fn send(&self, action: Action) -> Result<Value, ApiError> {
        let kind = action.kind();
        if !self.pending().insert(kind) {
            return Err(ApiError::MutationPending(kind.label().to_string()));
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            kind,
        };

        let request = action.request();
        info!(action = %action, method = request.method.as_str(), path = %request.path, "dispatching mutation");

        let response = self
            .cache
            .transport()
            .send_json(request.method, &request.path, request.body)
            .await;

        match response {
            Ok(body) => {
                for resource in kind.invalidates() {
                    self.cache.invalidate(*resource);
                }
                Ok(match body {
                    Value::Object(mut map) if map.contains_key("data") => {
                        map.remove("data").unwrap_or(Value::Null)
                    }
                    other => other,
                })
            }
            Err(e) => {
                warn!(action = %action, error = %e, "mutation failed");
                Err(e)
            }
        }
    }
}
