///! Database administration client
///!
///! Panels for backups, migrations, tenants, audit logs, the table browser and
///! the system overview, built on a keyed query cache, a mutation dispatcher
///! with explicit invalidation and a confirmation gate for destructive actions.

pub mod api;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod download;
pub mod logging;
pub mod mutation;
pub mod notify;
pub mod output;
pub mod panels;
pub mod query;
pub mod table;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, Transport};
pub use config::Config;
