//! Common types shared by the dbadmin client crates
//!
//! These mirror the shapes returned by the database-administration API. The
//! backend owns every entity; the client only decodes snapshots for display.

pub mod error;
pub mod status;

use serde::{Deserialize, Deserializer, Serialize};

pub use error::ApiError;
pub use status::{AuditStatus, BackupStatus, BackupType, MigrationStatus, SystemHealth, TenantStatus};

/// Response envelope used by every JSON endpoint: `{ "data": T }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Treat an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Database backup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupRecord {
    pub id: String,
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
    pub created_at: String,
    #[serde(default)]
    pub status: BackupStatus,
    #[serde(rename = "type", default)]
    pub kind: BackupType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub compressed: bool,
}

/// Body of `POST /backups`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateBackupRequest {
    #[serde(rename = "type")]
    pub kind: BackupType,
    pub compressed: bool,
}

/// Schema migration and its application state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationRecord {
    pub id: String,
    pub version: i64,
    pub name: String,
    #[serde(default)]
    pub status: MigrationStatus,
    #[serde(default)]
    pub applied_at: Option<String>,
    #[serde(default)]
    pub execution_time: Option<String>,
}

/// Tenant of the multi-tenant deployment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenantRecord {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub status: TenantStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub database_size: String,
    pub created_at: String,
    #[serde(default)]
    pub last_active: Option<String>,
}

/// Audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub id: String,
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_id: String,
    #[serde(default)]
    pub status: AuditStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_agent: String,
    pub timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: String,
}

/// Aggregate counters from `GET /audit-logs/stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_events: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success_rate: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub failed_events: u64,
}

/// Entry in the database table catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableDescriptor {
    pub table_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub row_count: i64,
    #[serde(default, alias = "total_size", deserialize_with = "null_as_default")]
    pub size: String,
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// Catalog payload; older servers wrap the list as `{ tables, count }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TableCatalog {
    List(Vec<TableDescriptor>),
    Wrapped {
        #[serde(default)]
        tables: Option<Vec<TableDescriptor>>,
    },
}

impl TableCatalog {
    pub fn into_tables(self) -> Vec<TableDescriptor> {
        match self {
            TableCatalog::List(tables) => tables,
            TableCatalog::Wrapped { tables } => tables.unwrap_or_default(),
        }
    }
}

/// Contents of a single table: ordered column names plus raw rows
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableData {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
}

/// System-wide counters from `GET /stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub database_size: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub table_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_connections: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub backup_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub migration_status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub audit_log_count: u64,
    #[serde(default)]
    pub last_backup: Option<String>,
    #[serde(default)]
    pub system_health: SystemHealth,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backup_record_decodes_type_field() {
        let record: BackupRecord = serde_json::from_value(json!({
            "id": "42",
            "filename": "erp-2024-01-01.sql.gz",
            "size": 1048576,
            "created_at": "2024-01-01T02:00:00Z",
            "status": "completed",
            "type": "incremental",
            "compressed": true
        }))
        .unwrap();

        assert_eq!(record.kind, BackupType::Incremental);
        assert_eq!(record.status, BackupStatus::Completed);
        assert!(record.compressed);
    }

    #[test]
    fn test_migration_nullable_fields() {
        let record: MigrationRecord = serde_json::from_value(json!({
            "id": "m1",
            "version": 3,
            "name": "add_tenants",
            "status": "pending",
            "applied_at": null,
            "execution_time": null
        }))
        .unwrap();

        assert_eq!(record.applied_at, None);
        assert_eq!(record.execution_time, None);
        assert_eq!(record.status, MigrationStatus::Pending);
    }

    #[test]
    fn test_tenant_with_unknown_status_still_decodes() {
        let response: ApiResponse<Vec<TenantRecord>> = serde_json::from_value(json!({
            "data": [{
                "id": "t1",
                "name": "Acme",
                "slug": "acme",
                "status": "archived",
                "user_count": null,
                "database_size": "12 MB",
                "created_at": "2024-01-01T00:00:00Z",
                "last_active": "2024-02-01T00:00:00Z"
            }]
        }))
        .unwrap();

        assert_eq!(response.data[0].status, TenantStatus::Unknown);
        assert_eq!(response.data[0].user_count, 0);
    }

    #[test]
    fn test_table_catalog_accepts_both_shapes() {
        let list: TableCatalog = serde_json::from_value(json!([
            { "table_name": "users", "row_count": 10, "size": "16 kB", "last_modified": null }
        ]))
        .unwrap();
        assert_eq!(list.into_tables().len(), 1);

        let wrapped: TableCatalog = serde_json::from_value(json!({
            "tables": [{ "table_name": "public.orders", "row_count": 5, "total_size": "8 kB" }],
            "count": 1
        }))
        .unwrap();
        let tables = wrapped.into_tables();
        assert_eq!(tables[0].table_name, "public.orders");
        assert_eq!(tables[0].size, "8 kB");
    }

    #[test]
    fn test_system_stats_defaults_missing_fields() {
        let stats: SystemStats = serde_json::from_value(json!({
            "database_size": "1.2 GB",
            "system_health": "critical"
        }))
        .unwrap();

        assert_eq!(stats.table_count, 0);
        assert_eq!(stats.system_health, SystemHealth::Critical);
        assert_eq!(stats.last_backup, None);
    }
}
