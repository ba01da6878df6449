//! In-memory stand-in for the dbadmin API used by unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dbadmin_common::ApiError;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::api::{Method, Transport};

struct State {
    backups: Vec<Value>,
    migrations: Vec<Value>,
    tenants: Vec<Value>,
    audit_logs: Vec<Value>,
    tables: Vec<Value>,
    table_data: HashMap<String, Value>,
    stats: Value,
    requests: Vec<(Method, String)>,
    fail_next: Option<u16>,
    next_backup_id: u64,
}

#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
    hold: Arc<watch::Sender<bool>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let state = State {
            backups: vec![
                json!({ "id": "41", "filename": "erp-41.sql.gz", "size": 2048, "created_at": "2024-01-01T02:00:00Z", "status": "completed", "type": "full", "compressed": true }),
                json!({ "id": "42", "filename": "erp-42.sql", "size": 1024, "created_at": "2024-01-02T02:00:00Z", "status": "failed", "type": "incremental", "compressed": false }),
                json!({ "id": "43", "filename": "erp-43.sql.gz", "size": 4096, "created_at": "2024-01-03T02:00:00Z", "status": "in_progress", "type": "differential", "compressed": true }),
            ],
            migrations: vec![
                json!({ "id": "m1", "version": 1, "name": "create_users", "status": "applied", "applied_at": "2024-01-01T00:00:00Z", "execution_time": "12ms" }),
                json!({ "id": "m2", "version": 2, "name": "create_orders", "status": "applied", "applied_at": "2024-01-01T00:00:01Z", "execution_time": "8ms" }),
                json!({ "id": "m3", "version": 3, "name": "add_tenants", "status": "pending", "applied_at": null, "execution_time": null }),
                json!({ "id": "m4", "version": 4, "name": "add_audit_index", "status": "pending", "applied_at": null, "execution_time": null }),
                json!({ "id": "m5", "version": 5, "name": "drop_legacy", "status": "pending", "applied_at": null, "execution_time": null }),
            ],
            tenants: vec![
                json!({ "id": "t1", "name": "Acme", "slug": "acme", "status": "active", "user_count": 5, "database_size": "12 MB", "created_at": "2023-06-01T00:00:00Z", "last_active": "2024-02-01T00:00:00Z" }),
                json!({ "id": "t2", "name": "Globex", "slug": "globex", "status": "active", "user_count": 10, "database_size": "40 MB", "created_at": "2023-07-01T00:00:00Z", "last_active": "2024-02-02T00:00:00Z" }),
                json!({ "id": "t3", "name": "Initech", "slug": "initech", "status": "suspended", "user_count": 0, "database_size": "1 MB", "created_at": "2023-08-01T00:00:00Z", "last_active": "2023-12-01T00:00:00Z" }),
            ],
            audit_logs: vec![
                json!({ "id": "a1", "action": "login", "user_id": "u1", "user_email": "alice@example.com", "resource_type": "session", "resource_id": "s1", "status": "success", "ip_address": "10.0.0.1", "user_agent": "curl/8", "timestamp": "2024-02-01T10:00:00Z", "details": "" }),
                json!({ "id": "a2", "action": "delete", "user_id": "u2", "user_email": "bob@example.com", "resource_type": "backup", "resource_id": "40", "status": "failure", "ip_address": "10.0.0.2", "user_agent": "curl/8", "timestamp": "2024-02-01T11:00:00Z", "details": "permission denied" }),
                json!({ "id": "a3", "action": "update", "user_id": "u1", "user_email": "alice@example.com", "resource_type": "tenant", "resource_id": "t1", "status": "warning", "ip_address": "10.0.0.1", "user_agent": "curl/8", "timestamp": "2024-02-01T12:00:00Z", "details": "slow" }),
            ],
            tables: vec![
                json!({ "table_name": "users", "row_count": 2, "size": "16 kB", "last_modified": "2024-02-01T00:00:00Z" }),
                json!({ "table_name": "orders", "row_count": 0, "size": "8 kB", "last_modified": null }),
            ],
            table_data: HashMap::from([
                (
                    "users".to_string(),
                    json!({
                        "columns": ["id", "email", "deleted_at"],
                        "rows": [
                            { "id": 1, "email": "alice@example.com", "deleted_at": null },
                            { "id": 2, "email": "", "deleted_at": "2024-01-01T00:00:00Z" }
                        ],
                        "total": 2
                    }),
                ),
                (
                    "orders".to_string(),
                    json!({ "columns": ["id"], "rows": [], "total": 0 }),
                ),
            ]),
            stats: json!({
                "database_size": "1.2 GB",
                "table_count": 42,
                "active_connections": 7,
                "backup_count": 3,
                "migration_status": "3 pending",
                "tenant_count": 3,
                "audit_log_count": 3,
                "last_backup": "2024-01-03T02:00:00Z",
                "system_health": "warning"
            }),
            requests: Vec::new(),
            fail_next: None,
            next_backup_id: 100,
        };

        let (hold, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(state)),
            hold: Arc::new(hold),
        }
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Park every request until [`FakeBackend::release_requests`]
    pub fn hold_requests(&self) {
        self.hold.send_replace(true);
    }

    pub fn release_requests(&self) {
        self.hold.send_replace(false);
    }

    /// Make the next request fail with `status`
    pub fn fail_next(&self, status: u16) {
        self.state().fail_next = Some(status);
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state().requests.clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|(_, p)| p == path)
            .count()
    }

    pub fn remove_backup(&self, id: &str) {
        self.state().backups.retain(|b| b["id"] != json!(id));
    }

    pub fn set_tenants(&self, tenants: Vec<Value>) {
        self.state().tenants = tenants;
    }

    async fn wait_for_release(&self) {
        let mut rx = self.hold.subscribe();
        while *rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    async fn handle(&self, method: Method, path: &str, body: Option<Value>) -> Result<Response, ApiError> {
        {
            let mut state = self.state();
            state.requests.push((method, path.to_string()));
        }

        self.wait_for_release().await;

        let mut state = self.state();
        if let Some(status) = state.fail_next.take() {
            return Err(ApiError::Server {
                status,
                message: "injected failure".to_string(),
            });
        }

        let (route, query) = match path.split_once('?') {
            Some((route, query)) => (route, parse_query(query)),
            None => (path, HashMap::new()),
        };
        let segments: Vec<&str> = route.trim_start_matches('/').split('/').collect();

        let not_found = || ApiError::Server {
            status: 404,
            message: format!("no route for {}", path),
        };

        let data = match (method, segments.as_slice()) {
            (Method::Get, ["backups"]) => json!(state.backups),
            (Method::Post, ["backups"]) => {
                let body = body.unwrap_or(Value::Null);
                let id = state.next_backup_id.to_string();
                state.next_backup_id += 1;
                let record = json!({
                    "id": id,
                    "filename": format!("erp-{}.sql", id),
                    "size": 0,
                    "created_at": "2024-03-01T00:00:00Z",
                    "status": "in_progress",
                    "type": body["type"],
                    "compressed": body["compressed"]
                });
                state.backups.push(record.clone());
                record
            }
            (Method::Delete, ["backups", id]) => {
                let id = decode(id);
                let before = state.backups.len();
                state.backups.retain(|b| b["id"] != json!(id));
                if state.backups.len() == before {
                    return Err(not_found());
                }
                json!({ "deleted": id })
            }
            (Method::Get, ["backups", id, "download"]) => {
                let id = decode(id);
                if !state.backups.iter().any(|b| b["id"] == json!(id)) {
                    return Err(not_found());
                }
                return Ok(Response::Bytes(format!("BACKUP:{}", id).into_bytes()));
            }
            (Method::Get, ["migrations", "status"]) => json!(state.migrations),
            (Method::Post, ["migrations", "apply"]) => {
                let mut applied = 0;
                for m in state.migrations.iter_mut() {
                    if m["status"] == "pending" {
                        m["status"] = json!("applied");
                        m["applied_at"] = json!("2024-03-01T00:00:00Z");
                        m["execution_time"] = json!("5ms");
                        applied += 1;
                    }
                }
                json!({ "applied": applied })
            }
            (Method::Post, ["migrations", "rollback"]) => {
                let last = state
                    .migrations
                    .iter_mut()
                    .filter(|m| m["status"] == "applied")
                    .max_by_key(|m| m["version"].as_i64().unwrap_or(0));
                match last {
                    Some(m) => {
                        m["status"] = json!("pending");
                        m["applied_at"] = Value::Null;
                        m["execution_time"] = Value::Null;
                        json!({ "rolled_back": m["version"] })
                    }
                    None => {
                        return Err(ApiError::Server {
                            status: 409,
                            message: "nothing to roll back".to_string(),
                        })
                    }
                }
            }
            (Method::Get, ["tenants"]) => json!(state.tenants),
            (Method::Post, ["tenants", id, transition @ ("suspend" | "activate")]) => {
                let id = decode(id);
                let status = if *transition == "suspend" { "suspended" } else { "active" };
                match state.tenants.iter_mut().find(|t| t["id"] == json!(id)) {
                    Some(t) => {
                        t["status"] = json!(status);
                        t.clone()
                    }
                    None => return Err(not_found()),
                }
            }
            (Method::Get, ["audit-logs"]) => {
                let search = query.get("search").map(|s| s.to_lowercase());
                let logs: Vec<&Value> = state
                    .audit_logs
                    .iter()
                    .filter(|l| {
                        search.as_ref().map_or(true, |s| {
                            ["user_email", "action", "resource_type"]
                                .iter()
                                .any(|f| l[*f].as_str().unwrap_or("").to_lowercase().contains(s))
                        })
                    })
                    .filter(|l| query.get("status").map_or(true, |s| l["status"] == json!(s)))
                    .filter(|l| query.get("action").map_or(true, |a| l["action"] == json!(a)))
                    .collect();
                json!(logs)
            }
            (Method::Get, ["audit-logs", "stats"]) => {
                let total = state.audit_logs.len() as u64;
                let failed = state.audit_logs.iter().filter(|l| l["status"] == "failure").count() as u64;
                let success = state.audit_logs.iter().filter(|l| l["status"] == "success").count() as f64;
                json!({
                    "total_events": total,
                    "success_rate": if total == 0 { 0.0 } else { (success / total as f64 * 1000.0).round() / 10.0 },
                    "failed_events": failed
                })
            }
            (Method::Get, ["audit-logs", "export"]) => {
                let mut csv = String::from("id,action,user_email,status\n");
                for l in &state.audit_logs {
                    csv.push_str(&format!(
                        "{},{},{},{}\n",
                        l["id"].as_str().unwrap_or(""),
                        l["action"].as_str().unwrap_or(""),
                        l["user_email"].as_str().unwrap_or(""),
                        l["status"].as_str().unwrap_or("")
                    ));
                }
                return Ok(Response::Bytes(csv.into_bytes()));
            }
            (Method::Get, ["database", "tables"]) => json!(state.tables),
            (Method::Get, ["database", "tables", name]) => {
                match state.table_data.get(&decode(name)) {
                    Some(data) => data.clone(),
                    None => return Err(not_found()),
                }
            }
            (Method::Get, ["stats"]) => state.stats.clone(),
            _ => return Err(not_found()),
        };

        Ok(Response::Json(json!({ "data": data })))
    }
}

enum Response {
    Json(Value),
    Bytes(Vec<u8>),
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), decode(v)))
        .collect()
}

#[async_trait]
impl Transport for FakeBackend {
    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        match self.handle(Method::Get, path, None).await? {
            Response::Json(value) => Ok(value),
            Response::Bytes(_) => Err(ApiError::Decode("binary response".to_string())),
        }
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        match self.handle(method, path, body).await? {
            Response::Json(value) => Ok(value),
            Response::Bytes(_) => Err(ApiError::Decode("binary response".to_string())),
        }
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        match self.handle(Method::Get, path, None).await? {
            Response::Bytes(bytes) => Ok(bytes),
            Response::Json(value) => Ok(value.to_string().into_bytes()),
        }
    }
}
