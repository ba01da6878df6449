//! Saving binary responses (backup downloads, audit exports) to disk

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dbadmin_common::BackupRecord;

/// Reduce a server-supplied name to a safe file name within the target dir
fn sanitize(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

/// File name for a backup download.
///
/// Uses the backup's own filename when the record is known, otherwise
/// `backup-<id>.bak`.
pub fn backup_filename(id: &str, record: Option<&BackupRecord>) -> String {
    record
        .map(|r| sanitize(&r.filename))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("backup-{}.bak", sanitize(id)))
}

/// File name for an audit log export taken at `at`
pub fn audit_export_filename(at: DateTime<Utc>) -> String {
    format!("audit-logs-{}.csv", at.format("%Y-%m-%dT%H-%M-%SZ"))
}

/// Write `bytes` to `dir/filename`, creating `dir` if needed
pub fn save(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    std::fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dbadmin_common::{BackupStatus, BackupType};

    fn record(filename: &str) -> BackupRecord {
        BackupRecord {
            id: "7".to_string(),
            filename: filename.to_string(),
            size: 10,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            status: BackupStatus::Completed,
            kind: BackupType::Full,
            compressed: true,
        }
    }

    #[test]
    fn test_backup_filename_prefers_record_name() {
        assert_eq!(
            backup_filename("7", Some(&record("erp-full-2024.sql.gz"))),
            "erp-full-2024.sql.gz"
        );
        assert_eq!(backup_filename("7", None), "backup-7.bak");
    }

    #[test]
    fn test_backup_filename_strips_path_components() {
        assert_eq!(
            backup_filename("7", Some(&record("../../etc/passwd"))),
            "passwd"
        );
        assert_eq!(backup_filename("7", Some(&record("..."))), "backup-7.bak");
        assert_eq!(backup_filename("a/b", None), "backup-b.bak");
    }

    #[test]
    fn test_audit_export_filename_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(audit_export_filename(at), "audit-logs-2024-03-09T14-05-00Z.csv");
        assert_eq!(audit_export_filename(at), audit_export_filename(at));
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("downloads");
        let path = save(&target, "backup-1.bak", b"payload").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"payload");
    }
}
