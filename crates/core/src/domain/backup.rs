use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta, ResourceStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Web,
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub tenant_id: String,
    pub webroot_id: Option<String>,
    pub database_id: Option<String>,
    pub kind: BackupKind,
    pub node_id: String,
    pub storage_path: Option<String>,
    pub size_bytes: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Backup {
    /// Path the agent writes the archive to, per spec's naming convention:
    /// `.tar.gz` for web backups, `.sql.gz` for database backups.
    pub fn storage_path_for(tenant_id: &str, backup_id: &str, kind: BackupKind) -> String {
        let ext = match kind {
            BackupKind::Web => "tar.gz",
            BackupKind::Database => "sql.gz",
        };
        format!("/var/backups/hosting/{tenant_id}/{backup_id}.{ext}")
    }
}

impl Resource for Backup {
    fn id(&self) -> &str {
        &self.meta.id
    }
    fn status(&self) -> ResourceStatus {
        self.meta.status
    }
    fn status_message(&self) -> Option<&str> {
        self.meta.status_message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_backup_path_uses_tar_gz() {
        let path = Backup::storage_path_for("t_test123456", "bkp-1", BackupKind::Web);
        assert_eq!(path, "/var/backups/hosting/t_test123456/bkp-1.tar.gz");
    }

    #[test]
    fn database_backup_path_uses_sql_gz() {
        let path = Backup::storage_path_for("t_test123456", "bkp-1", BackupKind::Database);
        assert_eq!(path, "/var/backups/hosting/t_test123456/bkp-1.sql.gz");
    }
}
