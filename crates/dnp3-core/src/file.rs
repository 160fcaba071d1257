//! File storage collaborator.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Host file service used to resolve payloads.
#[async_trait]
pub trait FileService: Send + Sync {
    /// Finds `name`, looking first in the plugin `location` (if given) and
    /// then in the shared payload directories.
    async fn find_file_path(&self, name: &str, location: Option<&str>) -> Option<PathBuf>;
}

/// File service backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileService {
    plugins_dir: PathBuf,
    payload_dirs: Vec<PathBuf>,
}

impl LocalFileService {
    pub fn new(plugins_dir: impl Into<PathBuf>, payload_dirs: Vec<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            payload_dirs,
        }
    }

    fn candidates(&self, name: &str, location: Option<&str>) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(self.payload_dirs.len() + 1);
        if let Some(location) = location {
            candidates.push(self.plugins_dir.join(location).join("payloads").join(name));
        }
        candidates.extend(self.payload_dirs.iter().map(|dir| dir.join(name)));
        candidates
    }
}

#[async_trait]
impl FileService for LocalFileService {
    async fn find_file_path(&self, name: &str, location: Option<&str>) -> Option<PathBuf> {
        // Reject anything that could escape the search directories
        if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
            return None;
        }

        for candidate in self.candidates(name, location) {
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                debug!(path = %candidate.display(), "Resolved file");
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_find_prefers_plugin_location() {
        let dir = TempDir::new().unwrap();
        let plugin_payloads = dir.path().join("plugins/dnp3/payloads");
        let shared = dir.path().join("data/payloads");
        fs::create_dir_all(&plugin_payloads).unwrap();
        fs::create_dir_all(&shared).unwrap();
        fs::write(plugin_payloads.join("dnp3_actions"), b"plugin").unwrap();
        fs::write(shared.join("dnp3_actions"), b"shared").unwrap();
        fs::write(shared.join("common.sh"), b"shared").unwrap();

        let svc = LocalFileService::new(dir.path().join("plugins"), vec![shared.clone()]);

        assert_eq!(
            svc.find_file_path("dnp3_actions", Some("dnp3")).await,
            Some(plugin_payloads.join("dnp3_actions"))
        );
        assert_eq!(
            svc.find_file_path("dnp3_actions", None).await,
            Some(shared.join("dnp3_actions"))
        );
        assert_eq!(
            svc.find_file_path("common.sh", Some("dnp3")).await,
            Some(shared.join("common.sh"))
        );
        assert_eq!(svc.find_file_path("missing", Some("dnp3")).await, None);
    }

    #[tokio::test]
    async fn test_find_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let svc = LocalFileService::new(dir.path(), vec![dir.path().to_path_buf()]);
        assert_eq!(svc.find_file_path("../etc/passwd", None).await, None);
        assert_eq!(svc.find_file_path("", None).await, None);
    }
}
