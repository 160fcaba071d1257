//! Plugin-scoped service.

use crate::services::Services;
use dnp3_core::{FileService, PLUGIN_ID};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Holds the plugin's handle on the host file service.
#[derive(Clone)]
pub struct Dnp3Service {
    file_svc: Arc<dyn FileService>,
}

impl Dnp3Service {
    pub fn new(services: &Services) -> Self {
        Self {
            file_svc: services.file_svc.clone(),
        }
    }

    /// Resolves a payload shipped with the plugin, falling back to the
    /// host's shared payload directories.
    pub async fn payload_path(&self, name: &str) -> Option<PathBuf> {
        let path = self.file_svc.find_file_path(name, Some(PLUGIN_ID)).await;
        debug!(target: "dnp3_svc", payload = name, found = path.is_some(), "Payload lookup");
        path
    }
}
