//! Host services handed to the plugin when it is enabled.

use crate::auth::AuthService;
use dnp3_core::{DataService, FileService};
use std::sync::Arc;

/// Registry of host collaborators, cloned cheaply into controllers.
#[derive(Clone)]
pub struct Services {
    pub data_svc: Arc<dyn DataService>,
    pub file_svc: Arc<dyn FileService>,
    pub auth_svc: Arc<AuthService>,
}

impl Services {
    pub fn new(
        data_svc: Arc<dyn DataService>,
        file_svc: Arc<dyn FileService>,
        auth_svc: Arc<AuthService>,
    ) -> Self {
        Self {
            data_svc,
            file_svc,
            auth_svc,
        }
    }
}
