//! Plugin registration.
//!
//! The host calls [`enable`] once at startup and merges the returned router
//! into its own. Calling it twice and merging both routers is a host error
//! (the routes overlap); there is no way to unregister.

use crate::api::{self, Dnp3Api};
use crate::auth::{check_authorization, AccessGuard};
use crate::gui::{self, Dnp3Gui};
use crate::services::Services;
use crate::static_files;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use dnp3_core::{Access, PluginContext};
use std::sync::Arc;
use tracing::info;

pub const NAME: &str = dnp3_core::PLUGIN_NAME;
pub const DESCRIPTION: &str = dnp3_core::PLUGIN_DESCRIPTION;
pub const ADDRESS: &str = "/plugin/dnp3/gui";
pub const MIRROR_PATH: &str = "/plugin/dnp3/mirror";
pub const ACCESS: Access = Access::Red;

/// Static metadata the host shows for this plugin.
pub fn context() -> PluginContext {
    PluginContext {
        name: NAME.to_string(),
        description: DESCRIPTION.to_string(),
        address: ADDRESS.to_string(),
        access: ACCESS,
    }
}

/// Builds the plugin's controllers and routes.
///
/// Controller routes are wrapped in the authorization guard; static assets
/// are public.
pub fn enable(services: &Services) -> Router {
    let context = context();
    let gui = Arc::new(Dnp3Gui::new(services, context.clone()));
    let api = Arc::new(Dnp3Api::new(context.clone()));
    let guard = AccessGuard::new(services.auth_svc.clone(), context.access);

    let controllers = Router::new()
        .route(ADDRESS, get(gui::splash).with_state(gui))
        .route(MIRROR_PATH, post(api::mirror).with_state(api))
        .route_layer(from_fn_with_state(guard, check_authorization));

    info!(
        plugin = NAME,
        address = ADDRESS,
        access = %context.access,
        "Plugin enabled"
    );

    Router::new()
        .merge(controllers)
        .merge(static_files::create_static_router())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthConfig, AuthService};
    use dnp3_core::{InMemoryDataService, LocalFileService};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_context_matches_registration() {
        let ctx = context();
        assert_eq!(ctx.name, NAME);
        assert_eq!(ctx.address, ADDRESS);
        assert_eq!(ctx.access, Access::Red);
        assert_eq!(ctx, PluginContext::new(NAME, DESCRIPTION));
        assert_eq!(ctx, PluginContext::default());
    }

    #[tokio::test]
    async fn test_gui_service_resolves_plugin_payloads() {
        let dir = TempDir::new().unwrap();
        let payloads = dir.path().join("dnp3/payloads");
        fs::create_dir_all(&payloads).unwrap();
        fs::write(payloads.join("dnp3_actions"), b"\x7fELF").unwrap();

        let services = Services::new(
            Arc::new(InMemoryDataService::default()),
            Arc::new(LocalFileService::new(dir.path(), vec![])),
            Arc::new(AuthService::new(AuthConfig::default())),
        );
        let gui = Dnp3Gui::new(&services, context());

        assert_eq!(
            gui.service().payload_path("dnp3_actions").await,
            Some(payloads.join("dnp3_actions"))
        );
        assert_eq!(gui.service().payload_path("other").await, None);
    }
}
