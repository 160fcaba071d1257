//! DNP3 API - HTTP surface of the DNP3 adversary emulation plugin
//!
//! This crate provides the plugin's controllers and registration hook, plus
//! a small host server that enables the plugin against in-process services.
//!
//! # Features
//!
//! - Splash page listing the plugin's abilities, one row per ability id
//! - Mirror API endpoint
//! - Embedded static assets under `/dnp3`
//! - JWT and API key authentication with team access levels
//! - Request ids, request logging and security headers
//!
//! # Example
//!
//! ```no_run
//! use dnp3_api::{ServerBuilder, ServerConfig};
//! use dnp3_core::InMemoryDataService;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = InMemoryDataService::from_dir("demo")?;
//!     let server = ServerBuilder::new(ServerConfig::default())
//!         .with_data_service(Arc::new(catalog))
//!         .build()?;
//!
//!     server.run().await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod error;
pub mod gui;
pub mod hook;
pub mod middleware;
pub mod service;
pub mod services;
pub mod static_files;
pub mod types;

use auth::{AuthConfig, AuthService};
use dnp3_core::{DataService, FileService, InMemoryDataService, LocalFileService};
use middleware::{logging_middleware, request_id_middleware, security_headers_middleware};
use services::Services;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

// ============================================================================
// Server Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
        }
    }
}

// ============================================================================
// Application Router
// ============================================================================

/// Enables the plugin and wraps it with the host routes and middleware.
pub fn build_app(services: &Services) -> axum::Router {
    axum::Router::new()
        .merge(hook::enable(services))
        .merge(auth::create_auth_router(services.auth_svc.clone()))
        .route("/health", axum::routing::get(middleware::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(axum::middleware::from_fn(security_headers_middleware))
                .layer(axum::middleware::from_fn(logging_middleware)),
        )
}

// ============================================================================
// Server Builder
// ============================================================================

pub struct ServerBuilder {
    config: ServerConfig,
    data_svc: Option<Arc<dyn DataService>>,
    file_svc: Option<Arc<dyn FileService>>,
    auth_svc: Option<Arc<AuthService>>,
}

impl ServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            data_svc: None,
            file_svc: None,
            auth_svc: None,
        }
    }

    pub fn with_data_service(mut self, data_svc: Arc<dyn DataService>) -> Self {
        self.data_svc = Some(data_svc);
        self
    }

    pub fn with_file_service(mut self, file_svc: Arc<dyn FileService>) -> Self {
        self.file_svc = Some(file_svc);
        self
    }

    pub fn with_auth_service(mut self, auth_svc: Arc<AuthService>) -> Self {
        self.auth_svc = Some(auth_svc);
        self
    }

    /// Build the server, filling unset services with empty defaults
    pub fn build(self) -> anyhow::Result<Server> {
        let data_svc = self
            .data_svc
            .unwrap_or_else(|| Arc::new(InMemoryDataService::default()));
        let file_svc = self
            .file_svc
            .unwrap_or_else(|| Arc::new(LocalFileService::new("plugins", Vec::new())));
        let auth_svc = self
            .auth_svc
            .unwrap_or_else(|| Arc::new(AuthService::new(AuthConfig::default())));

        Ok(Server {
            config: self.config,
            services: Services::new(data_svc, file_svc, auth_svc),
        })
    }
}

// ============================================================================
// Server
// ============================================================================

pub struct Server {
    config: ServerConfig,
    services: Services,
}

impl Server {
    /// Run the server until Ctrl-C or SIGTERM
    pub async fn run(self) -> anyhow::Result<()> {
        let app = build_app(&self.services);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "Server listening");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("Server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Graceful Shutdown
// ============================================================================

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl-C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
