//! Plugin API controller

use crate::auth::Principal;
use crate::types::MirrorResponse;
use axum::{extract::State, Extension, Json};
use chrono::Utc;
use dnp3_core::PluginContext;
use std::sync::Arc;
use tracing::info;

pub struct Dnp3Api {
    context: PluginContext,
}

impl Dnp3Api {
    pub fn new(context: PluginContext) -> Self {
        Self { context }
    }

    /// Returns the submitted document unchanged, tagged with the plugin name.
    pub fn mirror(&self, document: serde_json::Value) -> MirrorResponse {
        MirrorResponse {
            plugin: self.context.name.clone(),
            received: document,
            received_at: Utc::now(),
        }
    }
}

/// POST /plugin/dnp3/mirror
pub async fn mirror(
    State(api): State<Arc<Dnp3Api>>,
    Extension(principal): Extension<Principal>,
    Json(document): Json<serde_json::Value>,
) -> Json<MirrorResponse> {
    info!(subject = %principal.subject, "Mirror request");
    Json(api.mirror(document))
}
