//! Splash page controller

use crate::error::ApiError;
use crate::service::Dnp3Service;
use crate::services::Services;
use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use dnp3_core::{AbilityViewModel, Collection, DataError, DataService, PluginContext, PLUGIN_ID};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Data rendered by the splash page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplashView {
    pub name: String,
    pub description: String,
    pub abilities: Vec<AbilityViewModel>,
}

pub struct Dnp3Gui {
    context: PluginContext,
    data_svc: Arc<dyn DataService>,
    dnp3_svc: Dnp3Service,
}

impl Dnp3Gui {
    pub fn new(services: &Services, context: PluginContext) -> Self {
        Self {
            context,
            data_svc: services.data_svc.clone(),
            dnp3_svc: Dnp3Service::new(services),
        }
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    pub fn service(&self) -> &Dnp3Service {
        &self.dnp3_svc
    }

    /// Builds the splash view from the plugin's abilities.
    ///
    /// The catalog returns one entry per executor variant, so entries are
    /// collapsed by ability id. The last variant seen wins; ids keep the
    /// position where they first appeared.
    pub async fn splash(&self) -> Result<SplashView, DataError> {
        let catalog = self.data_svc.locate(Collection::Abilities).await?;

        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut abilities: Vec<AbilityViewModel> = Vec::new();
        for ability in &catalog {
            if ability.which_plugin().await != Some(PLUGIN_ID) {
                continue;
            }

            let view = AbilityViewModel::from(ability);
            match positions.get(&ability.ability_id) {
                Some(&index) => abilities[index] = view,
                None => {
                    positions.insert(ability.ability_id.clone(), abilities.len());
                    abilities.push(view);
                }
            }
        }

        debug!(
            catalog = catalog.len(),
            shown = abilities.len(),
            "Collapsed plugin abilities"
        );

        Ok(SplashView {
            name: self.context.name.clone(),
            description: self.context.description.clone(),
            abilities,
        })
    }
}

// ============================================================================
// Rendering
// ============================================================================

#[derive(Template)]
#[template(path = "dnp3.html")]
pub struct SplashTemplate {
    pub name: String,
    pub description: String,
    pub abilities: Vec<AbilityViewModel>,
}

impl From<SplashView> for SplashTemplate {
    fn from(view: SplashView) -> Self {
        Self {
            name: view.name,
            description: view.description,
            abilities: view.abilities,
        }
    }
}

mod filters {
    use dnp3_core::types::DISPLAY_LINE_BREAK;

    /// Escapes the text between line break markers and keeps the markers as markup.
    pub fn line_breaks<T: std::fmt::Display>(s: T) -> ::askama::Result<String> {
        let text = s.to_string();
        let mut segments = Vec::new();
        for segment in text.split(DISPLAY_LINE_BREAK) {
            segments.push(::askama::filters::escape(::askama::Html, segment)?.to_string());
        }
        Ok(segments.join(DISPLAY_LINE_BREAK))
    }
}

/// Renders an Askama template into an HTML response.
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {err}"),
            )
                .into_response(),
        }
    }
}

/// GET /plugin/dnp3/gui
pub async fn splash(
    State(gui): State<Arc<Dnp3Gui>>,
) -> Result<HtmlTemplate<SplashTemplate>, ApiError> {
    let view = gui.splash().await?;
    Ok(HtmlTemplate(view.into()))
}
