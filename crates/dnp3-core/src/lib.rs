//! # DNP3 Core
//!
//! Domain types and host collaborator contracts for the DNP3 adversary
//! emulation plugin.
//!
//! - **Types**: [`Ability`](types::Ability) executor variants, their
//!   [`AbilityViewModel`](types::AbilityViewModel) display projection, the
//!   static [`PluginContext`](types::PluginContext) and host access levels.
//! - **Data**: the [`DataService`](data::DataService) contract plus an
//!   in-memory catalog loaded from ability YAML documents.
//! - **Files**: the [`FileService`](file::FileService) contract used to
//!   resolve payloads.
//! - **Configuration**: YAML configuration with environment overrides.
//! - **Errors**: `thiserror` enums for catalog and configuration failures.

pub mod config;
pub mod data;
pub mod error;
pub mod file;
pub mod types;

pub use config::AppConfig;
pub use data::{Collection, DataService, InMemoryDataService};
pub use error::{ConfigError, DataError, Dnp3Error, Result};
pub use file::{FileService, LocalFileService};
pub use types::{
    Ability, AbilityViewModel, Access, PluginContext, PLUGIN_DESCRIPTION, PLUGIN_ID, PLUGIN_NAME,
};
