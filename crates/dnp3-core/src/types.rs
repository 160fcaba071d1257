//! Core data types: abilities, their display projection, and plugin metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier every DNP3 ability is tagged with by the catalog.
pub const PLUGIN_ID: &str = "dnp3";

/// Display name shown by the host.
pub const PLUGIN_NAME: &str = "DNP3";

pub const PLUGIN_DESCRIPTION: &str =
    "The DNP3 plugin provides adversary emulation abilities specific to the DNP3 control systems protocol.";

/// Line-break marker used when rendering descriptions.
pub const DISPLAY_LINE_BREAK: &str = "<br>";

// ============================================================================
// Access levels
// ============================================================================

/// Access levels understood by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    App,
    Red,
    Blue,
    Hidden,
}

impl Access {
    /// Access levels granted to a member of the given group.
    ///
    /// Every operator group also gets `App`, which covers host pages that
    /// are not team specific.
    pub fn granted_to(group: Access) -> BTreeSet<Access> {
        let mut granted = BTreeSet::from([Access::App]);
        granted.insert(group);
        granted
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Access::App => "app",
            Access::Red => "red",
            Access::Blue => "blue",
            Access::Hidden => "hidden",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Plugin context
// ============================================================================

/// Static plugin metadata, supplied once at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginContext {
    pub name: String,
    pub description: String,
    /// Landing page the host links to
    pub address: String,
    /// Access level required to use the plugin's controllers
    pub access: Access,
}

impl PluginContext {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            address: format!("/plugin/{}/gui", PLUGIN_ID),
            access: Access::Red,
        }
    }
}

impl Default for PluginContext {
    fn default() -> Self {
        Self::new(PLUGIN_NAME, PLUGIN_DESCRIPTION)
    }
}

// ============================================================================
// Ability
// ============================================================================

/// One executor variant of an ability as held by the data service.
///
/// The catalog may hold several entries with the same `ability_id`, one per
/// platform/executor pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub ability_id: String,
    pub name: String,
    pub description: String,
    pub tactic: String,
    pub technique_id: String,
    pub technique_name: String,
    pub platform: String,
    pub executor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payloads: Vec<String>,
    /// Owning plugin, derived from where the ability was loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

impl Ability {
    pub fn builder() -> AbilityBuilder {
        AbilityBuilder::default()
    }

    /// Resolves which plugin contributed this ability, if any.
    pub async fn which_plugin(&self) -> Option<&str> {
        self.plugin.as_deref()
    }
}

/// Builder for [`Ability`], mostly used by loaders and tests.
#[derive(Debug, Default)]
pub struct AbilityBuilder {
    ability_id: String,
    name: String,
    description: String,
    tactic: String,
    technique_id: String,
    technique_name: String,
    platform: String,
    executor: String,
    command: Option<String>,
    payloads: Vec<String>,
    plugin: Option<String>,
}

impl AbilityBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.ability_id = id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tactic(mut self, tactic: impl Into<String>) -> Self {
        self.tactic = tactic.into();
        self
    }

    pub fn technique(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.technique_id = id.into();
        self.technique_name = name.into();
        self
    }

    pub fn executor(mut self, platform: impl Into<String>, executor: impl Into<String>) -> Self {
        self.platform = platform.into();
        self.executor = executor.into();
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn payloads(mut self, payloads: Vec<String>) -> Self {
        self.payloads = payloads;
        self
    }

    pub fn plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn build(self) -> Ability {
        Ability {
            ability_id: self.ability_id,
            name: self.name,
            description: self.description,
            tactic: self.tactic,
            technique_id: self.technique_id,
            technique_name: self.technique_name,
            platform: self.platform,
            executor: self.executor,
            command: self.command,
            payloads: self.payloads,
            plugin: self.plugin,
        }
    }
}

// ============================================================================
// View model
// ============================================================================

/// Display projection of an ability for the splash page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityViewModel {
    pub name: String,
    pub tactic: String,
    pub technique_id: String,
    pub technique_name: String,
    pub description: String,
}

impl From<&Ability> for AbilityViewModel {
    fn from(ability: &Ability) -> Self {
        Self {
            name: ability.name.clone(),
            tactic: ability.tactic.clone(),
            technique_id: ability.technique_id.clone(),
            technique_name: ability.technique_name.clone(),
            description: display_description(&ability.description),
        }
    }
}

/// Replaces every `\n` with [`DISPLAY_LINE_BREAK`]; nothing else changes.
pub fn display_description(description: &str) -> String {
    description.replace('\n', DISPLAY_LINE_BREAK)
}
