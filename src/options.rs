//! Plugin options, read from the JSON the host passes in.

use serde::Deserialize;

use crate::error::{CsfError, Result};

pub const DEFAULT_INCLUDE: &str = r"\.stories\.svelte$";
pub const DEFAULT_PACKAGE_NAME: &str = "@storybook/addon-svelte-csf";
pub const DEFAULT_SELF_REFERENCE: &str = "src/index";
pub const DEFAULT_RUNTIME_MODULE: &str = "@storybook/addon-svelte-csf/internal/create-runtime-stories";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginOptions {
    /// Regex a module id must match to be transformed.
    pub include: String,
    /// Package whose imports carry the addon API.
    pub package_name: String,
    /// Import path fragment that also counts as the addon package. Used by
    /// the addon's own stories, which import from its sources.
    pub self_reference: Option<String>,
    /// Module the appendix imports `createRuntimeStories` from.
    pub runtime_module: String,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE.to_string(),
            package_name: DEFAULT_PACKAGE_NAME.to_string(),
            self_reference: Some(DEFAULT_SELF_REFERENCE.to_string()),
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
        }
    }
}

impl PluginOptions {
    /// Parse options from a JSON object. An empty string yields the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| CsfError::InvalidOption(e.to_string()))
    }

    pub(crate) fn is_addon_source(&self, source: &str) -> bool {
        source == self.package_name
            || self
                .self_reference
                .as_deref()
                .is_some_and(|fragment| !fragment.is_empty() && source.contains(fragment))
    }
}
