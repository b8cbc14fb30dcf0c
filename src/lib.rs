//! Post-compile transform for Svelte CSF `*.stories.svelte` files.
//!
//! The Svelte compiler drops HTML comments and rewrites attributes, so
//! story metadata written in the template does not reach the compiled
//! module. [`StoriesPlugin::transform`] reads it back out of the template
//! tree, pairs template stories with the compiled `Story(...)` calls, and
//! splices the compiled text:
//!
//! - `<!-- ... -->` above a story becomes `parameters.docs.description.story`
//! - the `source` attribute moves to `parameters.docs.source.code`
//! - JSDoc above `defineMeta` becomes `parameters.docs.description.component`
//! - the default export is replaced by the meta plus one named export per
//!   story, built by the addon runtime

pub mod error;
pub mod extract;
pub mod names;
pub mod options;
pub mod parse;
pub mod splice;
pub mod svelte;
pub mod transform;
pub mod walker;

use regex::Regex;
use tracing::{debug, info, warn};

pub use error::{CsfError, Result};
pub use options::PluginOptions;
pub use splice::{EditBuffer, SpliceError};
pub use svelte::{JsonAst, Preprocessor, Root, TemplateParser};

use extract::{extract_compiled_nodes, extract_svelte_nodes};
use parse::{ParsedModule, ScriptLang};
use transform::AppendixOptions;

// -----------------------------------------------------------------------------
// Output
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    /// Named story exports of the rewritten module, in template order.
    pub story_exports: Vec<String>,
}

// -----------------------------------------------------------------------------
// Plugin
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoriesPlugin {
    options: PluginOptions,
    filter: Regex,
}

impl StoriesPlugin {
    pub fn new(options: PluginOptions) -> Result<Self> {
        let filter = Regex::new(&options.include)
            .map_err(|e| CsfError::InvalidOption(format!("include: {e}")))?;
        Ok(Self { options, filter })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(PluginOptions::from_json(json)?)
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// Whether a module id is handled by this plugin.
    pub fn matches(&self, id: &str) -> bool {
        self.filter.is_match(id)
    }

    /// Rewrite the compiled module of one stories file.
    ///
    /// `raw_source` is the `.stories.svelte` text as read from disk; it goes
    /// through `preprocessor` (if any) before `parser` builds the template
    /// tree. Returns `Ok(None)` for ids outside the include filter.
    pub fn transform(
        &self,
        compiled_code: &str,
        id: &str,
        raw_source: &str,
        parser: &dyn TemplateParser,
        preprocessor: Option<&dyn Preprocessor>,
    ) -> Result<Option<TransformOutput>> {
        if !self.matches(id) {
            debug!(id, "skipping module outside include filter");
            return Ok(None);
        }

        let component_name =
            names::component_name(id).ok_or_else(|| CsfError::UnresolvableComponentName {
                filename: id.to_string(),
            })?;

        let compiled = ParsedModule::parse(id, compiled_code, ScriptLang::JavaScript)?;

        let source = match preprocessor {
            Some(preprocessor) => preprocessor.preprocess(raw_source, id)?,
            None => raw_source.to_string(),
        };
        let root = parser.parse(&source, id)?;

        let svelte_nodes = extract_svelte_nodes(&root, &source, id, &self.options)?;
        let compiled_nodes = extract_compiled_nodes(&compiled, id, &self.options)?;

        let component = match compiled_nodes.default_export.function_name.as_deref() {
            Some(function) if function != component_name => {
                warn!(
                    id,
                    expected = %component_name,
                    found = function,
                    "compiled component function is not named after the file"
                );
                function
            }
            _ => component_name.as_str(),
        };

        let appendix = AppendixOptions {
            component_name: component,
            runtime_module: &self.options.runtime_module,
        };
        let code = transform::run(id, compiled_code, &svelte_nodes, &compiled_nodes, &appendix)?;

        let story_exports: Vec<String> = svelte_nodes
            .stories
            .iter()
            .map(|story| story.export_name.clone())
            .collect();
        info!(id, stories = story_exports.len(), "transformed stories file");

        Ok(Some(TransformOutput {
            code,
            story_exports,
        }))
    }
}
