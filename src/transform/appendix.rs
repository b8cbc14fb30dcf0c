//! Trailing block that hands the compiled stories to the addon runtime.

use tracing::debug;

use super::TransformContext;
use crate::error::{CsfError, Result};
use crate::extract::SvelteStory;

pub const RUNTIME_FN: &str = "createRuntimeStories";
pub const RUNTIME_STORIES: &str = "__stories";
pub const NAMED_EXPORTS_ORDER: &str = "__namedExportsOrder";

#[derive(Debug, Clone, Copy)]
pub struct AppendixOptions<'a> {
    /// Identifier of the compiled component function.
    pub component_name: &'a str,
    pub runtime_module: &'a str,
}

pub(super) fn create(
    ctx: &mut TransformContext<'_>,
    options: &AppendixOptions<'_>,
    meta_local: &str,
    stories: &[SvelteStory<'_>],
) -> Result<()> {
    let taken = [
        RUNTIME_FN,
        RUNTIME_STORIES,
        NAMED_EXPORTS_ORDER,
        meta_local,
        options.component_name,
    ];
    if let Some(story) = stories
        .iter()
        .find(|story| taken.contains(&story.export_name.as_str()))
    {
        return Err(CsfError::unexpected(
            ctx.filename,
            format!(
                "story export `{}` collides with a binding of the generated module",
                story.export_name
            ),
        ));
    }

    let runtime_module = serde_json::to_string(options.runtime_module)?;
    let mut lines = vec![
        String::new(),
        format!("import {{ {RUNTIME_FN} }} from {runtime_module};"),
        format!(
            "const {RUNTIME_STORIES} = {RUNTIME_FN}({}, {meta_local});",
            options.component_name
        ),
        format!("export default {meta_local};"),
    ];

    let mut order = Vec::with_capacity(stories.len());
    for story in stories {
        let key = serde_json::to_string(&story.export_name)?;
        lines.push(format!(
            "export const {} = {RUNTIME_STORIES}[{key}];",
            story.export_name
        ));
        order.push(key);
    }
    lines.push(format!(
        "export const {NAMED_EXPORTS_ORDER} = [{}];",
        order.join(", ")
    ));

    let mut text = lines.join("\n");
    text.push('\n');
    if !ctx.buffer.original().ends_with('\n') {
        text.insert(0, '\n');
    }
    ctx.buffer.append(text)?;
    debug!(filename = ctx.filename, stories = stories.len(), "appended runtime stories");
    Ok(())
}
