//! Per-story passes: HTML comment description and the `source` attribute.

use tracing::{debug, trace};

use super::{StoryPair, TransformContext};
use crate::error::Result;

const STORY_DESCRIPTION: &[&str] = &["parameters", "docs", "description", "story"];
const STORY_SOURCE: &[&str] = &["parameters", "docs", "source", "code"];

/// `<!-- text -->` above `<Story>` becomes
/// `parameters.docs.description.story`.
pub(super) fn insert_descriptions<'a>(
    ctx: &mut TransformContext<'a>,
    pairs: &[StoryPair<'a, '_>],
) -> Result<()> {
    let mut inserted = 0;
    for pair in pairs {
        let Some(comment) = &pair.svelte.comment else {
            continue;
        };
        let value = serde_json::to_string(&comment.text)?;
        if ctx
            .patches
            .set(&pair.compiled.props, STORY_DESCRIPTION, value, ctx.filename)?
        {
            inserted += 1;
        } else {
            trace!(story = %pair.svelte.export_name, "story already has a description");
        }
    }
    debug!(filename = ctx.filename, inserted, "story descriptions");
    Ok(())
}

/// The template's `source` attribute moves from the component props into
/// `parameters.docs.source.code`.
pub(super) fn move_source_attributes<'a>(
    ctx: &mut TransformContext<'a>,
    pairs: &[StoryPair<'a, '_>],
) -> Result<()> {
    let mut moved = 0;
    for pair in pairs {
        let Some(code) = &pair.svelte.source else {
            continue;
        };
        let props = &pair.compiled.props;
        if !ctx.patches.remove(props, "source") {
            trace!(story = %pair.svelte.export_name, "no compiled `source` prop to remove");
        }
        let value = serde_json::to_string(code)?;
        ctx.patches.set(props, STORY_SOURCE, value, ctx.filename)?;
        moved += 1;
    }
    debug!(filename = ctx.filename, moved, "story source attributes");
    Ok(())
}
