//! Passes over the `defineMeta` declaration.

use tracing::debug;

use super::TransformContext;
use crate::error::Result;
use crate::extract::compiled::{PatternInsert, META_BINDING};
use crate::extract::{CompiledMeta, SvelteMeta};

const COMPONENT_DESCRIPTION: &[&str] = &["parameters", "docs", "description", "component"];

/// Make sure `meta` is destructured from `defineMeta(...)` so the appendix
/// can export it. Returns the local name it is bound to.
pub(super) fn destructure_meta(
    ctx: &mut TransformContext<'_>,
    meta: &CompiledMeta<'_>,
) -> Result<String> {
    if let Some(local) = &meta.meta_local {
        debug!(filename = ctx.filename, local = %local, "meta already destructured");
        return Ok(local.clone());
    }

    let (at, kind) = meta.pattern_insert;
    let text = match kind {
        PatternInsert::Empty => format!(" {META_BINDING} "),
        PatternInsert::AfterLast => format!(", {META_BINDING}"),
        PatternInsert::BeforeRest => format!("{META_BINDING}, "),
    };
    ctx.buffer.insert(at, text)?;
    debug!(filename = ctx.filename, "destructured meta from defineMeta");
    Ok(META_BINDING.to_string())
}

/// JSDoc above `defineMeta` becomes `parameters.docs.description.component`.
pub(super) fn insert_description<'a>(
    ctx: &mut TransformContext<'a>,
    svelte: &SvelteMeta,
    compiled: &'a CompiledMeta<'_>,
) -> Result<()> {
    let Some(doc) = svelte.description.as_ref().filter(|d| !d.text.is_empty()) else {
        return Ok(());
    };
    let value = serde_json::to_string(&doc.text)?;
    let inserted = ctx
        .patches
        .set(&compiled.argument, COMPONENT_DESCRIPTION, value, ctx.filename)?;
    debug!(filename = ctx.filename, inserted, "meta description");
    Ok(())
}
