//! The rewrite passes over the compiled module.
//!
//! Passes run in a fixed order, each one recording its edits against the
//! original compiled offsets. Stories are visited last to first and the
//! buffer applies everything rightmost first, so no recorded offset goes
//! stale.

mod appendix;
mod export_default;
mod meta;
pub mod props;
mod story;

use tracing::debug;

use crate::error::{CsfError, Result};
use crate::extract::{CompiledNodes, CompiledStory, SvelteNodes, SvelteStory};
use crate::splice::EditBuffer;
use props::PropertyPatches;

pub use appendix::AppendixOptions;

/// Mutable state of one file's rewrite.
pub struct TransformContext<'a> {
    pub filename: &'a str,
    pub buffer: EditBuffer,
    pub patches: PropertyPatches<'a>,
}

impl<'a> TransformContext<'a> {
    pub fn new(filename: &'a str, compiled_code: &str) -> Self {
        Self {
            filename,
            buffer: EditBuffer::new(compiled_code),
            patches: PropertyPatches::new(),
        }
    }

    pub fn finish(mut self) -> Result<String> {
        let patches = std::mem::take(&mut self.patches);
        patches.flush(&mut self.buffer)?;
        debug!(
            filename = self.filename,
            edits = self.buffer.edit_count(),
            "applying edits"
        );
        Ok(self.buffer.finish()?)
    }
}

/// The template and compiled form of one story.
#[derive(Debug, Clone, Copy)]
pub struct StoryPair<'a, 't> {
    pub svelte: &'a SvelteStory<'t>,
    pub compiled: &'a CompiledStory,
}

/// Pair stories by position, last story first.
///
/// Both sides are in document order. Counts must agree, and where both
/// sides carry a static name the names must agree too.
pub fn correlate<'a, 't>(
    svelte: &'a [SvelteStory<'t>],
    compiled: &'a [CompiledStory],
    filename: &str,
) -> Result<Vec<StoryPair<'a, 't>>> {
    if svelte.len() != compiled.len() {
        return Err(CsfError::StoryCorrelationMismatch {
            filename: filename.to_string(),
            reason: format!(
                "the template declares {} stories but the compiled output has {}",
                svelte.len(),
                compiled.len()
            ),
        });
    }

    let mut pairs = Vec::with_capacity(svelte.len());
    for (index, (svelte, compiled)) in svelte.iter().zip(compiled).enumerate().rev() {
        if let (Some(source_name), Some(compiled_name)) = (&svelte.name, &compiled.name) {
            if source_name != compiled_name {
                return Err(CsfError::StoryCorrelationMismatch {
                    filename: filename.to_string(),
                    reason: format!(
                        "story #{} is `{source_name}` in the template but `{compiled_name}` in the compiled output",
                        index + 1
                    ),
                });
            }
        }
        pairs.push(StoryPair { svelte, compiled });
    }
    Ok(pairs)
}

/// Run every pass and return the rewritten module.
pub fn run(
    filename: &str,
    compiled_code: &str,
    svelte: &SvelteNodes<'_>,
    compiled: &CompiledNodes<'_>,
    appendix: &AppendixOptions<'_>,
) -> Result<String> {
    let pairs = correlate(&svelte.stories, &compiled.stories, filename)?;
    let mut ctx = TransformContext::new(filename, compiled_code);

    story::insert_descriptions(&mut ctx, &pairs)?;
    story::move_source_attributes(&mut ctx, &pairs)?;
    let meta_local = meta::destructure_meta(&mut ctx, &compiled.meta)?;
    meta::insert_description(&mut ctx, &svelte.meta, &compiled.meta)?;
    export_default::remove(&mut ctx, &compiled.default_export)?;
    appendix::create(&mut ctx, appendix, &meta_local, &svelte.stories)?;

    ctx.finish()
}
