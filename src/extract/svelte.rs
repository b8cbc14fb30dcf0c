//! Stories and meta as authored in the `.stories.svelte` template.
//!
//! This side is the only one that still has the HTML comments and the
//! original attribute syntax; the Svelte compiler drops both.

use std::collections::HashSet;
use std::ops::Range;

use swc_core::common::Spanned;
use tracing::debug;

use crate::error::{CsfError, Result};
use crate::extract::{find_define_meta, story_local_name};
use crate::names::{dedent, is_binding_identifier, story_export_name};
use crate::options::PluginOptions;
use crate::parse::{DocComment, ParsedModule};
use crate::svelte::{AttributeValue, Component, Root, TemplateNode, ValuePart};
use crate::walker::{collect_aliases, AliasTable, DEFINE_META};

/// An HTML comment right above a story element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlComment {
    pub text: String,
    pub range: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct SvelteStory<'a> {
    pub node: &'a Component,
    pub name: Option<String>,
    pub export_name: String,
    pub comment: Option<HtmlComment>,
    /// Code for `parameters.docs.source.code`, when the element has a
    /// `source` attribute.
    pub source: Option<String>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct SvelteMeta {
    /// Local name the template uses for story elements.
    pub story_local: String,
    /// JSDoc above the `defineMeta` declaration, offsets into the source.
    pub description: Option<DocComment>,
    pub range: Range<usize>,
}

#[derive(Debug)]
pub struct SvelteNodes<'a> {
    pub aliases: AliasTable,
    pub meta: SvelteMeta,
    pub stories: Vec<SvelteStory<'a>>,
}

pub fn extract_svelte_nodes<'a>(
    root: &'a Root,
    source: &'a str,
    filename: &str,
    options: &PluginOptions,
) -> Result<SvelteNodes<'a>> {
    let missing_script = || CsfError::MissingInstanceScript {
        filename: filename.to_string(),
    };

    let script = root.logic_script().ok_or_else(missing_script)?;
    let content = script.content_range(source).ok_or_else(missing_script)?;
    let base = content.start;
    let parsed = ParsedModule::parse(filename, &source[content], script.lang())?;
    if parsed.module().body.is_empty() {
        return Err(missing_script());
    }

    let aliases = collect_aliases(parsed.module(), options);
    let define_meta = find_define_meta(parsed.module(), aliases.resolve(DEFINE_META)).ok_or_else(
        || CsfError::MissingMetaDeclaration {
            filename: filename.to_string(),
        },
    )?;

    let shift = |r: Range<usize>| r.start + base..r.end + base;
    let meta = SvelteMeta {
        story_local: story_local_name(&define_meta.declarator.name, &aliases),
        description: parsed.jsdoc_for(define_meta.stmt_span.lo).map(|doc| DocComment {
            text: doc.text,
            range: shift(doc.range),
        }),
        range: shift(parsed.range(define_meta.call.span())),
    };

    let stories = collect_stories(root, source, &meta.story_local, filename)?;
    debug!(
        filename,
        stories = stories.len(),
        story_component = %meta.story_local,
        "extracted template stories"
    );

    Ok(SvelteNodes {
        aliases,
        meta,
        stories,
    })
}

fn collect_stories<'a>(
    root: &'a Root,
    source: &str,
    story_local: &str,
    filename: &str,
) -> Result<Vec<SvelteStory<'a>>> {
    let mut stories = Vec::new();
    let mut export_names = HashSet::new();
    let mut pending_comment = None;

    for node in &root.fragment.nodes {
        match node {
            TemplateNode::Comment(comment) => {
                pending_comment = Some(HtmlComment {
                    text: dedent(&comment.data),
                    range: comment.start..comment.end,
                });
            }
            TemplateNode::Text(text) if text.data.trim().is_empty() => {}
            TemplateNode::Component(component) if component.name == story_local => {
                let story = read_story(component, source, pending_comment.take(), filename)?;
                if !export_names.insert(story.export_name.clone()) {
                    return Err(CsfError::unexpected(
                        filename,
                        format!("more than one story is exported as `{}`", story.export_name),
                    ));
                }
                stories.push(story);
            }
            _ => pending_comment = None,
        }
    }
    Ok(stories)
}

fn read_story<'a>(
    node: &'a Component,
    source: &str,
    comment: Option<HtmlComment>,
    filename: &str,
) -> Result<SvelteStory<'a>> {
    let name = static_attribute(node, "name", filename)?;
    let export_name = match static_attribute(node, "exportName", filename)? {
        Some(export_name) => export_name,
        None => name
            .as_deref()
            .and_then(story_export_name)
            .ok_or_else(|| {
                CsfError::unexpected(
                    filename,
                    format!(
                        "<{}> at offset {} needs a `name` or `exportName` attribute",
                        node.name, node.start
                    ),
                )
            })?,
    };

    if !is_binding_identifier(&export_name) {
        return Err(CsfError::unexpected(
            filename,
            format!("story export name `{export_name}` can't be declared as a module binding"),
        ));
    }

    let source_code = match node.attribute("source").map(|a| &a.value) {
        None => None,
        Some(AttributeValue::Bool(true)) => Some(children_markup(node, source, filename)?),
        Some(value) => Some(static_value(value).ok_or_else(|| {
            CsfError::unexpected(
                filename,
                format!("`source` attribute of story `{export_name}` must be static text"),
            )
        })?),
    };

    Ok(SvelteStory {
        node,
        name,
        export_name,
        comment: comment.filter(|c| !c.text.is_empty()),
        source: source_code,
        start: node.start,
        end: node.end,
    })
}

/// Raw markup of the story's children, dedented.
fn children_markup(node: &Component, source: &str, filename: &str) -> Result<String> {
    let located = |range: Range<usize>| {
        if range.start < node.start || range.end > node.end {
            return None;
        }
        source.get(range).map(dedent)
    };
    match (node.children_range(), &node.fragment) {
        (Some(range), _) => located(range.clone()).ok_or_else(|| {
            CsfError::unexpected(
                filename,
                format!(
                    "children of <{}> at {}..{} are outside the element or the source text",
                    node.name, range.start, range.end
                ),
            )
        }),
        (None, Some(_)) => Ok(String::new()),
        (None, None) if node.is_self_closing(source) => Ok(String::new()),
        (None, None) => Err(CsfError::unexpected(
            filename,
            format!(
                "children of <{}> at offset {} could not be located",
                node.name, node.start
            ),
        )),
    }
}

fn static_attribute(node: &Component, name: &str, filename: &str) -> Result<Option<String>> {
    let Some(attr) = node.attribute(name) else {
        return Ok(None);
    };
    static_value(&attr.value).map(Some).ok_or_else(|| {
        CsfError::unexpected(
            filename,
            format!(
                "`{name}` attribute of <{}> at offset {} must be static text",
                node.name, attr.start
            ),
        )
    })
}

fn static_value(value: &AttributeValue) -> Option<String> {
    match value {
        AttributeValue::Bool(_) => None,
        AttributeValue::Expression(part) => static_part(part),
        AttributeValue::Sequence(parts) => parts.iter().map(static_part).collect(),
    }
}

fn static_part(part: &ValuePart) -> Option<String> {
    match part {
        ValuePart::Text(text) => Some(text.data.clone()),
        ValuePart::ExpressionTag(tag) => tag.static_string(),
    }
}
